//! Browser port
//!
//! Everything above this module talks to the application through [`Page`].
//! The Chromium driver and the simulated clinic both implement it.

use async_trait::async_trait;
use regex::Regex;

use crate::error::E2eResult;

/// How an element's text is compared
#[derive(Debug, Clone)]
pub enum TextMatch {
    /// Whole trimmed text equals the value
    Exact(String),
    /// Text contains the value
    Contains(String),
    /// Text contains the value, ignoring case
    ContainsIgnoreCase(String),
    Pattern(Regex),
}

impl TextMatch {
    pub fn exact(s: impl Into<String>) -> Self {
        TextMatch::Exact(s.into())
    }

    pub fn contains(s: impl Into<String>) -> Self {
        TextMatch::Contains(s.into())
    }

    pub fn is_match(&self, text: &str) -> bool {
        match self {
            TextMatch::Exact(expected) => text.trim() == expected.trim(),
            TextMatch::Contains(needle) => text.contains(needle.as_str()),
            TextMatch::ContainsIgnoreCase(needle) => {
                text.to_lowercase().contains(&needle.to_lowercase())
            }
            TextMatch::Pattern(re) => re.is_match(text),
        }
    }
}

impl std::fmt::Display for TextMatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TextMatch::Exact(s) => write!(f, "text = {:?}", s),
            TextMatch::Contains(s) => write!(f, "text ~ {:?}", s),
            TextMatch::ContainsIgnoreCase(s) => write!(f, "text ~i {:?}", s),
            TextMatch::Pattern(re) => write!(f, "text =~ /{}/", re.as_str()),
        }
    }
}

/// Base query of a locator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Css(String),
    /// Element whose id starts with `prefix`; the application appends a
    /// per-load numeric suffix. `inner` narrows to a descendant.
    IdPrefix { prefix: String, inner: Option<String> },
    /// Input whose placeholder contains the needle, ignoring case
    Placeholder(String),
}

/// Element query: a target, an optional text filter and a position
#[derive(Debug, Clone)]
pub struct Locator {
    pub target: Target,
    pub text: Option<TextMatch>,
    pub nth: usize,
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Self {
            target: Target::Css(selector.into()),
            text: None,
            nth: 0,
        }
    }

    pub fn id_prefix(prefix: impl Into<String>, inner: Option<&str>) -> Self {
        Self {
            target: Target::IdPrefix {
                prefix: prefix.into(),
                inner: inner.map(String::from),
            },
            text: None,
            nth: 0,
        }
    }

    pub fn placeholder(needle: impl Into<String>) -> Self {
        Self {
            target: Target::Placeholder(needle.into()),
            text: None,
            nth: 0,
        }
    }

    pub fn with_text(mut self, text: TextMatch) -> Self {
        self.text = Some(text);
        self
    }

    /// Pick the n-th match in document order
    pub fn nth(mut self, nth: usize) -> Self {
        self.nth = nth;
        self
    }

    /// CSS query that yields the candidates before filtering
    pub fn css_query(&self) -> String {
        match &self.target {
            Target::Css(css) => css.clone(),
            Target::IdPrefix { prefix, inner } => match inner {
                Some(inner) => format!("[id^=\"{}\"] {}", prefix, inner),
                None => format!("[id^=\"{}\"]", prefix),
            },
            Target::Placeholder(_) => "input[placeholder]".to_string(),
        }
    }

    /// Placeholder filter applied to candidates, if any
    pub fn placeholder_needle(&self) -> Option<&str> {
        match &self.target {
            Target::Placeholder(needle) => Some(needle),
            _ => None,
        }
    }

    pub fn matches_placeholder(&self, placeholder: Option<&str>) -> bool {
        match self.placeholder_needle() {
            Some(needle) => placeholder
                .map(|p| p.to_lowercase().contains(&needle.to_lowercase()))
                .unwrap_or(false),
            None => true,
        }
    }

    pub fn matches_text(&self, text: &str) -> bool {
        self.text.as_ref().map(|t| t.is_match(text)).unwrap_or(true)
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.target {
            Target::Placeholder(needle) => write!(f, "input[placeholder~i={:?}]", needle)?,
            _ => write!(f, "{}", self.css_query())?,
        }
        if let Some(text) = &self.text {
            write!(f, " [{}]", text)?;
        }
        if self.nth > 0 {
            write!(f, " #{}", self.nth)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClickMode {
    #[default]
    Normal,
    /// Dispatch the click from script, skipping actionability checks.
    /// Dropdown overlays report themselves unstable while still clickable.
    Force,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
}

impl Key {
    pub fn name(&self) -> &'static str {
        match self {
            Key::Enter => "Enter",
        }
    }
}

/// A live document in one isolated browser session
///
/// Element operations act on the `nth` element matching the locator and fail
/// with `ElementNotFound` when it does not exist. Queries never wait; waiting
/// is done by the callers in [`crate::wait`].
#[async_trait]
pub trait Page: Send + Sync {
    async fn goto(&self, url: &str) -> E2eResult<()>;

    async fn current_url(&self) -> E2eResult<String>;

    /// Number of elements matching the locator, ignoring `nth`
    async fn count(&self, locator: &Locator) -> E2eResult<usize>;

    async fn is_visible(&self, locator: &Locator) -> E2eResult<bool>;

    async fn text(&self, locator: &Locator) -> E2eResult<Option<String>>;

    async fn attribute(&self, locator: &Locator, name: &str) -> E2eResult<Option<String>>;

    async fn is_checked(&self, locator: &Locator) -> E2eResult<bool>;

    async fn click(&self, locator: &Locator, mode: ClickMode) -> E2eResult<()>;

    /// Replace the value in one step
    async fn fill(&self, locator: &Locator, value: &str) -> E2eResult<()>;

    /// Type keystroke by keystroke, appending to the current value
    async fn type_keys(&self, locator: &Locator, text: &str) -> E2eResult<()>;

    async fn press(&self, locator: &Locator, key: Key) -> E2eResult<()>;

    /// PNG of the current viewport
    async fn screenshot(&self) -> E2eResult<Vec<u8>>;

    /// Tear the session down
    async fn close(&self) -> E2eResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_prefix_query() {
        let locator = Locator::id_prefix("appointment-resource-", Some(".magnifier"));
        assert_eq!(
            locator.css_query(),
            "[id^=\"appointment-resource-\"] .magnifier"
        );
        assert_eq!(
            Locator::id_prefix("wellness-product-", None).css_query(),
            "[id^=\"wellness-product-\"]"
        );
    }

    #[test]
    fn test_placeholder_matching_ignores_case() {
        let locator = Locator::placeholder("search");
        assert!(locator.matches_placeholder(Some("Search contacts...")));
        assert!(locator.matches_placeholder(Some("Quick SEARCH")));
        assert!(!locator.matches_placeholder(Some("First name")));
        assert!(!locator.matches_placeholder(None));
        assert!(Locator::css("input").matches_placeholder(None));
    }

    #[test]
    fn test_text_match_variants() {
        assert!(TextMatch::exact("Save").is_match("  Save "));
        assert!(!TextMatch::exact("Save").is_match("Save all"));
        assert!(TextMatch::contains("saved").is_match("Record saved successfully"));
        assert!(TextMatch::ContainsIgnoreCase("please select".into())
            .is_match("Please Select a location"));
        let re = Regex::new(r"^\d+$").unwrap();
        assert!(TextMatch::Pattern(re).is_match("1234"));
    }

    #[test]
    fn test_locator_display() {
        let locator = Locator::css("[data-testid=\"form-save\"]").nth(2);
        assert_eq!(locator.to_string(), "[data-testid=\"form-save\"] #2");
    }
}
