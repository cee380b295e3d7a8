//! Unique fixture names for parallel scenario runs
//!
//! Scenario files write names like `Owner{ts}`; every run replaces `{ts}`
//! with a millisecond timestamp so concurrent runs never share fixtures.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};

/// Placeholder replaced by the stamp
pub const STAMP_PLACEHOLDER: &str = "{ts}";

/// Last stamp handed out by [`FixtureStamp::unique`]
static LAST_UNIQUE: AtomicI64 = AtomicI64::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureStamp(i64);

impl FixtureStamp {
    /// Stamp from the current wall clock in milliseconds
    pub fn now() -> Self {
        Self(chrono::Utc::now().timestamp_millis())
    }

    /// Wall-clock stamp that differs from every earlier `unique` stamp in
    /// this process
    ///
    /// Scenarios started in the same millisecond get consecutive values.
    pub fn unique() -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        let previous = LAST_UNIQUE
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        Self(now.max(previous + 1))
    }

    pub fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    pub fn millis(&self) -> i64 {
        self.0
    }

    /// Replace every `{ts}` in `template`
    pub fn apply(&self, template: &str) -> String {
        template.replace(STAMP_PLACEHOLDER, &self.0.to_string())
    }

    /// `prefix` followed by the stamp, e.g. `TestPet1730000000000`
    pub fn name(&self, prefix: &str) -> String {
        format!("{}{}", prefix, self.0)
    }
}

impl std::fmt::Display for FixtureStamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_replaces_all_placeholders() {
        let stamp = FixtureStamp::from_millis(1730000000000);
        assert_eq!(stamp.apply("Owner{ts}"), "Owner1730000000000");
        assert_eq!(stamp.apply("{ts}-{ts}"), "1730000000000-1730000000000");
        assert_eq!(stamp.apply("Dr Smith"), "Dr Smith");
        assert_eq!(stamp.name("TestPet"), "TestPet1730000000000");
    }

    #[test]
    fn test_now_is_positive() {
        assert!(FixtureStamp::now().millis() > 0);
    }

    #[test]
    fn test_unique_stamps_never_repeat() {
        let stamps: Vec<i64> = (0..50).map(|_| FixtureStamp::unique().millis()).collect();
        assert!(stamps.windows(2).all(|w| w[1] > w[0]));
        assert!(stamps[0] >= FixtureStamp::now().millis() - 60_000);
    }
}
