use async_trait::async_trait;
use regex::Regex;
use tracing::debug;
use vetprobe_common::{AppConfig, ContactRecord, ContactType, EntityKind};

use crate::error::{E2eError, E2eResult};
use crate::page::{ClickMode, Locator, TextMatch};
use crate::resolver::{EntityStrategy, Lookup};
use crate::selectors::{contact, contact_type_checkbox, form};
use crate::session::Session;

/// Contacts are searched on the contacts list and created from a blank form
#[derive(Debug, Clone)]
pub struct ContactStrategy {
    list_path: String,
}

impl ContactStrategy {
    pub fn new(app: &AppConfig) -> Self {
        Self {
            list_path: app.contacts_path.clone(),
        }
    }
}

/// Pattern a contact search result must match
///
/// Results render as a glyph followed by "Last, First". The key must be the
/// whole name so "Smith, John" does not pick up "Smithson, Johnny".
pub fn contact_search_pattern(natural_key: &str) -> E2eResult<TextMatch> {
    let re = Regex::new(&format!(
        r"^[^\p{{L}}\p{{N}}]*{}(\s|$)",
        regex::escape(natural_key)
    ))?;
    Ok(TextMatch::Pattern(re))
}

async fn set_checkbox(session: &Session, contact_type: ContactType, checked: bool) -> E2eResult<()> {
    let page = session.page();
    let checkbox = Locator::css(contact_type_checkbox(contact_type));
    if page.is_checked(&checkbox).await? != checked {
        debug!("Toggling {} to {}", contact_type, checked);
        page.click(&checkbox, ClickMode::Normal).await?;
    }
    Ok(())
}

#[async_trait]
impl EntityStrategy for ContactStrategy {
    type Record = ContactRecord;

    fn kind(&self) -> EntityKind {
        EntityKind::Contact
    }

    fn natural_key(&self, record: &ContactRecord) -> String {
        record.natural_key()
    }

    fn missing_field(&self, record: &ContactRecord) -> Option<&'static str> {
        record.missing_field()
    }

    fn lookup(&self, record: &ContactRecord) -> E2eResult<Option<Lookup>> {
        let key = record.natural_key();
        Ok(Some(Lookup {
            path: self.list_path.clone(),
            pattern: contact_search_pattern(&key)?,
            query: key,
        }))
    }

    fn form_context_index(&self) -> usize {
        0
    }

    async fn open_form(&self, session: &Session, _record: &ContactRecord) -> E2eResult<()> {
        session
            .page()
            .click(&Locator::css(form::NEW_RECORD), ClickMode::Normal)
            .await?;
        session
            .wait_visible(&Locator::css(contact::FIRST_NAME), session.timeouts().element())
            .await
    }

    async fn fill_form(&self, session: &Session, record: &ContactRecord) -> E2eResult<()> {
        let page = session.page();
        page.fill(&Locator::css(contact::FIRST_NAME), &record.first_name).await?;
        page.fill(&Locator::css(contact::LAST_NAME), &record.last_name).await?;
        page.fill(&Locator::css(contact::EMAIL), &record.email).await?;

        // Customer comes pre-checked and has to go before anything else is set
        if !record.wants(ContactType::Customer) {
            set_checkbox(session, ContactType::Customer, false).await?;
        }
        for contact_type in &record.contact_types {
            set_checkbox(session, *contact_type, true).await?;
        }

        for contact_type in ContactType::ALL {
            let expected = record.wants(contact_type);
            let actual = page
                .is_checked(&Locator::css(contact_type_checkbox(contact_type)))
                .await?;
            if actual != expected {
                return Err(E2eError::ContactTypeMismatch {
                    key: record.natural_key(),
                    contact_type: contact_type.to_string(),
                    expected,
                    actual,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("• Smith, John", true ; "glyph prefix")]
    #[test_case("Smith, John", true ; "bare")]
    #[test_case("» Smith, John  qa.automation@vetprobe.test", true ; "trailing detail")]
    #[test_case("• Smithson, Johnny", false ; "longer surname")]
    #[test_case("• Smith, Johnny", false ; "longer first name")]
    #[test_case("• Goldsmith, John", false ; "surname suffix")]
    fn test_contact_pattern(text: &str, expected: bool) {
        let pattern = contact_search_pattern("Smith, John").unwrap();
        assert_eq!(pattern.is_match(text), expected);
    }

    #[test]
    fn test_pattern_escapes_key() {
        let pattern = contact_search_pattern("O'Neil (Jr), Sam").unwrap();
        assert!(pattern.is_match("• O'Neil (Jr), Sam"));
        assert!(!pattern.is_match("• O'Neil Jr, Sam"));
    }
}
