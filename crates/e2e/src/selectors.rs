//! Selectors for the clinic application's rendered UI
//!
//! Record forms open as tabs inside one window; field selectors are scoped
//! to the active tab while Save controls are not, so those are told apart
//! by position.

use vetprobe_common::ContactType;

use crate::page::{Locator, TextMatch};

pub mod login {
    /// One of the two id sets the login page is served with
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LoginFields {
        pub email: &'static str,
        pub password: &'static str,
    }

    pub const FIELD_SETS: [LoginFields; 2] = [
        LoginFields {
            email: "#input-email",
            password: "#input-password",
        },
        LoginFields {
            email: "#login-email",
            password: "#login-password",
        },
    ];

    pub const SUBMIT: &str = "button[type=\"submit\"]";
    pub const LOCATION_HEADING: &str = "h1, h2, h3";
    pub const LOCATION_HEADING_TEXT: &str = "Please select a location";
    pub const LOCATION_OPTION: &str = ".location-list .location-option";
    pub const USER_MENU: &str = "[data-testid=\"user-menu\"]";
    pub const LOGOUT: &str = "[data-testid=\"logout\"]";
    /// Query parameter carried by the post-logout login URL
    pub const LOGOUT_QUERY: &str = "sso=0";
}

pub mod search {
    pub const PLACEHOLDER_NEEDLE: &str = "search";
    pub const FIRST_RESULT: &str = ".search-results > :first-child";
    pub const RESULT_ITEM: &str = ".search-results > *";
}

pub mod form {
    pub const NEW_RECORD: &str = "[data-testid=\"new-record\"]";
    pub const SAVE: &str = "[data-testid=\"form-save\"]";
    pub const RECORD_TITLE: &str = ".tab-pane.active .record-title";
    /// Text of the single record an autocomplete field resolved to
    pub const RESOLVED_ATTR: &str = "data-resolved";
}

pub mod contact {
    pub const FIRST_NAME: &str = ".tab-pane.active input[name=\"firstName\"]";
    pub const LAST_NAME: &str = ".tab-pane.active input[name=\"lastName\"]";
    pub const EMAIL: &str = ".tab-pane.active input[name=\"email\"]";
    pub const NEW_PATIENT: &str = ".tab-pane.active [data-testid=\"contact-new-patient\"]";
}

pub mod patient {
    pub const NAME: &str = ".tab-pane.active input[name=\"animalName\"]";
    pub const OWNER: &str = ".tab-pane.active input[name=\"ownerName\"]";
    pub const AGE: &str = ".tab-pane.active input[name=\"age\"]";
    pub const TAGS: &str = ".tab-pane.active input[name=\"tagInput\"]";
    pub const NEW_APPOINTMENT: &str = ".tab-pane.active [data-testid=\"patient-new-appointment\"]";
}

pub mod appointment {
    pub const RESOURCE_PREFIX: &str = "appointment-resource-";
    pub const ROWS: &str = ".tab-pane.active .appointment-list .appointment-row";
}

pub mod wellness {
    pub const NAME: &str = ".tab-pane.active input[name=\"planName\"]";
    pub const DESCRIPTION: &str = ".tab-pane.active textarea[name=\"description\"]";
    pub const PRODUCT_PREFIX: &str = "wellness-product-";
}

pub mod dropdown {
    pub const TRIGGER: &str = ".magnifier";
    pub const PANEL: &str = ".filter-dropdown";
    pub const FILTER_INPUT: &str = ".filter-dropdown input";
    pub const ITEM: &str = ".filter-dropdown li";
}

pub mod toast {
    pub const SUCCESS: &str = "[class*=\"toast\"][class*=\"success\"], \
                               [class*=\"Toast\"][class*=\"Success\"], \
                               .alert-success";
    pub const ERROR: &str = "[class*=\"toast\"][class*=\"error\"], \
                             [class*=\"Toast\"][class*=\"Error\"], \
                             .alert-danger";
}

/// Checkbox for one contact classification on the active contact form
pub fn contact_type_checkbox(contact_type: ContactType) -> String {
    format!(
        ".tab-pane.active input[type=\"checkbox\"][data-contact-type=\"{}\"]",
        contact_type.attr_value()
    )
}

pub fn search_input() -> Locator {
    Locator::placeholder(search::PLACEHOLDER_NEEDLE)
}

/// Save control of the form at `form_context_index` among all open tabs
pub fn save_button(form_context_index: usize) -> Locator {
    Locator::css(form::SAVE).nth(form_context_index)
}

pub fn record_title(text: TextMatch) -> Locator {
    Locator::css(form::RECORD_TITLE).with_text(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contact_type_checkbox_selector() {
        assert_eq!(
            contact_type_checkbox(ContactType::StaffMember),
            ".tab-pane.active input[type=\"checkbox\"][data-contact-type=\"staff_member\"]"
        );
    }

    #[test]
    fn test_save_button_is_positional() {
        assert_eq!(save_button(2).nth, 2);
        assert_eq!(save_button(0).css_query(), form::SAVE);
    }
}
