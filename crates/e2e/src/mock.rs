//! Simulated clinic application
//!
//! An in-memory stand-in for the hosted application that renders the same
//! selectors, quirks included: search results and toasts appear after a
//! delay, the dropdown list only renders after a trailing space and refuses
//! non-forced clicks, autocomplete fields resolve only on a single match,
//! and Save controls of every open tab share one selector.
//!
//! [`MockClinic`] is the shared backend; every [`MockPage`] is one isolated
//! session against it. Times use tokio's clock so tests can pause it.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use vetprobe_common::{
    AppointmentRecord, ContactRecord, ContactType, EntityKind, PatientRecord, SuiteConfig,
    WellnessPlanRecord,
};

use crate::error::{E2eError, E2eResult};
use crate::page::{ClickMode, Key, Locator, Page};
use crate::runner::SessionFactory;
use crate::selectors::{
    appointment, contact, contact_type_checkbox, dropdown, form, login, patient, search, toast,
    wellness,
};

pub const MOCK_BASE_URL: &str = "https://clinic.vetprobe.test";
pub const MOCK_EMAIL: &str = "botai@test.com";
pub const MOCK_PASSWORD: &str = "Sunshine1";
pub const MOCK_LOCATIONS: [&str; 2] = ["Master branch (Database)", "North branch (Database)"];

/// How long a toast stays on screen
pub const TOAST_LIFETIME: Duration = Duration::from_secs(3);
const RESULTS_DELAY: Duration = Duration::from_millis(200);
const DEFAULT_SAVE_DELAY: Duration = Duration::from_millis(300);
const VALIDATION_DELAY: Duration = Duration::from_millis(100);
const SEARCH_PLACEHOLDER: &str = "Search clinic records...";
const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";

/// Scripted reaction to the next Save click
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveBehaviour {
    /// Store the record and show a success toast after `delay`
    Succeed { delay: Duration },
    /// Show an error toast after `delay`; nothing is stored
    Reject { delay: Duration, message: String },
    /// Error toast first, then a success toast anyway; nothing is stored
    RejectThenSucceed {
        error_after: Duration,
        success_after: Duration,
        message: String,
    },
    /// No toast at all; `store` decides whether the record exists
    Silent { store: bool },
}

#[derive(Debug)]
struct ClinicState {
    login_fields: usize,
    location_prompt: bool,
    fail_logins: u32,
    login_submits: usize,
    selected_location: Option<String>,
    contacts: Vec<ContactRecord>,
    patients: Vec<PatientRecord>,
    appointments: Vec<(String, AppointmentRecord)>,
    wellness_plans: Vec<WellnessPlanRecord>,
    resources: Vec<String>,
    products: Vec<String>,
    save_script: VecDeque<SaveBehaviour>,
    save_clicks: usize,
    created: HashMap<EntityKind, usize>,
}

/// Shared backend of the simulated application
pub struct MockClinic {
    state: Mutex<ClinicState>,
}

impl Default for MockClinic {
    fn default() -> Self {
        Self::new()
    }
}

impl MockClinic {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ClinicState {
                login_fields: 0,
                location_prompt: true,
                fail_logins: 0,
                login_submits: 0,
                selected_location: None,
                contacts: Vec::new(),
                patients: Vec::new(),
                appointments: Vec::new(),
                wellness_plans: Vec::new(),
                resources: vec!["Dr Smith".into(), "Dr Jones".into(), "Theatre 1".into()],
                products: vec!["Vaccination".into(), "Flea & Worm".into()],
                save_script: VecDeque::new(),
                save_clicks: 0,
                created: HashMap::new(),
            }),
        }
    }

    /// Suite configuration pointing at this clinic
    pub fn suite_config(&self) -> SuiteConfig {
        let mut config = SuiteConfig::default();
        config.app.base_url = MOCK_BASE_URL.to_string();
        config.credentials.email = MOCK_EMAIL.to_string();
        config.credentials.password = MOCK_PASSWORD.to_string();
        config.location = MOCK_LOCATIONS[0].to_string();
        config.runner.preflight = false;
        config
    }

    /// Serve the login page with the `login-*` id set
    pub fn use_alternate_login_fields(&self) {
        self.state.lock().login_fields = 1;
    }

    pub fn set_location_prompt(&self, shown: bool) {
        self.state.lock().location_prompt = shown;
    }

    /// Reject the next `n` login submissions regardless of credentials
    pub fn fail_next_logins(&self, n: u32) {
        self.state.lock().fail_logins = n;
    }

    pub fn seed_contact(&self, record: ContactRecord) {
        self.state.lock().contacts.push(record);
    }

    pub fn seed_patient(&self, record: PatientRecord) {
        self.state.lock().patients.push(record);
    }

    pub fn seed_wellness_plan(&self, record: WellnessPlanRecord) {
        self.state.lock().wellness_plans.push(record);
    }

    /// Queue the reaction to an upcoming Save; unscripted saves succeed
    pub fn script_save(&self, behaviour: SaveBehaviour) {
        self.state.lock().save_script.push_back(behaviour);
    }

    pub fn contacts(&self) -> Vec<ContactRecord> {
        self.state.lock().contacts.clone()
    }

    pub fn patients(&self) -> Vec<PatientRecord> {
        self.state.lock().patients.clone()
    }

    /// Stored appointments with the patient they were booked for
    pub fn appointments(&self) -> Vec<(String, AppointmentRecord)> {
        self.state.lock().appointments.clone()
    }

    pub fn wellness_plans(&self) -> Vec<WellnessPlanRecord> {
        self.state.lock().wellness_plans.clone()
    }

    /// Records stored through the UI, seeds excluded
    pub fn created(&self, kind: EntityKind) -> usize {
        self.state.lock().created.get(&kind).copied().unwrap_or(0)
    }

    /// Save clicks that reached an unsaved form
    pub fn save_clicks(&self) -> usize {
        self.state.lock().save_clicks
    }

    pub fn login_submits(&self) -> usize {
        self.state.lock().login_submits
    }

    pub fn selected_location(&self) -> Option<String> {
        self.state.lock().selected_location.clone()
    }

    /// Open a fresh isolated session
    pub fn open_page(self: &Arc<Self>) -> Arc<MockPage> {
        Arc::new(MockPage::new(self.clone()))
    }
}

#[derive(Debug, Clone)]
struct Tab {
    kind: EntityKind,
    saved: bool,
    title: String,
    fields: HashMap<String, String>,
    checks: BTreeSet<ContactType>,
    owner_resolved: Option<String>,
    tags: Vec<String>,
    selection: Option<String>,
    patient: Option<String>,
    rows: Vec<String>,
}

impl Tab {
    fn blank(kind: EntityKind) -> Self {
        Self {
            kind,
            saved: false,
            title: String::new(),
            fields: HashMap::new(),
            checks: BTreeSet::new(),
            owner_resolved: None,
            tags: Vec::new(),
            selection: None,
            patient: None,
            rows: Vec::new(),
        }
    }

    fn saved(kind: EntityKind, title: impl Into<String>) -> Self {
        Self {
            saved: true,
            title: title.into(),
            ..Self::blank(kind)
        }
    }

    fn field(&self, css: &str) -> String {
        self.fields.get(css).cloned().unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
struct Dropdown {
    kind: EntityKind,
    filter: String,
}

#[derive(Debug, Clone)]
struct Toast {
    success: bool,
    text: String,
    from: Instant,
    until: Instant,
}

impl Toast {
    fn after(success: bool, text: impl Into<String>, delay: Duration) -> Self {
        let from = Instant::now() + delay;
        Self {
            success,
            text: text.into(),
            from,
            until: from + TOAST_LIFETIME,
        }
    }

    fn showing(&self, now: Instant) -> bool {
        now >= self.from && now < self.until
    }
}

#[derive(Debug)]
struct PageState {
    url: String,
    logged_in: bool,
    location_prompt: bool,
    menu_open: bool,
    login_values: HashMap<String, String>,
    search_value: String,
    results: Vec<(EntityKind, String, String)>,
    results_at: Instant,
    tabs: Vec<Tab>,
    active: usize,
    dropdown: Option<Dropdown>,
    toasts: Vec<Toast>,
}

impl PageState {
    fn active_tab(&self) -> Option<&Tab> {
        self.tabs.get(self.active)
    }

    fn active_tab_mut(&mut self) -> Option<&mut Tab> {
        self.tabs.get_mut(self.active)
    }

    fn open_tab(&mut self, tab: Tab) {
        self.tabs.push(tab);
        self.active = self.tabs.len() - 1;
    }
}

/// What a rendered node is, for dispatching interactions
#[derive(Debug, Clone, PartialEq)]
enum NodeRef {
    LoginField(String),
    Submit,
    Heading,
    LocationOption(String),
    UserMenu,
    Logout,
    Search,
    Result(usize),
    NewRecord,
    Save(usize),
    Title,
    Field(String),
    Checkbox(ContactType),
    NewPatient,
    NewAppointment,
    Trigger(EntityKind),
    Panel,
    FilterInput,
    Item(String),
    Row,
    Toast,
}

#[derive(Debug, Clone)]
struct Node {
    what: NodeRef,
    text: String,
    placeholder: Option<String>,
    checked: bool,
    resolved: Option<String>,
}

impl Node {
    fn new(what: NodeRef, text: impl Into<String>) -> Self {
        Self {
            what,
            text: text.into(),
            placeholder: None,
            checked: false,
            resolved: None,
        }
    }
}

/// Form inputs per record kind
const FORM_FIELDS: &[(EntityKind, &str)] = &[
    (EntityKind::Contact, contact::FIRST_NAME),
    (EntityKind::Contact, contact::LAST_NAME),
    (EntityKind::Contact, contact::EMAIL),
    (EntityKind::Patient, patient::NAME),
    (EntityKind::Patient, patient::OWNER),
    (EntityKind::Patient, patient::AGE),
    (EntityKind::Patient, patient::TAGS),
    (EntityKind::WellnessPlan, wellness::NAME),
    (EntityKind::WellnessPlan, wellness::DESCRIPTION),
];

fn tokens(s: &str) -> Vec<String> {
    s.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Every query token must start some token of the key
fn search_matches(query: &str, key: &str) -> bool {
    let wanted = tokens(query);
    let have = tokens(key);
    !wanted.is_empty() && wanted.iter().all(|w| have.iter().any(|h| h.starts_with(w.as_str())))
}

fn saved_message(kind: EntityKind) -> String {
    let name = kind.to_string();
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => format!("{}{} saved successfully", first.to_uppercase(), chars.as_str()),
        None => "Saved successfully".to_string(),
    }
}

/// One session against a [`MockClinic`]
pub struct MockPage {
    clinic: Arc<MockClinic>,
    state: Mutex<PageState>,
    calls: Mutex<Vec<String>>,
    closed: Mutex<bool>,
}

impl MockPage {
    fn new(clinic: Arc<MockClinic>) -> Self {
        Self {
            clinic,
            state: Mutex::new(PageState {
                url: "about:blank".to_string(),
                logged_in: false,
                location_prompt: false,
                menu_open: false,
                login_values: HashMap::new(),
                search_value: String::new(),
                results: Vec::new(),
                results_at: Instant::now(),
                tabs: Vec::new(),
                active: 0,
                dropdown: None,
                toasts: Vec::new(),
            }),
            calls: Mutex::new(Vec::new()),
            closed: Mutex::new(false),
        }
    }

    /// Interactions in order, e.g. `fill <selector> = <value>`
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Number of recorded interactions starting with `prefix`
    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.starts_with(prefix)).count()
    }

    /// Whether the contact form in the active tab has the type checked
    pub fn contact_type_checked(&self, contact_type: ContactType) -> bool {
        self.state
            .lock()
            .active_tab()
            .map(|t| t.checks.contains(&contact_type))
            .unwrap_or(false)
    }

    pub fn open_tab_count(&self) -> usize {
        self.state.lock().tabs.len()
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.lock()
    }

    fn log(&self, entry: String) {
        self.calls.lock().push(entry);
    }

    fn path_of(url: &str) -> String {
        let rest = url.strip_prefix(MOCK_BASE_URL).unwrap_or(url);
        let path = rest.split('?').next().unwrap_or("");
        if path.is_empty() {
            "/".to_string()
        } else {
            path.to_string()
        }
    }

    fn list_kind(path: &str) -> Option<EntityKind> {
        let app = vetprobe_common::AppConfig::default();
        if path == app.contacts_path {
            Some(EntityKind::Contact)
        } else if path == app.patients_path {
            Some(EntityKind::Patient)
        } else if path == app.wellness_plans_path {
            Some(EntityKind::WellnessPlan)
        } else {
            None
        }
    }

    fn nodes(&self, st: &PageState, css: &str) -> Vec<Node> {
        let clinic = self.clinic.state.lock();
        let now = Instant::now();
        let path = Self::path_of(&st.url);
        let login_path = vetprobe_common::AppConfig::default().login_path;
        let at_login = !st.logged_in && !st.location_prompt && path == login_path;
        let active = st.active_tab();
        let mut out = Vec::new();

        if let Some(set) = login::FIELD_SETS
            .iter()
            .position(|f| f.email == css || f.password == css)
        {
            if set == clinic.login_fields && at_login {
                out.push(Node::new(NodeRef::LoginField(css.to_string()), ""));
            }
        } else if css == login::SUBMIT {
            if at_login {
                out.push(Node::new(NodeRef::Submit, "Log in"));
            }
        } else if css == login::LOCATION_HEADING {
            if st.location_prompt {
                out.push(Node::new(NodeRef::Heading, login::LOCATION_HEADING_TEXT));
            }
        } else if css == login::LOCATION_OPTION {
            if st.location_prompt {
                for location in MOCK_LOCATIONS {
                    out.push(Node::new(NodeRef::LocationOption(location.to_string()), location));
                }
            }
        } else if css == login::USER_MENU {
            if st.logged_in {
                out.push(Node::new(NodeRef::UserMenu, MOCK_EMAIL));
            }
        } else if css == login::LOGOUT {
            if st.logged_in && st.menu_open {
                out.push(Node::new(NodeRef::Logout, "Log out"));
            }
        } else if css == "input[placeholder]" {
            if st.logged_in {
                let mut node = Node::new(NodeRef::Search, "");
                node.placeholder = Some(SEARCH_PLACEHOLDER.to_string());
                out.push(node);
            }
        } else if css == search::FIRST_RESULT || css == search::RESULT_ITEM {
            if st.logged_in && now >= st.results_at {
                let shown = if css == search::FIRST_RESULT { 1 } else { st.results.len() };
                for (i, (_, _, text)) in st.results.iter().enumerate().take(shown) {
                    out.push(Node::new(NodeRef::Result(i), text.clone()));
                }
            }
        } else if css == form::NEW_RECORD {
            if st.logged_in && Self::list_kind(&path).is_some() {
                out.push(Node::new(NodeRef::NewRecord, "New"));
            }
        } else if css == form::SAVE {
            for (i, _) in st.tabs.iter().enumerate() {
                out.push(Node::new(NodeRef::Save(i), "Save"));
            }
        } else if css == form::RECORD_TITLE {
            if let Some(tab) = active.filter(|t| t.saved) {
                out.push(Node::new(NodeRef::Title, tab.title.clone()));
            }
        } else if let Some((kind, _)) = FORM_FIELDS.iter().find(|(_, sel)| *sel == css) {
            if let Some(tab) = active.filter(|t| t.kind == *kind) {
                let mut node = Node::new(NodeRef::Field(css.to_string()), "");
                if css == patient::OWNER {
                    node.resolved = tab.owner_resolved.clone();
                }
                out.push(node);
            }
        } else if let Some(contact_type) = ContactType::ALL
            .into_iter()
            .find(|t| contact_type_checkbox(*t) == css)
        {
            if let Some(tab) = active.filter(|t| t.kind == EntityKind::Contact) {
                let mut node = Node::new(NodeRef::Checkbox(contact_type), contact_type.label());
                node.checked = tab.checks.contains(&contact_type);
                out.push(node);
            }
        } else if css == contact::NEW_PATIENT {
            if active.map(|t| t.kind == EntityKind::Contact && t.saved).unwrap_or(false) {
                out.push(Node::new(NodeRef::NewPatient, "New patient"));
            }
        } else if css == patient::NEW_APPOINTMENT {
            if active.map(|t| t.kind == EntityKind::Patient && t.saved).unwrap_or(false) {
                out.push(Node::new(NodeRef::NewAppointment, "New appointment"));
            }
        } else if css == Locator::id_prefix(appointment::RESOURCE_PREFIX, Some(dropdown::TRIGGER)).css_query() {
            if active.map(|t| t.kind == EntityKind::Appointment).unwrap_or(false) {
                out.push(Node::new(NodeRef::Trigger(EntityKind::Appointment), ""));
            }
        } else if css == Locator::id_prefix(wellness::PRODUCT_PREFIX, Some(dropdown::TRIGGER)).css_query() {
            if active.map(|t| t.kind == EntityKind::WellnessPlan).unwrap_or(false) {
                out.push(Node::new(NodeRef::Trigger(EntityKind::WellnessPlan), ""));
            }
        } else if css == dropdown::PANEL {
            if st.dropdown.is_some() {
                out.push(Node::new(NodeRef::Panel, ""));
            }
        } else if css == dropdown::FILTER_INPUT {
            if st.dropdown.is_some() {
                out.push(Node::new(NodeRef::FilterInput, ""));
            }
        } else if css == dropdown::ITEM {
            if let Some(open) = st.dropdown.as_ref().filter(|d| d.filter.ends_with(' ')) {
                let needle = open.filter.trim().to_lowercase();
                let options = match open.kind {
                    EntityKind::WellnessPlan => &clinic.products,
                    _ => &clinic.resources,
                };
                for option in options.iter().filter(|o| o.to_lowercase().contains(&needle)) {
                    out.push(Node::new(NodeRef::Item(option.clone()), option.clone()));
                }
            }
        } else if css == appointment::ROWS {
            if let Some(tab) = active {
                for row in &tab.rows {
                    out.push(Node::new(NodeRef::Row, row.clone()));
                }
            }
        } else if css == toast::SUCCESS || css == toast::ERROR {
            let success = css == toast::SUCCESS;
            for t in st.toasts.iter().filter(|t| t.success == success && t.showing(now)) {
                out.push(Node::new(NodeRef::Toast, t.text.clone()));
            }
        }
        out
    }

    fn find(&self, st: &PageState, locator: &Locator) -> Vec<Node> {
        self.nodes(st, &locator.css_query())
            .into_iter()
            .filter(|n| locator.matches_placeholder(n.placeholder.as_deref()))
            .filter(|n| locator.matches_text(&n.text))
            .collect()
    }

    fn target(&self, st: &PageState, locator: &Locator) -> E2eResult<Node> {
        self.find(st, locator)
            .into_iter()
            .nth(locator.nth)
            .ok_or_else(|| E2eError::ElementNotFound(locator.to_string()))
    }

    fn run_search(&self, st: &mut PageState) {
        let clinic = self.clinic.state.lock();
        let query = st.search_value.clone();
        let mut found: Vec<(EntityKind, String, String)> = Vec::new();
        match Self::list_kind(&Self::path_of(&st.url)) {
            Some(EntityKind::Contact) => {
                for c in clinic.contacts.iter().rev() {
                    let key = c.natural_key();
                    if search_matches(&query, &key) {
                        found.push((EntityKind::Contact, key.clone(), format!("• {}", key)));
                    }
                }
            }
            Some(EntityKind::Patient) => {
                for p in clinic.patients.iter().rev() {
                    if search_matches(&query, &p.name) {
                        let text = format!("\"{}\" ({})", p.name, p.owner);
                        found.push((EntityKind::Patient, p.name.clone(), text));
                    }
                }
            }
            Some(EntityKind::WellnessPlan) => {
                for w in clinic.wellness_plans.iter().rev() {
                    if search_matches(&query, &w.name) {
                        found.push((EntityKind::WellnessPlan, w.name.clone(), w.name.clone()));
                    }
                }
            }
            _ => {}
        }
        // Exact key first, then newest first
        found.sort_by_key(|(_, key, _)| !key.eq_ignore_ascii_case(query.trim()));
        st.results = found;
        st.results_at = Instant::now() + RESULTS_DELAY;
    }

    fn open_result(&self, st: &mut PageState, index: usize) {
        let Some((kind, key, _)) = st.results.get(index).cloned() else {
            return;
        };
        let clinic = self.clinic.state.lock();
        let mut tab = Tab::saved(kind, key.clone());
        match kind {
            EntityKind::Contact => {
                if let Some(c) = clinic.contacts.iter().find(|c| c.natural_key() == key) {
                    tab.checks = c.contact_types.clone();
                }
            }
            EntityKind::Patient => {
                tab.rows = clinic
                    .appointments
                    .iter()
                    .filter(|(p, _)| *p == key)
                    .map(|(p, a)| format!("{} - {}", a.resource_name, p))
                    .collect();
            }
            _ => {}
        }
        drop(clinic);
        st.open_tab(tab);
    }

    fn resolve_owner(&self, tab: &mut Tab) {
        let typed = tab.field(patient::OWNER);
        let clinic = self.clinic.state.lock();
        let matches: Vec<String> = clinic
            .contacts
            .iter()
            .map(|c| c.natural_key())
            .filter(|k| !typed.is_empty() && k.to_lowercase().contains(&typed.to_lowercase()))
            .collect();
        tab.owner_resolved = match matches.as_slice() {
            [only] => Some(only.clone()),
            _ => None,
        };
    }

    fn missing_on_save(tab: &Tab) -> Option<&'static str> {
        match tab.kind {
            EntityKind::Contact => (tab.field(contact::FIRST_NAME).trim().is_empty()
                || tab.field(contact::LAST_NAME).trim().is_empty())
            .then_some("First name and last name are required"),
            EntityKind::Patient => {
                if tab.field(patient::NAME).trim().is_empty() {
                    Some("Patient name is required")
                } else if tab.owner_resolved.is_none() {
                    Some("Owner is required")
                } else {
                    None
                }
            }
            EntityKind::Appointment => tab.selection.is_none().then_some("Resource is required"),
            EntityKind::WellnessPlan => {
                if tab.field(wellness::NAME).trim().is_empty() {
                    Some("Plan name is required")
                } else if tab.selection.is_none() {
                    Some("Product is required")
                } else {
                    None
                }
            }
        }
    }

    fn store(&self, st: &mut PageState, index: usize) {
        let mut clinic = self.clinic.state.lock();
        let parent_title = index
            .checked_sub(1)
            .and_then(|i| st.tabs.get(i))
            .map(|t| t.title.clone());
        let Some(tab) = st.tabs.get_mut(index) else {
            return;
        };
        let title = match tab.kind {
            EntityKind::Contact => {
                let record = ContactRecord {
                    first_name: tab.field(contact::FIRST_NAME),
                    last_name: tab.field(contact::LAST_NAME),
                    contact_types: tab.checks.clone(),
                    email: tab.field(contact::EMAIL),
                };
                let key = record.natural_key();
                clinic.contacts.push(record);
                key
            }
            EntityKind::Patient => {
                let record = PatientRecord {
                    name: tab.field(patient::NAME),
                    owner: tab.owner_resolved.clone().unwrap_or_default(),
                    age: tab.field(patient::AGE).parse().ok(),
                    tags: tab.tags.clone(),
                };
                let name = record.name.clone();
                clinic.patients.push(record);
                name
            }
            EntityKind::Appointment => {
                let resource = tab.selection.clone().unwrap_or_default();
                let patient_name = tab.patient.clone().or(parent_title).unwrap_or_default();
                tab.rows = vec![format!("{} - {}", resource, patient_name)];
                clinic
                    .appointments
                    .push((patient_name, AppointmentRecord::new(resource.clone())));
                resource
            }
            EntityKind::WellnessPlan => {
                let record = WellnessPlanRecord {
                    name: tab.field(wellness::NAME),
                    product: tab.selection.clone().unwrap_or_default(),
                    description: tab.fields.get(wellness::DESCRIPTION).cloned(),
                };
                let name = record.name.clone();
                clinic.wellness_plans.push(record);
                name
            }
        };
        tab.saved = true;
        tab.title = title;
        *clinic.created.entry(tab.kind).or_insert(0) += 1;
    }

    fn save(&self, st: &mut PageState, index: usize) {
        let Some(tab) = st.tabs.get(index) else {
            return;
        };
        // An already saved form has nothing to submit
        if tab.saved {
            return;
        }
        let kind = tab.kind;
        let missing = Self::missing_on_save(tab);
        let behaviour = {
            let mut clinic = self.clinic.state.lock();
            clinic.save_clicks += 1;
            match missing {
                Some(message) => SaveBehaviour::Reject {
                    delay: VALIDATION_DELAY,
                    message: message.to_string(),
                },
                None => clinic.save_script.pop_front().unwrap_or(SaveBehaviour::Succeed {
                    delay: DEFAULT_SAVE_DELAY,
                }),
            }
        };

        match behaviour {
            SaveBehaviour::Succeed { delay } => {
                self.store(st, index);
                st.toasts.push(Toast::after(true, saved_message(kind), delay));
            }
            SaveBehaviour::Reject { delay, message } => {
                st.toasts.push(Toast::after(false, message, delay));
            }
            SaveBehaviour::RejectThenSucceed {
                error_after,
                success_after,
                message,
            } => {
                st.toasts.push(Toast::after(false, message, error_after));
                st.toasts.push(Toast::after(true, saved_message(kind), success_after));
            }
            SaveBehaviour::Silent { store } => {
                if store {
                    self.store(st, index);
                }
            }
        }
    }

    fn submit_login(&self, st: &mut PageState) {
        let mut clinic = self.clinic.state.lock();
        clinic.login_submits += 1;
        let fields = login::FIELD_SETS[clinic.login_fields];
        let email = st.login_values.get(fields.email).cloned().unwrap_or_default();
        let password = st.login_values.get(fields.password).cloned().unwrap_or_default();

        if clinic.fail_logins > 0 {
            clinic.fail_logins -= 1;
            st.toasts
                .push(Toast::after(false, "Login service unavailable", Duration::ZERO));
        } else if email == MOCK_EMAIL && password == MOCK_PASSWORD {
            if clinic.location_prompt {
                st.location_prompt = true;
                st.url = format!("{}/select-location", MOCK_BASE_URL);
            } else {
                st.logged_in = true;
                st.url = format!("{}/", MOCK_BASE_URL);
            }
        } else {
            st.toasts
                .push(Toast::after(false, "Invalid email or password", Duration::ZERO));
        }
    }

    fn interact_click(&self, st: &mut PageState, node: Node, mode: ClickMode) -> E2eResult<()> {
        match node.what {
            NodeRef::Submit => self.submit_login(st),
            NodeRef::LocationOption(location) => {
                st.location_prompt = false;
                st.logged_in = true;
                st.url = format!("{}/", MOCK_BASE_URL);
                self.clinic.state.lock().selected_location = Some(location);
            }
            NodeRef::UserMenu => st.menu_open = true,
            NodeRef::Logout => {
                st.logged_in = false;
                st.menu_open = false;
                st.tabs.clear();
                st.url = format!(
                    "{}{}?{}",
                    MOCK_BASE_URL,
                    vetprobe_common::AppConfig::default().login_path,
                    login::LOGOUT_QUERY
                );
            }
            NodeRef::Result(i) => self.open_result(st, i),
            NodeRef::NewRecord => {
                if let Some(kind) = Self::list_kind(&Self::path_of(&st.url)) {
                    let mut tab = Tab::blank(kind);
                    if kind == EntityKind::Contact {
                        tab.checks.insert(ContactType::Customer);
                    }
                    st.open_tab(tab);
                }
            }
            NodeRef::Save(i) => self.save(st, i),
            NodeRef::Checkbox(contact_type) => {
                if let Some(tab) = st.active_tab_mut() {
                    if !tab.checks.remove(&contact_type) {
                        tab.checks.insert(contact_type);
                    }
                }
            }
            NodeRef::NewPatient => {
                let owner = st.active_tab().map(|t| t.title.clone()).unwrap_or_default();
                let mut tab = Tab::blank(EntityKind::Patient);
                tab.fields.insert(patient::OWNER.to_string(), owner.clone());
                tab.owner_resolved = Some(owner);
                st.open_tab(tab);
            }
            NodeRef::NewAppointment => {
                let patient_name = st.active_tab().map(|t| t.title.clone());
                let mut tab = Tab::blank(EntityKind::Appointment);
                tab.patient = patient_name;
                st.open_tab(tab);
            }
            NodeRef::Trigger(kind) => {
                st.dropdown = Some(Dropdown {
                    kind,
                    filter: String::new(),
                })
            }
            NodeRef::Item(option) => {
                if mode != ClickMode::Force {
                    return Err(E2eError::Browser(
                        "element is not stable: dropdown entry is animating".to_string(),
                    ));
                }
                if let Some(tab) = st.active_tab_mut() {
                    tab.selection = Some(option);
                }
                st.dropdown = None;
            }
            _ => {}
        }
        Ok(())
    }

    fn write(&self, st: &mut PageState, node: Node, value: &str, append: bool) {
        let merge = |current: Option<&String>| match (append, current) {
            (true, Some(current)) => format!("{}{}", current, value),
            _ => value.to_string(),
        };
        match node.what {
            NodeRef::LoginField(css) => {
                let next = merge(st.login_values.get(&css));
                st.login_values.insert(css, next);
            }
            NodeRef::Search => {
                let next = merge(Some(&st.search_value));
                st.search_value = next;
            }
            NodeRef::FilterInput => {
                if let Some(open) = st.dropdown.as_mut() {
                    let next = merge(Some(&open.filter));
                    open.filter = next;
                }
            }
            NodeRef::Field(css) => {
                let mut tab = match st.active_tab() {
                    Some(tab) => tab.clone(),
                    None => return,
                };
                let next = merge(tab.fields.get(&css));
                tab.fields.insert(css.clone(), next);
                if css == patient::OWNER {
                    self.resolve_owner(&mut tab);
                }
                if let Some(slot) = st.active_tab_mut() {
                    *slot = tab;
                }
            }
            _ => {}
        }
    }
}

#[async_trait]
impl Page for MockPage {
    async fn goto(&self, url: &str) -> E2eResult<()> {
        self.log(format!("goto {}", url));
        let mut st = self.state.lock();
        let login_path = vetprobe_common::AppConfig::default().login_path;
        st.url = url.to_string();
        st.location_prompt = false;
        st.menu_open = false;
        st.tabs.clear();
        st.active = 0;
        st.dropdown = None;
        st.results.clear();
        st.toasts.clear();
        if !st.logged_in && Self::path_of(url) != login_path {
            st.url = format!("{}{}", MOCK_BASE_URL, login_path);
        }
        Ok(())
    }

    async fn current_url(&self) -> E2eResult<String> {
        Ok(self.state.lock().url.clone())
    }

    async fn count(&self, locator: &Locator) -> E2eResult<usize> {
        let st = self.state.lock();
        Ok(self.find(&st, locator).len())
    }

    async fn is_visible(&self, locator: &Locator) -> E2eResult<bool> {
        let st = self.state.lock();
        Ok(self.find(&st, locator).len() > locator.nth)
    }

    async fn text(&self, locator: &Locator) -> E2eResult<Option<String>> {
        let st = self.state.lock();
        Ok(self
            .find(&st, locator)
            .into_iter()
            .nth(locator.nth)
            .map(|n| n.text))
    }

    async fn attribute(&self, locator: &Locator, name: &str) -> E2eResult<Option<String>> {
        let st = self.state.lock();
        let node = self.find(&st, locator).into_iter().nth(locator.nth);
        Ok(match (node, name) {
            (Some(node), form::RESOLVED_ATTR) => node.resolved,
            (Some(node), "placeholder") => node.placeholder,
            _ => None,
        })
    }

    async fn is_checked(&self, locator: &Locator) -> E2eResult<bool> {
        let st = self.state.lock();
        Ok(self.target(&st, locator)?.checked)
    }

    async fn click(&self, locator: &Locator, mode: ClickMode) -> E2eResult<()> {
        self.log(format!("click {}", locator));
        let mut st = self.state.lock();
        let node = self.target(&st, locator)?;
        self.interact_click(&mut st, node, mode)
    }

    async fn fill(&self, locator: &Locator, value: &str) -> E2eResult<()> {
        self.log(format!("fill {} = {}", locator, value));
        let mut st = self.state.lock();
        let node = self.target(&st, locator)?;
        self.write(&mut st, node, value, false);
        Ok(())
    }

    async fn type_keys(&self, locator: &Locator, text: &str) -> E2eResult<()> {
        self.log(format!("type {} = {}", locator, text));
        let mut st = self.state.lock();
        let node = self.target(&st, locator)?;
        self.write(&mut st, node, text, true);
        Ok(())
    }

    async fn press(&self, locator: &Locator, key: Key) -> E2eResult<()> {
        self.log(format!("press {} {}", locator, key.name()));
        let mut st = self.state.lock();
        let node = self.target(&st, locator)?;
        match node.what {
            NodeRef::Search => self.run_search(&mut st),
            NodeRef::Field(css) if css == patient::TAGS => {
                if let Some(tab) = st.active_tab_mut() {
                    let tag = tab.fields.remove(patient::TAGS).unwrap_or_default();
                    if !tag.trim().is_empty() {
                        tab.tags.push(tag.trim().to_string());
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    async fn screenshot(&self) -> E2eResult<Vec<u8>> {
        Ok(PNG_MAGIC.to_vec())
    }

    async fn close(&self) -> E2eResult<()> {
        *self.closed.lock() = true;
        Ok(())
    }
}

/// Opens [`MockPage`] sessions against one clinic
pub struct MockFactory {
    clinic: Arc<MockClinic>,
    pages: Mutex<Vec<Arc<MockPage>>>,
}

impl MockFactory {
    pub fn new(clinic: Arc<MockClinic>) -> Self {
        Self {
            clinic,
            pages: Mutex::new(Vec::new()),
        }
    }

    pub fn pages(&self) -> Vec<Arc<MockPage>> {
        self.pages.lock().clone()
    }
}

#[async_trait]
impl SessionFactory for MockFactory {
    async fn open(&self, _scenario: &str) -> E2eResult<Arc<dyn Page>> {
        let page = self.clinic.open_page();
        self.pages.lock().push(page.clone());
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_is_token_prefix_based() {
        assert!(search_matches("Smith, John", "Smith, John"));
        assert!(search_matches("Smith, John", "Smithson, Johnny"));
        assert!(!search_matches("Smith, John", "Jones, John"));
        assert!(!search_matches("", "Smith, John"));
    }

    #[test]
    fn test_saved_message() {
        assert_eq!(saved_message(EntityKind::WellnessPlan), "Wellness plan saved successfully");
        assert_eq!(saved_message(EntityKind::Contact), "Contact saved successfully");
    }
}
