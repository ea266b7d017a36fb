//! Selectors, semantic targets and the strategy table that maps one to the
//! other.
//!
//! # Design Philosophy
//!
//! - **Semantic first**: journeys talk about "the username field", never
//!   about markup
//! - **Ordered fallbacks**: each target owns a list of concrete strategies,
//!   most specific first
//! - **Data driven**: a new markup variant is a table edit, not a code change

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Concrete way of finding elements in the DOM
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Selector {
    /// CSS selector (e.g., `input[name="username"]`)
    Css(String),
    /// CSS selector filtered by contained text (case-insensitive)
    CssWithText {
        /// Base CSS selector
        css: String,
        /// Text the element must contain
        text: String,
    },
    /// Innermost elements whose text contains the value
    Text(String),
}

impl Selector {
    /// Create a CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Create a CSS selector with a text filter
    #[must_use]
    pub fn css_with_text(css: impl Into<String>, text: impl Into<String>) -> Self {
        Self::CssWithText {
            css: css.into(),
            text: text.into(),
        }
    }

    /// Create a text selector
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// JavaScript expression evaluating to the array of matching elements
    #[must_use]
    pub fn to_all_query(&self) -> String {
        match self {
            Self::Css(css) => format!("Array.from(document.querySelectorAll({}))", js_str(css)),
            Self::CssWithText { css, text } => format!(
                "Array.from(document.querySelectorAll({})).filter(el => \
                 (el.innerText || el.textContent || '').toLowerCase().includes({}))",
                js_str(css),
                js_str(&text.to_lowercase())
            ),
            Self::Text(text) => {
                let t = js_str(text);
                format!(
                    "Array.from(document.querySelectorAll('body *')).filter(el => \
                     !el.closest({NON_RENDERED}) && {VISIBLE_TEST} && \
                     (el.textContent || '').includes({t}) && \
                     !Array.from(el.children).some(c => (c.textContent || '').includes({t})))"
                )
            }
        }
    }

    /// JavaScript expression counting matches
    #[must_use]
    pub fn to_count_query(&self) -> String {
        format!("{}.length", self.to_all_query())
    }

    /// JavaScript expression counting rendered matches
    #[must_use]
    pub fn to_visible_count_query(&self) -> String {
        format!("{}.filter(el => {VISIBLE_TEST}).length", self.to_all_query())
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css(css) => write!(f, "css={css}"),
            Self::CssWithText { css, text } => write!(f, "css={css} >> text={text}"),
            Self::Text(text) => write!(f, "text={text}"),
        }
    }
}

/// In-page test that `el` occupies layout (not `display: none`, not inside a
/// hidden ancestor)
pub(crate) const VISIBLE_TEST: &str =
    "(el.offsetWidth || el.offsetHeight || el.getClientRects().length)";

/// Elements whose text never reaches the screen
const NON_RENDERED: &str = "'script, style, template, noscript'";

/// Quote a string as a JavaScript literal
pub(crate) fn js_str(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

/// What kind of locator a strategy is; documents why it sits where it
/// does in a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LocatorKind {
    /// `name` attribute
    Name,
    /// `id` attribute
    Id,
    /// CSS class
    Class,
    /// `type` attribute (input type, submit button)
    InputType,
    /// Visible text
    Text,
    /// Bare element, positional
    Element,
    /// Single field holding all values, comma separated
    Joined,
}

impl LocatorKind {
    /// Separator used to join multiple values into one field
    pub const JOIN_SEPARATOR: &'static str = ",";

    /// Whether a handle of this kind takes every value in one field
    #[must_use]
    pub const fn is_joined(&self) -> bool {
        matches!(self, Self::Joined)
    }
}

/// One (kind, selector) alternative for a semantic target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Strategy {
    /// Locator kind
    pub kind: LocatorKind,
    /// Concrete selector
    pub selector: Selector,
}

impl Strategy {
    /// Create a strategy
    #[must_use]
    pub const fn new(kind: LocatorKind, selector: Selector) -> Self {
        Self { kind, selector }
    }

    /// `<tag>[name="<name>"]`
    #[must_use]
    pub fn name(tag: &str, name: &str) -> Self {
        Self::new(LocatorKind::Name, Selector::css(format!("{tag}[name=\"{name}\"]")))
    }

    /// `<tag>#<id>`
    #[must_use]
    pub fn id(tag: &str, id: &str) -> Self {
        Self::new(LocatorKind::Id, Selector::css(format!("{tag}#{id}")))
    }

    /// `<tag>` containing `text`
    #[must_use]
    pub fn text(tag: &str, text: &str) -> Self {
        Self::new(LocatorKind::Text, Selector::css_with_text(tag, text))
    }

    /// Raw CSS with an explicit kind
    #[must_use]
    pub fn css(kind: LocatorKind, css: &str) -> Self {
        Self::new(kind, Selector::css(css))
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self.kind, self.selector)
    }
}

/// Named UI role, decoupled from markup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SemanticTarget {
    /// Username input
    UsernameField,
    /// Email input
    EmailField,
    /// Password input
    PasswordField,
    /// Password confirmation input
    ConfirmPasswordField,
    /// First name input
    FirstNameField,
    /// Last name input
    LastNameField,
    /// "Register" button
    RegisterButton,
    /// "Sign up" button
    SignUpButton,
    /// "Login" button
    LoginButton,
    /// "Sign in" button
    SignInButton,
    /// Any `type=submit` button
    SubmitButton,
    /// Calculation type dropdown
    CalculationTypeSelect,
    /// Calculation operand inputs
    CalculationInputs,
    /// "Add" button
    AddButton,
    /// "Create" button
    CreateButton,
    /// Button labelled "Submit"
    SubmitTextButton,
    /// "Update" button
    UpdateButton,
    /// "Save" button
    SaveButton,
    /// "View" link or button
    ViewControl,
    /// "Details" link
    DetailsControl,
    /// "Edit" link or button
    EditControl,
    /// "Delete" link or button
    DeleteControl,
    /// Success banner shown after login or registration
    SuccessAlert,
    /// Region listing the user's calculations
    ListingRegion,
    /// One entry of the listing
    ListingRow,
    /// Validation error message
    ValidationError,
}

impl SemanticTarget {
    /// Human-readable role name
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::UsernameField => "username field",
            Self::EmailField => "email field",
            Self::PasswordField => "password field",
            Self::ConfirmPasswordField => "confirm password field",
            Self::FirstNameField => "first name field",
            Self::LastNameField => "last name field",
            Self::RegisterButton => "register button",
            Self::SignUpButton => "sign up button",
            Self::LoginButton => "login button",
            Self::SignInButton => "sign in button",
            Self::SubmitButton => "submit button",
            Self::CalculationTypeSelect => "calculation type select",
            Self::CalculationInputs => "calculation inputs",
            Self::AddButton => "add button",
            Self::CreateButton => "create button",
            Self::SubmitTextButton => "submit-labelled button",
            Self::UpdateButton => "update button",
            Self::SaveButton => "save button",
            Self::ViewControl => "view control",
            Self::DetailsControl => "details control",
            Self::EditControl => "edit control",
            Self::DeleteControl => "delete control",
            Self::SuccessAlert => "success alert",
            Self::ListingRegion => "calculation listing",
            Self::ListingRow => "listing row",
            Self::ValidationError => "validation error",
        }
    }
}

impl fmt::Display for SemanticTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Ordered strategies for every semantic target.
#[derive(Debug, Clone)]
pub struct StrategyTable {
    chains: HashMap<SemanticTarget, Vec<Strategy>>,
}

impl Default for StrategyTable {
    fn default() -> Self {
        use LocatorKind::{Class, Element, InputType, Joined, Text};
        use SemanticTarget as T;

        let field = |name: &str| vec![Strategy::name("input", name), Strategy::id("input", name)];
        let button = |text: &str| vec![Strategy::text("button", text)];
        let control = |text: &str| vec![Strategy::text("a", text), Strategy::text("button", text)];

        let mut chains = HashMap::new();
        chains.insert(T::UsernameField, field("username"));
        chains.insert(T::EmailField, field("email"));
        chains.insert(T::PasswordField, field("password"));
        chains.insert(T::ConfirmPasswordField, field("confirm_password"));
        chains.insert(T::FirstNameField, field("first_name"));
        chains.insert(T::LastNameField, field("last_name"));
        chains.insert(T::RegisterButton, button("Register"));
        chains.insert(T::SignUpButton, button("Sign up"));
        chains.insert(T::LoginButton, button("Login"));
        chains.insert(T::SignInButton, button("Sign in"));
        chains.insert(
            T::SubmitButton,
            vec![Strategy::css(InputType, "button[type=\"submit\"]")],
        );
        chains.insert(
            T::CalculationTypeSelect,
            vec![
                Strategy::name("select", "type"),
                Strategy::id("select", "type"),
                Strategy::css(Element, "select"),
            ],
        );
        chains.insert(
            T::CalculationInputs,
            vec![
                Strategy::name("input", "inputs[]"),
                Strategy::name("input", "inputs"),
                Strategy::css(Class, "input.input-value"),
                Strategy::css(InputType, "input[type=\"number\"]"),
                Strategy::css(Element, "input"),
                Strategy::css(Joined, "input[name=\"inputs\"]"),
            ],
        );
        chains.insert(T::AddButton, button("Add"));
        chains.insert(T::CreateButton, button("Create"));
        chains.insert(T::SubmitTextButton, button("Submit"));
        chains.insert(T::UpdateButton, button("Update"));
        chains.insert(T::SaveButton, button("Save"));
        chains.insert(T::ViewControl, control("View"));
        chains.insert(T::DetailsControl, vec![Strategy::text("a", "Details")]);
        chains.insert(T::EditControl, control("Edit"));
        chains.insert(T::DeleteControl, control("Delete"));
        chains.insert(
            T::SuccessAlert,
            vec![
                Strategy::css(LocatorKind::Id, "#successAlert"),
                Strategy::css(Class, ".alert-success"),
            ],
        );
        chains.insert(
            T::ListingRegion,
            vec![
                Strategy::css(Element, "table"),
                Strategy::css(Class, ".history"),
                Strategy::css(Class, ".calculations"),
            ],
        );
        chains.insert(
            T::ListingRow,
            vec![
                Strategy::css(Element, "table tbody tr"),
                Strategy::css(Class, ".history > *"),
                Strategy::css(Class, ".calculations > *"),
            ],
        );
        chains.insert(
            T::ValidationError,
            vec![
                Strategy::new(Text, Selector::text("Invalid")),
                Strategy::new(Text, Selector::text("must be a number")),
                Strategy::css(Class, ".alert-danger"),
            ],
        );

        Self { chains }
    }
}

impl StrategyTable {
    /// Table with the built-in chains
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Strategies for a target, in resolution order
    #[must_use]
    pub fn strategies(&self, target: SemanticTarget) -> &[Strategy] {
        self.chains.get(&target).map_or(&[], Vec::as_slice)
    }

    /// Replace a target's whole chain
    pub fn set(&mut self, target: SemanticTarget, strategies: Vec<Strategy>) {
        self.chains.insert(target, strategies);
    }

    /// Add a strategy ahead of the existing ones
    pub fn prepend(&mut self, target: SemanticTarget, strategy: Strategy) {
        self.chains.entry(target).or_default().insert(0, strategy);
    }

    /// Add a strategy after the existing ones
    pub fn append(&mut self, target: SemanticTarget, strategy: Strategy) {
        self.chains.entry(target).or_default().push(strategy);
    }

    /// Builder form of [`StrategyTable::prepend`]
    #[must_use]
    pub fn with_preferred(mut self, target: SemanticTarget, strategy: Strategy) -> Self {
        self.prepend(target, strategy);
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod selector_tests {
        use super::*;

        #[test]
        fn test_css_query() {
            let query = Selector::css("input[name=\"username\"]").to_all_query();
            assert_eq!(
                query,
                r#"Array.from(document.querySelectorAll("input[name=\"username\"]"))"#
            );
        }

        #[test]
        fn test_css_with_text_is_case_insensitive() {
            let query = Selector::css_with_text("button", "Sign In").to_all_query();
            assert!(query.contains(r#""sign in""#));
            assert!(query.contains("toLowerCase"));
        }

        #[test]
        fn test_text_query_picks_innermost() {
            let query = Selector::text("must be a number").to_all_query();
            assert!(query.contains("el.children"));
        }

        #[test]
        fn test_text_query_skips_scripts_and_hidden_elements() {
            let query = Selector::text("Invalid").to_all_query();
            assert!(query.contains("el.closest('script, style, template, noscript')"));
            assert!(query.contains(VISIBLE_TEST));
        }

        #[test]
        fn test_visible_count_query_filters_layout() {
            let query = Selector::css("#successAlert").to_visible_count_query();
            assert!(query.contains(r##"querySelectorAll("#successAlert")"##));
            assert!(query.ends_with(&format!(".filter(el => {VISIBLE_TEST}).length")));
            assert!(!Selector::css("#successAlert")
                .to_count_query()
                .contains("offsetWidth"));
        }

        #[test]
        fn test_count_query() {
            let query = Selector::css("button").to_count_query();
            assert!(query.contains("querySelectorAll"));
            assert!(query.ends_with(".length"));
        }

        #[test]
        fn test_display() {
            assert_eq!(Selector::css("table").to_string(), "css=table");
            assert_eq!(
                Selector::css_with_text("a", "Edit").to_string(),
                "css=a >> text=Edit"
            );
            assert_eq!(Selector::text("Invalid").to_string(), "text=Invalid");
        }

        #[test]
        fn test_js_str_escapes_quotes() {
            assert_eq!(js_str(r#"a"b"#), r#""a\"b""#);
        }
    }

    mod table_tests {
        use super::*;

        #[test]
        fn test_field_chain_is_name_then_id() {
            let table = StrategyTable::new();
            let chain = table.strategies(SemanticTarget::UsernameField);
            assert_eq!(chain.len(), 2);
            assert_eq!(chain[0].kind, LocatorKind::Name);
            assert_eq!(chain[0].selector, Selector::css("input[name=\"username\"]"));
            assert_eq!(chain[1].kind, LocatorKind::Id);
            assert_eq!(chain[1].selector, Selector::css("input#username"));
        }

        #[test]
        fn test_inputs_chain_ends_with_joined_fallback() {
            let table = StrategyTable::new();
            let chain = table.strategies(SemanticTarget::CalculationInputs);
            let kinds: Vec<_> = chain.iter().map(|s| s.kind).collect();
            assert_eq!(
                kinds,
                vec![
                    LocatorKind::Name,
                    LocatorKind::Name,
                    LocatorKind::Class,
                    LocatorKind::InputType,
                    LocatorKind::Element,
                    LocatorKind::Joined,
                ]
            );
            assert!(chain.last().unwrap().kind.is_joined());
        }

        #[test]
        fn test_every_target_has_a_chain() {
            use SemanticTarget as T;
            let table = StrategyTable::new();
            for target in [
                T::UsernameField,
                T::EmailField,
                T::PasswordField,
                T::ConfirmPasswordField,
                T::FirstNameField,
                T::LastNameField,
                T::RegisterButton,
                T::SignUpButton,
                T::LoginButton,
                T::SignInButton,
                T::SubmitButton,
                T::CalculationTypeSelect,
                T::CalculationInputs,
                T::AddButton,
                T::CreateButton,
                T::SubmitTextButton,
                T::UpdateButton,
                T::SaveButton,
                T::ViewControl,
                T::DetailsControl,
                T::EditControl,
                T::DeleteControl,
                T::SuccessAlert,
                T::ListingRegion,
                T::ListingRow,
                T::ValidationError,
            ] {
                assert!(!table.strategies(target).is_empty(), "{target} has no chain");
            }
        }

        #[test]
        fn test_prepend_takes_priority() {
            let table = StrategyTable::new().with_preferred(
                SemanticTarget::LoginButton,
                Strategy::css(LocatorKind::Id, "#login-btn"),
            );
            let chain = table.strategies(SemanticTarget::LoginButton);
            assert_eq!(chain[0].selector, Selector::css("#login-btn"));
            assert_eq!(chain.len(), 2);
        }

        #[test]
        fn test_set_replaces_chain() {
            let mut table = StrategyTable::new();
            table.set(
                SemanticTarget::ListingRegion,
                vec![Strategy::css(LocatorKind::Id, "#history")],
            );
            assert_eq!(table.strategies(SemanticTarget::ListingRegion).len(), 1);
        }

        #[test]
        fn test_append_goes_last() {
            let mut table = StrategyTable::new();
            table.append(
                SemanticTarget::SuccessAlert,
                Strategy::css(LocatorKind::Class, ".toast-success"),
            );
            let chain = table.strategies(SemanticTarget::SuccessAlert);
            assert_eq!(chain.last().unwrap().selector, Selector::css(".toast-success"));
        }
    }
}
