//! Data carried through a scenario: users, credentials and calculations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-run uniqueness token embedded in generated identities.
///
/// Millisecond wall-clock timestamp; scenarios running side by side use
/// distinct username prefixes so they never collide within one run.
#[must_use]
pub fn uniqueness_token() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// An application user generated for one scenario run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestUser {
    /// Login name
    pub username: String,
    /// Email address
    pub email: String,
    /// Plain-text password
    pub password: String,
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
}

impl TestUser {
    /// Build a user whose username and email embed `token`.
    ///
    /// `prefix` is the scenario-specific stem, e.g. `e2e_calc` yields
    /// `e2e_calc_<token>` and `e2e_calc_<token>@example.com`.
    #[must_use]
    pub fn generate(prefix: &str, token: i64) -> Self {
        Self {
            username: format!("{prefix}_{token}"),
            email: format!("{prefix}_{token}@example.com"),
            password: "TestPass123!".to_string(),
            first_name: "E2E".to_string(),
            last_name: "User".to_string(),
        }
    }

    /// Replace the password
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    /// Replace first and last name
    #[must_use]
    pub fn with_names(mut self, first: impl Into<String>, last: impl Into<String>) -> Self {
        self.first_name = first.into();
        self.last_name = last.into();
        self
    }

    /// Derive a user with a different username and email, same password
    #[must_use]
    pub fn with_identity(&self, username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            ..self.clone()
        }
    }

    /// Registration body for `POST /auth/register`
    #[must_use]
    pub fn registration(&self) -> RegistrationPayload<'_> {
        RegistrationPayload {
            username: &self.username,
            email: &self.email,
            password: &self.password,
            confirm_password: &self.password,
            first_name: &self.first_name,
            last_name: &self.last_name,
        }
    }
}

/// JSON body of the registration endpoint
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationPayload<'a> {
    /// Login name
    pub username: &'a str,
    /// Email address
    pub email: &'a str,
    /// Password
    pub password: &'a str,
    /// Password confirmation, always equal to `password`
    pub confirm_password: &'a str,
    /// Given name
    pub first_name: &'a str,
    /// Family name
    pub last_name: &'a str,
}

/// Bearer token obtained after a UI login.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionCredential(String);

impl SessionCredential {
    /// Wrap a raw token
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw token value
    #[must_use]
    pub fn token(&self) -> &str {
        &self.0
    }

    /// `Authorization` header value
    #[must_use]
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SessionCredential")
            .field(&format_args!("<{} chars>", self.0.len()))
            .finish()
    }
}

/// Operation performed by a calculation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalculationType {
    /// a + b
    Addition,
    /// a - b
    Subtraction,
    /// a * b
    Multiplication,
    /// a / b
    Division,
}

impl CalculationType {
    /// Wire and form value
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Addition => "addition",
            Self::Subtraction => "subtraction",
            Self::Multiplication => "multiplication",
            Self::Division => "division",
        }
    }
}

impl fmt::Display for CalculationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One calculation operand. Raw text is kept to exercise validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InputValue {
    /// Numeric operand
    Number(f64),
    /// Anything else, sent verbatim
    Raw(String),
}

impl InputValue {
    /// Whether the operand is numeric
    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Number(_))
    }
}

impl From<i32> for InputValue {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<f64> for InputValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for InputValue {
    fn from(value: &str) -> Self {
        Self::Raw(value.to_string())
    }
}

impl fmt::Display for InputValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // 7.0 renders as "7", the way a user would type it
            Self::Number(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            Self::Number(n) => write!(f, "{n}"),
            Self::Raw(s) => f.write_str(s),
        }
    }
}

/// Body of `POST /calculations`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationRequest {
    /// Operation
    #[serde(rename = "type")]
    pub kind: CalculationType,
    /// Ordered operands
    pub inputs: Vec<InputValue>,
}

impl CalculationRequest {
    /// Create a request
    #[must_use]
    pub fn new<I, V>(kind: CalculationType, inputs: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<InputValue>,
    {
        Self {
            kind,
            inputs: inputs.into_iter().map(Into::into).collect(),
        }
    }

    /// Operands rendered as form text, in order
    #[must_use]
    pub fn input_texts(&self) -> Vec<String> {
        self.inputs.iter().map(ToString::to_string).collect()
    }
}

/// A calculation step of a journey together with the result the
/// application is expected to display for it.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpectedCalculation {
    /// What is submitted
    pub request: CalculationRequest,
    /// Result text the listing should show
    pub expected: String,
}

impl ExpectedCalculation {
    /// Pair a request with its expected listing text
    #[must_use]
    pub fn new(request: CalculationRequest, expected: impl Into<String>) -> Self {
        Self {
            request,
            expected: expected.into(),
        }
    }
}
