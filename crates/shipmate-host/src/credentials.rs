//! Host access tokens
//!
//! Only the shape of a token is checked locally. Whether the host accepts it
//! is learned from the first authenticated request.

const TOKEN_PREFIXES: &[&str] = &["ghp_", "github_pat_"];

/// A personal access token for the host API
///
/// The token value never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into().trim().to_string())
    }

    /// Build a token from optional user input, ignoring blank values
    pub fn from_input(value: Option<String>) -> Option<Self> {
        value.map(Self::new).filter(|t| !t.0.is_empty())
    }

    /// Whether the token has the shape of a personal access token
    pub fn looks_valid(&self) -> bool {
        TOKEN_PREFIXES
            .iter()
            .any(|prefix| self.0.len() > prefix.len() && self.0.starts_with(prefix))
    }

    /// Value of the `Authorization` header
    pub fn header_value(&self) -> String {
        format!("token {}", self.0)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Token").field(&"***").finish()
    }
}
