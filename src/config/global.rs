use thiserror::Error;

/// Environment variable holding the GitHub token used for every API call.
pub const TOKEN_VAR: &str = "GITHUB_TOKEN";

#[derive(Debug, Error)]
#[error("{} is not set, create a personal access token with repository access", TOKEN_VAR)]
pub struct MissingTokenError;

/// Settings taken from the process environment rather than the catalog.
#[derive(Debug, Clone)]
pub struct GlobalConfig {
    pub github_token: String,
}

impl GlobalConfig {
    pub fn from_env() -> Result<Self, MissingTokenError> {
        Self::from_token(std::env::var(TOKEN_VAR).ok())
    }

    fn from_token(token: Option<String>) -> Result<Self, MissingTokenError> {
        token
            .filter(|t| !t.trim().is_empty())
            .map(|t| GlobalConfig {
                github_token: t.trim().to_string(),
            })
            .ok_or(MissingTokenError)
    }
}
