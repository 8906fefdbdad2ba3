use std::fmt;

pub const ENV_VAR_NAME_THUNKD_CONFIG_DIR: &str = "THUNKD_CONFIG_DIR";
pub const ENV_VAR_NAME_THUNKD_ENDPOINT: &str = "THUNKD_ENDPOINT";
pub const DEFAULT_ENDPOINT: &str = "https://x.thunkable.com";

pub const CREDENTIALS_TOKEN_KEY: &str = "thunk_token";

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub token: String,
}

impl Credentials {
    pub fn new(token: impl Into<String>) -> Self {
        Credentials {
            token: token.into(),
        }
    }
}

// Keeps the token out of `--verbose` output.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"<REDACTED>")
            .finish()
    }
}

/// Base url of the project service: the `--endpoint` flag, then
/// `THUNKD_ENDPOINT`, then the public service.
pub fn resolve_endpoint(endpoint: Option<String>) -> String {
    let endpoint = endpoint
        .or_else(|| std::env::var(ENV_VAR_NAME_THUNKD_ENDPOINT).ok())
        .filter(|e| !e.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
    endpoint.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::{resolve_endpoint, Credentials};

    #[test]
    fn explicit_endpoint_drops_trailing_slash() {
        assert_eq!(
            "http://127.0.0.1:8080",
            resolve_endpoint(Some("http://127.0.0.1:8080/".to_string()))
        );
    }

    #[test]
    fn credentials_debug_hides_token() {
        let rendered = format!("{:?}", Credentials::new("super-secret"));
        assert!(!rendered.contains("super-secret"));
    }
}
