use serde::{Deserialize, Serialize};

/// Request body for `POST /api/auth/google`.
///
/// Carries the credential issued by Google's identity service; the backend
/// verifies it and mints its own token pair.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct GoogleAuthRequest {
    /// The Google-issued credential.
    pub access_token: String,
}

impl GoogleAuthRequest {
    /// Creates a new credential-exchange request.
    pub fn new<S: Into<String>>(access_token: S) -> Self {
        Self {
            access_token: access_token.into(),
        }
    }
}

/// Response body for `POST /api/auth/google` and `POST /api/auth/refresh`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct TokenResponse {
    /// The backend-issued access token.
    pub access_token: String,
    /// The backend-issued refresh token.
    pub refresh_token: String,
    /// Token scheme, when the server reports one.
    #[serde(default)]
    pub token_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_response_without_type() {
        let json = "{\"access_token\":\"a\",\"refresh_token\":\"r\"}";
        let response: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.access_token, "a");
        assert_eq!(response.refresh_token, "r");
        assert!(response.token_type.is_none());
    }

    #[test]
    fn token_response_with_type() {
        let json = "{\"access_token\":\"a\",\"refresh_token\":\"r\",\"token_type\":\"bearer\"}";
        let response: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.token_type.as_deref(), Some("bearer"));
    }
}
