use super::constants::headers;
use super::error::EngineError;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};

/// A resolved PagerDuty credential
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// OAuth-style token, sent as a bearer token
    Bearer(String),
    /// Legacy REST API key
    LegacyKey(String),
}

impl Credential {
    pub fn token(&self) -> &str {
        match self {
            Credential::Bearer(token) | Credential::LegacyKey(token) => token,
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, Credential::LegacyKey(_))
    }

    /// Value of the `Authorization` header for this credential
    pub fn authorization_value(&self) -> String {
        match self {
            Credential::Bearer(token) => format!("Bearer {}", token),
            Credential::LegacyKey(token) => format!("Token token={}", token),
        }
    }
}

// Tokens never end up in logs through Debug.
impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credential::Bearer(_) => f.write_str("Credential::Bearer([REDACTED])"),
            Credential::LegacyKey(_) => f.write_str("Credential::LegacyKey([REDACTED])"),
        }
    }
}

/// Turns an already-resolved credential into request headers
#[derive(Debug, Clone)]
pub struct Authenticator {
    credential: Credential,
    headers: HeaderMap,
}

impl Authenticator {
    /// Validate the credential once and precompute its headers
    pub fn new(credential: Option<Credential>) -> Result<Self, EngineError> {
        let credential = credential.ok_or(EngineError::NoCredential)?;
        let headers = headers_for(Some(&credential))?;
        Ok(Self { credential, headers })
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// Shared headers for every request made with this credential
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

/// Build the authentication headers for a credential.
///
/// Pure function of its input: fails with [`EngineError::NoCredential`] when
/// nothing is configured and with [`EngineError::InvalidCredential`] when the
/// token cannot be carried in a header.
pub fn headers_for(credential: Option<&Credential>) -> Result<HeaderMap, EngineError> {
    let credential = credential.ok_or(EngineError::NoCredential)?;

    let token = credential.token();
    if token.trim().is_empty() {
        return Err(EngineError::InvalidCredential("token is empty".to_string()));
    }
    if token.chars().any(char::is_whitespace) {
        return Err(EngineError::InvalidCredential(
            "token contains whitespace".to_string(),
        ));
    }

    let mut authorization = HeaderValue::from_str(&credential.authorization_value())
        .map_err(|e| EngineError::InvalidCredential(e.to_string()))?;
    authorization.set_sensitive(true);

    let mut map = HeaderMap::new();
    map.insert(AUTHORIZATION, authorization);
    map.insert(ACCEPT, HeaderValue::from_static(headers::ACCEPT_V2));
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_headers() {
        let headers = headers_for(Some(&Credential::Bearer("abc123".to_string()))).unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer abc123");
        assert_eq!(headers.get(ACCEPT).unwrap(), headers::ACCEPT_V2);
    }

    #[test]
    fn test_legacy_key_headers() {
        let headers = headers_for(Some(&Credential::LegacyKey("y_NbAkKc66ryYTWUXYEu".to_string()))).unwrap();
        assert_eq!(
            headers.get(AUTHORIZATION).unwrap(),
            "Token token=y_NbAkKc66ryYTWUXYEu"
        );
    }

    #[test]
    fn test_missing_credential() {
        assert!(matches!(headers_for(None), Err(EngineError::NoCredential)));
        assert!(matches!(Authenticator::new(None), Err(EngineError::NoCredential)));
    }

    #[test]
    fn test_invalid_tokens_rejected() {
        assert!(matches!(
            headers_for(Some(&Credential::Bearer("  ".to_string()))),
            Err(EngineError::InvalidCredential(_))
        ));
        assert!(matches!(
            headers_for(Some(&Credential::LegacyKey("abc def".to_string()))),
            Err(EngineError::InvalidCredential(_))
        ));
    }

    #[test]
    fn test_debug_redacts_token() {
        let rendered = format!("{:?}", Credential::Bearer("super-secret".to_string()));
        assert!(!rendered.contains("super-secret"));
    }
}
