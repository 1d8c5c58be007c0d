//! Token pairs, refresh, and rotation.

use serde::Serialize;
use serde_json::{Map, Value, json};
use thiserror::Error;
use tracing::debug;

use backplane_store::{SessionStore, StoreError};

use crate::token::{TokenError, TokenSigner};

/// Access token lifetime: 15 minutes.
pub const ACCESS_TTL_SECONDS: u64 = 900;
/// Refresh token lifetime: 30 days.
pub const REFRESH_TTL_SECONDS: u64 = 2_592_000;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error("not a refresh token")]
    WrongTokenType,
    #[error("session not found")]
    SessionMissing,
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Issues and refreshes token pairs. When a session store is
/// attached, refresh tokens are bound to a live session and refusing
/// a revoked session invalidates the whole pair.
pub struct AuthClient {
    signer: TokenSigner,
    sessions: Option<SessionStore>,
}

impl AuthClient {
    pub fn new(signer: TokenSigner) -> Self {
        Self {
            signer,
            sessions: None,
        }
    }

    pub fn with_sessions(mut self, sessions: SessionStore) -> Self {
        self.sessions = Some(sessions);
        self
    }

    pub fn signer(&self) -> &TokenSigner {
        &self.signer
    }

    /// Issue an access/refresh pair for `user_id`.
    pub fn token_pair(&self, user_id: &str, metadata: Value) -> Result<TokenPair, AuthError> {
        let session_id = match &self.sessions {
            Some(sessions) => {
                let (id, _) = sessions.create(user_id, REFRESH_TTL_SECONDS, metadata)?;
                Some(id)
            }
            None => None,
        };
        self.issue_pair(user_id, session_id)
    }

    /// Exchange a refresh token for a new pair. The token must carry
    /// `type: refresh`, and its session (when bound) must still exist.
    pub fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let claims = self.signer.verify(refresh_token)?;
        if claims.extra_str("type") != Some("refresh") {
            return Err(AuthError::WrongTokenType);
        }

        let session_id = claims.extra_str("sessionId").map(str::to_string);
        if let (Some(sessions), Some(id)) = (&self.sessions, session_id.as_deref()) {
            if sessions.get(id)?.is_none() {
                return Err(AuthError::SessionMissing);
            }
            sessions.extend(id, REFRESH_TTL_SECONDS)?;
        }

        debug!(user = %claims.sub, "refreshed token pair");
        self.issue_pair(&claims.sub, session_id)
    }

    /// Refresh and move the session to a fresh id, invalidating the
    /// old one.
    pub fn rotate(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let claims = self.signer.verify(refresh_token)?;
        if claims.extra_str("type") != Some("refresh") {
            return Err(AuthError::WrongTokenType);
        }

        let session_id = match (&self.sessions, claims.extra_str("sessionId")) {
            (Some(sessions), Some(id)) => {
                let (new_id, _) = sessions.rotate(id)?.ok_or(AuthError::SessionMissing)?;
                Some(new_id)
            }
            _ => None,
        };
        self.issue_pair(&claims.sub, session_id)
    }

    fn issue_pair(
        &self,
        user_id: &str,
        session_id: Option<String>,
    ) -> Result<TokenPair, AuthError> {
        let mut access_extra = Map::new();
        access_extra.insert("type".to_string(), json!("access"));
        let access_token =
            self.signer
                .issue(user_id, Some(ACCESS_TTL_SECONDS), access_extra)?;

        let mut refresh_extra = Map::new();
        refresh_extra.insert("type".to_string(), json!("refresh"));
        if let Some(id) = &session_id {
            refresh_extra.insert("sessionId".to_string(), json!(id));
        }
        let refresh_token =
            self.signer
                .issue(user_id, Some(REFRESH_TTL_SECONDS), refresh_extra)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_in: ACCESS_TTL_SECONDS,
            session_id,
        })
    }
}

/// Format a hardened session cookie.
pub fn session_cookie(name: &str, value: &str, max_age_seconds: u64) -> String {
    format!("{name}={value}; HttpOnly; Secure; SameSite=Strict; Path=/; Max-Age={max_age_seconds}")
}

/// Token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Named cookie value from a `Cookie` header.
pub fn cookie_token<'a>(cookie_header: &'a str, name: &str) -> Option<&'a str> {
    cookie_header.split(';').find_map(|pair| {
        let (k, v) = pair.trim().split_once('=')?;
        (k == name && !v.is_empty()).then_some(v)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use backplane_store::MemoryKv;
    use std::sync::Arc;

    fn client_with_sessions() -> AuthClient {
        let signer = TokenSigner::new(b"test-secret".to_vec(), ACCESS_TTL_SECONDS);
        AuthClient::new(signer).with_sessions(SessionStore::new(Arc::new(MemoryKv::new())))
    }

    #[test]
    fn pair_carries_typed_tokens() {
        let client = client_with_sessions();
        let pair = client.token_pair("u1", Value::Null).unwrap();
        assert_eq!(pair.expires_in, ACCESS_TTL_SECONDS);
        assert!(pair.session_id.is_some());

        let access = client.signer.verify(&pair.access_token).unwrap();
        assert_eq!(access.extra_str("type"), Some("access"));
        let refresh = client.signer.verify(&pair.refresh_token).unwrap();
        assert_eq!(refresh.extra_str("type"), Some("refresh"));
    }

    #[test]
    fn access_token_cannot_refresh() {
        let client = client_with_sessions();
        let pair = client.token_pair("u1", Value::Null).unwrap();
        assert!(matches!(
            client.refresh(&pair.access_token),
            Err(AuthError::WrongTokenType)
        ));
    }

    #[test]
    fn refresh_issues_a_new_pair_for_live_session() {
        let client = client_with_sessions();
        let pair = client.token_pair("u1", Value::Null).unwrap();
        let renewed = client.refresh(&pair.refresh_token).unwrap();
        assert_eq!(renewed.session_id, pair.session_id);
        let claims = client.signer.verify(&renewed.access_token).unwrap();
        assert_eq!(claims.sub, "u1");
    }

    #[test]
    fn rotation_invalidates_the_old_session() {
        let client = client_with_sessions();
        let pair = client.token_pair("u1", Value::Null).unwrap();
        let rotated = client.rotate(&pair.refresh_token).unwrap();
        assert_ne!(rotated.session_id, pair.session_id);
        // old refresh token now points at a dead session
        assert!(matches!(
            client.refresh(&pair.refresh_token),
            Err(AuthError::SessionMissing)
        ));
    }

    #[test]
    fn header_extractors() {
        assert_eq!(bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(
            cookie_token("theme=dark; access_token=abc; lang=en", "access_token"),
            Some("abc")
        );
        assert_eq!(cookie_token("theme=dark", "access_token"), None);
    }

    #[test]
    fn cookie_format_is_hardened() {
        let cookie = session_cookie("refresh_token", "tok", 60);
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("SameSite=Strict"));
        assert!(cookie.contains("Max-Age=60"));
    }
}
