//! HS256 JWT signing and verification.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::Sha256;
use thiserror::Error;

use crate::hex;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("signature mismatch")]
    BadSignature,
    #[error("token expired")]
    Expired,
    #[error("issuer or audience mismatch")]
    WrongParty,
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

/// JWT claims: registered members plus flattened extras.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Claims {
    /// String-valued extra claim, if present.
    pub fn extra_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }
}

/// HS256 signer with fixed issuer/audience.
pub struct TokenSigner {
    secret: Vec<u8>,
    issuer: Option<String>,
    audience: Option<String>,
    default_ttl: u64,
}

const HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

impl TokenSigner {
    pub fn new(secret: impl Into<Vec<u8>>, default_ttl: u64) -> Self {
        Self {
            secret: secret.into(),
            issuer: None,
            audience: None,
            default_ttl,
        }
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    pub fn default_ttl(&self) -> u64 {
        self.default_ttl
    }

    fn mac(&self, message: &[u8]) -> Vec<u8> {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts any key length");
        mac.update(message);
        mac.finalize().into_bytes().to_vec()
    }

    /// Issue a token for `sub` with extra claims, expiring after
    /// `ttl_seconds` (default TTL when `None`).
    pub fn issue(
        &self,
        sub: &str,
        ttl_seconds: Option<u64>,
        extra: Map<String, Value>,
    ) -> Result<String, TokenError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: sub.to_string(),
            iat: now,
            exp: now + ttl_seconds.unwrap_or(self.default_ttl) as i64,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            extra,
        };
        self.sign(&claims)
    }

    pub fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        let header = URL_SAFE_NO_PAD.encode(HEADER);
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims)?);
        let message = format!("{header}.{payload}");
        let signature = URL_SAFE_NO_PAD.encode(self.mac(message.as_bytes()));
        Ok(format!("{message}.{signature}"))
    }

    /// Verify signature, expiry, and party claims.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut parts = token.split('.');
        let (Some(header), Some(payload), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TokenError::Malformed);
        };

        let message = format!("{header}.{payload}");
        let expected = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| TokenError::Malformed)?;
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts any key length");
        mac.update(message.as_bytes());
        mac.verify_slice(&expected)
            .map_err(|_| TokenError::BadSignature)?;

        let payload = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| TokenError::Malformed)?;
        let claims: Claims = serde_json::from_slice(&payload)?;

        if claims.exp <= Utc::now().timestamp() {
            return Err(TokenError::Expired);
        }
        if self.issuer.is_some() && claims.iss != self.issuer {
            return Err(TokenError::WrongParty);
        }
        if self.audience.is_some() && claims.aud != self.audience {
            return Err(TokenError::WrongParty);
        }
        Ok(claims)
    }
}

impl backplane_store::UrlSigner for TokenSigner {
    fn sign(&self, payload: &str) -> String {
        hex(&self.mac(payload.as_bytes()))
    }

    fn verify(&self, payload: &str, signature: &str) -> bool {
        crate::constant_time_eq(
            backplane_store::UrlSigner::sign(self, payload).as_bytes(),
            signature.as_bytes(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn signer() -> TokenSigner {
        TokenSigner::new(b"test-secret".to_vec(), 900).with_issuer("backplane")
    }

    #[test]
    fn sign_verify_roundtrip_with_extras() {
        let signer = signer();
        let mut extra = Map::new();
        extra.insert("type".to_string(), json!("access"));
        let token = signer.issue("u1", None, extra).unwrap();
        let claims = signer.verify(&token).unwrap();
        assert_eq!(claims.sub, "u1");
        assert_eq!(claims.extra_str("type"), Some("access"));
        assert_eq!(claims.iss.as_deref(), Some("backplane"));
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let signer = signer();
        let token = signer.issue("u1", None, Map::new()).unwrap();
        let mut parts: Vec<&str> = token.split('.').collect();
        let forged = URL_SAFE_NO_PAD.encode(r#"{"sub":"admin","iat":0,"exp":9999999999}"#);
        parts[1] = &forged;
        assert!(matches!(
            signer.verify(&parts.join(".")),
            Err(TokenError::BadSignature)
        ));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = signer().issue("u1", None, Map::new()).unwrap();
        let other = TokenSigner::new(b"other-secret".to_vec(), 900).with_issuer("backplane");
        assert!(matches!(other.verify(&token), Err(TokenError::BadSignature)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let signer = signer();
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: "u1".to_string(),
            iat: now - 120,
            exp: now - 60,
            iss: Some("backplane".to_string()),
            aud: None,
            extra: Map::new(),
        };
        let token = signer.sign(&claims).unwrap();
        assert!(matches!(signer.verify(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn issuer_mismatch_is_rejected() {
        let token = TokenSigner::new(b"test-secret".to_vec(), 900)
            .with_issuer("someone-else")
            .sign(&Claims {
                sub: "u1".to_string(),
                iat: Utc::now().timestamp(),
                exp: Utc::now().timestamp() + 60,
                iss: Some("someone-else".to_string()),
                aud: None,
                extra: Map::new(),
            })
            .unwrap();
        assert!(matches!(
            signer().verify(&token),
            Err(TokenError::WrongParty)
        ));
    }

    #[test]
    fn url_signing_is_detached_and_verifiable() {
        use backplane_store::UrlSigner;
        let signer = signer();
        let signature = UrlSigner::sign(&signer, "docs/a.txt:12345");
        assert!(UrlSigner::verify(&signer, "docs/a.txt:12345", &signature));
        assert!(!UrlSigner::verify(&signer, "docs/b.txt:12345", &signature));
    }
}
