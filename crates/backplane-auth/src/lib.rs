//! Authentication primitives: HS256 tokens, token pairs with refresh
//! and rotation, Argon2id password hashing, and CSRF tokens.
//!
//! The [`TokenSigner`] also signs object-store URLs through the
//! [`backplane_store::UrlSigner`] seam.

mod client;
mod csrf;
mod password;
mod token;

pub use client::{
    ACCESS_TTL_SECONDS, AuthClient, AuthError, REFRESH_TTL_SECONDS, TokenPair, bearer_token,
    cookie_token, session_cookie,
};
pub use csrf::CsrfTokens;
pub use password::{PasswordError, PasswordHasher};
pub use token::{Claims, TokenError, TokenSigner};

/// Constant-time byte comparison.
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Lowercase hex of a byte slice.
pub(crate) fn hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}
