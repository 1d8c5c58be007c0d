//! CSRF tokens.

use rand::RngCore;

use crate::{constant_time_eq, hex};

/// Stateless CSRF token helper: 32 random bytes as hex, compared in
/// constant time.
#[derive(Default)]
pub struct CsrfTokens;

impl CsrfTokens {
    pub fn new() -> Self {
        Self
    }

    pub fn generate(&self) -> String {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        hex(&bytes)
    }

    pub fn validate(&self, expected: &str, presented: &str) -> bool {
        constant_time_eq(expected.as_bytes(), presented.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_unique_hex() {
        let csrf = CsrfTokens::new();
        let a = csrf.generate();
        let b = csrf.generate();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn validate_compares_exactly() {
        let csrf = CsrfTokens::new();
        let token = csrf.generate();
        assert!(csrf.validate(&token, &token));
        assert!(!csrf.validate(&token, &csrf.generate()));
        assert!(!csrf.validate(&token, &token[..32]));
    }
}
