//! Session token issuance and verification.
//!
//! One opaque token is minted per server process and handed to clients via
//! `GET /api/config`; mutating endpoints require it in the
//! `X-CM-LAB-TOKEN` header. Read endpoints (experiment metadata, assets)
//! are deliberately unauthenticated: the server binds to loopback only and
//! serves the operator's own data. The token is never written to the logs.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use rand::distr::Alphanumeric;
use rand::Rng;
use subtle::ConstantTimeEq;

use clipmill_core::error::CoreError;

use crate::error::AppError;
use crate::state::AppState;

/// Header carrying the session token on mutating requests.
pub const TOKEN_HEADER: &str = "x-cm-lab-token";

const TOKEN_LEN: usize = 48;

/// An opaque per-process session token.
#[derive(Clone)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn generate() -> Self {
        let token: String = rand::rng()
            .sample_iter(Alphanumeric)
            .take(TOKEN_LEN)
            .map(char::from)
            .collect();
        Self(token)
    }

    /// The raw token, for the config endpoint only.
    pub fn reveal(&self) -> &str {
        &self.0
    }

    /// Constant-time comparison so verification leaks no timing signal.
    pub fn verify(&self, presented: &str) -> bool {
        self.0.as_bytes().ct_eq(presented.as_bytes()).into()
    }
}

impl std::fmt::Debug for SessionToken {
    // Redacted so a stray debug log can never print the token.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionToken(..)")
    }
}

/// Extractor that rejects the request unless a valid session token is
/// presented. Use on every mutating handler.
#[derive(Debug, Clone, Copy)]
pub struct RequireToken;

impl FromRequestParts<AppState> for RequireToken {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let presented = parts
            .headers
            .get(TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(format!(
                    "Missing {TOKEN_HEADER} header"
                )))
            })?;

        if !state.token.verify(presented) {
            return Err(AppError::Core(CoreError::Unauthorized(
                "Invalid session token".into(),
            )));
        }

        Ok(RequireToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifies_its_own_token() {
        let token = SessionToken::generate();
        assert!(token.verify(token.reveal()));
    }

    #[test]
    fn rejects_near_miss_and_wrong_length() {
        let token = SessionToken::generate();
        let mut near_miss = token.reveal().to_string();
        near_miss.pop();
        near_miss.push('!');

        assert!(!token.verify(&near_miss));
        assert!(!token.verify(""));
        assert!(!token.verify(&token.reveal()[..TOKEN_LEN - 1]));
    }

    #[test]
    fn tokens_are_unique_and_expected_length() {
        let a = SessionToken::generate();
        let b = SessionToken::generate();
        assert_ne!(a.reveal(), b.reveal());
        assert_eq!(a.reveal().len(), TOKEN_LEN);
    }

    #[test]
    fn debug_output_is_redacted() {
        let token = SessionToken::generate();
        let debug = format!("{token:?}");
        assert!(!debug.contains(token.reveal()));
    }
}
