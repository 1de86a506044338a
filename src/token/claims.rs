use serde::{Deserialize, Serialize};

use crate::authz::Role;
use crate::AuthError;

/// Which half of the pair a token is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Identity facts baked into both tokens of a pair.
#[derive(Debug, Clone)]
pub struct TokenSubject {
    pub user_id: i64,
    pub email: String,
    pub role: Role,
    pub organization_id: Option<i64>,
}

/// Claims carried by a signed token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - the user ID.
    pub sub: String,
    pub email: String,
    pub role: Role,
    /// Organization id, when the user belongs to one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org: Option<i64>,
    /// Session id linking the token to its session record.
    pub sid: String,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
    /// Issued at time (Unix timestamp).
    pub iat: i64,
    /// Unique token id; consumed refresh jtis are recorded for rotation.
    pub jti: String,
    #[serde(rename = "typ")]
    pub kind: TokenKind,
    /// Issuer (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

impl Claims {
    pub fn user_id(&self) -> Result<i64, AuthError> {
        self.sub.parse().map_err(|_| AuthError::TokenInvalid)
    }

    pub fn is_access(&self) -> bool {
        self.kind == TokenKind::Access
    }

    pub fn is_refresh(&self) -> bool {
        self.kind == TokenKind::Refresh
    }

    /// Lifetime the token was issued with, in seconds.
    pub fn lifetime_secs(&self) -> i64 {
        self.exp - self.iat
    }

    pub fn subject(&self) -> Result<TokenSubject, AuthError> {
        Ok(TokenSubject {
            user_id: self.user_id()?,
            email: self.email.clone(),
            role: self.role,
            organization_id: self.org,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims() -> Claims {
        Claims {
            sub: "42".to_owned(),
            email: "user@example.com".to_owned(),
            role: Role::Student,
            org: Some(7),
            sid: "session-1".to_owned(),
            exp: 1_700_000_900,
            iat: 1_700_000_000,
            jti: "jti-1".to_owned(),
            kind: TokenKind::Access,
            iss: None,
        }
    }

    #[test]
    fn test_user_id_parse() {
        assert_eq!(claims().user_id().unwrap(), 42);

        let mut bad = claims();
        bad.sub = "not-a-number".to_owned();
        assert_eq!(bad.user_id().unwrap_err(), AuthError::TokenInvalid);
    }

    #[test]
    fn test_lifetime() {
        assert_eq!(claims().lifetime_secs(), 900);
    }

    #[test]
    fn test_subject_roundtrip() {
        let subject = claims().subject().unwrap();
        assert_eq!(subject.user_id, 42);
        assert_eq!(subject.organization_id, Some(7));
        assert_eq!(subject.role, Role::Student);
    }
}
