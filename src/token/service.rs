use std::sync::Arc;

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};

use super::claims::{Claims, TokenKind, TokenSubject};
use super::config::TokenConfig;
use super::rotation::RefreshRotationStore;
use crate::crypto::generate_token;
use crate::AuthError;

/// Length of the token id (jti) in characters.
const JTI_LENGTH: usize = 16;

/// A freshly issued access/refresh token pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

/// Issues and verifies signed token pairs.
///
/// Verification is pure; only `refresh` touches shared state (the rotation
/// registry). All verification failures surface as the single
/// `TokenInvalid` so callers cannot distinguish a forged token from an
/// expired one; the distinction is logged server-side.
#[derive(Clone)]
pub struct TokenService {
    config: TokenConfig,
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    rotation: Arc<dyn RefreshRotationStore>,
}

impl TokenService {
    pub fn new(config: TokenConfig, rotation: Arc<dyn RefreshRotationStore>) -> Self {
        let access_encoding = EncodingKey::from_secret(config.access_secret.as_bytes());
        let access_decoding = DecodingKey::from_secret(config.access_secret.as_bytes());
        let refresh_encoding = EncodingKey::from_secret(config.refresh_secret.as_bytes());
        let refresh_decoding = DecodingKey::from_secret(config.refresh_secret.as_bytes());

        Self {
            config,
            access_encoding,
            access_decoding,
            refresh_encoding,
            refresh_decoding,
            rotation,
        }
    }

    /// Issues a new pair tied to a session.
    ///
    /// The refresh token's lifetime is picked from the standard or extended
    /// (remember-me) duration; the chosen class stays inferable from the
    /// token's own `exp - iat` delta.
    pub fn issue_pair(
        &self,
        subject: &TokenSubject,
        session_id: &str,
        remember_me: bool,
    ) -> Result<TokenPair, AuthError> {
        let access_token = self.encode(subject, session_id, TokenKind::Access, remember_me)?;
        let refresh_token = self.encode(subject, session_id, TokenKind::Refresh, remember_me)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_in: self.config.access_expiry.num_seconds(),
        })
    }

    /// Verifies an access token and returns its claims.
    pub fn verify_access(&self, token: &str) -> Result<Claims, AuthError> {
        let claims = self.decode(token, &self.access_decoding)?;
        if !claims.is_access() {
            return Err(AuthError::TokenInvalid);
        }
        Ok(claims)
    }

    /// Verifies a refresh token and returns its claims.
    pub fn verify_refresh(&self, token: &str) -> Result<Claims, AuthError> {
        let claims = self.decode(token, &self.refresh_decoding)?;
        if !claims.is_refresh() {
            return Err(AuthError::TokenInvalid);
        }
        Ok(claims)
    }

    /// Exchanges a refresh token for a brand-new pair, consuming it.
    ///
    /// Rotation is mandatory: the old token's jti is recorded and any replay
    /// of it fails with `TokenInvalid`. The remember-me class is taken from
    /// `remember_me` when the caller knows it (e.g. from the session
    /// record), falling back to the lifetime-delta heuristic for
    /// compatibility with tokens issued before the session flag existed.
    pub async fn refresh(
        &self,
        refresh_token: &str,
        remember_me: Option<bool>,
    ) -> Result<TokenPair, AuthError> {
        let claims = self.verify_refresh(refresh_token)?;

        let expires_at = chrono::DateTime::from_timestamp(claims.exp, 0)
            .ok_or(AuthError::TokenInvalid)?;
        if !self.rotation.consume(&claims.jti, expires_at).await? {
            log::warn!(
                target: "palisade_token",
                "msg=\"refresh_token_replay\" sid={}",
                claims.sid
            );
            return Err(AuthError::TokenInvalid);
        }

        let remember_me = remember_me.unwrap_or_else(|| {
            // Fallback heuristic: an extended-class token was issued with a
            // lifetime longer than the standard refresh duration.
            claims.lifetime_secs() > self.config.refresh_expiry.num_seconds()
        });

        let subject = claims.subject()?;
        self.issue_pair(&subject, &claims.sid, remember_me)
    }

    fn encode(
        &self,
        subject: &TokenSubject,
        session_id: &str,
        kind: TokenKind,
        remember_me: bool,
    ) -> Result<String, AuthError> {
        let now = Utc::now();
        let expiry = match kind {
            TokenKind::Access => self.config.access_expiry,
            TokenKind::Refresh if remember_me => self.config.extended_refresh_expiry,
            TokenKind::Refresh => self.config.refresh_expiry,
        };

        let claims = Claims {
            sub: subject.user_id.to_string(),
            email: subject.email.clone(),
            role: subject.role,
            org: subject.organization_id,
            sid: session_id.to_owned(),
            exp: (now + expiry).timestamp(),
            iat: now.timestamp(),
            jti: generate_token(JTI_LENGTH),
            kind,
            iss: self.config.issuer.clone(),
        };

        let key = match kind {
            TokenKind::Access => &self.access_encoding,
            TokenKind::Refresh => &self.refresh_encoding,
        };

        jsonwebtoken::encode(&Header::default(), &claims, key)
            .map_err(|_| AuthError::TokenInvalid)
    }

    fn decode(&self, token: &str, key: &DecodingKey) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp"]);
        if let Some(ref iss) = self.config.issuer {
            validation.set_issuer(&[iss]);
        }

        jsonwebtoken::decode::<Claims>(token, key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                // Logged distinctly, surfaced identically.
                if matches!(
                    e.kind(),
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature
                ) {
                    log::debug!(target: "palisade_token", "msg=\"token_expired\"");
                } else {
                    log::debug!(target: "palisade_token", "msg=\"token_rejected\"");
                }
                AuthError::TokenInvalid
            })
    }
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
