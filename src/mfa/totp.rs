//! Time-based one-time password primitives.

use totp_rs::{Algorithm, Secret, TOTP};

use crate::AuthError;

/// Code length shown in authenticator apps.
pub const DIGITS: usize = 6;

/// Time-step size in seconds.
pub const STEP_SECONDS: u64 = 30;

/// Accepted clock skew, in steps on each side of now (±60s).
pub const SKEW_STEPS: i64 = 2;

/// Generates a fresh base32-encoded shared secret.
pub fn generate_secret() -> String {
    Secret::generate_secret().to_encoded().to_string()
}

/// The current TOTP step for a unix timestamp.
pub fn current_step(now_unix: u64) -> u64 {
    now_unix / STEP_SECONDS
}

/// The `otpauth://` URI to render as a QR code at enrollment.
pub fn provisioning_uri(secret: &str, issuer: &str, account: &str) -> Result<String, AuthError> {
    Ok(build(secret, Some(issuer), account)?.get_url())
}

/// Checks a code against the skew window around `now_unix`.
///
/// Returns the step the code matched at, so callers can enforce
/// single-use per step; `None` means no step in the window produced the
/// code.
pub fn verify_at(secret: &str, code: &str, now_unix: u64) -> Result<Option<u64>, AuthError> {
    let totp = build(secret, None, "account")?;
    let step = current_step(now_unix);

    for offset in -SKEW_STEPS..=SKEW_STEPS {
        let Some(candidate) = step.checked_add_signed(offset) else {
            continue;
        };
        if totp.generate(candidate * STEP_SECONDS) == code {
            return Ok(Some(candidate));
        }
    }
    Ok(None)
}

fn build(secret: &str, issuer: Option<&str>, account: &str) -> Result<TOTP, AuthError> {
    let bytes = Secret::Encoded(secret.to_owned())
        .to_bytes()
        .map_err(|_| AuthError::ConfigurationError("malformed totp secret".to_owned()))?;

    TOTP::new(
        Algorithm::SHA1,
        DIGITS,
        1,
        STEP_SECONDS,
        bytes,
        issuer.map(str::to_owned),
        account.to_owned(),
    )
    .map_err(|_| AuthError::ConfigurationError("malformed totp secret".to_owned()))
}
