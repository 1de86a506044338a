//! End-to-end journeys through the auth flows against in-memory stores.

mod common;

use common::{login_request, register_request, Stack, PASSWORD};
use palisade::config::AuthConfig;
use palisade::flows::{AuthenticatedSession, LoginOutcome, RegisterOutcome};

fn registered_session(outcome: RegisterOutcome) -> (AuthenticatedSession, String) {
    match outcome {
        RegisterOutcome::Registered {
            session: Some(session),
            verification_token,
            ..
        } => (session, verification_token),
        other => panic!("expected an active registration, got {other:?}"),
    }
}

#[tokio::test]
async fn register_login_refresh_logout() {
    let stack = Stack::new(AuthConfig::default());

    let outcome = stack
        .register_flow()
        .execute(register_request("ada@example.com"))
        .await
        .unwrap();
    let (initial, _) = registered_session(outcome);
    assert_eq!(initial.user.email, "ada@example.com");

    // A fresh login creates a second, independent session.
    let outcome = stack
        .login_flow()
        .execute(login_request("ada@example.com", PASSWORD))
        .await
        .unwrap();
    let LoginOutcome::Success(login) = outcome else {
        panic!("expected login success");
    };
    assert_ne!(login.session_id, initial.session_id);

    // Refresh rotates the pair but keeps the session.
    let refreshed = stack
        .refresh_flow()
        .execute(&login.tokens.refresh_token)
        .await
        .unwrap();
    let claims = stack
        .sessions
        .token_service()
        .verify_access(&refreshed.access_token)
        .unwrap();
    assert_eq!(claims.sid, login.session_id);

    // Logout ends the session; refresh tokens bound to it die with it.
    stack
        .logout_flow()
        .execute(&refreshed.access_token)
        .await
        .unwrap();
    assert!(stack
        .refresh_flow()
        .execute(&refreshed.refresh_token)
        .await
        .is_err());

    // The registration session is untouched.
    assert!(stack
        .sessions
        .validate_session(&initial.session_id, Some(&initial.session_token))
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn gated_registration_requires_email_verification() {
    let stack = Stack::new(AuthConfig::strict());

    let outcome = stack
        .register_flow()
        .execute(register_request("ada@example.com"))
        .await
        .unwrap();
    let RegisterOutcome::Registered {
        session,
        verification_token,
        ..
    } = outcome
    else {
        panic!("expected registration");
    };
    assert!(session.is_none(), "tokens must be withheld until verification");

    // Login is refused until the email is verified.
    let outcome = stack
        .login_flow()
        .execute(login_request("ada@example.com", PASSWORD))
        .await
        .unwrap();
    assert!(matches!(outcome, LoginOutcome::EmailVerificationRequired));

    stack
        .verify_email_flow()
        .execute(&verification_token)
        .await
        .unwrap();

    let outcome = stack
        .login_flow()
        .execute(login_request("ada@example.com", PASSWORD))
        .await
        .unwrap();
    assert!(matches!(outcome, LoginOutcome::Success(_)));
}

#[tokio::test]
async fn password_reset_journey() {
    let stack = Stack::new(AuthConfig::default());
    stack
        .register_flow()
        .execute(register_request("ada@example.com"))
        .await
        .unwrap();

    let token = match stack
        .forgot_password_flow()
        .execute("ada@example.com", &common::client())
        .await
        .unwrap()
    {
        palisade::flows::ForgotPasswordOutcome::Accepted {
            reset_token: Some(token),
        } => token,
        other => panic!("expected a reset token, got {other:?}"),
    };

    stack
        .reset_password_flow()
        .execute(&token, "a whole new passphrase")
        .await
        .unwrap();

    // Old password dead, new one works.
    let outcome = stack
        .login_flow()
        .execute(login_request("ada@example.com", PASSWORD))
        .await
        .unwrap();
    assert!(matches!(outcome, LoginOutcome::InvalidCredentials));

    let outcome = stack
        .login_flow()
        .execute(login_request("ada@example.com", "a whole new passphrase"))
        .await
        .unwrap();
    assert!(matches!(outcome, LoginOutcome::Success(_)));
}

#[tokio::test]
async fn mfa_enrollment_changes_login_shape() {
    let stack = Stack::new(AuthConfig::default());
    let outcome = stack
        .register_flow()
        .execute(register_request("ada@example.com"))
        .await
        .unwrap();
    let (session, _) = registered_session(outcome);
    let user_id = session.user.id;

    let two_factor = stack.two_factor_flow();
    let enrollment = two_factor.setup(user_id).await.unwrap();
    assert!(two_factor
        .confirm(user_id, &common::totp_code(&enrollment.secret, -1))
        .await
        .unwrap());

    // Password alone now yields a two-factor demand.
    let outcome = stack
        .login_flow()
        .execute(login_request("ada@example.com", PASSWORD))
        .await
        .unwrap();
    assert!(matches!(outcome, LoginOutcome::TwoFactorRequired));

    // Password plus a current code succeeds.
    let mut request = login_request("ada@example.com", PASSWORD);
    request.two_factor_code = Some(common::totp_code(&enrollment.secret, 0));
    let outcome = stack.login_flow().execute(request).await.unwrap();
    let LoginOutcome::Success(login) = outcome else {
        panic!("expected login success with code");
    };

    // The session records that MFA was verified.
    let session = stack
        .sessions
        .validate_session(&login.session_id, Some(&login.session_token))
        .await
        .unwrap()
        .unwrap();
    assert!(session.metadata.mfa_verified);
}

#[tokio::test]
async fn security_summary_tracks_devices_and_locations() {
    let stack = Stack::new(AuthConfig::default());
    let outcome = stack
        .register_flow()
        .execute(register_request("ada@example.com"))
        .await
        .unwrap();
    let (session, _) = registered_session(outcome);
    let user_id = session.user.id;

    // A second login from another country on another device.
    let mut request = login_request("ada@example.com", PASSWORD);
    request.device = palisade::session::DeviceInfo::new("web", "Chrome", "Windows", "desktop");
    request.location = palisade::session::Location::new("198.51.100.7").with_geo("BR", "Recife");
    let outcome = stack.login_flow().execute(request).await.unwrap();
    assert!(matches!(outcome, LoginOutcome::Success(_)));

    let summary = stack.sessions.security_summary(user_id).await.unwrap();
    assert_eq!(summary.total_sessions, 2);
    assert_eq!(summary.active_sessions, 2);
    assert_eq!(summary.unique_devices, 2);
    assert_eq!(summary.unique_locations, 2);
    assert!(summary.suspicious_activity.multiple_locations);
    assert!(summary.last_login_at.is_some());
}
