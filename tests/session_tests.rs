mod common;
use tonic::{Code, Request};
use chrono::{Duration, Utc};
use more_asserts::assert_le;
use warden::grpc::{api, common as pb};
use crate::common::{TestConfig, helper::{self, PASSWORD}, start_warden};


#[tokio::test]
async fn test_login_returns_a_working_session() {
    // Start the server if needed, and ensure this test has exclusive access.
    let mut ctx = start_warden(TestConfig::default()).await;

    let email = helper::unique_email();
    let account_id = helper::active_account(&email, &mut ctx).await;

    // Logins are case and whitespace insensitive on the email.
    let response = helper::login(&format!("  {}  ", email.to_uppercase()), PASSWORD, &mut ctx).await.unwrap();
    let profile = response.profile.unwrap();
    assert_eq!(profile.account_id, account_id);
    assert_eq!(profile.email, email);
    assert_eq!(profile.status, "ACTIVE");

    let status = helper::session_status(&response.token, &mut ctx).await;
    assert!(status.authenticated);
    assert_eq!(status.account_id, account_id);
    assert_eq!(status.expires_at, response.expires_at);
    assert_eq!(status.expires_at - status.issued_at, 86_400_000);
    assert_le!(status.issued_at, Utc::now().timestamp_millis());
}


#[tokio::test]
async fn test_wrong_password_unknown_user_and_pending_account_look_the_same() {
    let mut ctx = start_warden(TestConfig::default()).await;

    let active = helper::unique_email();
    helper::active_account(&active, &mut ctx).await;

    let pending = helper::unique_email();
    helper::signup(&pending, &mut ctx).await;

    let attempts = [
        (active.as_str(), "not-the-password"),
        ("nobody-at-all@warden.test", PASSWORD),
        (pending.as_str(), PASSWORD),
    ];

    for (email, password) in &attempts {
        let status = helper::login(email, password, &mut ctx).await.unwrap_err();
        assert_eq!(status.code(), Code::Unauthenticated);
        assert_eq!(status.message(), "Invalid email or password");
        assert_eq!(helper::error_code(&status), 2100 /* InvalidCredentials */);
    }
}


#[tokio::test]
async fn test_account_locks_after_five_failures_and_unlocks_after_an_hour() {
    let mut ctx = start_warden(TestConfig::default()).await;

    let email = helper::unique_email();
    helper::active_account(&email, &mut ctx).await;

    let now = Utc::now();
    helper::set_time(now, &mut ctx).await;

    for _ in 0..5 {
        let status = helper::login(&email, "not-the-password", &mut ctx).await.unwrap_err();
        assert_eq!(helper::error_code(&status), 2100 /* InvalidCredentials */);
    }

    // The right password is refused while the lock is in place.
    let status = helper::login(&email, PASSWORD, &mut ctx).await.unwrap_err();
    assert_eq!(status.code(), Code::Unauthenticated);
    assert_eq!(helper::error_code(&status), 2101 /* AccountLocked */);

    helper::set_time(now + Duration::minutes(59), &mut ctx).await;
    let status = helper::login(&email, PASSWORD, &mut ctx).await.unwrap_err();
    assert_eq!(helper::error_code(&status), 2101 /* AccountLocked */);

    helper::set_time(now + Duration::hours(1), &mut ctx).await;
    assert!(helper::login(&email, PASSWORD, &mut ctx).await.is_ok());
}


#[tokio::test]
async fn test_logout_only_ends_the_presented_session() {
    let mut ctx = start_warden(TestConfig::default()).await;

    let email = helper::unique_email();
    helper::active_account(&email, &mut ctx).await;

    let laptop = helper::login_assert_ok(&email, &mut ctx).await;
    let phone = helper::login_assert_ok(&email, &mut ctx).await;

    ctx.client().logout(helper::empty(&laptop)).await.unwrap();

    // A second logout with the same token is rejected as it's no longer a valid session.
    let status = ctx.client().logout(helper::empty(&laptop)).await.unwrap_err();
    assert_eq!(status.code(), Code::Unauthenticated);

    assert!(!helper::session_status(&laptop, &mut ctx).await.authenticated);
    assert!(helper::session_status(&phone, &mut ctx).await.authenticated);
    assert!(ctx.client().get_profile(helper::empty(&phone)).await.is_ok());
}


#[tokio::test]
async fn test_logout_all_ends_every_session() {
    let mut ctx = start_warden(TestConfig::default()).await;

    let email = helper::unique_email();
    helper::active_account(&email, &mut ctx).await;

    let laptop = helper::login_assert_ok(&email, &mut ctx).await;
    let phone = helper::login_assert_ok(&email, &mut ctx).await;

    ctx.client().logout_all(helper::empty(&phone)).await.unwrap();

    for token in &[&laptop, &phone] {
        let status = ctx.client().get_profile(helper::empty(token)).await.unwrap_err();
        assert_eq!(status.code(), Code::Unauthenticated);
        assert_eq!(helper::error_code(&status), 3000 /* NotAuthenticated */);
    }

    // Sessions started afterwards are unaffected.
    let tablet = helper::login_assert_ok(&email, &mut ctx).await;
    assert!(helper::session_status(&tablet, &mut ctx).await.authenticated);
}


#[tokio::test]
async fn test_token_stops_working_when_it_expires() {
    let mut ctx = start_warden(TestConfig::default()).await;

    let email = helper::unique_email();
    helper::active_account(&email, &mut ctx).await;

    let now = Utc::now();
    helper::set_time(now, &mut ctx).await;
    let token = helper::login_assert_ok(&email, &mut ctx).await;

    helper::set_time(now + Duration::hours(23), &mut ctx).await;
    assert!(helper::session_status(&token, &mut ctx).await.authenticated);

    helper::set_time(now + Duration::hours(24), &mut ctx).await;
    let status = helper::session_status(&token, &mut ctx).await;
    assert!(!status.authenticated);
    assert_eq!(status.account_id, "");
}


#[tokio::test]
async fn test_protected_calls_need_a_valid_bearer_token() {
    let mut ctx = start_warden(TestConfig::default()).await;

    let status = ctx.client().get_profile(Request::new(pb::Empty::default())).await.unwrap_err();
    assert_eq!(status.code(), Code::Unauthenticated);
    assert_eq!(helper::error_code(&status), 3000 /* NotAuthenticated */);

    for token in &["garbage", "a.b.c", "eyJhbGciOiJub25lIn0.e30."] {
        let status = ctx.client().get_profile(helper::empty(token)).await.unwrap_err();
        assert_eq!(status.code(), Code::Unauthenticated);
        assert_eq!(status.message(), "Not authenticated");
        assert_eq!(helper::error_code(&status), 3000 /* NotAuthenticated */);
    }

    // Session status never fails, it just reports no session.
    let status = ctx.client().session_status(Request::new(pb::Empty::default())).await.unwrap().into_inner();
    assert_eq!(status, api::SessionStatusResponse::default());
}
