mod common;
use tonic::{Code, Request};
use chrono::{Duration, Utc};
use warden::grpc::{admin, common as pb};
use crate::common::{TestConfig, helper::{self, PASSWORD}, start_warden};


#[tokio::test]
async fn test_admin_service_is_not_served_by_default() {
    let mut ctx = start_warden(TestConfig::without_admin()).await;

    let status = ctx.admin().set_time(Request::new(admin::NewTime { new_time: (Utc::now() + Duration::days(2)).to_rfc3339() }))
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::Unimplemented);

    let status = ctx.admin().reset_time(Request::new(pb::Empty::default())).await.unwrap_err();
    assert_eq!(status.code(), Code::Unimplemented);

    let status = ctx.admin().outbox(Request::new(admin::OutboxRequest { email: helper::unique_email() }))
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::Unimplemented);

    let status = ctx.admin().restore_account(Request::new(admin::RestoreRequest { account_id: "anyone".to_string() }))
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::Unimplemented);

    let status = ctx.admin().login_history(Request::new(admin::LoginHistoryRequest { email: helper::unique_email(), since: 0 }))
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::Unimplemented);
}

#[tokio::test]
async fn test_public_service_is_unaffected_when_admin_is_off() {
    let mut ctx = start_warden(TestConfig::without_admin()).await;

    let email = helper::unique_email();
    helper::signup(&email, &mut ctx).await;

    // The account can't be verified without the outbox, so it stays pending and can't log in.
    let status = helper::login(&email, PASSWORD, &mut ctx).await.unwrap_err();
    assert_eq!(helper::error_code(&status), 2100 /* InvalidCredentials */);

    let status = ctx.client().session_status(Request::new(pb::Empty::default())).await.unwrap();
    assert!(!status.into_inner().authenticated);
}
