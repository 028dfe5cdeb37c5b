mod delete_account;
mod deactivate_account;
mod forgot_password;
mod get_profile;
mod login;
mod login_history;
mod logout;
mod logout_all;
mod outbox;
mod reset_password;
mod reset_time;
mod restore_account;
mod session_status;
mod set_time;
mod signup;
mod sweep_revoked;
mod update_profile;
mod verify_email;

use std::sync::Arc;
use tracing::instrument;
use tonic::{Request, Response, Status};
use crate::grpc::{api, admin, common};
use crate::grpc::api::warden_server::Warden;
use crate::grpc::admin::admin_server::Admin;
use crate::auth::{session::AuthContext, validator};
use crate::utils::{context::ServiceContext, errors::WardenError};

const AUTHORIZATION: &str = "authorization";
const FORWARDED_FOR: &str = "x-forwarded-for";
const REAL_IP: &str = "x-real-ip";
const UNKNOWN_ORIGIN: &str = "unknown";

///
/// Implemention for all the public gRPC service endpoints defined in warden.proto.
///
#[tonic::async_trait]
impl Warden for Arc<ServiceContext> {
    #[instrument(skip(self, request))]
    async fn signup(&self, request: Request<api::SignupRequest>) -> Result<Response<api::SignupResponse>, Status> {
        signup::signup(self, request).await
    }

    #[instrument(skip(self, request))]
    async fn verify_email(&self, request: Request<api::VerifyEmailRequest>) -> Result<Response<common::Empty>, Status> {
        verify_email::verify_email(self, request).await
    }

    #[instrument(skip(self, request))]
    async fn login(&self, request: Request<api::LoginRequest>) -> Result<Response<api::LoginResponse>, Status> {
        login::login(self, request).await
    }

    #[instrument(skip(self, request))]
    async fn logout(&self, request: Request<common::Empty>) -> Result<Response<common::Empty>, Status> {
        logout::logout(self, request).await
    }

    #[instrument(skip(self, request))]
    async fn logout_all(&self, request: Request<common::Empty>) -> Result<Response<common::Empty>, Status> {
        logout_all::logout_all(self, request).await
    }

    #[instrument(skip(self, request))]
    async fn session_status(&self, request: Request<common::Empty>) -> Result<Response<api::SessionStatusResponse>, Status> {
        session_status::session_status(self, request).await
    }

    #[instrument(skip(self, request))]
    async fn forgot_password(&self, request: Request<api::ForgotPasswordRequest>) -> Result<Response<common::Empty>, Status> {
        forgot_password::forgot_password(self, request).await
    }

    #[instrument(skip(self, request))]
    async fn reset_password(&self, request: Request<api::ResetPasswordRequest>) -> Result<Response<common::Empty>, Status> {
        reset_password::reset_password(self, request).await
    }

    #[instrument(skip(self, request))]
    async fn get_profile(&self, request: Request<common::Empty>) -> Result<Response<api::Profile>, Status> {
        get_profile::get_profile(self, request).await
    }

    #[instrument(skip(self, request))]
    async fn update_profile(&self, request: Request<api::UpdateProfileRequest>) -> Result<Response<api::Profile>, Status> {
        update_profile::update_profile(self, request).await
    }

    #[instrument(skip(self, request))]
    async fn deactivate_account(&self, request: Request<common::Empty>) -> Result<Response<common::Empty>, Status> {
        deactivate_account::deactivate_account(self, request).await
    }

    #[instrument(skip(self, request))]
    async fn delete_account(&self, request: Request<common::Empty>) -> Result<Response<api::DeletionSummary>, Status> {
        delete_account::delete_account(self, request).await
    }
}

#[tonic::async_trait]
impl Admin for Arc<ServiceContext> {
    async fn ping(&self, _request: Request<common::Empty>) -> Result<Response<common::Empty>, Status> {
        Ok(Response::new(common::Empty::default()))
    }

    async fn set_time(&self, request: Request<admin::NewTime>) -> Result<Response<common::Empty>, Status> {
        set_time::set_time(self, request).await
    }

    async fn reset_time(&self, request: Request<common::Empty>) -> Result<Response<common::Empty>, Status> {
        reset_time::reset_time(self, request).await
    }

    #[instrument(skip(self, request))]
    async fn sweep_revoked(&self, request: Request<common::Empty>) -> Result<Response<admin::SweepResponse>, Status> {
        sweep_revoked::sweep_revoked(self, request).await
    }

    #[instrument(skip(self, request))]
    async fn restore_account(&self, request: Request<admin::RestoreRequest>) -> Result<Response<common::Empty>, Status> {
        restore_account::restore_account(self, request).await
    }

    async fn outbox(&self, request: Request<admin::OutboxRequest>) -> Result<Response<admin::OutboxResponse>, Status> {
        outbox::outbox(self, request).await
    }

    #[instrument(skip(self, request))]
    async fn login_history(&self, request: Request<admin::LoginHistoryRequest>) -> Result<Response<admin::LoginHistoryResponse>, Status> {
        login_history::login_history(self, request).await
    }
}

///
/// The bearer token from the request's authorization header, if there is one.
///
fn token_from<T>(request: &Request<T>) -> Option<&str> {
    validator::bearer_token(request.metadata()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok()))
}

///
/// Resolve the caller for operations that need a session. No header at all is
/// NotAuthenticated, a bad token is whatever the validator says.
///
async fn authenticate<T>(ctx: &ServiceContext, request: &Request<T>) -> Result<AuthContext, WardenError> {
    let auth = match token_from(request) {
        Some(token) => Some(ctx.sessions().authenticate(token).await?),
        None => None,
    };
    AuthContext::require(auth)
}

///
/// Best-effort client address for the attempt log. A proxy's forwarding headers win over the
/// socket address.
///
fn origin<T>(request: &Request<T>) -> String {
    let header = |name: &str| request.metadata()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string);

    header(FORWARDED_FOR)
        .or_else(|| header(REAL_IP))
        .or_else(|| request.remote_addr().map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| UNKNOWN_ORIGIN.to_string())
}
