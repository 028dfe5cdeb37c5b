use bson::DateTime;
use tonic::{Request, Response, Status};
use crate::{grpc::admin, utils::{context::ServiceContext, secrets}};

pub async fn login_history(ctx: &ServiceContext, request: Request<admin::LoginHistoryRequest>)
    -> Result<Response<admin::LoginHistoryResponse>, Status> {

    let request = request.into_inner();
    let attempts = ctx.store()
        .attempts_since(&secrets::normalize_email(&request.email), DateTime::from_millis(request.since))
        .await?;

    Ok(Response::new(admin::LoginHistoryResponse {
        attempts: attempts.iter().map(admin::LoginAttempt::from).collect(),
    }))
}
