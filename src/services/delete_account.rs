use tonic::{Request, Response, Status};
use crate::{grpc::{api, common}, utils::context::ServiceContext};

pub async fn delete_account(ctx: &ServiceContext, request: Request<common::Empty>)
    -> Result<Response<api::DeletionSummary>, Status> {

    let auth = super::authenticate(ctx, &request).await?;
    let summary = ctx.accounts().hard_delete(&auth).await?;

    Ok(Response::new(api::DeletionSummary {
        accounts: summary.accounts,
        credentials: summary.credentials,
        login_attempts: summary.login_attempts,
        reset_tokens: summary.reset_tokens,
        revoked_tokens: summary.revoked_tokens,
    }))
}
