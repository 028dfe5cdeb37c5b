use tonic::{Request, Response, Status};
use crate::{grpc::{api, common}, utils::context::ServiceContext};

///
/// Never fails for a bad or missing token, it just reports the caller as not authenticated.
///
pub async fn session_status(ctx: &ServiceContext, request: Request<common::Empty>)
    -> Result<Response<api::SessionStatusResponse>, Status> {

    let status = ctx.sessions().session_status(super::token_from(&request)).await?;

    Ok(Response::new(api::SessionStatusResponse {
        authenticated: status.authenticated,
        account_id: status.account_id.unwrap_or_default(),
        issued_at: status.issued_at.map(|at| at.timestamp_millis()).unwrap_or_default(),
        expires_at: status.expires_at.map(|at| at.timestamp_millis()).unwrap_or_default(),
    }))
}
