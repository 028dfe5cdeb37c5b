use tonic::{Request, Response, Status};
use crate::{grpc::{admin, common}, utils::context::ServiceContext};

pub async fn restore_account(ctx: &ServiceContext, request: Request<admin::RestoreRequest>)
    -> Result<Response<common::Empty>, Status> {

    ctx.accounts().restore(&request.into_inner().account_id).await?;
    Ok(Response::new(common::Empty::default()))
}
