use tonic::{Request, Response, Status};
use crate::{grpc::{admin, common}, utils::context::ServiceContext};

pub async fn sweep_revoked(ctx: &ServiceContext, _request: Request<common::Empty>)
    -> Result<Response<admin::SweepResponse>, Status> {

    let purged = ctx.registry().sweep().await?;
    Ok(Response::new(admin::SweepResponse { purged }))
}
