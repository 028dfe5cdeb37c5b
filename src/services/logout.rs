use tonic::{Request, Response, Status};
use crate::{grpc::common, utils::context::ServiceContext};

pub async fn logout(ctx: &ServiceContext, request: Request<common::Empty>)
    -> Result<Response<common::Empty>, Status> {

    let auth = super::authenticate(ctx, &request).await?;
    ctx.sessions().logout(&auth).await?;
    Ok(Response::new(common::Empty::default()))
}
