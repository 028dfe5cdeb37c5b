use tonic::{Request, Response, Status};
use crate::{grpc::{api, common}, utils::context::ServiceContext};

pub async fn get_profile(ctx: &ServiceContext, request: Request<common::Empty>)
    -> Result<Response<api::Profile>, Status> {

    let auth = super::authenticate(ctx, &request).await?;
    let account = ctx.accounts().profile(&auth).await?;
    Ok(Response::new((&account).into()))
}
