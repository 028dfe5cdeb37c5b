use tonic::{Request, Response, Status};
use crate::{grpc::{api, common}, utils::context::ServiceContext};

pub async fn verify_email(ctx: &ServiceContext, request: Request<api::VerifyEmailRequest>)
    -> Result<Response<common::Empty>, Status> {

    ctx.accounts().verify_email(&request.into_inner().token).await?;
    Ok(Response::new(common::Empty::default()))
}
