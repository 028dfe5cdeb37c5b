use tonic::{Request, Response, Status};
use crate::{grpc::{api, common}, utils::context::ServiceContext};

///
/// The response is the same whether or not the email is registered.
///
pub async fn forgot_password(ctx: &ServiceContext, request: Request<api::ForgotPasswordRequest>)
    -> Result<Response<common::Empty>, Status> {

    let origin = super::origin(&request);
    ctx.resets().request(&request.into_inner().email, &origin).await?;
    Ok(Response::new(common::Empty::default()))
}
