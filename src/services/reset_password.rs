use tonic::{Request, Response, Status};
use crate::{grpc::{api, common}, utils::{context::ServiceContext, errors::ErrorCode}};

pub async fn reset_password(ctx: &ServiceContext, request: Request<api::ResetPasswordRequest>)
    -> Result<Response<common::Empty>, Status> {

    let request = request.into_inner();
    if request.new_password.is_empty() {
        return Err(ErrorCode::InvalidRequest.with_msg("A new password is required").into())
    }

    ctx.resets().redeem(&request.token, &request.new_password).await?;
    Ok(Response::new(common::Empty::default()))
}
