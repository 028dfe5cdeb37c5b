use tonic::{Request, Response, Status};
use crate::{grpc::api, utils::context::ServiceContext};

///
/// Check the credentials and hand back a signed session token with the caller's profile.
///
pub async fn login(ctx: &ServiceContext, request: Request<api::LoginRequest>)
    -> Result<Response<api::LoginResponse>, Status> {

    let origin = super::origin(&request);
    let request = request.into_inner();

    let account = ctx.sessions().login(&request.email, &request.password, &origin).await?;
    let issued = ctx.sessions().issue(&account)?;

    Ok(Response::new(api::LoginResponse {
        token: issued.token,
        expires_at: issued.claims.exp * 1000,
        profile: Some((&account).into()),
    }))
}
