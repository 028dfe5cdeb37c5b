use tonic::{Request, Response, Status};
use crate::{grpc::api, model::account::ProfileUpdate, utils::context::ServiceContext};

///
/// Blank fields on the request are left as they are.
///
pub async fn update_profile(ctx: &ServiceContext, request: Request<api::UpdateProfileRequest>)
    -> Result<Response<api::Profile>, Status> {

    let auth = super::authenticate(ctx, &request).await?;
    let update = ProfileUpdate::from(request.into_inner());

    let account = ctx.accounts().update_profile(&auth, &update).await?;
    Ok(Response::new((&account).into()))
}
