use tonic::{Request, Response, Status};
use crate::{grpc::api, model::account::{NewAccount, non_empty}, utils::context::ServiceContext};

///
/// Register a pending account. The verification link goes out by email.
///
pub async fn signup(ctx: &ServiceContext, request: Request<api::SignupRequest>)
    -> Result<Response<api::SignupResponse>, Status> {

    let request = request.into_inner();
    let details = NewAccount {
        email: request.email,
        first_name: request.first_name,
        last_name: request.last_name,
        organization: non_empty(request.organization),
        job_role: non_empty(request.job_role),
    };

    let account_id = ctx.accounts().signup(details, &request.password).await?;
    Ok(Response::new(api::SignupResponse { account_id }))
}
