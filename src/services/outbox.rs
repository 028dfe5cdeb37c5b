use tonic::{Request, Response, Status};
use crate::{grpc::admin, utils::{context::ServiceContext, secrets}};

///
/// Mail captured for an address. Fails if the service isn't using the outbox mailer.
///
pub async fn outbox(ctx: &ServiceContext, request: Request<admin::OutboxRequest>)
    -> Result<Response<admin::OutboxResponse>, Status> {

    let outbox = ctx.outbox()
        .ok_or_else(|| Status::failed_precondition("The outbox mailer is not enabled"))?;

    let mail = outbox.messages_for(&secrets::normalize_email(&request.into_inner().email))
        .into_iter()
        .map(|mail| admin::Mail { to: mail.to, subject: mail.subject, body: mail.body })
        .collect();

    Ok(Response::new(admin::OutboxResponse { mail }))
}
