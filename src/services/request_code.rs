use tonic::{Request, Response, Status};
use crate::grpc::api;
use crate::utils::context::ServiceContext;

///
/// Issue a fresh single-use login code for the account. The code goes back to the
/// caller - delivering it to the user (email/SMS) is the caller's job.
///
pub async fn request_code(ctx: &ServiceContext, request: Request<api::RequestCodeRequest>)
    -> Result<Response<api::RequestCodeResponse>, Status> {

    let jurisdiction = super::jurisdiction_header(&request);
    let request = request.into_inner();

    let single_use_code = ctx.authenticator()
        .issue_code(&request.email, jurisdiction.as_deref(), ctx.now())
        .await?;

    Ok(Response::new(api::RequestCodeResponse { single_use_code }))
}
