use tonic::{Request, Response, Status};
use crate::grpc::api;
use crate::model::login::{Credential, LoginAttempt};
use crate::utils::context::ServiceContext;

pub async fn login_with_code(ctx: &ServiceContext, request: Request<api::CodeLoginRequest>)
    -> Result<Response<api::LoginResponse>, Status> {

    let jurisdiction = super::jurisdiction_header(&request);
    let request = request.into_inner();

    let attempt = LoginAttempt {
        email: request.email,
        jurisdiction,
        credential: Credential::SingleUseCode(request.single_use_code),
    };

    let account = ctx.authenticator().validate(&attempt, ctx.now()).await?;
    Ok(Response::new(super::login_response(account)))
}
