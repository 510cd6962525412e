mod login_with_code;
mod login_with_password;
mod request_code;
mod reset_time;
mod set_time;

use std::sync::Arc;
use tracing::instrument;
use tonic::{Request, Response, Status};
use crate::grpc::{admin, api, common};
use crate::grpc::api::gatehouse_server::Gatehouse;
use crate::grpc::admin::admin_server::Admin;
use crate::model::account::Account;
use crate::utils::context::ServiceContext;

pub const JURISDICTION_METADATA_KEY: &str = "jurisdictionname";

///
/// Implementation for all the gRPC service endpoints defined in the .proto files.
///
#[tonic::async_trait]
impl Gatehouse for Arc<ServiceContext> {

    #[instrument(skip(self, request))]
    async fn login_with_password(&self, request: Request<api::PasswordLoginRequest>) -> Result<Response<api::LoginResponse>, Status> {
        login_with_password::login_with_password(self, request).await
    }

    #[instrument(skip(self, request))]
    async fn login_with_code(&self, request: Request<api::CodeLoginRequest>) -> Result<Response<api::LoginResponse>, Status> {
        login_with_code::login_with_code(self, request).await
    }

    #[instrument(skip(self, request))]
    async fn request_code(&self, request: Request<api::RequestCodeRequest>) -> Result<Response<api::RequestCodeResponse>, Status> {
        request_code::request_code(self, request).await
    }
}

#[tonic::async_trait]
impl Admin for Arc<ServiceContext> {
    async fn ping(&self, _request: Request<common::Empty>) -> Result<Response<common::Empty>, Status> {
        Ok(Response::new(common::Empty::default()))
    }

    async fn set_time(&self, request: Request<admin::NewTime>) -> Result<Response<common::Empty>, Status> {
        set_time::set_time(self, request).await
    }

    async fn reset_time(&self, request: Request<common::Empty>) -> Result<Response<common::Empty>, Status> {
        reset_time::reset_time(self, request).await
    }
}

///
/// Pull the jurisdiction name out of the request metadata - the gRPC analogue of
/// the HTTP header the web tier forwards. None means the caller didn't send one.
///
pub(crate) fn jurisdiction_header<T>(request: &Request<T>) -> Option<String> {
    request.metadata()
        .get(JURISDICTION_METADATA_KEY)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string())
}

pub(crate) fn login_response(account: Account) -> api::LoginResponse {
    api::LoginResponse {
        account_id: account.account_id,
        email: account.email,
        mfa_enabled: account.mfa_enabled,
        phone_number_verified: account.phone_number_verified,
    }
}
