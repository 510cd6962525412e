use tokio::task::JoinError;
use tonic::{Code, Status};
use bson::document::ValueAccessError;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ErrorCode {
    TonicStartError           = 0400,
    HashThreadingIssue        = 0401,
    IOError                   = 0402,
    UnableToReadCredentials   = 0500,
    InvalidAddress            = 0501,
    MongoDBError              = 0503,
    InvalidBSON               = 0504,
    InvalidJSON               = 0505,
    BSONFieldNotFound         = 0507,
    HashingError              = 0509,
    MissingJurisdictionHeader = 1000,
    JurisdictionNotConfigured = 1001,
    AccountNotFound           = 2100,
    AccountLocked             = 2102,
    InvalidCredential         = 2103,
}

impl ErrorCode {
    pub fn with_msg(&self, message: &str) -> GateError {
        GateError::new(*self, message)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GateError {
    error_code: ErrorCode,
    message: String,
}

impl GateError {
    pub fn new(error_code: ErrorCode, message: &str) -> Self {
        GateError { error_code, message: message.to_string() }
    }

    pub fn error_code(&self) -> ErrorCode {
        self.error_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<tonic::transport::Error> for GateError {
    fn from(error: tonic::transport::Error) -> Self {
        ErrorCode::TonicStartError.with_msg(&format!("Failed to start gRPC server: {}", error))
    }
}

impl From<argon2::password_hash::Error> for GateError {
    fn from(error: argon2::password_hash::Error) -> Self {
        ErrorCode::HashingError.with_msg(&format!("Unable to hash password: {}", error))
    }
}

impl From<serde_json::Error> for GateError {
    fn from(error: serde_json::Error) -> Self {
        ErrorCode::InvalidJSON.with_msg(&format!("Unable to convert to json: {}", error))
    }
}

impl From<mongodb::error::Error> for GateError {
    fn from(error: mongodb::error::Error) -> Self {
        ErrorCode::MongoDBError.with_msg(&format!("MongoDB error: {}", error))
    }
}

impl From<ValueAccessError> for GateError {
    fn from(error: ValueAccessError) -> Self {
        ErrorCode::BSONFieldNotFound.with_msg(&format!("Unable to read BSON: {}", error))
    }
}

impl From<bson::ser::Error> for GateError {
    fn from(error: bson::ser::Error) -> Self {
        ErrorCode::InvalidBSON.with_msg(&format!("Unable to serialise BSON: {}", error))
    }
}

impl From<bson::de::Error> for GateError {
    fn from(error: bson::de::Error) -> Self {
        ErrorCode::InvalidBSON.with_msg(&format!("Unable to deserialise BSON: {}", error))
    }
}

impl From<JoinError> for GateError {
    fn from(error: JoinError) -> Self {
        ErrorCode::HashThreadingIssue.with_msg(&format!("Unable to verify: {}", error))
    }
}

///
/// Convert our internal error into a gRPC status response.
///
/// The three authentication failures all go out as a bare 'Unauthorized' so the
/// response can't be used to tell a wrong credential from an unknown or locked
/// account - the detailed message only goes to the log.
///
impl From<GateError> for Status {
    fn from(error: GateError) -> Self {
        use ErrorCode::*;

        let code = match &error.error_code {
            TonicStartError         |
            HashThreadingIssue      |
            IOError                 |
            UnableToReadCredentials |
            InvalidAddress          |
            MongoDBError            |
            InvalidBSON             |
            InvalidJSON             |
            BSONFieldNotFound       |
            HashingError => Code::Internal,

            MissingJurisdictionHeader |
            JurisdictionNotConfigured => Code::InvalidArgument,

            AccountNotFound |
            AccountLocked   |
            InvalidCredential => Code::Unauthenticated,
        };

        let message = match code {
            Code::Unauthenticated => {
                tracing::info!("Rejecting login: {} ({})", error.message, error.error_code as u32);
                "Unauthorized".to_string()
            },
            _ => error.message,
        };

        Status::with_details(code, message, format!("{}", error.error_code as u32).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_failures_surface_uniformly() {
        for error_code in [ErrorCode::AccountNotFound, ErrorCode::AccountLocked, ErrorCode::InvalidCredential] {
            let status = Status::from(error_code.with_msg("internal detail"));
            assert_eq!(status.code(), Code::Unauthenticated);
            assert_eq!(status.message(), "Unauthorized");
        }
    }

    #[test]
    fn caller_errors_keep_their_message() {
        let status = Status::from(ErrorCode::MissingJurisdictionHeader
            .with_msg("jurisdictionname is missing from the request metadata"));
        assert_eq!(status.code(), Code::InvalidArgument);
        assert_eq!(status.message(), "jurisdictionname is missing from the request metadata");
        assert_eq!(status.details(), "1000".as_bytes());
    }
}
