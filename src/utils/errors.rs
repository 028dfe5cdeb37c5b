use bcrypt::BcryptError;
use mongodb::bson;
use tokio::task::JoinError;
use tonic::{Code, Status};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ErrorCode {
    TonicStartError                 = 0400,
    HashThreadingIssue              = 0401,
    IOError                         = 0402,
    UnableToReadCredentials         = 0500,
    MongoDBError                    = 0503,
    InvalidBSON                     = 0504,
    InvalidJSON                     = 0505,
    InvalidAlgorithmConfig          = 0508,
    HashingError                    = 0509,
    InvalidPHCFormat                = 0510,
    InvalidConfig                   = 0511,
    TokenSigningError               = 0512,
    MailerError                     = 0513,
    InvalidRequest                  = 1000,
    InvalidCredentials              = 2100,
    AccountLocked                   = 2101,
    AccountNotFound                 = 2102,
    EmailAlreadyRegistered          = 2103,
    AccountNotInactive              = 2104,
    AccountAlreadyInactive          = 2105,
    NotAuthenticated                = 3000,
    TokenMalformed                  = 3001,
    TokenBadSignature               = 3002,
    TokenExpired                    = 3003,
    TokenRevoked                    = 3004,
    TokenSuperseded                 = 3005,
    ResetTokenInvalid               = 3100,
    VerificationTokenInvalid        = 3101,
}

impl ErrorCode {
    pub fn with_msg(&self, message: &str) -> WardenError {
        WardenError::new(*self, message)
    }

    ///
    /// Token rejections all look the same to a caller - only the logs know which check failed.
    ///
    pub fn is_token_rejection(&self) -> bool {
        use ErrorCode::*;
        matches!(self, NotAuthenticated | TokenMalformed | TokenBadSignature | TokenExpired | TokenRevoked | TokenSuperseded)
    }

    ///
    /// Internal codes mean something is broken, rather than the caller being denied.
    ///
    pub fn is_internal(&self) -> bool {
        (*self as u32) < 1000
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct WardenError {
    error_code: ErrorCode,
    message: String,
}

impl WardenError {
    pub fn new(error_code: ErrorCode, message: &str) -> Self {
        WardenError { error_code, message: message.to_string() }
    }

    pub fn error_code(&self) -> ErrorCode {
        self.error_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_internal(&self) -> bool {
        self.error_code.is_internal()
    }
}

impl std::fmt::Display for WardenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04} {}", self.error_code as u32, self.message)
    }
}

impl std::error::Error for WardenError {}

impl From<tonic::transport::Error> for WardenError {
    fn from(error: tonic::transport::Error) -> Self {
        ErrorCode::TonicStartError.with_msg(&format!("Failed to start gRPC server: {}", error))
    }
}

impl From<std::io::Error> for WardenError {
    fn from(error: std::io::Error) -> Self {
        ErrorCode::IOError.with_msg(&format!("IO error: {}", error))
    }
}

impl From<config::ConfigError> for WardenError {
    fn from(error: config::ConfigError) -> Self {
        ErrorCode::InvalidConfig.with_msg(&format!("The service configuration is not correct: {}", error))
    }
}

impl From<argon2::Error> for WardenError {
    fn from(error: argon2::Error) -> Self {
        ErrorCode::InvalidAlgorithmConfig.with_msg(&format!("Invalid configuration for algorithm: {}", error))
    }
}

impl From<argon2::password_hash::Error> for WardenError {
    fn from(error: argon2::password_hash::Error) -> Self {
        ErrorCode::HashingError.with_msg(&format!("Unable to hash password: {}", error))
    }
}

impl From<serde_json::Error> for WardenError {
    fn from(error: serde_json::Error) -> Self {
        ErrorCode::InvalidJSON.with_msg(&format!("Unable to convert to json: {}", error))
    }
}

impl From<mongodb::error::Error> for WardenError {
    fn from(error: mongodb::error::Error) -> Self {
        ErrorCode::MongoDBError.with_msg( &format!("MongoDB error: {}", error))
    }
}

impl From<bson::ser::Error> for WardenError {
    fn from(error: bson::ser::Error) -> Self {
        ErrorCode::InvalidBSON.with_msg(&format!("Unable to serialise BSON: {}", error))
    }
}

impl From<bson::de::Error> for WardenError {
    fn from(error: bson::de::Error) -> Self {
        ErrorCode::InvalidBSON.with_msg(&format!("Unable to deserialise BSON: {}", error))
    }
}

impl From<JoinError> for WardenError {
    fn from(error: JoinError) -> Self {
        ErrorCode::HashThreadingIssue.with_msg(&format!("Unable to hash: {}", error))
    }
}

impl From<BcryptError> for WardenError {
    fn from(error: BcryptError) -> Self {
        ErrorCode::InvalidAlgorithmConfig.with_msg(&format!("Unable to verify: {}", error))
    }
}

///
/// Convert our internal error into a gRPC status response.
///
/// Every token rejection collapses into the same NotAuthenticated status so callers cannot probe
/// which check failed.
///
impl From<WardenError> for Status {
    fn from(error: WardenError) -> Self {
        use ErrorCode::*;

        if error.error_code.is_token_rejection() {
            return Status::with_details(
                Code::Unauthenticated,
                "Not authenticated",
                format!("{}", NotAuthenticated as u32).into())
        }

        if error.is_internal() {
            tracing::error!("Request failed: {}", error);
        }

        let code = match &error.error_code {
            HashThreadingIssue      |
            HashingError            |
            InvalidAlgorithmConfig  |
            InvalidBSON             |
            InvalidConfig           |
            InvalidJSON             |
            InvalidPHCFormat        |
            IOError                 |
            MailerError             |
            MongoDBError            |
            TokenSigningError       |
            TonicStartError         |
            UnableToReadCredentials => Code::Internal,

            AccountNotFound => Code::NotFound,

            EmailAlreadyRegistered => Code::AlreadyExists,

            AccountAlreadyInactive |
            AccountNotInactive     => Code::FailedPrecondition,

            InvalidRequest           |
            ResetTokenInvalid        |
            VerificationTokenInvalid => Code::InvalidArgument,

            AccountLocked      |
            InvalidCredentials => Code::Unauthenticated,

            NotAuthenticated  |
            TokenMalformed    |
            TokenBadSignature |
            TokenExpired      |
            TokenRevoked      |
            TokenSuperseded   => Code::Unauthenticated,
        };

        Status::with_details(code, error.message, format!("{}", error.error_code as u32).into())
    }
}
