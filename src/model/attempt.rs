use bson::DateTime;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use crate::grpc::admin;

#[derive(Clone, Copy, Debug, Deserialize, Display, PartialEq, Serialize)]
pub enum FailureReason {
    #[display(fmt = "User not found")]
    UserNotFound,
    #[display(fmt = "Account not active")]
    AccountNotActive,
    #[display(fmt = "Account locked")]
    AccountLocked,
    #[display(fmt = "Invalid password")]
    InvalidPassword,
    #[display(fmt = "No password found")]
    NoCredential,
    #[display(fmt = "System error")]
    SystemError,
}

///
/// An audit entry for every login attempt, including those for identifiers that match no account.
///
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct LoginAttempt {
    pub identifier: String,
    pub account_id: Option<String>,
    pub origin: String,
    pub success: bool,
    pub failure_reason: Option<FailureReason>,
    pub created_at: DateTime,
}

impl LoginAttempt {
    pub fn new(identifier: &str, account_id: Option<&str>, origin: &str, outcome: Result<(), FailureReason>, now: DateTime) -> Self {
        LoginAttempt {
            identifier: identifier.to_string(),
            account_id: account_id.map(str::to_string),
            origin: origin.to_string(),
            success: outcome.is_ok(),
            failure_reason: outcome.err(),
            created_at: now,
        }
    }
}

impl From<&LoginAttempt> for admin::LoginAttempt {
    fn from(attempt: &LoginAttempt) -> Self {
        admin::LoginAttempt {
            identifier: attempt.identifier.clone(),
            account_id: attempt.account_id.clone().unwrap_or_default(),
            origin: attempt.origin.clone(),
            success: attempt.success,
            failure_reason: attempt.failure_reason.map(|reason| reason.to_string()).unwrap_or_default(),
            created_at: attempt.created_at.timestamp_millis(),
        }
    }
}
