use bson::DateTime;
use serde::{Deserialize, Serialize};

///
/// One hashed password. Credentials are append-only; the most recently created is the current one.
///
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CredentialRecord {
    pub account_id: String,
    pub phc: String,
    pub created_at: DateTime,
}
