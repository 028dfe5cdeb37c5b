use bson::DateTime;
use serde::{Deserialize, Serialize};

///
/// A single-use password reset grant. The emailed secret is only stored as a digest.
///
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ResetToken {
    pub account_id: String,
    pub secret_hash: String,
    pub expires_at: DateTime,
    pub used_at: Option<DateTime>,
    pub origin: String,
    pub created_at: DateTime,
}

impl ResetToken {
    pub fn is_redeemable(&self, now: DateTime) -> bool {
        self.used_at.is_none() && self.expires_at > now
    }
}
