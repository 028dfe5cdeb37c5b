use bson::DateTime;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use crate::grpc::api;

#[derive(Clone, Copy, Debug, Deserialize, Display, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    #[display(fmt = "PENDING_VERIFICATION")]
    PendingVerification,
    #[display(fmt = "ACTIVE")]
    Active,
    #[display(fmt = "SUSPENDED")]
    Suspended,
    #[display(fmt = "INACTIVE")]
    Inactive,
}

///
/// The unit of atomic updates for everything login related - the failure counter, the lock and
/// the token generation all live on this one document.
///
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Account {
    pub account_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub organization: Option<String>,
    pub job_role: Option<String>,
    pub profile_url: Option<String>,
    pub status: AccountStatus,
    pub failed_login_count: u32,
    pub locked_until: Option<DateTime>,
    pub token_generation: u64,
    pub verification_hash: Option<String>,
    pub verification_expires_at: Option<DateTime>,
    pub email_verified_at: Option<DateTime>,
    pub last_login_at: Option<DateTime>,
    pub last_login_origin: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

pub const FIRST_GENERATION: u64 = 1;

///
/// The details supplied when an account is registered.
///
#[derive(Clone, Debug, Default)]
pub struct NewAccount {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub organization: Option<String>,
    pub job_role: Option<String>,
}

///
/// Fields a user may change on their own profile. None leaves the field alone.
///
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub organization: Option<String>,
    pub job_role: Option<String>,
    pub profile_url: Option<String>,
}

impl Account {
    pub fn new(account_id: &str, details: NewAccount, now: DateTime) -> Self {
        Account {
            account_id: account_id.to_string(),
            email: details.email,
            first_name: details.first_name,
            last_name: details.last_name,
            organization: details.organization,
            job_role: details.job_role,
            profile_url: None,
            status: AccountStatus::PendingVerification,
            failed_login_count: 0,
            locked_until: None,
            token_generation: FIRST_GENERATION,
            verification_hash: None,
            verification_expires_at: None,
            email_verified_at: None,
            last_login_at: None,
            last_login_origin: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_locked(&self, now: DateTime) -> bool {
        matches!(self.locked_until, Some(until) if until > now)
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

impl ProfileUpdate {
    ///
    /// Apply the update to an in-memory account.
    ///
    pub fn apply(&self, account: &mut Account) {
        if let Some(first_name) = &self.first_name {
            account.first_name = first_name.clone();
        }
        if let Some(last_name) = &self.last_name {
            account.last_name = last_name.clone();
        }
        if let Some(organization) = &self.organization {
            account.organization = Some(organization.clone());
        }
        if let Some(job_role) = &self.job_role {
            account.job_role = Some(job_role.clone());
        }
        if let Some(profile_url) = &self.profile_url {
            account.profile_url = Some(profile_url.clone());
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == ProfileUpdate::default()
    }
}

///
/// Empty strings on the wire mean 'leave unchanged'.
///
impl From<api::UpdateProfileRequest> for ProfileUpdate {
    fn from(request: api::UpdateProfileRequest) -> Self {
        ProfileUpdate {
            first_name: non_empty(request.first_name),
            last_name: non_empty(request.last_name),
            organization: non_empty(request.organization),
            job_role: non_empty(request.job_role),
            profile_url: non_empty(request.profile_url),
        }
    }
}

impl From<&Account> for api::Profile {
    fn from(account: &Account) -> Self {
        api::Profile {
            account_id: account.account_id.clone(),
            email: account.email.clone(),
            first_name: account.first_name.clone(),
            last_name: account.last_name.clone(),
            organization: account.organization.clone().unwrap_or_default(),
            job_role: account.job_role.clone().unwrap_or_default(),
            profile_url: account.profile_url.clone().unwrap_or_default(),
            status: account.status.to_string(),
            created_at: account.created_at.timestamp_millis(),
            last_login_at: account.last_login_at.map(|at| at.timestamp_millis()).unwrap_or_default(),
        }
    }
}

pub fn non_empty(value: String) -> Option<String> {
    match value.trim().is_empty() {
        true  => None,
        false => Some(value.trim().to_string()),
    }
}
