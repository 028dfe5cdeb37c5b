use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use argon2::{Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version, password_hash::SaltString};
use crate::utils::{config::Configuration, errors::{ErrorCode, WardenError}};

///
/// Cost parameters for new Argon2id hashes. Verification reads the parameters from the PHC
/// string itself, so changing these never breaks existing credentials.
///
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ArgonPolicy {
    pub memory_size_kb: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

pub fn validate(phc: &str, plain_text_password: &str) -> Result<bool, WardenError> {
    let parsed_hash = PasswordHash::new(phc)
        .map_err(|err| ErrorCode::InvalidPHCFormat.with_msg(&format!("Unable to parse argon PHC: {}", err)))?;

    match Argon2::default().verify_password(plain_text_password.as_bytes(), &parsed_hash) {
        Ok(_)  => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(err) => Err(WardenError::from(err)),
    }
}

impl Default for ArgonPolicy {
    fn default() -> Self {
        ArgonPolicy {
            memory_size_kb: 1024 * 16,
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl From<&Configuration> for ArgonPolicy {
    fn from(config: &Configuration) -> Self {
        ArgonPolicy {
            memory_size_kb: config.argon_memory_kb,
            iterations: config.argon_iterations,
            parallelism: config.argon_parallelism,
        }
    }
}

impl ArgonPolicy {
    ///
    /// Check the parameters are usable before the service starts accepting passwords.
    ///
    pub fn check(&self) -> Result<(), WardenError> {
        Params::new(self.memory_size_kb, self.iterations, self.parallelism, None)?;
        Ok(())
    }

    pub fn hash_into_phc(&self, plain_text_password: &str) -> Result<String, WardenError> {
        let salt = SaltString::generate(&mut OsRng);
        let params = Params::new(self.memory_size_kb, self.iterations, self.parallelism, None)?;
        let argon2 = Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params);

        // Hash password to PHC string ($argon2id$v=19$...)
        Ok(argon2.hash_password(plain_text_password.as_bytes(), &salt)?.to_string())
    }
}
