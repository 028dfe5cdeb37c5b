use crate::utils::errors::WardenError;

///
/// Verify a BCrypt hash ($2a$, $2b$, $2x$ or $2y$). These only arrive via migrated accounts,
/// new credentials are never hashed with BCrypt.
///
pub fn validate(phc: &str, plain_text_password: &str) -> Result<bool, WardenError> {
    bcrypt::verify(plain_text_password, phc).map_err(WardenError::from)
}
