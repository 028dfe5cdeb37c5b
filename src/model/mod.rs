pub mod account;
pub mod algorithm;
pub mod attempt;
pub mod claims;
pub mod credential;
pub mod reset;
pub mod revocation;
