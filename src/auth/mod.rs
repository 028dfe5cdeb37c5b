pub mod accounts;
pub mod credentials;
pub mod reset;
pub mod revocation;
pub mod session;
pub mod throttle;
pub mod token;
pub mod validator;
