pub mod error;
pub mod logger;
pub mod projection;
pub mod validation;
