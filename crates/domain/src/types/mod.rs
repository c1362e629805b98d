//! Session domain types

pub mod claims;
pub mod session;
pub mod tokens;

pub use claims::UserClaims;
pub use session::{SessionPhase, SessionSnapshot, SessionState};
pub use tokens::{parse_expiration_date, TokenBundle};
