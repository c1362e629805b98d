//! Session controller and its broadcast context

pub mod context;
pub mod controller;

pub use context::{SessionHandle, SessionProvider};
pub use controller::SessionController;
