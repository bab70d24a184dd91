//! Authenticated acquisition: logging in, sessions, and rate governance.
//!
//! - [`auth`]: the login state machine with human-like input
//! - [`session`]: an authenticated browser context bound to one account
//! - [`governor`]: rolling-window budget for chargeable page loads

pub mod auth;
pub mod governor;
pub mod session;

pub use auth::{AuthState, SessionAuthenticator};
pub use governor::RateGovernor;
pub use session::Session;
