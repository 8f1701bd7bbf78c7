//! Client core for the Relief Portal: session handling, role-based
//! navigation and the polling subscriptions used by live views.

pub mod auth;
pub mod config;
pub mod dto;
pub mod error;
pub mod navigation;
pub mod polling;
pub mod role;
pub mod router;
pub mod session;
pub mod storage;
pub mod telemetry;
#[cfg(test)]
mod testing;
pub mod token;
pub mod transport;

pub use error::{PortalError, Result};
