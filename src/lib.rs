//! Client for the DCMS clinic registry API: patients, doctors, appointments
//! and daily reports, with bearer-token handling that renews an expired
//! access token once per request and ends the session when it can't.

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod navigator;
pub mod schedule;
pub mod session;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{DcmsClient, DcmsClientBuilder};
pub use config::Config;
pub use error::{ClientError, ClientResult};
pub use navigator::{LogNavigator, Navigator};
pub use session::{FileSessionStore, MemorySessionStore, Session, SessionHandle, SessionStore};
pub use transport::{ApiResponse, HttpTransport, RequestSpec, Transport};
