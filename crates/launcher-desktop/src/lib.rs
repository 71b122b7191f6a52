//! Authenticated local channel between the agent and its desktop helper.
//!
//! The helper runs [`DesktopServer`] on a Unix socket (a named pipe on
//! Windows); the agent drives it through [`DesktopClient`]. Every request must
//! carry the shared bearer token.

pub mod auth;
pub mod client;
pub mod endpoint;
pub mod errors;
pub mod server;
pub mod status;

pub use client::DesktopClient;
pub use endpoint::LocalEndpoint;
pub use errors::{ClientError, EndpointError, ServerError};
pub use server::{DesktopServer, RunningServer, ServerOptions, MAX_BODY_BYTES};
pub use status::{StatusLevel, StatusRequest};
