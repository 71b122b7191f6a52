//! Control-plane synchronization: periodically pulls named subsystem resources
//! and fans changes out to registered consumers and subscribers.

pub mod errors;
pub mod http;
pub mod provider;
pub mod registry;
pub mod service;

pub use errors::{ControlError, ProviderError, RegistrationError, SubsystemFailure};
pub use http::{HttpDataProvider, HttpProviderOptions};
pub use provider::{DataProvider, Fetched};
pub use registry::{Consumer, Registry, Subscriber};
pub use service::{ControlService, FetchReport, DEFAULT_REQUEST_INTERVAL};
