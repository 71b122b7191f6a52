use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("invalid resource {resource}: {reason}")]
    InvalidResource { resource: String, reason: String },

    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request for {resource} failed: {source}")]
    Transport {
        resource: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request for {resource} returned status {status}")]
    Status { resource: String, status: u16 },

    #[error("reading body of {resource} failed: {source}")]
    Body {
        resource: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("getting subsystems map: {0}")]
    RootFetch(#[source] ProviderError),

    #[error("decoding subsystems map: {0}")]
    DecodeRootMap(#[source] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("consumer already registered for subsystem {subsystem}")]
    AlreadyRegistered { subsystem: String },
}

/// A subsystem whose resource could not be fetched during a cycle. The cycle
/// carries on with the remaining subsystems.
#[derive(Debug, Error)]
#[error("fetching subsystem {subsystem}: {source}")]
pub struct SubsystemFailure {
    pub subsystem: String,
    #[source]
    pub source: ProviderError,
}
