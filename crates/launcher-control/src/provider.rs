use async_trait::async_trait;

use crate::errors::ProviderError;

/// Result of a conditional fetch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Fetched {
    /// Version tag reported for the resource. Equal to the cached tag when the
    /// resource is unchanged, in which case `data` may be empty.
    pub etag: String,
    pub data: Vec<u8>,
}

/// Retrieves control data. Authentication, HTTP and file access live below
/// this boundary.
///
/// An empty `resource` asks for the root subsystem map, a JSON object of
/// subsystem name to resource locator.
#[async_trait]
pub trait DataProvider: Send + Sync {
    async fn get(&self, resource: &str, cached_etag: Option<&str>)
        -> Result<Fetched, ProviderError>;
}
