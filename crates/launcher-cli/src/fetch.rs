//! One-shot synchronization pass for `control fetch`.

use std::{
    collections::BTreeMap,
    sync::{Arc, Weak},
};

use async_trait::async_trait;
use launcher_control::{
    Consumer, ControlError, ControlService, DataProvider, FetchReport, Fetched, ProviderError,
};

/// Builds the consumer for a subsystem seen in the root map.
pub(crate) type ConsumerFactory = dyn Fn(&str) -> Arc<dyn Consumer> + Send + Sync;

/// Registers a consumer for every subsystem named in the root map as the
/// service reads it, so the map used for registration is the one the cycle
/// dispatches from.
struct RegisteringProvider {
    inner: Arc<dyn DataProvider>,
    service: Weak<ControlService>,
    make_consumer: Box<ConsumerFactory>,
}

#[async_trait]
impl DataProvider for RegisteringProvider {
    async fn get(
        &self,
        resource: &str,
        cached_etag: Option<&str>,
    ) -> Result<Fetched, ProviderError> {
        let fetched = self.inner.get(resource, cached_etag).await?;
        if resource.is_empty() {
            if let (Some(service), Ok(map)) = (
                self.service.upgrade(),
                serde_json::from_slice::<BTreeMap<String, String>>(&fetched.data),
            ) {
                for name in map.keys() {
                    // Already registered on an earlier pass.
                    let _ = service.register_consumer(name, (self.make_consumer)(name));
                }
            }
        }
        Ok(fetched)
    }
}

pub(crate) fn service_with_consumers(
    inner: Arc<dyn DataProvider>,
    make_consumer: Box<ConsumerFactory>,
) -> Arc<ControlService> {
    Arc::new_cyclic(|service| {
        ControlService::new(Arc::new(RegisteringProvider {
            inner,
            service: service.clone(),
            make_consumer,
        }))
    })
}

pub(crate) async fn fetch_once(
    inner: Arc<dyn DataProvider>,
    make_consumer: Box<ConsumerFactory>,
) -> Result<FetchReport, ControlError> {
    service_with_consumers(inner, make_consumer).fetch().await
}
