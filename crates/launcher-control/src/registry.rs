use std::{
    collections::HashMap,
    panic::{catch_unwind, AssertUnwindSafe},
    sync::Arc,
};

use tracing::warn;

use crate::errors::RegistrationError;

/// Receives the full payload of a subsystem every time it changes.
pub trait Consumer: Send + Sync {
    fn update(&self, data: &[u8]);
}

/// Notified after a subsystem's consumer has been handed a change.
pub trait Subscriber: Send + Sync {
    fn ping(&self);
}

impl<F> Consumer for F
where
    F: Fn(&[u8]) + Send + Sync,
{
    fn update(&self, data: &[u8]) {
        self(data)
    }
}

impl<F> Subscriber for F
where
    F: Fn() + Send + Sync,
{
    fn ping(&self) {
        self()
    }
}

/// Subsystem name to one consumer and an ordered list of subscribers.
#[derive(Default)]
pub struct Registry {
    consumers: HashMap<String, Arc<dyn Consumer>>,
    subscribers: HashMap<String, Vec<Arc<dyn Subscriber>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_consumer(
        &mut self,
        subsystem: &str,
        consumer: Arc<dyn Consumer>,
    ) -> Result<(), RegistrationError> {
        if self.consumers.contains_key(subsystem) {
            return Err(RegistrationError::AlreadyRegistered {
                subsystem: subsystem.to_string(),
            });
        }
        self.consumers.insert(subsystem.to_string(), consumer);
        Ok(())
    }

    pub fn register_subscriber(&mut self, subsystem: &str, subscriber: Arc<dyn Subscriber>) {
        self.subscribers
            .entry(subsystem.to_string())
            .or_default()
            .push(subscriber);
    }

    pub fn has_consumer(&self, subsystem: &str) -> bool {
        self.consumers.contains_key(subsystem)
    }

    pub fn subscriber_count(&self, subsystem: &str) -> usize {
        self.subscribers.get(subsystem).map_or(0, Vec::len)
    }

    /// Hands `data` to the consumer, then pings each subscriber in
    /// registration order.
    pub fn dispatch(&self, subsystem: &str, data: &[u8]) {
        self.targets(subsystem).dispatch(subsystem, data);
    }

    /// Snapshot of everything registered for `subsystem`, so dispatch can run
    /// without holding whatever lock guards the registry.
    pub(crate) fn targets(&self, subsystem: &str) -> DispatchTargets {
        DispatchTargets {
            consumer: self.consumers.get(subsystem).cloned(),
            subscribers: self.subscribers.get(subsystem).cloned().unwrap_or_default(),
        }
    }
}

pub(crate) struct DispatchTargets {
    consumer: Option<Arc<dyn Consumer>>,
    subscribers: Vec<Arc<dyn Subscriber>>,
}

impl DispatchTargets {
    pub(crate) fn dispatch(&self, subsystem: &str, data: &[u8]) {
        if let Some(consumer) = &self.consumer {
            if catch_unwind(AssertUnwindSafe(|| consumer.update(data))).is_err() {
                warn!(subsystem, "consumer panicked during update");
            }
        }

        for subscriber in &self.subscribers {
            if catch_unwind(AssertUnwindSafe(|| subscriber.ping())).is_err() {
                warn!(subsystem, "subscriber panicked during ping");
            }
        }
    }
}

#[cfg(test)]
mod tests;
