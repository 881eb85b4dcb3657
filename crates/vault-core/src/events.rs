//! The event-bus collaborator contract. `vault-core` only depends on this
//! trait; `vault-events` supplies the reliable wrapper and a concrete
//! transport, the way the teacher keeps `cortex-core` independent of the
//! NATS wire format behind `warren-adapter`.

use crate::domain::DomainEvent;
use crate::error::VaultError;

pub trait EventBus: Send + Sync {
    fn publish(&self, event: &DomainEvent) -> Result<(), VaultError>;
}

/// Used in tests and anywhere publication is intentionally a no-op.
pub struct NoopEventBus;

impl EventBus for NoopEventBus {
    fn publish(&self, _event: &DomainEvent) -> Result<(), VaultError> {
        Ok(())
    }
}
