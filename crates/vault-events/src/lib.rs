//! Reliable wrapper around an injected [`vault_core::EventBus`] transport.
//! `vault-core` depends only on the `EventBus` trait; this crate is the
//! collaborator that decides what happens when publishing fails, the way
//! `warren-adapter` supplies a transport behind a trait `cortex-core` owns.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use vault_core::domain::DomainEvent;
use vault_core::{EventBus, VaultError};

#[derive(Debug, Clone)]
pub enum EventBusStrategy {
    /// Propagate the publish error to the caller.
    Fail,
    /// Log and swallow the error — the unit of work already committed.
    Log,
    /// Retry with exponential backoff, bounded by `max_attempts`, only for
    /// errors whose message contains one of `retryable_substrings`.
    Retry {
        max_attempts: u32,
        initial_delay: Duration,
        max_delay: Duration,
        backoff_factor: f64,
        retryable_substrings: Vec<String>,
    },
    /// Hold failed events in an in-memory queue for later redelivery.
    Queue,
}

pub struct ReliableEventBus {
    inner: Box<dyn EventBus>,
    strategy: EventBusStrategy,
    queued: Mutex<VecDeque<DomainEvent>>,
}

impl ReliableEventBus {
    pub fn new(inner: Box<dyn EventBus>, strategy: EventBusStrategy) -> Self {
        ReliableEventBus { inner, strategy, queued: Mutex::new(VecDeque::new()) }
    }

    pub fn drain_queue(&self) -> Vec<DomainEvent> {
        self.queued.lock().unwrap().drain(..).collect()
    }

    fn is_retryable(message: &str, substrings: &[String]) -> bool {
        substrings.iter().any(|s| message.contains(s.as_str()))
    }
}

impl EventBus for ReliableEventBus {
    fn publish(&self, event: &DomainEvent) -> Result<(), VaultError> {
        match &self.strategy {
            EventBusStrategy::Fail => self.inner.publish(event),
            EventBusStrategy::Log => {
                if let Err(err) = self.inner.publish(event) {
                    log::warn!("event publish failed, dropping: {err}");
                }
                Ok(())
            }
            EventBusStrategy::Queue => {
                if let Err(err) = self.inner.publish(event) {
                    log::warn!("event publish failed, queueing for redelivery: {err}");
                    self.queued.lock().unwrap().push_back(event.clone());
                }
                Ok(())
            }
            EventBusStrategy::Retry {
                max_attempts,
                initial_delay,
                max_delay,
                backoff_factor,
                retryable_substrings,
            } => {
                let mut delay = *initial_delay;
                let mut last_err = None;
                for attempt in 1..=*max_attempts {
                    match self.inner.publish(event) {
                        Ok(()) => return Ok(()),
                        Err(err) => {
                            let retryable = Self::is_retryable(&err.message, retryable_substrings);
                            if !retryable || attempt == *max_attempts {
                                last_err = Some(err);
                                break;
                            }
                            std::thread::sleep(delay);
                            let next = delay.mul_f64(*backoff_factor);
                            delay = next.min(*max_delay);
                            last_err = Some(err);
                        }
                    }
                }
                Err(last_err.unwrap_or_else(|| VaultError::internal("retry exhausted with no recorded error")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FlakyBus {
        calls: AtomicUsize,
        fail_until: usize,
    }

    impl EventBus for FlakyBus {
        fn publish(&self, _event: &DomainEvent) -> Result<(), VaultError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_until {
                Err(VaultError::unavailable("connection reset"))
            } else {
                Ok(())
            }
        }
    }

    fn sample_event() -> DomainEvent {
        DomainEvent::NodeDeleted {
            header: vault_core::domain::events::EventHeader::new(
                uuid::Uuid::now_v7(),
                vault_core::UserId::new("alice").unwrap(),
                0,
            ),
        }
    }

    #[test]
    fn log_strategy_never_surfaces_errors() {
        let bus = ReliableEventBus::new(
            Box::new(FlakyBus { calls: AtomicUsize::new(0), fail_until: 100 }),
            EventBusStrategy::Log,
        );
        assert!(bus.publish(&sample_event()).is_ok());
    }

    #[test]
    fn retry_recovers_within_retryable_substring() {
        let bus = ReliableEventBus::new(
            Box::new(FlakyBus { calls: AtomicUsize::new(0), fail_until: 2 }),
            EventBusStrategy::Retry {
                max_attempts: 5,
                initial_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(5),
                backoff_factor: 2.0,
                retryable_substrings: vec!["connection".into()],
            },
        );
        assert!(bus.publish(&sample_event()).is_ok());
    }

    #[test]
    fn retry_gives_up_on_non_retryable_message() {
        let bus = ReliableEventBus::new(
            Box::new(FlakyBus { calls: AtomicUsize::new(0), fail_until: 100 }),
            EventBusStrategy::Retry {
                max_attempts: 3,
                initial_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(2),
                backoff_factor: 2.0,
                retryable_substrings: vec!["timeout".into()],
            },
        );
        assert!(bus.publish(&sample_event()).is_err());
    }

    #[test]
    fn queue_strategy_buffers_failed_events_for_redelivery() {
        let bus = ReliableEventBus::new(
            Box::new(FlakyBus { calls: AtomicUsize::new(0), fail_until: 100 }),
            EventBusStrategy::Queue,
        );
        bus.publish(&sample_event()).unwrap();
        assert_eq!(bus.drain_queue().len(), 1);
    }
}
