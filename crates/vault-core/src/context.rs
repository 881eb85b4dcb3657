use crate::error::VaultError;
use std::time::Instant;

/// Threaded through every public service call and storage/event-bus/
/// idempotency-store boundary. Generalizes the teacher's `Instant`-based
/// elapsed-time tracking in `linker::auto_linker` (there used only for
/// metrics) into a first-class cancellation mechanism.
#[derive(Debug, Clone)]
pub struct OperationContext {
    deadline: Option<Instant>,
    pub request_id: String,
}

impl OperationContext {
    pub fn new(request_id: impl Into<String>) -> Self {
        OperationContext { deadline: None, request_id: request_id.into() }
    }

    pub fn with_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    pub fn check_cancelled(&self) -> Result<(), VaultError> {
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(VaultError::timeout("operation deadline exceeded")
                    .with_request_id(self.request_id.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn expired_deadline_is_cancelled() {
        let ctx = OperationContext::new("req-1").with_timeout(Duration::from_millis(0));
        std::thread::sleep(Duration::from_millis(5));
        assert!(ctx.check_cancelled().is_err());
    }

    #[test]
    fn no_deadline_never_cancels() {
        let ctx = OperationContext::new("req-2");
        assert!(ctx.check_cancelled().is_ok());
    }
}
