pub mod context;
pub mod domain;
pub mod error;
pub mod events;
pub mod graph;
pub mod idempotency;
pub mod linking;
pub mod moderation;
pub mod service;
pub mod storage;
pub mod uow;

pub use context::OperationContext;
pub use domain::{Edge, EdgeId, KeywordSet, Node, NodeId, TagSet, UserId};
pub use error::{ErrorKind, Result, Severity, VaultError};
pub use events::{EventBus, NoopEventBus};
pub use idempotency::{IdempotencyStore, RedbIdempotencyStore};
pub use linking::{ConnectionConfig, ConnectionEngine};
pub use moderation::{ContentModerator, NoopModerator, StubWordListModerator};
pub use service::{CommandService, QueryService};
pub use storage::{NodeFilter, RedbStore};
pub use uow::UnitOfWork;
