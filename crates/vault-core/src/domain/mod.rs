pub mod edge;
pub mod events;
pub mod keywords;
pub mod node;
pub mod tags;
pub mod user;

pub use edge::{Edge, EdgeId, Weight, WeightBand};
pub use events::{DomainEvent, EventAggregate, EventHeader};
pub use keywords::KeywordSet;
pub use node::{Node, NodeId};
pub use tags::TagSet;
pub use user::UserId;
