mod store;

pub use store::{
    fingerprint, fingerprint_with_client_key, Claim, IdempotencyReconstruct, IdempotencyStore,
    RedbIdempotencyStore, DEFAULT_TTL,
};
