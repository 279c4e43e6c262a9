//! Storage implementations for Optimus.

pub mod in_memory;
pub mod noop;
pub mod vector;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use in_memory::InMemoryChunkStore;
pub use noop::NoDatabase;
pub use vector::{cosine_distance, cosine_similarity, nearest};

#[cfg(feature = "postgres")]
pub use postgres::PgStore;
