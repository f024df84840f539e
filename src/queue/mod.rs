//! Sync queue backends
//!
//! This module provides the durable job queue behind the PIM sync worker,
//! with an in-memory backend for development/testing and a Redis backend
//! for distributed production deployments.

mod in_memory;

#[cfg(feature = "queue-redis")]
mod redis;

#[cfg(test)]
mod tests;

pub use in_memory::InMemorySyncQueue;

#[cfg(feature = "queue-redis")]
pub use redis::RedisSyncQueue;
