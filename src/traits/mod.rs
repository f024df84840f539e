//! Trait seams between the sync subsystem and its collaborators
//!
//! The queue, the upstream catalog, and the product store are all consumed
//! through traits so backends can be swapped (in-memory for tests and
//! single-instance deployments, Redis/relational for production).

pub mod catalog;
pub mod queue;
pub mod store;
