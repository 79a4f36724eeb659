//! # Adapters Layer (Hexagonal Architecture)
//!
//! State holders behind the distributor plus in-memory implementations of
//! the outbound ports.

mod in_memory_registry;
mod load_tracker;
mod membership;
mod static_config;

pub use in_memory_registry::{InMemoryNodeRegistry, DEFAULT_FEED_CAPACITY};
pub use load_tracker::LoadTracker;
pub use membership::MembershipView;
pub use static_config::StaticOnChainConfig;
