//! # Ports Layer (Hexagonal Architecture)
//!
//! Inbound ports are what the placement subsystem offers; outbound ports are
//! what it needs from the registry and the on-chain configuration.

pub mod inbound;
pub mod outbound;

#[cfg(any(test, feature = "simulation"))]
pub use inbound::DistributorSimulator;
pub use inbound::StreamDistributor;
pub use outbound::{NodeRegistry, OnChainConfig, RegistryEventStream};
