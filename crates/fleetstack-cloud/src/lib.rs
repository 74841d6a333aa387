//! FleetStack Cloud
//!
//! Drives a resource graph through a declarative provisioning service and
//! resolves the created compute resources into host records.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                 fleetstack CLI                   │
//! │               (fleetstack create)                │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │               fleetstack-cloud                   │
//! │  ┌──────────────┐  ┌──────────────────────────┐ │
//! │  │ Orchestrator │─▶│ Driver ─▶ Resolver       │ │
//! │  └──────────────┘  └──────────────────────────┘ │
//! │  trait StackService { ... }                      │
//! │  trait ComputeLookup { ... }                     │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//!           ┌───────▼───────┐
//!           │ fleetstack-   │
//!           │ cloud-aws     │
//!           └───────────────┘
//! ```

pub mod driver;
pub mod error;
pub mod orchestrator;
pub mod provider;
pub mod resolver;
pub mod settings;
pub mod stack;

#[cfg(test)]
mod fake;

// Re-exports
pub use driver::ProvisioningDriver;
pub use error::{CloudError, Result};
pub use orchestrator::{Orchestrator, Plan, ProvisionOutcome, plan};
pub use provider::{
    ComputeLookup, CreateStackRequest, InstanceDescription, StackResource, StackService,
};
pub use resolver::ResourceResolver;
pub use settings::{PollPolicy, ProvisionSettings, parse_parameter};
pub use stack::{LifecycleState, StackRun, StatusClass, classify};
