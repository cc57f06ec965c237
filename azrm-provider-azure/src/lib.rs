//! Azure provider for azrm
//!
//! Resource and data source handlers for Azure Automation and Azure DNS,
//! talking to Azure Resource Manager through the [`ArmClient`] seam.
//!
//! ## Module Structure
//!
//! - `automation` - Automation accounts, runbooks, schedules, variables and friends
//! - `dns` - DNS zones and record sets
//! - `client` - ARM transport trait and typed request helpers
//! - `ids` - Typed resource IDs
//! - `memory` - In-memory ARM backend
//! - `provider` - AzureProvider registry
//! - `utils` - Helper functions for value normalization
//! - `validate` - Attribute types for Azure names and formats

pub mod automation;
pub mod client;
pub mod dns;
pub mod ids;
pub mod memory;
pub mod provider;
pub mod utils;
pub mod validate;

// Re-export main types
pub use client::{ArmClient, ClientError, Clients};
pub use memory::MemoryArm;
pub use provider::AzureProvider;
