//! azrm Core
//!
//! Core library for mapping declarative resource configuration onto Azure
//! Resource Manager: values and schemas, resource IDs, the generic CRUD
//! harness, provisioning-state polling and diffing.

pub mod config;
pub mod differ;
pub mod handler;
pub mod id;
pub mod poll;
pub mod provider;
pub mod resource;
pub mod schema;
