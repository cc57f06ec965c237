//! Azure Automation resources and data sources

use azrm_core::schema::{AttributeSchema, AttributeType, ResourceSchema};
use serde::{Deserialize, Serialize};

use crate::validate;

pub mod account;
pub mod connection;
pub mod credential;
pub mod job_schedule;
pub mod module;
pub mod runbook;
pub mod schedule;
pub mod variable;

pub use account::{AutomationAccountDataSource, AutomationAccountResource};
pub use connection::ConnectionResource;
pub use credential::CredentialResource;
pub use job_schedule::JobScheduleResource;
pub use module::ModuleResource;
pub use runbook::RunbookResource;
pub use schedule::ScheduleResource;
pub use variable::{VariableDataSource, VariableKind, VariableResource};

pub const API_VERSION: &str = "2023-11-01";

/// Content hash attached to a content link; ARM uses the same shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentHash {
    pub algorithm: String,
    pub value: String,
}

pub(crate) fn content_hash_schema() -> AttributeType {
    AttributeType::Object(vec![
        AttributeSchema::new("algorithm", AttributeType::String).required(),
        AttributeSchema::new("value", AttributeType::String).required(),
    ])
}

/// Schema for a resource living under an Automation Account
pub(crate) fn account_child_schema(resource_type: &str) -> ResourceSchema {
    ResourceSchema::new(resource_type)
        .attribute(
            AttributeSchema::new("resource_group_name", validate::resource_group_name())
                .required()
                .force_new(),
        )
        .attribute(
            AttributeSchema::new("automation_account_name", validate::automation_account_name())
                .required()
                .force_new(),
        )
}
