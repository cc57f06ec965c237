//! azurerm_automation_module
//!
//! Importing a module is asynchronous: after the PUT, Azure walks the module
//! through a series of provisioning states. Create and update wait until the
//! import succeeds or reports an error.

use std::time::Duration;

use async_trait::async_trait;
use azrm_core::config::Timeouts;
use azrm_core::handler::{ResourceHandler, ResourceIdentity};
use azrm_core::poll::{StateRefresh, StateWaiter};
use azrm_core::provider::{ProviderError, ProviderResult};
use azrm_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};
use serde::{Deserialize, Serialize};

use super::{API_VERSION, ContentHash, account_child_schema, content_hash_schema};
use crate::client::Clients;
use crate::ids::ModuleId;
use crate::validate;

/// Provisioning states reported while an import is in progress
pub const IMPORT_PENDING_STATES: &[&str] = &[
    "ActivitiesStored",
    "ConnectionTypeImported",
    "ContentDownloaded",
    "ContentRetrieved",
    "ContentStored",
    "ContentValidated",
    "Created",
    "Creating",
    "ModuleDataStored",
    "ModuleImportRunbookComplete",
    "RunningImportModuleRunbook",
    "StartingImportModuleRunbook",
    "Updating",
];

pub const IMPORT_TARGET_STATES: &[&str] = &["Succeeded"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleLink {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<ContentHash>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleModel {
    pub name: String,
    pub resource_group_name: String,
    pub automation_account_name: String,
    pub module_link: ModuleLink,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ArmModule {
    #[serde(default)]
    properties: ArmModuleProperties,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArmModuleProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content_link: Option<ArmContentLink>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    provisioning_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<ArmModuleError>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArmContentLink {
    uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content_hash: Option<ContentHash>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ArmModuleError {
    #[serde(default)]
    message: Option<String>,
}

pub struct ModuleResource {
    clients: Clients,
}

impl ModuleResource {
    pub fn new(clients: Clients) -> Self {
        Self { clients }
    }

    async fn import(
        &self,
        id: &ModuleId,
        model: &ModuleModel,
        verb: &str,
        limit: Duration,
    ) -> ProviderResult<()> {
        let body = ArmModule {
            properties: ArmModuleProperties {
                content_link: Some(ArmContentLink {
                    uri: model.module_link.uri.clone(),
                    content_hash: model.module_link.hash.clone(),
                }),
                provisioning_state: None,
                error: None,
            },
        };
        self.clients
            .put_model(&id.to_string(), API_VERSION, &body, &format!("{} {}", verb, id.describe()))
            .await?;

        StateWaiter::new(IMPORT_PENDING_STATES, IMPORT_TARGET_STATES)
            .with_interval(self.clients.poll_interval())
            .with_timeout(limit)
            .wait(|| self.provisioning_state(id))
            .await
            .map_err(|e| {
                ProviderError::with_kind(
                    e.kind,
                    format!("waiting for {} to finish provisioning", id.describe()),
                )
                .with_cause(e)
            })?;
        Ok(())
    }

    async fn provisioning_state(&self, id: &ModuleId) -> ProviderResult<StateRefresh> {
        let module = self
            .clients
            .get_model::<ArmModule>(&id.to_string(), API_VERSION, &format!("polling {}", id.describe()))
            .await?
            .ok_or_else(|| ProviderError::not_found(format!("{} disappeared", id.describe())))?;

        let props = module.properties;
        let state = props.provisioning_state.unwrap_or_default();
        match props.error.and_then(|e| e.message).filter(|m| !m.is_empty()) {
            Some(message) => Ok(StateRefresh::failed(state, message)),
            None => Ok(StateRefresh::state(state)),
        }
    }
}

#[async_trait]
impl ResourceHandler for ModuleResource {
    type Model = ModuleModel;
    type Id = ModuleId;

    fn type_name(&self) -> &'static str {
        "azurerm_automation_module"
    }

    fn schema(&self) -> ResourceSchema {
        account_child_schema(self.type_name())
            .with_description("A PowerShell module imported into an Automation Account")
            .attribute(
                AttributeSchema::new("name", validate::module_name())
                    .required()
                    .force_new(),
            )
            .attribute(
                AttributeSchema::new(
                    "module_link",
                    AttributeType::Object(vec![
                        AttributeSchema::new("uri", types::non_empty_string()).required(),
                        AttributeSchema::new("hash", content_hash_schema()),
                    ]),
                )
                .required(),
            )
    }

    fn timeouts(&self) -> Timeouts {
        Timeouts {
            create: Duration::from_secs(60 * 60),
            update: Duration::from_secs(60 * 60),
            ..Timeouts::default()
        }
    }

    fn id_for(&self, model: &ModuleModel) -> ProviderResult<ModuleId> {
        Ok(ModuleId::new(
            self.clients.subscription_id(),
            &model.resource_group_name,
            &model.automation_account_name,
            &model.name,
        ))
    }

    async fn create(&self, id: &ModuleId, model: &ModuleModel) -> ProviderResult<()> {
        let limit = self.clients.timeouts(self.timeouts()).create;
        self.import(id, model, "creating", limit).await
    }

    async fn read(&self, id: &ModuleId) -> ProviderResult<Option<ModuleModel>> {
        let Some(module) = self
            .clients
            .get_model::<ArmModule>(&id.to_string(), API_VERSION, &format!("retrieving {}", id.describe()))
            .await?
        else {
            return Ok(None);
        };

        let link = module.properties.content_link.map(|l| ModuleLink {
            uri: l.uri,
            hash: l.content_hash,
        });
        Ok(Some(ModuleModel {
            name: id.module_name.clone(),
            resource_group_name: id.resource_group_name.clone(),
            automation_account_name: id.automation_account_name.clone(),
            module_link: link.unwrap_or(ModuleLink {
                uri: String::new(),
                hash: None,
            }),
        }))
    }

    fn supports_update(&self) -> bool {
        true
    }

    async fn update(&self, id: &ModuleId, model: &ModuleModel) -> ProviderResult<()> {
        let limit = self.clients.timeouts(self.timeouts()).update;
        self.import(id, model, "updating", limit).await
    }

    async fn delete(&self, id: &ModuleId) -> ProviderResult<()> {
        self.clients
            .delete(&id.to_string(), API_VERSION, &format!("deleting {}", id.describe()))
            .await
    }
}
