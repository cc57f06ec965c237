//! azurerm_automation_credential
//!
//! Azure never returns the password, so state keeps the configured one.

use async_trait::async_trait;
use azrm_core::handler::{ResourceHandler, ResourceIdentity};
use azrm_core::provider::ProviderResult;
use azrm_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};
use serde::{Deserialize, Serialize};

use super::{API_VERSION, account_child_schema};
use crate::client::Clients;
use crate::ids::CredentialId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialModel {
    pub name: String,
    pub resource_group_name: String,
    pub automation_account_name: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ArmCredential {
    #[serde(default)]
    properties: ArmCredentialProperties,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArmCredentialProperties {
    #[serde(default)]
    user_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

pub struct CredentialResource {
    clients: Clients,
}

impl CredentialResource {
    pub fn new(clients: Clients) -> Self {
        Self { clients }
    }

    async fn write(&self, id: &CredentialId, model: &CredentialModel, verb: &str) -> ProviderResult<()> {
        let body = ArmCredential {
            properties: ArmCredentialProperties {
                user_name: model.username.clone(),
                password: model.password.clone(),
                description: model.description.clone(),
            },
        };
        self.clients
            .put_model(&id.to_string(), API_VERSION, &body, &format!("{} {}", verb, id.describe()))
            .await
    }
}

#[async_trait]
impl ResourceHandler for CredentialResource {
    type Model = CredentialModel;
    type Id = CredentialId;

    fn type_name(&self) -> &'static str {
        "azurerm_automation_credential"
    }

    fn schema(&self) -> ResourceSchema {
        account_child_schema(self.type_name())
            .attribute(
                AttributeSchema::new("name", types::non_empty_string())
                    .required()
                    .force_new(),
            )
            .attribute(AttributeSchema::new("username", types::non_empty_string()).required())
            .attribute(
                AttributeSchema::new("password", types::non_empty_string())
                    .required()
                    .sensitive(),
            )
            .attribute(AttributeSchema::new("description", AttributeType::String))
    }

    fn id_for(&self, model: &CredentialModel) -> ProviderResult<CredentialId> {
        Ok(CredentialId::new(
            self.clients.subscription_id(),
            &model.resource_group_name,
            &model.automation_account_name,
            &model.name,
        ))
    }

    async fn create(&self, id: &CredentialId, model: &CredentialModel) -> ProviderResult<()> {
        self.write(id, model, "creating").await
    }

    async fn read(&self, id: &CredentialId) -> ProviderResult<Option<CredentialModel>> {
        let Some(credential) = self
            .clients
            .get_model::<ArmCredential>(&id.to_string(), API_VERSION, &format!("retrieving {}", id.describe()))
            .await?
        else {
            return Ok(None);
        };

        let props = credential.properties;
        Ok(Some(CredentialModel {
            name: id.credential_name.clone(),
            resource_group_name: id.resource_group_name.clone(),
            automation_account_name: id.automation_account_name.clone(),
            username: props.user_name,
            password: None,
            description: props.description,
        }))
    }

    fn supports_update(&self) -> bool {
        true
    }

    async fn update(&self, id: &CredentialId, model: &CredentialModel) -> ProviderResult<()> {
        self.write(id, model, "updating").await
    }

    async fn delete(&self, id: &CredentialId) -> ProviderResult<()> {
        self.clients
            .delete(&id.to_string(), API_VERSION, &format!("deleting {}", id.describe()))
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use azrm_core::config::ProviderConfig;
    use azrm_core::differ::Diff;
    use azrm_core::handler::Managed;
    use azrm_core::provider::ManagedResource;
    use azrm_core::resource::{Attributes, Value};
    use serde_json::json;

    use super::*;
    use crate::memory::MemoryArm;

    const ACCOUNT: &str =
        "/subscriptions/sub1/resourceGroups/rg1/providers/Microsoft.Automation/automationAccounts/acctest01";

    #[tokio::test]
    async fn password_is_carried_from_configuration() {
        let arm = Arc::new(MemoryArm::new());
        arm.insert(ACCOUNT, json!({ "location": "westeurope", "properties": {} }));
        let credentials = Managed::new(CredentialResource::new(Clients::new(
            arm.clone(),
            ProviderConfig::new("sub1"),
        )));

        let mut attrs = Attributes::new();
        attrs.insert("name".to_string(), Value::from("admin-cred"));
        attrs.insert("resource_group_name".to_string(), Value::from("rg1"));
        attrs.insert("automation_account_name".to_string(), Value::from("acctest01"));
        attrs.insert("username".to_string(), Value::from("test_user"));
        attrs.insert("password".to_string(), Value::from("test_pwd"));

        let state = credentials.create(&attrs).await.unwrap();
        assert_eq!(state.get("username"), Some(&Value::from("test_user")));
        assert_eq!(state.get("password"), Some(&Value::from("test_pwd")));
        assert_eq!(credentials.plan(&state.attributes, &attrs).unwrap(), Diff::NoChange);

        // A plain refresh cannot see the password
        let id = state.id.clone().unwrap();
        let refreshed = credentials.read(&id).await.unwrap();
        assert_eq!(refreshed.get("password"), None);
        assert!(arm.raw(&id).unwrap()["properties"].get("password").is_none());
    }
}
