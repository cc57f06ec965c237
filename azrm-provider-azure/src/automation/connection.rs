//! azurerm_automation_connection

use std::collections::BTreeMap;

use async_trait::async_trait;
use azrm_core::handler::{ResourceHandler, ResourceIdentity};
use azrm_core::provider::ProviderResult;
use azrm_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};
use serde::{Deserialize, Serialize};

use super::{API_VERSION, account_child_schema};
use crate::client::Clients;
use crate::ids::ConnectionId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionModel {
    pub name: String,
    pub resource_group_name: String,
    pub automation_account_name: String,
    #[serde(rename = "type")]
    pub connection_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub values: BTreeMap<String, String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ArmConnection {
    #[serde(default)]
    properties: ArmConnectionProperties,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArmConnectionProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    connection_type: Option<ArmConnectionType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default)]
    field_definition_values: BTreeMap<String, String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ArmConnectionType {
    name: String,
}

pub struct ConnectionResource {
    clients: Clients,
}

impl ConnectionResource {
    pub fn new(clients: Clients) -> Self {
        Self { clients }
    }

    async fn write(&self, id: &ConnectionId, model: &ConnectionModel, verb: &str) -> ProviderResult<()> {
        let body = ArmConnection {
            properties: ArmConnectionProperties {
                connection_type: Some(ArmConnectionType {
                    name: model.connection_type.clone(),
                }),
                description: model.description.clone(),
                field_definition_values: model.values.clone(),
            },
        };
        self.clients
            .put_model(&id.to_string(), API_VERSION, &body, &format!("{} {}", verb, id.describe()))
            .await
    }
}

#[async_trait]
impl ResourceHandler for ConnectionResource {
    type Model = ConnectionModel;
    type Id = ConnectionId;

    fn type_name(&self) -> &'static str {
        "azurerm_automation_connection"
    }

    fn schema(&self) -> ResourceSchema {
        account_child_schema(self.type_name())
            .with_description("Credentials and endpoints a runbook uses to reach an external system")
            .attribute(
                AttributeSchema::new("name", types::non_empty_string())
                    .required()
                    .force_new(),
            )
            .attribute(
                AttributeSchema::new("type", types::non_empty_string())
                    .required()
                    .force_new(),
            )
            .attribute(AttributeSchema::new("description", AttributeType::String))
            .attribute(
                AttributeSchema::new("values", AttributeType::map(AttributeType::String)).required(),
            )
    }

    fn validate(&self, model: &ConnectionModel) -> Result<(), Vec<String>> {
        if model.values.is_empty() {
            return Err(vec!["`values` must contain at least one field".to_string()]);
        }
        Ok(())
    }

    fn id_for(&self, model: &ConnectionModel) -> ProviderResult<ConnectionId> {
        Ok(ConnectionId::new(
            self.clients.subscription_id(),
            &model.resource_group_name,
            &model.automation_account_name,
            &model.name,
        ))
    }

    async fn create(&self, id: &ConnectionId, model: &ConnectionModel) -> ProviderResult<()> {
        self.write(id, model, "creating").await
    }

    async fn read(&self, id: &ConnectionId) -> ProviderResult<Option<ConnectionModel>> {
        let Some(connection) = self
            .clients
            .get_model::<ArmConnection>(&id.to_string(), API_VERSION, &format!("retrieving {}", id.describe()))
            .await?
        else {
            return Ok(None);
        };

        let props = connection.properties;
        Ok(Some(ConnectionModel {
            name: id.connection_name.clone(),
            resource_group_name: id.resource_group_name.clone(),
            automation_account_name: id.automation_account_name.clone(),
            connection_type: props.connection_type.map(|t| t.name).unwrap_or_default(),
            description: props.description,
            values: props.field_definition_values,
        }))
    }

    fn supports_update(&self) -> bool {
        true
    }

    async fn update(&self, id: &ConnectionId, model: &ConnectionModel) -> ProviderResult<()> {
        self.write(id, model, "updating").await
    }

    async fn delete(&self, id: &ConnectionId) -> ProviderResult<()> {
        self.clients
            .delete(&id.to_string(), API_VERSION, &format!("deleting {}", id.describe()))
            .await
    }
}
