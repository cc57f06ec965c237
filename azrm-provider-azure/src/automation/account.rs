//! azurerm_automation_account and its data source

use std::collections::BTreeMap;

use async_trait::async_trait;
use azrm_core::handler::{DataSourceHandler, ResourceHandler, ResourceIdentity};
use azrm_core::provider::ProviderResult;
use azrm_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};
use serde::{Deserialize, Serialize};

use super::API_VERSION;
use crate::client::Clients;
use crate::ids::AutomationAccountId;
use crate::utils::normalize_location;
use crate::validate;

const AGENT_REGISTRATION: &str = "agentRegistrationInformation";

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationAccountModel {
    pub name: String,
    pub resource_group_name: String,
    pub location: String,
    pub sku_name: String,
    #[serde(default = "default_true")]
    pub public_network_access_enabled: bool,
    #[serde(default = "default_true")]
    pub local_authentication_enabled: bool,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dsc_server_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dsc_primary_access_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dsc_secondary_access_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hybrid_service_url: Option<String>,
}

// ARM payloads

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArmAccount {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    location: Option<String>,
    #[serde(default)]
    tags: BTreeMap<String, String>,
    #[serde(default)]
    properties: ArmAccountProperties,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArmAccountProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sku: Option<ArmSku>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    public_network_access: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    disable_local_auth: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    automation_hybrid_service_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ArmSku {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct AgentRegistration {
    #[serde(default)]
    endpoint: Option<String>,
    #[serde(default)]
    keys: Option<AgentRegistrationKeys>,
}

#[derive(Debug, Default, Deserialize)]
struct AgentRegistrationKeys {
    #[serde(default)]
    primary: Option<String>,
    #[serde(default)]
    secondary: Option<String>,
}

fn expand(model: &AutomationAccountModel) -> ArmAccount {
    ArmAccount {
        location: Some(normalize_location(&model.location)),
        tags: model.tags.clone(),
        properties: ArmAccountProperties {
            sku: Some(ArmSku {
                name: model.sku_name.clone(),
            }),
            public_network_access: Some(model.public_network_access_enabled),
            disable_local_auth: Some(!model.local_authentication_enabled),
            automation_hybrid_service_url: None,
        },
    }
}

/// Fetch an account together with its DSC registration details
async fn fetch(
    clients: &Clients,
    id: &AutomationAccountId,
) -> ProviderResult<Option<(ArmAccount, AgentRegistration)>> {
    let action = format!("retrieving {}", id.describe());
    let Some(account) = clients
        .get_model::<ArmAccount>(&id.to_string(), API_VERSION, &action)
        .await?
    else {
        return Ok(None);
    };

    let registration = clients
        .get_model::<AgentRegistration>(
            &format!("{}/{}", id, AGENT_REGISTRATION),
            API_VERSION,
            &format!("retrieving Agent Registration Info for {}", id.describe()),
        )
        .await?
        .unwrap_or_default();
    Ok(Some((account, registration)))
}

pub struct AutomationAccountResource {
    clients: Clients,
}

impl AutomationAccountResource {
    pub fn new(clients: Clients) -> Self {
        Self { clients }
    }
}

#[async_trait]
impl ResourceHandler for AutomationAccountResource {
    type Model = AutomationAccountModel;
    type Id = AutomationAccountId;

    fn type_name(&self) -> &'static str {
        "azurerm_automation_account"
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new(self.type_name())
            .with_description("An Automation Account")
            .attribute(
                AttributeSchema::new("name", validate::automation_account_name())
                    .required()
                    .force_new(),
            )
            .attribute(
                AttributeSchema::new("resource_group_name", validate::resource_group_name())
                    .required()
                    .force_new(),
            )
            .attribute(
                AttributeSchema::new("location", types::non_empty_string())
                    .required()
                    .force_new()
                    .with_normalizer(normalize_location),
            )
            .attribute(
                AttributeSchema::new("sku_name", AttributeType::enumeration(&["Basic", "Free"]))
                    .required(),
            )
            .attribute(
                AttributeSchema::new("public_network_access_enabled", AttributeType::Bool)
                    .with_default(true),
            )
            .attribute(
                AttributeSchema::new("local_authentication_enabled", AttributeType::Bool)
                    .with_default(true),
            )
            .attribute(AttributeSchema::new("tags", types::tags()))
            .attribute(AttributeSchema::new("dsc_server_endpoint", AttributeType::String).computed())
            .attribute(
                AttributeSchema::new("dsc_primary_access_key", AttributeType::String)
                    .computed()
                    .sensitive(),
            )
            .attribute(
                AttributeSchema::new("dsc_secondary_access_key", AttributeType::String)
                    .computed()
                    .sensitive(),
            )
            .attribute(AttributeSchema::new("hybrid_service_url", AttributeType::String).computed())
    }

    fn id_for(&self, model: &AutomationAccountModel) -> ProviderResult<AutomationAccountId> {
        Ok(AutomationAccountId::new(
            self.clients.subscription_id(),
            &model.resource_group_name,
            &model.name,
        ))
    }

    async fn create(&self, id: &AutomationAccountId, model: &AutomationAccountModel) -> ProviderResult<()> {
        self.clients
            .put_model(
                &id.to_string(),
                API_VERSION,
                &expand(model),
                &format!("creating {}", id.describe()),
            )
            .await
    }

    async fn read(&self, id: &AutomationAccountId) -> ProviderResult<Option<AutomationAccountModel>> {
        let Some((account, registration)) = fetch(&self.clients, id).await? else {
            return Ok(None);
        };
        let keys = registration.keys.unwrap_or_default();
        let props = account.properties;

        Ok(Some(AutomationAccountModel {
            name: id.automation_account_name.clone(),
            resource_group_name: id.resource_group_name.clone(),
            location: account.location.map(|l| normalize_location(&l)).unwrap_or_default(),
            sku_name: props.sku.map(|s| s.name).unwrap_or_default(),
            public_network_access_enabled: props.public_network_access.unwrap_or(true),
            local_authentication_enabled: !props.disable_local_auth.unwrap_or(false),
            tags: account.tags,
            dsc_server_endpoint: registration.endpoint,
            dsc_primary_access_key: keys.primary,
            dsc_secondary_access_key: keys.secondary,
            hybrid_service_url: props.automation_hybrid_service_url,
        }))
    }

    fn supports_update(&self) -> bool {
        true
    }

    async fn update(&self, id: &AutomationAccountId, model: &AutomationAccountModel) -> ProviderResult<()> {
        self.clients
            .patch_model(
                &id.to_string(),
                API_VERSION,
                &expand(model),
                &format!("updating {}", id.describe()),
            )
            .await
    }

    async fn delete(&self, id: &AutomationAccountId) -> ProviderResult<()> {
        self.clients
            .delete(&id.to_string(), API_VERSION, &format!("deleting {}", id.describe()))
            .await
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationAccountData {
    pub name: String,
    pub resource_group_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hybrid_service_url: Option<String>,
}

/// data.azurerm_automation_account
pub struct AutomationAccountDataSource {
    clients: Clients,
}

impl AutomationAccountDataSource {
    pub fn new(clients: Clients) -> Self {
        Self { clients }
    }

    fn id_for(&self, query: &AutomationAccountData) -> AutomationAccountId {
        AutomationAccountId::new(
            self.clients.subscription_id(),
            &query.resource_group_name,
            &query.name,
        )
    }
}

#[async_trait]
impl DataSourceHandler for AutomationAccountDataSource {
    type Model = AutomationAccountData;

    fn type_name(&self) -> &'static str {
        "azurerm_automation_account"
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new(self.type_name())
            .attribute(AttributeSchema::new("name", validate::automation_account_name()).required())
            .attribute(
                AttributeSchema::new("resource_group_name", validate::resource_group_name())
                    .required(),
            )
            .attribute(AttributeSchema::new("location", AttributeType::String).computed())
            .attribute(AttributeSchema::new("endpoint", AttributeType::String).computed())
            .attribute(
                AttributeSchema::new("primary_key", AttributeType::String)
                    .computed()
                    .sensitive(),
            )
            .attribute(
                AttributeSchema::new("secondary_key", AttributeType::String)
                    .computed()
                    .sensitive(),
            )
            .attribute(AttributeSchema::new("hybrid_service_url", AttributeType::String).computed())
    }

    async fn read(
        &self,
        query: &AutomationAccountData,
    ) -> ProviderResult<Option<(String, AutomationAccountData)>> {
        let id = self.id_for(query);
        let Some((account, registration)) = fetch(&self.clients, &id).await? else {
            return Ok(None);
        };
        let keys = registration.keys.unwrap_or_default();

        Ok(Some((
            id.to_string(),
            AutomationAccountData {
                name: query.name.clone(),
                resource_group_name: query.resource_group_name.clone(),
                location: account.location.map(|l| normalize_location(&l)),
                endpoint: registration.endpoint,
                primary_key: keys.primary,
                secondary_key: keys.secondary,
                hybrid_service_url: account.properties.automation_hybrid_service_url,
            },
        )))
    }

    fn describe(&self, query: &AutomationAccountData) -> String {
        self.id_for(query).describe()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use azrm_core::config::ProviderConfig;
    use azrm_core::differ::Diff;
    use azrm_core::handler::{DataSource, Managed};
    use azrm_core::provider::{ErrorKind, ManagedResource, ReadOnlyResource};
    use azrm_core::resource::{Attributes, Value};

    use super::*;
    use crate::memory::MemoryArm;

    fn setup() -> (Arc<MemoryArm>, Clients) {
        let arm = Arc::new(MemoryArm::new());
        let clients = Clients::new(arm.clone(), ProviderConfig::new("sub1"));
        (arm, clients)
    }

    fn config() -> Attributes {
        let mut attrs = Attributes::new();
        attrs.insert("name".to_string(), Value::from("acctest-1"));
        attrs.insert("resource_group_name".to_string(), Value::from("acctestRG-auto-1"));
        attrs.insert("location".to_string(), Value::from("West Europe"));
        attrs.insert("sku_name".to_string(), Value::from("Basic"));
        attrs
    }

    #[tokio::test]
    async fn create_populates_dsc_fields() {
        let (_, clients) = setup();
        let accounts = Managed::new(AutomationAccountResource::new(clients));
        let state = accounts.create(&config()).await.unwrap();

        assert_eq!(
            state.id.as_deref(),
            Some("/subscriptions/sub1/resourceGroups/acctestRG-auto-1/providers/Microsoft.Automation/automationAccounts/acctest-1")
        );
        assert_eq!(state.get("sku_name"), Some(&Value::from("Basic")));
        assert_eq!(state.get("location"), Some(&Value::from("westeurope")));
        assert_eq!(state.get("public_network_access_enabled"), Some(&Value::Bool(true)));
        for field in [
            "dsc_server_endpoint",
            "dsc_primary_access_key",
            "dsc_secondary_access_key",
            "hybrid_service_url",
        ] {
            let value = state.get(field).and_then(|v| v.as_str()).unwrap_or_default();
            assert!(!value.is_empty(), "{field} should be populated");
        }
    }

    #[tokio::test]
    async fn plan_after_create_is_unchanged() {
        let (_, clients) = setup();
        let accounts = Managed::new(AutomationAccountResource::new(clients));
        let state = accounts.create(&config()).await.unwrap();
        assert_eq!(accounts.plan(&state.attributes, &config()).unwrap(), Diff::NoChange);

        let mut moved = config();
        moved.insert("location".to_string(), Value::from("North Europe"));
        assert_eq!(
            accounts.plan(&state.attributes, &moved).unwrap(),
            Diff::Replace {
                changed_attributes: vec!["location".to_string()],
                force_new_attributes: vec!["location".to_string()],
            }
        );
    }

    #[tokio::test]
    async fn second_create_requires_import() {
        let (_, clients) = setup();
        let accounts = Managed::new(AutomationAccountResource::new(clients));
        accounts.create(&config()).await.unwrap();
        let err = accounts.create(&config()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::AlreadyExists);
    }

    #[tokio::test]
    async fn invalid_name_is_rejected_before_any_call() {
        let (arm, clients) = setup();
        let accounts = Managed::new(AutomationAccountResource::new(clients));
        let mut attrs = config();
        attrs.insert("name".to_string(), Value::from("ab"));

        let err = accounts.create(&attrs).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(arm.calls().is_empty());
    }

    #[tokio::test]
    async fn update_patches_in_place() {
        let (arm, clients) = setup();
        let accounts = Managed::new(AutomationAccountResource::new(clients));
        let id = accounts.create(&config()).await.unwrap().id.unwrap();

        let mut attrs = config();
        attrs.insert("public_network_access_enabled".to_string(), Value::Bool(false));
        attrs.insert(
            "tags".to_string(),
            Value::Map([("env".to_string(), Value::from("test"))].into_iter().collect()),
        );
        let state = accounts.update(&id, &attrs).await.unwrap();
        assert_eq!(state.get("public_network_access_enabled"), Some(&Value::Bool(false)));
        assert!(arm.calls().iter().any(|c| c.starts_with("PATCH ")));
    }

    #[tokio::test]
    async fn delete_twice_succeeds() {
        let (_, clients) = setup();
        let accounts = Managed::new(AutomationAccountResource::new(clients));
        let id = accounts.create(&config()).await.unwrap().id.unwrap();
        accounts.delete(&id).await.unwrap();
        accounts.delete(&id).await.unwrap();
        assert!(!accounts.read(&id).await.unwrap().exists);
    }

    #[tokio::test]
    async fn data_source_reads_keys() {
        let (_, clients) = setup();
        Managed::new(AutomationAccountResource::new(clients.clone()))
            .create(&config())
            .await
            .unwrap();

        let data = DataSource::new(AutomationAccountDataSource::new(clients));
        let mut query = Attributes::new();
        query.insert("name".to_string(), Value::from("acctest-1"));
        query.insert("resource_group_name".to_string(), Value::from("acctestRG-auto-1"));
        let state = data.read(&query).await.unwrap();
        assert!(state.get("primary_key").is_some());
        assert!(state.get("endpoint").is_some());

        query.insert("name".to_string(), Value::from("missing-1"));
        assert!(data.read(&query).await.unwrap_err().is_not_found());
    }
}
