//! azurerm_automation_runbook
//!
//! A runbook is created from its metadata first. When inline `content` is
//! given it is uploaded as the draft, published, and the runbook is polled
//! until Azure reports it as published.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use azrm_core::config::Timeouts;
use azrm_core::handler::{ResourceHandler, ResourceIdentity};
use azrm_core::poll::{StateRefresh, StateWaiter};
use azrm_core::provider::{ProviderError, ProviderResult};
use azrm_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{API_VERSION, ContentHash, account_child_schema, content_hash_schema};
use crate::client::{Clients, api_error};
use crate::ids::RunbookId;
use crate::utils::normalize_location;
use crate::validate;

pub const RUNBOOK_TYPES: &[&str] = &[
    "Graph",
    "GraphPowerShell",
    "GraphPowerShellWorkflow",
    "PowerShell",
    "PowerShell72",
    "PowerShellWorkflow",
    "Python2",
    "Python3",
    "Script",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentLink {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<ContentHash>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunbookModel {
    pub name: String,
    pub resource_group_name: String,
    pub automation_account_name: String,
    pub location: String,
    pub runbook_type: String,
    pub log_progress: bool,
    pub log_verbose: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_content_link: Option<ContentLink>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_activity_trace_level: Option<i64>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArmRunbook {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    location: Option<String>,
    #[serde(default)]
    tags: BTreeMap<String, String>,
    #[serde(default)]
    properties: ArmRunbookProperties,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArmRunbookProperties {
    #[serde(default)]
    runbook_type: String,
    #[serde(default)]
    log_progress: bool,
    #[serde(default)]
    log_verbose: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    publish_content_link: Option<ArmContentLink>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    log_activity_trace: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    state: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArmContentLink {
    uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content_hash: Option<ContentHash>,
}

fn expand(model: &RunbookModel) -> ArmRunbook {
    ArmRunbook {
        location: Some(normalize_location(&model.location)),
        tags: model.tags.clone(),
        properties: ArmRunbookProperties {
            runbook_type: model.runbook_type.clone(),
            log_progress: model.log_progress,
            log_verbose: model.log_verbose,
            description: model.description.clone(),
            publish_content_link: model.publish_content_link.as_ref().map(|link| ArmContentLink {
                uri: link.uri.clone(),
                version: link.version.clone(),
                content_hash: link.hash.clone(),
            }),
            log_activity_trace: model.log_activity_trace_level,
            state: None,
        },
    }
}

pub struct RunbookResource {
    clients: Clients,
}

impl RunbookResource {
    pub fn new(clients: Clients) -> Self {
        Self { clients }
    }

    async fn write(
        &self,
        id: &RunbookId,
        model: &RunbookModel,
        verb: &str,
        limit: Duration,
    ) -> ProviderResult<()> {
        let runbook_id = id.to_string();
        self.clients
            .put_model(
                &runbook_id,
                API_VERSION,
                &expand(model),
                &format!("{} {}", verb, id.describe()),
            )
            .await?;

        let Some(content) = &model.content else {
            return Ok(());
        };

        log::debug!("uploading draft content for {}", id.describe());
        self.clients
            .arm
            .put_content(&format!("{}/draft/content", runbook_id), API_VERSION, content)
            .await
            .map_err(|e| api_error(format!("setting the draft for {}", id.describe()), e))?;

        self.clients
            .arm
            .post(&format!("{}/publish", runbook_id), API_VERSION, json!({}))
            .await
            .map_err(|e| api_error(format!("publishing the draft for {}", id.describe()), e))?;

        let interval = self.clients.poll_interval();
        StateWaiter::new(&["New", "Edit"], &["Published"])
            .with_interval(interval)
            .with_timeout(limit)
            .wait(|| self.publish_state(id))
            .await
            .map_err(|e| {
                ProviderError::with_kind(
                    e.kind,
                    format!("waiting for the draft of {} to be published", id.describe()),
                )
                .with_cause(e)
            })?;
        Ok(())
    }

    async fn publish_state(&self, id: &RunbookId) -> ProviderResult<StateRefresh> {
        let runbook = self
            .clients
            .get_model::<ArmRunbook>(
                &id.to_string(),
                API_VERSION,
                &format!("polling {}", id.describe()),
            )
            .await?
            .ok_or_else(|| ProviderError::not_found(format!("{} disappeared", id.describe())))?;
        Ok(StateRefresh::state(
            runbook.properties.state.unwrap_or_else(|| "New".to_string()),
        ))
    }
}

#[async_trait]
impl ResourceHandler for RunbookResource {
    type Model = RunbookModel;
    type Id = RunbookId;

    fn type_name(&self) -> &'static str {
        "azurerm_automation_runbook"
    }

    fn schema(&self) -> ResourceSchema {
        account_child_schema(self.type_name())
            .with_description("A runbook inside an Automation Account")
            .attribute(
                AttributeSchema::new("name", validate::runbook_name())
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
                AttributeSchema::new("runbook_type", AttributeType::enumeration(RUNBOOK_TYPES))
                    .required(),
            )
            .attribute(AttributeSchema::new("log_progress", AttributeType::Bool).required())
            .attribute(AttributeSchema::new("log_verbose", AttributeType::Bool).required())
            .attribute(AttributeSchema::new("description", AttributeType::String))
            .attribute(AttributeSchema::new("content", AttributeType::String).optional_computed())
            .attribute(AttributeSchema::new(
                "publish_content_link",
                AttributeType::Object(vec![
                    AttributeSchema::new("uri", types::non_empty_string()).required(),
                    AttributeSchema::new("version", AttributeType::String),
                    AttributeSchema::new("hash", content_hash_schema()),
                ]),
            ))
            .attribute(AttributeSchema::new(
                "log_activity_trace_level",
                types::int_between(0, i64::MAX),
            ))
            .attribute(AttributeSchema::new("tags", types::tags()))
    }

    fn id_for(&self, model: &RunbookModel) -> ProviderResult<RunbookId> {
        Ok(RunbookId::new(
            self.clients.subscription_id(),
            &model.resource_group_name,
            &model.automation_account_name,
            &model.name,
        ))
    }

    async fn create(&self, id: &RunbookId, model: &RunbookModel) -> ProviderResult<()> {
        let limit = self.clients.timeouts(self.timeouts()).create;
        self.write(id, model, "creating", limit).await
    }

    async fn read(&self, id: &RunbookId) -> ProviderResult<Option<RunbookModel>> {
        let runbook_id = id.to_string();
        let Some(runbook) = self
            .clients
            .get_model::<ArmRunbook>(&runbook_id, API_VERSION, &format!("retrieving {}", id.describe()))
            .await?
        else {
            return Ok(None);
        };

        let content = match self
            .clients
            .arm
            .get_content(&format!("{}/content", runbook_id), API_VERSION)
            .await
        {
            Ok(content) => Some(content),
            Err(e) if e.is_not_found() => None,
            Err(e) => {
                return Err(api_error(
                    format!("retrieving the content for {}", id.describe()),
                    e,
                ));
            }
        };

        let props = runbook.properties;
        Ok(Some(RunbookModel {
            name: id.runbook_name.clone(),
            resource_group_name: id.resource_group_name.clone(),
            automation_account_name: id.automation_account_name.clone(),
            location: runbook.location.map(|l| normalize_location(&l)).unwrap_or_default(),
            runbook_type: props.runbook_type,
            log_progress: props.log_progress,
            log_verbose: props.log_verbose,
            description: props.description,
            content,
            publish_content_link: props.publish_content_link.map(|link| ContentLink {
                uri: link.uri,
                version: link.version,
                hash: link.content_hash,
            }),
            log_activity_trace_level: props.log_activity_trace,
            tags: runbook.tags,
        }))
    }

    fn supports_update(&self) -> bool {
        true
    }

    async fn update(&self, id: &RunbookId, model: &RunbookModel) -> ProviderResult<()> {
        let limit = self.clients.timeouts(self.timeouts()).update;
        self.write(id, model, "updating", limit).await
    }

    async fn delete(&self, id: &RunbookId) -> ProviderResult<()> {
        self.clients
            .delete(&id.to_string(), API_VERSION, &format!("deleting {}", id.describe()))
            .await
    }

    fn timeouts(&self) -> Timeouts {
        Timeouts {
            create: Duration::from_secs(60 * 60),
            ..Timeouts::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use azrm_core::config::ProviderConfig;
    use azrm_core::handler::Managed;
    use azrm_core::differ::Diff;
    use azrm_core::provider::{ErrorKind, ManagedResource};
    use azrm_core::resource::{Attributes, Value};

    use super::*;
    use crate::memory::MemoryArm;

    const ACCOUNT: &str =
        "/subscriptions/sub1/resourceGroups/rg1/providers/Microsoft.Automation/automationAccounts/acctest01";

    fn setup() -> (Arc<MemoryArm>, Managed<RunbookResource>) {
        let arm = Arc::new(MemoryArm::new());
        arm.insert(ACCOUNT, json!({ "location": "westeurope", "properties": {} }));
        let config = ProviderConfig::new("sub1").with_poll_interval(Duration::from_millis(1));
        let runbooks = Managed::new(RunbookResource::new(Clients::new(arm.clone(), config)));
        (arm, runbooks)
    }

    fn config() -> Attributes {
        let mut attrs = Attributes::new();
        attrs.insert("name".to_string(), Value::from("Get-AzureVMTutorial"));
        attrs.insert("resource_group_name".to_string(), Value::from("rg1"));
        attrs.insert("automation_account_name".to_string(), Value::from("acctest01"));
        attrs.insert("location".to_string(), Value::from("westeurope"));
        attrs.insert("runbook_type".to_string(), Value::from("PowerShell"));
        attrs.insert("log_progress".to_string(), Value::Bool(true));
        attrs.insert("log_verbose".to_string(), Value::Bool(true));
        attrs
    }

    #[tokio::test]
    async fn inline_content_is_published() {
        let (arm, runbooks) = setup();
        let mut attrs = config();
        attrs.insert("content".to_string(), Value::from("Write-Output 'hello'"));

        let state = runbooks.create(&attrs).await.unwrap();
        assert_eq!(state.get("content"), Some(&Value::from("Write-Output 'hello'")));

        let calls = arm.calls();
        let upload = calls.iter().position(|c| c.ends_with("/draft/content")).unwrap();
        let publish = calls.iter().position(|c| c.ends_with("/publish")).unwrap();
        assert!(upload < publish);
    }

    #[tokio::test]
    async fn content_link_is_kept() {
        let (_, runbooks) = setup();
        let mut attrs = config();
        let link: Attributes = [
            (
                "uri".to_string(),
                Value::from("https://raw.githubusercontent.com/Azure/azure-quickstart-templates/master/101-automation-runbook-getvms/Runbooks/Get-AzureVMTutorial.ps1"),
            ),
            ("version".to_string(), Value::from("1.0.0.0")),
        ]
        .into_iter()
        .collect();
        attrs.insert("publish_content_link".to_string(), Value::Map(link));

        let state = runbooks.create(&attrs).await.unwrap();
        assert!(state.get("publish_content_link").is_some());
        assert_eq!(state.get("content"), None);
    }

    #[tokio::test]
    async fn plan_after_create_is_unchanged() {
        let (_, runbooks) = setup();
        let mut attrs = config();
        attrs.insert("location".to_string(), Value::from("West Europe"));
        attrs.insert("content".to_string(), Value::from("Write-Output 'hello'"));

        let state = runbooks.create(&attrs).await.unwrap();
        assert_eq!(state.get("location"), Some(&Value::from("westeurope")));
        assert_eq!(runbooks.plan(&state.attributes, &attrs).unwrap(), Diff::NoChange);
    }

    #[tokio::test]
    async fn unknown_runbook_type_is_rejected() {
        let (_, runbooks) = setup();
        let mut attrs = config();
        attrs.insert("runbook_type".to_string(), Value::from("Bash"));
        let err = runbooks.create(&attrs).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn missing_account_fails_create() {
        let (_, runbooks) = setup();
        let mut attrs = config();
        attrs.insert("automation_account_name".to_string(), Value::from("other-acct"));
        assert!(runbooks.create(&attrs).await.is_err());
    }

    #[tokio::test]
    async fn update_replaces_content() {
        let (_, runbooks) = setup();
        let mut attrs = config();
        attrs.insert("content".to_string(), Value::from("v1"));
        let id = runbooks.create(&attrs).await.unwrap().id.unwrap();

        attrs.insert("content".to_string(), Value::from("v2"));
        attrs.insert("description".to_string(), Value::from("second revision"));
        let state = runbooks.update(&id, &attrs).await.unwrap();
        assert_eq!(state.get("content"), Some(&Value::from("v2")));
        assert_eq!(state.get("description"), Some(&Value::from("second revision")));
    }
}
