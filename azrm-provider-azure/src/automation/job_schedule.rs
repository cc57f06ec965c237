//! azurerm_automation_job_schedule
//!
//! Links a runbook to a schedule. Azure allows any number of links for the
//! same pair, so before creating one every existing link between the runbook
//! and the schedule is removed. Links cannot be modified.

use std::collections::BTreeMap;

use async_trait::async_trait;
use azrm_core::handler::{ResourceHandler, ResourceIdentity};
use azrm_core::provider::{ProviderError, ProviderResult};
use azrm_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};
use serde::{Deserialize, Serialize};

use super::{API_VERSION, account_child_schema};
use crate::client::Clients;
use crate::ids::{AccountChild, JobScheduleId, RunbookId, ScheduleId};
use crate::validate;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobScheduleModel {
    pub resource_group_name: String,
    pub automation_account_name: String,
    pub runbook_name: String,
    pub schedule_name: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_on: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_schedule_id: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ArmJobSchedule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(default)]
    properties: ArmJobScheduleProperties,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArmJobScheduleProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    job_schedule_id: Option<String>,
    #[serde(default)]
    schedule: NameRef,
    #[serde(default)]
    runbook: NameRef,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    parameters: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    run_on: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct NameRef {
    #[serde(default)]
    name: String,
}

pub struct JobScheduleResource {
    clients: Clients,
}

impl JobScheduleResource {
    pub fn new(clients: Clients) -> Self {
        Self { clients }
    }

    /// Remove every existing link between the runbook and the schedule
    async fn remove_existing_links(
        &self,
        id: &JobScheduleId,
        model: &JobScheduleModel,
    ) -> ProviderResult<()> {
        let account = id.account_id();
        let existing: Vec<ArmJobSchedule> = self
            .clients
            .list_models(
                &format!("{}/jobSchedules", account),
                API_VERSION,
                &format!("listing Job Schedules for {}", account.describe()),
            )
            .await?;

        for link in existing {
            let props = &link.properties;
            if !props.schedule.name.eq_ignore_ascii_case(&model.schedule_name)
                || !props.runbook.name.eq_ignore_ascii_case(&model.runbook_name)
            {
                continue;
            }
            let Some(link_id) = link.id.as_deref().and_then(|i| JobScheduleId::parse_insensitively(i).ok())
            else {
                continue;
            };

            log::info!(
                "removing existing link between runbook {:?} and schedule {:?}: {}",
                model.runbook_name,
                model.schedule_name,
                link_id.describe()
            );
            match self
                .clients
                .delete(&link_id.to_string(), API_VERSION, &format!("deleting {}", link_id.describe()))
                .await
            {
                Err(e) if e.is_not_found() => {}
                other => other?,
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ResourceHandler for JobScheduleResource {
    type Model = JobScheduleModel;
    type Id = JobScheduleId;

    fn type_name(&self) -> &'static str {
        "azurerm_automation_job_schedule"
    }

    fn schema(&self) -> ResourceSchema {
        account_child_schema(self.type_name())
            .with_description("Links a runbook to a schedule")
            .attribute(
                AttributeSchema::new("runbook_name", validate::runbook_name())
                    .required()
                    .force_new(),
            )
            .attribute(
                AttributeSchema::new("schedule_name", validate::schedule_name())
                    .required()
                    .force_new(),
            )
            .attribute(
                AttributeSchema::new("parameters", AttributeType::map(AttributeType::String))
                    .force_new(),
            )
            .attribute(AttributeSchema::new("run_on", types::non_empty_string()).force_new())
            .attribute(
                AttributeSchema::new("job_schedule_id", validate::uuid())
                    .optional_computed()
                    .force_new(),
            )
    }

    fn validate(&self, model: &JobScheduleModel) -> Result<(), Vec<String>> {
        let errors: Vec<String> = model
            .parameters
            .keys()
            .filter(|k| k.chars().any(|c| c.is_uppercase()))
            .map(|k| format!("`parameters` keys must be lowercase, got {:?}", k))
            .collect();
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    fn id_for(&self, model: &JobScheduleModel) -> ProviderResult<JobScheduleId> {
        let job_schedule_id = model
            .job_schedule_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        Ok(JobScheduleId::new(
            self.clients.subscription_id(),
            &model.resource_group_name,
            &model.automation_account_name,
            job_schedule_id,
        ))
    }

    async fn create(&self, id: &JobScheduleId, model: &JobScheduleModel) -> ProviderResult<()> {
        let runbook = RunbookId::new(
            &id.subscription_id,
            &id.resource_group_name,
            &id.automation_account_name,
            &model.runbook_name,
        );
        let schedule = ScheduleId::new(
            &id.subscription_id,
            &id.resource_group_name,
            &id.automation_account_name,
            &model.schedule_name,
        );
        for (target, describe) in [
            (runbook.to_string(), runbook.describe()),
            (schedule.to_string(), schedule.describe()),
        ] {
            let found: Option<serde_json::Value> = self
                .clients
                .get_model(&target, API_VERSION, &format!("retrieving {}", describe))
                .await?;
            if found.is_none() {
                return Err(ProviderError::not_found(format!(
                    "{} was not found, it is required to create {}",
                    describe,
                    id.describe()
                )));
            }
        }

        self.remove_existing_links(id, model).await?;

        let body = ArmJobSchedule {
            id: None,
            properties: ArmJobScheduleProperties {
                job_schedule_id: None,
                schedule: NameRef {
                    name: model.schedule_name.clone(),
                },
                runbook: NameRef {
                    name: model.runbook_name.clone(),
                },
                parameters: model.parameters.clone(),
                run_on: model.run_on.clone(),
            },
        };
        self.clients
            .put_model(&id.to_string(), API_VERSION, &body, &format!("creating {}", id.describe()))
            .await
    }

    async fn read(&self, id: &JobScheduleId) -> ProviderResult<Option<JobScheduleModel>> {
        let Some(link) = self
            .clients
            .get_model::<ArmJobSchedule>(&id.to_string(), API_VERSION, &format!("retrieving {}", id.describe()))
            .await?
        else {
            return Ok(None);
        };

        let props = link.properties;
        Ok(Some(JobScheduleModel {
            resource_group_name: id.resource_group_name.clone(),
            automation_account_name: id.automation_account_name.clone(),
            runbook_name: props.runbook.name,
            schedule_name: props.schedule.name,
            parameters: props
                .parameters
                .into_iter()
                .map(|(k, v)| (k.to_lowercase(), v))
                .collect(),
            run_on: props.run_on,
            job_schedule_id: Some(id.job_schedule_id.clone()),
        }))
    }

    async fn delete(&self, id: &JobScheduleId) -> ProviderResult<()> {
        self.clients
            .delete(&id.to_string(), API_VERSION, &format!("deleting {}", id.describe()))
            .await
    }
}
