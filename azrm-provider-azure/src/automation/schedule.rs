//! azurerm_automation_schedule

use async_trait::async_trait;
use azrm_core::handler::{ResourceHandler, ResourceIdentity};
use azrm_core::provider::{ProviderError, ProviderResult};
use azrm_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{API_VERSION, account_child_schema};
use crate::client::Clients;
use crate::ids::ScheduleId;
use crate::utils::{format_rfc3339, normalize_rfc3339, parse_rfc3339};
use crate::validate;

pub const FREQUENCIES: &[&str] = &["OneTime", "Day", "Hour", "Week", "Month"];

pub const WEEK_DAYS: &[&str] = &[
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Earliest allowed start, in minutes from now
const MIN_START_LEAD_MINUTES: i64 = 5;
/// Start used when none is configured, in minutes from now
const DEFAULT_START_LEAD_MINUTES: i64 = 7;

fn default_timezone() -> String {
    "Etc/UTC".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyOccurrence {
    pub day: String,
    pub occurrence: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleModel {
    pub name: String,
    pub resource_group_name: String,
    pub automation_account_name: String,
    pub frequency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub week_days: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub month_days: Vec<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub monthly_occurrence: Vec<MonthlyOccurrence>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ArmSchedule {
    #[serde(default)]
    properties: ArmScheduleProperties,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArmScheduleProperties {
    #[serde(default)]
    frequency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    interval: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expiry_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    time_zone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    advanced_schedule: Option<ArmAdvancedSchedule>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArmAdvancedSchedule {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    week_days: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    month_days: Vec<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    monthly_occurrences: Vec<ArmMonthlyOccurrence>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ArmMonthlyOccurrence {
    occurrence: i64,
    day: String,
}

/// Check a configured start time against `now`
pub fn check_start_time(start_time: &str, now: DateTime<Utc>) -> Result<(), String> {
    let start = parse_rfc3339(start_time)?;
    let earliest = now + chrono::Duration::minutes(MIN_START_LEAD_MINUTES);
    if start < earliest {
        return Err(format!(
            "`start_time` is {}, it must be at least 5 minutes in the future ({} or later)",
            format_rfc3339(&start),
            format_rfc3339(&earliest)
        ));
    }
    Ok(())
}

/// Start time used when none is configured
pub fn default_start_time(now: DateTime<Utc>) -> String {
    format_rfc3339(&(now + chrono::Duration::minutes(DEFAULT_START_LEAD_MINUTES)))
}

fn expand(model: &ScheduleModel, start_time: String) -> ArmSchedule {
    let advanced = ArmAdvancedSchedule {
        week_days: model.week_days.clone(),
        month_days: model.month_days.clone(),
        monthly_occurrences: model
            .monthly_occurrence
            .iter()
            .map(|o| ArmMonthlyOccurrence {
                occurrence: o.occurrence,
                day: o.day.clone(),
            })
            .collect(),
    };
    let has_advanced = !(advanced.week_days.is_empty()
        && advanced.month_days.is_empty()
        && advanced.monthly_occurrences.is_empty());

    let interval = if model.frequency == "OneTime" {
        None
    } else {
        Some(model.interval.unwrap_or(1))
    };

    ArmSchedule {
        properties: ArmScheduleProperties {
            frequency: model.frequency.clone(),
            interval,
            start_time: Some(start_time),
            expiry_time: model.expiry_time.as_deref().map(normalize_rfc3339),
            description: model.description.clone(),
            time_zone: Some(model.timezone.clone()),
            advanced_schedule: has_advanced.then_some(advanced),
        },
    }
}

pub struct ScheduleResource {
    clients: Clients,
}

impl ScheduleResource {
    pub fn new(clients: Clients) -> Self {
        Self { clients }
    }

    async fn write(&self, id: &ScheduleId, model: &ScheduleModel, verb: &str) -> ProviderResult<()> {
        let start_time = match &model.start_time {
            Some(start) => normalize_rfc3339(start),
            None => default_start_time(Utc::now()),
        };
        self.clients
            .put_model(
                &id.to_string(),
                API_VERSION,
                &expand(model, start_time),
                &format!("{} {}", verb, id.describe()),
            )
            .await
    }
}

#[async_trait]
impl ResourceHandler for ScheduleResource {
    type Model = ScheduleModel;
    type Id = ScheduleId;

    fn type_name(&self) -> &'static str {
        "azurerm_automation_schedule"
    }

    fn schema(&self) -> ResourceSchema {
        account_child_schema(self.type_name())
            .with_description("A schedule that can trigger runbooks")
            .attribute(
                AttributeSchema::new("name", validate::schedule_name())
                    .required()
                    .force_new(),
            )
            .attribute(
                AttributeSchema::new("frequency", AttributeType::enumeration(FREQUENCIES))
                    .required(),
            )
            .attribute(AttributeSchema::new("interval", types::int_between(1, 100)).optional_computed())
            .attribute(
                AttributeSchema::new("start_time", validate::rfc3339())
                    .optional_computed()
                    .with_normalizer(normalize_rfc3339),
            )
            .attribute(
                AttributeSchema::new("expiry_time", validate::rfc3339())
                    .optional_computed()
                    .with_normalizer(normalize_rfc3339),
            )
            .attribute(AttributeSchema::new("description", AttributeType::String))
            .attribute(
                AttributeSchema::new("timezone", types::non_empty_string())
                    .with_default("Etc/UTC"),
            )
            .attribute(AttributeSchema::new(
                "week_days",
                AttributeType::set(AttributeType::enumeration(WEEK_DAYS)),
            ))
            .attribute(
                AttributeSchema::new(
                    "month_days",
                    AttributeType::set(AttributeType::custom(
                        "MonthDay",
                        AttributeType::Int,
                        |value| match value.as_int() {
                            Some(-1) | Some(1..=31) => Ok(()),
                            other => Err(format!(
                                "month days must be between 1 and 31 or -1 for the last day, got {:?}",
                                other
                            )),
                        },
                    )),
                )
                .conflicts_with(&["monthly_occurrence"]),
            )
            .attribute(
                AttributeSchema::new(
                    "monthly_occurrence",
                    AttributeType::list(AttributeType::Object(vec![
                        AttributeSchema::new("day", AttributeType::enumeration(WEEK_DAYS))
                            .required(),
                        AttributeSchema::new(
                            "occurrence",
                            AttributeType::custom("Occurrence", AttributeType::Int, |value| {
                                match value.as_int() {
                                    Some(-1) | Some(1..=5) => Ok(()),
                                    other => Err(format!(
                                        "occurrence must be between 1 and 5 or -1 for the last one, got {:?}",
                                        other
                                    )),
                                }
                            }),
                        )
                        .required(),
                    ])),
                )
                .conflicts_with(&["month_days"]),
            )
    }

    fn validate(&self, model: &ScheduleModel) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        let frequency = model.frequency.as_str();

        if frequency == "OneTime" && model.interval.is_some() {
            errors.push("`interval` cannot be set when frequency is `OneTime`".to_string());
        }
        if frequency != "Week" && !model.week_days.is_empty() {
            errors.push("`week_days` can only be set when frequency is `Week`".to_string());
        }
        if frequency != "Month" && !model.month_days.is_empty() {
            errors.push("`month_days` can only be set when frequency is `Month`".to_string());
        }
        if frequency != "Month" && !model.monthly_occurrence.is_empty() {
            errors.push("`monthly_occurrence` can only be set when frequency is `Month`".to_string());
        }
        if let (Some(start), Some(expiry)) = (&model.start_time, &model.expiry_time)
            && let (Ok(start), Ok(expiry)) = (parse_rfc3339(start), parse_rfc3339(expiry))
            && expiry <= start
        {
            errors.push("`expiry_time` must be later than `start_time`".to_string());
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    fn validate_create(&self, model: &ScheduleModel) -> Result<(), Vec<String>> {
        match &model.start_time {
            Some(start) => check_start_time(start, Utc::now()).map_err(|e| vec![e]),
            None => Ok(()),
        }
    }

    fn id_for(&self, model: &ScheduleModel) -> ProviderResult<ScheduleId> {
        Ok(ScheduleId::new(
            self.clients.subscription_id(),
            &model.resource_group_name,
            &model.automation_account_name,
            &model.name,
        ))
    }

    async fn create(&self, id: &ScheduleId, model: &ScheduleModel) -> ProviderResult<()> {
        self.write(id, model, "creating").await
    }

    async fn read(&self, id: &ScheduleId) -> ProviderResult<Option<ScheduleModel>> {
        let Some(schedule) = self
            .clients
            .get_model::<ArmSchedule>(&id.to_string(), API_VERSION, &format!("retrieving {}", id.describe()))
            .await?
        else {
            return Ok(None);
        };

        let props = schedule.properties;
        if props.frequency.is_empty() {
            return Err(ProviderError::decode(format!(
                "{} was returned without a frequency",
                id.describe()
            )));
        }
        let advanced = props.advanced_schedule.unwrap_or_default();

        Ok(Some(ScheduleModel {
            name: id.schedule_name.clone(),
            resource_group_name: id.resource_group_name.clone(),
            automation_account_name: id.automation_account_name.clone(),
            interval: if props.frequency == "OneTime" {
                None
            } else {
                props.interval
            },
            frequency: props.frequency,
            start_time: props.start_time.as_deref().map(normalize_rfc3339),
            expiry_time: props.expiry_time.as_deref().map(normalize_rfc3339),
            description: props.description,
            timezone: props.time_zone.unwrap_or_else(default_timezone),
            week_days: advanced.week_days,
            month_days: advanced.month_days,
            monthly_occurrence: advanced
                .monthly_occurrences
                .into_iter()
                .map(|o| MonthlyOccurrence {
                    day: o.day,
                    occurrence: o.occurrence,
                })
                .collect(),
        }))
    }

    fn supports_update(&self) -> bool {
        true
    }

    async fn update(&self, id: &ScheduleId, model: &ScheduleModel) -> ProviderResult<()> {
        self.write(id, model, "updating").await
    }

    async fn delete(&self, id: &ScheduleId) -> ProviderResult<()> {
        self.clients
            .delete(&id.to_string(), API_VERSION, &format!("deleting {}", id.describe()))
            .await
    }
}
