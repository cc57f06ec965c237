//! azurerm_automation_variable_{bool,datetime,int,string,object}
//!
//! Azure stores every variable value as a string holding a serialized
//! literal. The resource type fixes which kind of literal is expected:
//!
//! | kind     | stored form                |
//! |----------|----------------------------|
//! | bool     | `true` / `false`           |
//! | int      | `42`                       |
//! | string   | `"quoted and escaped"`     |
//! | datetime | `"\/Date(1556142054074)\/"` |
//! | object   | a JSON document            |

use std::sync::LazyLock;

use async_trait::async_trait;
use azrm_core::handler::{DataSourceHandler, ResourceHandler, ResourceIdentity};
use azrm_core::provider::{ProviderError, ProviderResult};
use azrm_core::schema::{AttributeSchema, AttributeType, Normalizer, ResourceSchema, types};
use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::{API_VERSION, account_child_schema};
use crate::client::Clients;
use crate::ids::VariableId;
use crate::utils::{normalize_json, parse_rfc3339};
use crate::validate;

static DATE_LITERAL: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r#"^"\\?/Date\((-?\d+)\)\\?/"$"#));

/// Which literal a variable holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    Bool,
    DateTime,
    Int,
    String,
    Object,
}

impl VariableKind {
    pub const ALL: [VariableKind; 5] = [
        VariableKind::Bool,
        VariableKind::DateTime,
        VariableKind::Int,
        VariableKind::String,
        VariableKind::Object,
    ];

    pub fn name(self) -> &'static str {
        match self {
            VariableKind::Bool => "bool",
            VariableKind::DateTime => "datetime",
            VariableKind::Int => "int",
            VariableKind::String => "string",
            VariableKind::Object => "object",
        }
    }

    pub fn type_name(self) -> &'static str {
        match self {
            VariableKind::Bool => "azurerm_automation_variable_bool",
            VariableKind::DateTime => "azurerm_automation_variable_datetime",
            VariableKind::Int => "azurerm_automation_variable_int",
            VariableKind::String => "azurerm_automation_variable_string",
            VariableKind::Object => "azurerm_automation_variable_object",
        }
    }

    fn value_type(self) -> AttributeType {
        match self {
            VariableKind::Bool => AttributeType::Bool,
            VariableKind::DateTime => validate::rfc3339(),
            VariableKind::Int => types::int_between(i32::MIN as i64, i32::MAX as i64),
            VariableKind::String => AttributeType::String,
            VariableKind::Object => validate::json_text(),
        }
    }

    /// How configured values compare against what was read back
    fn value_normalizer(self) -> Option<Normalizer> {
        match self {
            VariableKind::DateTime => Some(normalize_timestamp),
            VariableKind::Object => Some(normalize_json),
            _ => None,
        }
    }
}

/// A decoded variable value
#[derive(Debug, Clone, PartialEq)]
pub enum VariableValue {
    Bool(bool),
    DateTime(DateTime<Utc>),
    Int(i32),
    String(String),
    Object(JsonValue),
}

impl VariableValue {
    pub fn kind(&self) -> VariableKind {
        match self {
            VariableValue::Bool(_) => VariableKind::Bool,
            VariableValue::DateTime(_) => VariableKind::DateTime,
            VariableValue::Int(_) => VariableKind::Int,
            VariableValue::String(_) => VariableKind::String,
            VariableValue::Object(_) => VariableKind::Object,
        }
    }

    /// Serialize into the literal Azure stores
    pub fn to_literal(&self) -> String {
        match self {
            VariableValue::Bool(b) => b.to_string(),
            VariableValue::Int(n) => n.to_string(),
            VariableValue::String(s) => quote(s),
            VariableValue::DateTime(t) => format!("\"\\/Date({})\\/\"", t.timestamp_millis()),
            VariableValue::Object(v) => v.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Expected value {input:?} to be {expected:?}, actual type is {actual:?}")]
pub struct VariableTypeError {
    pub input: String,
    pub expected: &'static str,
    pub actual: &'static str,
}

fn quote(s: &str) -> String {
    JsonValue::String(s.to_string()).to_string()
}

fn unquote(s: &str) -> Option<String> {
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        serde_json::from_str(s).ok()
    } else {
        None
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

fn parse_date_literal(s: &str) -> Option<DateTime<Utc>> {
    let re = DATE_LITERAL.as_ref().ok()?;
    let millis: i64 = re.captures(s)?.get(1)?.as_str().parse().ok()?;
    DateTime::from_timestamp_millis(millis)
}

/// Decode a stored literal, trying date, string, integer, boolean and
/// finally JSON; the result must be of the `expected` kind
pub fn parse_literal(input: &str, expected: VariableKind) -> Result<VariableValue, VariableTypeError> {
    let value = if let Some(t) = parse_date_literal(input) {
        Some(VariableValue::DateTime(t))
    } else if let Some(s) = unquote(input) {
        Some(VariableValue::String(s))
    } else if let Ok(n) = input.parse::<i32>() {
        Some(VariableValue::Int(n))
    } else if let Some(b) = parse_bool(input) {
        Some(VariableValue::Bool(b))
    } else {
        serde_json::from_str::<JsonValue>(input)
            .ok()
            .map(VariableValue::Object)
    };

    match value {
        Some(v) if v.kind() == expected => Ok(v),
        other => Err(VariableTypeError {
            input: input.to_string(),
            expected: expected.name(),
            actual: other.map(|v| v.kind().name()).unwrap_or("unknown"),
        }),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableModel {
    pub name: String,
    pub resource_group_name: String,
    pub automation_account_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub encrypted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<JsonValue>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ArmVariable {
    #[serde(default)]
    properties: ArmVariableProperties,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArmVariableProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default)]
    is_encrypted: bool,
}

/// Convert the configured attribute value into a [`VariableValue`]
fn from_attribute(kind: VariableKind, value: &JsonValue) -> Result<VariableValue, String> {
    let mismatch = || format!("`value` must be a {} for {}", kind.name(), kind.type_name());
    match kind {
        VariableKind::Bool => value.as_bool().map(VariableValue::Bool).ok_or_else(mismatch),
        VariableKind::Int => value
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .map(VariableValue::Int)
            .ok_or_else(mismatch),
        VariableKind::String => value
            .as_str()
            .map(|s| VariableValue::String(s.to_string()))
            .ok_or_else(mismatch),
        VariableKind::DateTime => {
            let text = value.as_str().ok_or_else(mismatch)?;
            parse_rfc3339(text).map(VariableValue::DateTime)
        }
        VariableKind::Object => {
            let text = value.as_str().ok_or_else(mismatch)?;
            serde_json::from_str(text)
                .map(VariableValue::Object)
                .map_err(|e| format!("`value` is not valid JSON: {}", e))
        }
    }
}

/// Timestamps in the millisecond precision Azure keeps for variables
fn normalize_timestamp(s: &str) -> String {
    parse_rfc3339(s)
        .map(|t| t.to_rfc3339_opts(SecondsFormat::AutoSi, true))
        .unwrap_or_else(|_| s.to_string())
}

fn value_attribute(kind: VariableKind) -> AttributeSchema {
    let value = AttributeSchema::new("value", kind.value_type()).sensitive();
    match kind.value_normalizer() {
        Some(normalize) => value.with_normalizer(normalize),
        None => value,
    }
}

/// Convert a decoded value back into its attribute form
fn to_attribute(value: &VariableValue) -> JsonValue {
    match value {
        VariableValue::Bool(b) => JsonValue::Bool(*b),
        VariableValue::Int(n) => JsonValue::from(*n),
        VariableValue::String(s) => JsonValue::String(s.clone()),
        VariableValue::DateTime(t) => {
            JsonValue::String(t.to_rfc3339_opts(SecondsFormat::AutoSi, true))
        }
        VariableValue::Object(v) => JsonValue::String(v.to_string()),
    }
}

async fn fetch(
    clients: &Clients,
    kind: VariableKind,
    id: &VariableId,
) -> ProviderResult<Option<VariableModel>> {
    let Some(variable) = clients
        .get_model::<ArmVariable>(&id.to_string(), API_VERSION, &format!("retrieving {}", id.describe()))
        .await?
    else {
        return Ok(None);
    };

    let props = variable.properties;
    let value = match props.value.as_deref() {
        Some(literal) => {
            let decoded = parse_literal(literal, kind).map_err(|e| {
                ProviderError::decode(format!("reading the value of {}", id.describe())).with_cause(e)
            })?;
            Some(to_attribute(&decoded))
        }
        None => None,
    };

    Ok(Some(VariableModel {
        name: id.variable_name.clone(),
        resource_group_name: id.resource_group_name.clone(),
        automation_account_name: id.automation_account_name.clone(),
        description: props.description,
        encrypted: props.is_encrypted,
        value,
    }))
}

/// One resource type per [`VariableKind`]
pub struct VariableResource {
    clients: Clients,
    kind: VariableKind,
}

impl VariableResource {
    pub fn new(clients: Clients, kind: VariableKind) -> Self {
        Self { clients, kind }
    }

    async fn write(&self, id: &VariableId, model: &VariableModel, verb: &str) -> ProviderResult<()> {
        let value = match &model.value {
            Some(v) => Some(
                from_attribute(self.kind, v)
                    .map_err(ProviderError::validation)?
                    .to_literal(),
            ),
            None => None,
        };
        let body = ArmVariable {
            properties: ArmVariableProperties {
                value,
                description: model.description.clone(),
                is_encrypted: model.encrypted,
            },
        };
        self.clients
            .put_model(&id.to_string(), API_VERSION, &body, &format!("{} {}", verb, id.describe()))
            .await
    }
}

#[async_trait]
impl ResourceHandler for VariableResource {
    type Model = VariableModel;
    type Id = VariableId;

    fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }

    fn schema(&self) -> ResourceSchema {
        account_child_schema(self.type_name())
            .with_description(format!("A {} variable inside an Automation Account", self.kind.name()))
            .attribute(
                AttributeSchema::new("name", types::non_empty_string())
                    .required()
                    .force_new(),
            )
            .attribute(AttributeSchema::new("description", AttributeType::String))
            .attribute(
                AttributeSchema::new("encrypted", AttributeType::Bool)
                    .with_default(false)
                    .force_new(),
            )
            .attribute(value_attribute(self.kind))
    }

    fn validate(&self, model: &VariableModel) -> Result<(), Vec<String>> {
        match &model.value {
            Some(v) => from_attribute(self.kind, v).map(|_| ()).map_err(|e| vec![e]),
            None => Ok(()),
        }
    }

    fn id_for(&self, model: &VariableModel) -> ProviderResult<VariableId> {
        Ok(VariableId::new(
            self.clients.subscription_id(),
            &model.resource_group_name,
            &model.automation_account_name,
            &model.name,
        ))
    }

    async fn create(&self, id: &VariableId, model: &VariableModel) -> ProviderResult<()> {
        self.write(id, model, "creating").await
    }

    async fn read(&self, id: &VariableId) -> ProviderResult<Option<VariableModel>> {
        fetch(&self.clients, self.kind, id).await
    }

    fn supports_update(&self) -> bool {
        true
    }

    async fn update(&self, id: &VariableId, model: &VariableModel) -> ProviderResult<()> {
        self.write(id, model, "updating").await
    }

    async fn delete(&self, id: &VariableId) -> ProviderResult<()> {
        self.clients
            .delete(&id.to_string(), API_VERSION, &format!("deleting {}", id.describe()))
            .await
    }
}

/// data.azurerm_automation_variable_{kind}
pub struct VariableDataSource {
    clients: Clients,
    kind: VariableKind,
}

impl VariableDataSource {
    pub fn new(clients: Clients, kind: VariableKind) -> Self {
        Self { clients, kind }
    }

    fn id_for(&self, query: &VariableModel) -> VariableId {
        VariableId::new(
            self.clients.subscription_id(),
            &query.resource_group_name,
            &query.automation_account_name,
            &query.name,
        )
    }
}

#[async_trait]
impl DataSourceHandler for VariableDataSource {
    type Model = VariableModel;

    fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }

    fn schema(&self) -> ResourceSchema {
        account_child_schema(self.type_name())
            .attribute(AttributeSchema::new("name", types::non_empty_string()).required())
            .attribute(AttributeSchema::new("description", AttributeType::String).computed())
            .attribute(AttributeSchema::new("encrypted", AttributeType::Bool).computed())
            .attribute(
                AttributeSchema::new("value", self.kind.value_type())
                    .computed()
                    .sensitive(),
            )
    }

    async fn read(&self, query: &VariableModel) -> ProviderResult<Option<(String, VariableModel)>> {
        let id = self.id_for(query);
        Ok(fetch(&self.clients, self.kind, &id)
            .await?
            .map(|model| (id.to_string(), model)))
    }

    fn describe(&self, query: &VariableModel) -> String {
        self.id_for(query).describe()
    }
}
