//! azurerm_dns_zone resource and data source

use std::collections::BTreeMap;

use async_trait::async_trait;
use azrm_core::handler::{DataSourceHandler, ResourceHandler, ResourceIdentity};
use azrm_core::provider::{ProviderError, ProviderResult};
use azrm_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};
use serde::{Deserialize, Serialize};

use super::API_VERSION;
use crate::client::Clients;
use crate::ids::DnsZoneId;
use crate::validate;

/// DNS zones are not regional
const ZONE_LOCATION: &str = "global";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnsZoneModel {
    pub name: String,
    pub resource_group_name: String,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_record_sets: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_number_of_record_sets: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_servers: Option<Vec<String>>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ArmZone {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default)]
    location: String,
    #[serde(default)]
    tags: BTreeMap<String, String>,
    #[serde(default)]
    properties: ArmZoneProperties,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArmZoneProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    zone_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    number_of_record_sets: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_number_of_record_sets: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name_servers: Option<Vec<String>>,
}

pub struct DnsZoneResource {
    clients: Clients,
}

impl DnsZoneResource {
    pub fn new(clients: Clients) -> Self {
        Self { clients }
    }

    async fn write(&self, id: &DnsZoneId, model: &DnsZoneModel, verb: &str) -> ProviderResult<()> {
        let body = ArmZone {
            location: ZONE_LOCATION.to_string(),
            tags: model.tags.clone(),
            properties: ArmZoneProperties {
                zone_type: Some("Public".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        self.clients
            .put_model(&id.to_string(), API_VERSION, &body, &format!("{} {}", verb, id.describe()))
            .await
    }
}

#[async_trait]
impl ResourceHandler for DnsZoneResource {
    type Model = DnsZoneModel;
    type Id = DnsZoneId;

    fn type_name(&self) -> &'static str {
        "azurerm_dns_zone"
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new(self.type_name())
            .with_description("A public DNS zone")
            .attribute(
                AttributeSchema::new("name", validate::dns_zone_name())
                    .required()
                    .force_new(),
            )
            .attribute(
                AttributeSchema::new("resource_group_name", validate::resource_group_name())
                    .required()
                    .force_new(),
            )
            .attribute(AttributeSchema::new("tags", types::tags()))
            .attribute(AttributeSchema::new("number_of_record_sets", AttributeType::Int).computed())
            .attribute(
                AttributeSchema::new("max_number_of_record_sets", AttributeType::Int).computed(),
            )
            .attribute(
                AttributeSchema::new("name_servers", AttributeType::set(AttributeType::String))
                    .computed(),
            )
    }

    fn id_for(&self, model: &DnsZoneModel) -> ProviderResult<DnsZoneId> {
        Ok(DnsZoneId::new(
            self.clients.subscription_id(),
            &model.resource_group_name,
            &model.name,
        ))
    }

    async fn create(&self, id: &DnsZoneId, model: &DnsZoneModel) -> ProviderResult<()> {
        self.write(id, model, "creating").await
    }

    async fn read(&self, id: &DnsZoneId) -> ProviderResult<Option<DnsZoneModel>> {
        let Some(zone) = self
            .clients
            .get_model::<ArmZone>(&id.to_string(), API_VERSION, &format!("retrieving {}", id.describe()))
            .await?
        else {
            return Ok(None);
        };

        Ok(Some(DnsZoneModel {
            name: id.zone_name.clone(),
            resource_group_name: id.resource_group_name.clone(),
            tags: zone.tags,
            number_of_record_sets: zone.properties.number_of_record_sets,
            max_number_of_record_sets: zone.properties.max_number_of_record_sets,
            name_servers: zone.properties.name_servers,
        }))
    }

    fn supports_update(&self) -> bool {
        true
    }

    async fn update(&self, id: &DnsZoneId, model: &DnsZoneModel) -> ProviderResult<()> {
        self.write(id, model, "updating").await
    }

    async fn delete(&self, id: &DnsZoneId) -> ProviderResult<()> {
        self.clients
            .delete(&id.to_string(), API_VERSION, &format!("deleting {}", id.describe()))
            .await
    }
}

// =============================================================================
// Data source
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnsZoneData {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_group_name: Option<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_record_sets: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_number_of_record_sets: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_servers: Option<Vec<String>>,
}

/// Looks a zone up by name. Without a resource group, every zone in the
/// subscription is searched and the name must be unique.
pub struct DnsZoneDataSource {
    clients: Clients,
}

impl DnsZoneDataSource {
    pub fn new(clients: Clients) -> Self {
        Self { clients }
    }

    async fn find_in_subscription(&self, name: &str) -> ProviderResult<Option<DnsZoneId>> {
        let collection = format!(
            "/subscriptions/{}/providers/Microsoft.Network/dnsZones",
            self.clients.subscription_id()
        );
        let zones: Vec<ArmZone> = self
            .clients
            .list_models(&collection, API_VERSION, "listing DNS Zones")
            .await?;

        let mut matches = Vec::new();
        for zone in zones {
            if !zone.name.as_deref().is_some_and(|n| n.eq_ignore_ascii_case(name)) {
                continue;
            }
            let Some(raw_id) = zone.id else { continue };
            let id = DnsZoneId::parse_insensitively(&raw_id).map_err(|e| {
                ProviderError::decode(format!("parsing DNS Zone ID {:?}", raw_id)).with_cause(e)
            })?;
            matches.push(id);
        }

        if matches.len() > 1 {
            return Err(ProviderError::validation(format!(
                "found {} DNS Zones named {:?}; specify `resource_group_name` to pick one",
                matches.len(),
                name
            )));
        }
        Ok(matches.pop())
    }
}

#[async_trait]
impl DataSourceHandler for DnsZoneDataSource {
    type Model = DnsZoneData;

    fn type_name(&self) -> &'static str {
        "azurerm_dns_zone"
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new(self.type_name())
            .attribute(AttributeSchema::new("name", validate::dns_zone_name()).required())
            .attribute(
                AttributeSchema::new("resource_group_name", validate::resource_group_name())
                    .optional_computed(),
            )
            .attribute(AttributeSchema::new("tags", types::tags()).computed())
            .attribute(AttributeSchema::new("number_of_record_sets", AttributeType::Int).computed())
            .attribute(
                AttributeSchema::new("max_number_of_record_sets", AttributeType::Int).computed(),
            )
            .attribute(
                AttributeSchema::new("name_servers", AttributeType::set(AttributeType::String))
                    .computed(),
            )
    }

    async fn read(&self, query: &DnsZoneData) -> ProviderResult<Option<(String, DnsZoneData)>> {
        let id = match &query.resource_group_name {
            Some(rg) => DnsZoneId::new(self.clients.subscription_id(), rg, &query.name),
            None => match self.find_in_subscription(&query.name).await? {
                Some(id) => id,
                None => return Ok(None),
            },
        };

        let Some(zone) = self
            .clients
            .get_model::<ArmZone>(&id.to_string(), API_VERSION, &format!("retrieving {}", id.describe()))
            .await?
        else {
            return Ok(None);
        };

        let data = DnsZoneData {
            name: id.zone_name.clone(),
            resource_group_name: Some(id.resource_group_name.clone()),
            tags: zone.tags,
            number_of_record_sets: zone.properties.number_of_record_sets,
            max_number_of_record_sets: zone.properties.max_number_of_record_sets,
            name_servers: zone.properties.name_servers,
        };
        Ok(Some((id.to_string(), data)))
    }

    fn describe(&self, query: &DnsZoneData) -> String {
        match &query.resource_group_name {
            Some(rg) => DnsZoneId::new(self.clients.subscription_id(), rg, &query.name).describe(),
            None => format!(
                "DNS Zone (Subscription: {:?}, DNS Zone Name: {:?})",
                self.clients.subscription_id(),
                query.name
            ),
        }
    }
}
