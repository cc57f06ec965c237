//! Azure DNS zones and record sets
//!
//! Every record type shares the same record-set plumbing: one ID shape, one
//! ARM document with TTL and metadata, one CRUD flow. [`RecordKind`] supplies
//! the parts that differ, and [`RecordSetResource`] is the handler built on it.

use std::collections::BTreeMap;
use std::marker::PhantomData;

use async_trait::async_trait;
use azrm_core::handler::{ResourceHandler, ResourceIdentity};
use azrm_core::provider::ProviderResult;
use azrm_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::client::Clients;
use crate::ids::RecordSetId;
use crate::validate;

pub mod records;
pub mod zone;

pub use records::{
    AaaaRecord, ARecord, CaaRecord, CnameRecord, MxRecord, NsRecord, PtrRecord, SrvRecord,
    TxtRecord,
};
pub use zone::{DnsZoneDataSource, DnsZoneResource};

pub const API_VERSION: &str = "2018-05-01";

// =============================================================================
// ARM record set document
// =============================================================================

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ArmRecordSet {
    #[serde(default)]
    pub properties: ArmRecordSetProperties,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ArmRecordSetProperties {
    #[serde(rename = "TTL", default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<i64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fqdn: Option<String>,
    #[serde(rename = "targetResource", default, skip_serializing_if = "Option::is_none")]
    pub target_resource: Option<ArmSubResource>,
    #[serde(rename = "ARecords", default, skip_serializing_if = "Option::is_none")]
    pub a_records: Option<Vec<ArmARecord>>,
    #[serde(rename = "AAAARecords", default, skip_serializing_if = "Option::is_none")]
    pub aaaa_records: Option<Vec<ArmAaaaRecord>>,
    #[serde(rename = "CNAMERecord", default, skip_serializing_if = "Option::is_none")]
    pub cname_record: Option<ArmCnameRecord>,
    #[serde(rename = "MXRecords", default, skip_serializing_if = "Option::is_none")]
    pub mx_records: Option<Vec<ArmMxRecord>>,
    #[serde(rename = "NSRecords", default, skip_serializing_if = "Option::is_none")]
    pub ns_records: Option<Vec<ArmNsRecord>>,
    #[serde(rename = "PTRRecords", default, skip_serializing_if = "Option::is_none")]
    pub ptr_records: Option<Vec<ArmPtrRecord>>,
    #[serde(rename = "SRVRecords", default, skip_serializing_if = "Option::is_none")]
    pub srv_records: Option<Vec<ArmSrvRecord>>,
    #[serde(rename = "TXTRecords", default, skip_serializing_if = "Option::is_none")]
    pub txt_records: Option<Vec<ArmTxtRecord>>,
    #[serde(rename = "caaRecords", default, skip_serializing_if = "Option::is_none")]
    pub caa_records: Option<Vec<ArmCaaRecord>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArmSubResource {
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArmARecord {
    #[serde(rename = "ipv4Address")]
    pub ipv4_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArmAaaaRecord {
    #[serde(rename = "ipv6Address")]
    pub ipv6_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArmCnameRecord {
    pub cname: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArmMxRecord {
    pub preference: i64,
    pub exchange: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArmNsRecord {
    pub nsdname: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArmPtrRecord {
    pub ptrdname: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArmSrvRecord {
    pub priority: i64,
    pub weight: i64,
    pub port: i64,
    pub target: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArmTxtRecord {
    pub value: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArmCaaRecord {
    pub flags: i64,
    pub tag: String,
    pub value: String,
}

// =============================================================================
// Record kinds
// =============================================================================

/// The record-type specific half of a record set resource
pub trait RecordKind: Send + Sync + 'static {
    type Id: RecordSetId;
    type Records: Serialize + DeserializeOwned + Clone + Send + Sync + 'static;

    /// Resource type name (e.g., "azurerm_dns_a_record")
    const TYPE_NAME: &'static str;

    /// Value of `name` when it is not configured
    fn default_name() -> Option<&'static str> {
        None
    }

    /// Add the record attributes to the common record set schema
    fn record_schema(schema: ResourceSchema) -> ResourceSchema;

    fn validate(_records: &Self::Records) -> Result<(), Vec<String>> {
        Ok(())
    }

    fn expand(records: &Self::Records, properties: &mut ArmRecordSetProperties);

    fn flatten(properties: &ArmRecordSetProperties) -> Self::Records;
}

/// Configuration and state of a record set
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(serialize = "R: Serialize", deserialize = "R: DeserializeOwned"))]
pub struct RecordSetModel<R> {
    pub name: String,
    pub resource_group_name: String,
    pub zone_name: String,
    pub ttl: i64,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fqdn: Option<String>,
    #[serde(flatten)]
    pub records: R,
}

/// Generic record set handler
pub struct RecordSetResource<K: RecordKind> {
    clients: Clients,
    _kind: PhantomData<fn() -> K>,
}

impl<K: RecordKind> RecordSetResource<K> {
    pub fn new(clients: Clients) -> Self {
        Self {
            clients,
            _kind: PhantomData,
        }
    }

    async fn write(
        &self,
        id: &K::Id,
        model: &RecordSetModel<K::Records>,
        verb: &str,
    ) -> ProviderResult<()> {
        let mut properties = ArmRecordSetProperties {
            ttl: Some(model.ttl),
            metadata: model.tags.clone(),
            ..Default::default()
        };
        K::expand(&model.records, &mut properties);

        self.clients
            .put_model(
                &id.to_string(),
                API_VERSION,
                &ArmRecordSet { properties },
                &format!("{} {}", verb, id.describe()),
            )
            .await
    }
}

#[async_trait]
impl<K: RecordKind> ResourceHandler for RecordSetResource<K> {
    type Model = RecordSetModel<K::Records>;
    type Id = K::Id;

    fn type_name(&self) -> &'static str {
        K::TYPE_NAME
    }

    fn schema(&self) -> ResourceSchema {
        let name = AttributeSchema::new("name", types::non_empty_string()).force_new();
        let name = match K::default_name() {
            Some(default) => name.with_default(default),
            None => name.required(),
        };

        let schema = ResourceSchema::new(K::TYPE_NAME)
            .attribute(name)
            .attribute(
                AttributeSchema::new("resource_group_name", validate::resource_group_name())
                    .required()
                    .force_new(),
            )
            .attribute(
                AttributeSchema::new("zone_name", validate::dns_zone_name())
                    .required()
                    .force_new(),
            )
            .attribute(AttributeSchema::new("ttl", types::int_between(1, 2147483647)).required())
            .attribute(AttributeSchema::new("tags", types::tags()))
            .attribute(AttributeSchema::new("fqdn", AttributeType::String).computed());
        K::record_schema(schema)
    }

    fn validate(&self, model: &Self::Model) -> Result<(), Vec<String>> {
        K::validate(&model.records)
    }

    fn id_for(&self, model: &Self::Model) -> ProviderResult<K::Id> {
        Ok(K::Id::from_parts(
            self.clients.subscription_id(),
            &model.resource_group_name,
            &model.zone_name,
            &model.name,
        ))
    }

    async fn create(&self, id: &K::Id, model: &Self::Model) -> ProviderResult<()> {
        self.write(id, model, "creating").await
    }

    async fn read(&self, id: &K::Id) -> ProviderResult<Option<Self::Model>> {
        let Some(record_set) = self
            .clients
            .get_model::<ArmRecordSet>(&id.to_string(), API_VERSION, &format!("retrieving {}", id.describe()))
            .await?
        else {
            return Ok(None);
        };

        let zone = id.zone_id();
        let props = record_set.properties;
        Ok(Some(RecordSetModel {
            name: id.record_name().to_string(),
            resource_group_name: zone.resource_group_name,
            zone_name: zone.zone_name,
            ttl: props.ttl.unwrap_or_default(),
            tags: props.metadata.clone(),
            fqdn: props.fqdn.clone(),
            records: K::flatten(&props),
        }))
    }

    fn supports_update(&self) -> bool {
        true
    }

    async fn update(&self, id: &K::Id, model: &Self::Model) -> ProviderResult<()> {
        self.write(id, model, "updating").await
    }

    async fn delete(&self, id: &K::Id) -> ProviderResult<()> {
        self.clients
            .delete(&id.to_string(), API_VERSION, &format!("deleting {}", id.describe()))
            .await
    }
}
