//! Record kinds: azurerm_dns_{a,aaaa,cname,mx,ns,ptr,srv,txt,caa}_record

use azrm_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};
use serde::{Deserialize, Serialize};

use super::{
    ArmARecord, ArmAaaaRecord, ArmCaaRecord, ArmCnameRecord, ArmMxRecord, ArmNsRecord,
    ArmPtrRecord, ArmRecordSetProperties, ArmSrvRecord, ArmSubResource, ArmTxtRecord, RecordKind,
};
use crate::ids::{
    AaaaRecordId, ARecordId, CaaRecordId, CnameRecordId, MxRecordId, NsRecordId, PtrRecordId,
    SrvRecordId, TxtRecordId,
};
use crate::utils::{chunk_string, normalize_ipv6};
use crate::validate;

/// Longest string a single TXT character-string can hold
pub const TXT_CHUNK_SIZE: usize = 255;

pub const CAA_TAGS: &[&str] = &["issue", "issuewild", "iodef", "contactemail", "contactphone"];

const ALIAS_GROUP: &[&str] = &["records", "target_resource_id"];
const CNAME_ALIAS_GROUP: &[&str] = &["record", "target_resource_id"];

fn target_resource_id(group: &[&str]) -> AttributeSchema {
    AttributeSchema::new("target_resource_id", validate::resource_id()).exactly_one_of(group)
}

fn target_of(properties: &ArmRecordSetProperties) -> Option<String> {
    properties
        .target_resource
        .as_ref()
        .and_then(|t| t.id.clone())
        .filter(|id| !id.is_empty())
}

fn sub_resource(id: Option<&str>) -> Option<ArmSubResource> {
    id.map(|id| ArmSubResource {
        id: Some(id.to_string()),
    })
}

fn non_empty<T>(records: Option<Vec<T>>) -> Option<Vec<T>> {
    records.filter(|r| !r.is_empty())
}

fn require_records<T>(records: &[T]) -> Result<(), Vec<String>> {
    if records.is_empty() {
        return Err(vec!["at least one record must be specified".to_string()]);
    }
    Ok(())
}

// -----------------------------------------------------------------------------
// A / AAAA
// -----------------------------------------------------------------------------

/// Literal addresses or an alias to another Azure resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddressRecords {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub records: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_resource_id: Option<String>,
}

pub struct ARecord;

impl RecordKind for ARecord {
    type Id = ARecordId;
    type Records = AddressRecords;

    const TYPE_NAME: &'static str = "azurerm_dns_a_record";

    fn record_schema(schema: ResourceSchema) -> ResourceSchema {
        schema
            .attribute(
                AttributeSchema::new("records", AttributeType::set(types::ipv4()))
                    .exactly_one_of(ALIAS_GROUP),
            )
            .attribute(target_resource_id(ALIAS_GROUP))
    }

    fn expand(records: &AddressRecords, properties: &mut ArmRecordSetProperties) {
        properties.a_records = records.records.as_ref().map(|ips| {
            ips.iter()
                .map(|ip| ArmARecord {
                    ipv4_address: ip.clone(),
                })
                .collect()
        });
        properties.target_resource = sub_resource(records.target_resource_id.as_deref());
    }

    fn flatten(properties: &ArmRecordSetProperties) -> AddressRecords {
        let records = properties
            .a_records
            .as_ref()
            .map(|r| r.iter().map(|a| a.ipv4_address.clone()).collect());
        AddressRecords {
            records: non_empty(records),
            target_resource_id: target_of(properties),
        }
    }
}

pub struct AaaaRecord;

impl RecordKind for AaaaRecord {
    type Id = AaaaRecordId;
    type Records = AddressRecords;

    const TYPE_NAME: &'static str = "azurerm_dns_aaaa_record";

    fn record_schema(schema: ResourceSchema) -> ResourceSchema {
        schema
            .attribute(
                AttributeSchema::new("records", AttributeType::set(types::ipv6()))
                    .exactly_one_of(ALIAS_GROUP)
                    .with_normalizer(normalize_ipv6),
            )
            .attribute(target_resource_id(ALIAS_GROUP))
    }

    fn expand(records: &AddressRecords, properties: &mut ArmRecordSetProperties) {
        properties.aaaa_records = records.records.as_ref().map(|ips| {
            ips.iter()
                .map(|ip| ArmAaaaRecord {
                    ipv6_address: normalize_ipv6(ip),
                })
                .collect()
        });
        properties.target_resource = sub_resource(records.target_resource_id.as_deref());
    }

    fn flatten(properties: &ArmRecordSetProperties) -> AddressRecords {
        let records = properties
            .aaaa_records
            .as_ref()
            .map(|r| r.iter().map(|a| normalize_ipv6(&a.ipv6_address)).collect());
        AddressRecords {
            records: non_empty(records),
            target_resource_id: target_of(properties),
        }
    }
}

// -----------------------------------------------------------------------------
// CNAME
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CnameRecords {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_resource_id: Option<String>,
}

pub struct CnameRecord;

impl RecordKind for CnameRecord {
    type Id = CnameRecordId;
    type Records = CnameRecords;

    const TYPE_NAME: &'static str = "azurerm_dns_cname_record";

    fn record_schema(schema: ResourceSchema) -> ResourceSchema {
        schema
            .attribute(
                AttributeSchema::new("record", types::non_empty_string())
                    .exactly_one_of(CNAME_ALIAS_GROUP),
            )
            .attribute(target_resource_id(CNAME_ALIAS_GROUP))
    }

    fn expand(records: &CnameRecords, properties: &mut ArmRecordSetProperties) {
        properties.cname_record = records
            .record
            .clone()
            .map(|cname| ArmCnameRecord { cname });
        properties.target_resource = sub_resource(records.target_resource_id.as_deref());
    }

    fn flatten(properties: &ArmRecordSetProperties) -> CnameRecords {
        CnameRecords {
            record: properties
                .cname_record
                .as_ref()
                .map(|c| c.cname.clone())
                .filter(|c| !c.is_empty()),
            target_resource_id: target_of(properties),
        }
    }
}

// -----------------------------------------------------------------------------
// MX
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MxEntry {
    pub preference: i64,
    pub exchange: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MxRecords {
    #[serde(default)]
    pub record: Vec<MxEntry>,
}

pub struct MxRecord;

impl RecordKind for MxRecord {
    type Id = MxRecordId;
    type Records = MxRecords;

    const TYPE_NAME: &'static str = "azurerm_dns_mx_record";

    fn default_name() -> Option<&'static str> {
        Some("@")
    }

    fn record_schema(schema: ResourceSchema) -> ResourceSchema {
        schema.attribute(
            AttributeSchema::new(
                "record",
                AttributeType::set(AttributeType::Object(vec![
                    AttributeSchema::new("preference", types::int_between(0, 65535)).required(),
                    AttributeSchema::new("exchange", types::non_empty_string()).required(),
                ])),
            )
            .required(),
        )
    }

    fn validate(records: &MxRecords) -> Result<(), Vec<String>> {
        require_records(&records.record)
    }

    fn expand(records: &MxRecords, properties: &mut ArmRecordSetProperties) {
        properties.mx_records = Some(
            records
                .record
                .iter()
                .map(|r| ArmMxRecord {
                    preference: r.preference,
                    exchange: r.exchange.clone(),
                })
                .collect(),
        );
    }

    fn flatten(properties: &ArmRecordSetProperties) -> MxRecords {
        MxRecords {
            record: properties
                .mx_records
                .iter()
                .flatten()
                .map(|r| MxEntry {
                    preference: r.preference,
                    exchange: r.exchange.clone(),
                })
                .collect(),
        }
    }
}

// -----------------------------------------------------------------------------
// NS / PTR
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NameRecords {
    #[serde(default)]
    pub records: Vec<String>,
}

pub struct NsRecord;

impl RecordKind for NsRecord {
    type Id = NsRecordId;
    type Records = NameRecords;

    const TYPE_NAME: &'static str = "azurerm_dns_ns_record";

    fn record_schema(schema: ResourceSchema) -> ResourceSchema {
        schema.attribute(
            AttributeSchema::new("records", AttributeType::list(types::non_empty_string()))
                .required(),
        )
    }

    fn validate(records: &NameRecords) -> Result<(), Vec<String>> {
        require_records(&records.records)
    }

    fn expand(records: &NameRecords, properties: &mut ArmRecordSetProperties) {
        properties.ns_records = Some(
            records
                .records
                .iter()
                .map(|r| ArmNsRecord { nsdname: r.clone() })
                .collect(),
        );
    }

    fn flatten(properties: &ArmRecordSetProperties) -> NameRecords {
        NameRecords {
            records: properties
                .ns_records
                .iter()
                .flatten()
                .map(|r| r.nsdname.clone())
                .collect(),
        }
    }
}

pub struct PtrRecord;

impl RecordKind for PtrRecord {
    type Id = PtrRecordId;
    type Records = NameRecords;

    const TYPE_NAME: &'static str = "azurerm_dns_ptr_record";

    fn record_schema(schema: ResourceSchema) -> ResourceSchema {
        schema.attribute(
            AttributeSchema::new("records", AttributeType::set(types::non_empty_string()))
                .required(),
        )
    }

    fn validate(records: &NameRecords) -> Result<(), Vec<String>> {
        require_records(&records.records)
    }

    fn expand(records: &NameRecords, properties: &mut ArmRecordSetProperties) {
        properties.ptr_records = Some(
            records
                .records
                .iter()
                .map(|r| ArmPtrRecord { ptrdname: r.clone() })
                .collect(),
        );
    }

    fn flatten(properties: &ArmRecordSetProperties) -> NameRecords {
        NameRecords {
            records: properties
                .ptr_records
                .iter()
                .flatten()
                .map(|r| r.ptrdname.clone())
                .collect(),
        }
    }
}

// -----------------------------------------------------------------------------
// SRV
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SrvEntry {
    pub priority: i64,
    pub weight: i64,
    pub port: i64,
    pub target: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SrvRecords {
    #[serde(default)]
    pub record: Vec<SrvEntry>,
}

pub struct SrvRecord;

impl RecordKind for SrvRecord {
    type Id = SrvRecordId;
    type Records = SrvRecords;

    const TYPE_NAME: &'static str = "azurerm_dns_srv_record";

    fn record_schema(schema: ResourceSchema) -> ResourceSchema {
        schema.attribute(
            AttributeSchema::new(
                "record",
                AttributeType::set(AttributeType::Object(vec![
                    AttributeSchema::new("priority", types::int_between(0, 65535)).required(),
                    AttributeSchema::new("weight", types::int_between(0, 65535)).required(),
                    AttributeSchema::new("port", types::int_between(0, 65535)).required(),
                    AttributeSchema::new("target", types::non_empty_string()).required(),
                ])),
            )
            .required(),
        )
    }

    fn validate(records: &SrvRecords) -> Result<(), Vec<String>> {
        require_records(&records.record)
    }

    fn expand(records: &SrvRecords, properties: &mut ArmRecordSetProperties) {
        properties.srv_records = Some(
            records
                .record
                .iter()
                .map(|r| ArmSrvRecord {
                    priority: r.priority,
                    weight: r.weight,
                    port: r.port,
                    target: r.target.clone(),
                })
                .collect(),
        );
    }

    fn flatten(properties: &ArmRecordSetProperties) -> SrvRecords {
        SrvRecords {
            record: properties
                .srv_records
                .iter()
                .flatten()
                .map(|r| SrvEntry {
                    priority: r.priority,
                    weight: r.weight,
                    port: r.port,
                    target: r.target.clone(),
                })
                .collect(),
        }
    }
}

// -----------------------------------------------------------------------------
// TXT
// -----------------------------------------------------------------------------

/// One TXT value. Azure stores it as a list of at most 255 character strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxtEntry {
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TxtRecords {
    #[serde(default)]
    pub record: Vec<TxtEntry>,
}

pub struct TxtRecord;

impl RecordKind for TxtRecord {
    type Id = TxtRecordId;
    type Records = TxtRecords;

    const TYPE_NAME: &'static str = "azurerm_dns_txt_record";

    fn record_schema(schema: ResourceSchema) -> ResourceSchema {
        schema.attribute(
            AttributeSchema::new(
                "record",
                AttributeType::set(AttributeType::Object(vec![
                    AttributeSchema::new("value", types::string_len_between(1, 1024)).required(),
                ])),
            )
            .required(),
        )
    }

    fn validate(records: &TxtRecords) -> Result<(), Vec<String>> {
        require_records(&records.record)
    }

    fn expand(records: &TxtRecords, properties: &mut ArmRecordSetProperties) {
        properties.txt_records = Some(
            records
                .record
                .iter()
                .map(|r| ArmTxtRecord {
                    value: chunk_string(&r.value, TXT_CHUNK_SIZE),
                })
                .collect(),
        );
    }

    fn flatten(properties: &ArmRecordSetProperties) -> TxtRecords {
        TxtRecords {
            record: properties
                .txt_records
                .iter()
                .flatten()
                .map(|r| TxtEntry {
                    value: r.value.concat(),
                })
                .collect(),
        }
    }
}

// -----------------------------------------------------------------------------
// CAA
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaaEntry {
    pub flags: i64,
    pub tag: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaaRecords {
    #[serde(default)]
    pub record: Vec<CaaEntry>,
}

pub struct CaaRecord;

impl RecordKind for CaaRecord {
    type Id = CaaRecordId;
    type Records = CaaRecords;

    const TYPE_NAME: &'static str = "azurerm_dns_caa_record";

    fn record_schema(schema: ResourceSchema) -> ResourceSchema {
        schema.attribute(
            AttributeSchema::new(
                "record",
                AttributeType::set(AttributeType::Object(vec![
                    AttributeSchema::new("flags", types::int_between(0, 255)).required(),
                    AttributeSchema::new("tag", AttributeType::enumeration(CAA_TAGS)).required(),
                    AttributeSchema::new("value", types::non_empty_string()).required(),
                ])),
            )
            .required(),
        )
    }

    fn validate(records: &CaaRecords) -> Result<(), Vec<String>> {
        require_records(&records.record)
    }

    fn expand(records: &CaaRecords, properties: &mut ArmRecordSetProperties) {
        properties.caa_records = Some(
            records
                .record
                .iter()
                .map(|r| ArmCaaRecord {
                    flags: r.flags,
                    tag: r.tag.clone(),
                    value: r.value.clone(),
                })
                .collect(),
        );
    }

    fn flatten(properties: &ArmRecordSetProperties) -> CaaRecords {
        CaaRecords {
            record: properties
                .caa_records
                .iter()
                .flatten()
                .map(|r| CaaEntry {
                    flags: r.flags,
                    tag: r.tag.clone(),
                    value: r.value.clone(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use azrm_core::config::ProviderConfig;
    use azrm_core::differ::Diff;
    use azrm_core::handler::Managed;
    use azrm_core::provider::{ErrorKind, ManagedResource};
    use azrm_core::resource::{Attributes, Value};
    use serde_json::json;

    use super::*;
    use crate::client::Clients;
    use crate::dns::RecordSetResource;
    use crate::memory::MemoryArm;

    const ZONE: &str =
        "/subscriptions/sub1/resourceGroups/rg1/providers/Microsoft.Network/dnsZones/example.com";
    const PUBLIC_IP: &str =
        "/subscriptions/sub1/resourceGroups/rg1/providers/Microsoft.Network/publicIPAddresses/ip1";

    fn setup<K: RecordKind>() -> (Arc<MemoryArm>, Managed<RecordSetResource<K>>) {
        let arm = Arc::new(MemoryArm::new());
        arm.insert(ZONE, json!({ "location": "global", "properties": {} }));
        let clients = Clients::new(arm.clone(), ProviderConfig::new("sub1"));
        (arm, Managed::new(RecordSetResource::new(clients)))
    }

    fn base(name: Option<&str>) -> Attributes {
        let mut attrs = Attributes::new();
        if let Some(name) = name {
            attrs.insert("name".to_string(), Value::from(name));
        }
        attrs.insert("resource_group_name".to_string(), Value::from("rg1"));
        attrs.insert("zone_name".to_string(), Value::from("example.com"));
        attrs.insert("ttl".to_string(), Value::Int(300));
        attrs
    }

    fn strings(values: &[&str]) -> Value {
        Value::List(values.iter().map(|v| Value::from(*v)).collect())
    }

    fn object(fields: &[(&str, Value)]) -> Value {
        Value::Map(fields.iter().map(|(k, v)| (k.to_string(), v.clone())).collect())
    }

    #[tokio::test]
    async fn a_record_with_literal_addresses() {
        let (arm, records) = setup::<ARecord>();
        let mut attrs = base(Some("www"));
        attrs.insert("records".to_string(), strings(&["10.0.180.17", "10.0.180.18"]));

        let state = records.create(&attrs).await.unwrap();
        let id = state.id.clone().unwrap();
        assert_eq!(id, format!("{}/A/www", ZONE));
        assert_eq!(state.get("fqdn"), Some(&Value::from("www.example.com.")));
        assert_eq!(
            state.get("records"),
            Some(&strings(&["10.0.180.17", "10.0.180.18"]))
        );
        assert_eq!(state.get("target_resource_id"), None);

        let stored = arm.raw(&id).unwrap();
        assert_eq!(stored["properties"]["TTL"], 300);
        assert_eq!(stored["properties"]["ARecords"][0]["ipv4Address"], "10.0.180.17");
    }

    #[tokio::test]
    async fn a_record_alias() {
        let (_, records) = setup::<ARecord>();
        let mut attrs = base(Some("alias"));
        attrs.insert("target_resource_id".to_string(), Value::from(PUBLIC_IP));

        let state = records.create(&attrs).await.unwrap();
        assert_eq!(state.get("target_resource_id"), Some(&Value::from(PUBLIC_IP)));
        assert_eq!(state.get("records"), None);
    }

    #[tokio::test]
    async fn a_record_requires_exactly_one_of_records_and_alias() {
        let (arm, records) = setup::<ARecord>();

        let neither = base(Some("www"));
        let err = records.create(&neither).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);

        let mut both = base(Some("www"));
        both.insert("records".to_string(), strings(&["10.0.0.1"]));
        both.insert("target_resource_id".to_string(), Value::from(PUBLIC_IP));
        let err = records.create(&both).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);

        assert!(arm.calls().is_empty());
    }

    #[tokio::test]
    async fn aaaa_records_are_normalized() {
        let (_, records) = setup::<AaaaRecord>();
        let mut attrs = base(Some("v6"));
        attrs.insert(
            "records".to_string(),
            strings(&["2607:f8b0:4009:1803:0000:0000:0000:2004"]),
        );

        let state = records.create(&attrs).await.unwrap();
        assert_eq!(
            state.get("records"),
            Some(&strings(&["2607:f8b0:4009:1803::2004"]))
        );
    }

    #[tokio::test]
    async fn cname_rejects_both_record_and_alias() {
        let (_, records) = setup::<CnameRecord>();
        let mut attrs = base(Some("docs"));
        attrs.insert("record".to_string(), Value::from("contoso.com"));
        attrs.insert("target_resource_id".to_string(), Value::from(PUBLIC_IP));
        let err = records.create(&attrs).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);

        attrs.remove("target_resource_id");
        let state = records.create(&attrs).await.unwrap();
        assert_eq!(state.get("record"), Some(&Value::from("contoso.com")));
    }

    #[tokio::test]
    async fn mx_name_defaults_to_apex() {
        let (_, records) = setup::<MxRecord>();
        let mut attrs = base(None);
        attrs.insert(
            "record".to_string(),
            Value::List(vec![
                object(&[("preference", Value::Int(10)), ("exchange", Value::from("mail1.contoso.com"))]),
                object(&[("preference", Value::Int(20)), ("exchange", Value::from("mail2.contoso.com"))]),
            ]),
        );

        let state = records.create(&attrs).await.unwrap();
        assert_eq!(state.id.as_deref(), Some(format!("{}/MX/@", ZONE).as_str()));
        assert_eq!(state.get("name"), Some(&Value::from("@")));
        assert_eq!(state.get("fqdn"), Some(&Value::from("example.com.")));
    }

    #[tokio::test]
    async fn ns_records_must_not_be_empty() {
        let (_, records) = setup::<NsRecord>();
        let mut attrs = base(Some("delegated"));
        attrs.insert("records".to_string(), strings(&[]));
        let err = records.create(&attrs).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn ptr_records_update_in_place() {
        let (arm, records) = setup::<PtrRecord>();
        let mut attrs = base(Some("17"));
        attrs.insert("records".to_string(), strings(&["hostname.contoso.com"]));
        let id = records.create(&attrs).await.unwrap().id.unwrap();

        attrs.insert("records".to_string(), strings(&["other.contoso.com"]));
        attrs.insert("ttl".to_string(), Value::Int(60));
        let state = records.update(&id, &attrs).await.unwrap();
        assert_eq!(state.get("records"), Some(&strings(&["other.contoso.com"])));
        assert_eq!(arm.raw(&id).unwrap()["properties"]["TTL"], 60);
    }

    #[tokio::test]
    async fn srv_ports_are_range_checked() {
        let (_, records) = setup::<SrvRecord>();
        let mut attrs = base(Some("_sip._tcp"));
        attrs.insert(
            "record".to_string(),
            Value::List(vec![object(&[
                ("priority", Value::Int(1)),
                ("weight", Value::Int(5)),
                ("port", Value::Int(70000)),
                ("target", Value::from("target1.contoso.com")),
            ])]),
        );
        let err = records.create(&attrs).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn long_txt_values_are_chunked() {
        let (arm, records) = setup::<TxtRecord>();
        let long = "a".repeat(600);
        let mut attrs = base(Some("txt"));
        attrs.insert(
            "record".to_string(),
            Value::List(vec![object(&[("value", Value::from(long.as_str()))])]),
        );

        let state = records.create(&attrs).await.unwrap();
        let stored = arm.raw(state.id.as_ref().unwrap()).unwrap();
        let chunks = stored["properties"]["TXTRecords"][0]["value"].as_array().unwrap().clone();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].as_str().unwrap().len(), 255);

        assert_eq!(
            state.get("record"),
            Some(&Value::List(vec![object(&[("value", Value::from(long.as_str()))])]))
        );
    }

    #[tokio::test]
    async fn caa_tag_must_be_known() {
        let (_, records) = setup::<CaaRecord>();
        let mut attrs = base(Some("caa"));
        attrs.insert(
            "record".to_string(),
            Value::List(vec![object(&[
                ("flags", Value::Int(0)),
                ("tag", Value::from("unknown")),
                ("value", Value::from("example.net")),
            ])]),
        );
        let err = records.create(&attrs).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);

        attrs.insert(
            "record".to_string(),
            Value::List(vec![object(&[
                ("flags", Value::Int(128)),
                ("tag", Value::from("issue")),
                ("value", Value::from("example.net")),
            ])]),
        );
        let state = records.create(&attrs).await.unwrap();
        assert!(state.exists);
    }

    async fn assert_plan_after_create_is_unchanged<K: RecordKind>(attrs: Attributes) {
        let (_, records) = setup::<K>();
        let state = records.create(&attrs).await.unwrap();
        assert_eq!(
            records.plan(&state.attributes, &attrs).unwrap(),
            Diff::NoChange,
            "{}",
            K::TYPE_NAME
        );
    }

    #[tokio::test]
    async fn plan_after_create_is_unchanged() {
        let mut a = base(Some("www"));
        a.insert("records".to_string(), strings(&["10.0.180.18", "10.0.180.17"]));
        assert_plan_after_create_is_unchanged::<ARecord>(a).await;

        let mut aaaa = base(Some("v6"));
        aaaa.insert(
            "records".to_string(),
            strings(&["2607:f8b0:4009:1803:0000:0000:0000:2004", "2001:DB8::1"]),
        );
        assert_plan_after_create_is_unchanged::<AaaaRecord>(aaaa).await;

        let mut mx = base(None);
        mx.insert(
            "record".to_string(),
            Value::List(vec![object(&[
                ("preference", Value::Int(10)),
                ("exchange", Value::from("mail1.contoso.com")),
            ])]),
        );
        assert_plan_after_create_is_unchanged::<MxRecord>(mx).await;

        let mut txt = base(Some("txt"));
        txt.insert(
            "record".to_string(),
            Value::List(vec![object(&[("value", Value::from("v".repeat(400)))])]),
        );
        assert_plan_after_create_is_unchanged::<TxtRecord>(txt).await;

        let mut srv = base(Some("_sip._tcp"));
        srv.insert(
            "record".to_string(),
            Value::List(vec![object(&[
                ("priority", Value::Int(1)),
                ("weight", Value::Int(5)),
                ("port", Value::Int(8080)),
                ("target", Value::from("target1.contoso.com")),
            ])]),
        );
        assert_plan_after_create_is_unchanged::<SrvRecord>(srv).await;

        let mut caa = base(Some("caa"));
        caa.insert(
            "record".to_string(),
            Value::List(vec![object(&[
                ("flags", Value::Int(0)),
                ("tag", Value::from("issue")),
                ("value", Value::from("example.net")),
            ])]),
        );
        assert_plan_after_create_is_unchanged::<CaaRecord>(caa).await;
    }

    #[tokio::test]
    async fn record_in_missing_zone_fails() {
        let arm = Arc::new(MemoryArm::new());
        let records = Managed::new(RecordSetResource::<ARecord>::new(Clients::new(
            arm,
            ProviderConfig::new("sub1"),
        )));
        let mut attrs = base(Some("www"));
        attrs.insert("records".to_string(), strings(&["10.0.0.1"]));
        let err = records.create(&attrs).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }
}
