//! In-memory Azure Resource Manager
//!
//! Behaves like the parts of ARM the handlers rely on: case-insensitive IDs,
//! children that require their parent, server-populated read-only fields,
//! secrets that are never echoed back and module imports that progress through
//! provisioning states on successive reads. Used by the tests and by the CLI
//! when no live transport is configured.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue, json};

use crate::client::{ArmClient, ClientError, ClientResult};

const AGENT_REGISTRATION: &str = "/agentRegistrationInformation";
const PUBLISH: &str = "/publish";
const DRAFT_CONTENT: &str = "/draft/content";
const CONTENT: &str = "/content";

/// States a module import reports before it succeeds
const MODULE_IMPORT_STEPS: &[&str] = &[
    "ContentDownloaded",
    "ContentValidated",
    "ModuleDataStored",
    "Succeeded",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Account,
    Runbook,
    Module,
    Credential,
    Variable,
    JobSchedule,
    Zone,
    RecordSet,
    Other,
}

impl Kind {
    fn of(parent: &str, type_segment: &str) -> Self {
        let parent_type = split_last(parent).map(|(_, t, _)| t).unwrap_or_default();
        if parent_type.eq_ignore_ascii_case("dnsZones") {
            return Kind::RecordSet;
        }
        match type_segment.to_ascii_lowercase().as_str() {
            "automationaccounts" => Kind::Account,
            "runbooks" => Kind::Runbook,
            "modules" => Kind::Module,
            "credentials" => Kind::Credential,
            "variables" => Kind::Variable,
            "jobschedules" => Kind::JobSchedule,
            "dnszones" => Kind::Zone,
            _ => Kind::Other,
        }
    }
}

struct InjectedFailure {
    method: String,
    fragment: String,
    status: u16,
    message: String,
}

#[derive(Default)]
struct Inner {
    objects: BTreeMap<String, JsonValue>,
    drafts: HashMap<String, String>,
    published: HashMap<String, String>,
    registrations: HashMap<String, (String, String)>,
    module_progress: HashMap<String, VecDeque<(String, Option<String>)>>,
    module_failures: HashMap<String, String>,
    failures: Vec<InjectedFailure>,
    calls: Vec<String>,
}

impl Inner {
    fn record(&mut self, method: &str, id: &str) -> ClientResult<()> {
        self.calls.push(format!("{} {}", method, id));

        let pos = self
            .failures
            .iter()
            .position(|f| f.method == method && id.contains(&f.fragment));
        match pos.map(|p| self.failures.remove(p)) {
            Some(f) => Err(match f.status {
                404 => ClientError::NotFound { id: id.to_string() },
                409 => ClientError::Conflict {
                    id: id.to_string(),
                    message: f.message,
                },
                status => ClientError::Status {
                    status,
                    message: f.message,
                },
            }),
            None => Ok(()),
        }
    }

    fn exists(&self, id: &str) -> bool {
        self.objects.contains_key(&key(id))
    }

    fn require(&self, id: &str) -> ClientResult<()> {
        if self.exists(id) {
            Ok(())
        } else {
            Err(ClientError::NotFound { id: id.to_string() })
        }
    }

    fn set_property(&mut self, id: &str, name: &str, value: JsonValue) {
        if let Some(props) = self.objects.get_mut(&key(id)).and_then(properties_mut) {
            props.insert(name.to_string(), value);
        }
    }

    fn advance_module(&mut self, k: &str) {
        let Some(step) = self.module_progress.get_mut(k).and_then(|q| q.pop_front()) else {
            return;
        };
        if let Some(props) = self.objects.get_mut(k).and_then(properties_mut) {
            props.insert("provisioningState".to_string(), json!(step.0));
            if let Some(message) = step.1 {
                props.insert("error".to_string(), json!({ "message": message }));
            }
        }
    }

    /// Decorate a stored object with fields Azure computes at read time
    fn view(&self, k: &str) -> Option<JsonValue> {
        let mut body = self.objects.get(k)?.clone();
        let id = body.get("id").and_then(|v| v.as_str()).unwrap_or_default().to_string();
        let kind = split_last(&id)
            .map(|(parent, t, _)| Kind::of(parent, t))
            .unwrap_or(Kind::Other);

        if kind == Kind::Zone {
            let prefix = format!("{}/", k);
            let children = self
                .objects
                .keys()
                .filter(|other| other.starts_with(&prefix))
                .count();
            if let Some(props) = properties_mut(&mut body) {
                // SOA and NS at the apex always exist
                props.insert("numberOfRecordSets".to_string(), json!(2 + children));
            }
        }
        Some(body)
    }
}

/// An [`ArmClient`] that keeps every object in memory
#[derive(Default)]
pub struct MemoryArm {
    inner: Mutex<Inner>,
}

impl MemoryArm {
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Store an object as-is, bypassing all server behaviour
    pub fn insert(&self, id: &str, mut body: JsonValue) {
        if let Some(obj) = body.as_object_mut() {
            obj.insert("id".to_string(), json!(id));
            if let Some((_, _, name)) = split_last(id) {
                obj.entry("name").or_insert_with(|| json!(name));
            }
        }
        self.inner().objects.insert(key(id), body);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner().exists(id)
    }

    /// Raw stored document, without read-time decoration
    pub fn raw(&self, id: &str) -> Option<JsonValue> {
        self.inner().objects.get(&key(id)).cloned()
    }

    /// Every call made so far, as "METHOD id"
    pub fn calls(&self) -> Vec<String> {
        self.inner().calls.clone()
    }

    /// Fail the next `method` call whose ID contains `fragment`
    pub fn fail_next(&self, method: &str, fragment: &str, status: u16, message: &str) {
        self.inner().failures.push(InjectedFailure {
            method: method.to_string(),
            fragment: fragment.to_string(),
            status,
            message: message.to_string(),
        });
    }

    /// Make the next import of the named module fail with `message`
    pub fn fail_module_import(&self, module_name: &str, message: &str) {
        self.inner()
            .module_failures
            .insert(module_name.to_lowercase(), message.to_string());
    }
}

#[async_trait]
impl ArmClient for MemoryArm {
    async fn get(&self, id: &str, _api_version: &str) -> ClientResult<JsonValue> {
        let mut inner = self.inner();
        inner.record("GET", id)?;

        if let Some(account) = id.strip_suffix(AGENT_REGISTRATION) {
            inner.require(account)?;
            let (primary, secondary) = inner
                .registrations
                .get(&key(account))
                .cloned()
                .unwrap_or_default();
            let name = split_last(account).map(|(_, _, n)| n).unwrap_or_default();
            return Ok(json!({
                "endpoint": format!("https://{}.agentsvc.azure-automation.net/accounts/{}", name.to_lowercase(), name),
                "keys": { "primary": primary, "secondary": secondary },
            }));
        }

        let k = key(id);
        inner.advance_module(&k);
        inner
            .view(&k)
            .ok_or_else(|| ClientError::NotFound { id: id.to_string() })
    }

    async fn put(&self, id: &str, _api_version: &str, body: JsonValue) -> ClientResult<JsonValue> {
        let mut inner = self.inner();
        inner.record("PUT", id)?;

        let (parent, type_segment, name) = split_last(id).ok_or_else(|| ClientError::Status {
            status: 400,
            message: format!("malformed resource ID {:?}", id),
        })?;
        if !is_top_level(parent) {
            inner.require(parent)?;
        }

        let k = key(id);
        let kind = Kind::of(parent, type_segment);
        if kind == Kind::JobSchedule && inner.objects.contains_key(&k) {
            return Err(ClientError::Conflict {
                id: id.to_string(),
                message: "a job schedule with this ID already exists".to_string(),
            });
        }

        let mut body = body;
        let Some(obj) = body.as_object_mut() else {
            return Err(ClientError::Status {
                status: 400,
                message: "request body must be a JSON object".to_string(),
            });
        };
        obj.insert("id".to_string(), json!(id));
        obj.insert("name".to_string(), json!(name));
        let location = obj
            .get("location")
            .and_then(|l| l.as_str())
            .unwrap_or_default()
            .to_string();

        let previous_state = inner
            .objects
            .get(&k)
            .and_then(|o| o.pointer("/properties/state"))
            .cloned();

        let props = properties_mut(&mut body).ok_or_else(|| ClientError::Status {
            status: 400,
            message: "properties must be a JSON object".to_string(),
        })?;

        match kind {
            Kind::Account => {
                props.insert("state".to_string(), json!("Ok"));
                props.insert(
                    "automationHybridServiceUrl".to_string(),
                    json!(format!(
                        "https://{}.jrds.{}.azure-automation.net/automationAccount",
                        name.to_lowercase(),
                        location
                    )),
                );
                inner.registrations.entry(k.clone()).or_insert_with(|| {
                    (
                        uuid::Uuid::new_v4().simple().to_string(),
                        uuid::Uuid::new_v4().simple().to_string(),
                    )
                });
            }
            Kind::Runbook => {
                props.insert(
                    "state".to_string(),
                    previous_state.unwrap_or_else(|| json!("New")),
                );
            }
            Kind::Module => {
                props.insert("provisioningState".to_string(), json!("Creating"));
                props.remove("error");
                let mut steps: VecDeque<(String, Option<String>)> = MODULE_IMPORT_STEPS
                    .iter()
                    .map(|s| (s.to_string(), None))
                    .collect();
                if let Some(message) = inner.module_failures.remove(&name.to_lowercase()) {
                    steps.truncate(1);
                    steps.push_back(("Failed".to_string(), Some(message)));
                }
                inner.module_progress.insert(k.clone(), steps);
            }
            Kind::Credential => {
                props.remove("password");
            }
            Kind::Variable => {
                if props.get("isEncrypted").and_then(|v| v.as_bool()) == Some(true) {
                    props.remove("value");
                }
            }
            Kind::Zone => {
                props.insert("maxNumberOfRecordSets".to_string(), json!(10000));
                props.insert(
                    "nameServers".to_string(),
                    json!([
                        "ns1-01.azure-dns.com.",
                        "ns2-01.azure-dns.net.",
                        "ns3-01.azure-dns.org.",
                        "ns4-01.azure-dns.info.",
                    ]),
                );
                props.insert("zoneType".to_string(), json!("Public"));
            }
            Kind::RecordSet => {
                let zone = split_last(parent).map(|(_, _, z)| z).unwrap_or_default();
                let fqdn = if name == "@" {
                    format!("{}.", zone)
                } else {
                    format!("{}.{}.", name, zone)
                };
                props.insert("fqdn".to_string(), json!(fqdn));
                props.insert("provisioningState".to_string(), json!("Succeeded"));
            }
            Kind::JobSchedule | Kind::Other => {}
        }

        inner.objects.insert(k.clone(), body);
        inner
            .view(&k)
            .ok_or_else(|| ClientError::NotFound { id: id.to_string() })
    }

    async fn patch(&self, id: &str, _api_version: &str, body: JsonValue) -> ClientResult<JsonValue> {
        let mut inner = self.inner();
        inner.record("PATCH", id)?;

        let k = key(id);
        let existing = inner
            .objects
            .get_mut(&k)
            .ok_or_else(|| ClientError::NotFound { id: id.to_string() })?;
        merge(existing, body);
        inner
            .view(&k)
            .ok_or_else(|| ClientError::NotFound { id: id.to_string() })
    }

    async fn delete(&self, id: &str, _api_version: &str) -> ClientResult<()> {
        let mut inner = self.inner();
        inner.record("DELETE", id)?;

        let k = key(id);
        if inner.objects.remove(&k).is_none() {
            return Err(ClientError::NotFound { id: id.to_string() });
        }
        let prefix = format!("{}/", k);
        inner.objects.retain(|other, _| !other.starts_with(&prefix));
        inner.drafts.remove(&k);
        inner.published.remove(&k);
        inner.registrations.remove(&k);
        inner.module_progress.remove(&k);
        Ok(())
    }

    async fn list(&self, collection_id: &str, _api_version: &str) -> ClientResult<Vec<JsonValue>> {
        let mut inner = self.inner();
        inner.record("LIST", collection_id)?;

        let Some((parent, type_segment)) = collection_id.rsplit_once('/') else {
            return Err(ClientError::Status {
                status: 400,
                message: format!("malformed collection ID {:?}", collection_id),
            });
        };
        if !is_top_level(parent) {
            inner.require(parent)?;
        }
        let parent_key = key(parent);
        let subscription_scope = !parent_key.contains("/resourcegroups/");

        let keys: Vec<String> = inner
            .objects
            .iter()
            .filter_map(|(k, body)| {
                let id = body.get("id")?.as_str()?;
                let (p, t, _) = split_last(id)?;
                if !t.eq_ignore_ascii_case(type_segment) {
                    return None;
                }
                let p = if subscription_scope {
                    without_resource_group(&key(p))
                } else {
                    key(p)
                };
                (p == parent_key).then(|| k.clone())
            })
            .collect();

        Ok(keys.iter().filter_map(|k| inner.view(k)).collect())
    }

    async fn post(&self, id: &str, _api_version: &str, _body: JsonValue) -> ClientResult<JsonValue> {
        let mut inner = self.inner();
        inner.record("POST", id)?;

        let Some(runbook) = id.strip_suffix(PUBLISH) else {
            return Err(ClientError::Status {
                status: 400,
                message: format!("unsupported action {:?}", id),
            });
        };
        inner.require(runbook)?;

        let k = key(runbook);
        if let Some(draft) = inner.drafts.remove(&k) {
            inner.published.insert(k, draft);
        }
        inner.set_property(runbook, "state", json!("Published"));
        Ok(json!({}))
    }

    async fn put_content(&self, id: &str, _api_version: &str, content: &str) -> ClientResult<()> {
        let mut inner = self.inner();
        inner.record("PUT", id)?;

        let Some(runbook) = id.strip_suffix(DRAFT_CONTENT) else {
            return Err(ClientError::Status {
                status: 400,
                message: format!("unsupported content upload {:?}", id),
            });
        };
        inner.require(runbook)?;
        inner.drafts.insert(key(runbook), content.to_string());
        inner.set_property(runbook, "state", json!("Edit"));
        Ok(())
    }

    async fn get_content(&self, id: &str, _api_version: &str) -> ClientResult<String> {
        let mut inner = self.inner();
        inner.record("GET", id)?;

        let runbook = id.strip_suffix(CONTENT).unwrap_or(id);
        inner.require(runbook)?;
        inner
            .published
            .get(&key(runbook))
            .cloned()
            .ok_or_else(|| ClientError::NotFound { id: id.to_string() })
    }
}

fn key(id: &str) -> String {
    id.trim_end_matches('/').to_lowercase()
}

/// Split an ID into (parent, type segment, name)
fn split_last(id: &str) -> Option<(&str, &str, &str)> {
    let mut parts = id.trim_end_matches('/').rsplitn(3, '/');
    let name = parts.next()?;
    let type_segment = parts.next()?;
    let parent = parts.next()?;
    Some((parent, type_segment, name))
}

/// Whether `parent` is a provider namespace scope (".../providers/{namespace}")
fn is_top_level(parent: &str) -> bool {
    parent
        .rsplit('/')
        .nth(1)
        .is_some_and(|s| s.eq_ignore_ascii_case("providers"))
}

fn without_resource_group(id: &str) -> String {
    let parts: Vec<&str> = id.split('/').collect();
    match parts.iter().position(|p| p.eq_ignore_ascii_case("resourcegroups")) {
        Some(pos) if pos + 1 < parts.len() => {
            let mut kept = parts[..pos].to_vec();
            kept.extend_from_slice(&parts[pos + 2..]);
            kept.join("/")
        }
        _ => id.to_string(),
    }
}

fn properties_mut(body: &mut JsonValue) -> Option<&mut Map<String, JsonValue>> {
    body.as_object_mut()?
        .entry("properties")
        .or_insert_with(|| json!({}))
        .as_object_mut()
}

/// JSON merge patch: objects merge recursively, null removes, anything else replaces
fn merge(target: &mut JsonValue, patch: JsonValue) {
    match (target, patch) {
        (JsonValue::Object(target), JsonValue::Object(patch)) => {
            for (k, v) in patch {
                if v.is_null() {
                    target.remove(&k);
                } else {
                    merge(target.entry(k).or_insert(JsonValue::Null), v);
                }
            }
        }
        (target, patch) => *target = patch,
    }
}
