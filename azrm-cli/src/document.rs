//! Configuration and state documents read by the CLI
//!
//! Both are JSON. A configuration lists resource and data blocks:
//!
//! ```json
//! {
//!   "resources": [
//!     { "type": "azurerm_dns_zone", "name": "main",
//!       "attributes": { "name": "contoso.com", "resource_group_name": "rg1" } }
//!   ],
//!   "data": []
//! }
//! ```
//!
//! A state file lists previously created resources with their ID.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use azrm_core::resource::{Attributes, attributes_from_json};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
pub struct ConfigDocument {
    #[serde(default)]
    pub resources: Vec<Block>,
    #[serde(default)]
    pub data: Vec<Block>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Block {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub name: String,
    #[serde(default)]
    pub attributes: serde_json::Value,
}

impl Block {
    /// "type.name" address used in messages
    pub fn address(&self) -> String {
        format!("{}.{}", self.resource_type, self.name)
    }

    pub fn attributes(&self) -> Attributes {
        attributes_from_json(&self.attributes)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct StateDocument {
    #[serde(default)]
    pub resources: Vec<StateEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateEntry {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub name: String,
    pub id: String,
    #[serde(default)]
    pub attributes: serde_json::Value,
}

impl StateEntry {
    pub fn address(&self) -> String {
        format!("{}.{}", self.resource_type, self.name)
    }

    pub fn attributes(&self) -> Attributes {
        attributes_from_json(&self.attributes)
    }
}

impl StateDocument {
    pub fn find(&self, resource_type: &str, name: &str) -> Option<&StateEntry> {
        self.resources
            .iter()
            .find(|e| e.resource_type == resource_type && e.name == name)
    }
}

pub fn load_config(path: &Path) -> Result<ConfigDocument, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    let config: ConfigDocument = serde_json::from_str(&content)
        .map_err(|e| format!("Parse error in {}: {}", path.display(), e))?;
    check_unique(config.resources.iter().map(Block::address), "resource")?;
    check_unique(config.data.iter().map(Block::address), "data")?;
    Ok(config)
}

/// Load a state file; a missing file is an empty state
pub fn load_state(path: &Path) -> Result<StateDocument, String> {
    if !path.exists() {
        return Ok(StateDocument::default());
    }
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    serde_json::from_str(&content).map_err(|e| format!("Parse error in {}: {}", path.display(), e))
}

fn check_unique(addresses: impl Iterator<Item = String>, kind: &str) -> Result<(), String> {
    let mut seen = HashSet::new();
    for address in addresses {
        if !seen.insert(address.clone()) {
            return Err(format!("Duplicate {} block {}", kind, address));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use azrm_core::resource::Value;

    use super::*;

    fn write(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_resource_blocks() {
        let file = write(
            r#"{
                "resources": [
                    { "type": "azurerm_dns_zone", "name": "main",
                      "attributes": { "name": "contoso.com", "resource_group_name": "rg1" } },
                    { "type": "azurerm_dns_a_record", "name": "www",
                      "attributes": { "ttl": 300, "records": ["10.0.0.1"] } }
                ]
            }"#,
        );
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.resources.len(), 2);
        assert!(config.data.is_empty());
        assert_eq!(config.resources[0].address(), "azurerm_dns_zone.main");

        let attrs = config.resources[1].attributes();
        assert_eq!(attrs.get("ttl"), Some(&Value::Int(300)));
        assert_eq!(
            attrs.get("records"),
            Some(&Value::List(vec![Value::from("10.0.0.1")]))
        );
    }

    #[test]
    fn duplicate_addresses_are_rejected() {
        let file = write(
            r#"{ "resources": [
                { "type": "azurerm_dns_zone", "name": "main" },
                { "type": "azurerm_dns_zone", "name": "main" }
            ] }"#,
        );
        let err = load_config(file.path()).unwrap_err();
        assert!(err.contains("Duplicate resource block azurerm_dns_zone.main"));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let file = write("{ not json");
        assert!(load_config(file.path()).unwrap_err().starts_with("Parse error"));
    }

    #[test]
    fn missing_state_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let state = load_state(&dir.path().join("state.json")).unwrap();
        assert!(state.resources.is_empty());
    }

    #[test]
    fn state_lookup_by_address() {
        let file = write(
            r#"{ "resources": [
                { "type": "azurerm_dns_zone", "name": "main",
                  "id": "/subscriptions/sub1/resourceGroups/rg1/providers/Microsoft.Network/dnsZones/contoso.com",
                  "attributes": { "name": "contoso.com" } }
            ] }"#,
        );
        let state = load_state(file.path()).unwrap();
        assert!(state.find("azurerm_dns_zone", "main").is_some());
        assert!(state.find("azurerm_dns_zone", "other").is_none());
    }
}
