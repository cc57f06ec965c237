//! Differ - Compare prior state with desired configuration
//!
//! Decides whether a change can be applied in place or needs the resource to
//! be destroyed and recreated because a force-new attribute changed.

use crate::resource::{Attributes, Value};
use crate::schema::{AttributeSchema, ResourceSchema};

/// Result of a diff operation
#[derive(Debug, Clone, PartialEq)]
pub enum Diff {
    /// Prior state matches the configuration
    NoChange,
    /// Changed attributes can be updated in place
    Update { changed_attributes: Vec<String> },
    /// At least one force-new attribute changed
    Replace {
        changed_attributes: Vec<String>,
        force_new_attributes: Vec<String>,
    },
}

impl Diff {
    /// Returns whether this Diff involves a change
    pub fn is_change(&self) -> bool {
        !matches!(self, Diff::NoChange)
    }

    pub fn changed_attributes(&self) -> &[String] {
        match self {
            Diff::NoChange => &[],
            Diff::Update { changed_attributes } | Diff::Replace { changed_attributes, .. } => {
                changed_attributes
            }
        }
    }
}

/// Compare desired configuration with prior state
///
/// Computed attributes left out of the configuration keep whatever Azure
/// reported and never count as changed.
pub fn diff(schema: &ResourceSchema, prior: &Attributes, desired: &Attributes) -> Diff {
    let mut changed = Vec::new();
    let mut force_new = Vec::new();

    for (name, attr) in &schema.attributes {
        let is_changed = match (desired.get(name), prior.get(name)) {
            (None, _) if attr.is_computed() => false,
            (None, None) => false,
            (None, Some(v)) | (Some(v), None) => !is_empty_collection(v),
            (Some(want), Some(have)) => !values_equal(attr, want, have),
        };

        if is_changed {
            changed.push(name.clone());
            if attr.force_new {
                force_new.push(name.clone());
            }
        }
    }

    if changed.is_empty() {
        Diff::NoChange
    } else if force_new.is_empty() {
        Diff::Update {
            changed_attributes: changed,
        }
    } else {
        Diff::Replace {
            changed_attributes: changed,
            force_new_attributes: force_new,
        }
    }
}

/// An empty list or map is the same as leaving the attribute out
fn is_empty_collection(value: &Value) -> bool {
    match value {
        Value::List(items) => items.is_empty(),
        Value::Map(map) => map.is_empty(),
        _ => false,
    }
}

fn values_equal(attr: &AttributeSchema, a: &Value, b: &Value) -> bool {
    let (a, b) = (attr.canonical(a), attr.canonical(b));
    match (&a, &b) {
        (Value::List(xs), Value::List(ys)) if attr.attr_type.is_set() => {
            xs.len() == ys.len() && xs.iter().all(|x| ys.contains(x))
        }
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::AttributeType;

    fn schema() -> ResourceSchema {
        ResourceSchema::new("azurerm_dns_a_record")
            .attribute(
                AttributeSchema::new("name", AttributeType::String)
                    .required()
                    .force_new(),
            )
            .attribute(AttributeSchema::new("ttl", AttributeType::Int).required())
            .attribute(AttributeSchema::new(
                "records",
                AttributeType::set(AttributeType::String),
            ))
            .attribute(AttributeSchema::new("fqdn", AttributeType::String).computed())
    }

    fn lowercase(s: &str) -> String {
        s.to_lowercase()
    }

    fn squash(s: &str) -> String {
        s.replace(' ', "").to_lowercase()
    }

    fn attrs(pairs: &[(&str, Value)]) -> Attributes {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn records(items: &[&str]) -> Value {
        Value::List(items.iter().map(|s| Value::from(*s)).collect())
    }

    #[test]
    fn no_change_ignores_computed_and_set_order() {
        let prior = attrs(&[
            ("name", Value::from("www")),
            ("ttl", Value::Int(300)),
            ("records", records(&["10.0.0.1", "10.0.0.2"])),
            ("fqdn", Value::from("www.example.com.")),
        ]);
        let desired = attrs(&[
            ("name", Value::from("www")),
            ("ttl", Value::Int(300)),
            ("records", records(&["10.0.0.2", "10.0.0.1"])),
        ]);
        assert_eq!(diff(&schema(), &prior, &desired), Diff::NoChange);
    }

    #[test]
    fn normalized_values_are_equal() {
        let schema = ResourceSchema::new("azurerm_automation_account")
            .attribute(
                AttributeSchema::new("location", AttributeType::String)
                    .required()
                    .force_new()
                    .with_normalizer(squash),
            )
            .attribute(
                AttributeSchema::new("records", AttributeType::set(AttributeType::String))
                    .with_normalizer(lowercase),
            );
        let prior = attrs(&[
            ("location", Value::from("westeurope")),
            ("records", records(&["fe80::1", "abcd::2"])),
        ]);
        let desired = attrs(&[
            ("location", Value::from("West Europe")),
            ("records", records(&["ABCD::2", "FE80::1"])),
        ]);
        assert_eq!(diff(&schema, &prior, &desired), Diff::NoChange);

        let desired = attrs(&[
            ("location", Value::from("North Europe")),
            ("records", records(&["fe80::1", "abcd::2"])),
        ]);
        assert_eq!(
            diff(&schema, &prior, &desired),
            Diff::Replace {
                changed_attributes: vec!["location".to_string()],
                force_new_attributes: vec!["location".to_string()],
            }
        );
    }

    #[test]
    fn empty_collections_match_absent_attributes() {
        let prior = attrs(&[
            ("name", Value::from("www")),
            ("ttl", Value::Int(300)),
            ("records", records(&[])),
        ]);
        let desired = attrs(&[("name", Value::from("www")), ("ttl", Value::Int(300))]);
        assert_eq!(diff(&schema(), &prior, &desired), Diff::NoChange);
    }

    #[test]
    fn in_place_update() {
        let prior = attrs(&[("name", Value::from("www")), ("ttl", Value::Int(300))]);
        let desired = attrs(&[("name", Value::from("www")), ("ttl", Value::Int(60))]);
        assert_eq!(
            diff(&schema(), &prior, &desired),
            Diff::Update {
                changed_attributes: vec!["ttl".to_string()]
            }
        );
    }

    #[test]
    fn force_new_change_replaces() {
        let prior = attrs(&[("name", Value::from("www")), ("ttl", Value::Int(300))]);
        let desired = attrs(&[("name", Value::from("web")), ("ttl", Value::Int(60))]);
        match diff(&schema(), &prior, &desired) {
            Diff::Replace {
                changed_attributes,
                force_new_attributes,
            } => {
                assert_eq!(changed_attributes, vec!["name", "ttl"]);
                assert_eq!(force_new_attributes, vec!["name"]);
            }
            other => panic!("Expected Replace, got {:?}", other),
        }
    }

    #[test]
    fn removing_optional_attribute_is_a_change() {
        let prior = attrs(&[
            ("name", Value::from("www")),
            ("ttl", Value::Int(300)),
            ("records", records(&["10.0.0.1"])),
        ]);
        let desired = attrs(&[("name", Value::from("www")), ("ttl", Value::Int(300))]);
        let result = diff(&schema(), &prior, &desired);
        assert_eq!(result.changed_attributes(), ["records".to_string()]);
    }
}
