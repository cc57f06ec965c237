//! Schema - Define type schemas for resources
//!
//! Each resource type declares its attributes here, so configuration can be
//! validated before any call reaches Azure.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use crate::resource::{Attributes, Value};

/// Validation predicate attached to a custom type
pub type Validator = Arc<dyn Fn(&Value) -> Result<(), String> + Send + Sync>;

/// Canonical form of a string value, applied to both sides before diffing
pub type Normalizer = fn(&str) -> String;

/// Attribute type
#[derive(Clone)]
pub enum AttributeType {
    /// String
    String,
    /// Integer
    Int,
    /// Boolean
    Bool,
    /// Enum (list of allowed values, matched case-sensitively)
    Enum(Vec<String>),
    /// Custom type (base type plus validation function)
    Custom {
        name: String,
        base: Box<AttributeType>,
        validate: Validator,
    },
    /// Ordered list
    List(Box<AttributeType>),
    /// Unordered collection; ordering is ignored when diffing
    Set(Box<AttributeType>),
    /// String-keyed map
    Map(Box<AttributeType>),
    /// Nested block with its own attributes
    Object(Vec<AttributeSchema>),
}

impl fmt::Debug for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

impl AttributeType {
    pub fn enumeration(values: &[&str]) -> Self {
        AttributeType::Enum(values.iter().map(|v| v.to_string()).collect())
    }

    pub fn list(inner: AttributeType) -> Self {
        AttributeType::List(Box::new(inner))
    }

    pub fn set(inner: AttributeType) -> Self {
        AttributeType::Set(Box::new(inner))
    }

    pub fn map(inner: AttributeType) -> Self {
        AttributeType::Map(Box::new(inner))
    }

    pub fn custom(
        name: impl Into<String>,
        base: AttributeType,
        validate: impl Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        AttributeType::Custom {
            name: name.into(),
            base: Box::new(base),
            validate: Arc::new(validate),
        }
    }

    pub fn is_set(&self) -> bool {
        match self {
            AttributeType::Set(_) => true,
            AttributeType::Custom { base, .. } => base.is_set(),
            _ => false,
        }
    }

    /// Check if a value conforms to this type
    pub fn validate(&self, value: &Value) -> Result<(), TypeError> {
        match (self, value) {
            (AttributeType::String, Value::String(_)) => Ok(()),
            (AttributeType::Int, Value::Int(_)) => Ok(()),
            (AttributeType::Bool, Value::Bool(_)) => Ok(()),

            (AttributeType::Enum(variants), Value::String(s)) => {
                if variants.iter().any(|v| v == s) {
                    Ok(())
                } else {
                    Err(TypeError::InvalidEnumVariant {
                        value: s.clone(),
                        expected: variants.clone(),
                    })
                }
            }

            (AttributeType::Custom { base, validate, .. }, v) => {
                base.validate(v)?;
                validate(v).map_err(|message| TypeError::ValidationFailed { message })
            }

            (AttributeType::List(inner) | AttributeType::Set(inner), Value::List(items)) => {
                for (i, item) in items.iter().enumerate() {
                    inner.validate(item).map_err(|e| TypeError::ListItemError {
                        index: i,
                        inner: Box::new(e),
                    })?;
                }
                if matches!(self, AttributeType::Set(_)) {
                    for (i, item) in items.iter().enumerate() {
                        if items[..i].contains(item) {
                            return Err(TypeError::DuplicateSetItem { index: i });
                        }
                    }
                }
                Ok(())
            }

            (AttributeType::Map(inner), Value::Map(map)) => {
                for (k, v) in map {
                    inner.validate(v).map_err(|e| TypeError::MapValueError {
                        key: k.clone(),
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            (AttributeType::Object(fields), Value::Map(map)) => {
                let mut errors = Vec::new();
                validate_fields(fields, map, &mut errors);
                match errors.into_iter().next() {
                    Some(e) => Err(e),
                    None => Ok(()),
                }
            }

            _ => Err(TypeError::TypeMismatch {
                expected: self.type_name(),
                got: value.type_name(),
            }),
        }
    }

    pub fn type_name(&self) -> String {
        match self {
            AttributeType::String => "String".to_string(),
            AttributeType::Int => "Int".to_string(),
            AttributeType::Bool => "Bool".to_string(),
            AttributeType::Enum(variants) => format!("Enum({})", variants.join(" | ")),
            AttributeType::Custom { name, .. } => name.clone(),
            AttributeType::List(inner) => format!("List<{}>", inner.type_name()),
            AttributeType::Set(inner) => format!("Set<{}>", inner.type_name()),
            AttributeType::Map(inner) => format!("Map<{}>", inner.type_name()),
            AttributeType::Object(fields) => format!(
                "Object{{{}}}",
                fields
                    .iter()
                    .map(|f| f.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

fn normalize_value(normalize: Normalizer, value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(normalize(s)),
        Value::List(items) => Value::List(items.iter().map(|v| normalize_value(normalize, v)).collect()),
        other => other.clone(),
    }
}

fn validate_fields(
    fields: &[AttributeSchema],
    values: &BTreeMap<String, Value>,
    errors: &mut Vec<TypeError>,
) {
    for field in fields {
        if field.is_required() && !values.contains_key(&field.name) && field.default.is_none() {
            errors.push(TypeError::MissingRequired {
                name: field.name.clone(),
            });
        }
    }

    for (name, value) in values {
        match fields.iter().find(|f| &f.name == name) {
            Some(field) => {
                if field.presence == Presence::Computed {
                    errors.push(TypeError::ComputedOnly { name: name.clone() });
                } else if let Err(e) = field.attr_type.validate(value) {
                    errors.push(TypeError::Attribute {
                        name: name.clone(),
                        inner: Box::new(e),
                    });
                }
            }
            None => errors.push(TypeError::UnknownAttribute { name: name.clone() }),
        }
    }
}

/// Type error
#[derive(Debug, Clone, thiserror::Error)]
pub enum TypeError {
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("Invalid enum variant '{value}', expected one of: {}", expected.join(", "))]
    InvalidEnumVariant {
        value: String,
        expected: Vec<String>,
    },

    #[error("{message}")]
    ValidationFailed { message: String },

    #[error("Required attribute '{name}' is missing")]
    MissingRequired { name: String },

    #[error("Unknown attribute '{name}'")]
    UnknownAttribute { name: String },

    #[error("Attribute '{name}' is computed and cannot be set")]
    ComputedOnly { name: String },

    #[error("'{name}' conflicts with '{other}'")]
    Conflict { name: String, other: String },

    #[error("exactly one of {} must be specified", names.iter().map(|n| format!("`{}`", n)).collect::<Vec<_>>().join(", "))]
    ExactlyOneOf { names: Vec<String> },

    #[error("{name}: {inner}")]
    Attribute { name: String, inner: Box<TypeError> },

    #[error("List item at index {index}: {inner}")]
    ListItemError { index: usize, inner: Box<TypeError> },

    #[error("Set item at index {index} is a duplicate")]
    DuplicateSetItem { index: usize },

    #[error("Map value for key '{key}': {inner}")]
    MapValueError { key: String, inner: Box<TypeError> },
}

impl Value {
    fn type_name(&self) -> String {
        match self {
            Value::String(_) => "String".to_string(),
            Value::Int(_) => "Int".to_string(),
            Value::Bool(_) => "Bool".to_string(),
            Value::List(_) => "List".to_string(),
            Value::Map(_) => "Map".to_string(),
        }
    }
}

/// Whether an attribute is supplied by configuration, by Azure, or both
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Required,
    Optional,
    /// Set by Azure only
    Computed,
    /// Optional in configuration, filled in by Azure when omitted
    OptionalComputed,
}

/// Attribute schema
#[derive(Debug, Clone)]
pub struct AttributeSchema {
    pub name: String,
    pub attr_type: AttributeType,
    pub presence: Presence,
    /// Changing this attribute replaces the resource
    pub force_new: bool,
    /// Value is a secret; never echoed back by Azure
    pub sensitive: bool,
    pub default: Option<Value>,
    pub description: Option<String>,
    pub conflicts_with: Vec<String>,
    /// Group (including this attribute) of which exactly one must be set
    pub exactly_one_of: Vec<String>,
    /// Applied to strings, and to string items of lists and sets, when diffing
    pub normalizer: Option<Normalizer>,
}

impl AttributeSchema {
    pub fn new(name: impl Into<String>, attr_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attr_type,
            presence: Presence::Optional,
            force_new: false,
            sensitive: false,
            default: None,
            description: None,
            conflicts_with: Vec::new(),
            exactly_one_of: Vec::new(),
            normalizer: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.presence = Presence::Required;
        self
    }

    pub fn computed(mut self) -> Self {
        self.presence = Presence::Computed;
        self
    }

    pub fn optional_computed(mut self) -> Self {
        self.presence = Presence::OptionalComputed;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn conflicts_with(mut self, names: &[&str]) -> Self {
        self.conflicts_with = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn exactly_one_of(mut self, names: &[&str]) -> Self {
        self.exactly_one_of = names.iter().map(|n| n.to_string()).collect();
        self
    }

    /// Compare values by `normalize(value)` rather than as written
    pub fn with_normalizer(mut self, normalize: Normalizer) -> Self {
        self.normalizer = Some(normalize);
        self
    }

    /// The value as the differ sees it
    pub fn canonical(&self, value: &Value) -> Value {
        match self.normalizer {
            Some(normalize) => normalize_value(normalize, value),
            None => value.clone(),
        }
    }

    pub fn is_required(&self) -> bool {
        self.presence == Presence::Required
    }

    pub fn is_computed(&self) -> bool {
        matches!(
            self.presence,
            Presence::Computed | Presence::OptionalComputed
        )
    }
}

/// Resource schema
#[derive(Debug, Clone)]
pub struct ResourceSchema {
    pub resource_type: String,
    pub attributes: BTreeMap<String, AttributeSchema>,
    pub description: Option<String>,
}

impl ResourceSchema {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            attributes: BTreeMap::new(),
            description: None,
        }
    }

    pub fn attribute(mut self, schema: AttributeSchema) -> Self {
        self.attributes.insert(schema.name.clone(), schema);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&AttributeSchema> {
        self.attributes.get(name)
    }

    /// Names of attributes whose change forces replacement
    pub fn force_new_attributes(&self) -> Vec<&str> {
        self.attributes
            .values()
            .filter(|a| a.force_new)
            .map(|a| a.name.as_str())
            .collect()
    }

    /// Fill in declared defaults for attributes absent from configuration
    pub fn apply_defaults(&self, attributes: &mut Attributes) {
        for (name, schema) in &self.attributes {
            if let Some(default) = &schema.default {
                attributes
                    .entry(name.clone())
                    .or_insert_with(|| default.clone());
            }
        }
    }

    /// Validate resource attributes
    pub fn validate(&self, attributes: &Attributes) -> Result<(), Vec<TypeError>> {
        let mut errors = Vec::new();

        let fields: Vec<AttributeSchema> = self.attributes.values().cloned().collect();
        validate_fields(&fields, attributes, &mut errors);

        for (name, schema) in &self.attributes {
            if !attributes.contains_key(name) {
                continue;
            }
            for other in &schema.conflicts_with {
                // Report each conflicting pair once
                if attributes.contains_key(other) && name < other {
                    errors.push(TypeError::Conflict {
                        name: name.clone(),
                        other: other.clone(),
                    });
                }
            }
        }

        let mut seen_groups = BTreeSet::new();
        for schema in self.attributes.values() {
            if schema.exactly_one_of.is_empty() {
                continue;
            }
            let mut group = schema.exactly_one_of.clone();
            group.sort();
            if !seen_groups.insert(group.clone()) {
                continue;
            }
            let set_count = group
                .iter()
                .filter(|n| attributes.contains_key(n.as_str()))
                .count();
            if set_count != 1 {
                errors.push(TypeError::ExactlyOneOf { names: group });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Helper functions for common types
pub mod types {
    use std::net::{Ipv4Addr, Ipv6Addr};

    use regex::Regex;

    use super::*;

    /// Positive integer type
    pub fn positive_int() -> AttributeType {
        int_between(1, i64::MAX)
    }

    /// Integer within an inclusive range
    pub fn int_between(min: i64, max: i64) -> AttributeType {
        AttributeType::custom("IntBetween", AttributeType::Int, move |value| {
            match value {
                Value::Int(n) if (min..=max).contains(n) => Ok(()),
                Value::Int(n) => Err(format!(
                    "expected value to be in the range ({} - {}), got {}",
                    min, max, n
                )),
                _ => Err("Expected integer".to_string()),
            }
        })
    }

    /// String whose length (in characters) lies within an inclusive range
    pub fn string_len_between(min: usize, max: usize) -> AttributeType {
        AttributeType::custom("StringLen", AttributeType::String, move |value| {
            let len = value.as_str().map(|s| s.chars().count()).unwrap_or(0);
            if (min..=max).contains(&len) {
                Ok(())
            } else {
                Err(format!(
                    "expected length to be in the range ({} - {}), got {}",
                    min, max, len
                ))
            }
        })
    }

    /// Non-empty string
    pub fn non_empty_string() -> AttributeType {
        AttributeType::custom("NonEmptyString", AttributeType::String, |value| {
            match value.as_str() {
                Some(s) if !s.trim().is_empty() => Ok(()),
                _ => Err("expected a non-empty string".to_string()),
            }
        })
    }

    /// String matching a regular expression
    pub fn matching(name: &str, pattern: &str, message: &str) -> AttributeType {
        let re = Regex::new(pattern).map_err(|e| e.to_string());
        let message = message.to_string();
        AttributeType::custom(name, AttributeType::String, move |value| {
            let re = re
                .as_ref()
                .map_err(|e| format!("invalid validation pattern: {}", e))?;
            match value.as_str() {
                Some(s) if re.is_match(s) => Ok(()),
                Some(s) => Err(format!("{}, got {:?}", message, s)),
                None => Err("Expected string".to_string()),
            }
        })
    }

    /// IPv4 address (e.g., "10.0.0.1")
    pub fn ipv4() -> AttributeType {
        AttributeType::custom("Ipv4Address", AttributeType::String, |value| {
            match value.as_str().map(|s| s.parse::<Ipv4Addr>()) {
                Some(Ok(_)) => Ok(()),
                _ => Err(format!("expected a valid IPv4 address, got {:?}", value)),
            }
        })
    }

    /// IPv6 address (e.g., "2001:db8::1")
    pub fn ipv6() -> AttributeType {
        AttributeType::custom("Ipv6Address", AttributeType::String, |value| {
            match value.as_str().map(|s| s.parse::<Ipv6Addr>()) {
                Some(Ok(_)) => Ok(()),
                _ => Err(format!("expected a valid IPv6 address, got {:?}", value)),
            }
        })
    }

    /// Tags map (string values)
    pub fn tags() -> AttributeType {
        AttributeType::map(AttributeType::String)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, Value)]) -> Attributes {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn validate_string_type() {
        let t = AttributeType::String;
        assert!(t.validate(&Value::from("hello")).is_ok());
        assert!(t.validate(&Value::Int(42)).is_err());
    }

    #[test]
    fn enum_matching_is_case_sensitive() {
        let t = AttributeType::enumeration(&["Basic", "Free"]);
        assert!(t.validate(&Value::from("Basic")).is_ok());
        assert!(t.validate(&Value::from("basic")).is_err());
    }

    #[test]
    fn validate_int_between() {
        let t = types::int_between(1, 100);
        assert!(t.validate(&Value::Int(1)).is_ok());
        assert!(t.validate(&Value::Int(100)).is_ok());
        assert!(t.validate(&Value::Int(0)).is_err());
        assert!(t.validate(&Value::Int(101)).is_err());
        assert!(t.validate(&Value::from("7")).is_err());
    }

    #[test]
    fn validate_ip_addresses() {
        assert!(types::ipv4().validate(&Value::from("10.0.180.17")).is_ok());
        assert!(types::ipv4().validate(&Value::from("10.0.0.256")).is_err());
        assert!(types::ipv6().validate(&Value::from("2607:f8b0::200e")).is_ok());
        assert!(types::ipv6().validate(&Value::from("10.0.0.1")).is_err());
    }

    #[test]
    fn set_rejects_duplicates() {
        let t = AttributeType::set(AttributeType::String);
        let dup = Value::List(vec![Value::from("a"), Value::from("a")]);
        assert!(matches!(
            t.validate(&dup),
            Err(TypeError::DuplicateSetItem { index: 1 })
        ));
    }

    #[test]
    fn validate_nested_object() {
        let t = AttributeType::Object(vec![
            AttributeSchema::new("preference", AttributeType::Int).required(),
            AttributeSchema::new("exchange", AttributeType::String).required(),
        ]);
        let ok = Value::Map(attrs(&[
            ("preference", Value::Int(10)),
            ("exchange", Value::from("mail1.contoso.com")),
        ]));
        assert!(t.validate(&ok).is_ok());

        let missing = Value::Map(attrs(&[("preference", Value::Int(10))]));
        assert!(matches!(
            t.validate(&missing),
            Err(TypeError::MissingRequired { .. })
        ));
    }

    #[test]
    fn missing_required_attribute() {
        let schema = ResourceSchema::new("zone")
            .attribute(AttributeSchema::new("name", AttributeType::String).required());

        let result = schema.validate(&Attributes::new());
        assert!(result.is_err());
    }

    #[test]
    fn unknown_and_computed_attributes_rejected() {
        let schema = ResourceSchema::new("record")
            .attribute(AttributeSchema::new("name", AttributeType::String).required())
            .attribute(AttributeSchema::new("fqdn", AttributeType::String).computed());

        let errors = schema
            .validate(&attrs(&[
                ("name", Value::from("www")),
                ("fqdn", Value::from("www.example.com.")),
                ("bogus", Value::Bool(true)),
            ]))
            .unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors
            .iter()
            .any(|e| matches!(e, TypeError::ComputedOnly { name } if name == "fqdn")));
        assert!(errors
            .iter()
            .any(|e| matches!(e, TypeError::UnknownAttribute { name } if name == "bogus")));
    }

    #[test]
    fn exactly_one_of_neither_or_both() {
        let group = ["records", "target_resource_id"];
        let schema = ResourceSchema::new("record")
            .attribute(
                AttributeSchema::new("records", AttributeType::set(AttributeType::String))
                    .exactly_one_of(&group),
            )
            .attribute(
                AttributeSchema::new("target_resource_id", AttributeType::String)
                    .exactly_one_of(&group),
            );

        let neither = schema.validate(&Attributes::new()).unwrap_err();
        assert_eq!(neither.len(), 1);
        assert!(neither[0].to_string().contains("`records`"));

        let both = attrs(&[
            ("records", Value::List(vec![Value::from("10.0.0.1")])),
            ("target_resource_id", Value::from("/subscriptions/x")),
        ]);
        assert!(schema.validate(&both).is_err());

        let one = attrs(&[("target_resource_id", Value::from("/subscriptions/x"))]);
        assert!(schema.validate(&one).is_ok());
    }

    #[test]
    fn conflicting_attributes() {
        let schema = ResourceSchema::new("schedule")
            .attribute(
                AttributeSchema::new("month_days", AttributeType::set(AttributeType::Int))
                    .conflicts_with(&["monthly_occurrence"]),
            )
            .attribute(
                AttributeSchema::new("monthly_occurrence", AttributeType::list(AttributeType::String))
                    .conflicts_with(&["month_days"]),
            );

        let errors = schema
            .validate(&attrs(&[
                ("month_days", Value::List(vec![Value::Int(1)])),
                ("monthly_occurrence", Value::List(vec![Value::from("x")])),
            ]))
            .unwrap_err();
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn defaults_fill_missing_attributes() {
        let schema = ResourceSchema::new("account").attribute(
            AttributeSchema::new("public_network_access_enabled", AttributeType::Bool)
                .with_default(true),
        );
        let mut values = Attributes::new();
        schema.apply_defaults(&mut values);
        assert_eq!(
            values.get("public_network_access_enabled"),
            Some(&Value::Bool(true))
        );

        let mut values = attrs(&[("public_network_access_enabled", Value::Bool(false))]);
        schema.apply_defaults(&mut values);
        assert_eq!(
            values.get("public_network_access_enabled"),
            Some(&Value::Bool(false))
        );
    }
}
