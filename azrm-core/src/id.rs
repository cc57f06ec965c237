//! Resource IDs - Encode and decode Azure Resource Manager identifiers
//!
//! An ARM ID is a `/`-separated path of alternating type/value pairs:
//!
//! ```text
//! /subscriptions/{sub}/resourceGroups/{rg}/providers/{namespace}/{type}/{name}[/{type}/{name}...]
//! ```
//!
//! [`IdTemplate`] describes the fixed shape of one resource type's ID and is
//! strict about it: every fixed segment must match exactly, including casing,
//! and every value must be non-empty. [`ParsedResourceId`] is the lenient
//! counterpart for IDs of arbitrary shape.

use std::fmt;

/// Error returned when an ID does not match the expected shape
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdParseError {
    #[error("ID was empty")]
    Empty,

    #[error("parsing {id:?}: ID must start with '/'")]
    MissingLeadingSlash { id: String },

    #[error("parsing {id:?}: expected the segment {expected:?} but got {got:?}")]
    UnexpectedSegment {
        id: String,
        expected: String,
        got: String,
    },

    #[error("parsing {id:?}: the segment {expected:?} was not found")]
    MissingSegment { id: String, expected: String },

    #[error("parsing {id:?}: the segment {key:?} has an empty value")]
    EmptyValue { id: String, key: String },

    #[error("parsing {id:?}: unexpected trailing segments {trailing:?}")]
    TrailingSegments { id: String, trailing: String },

    #[error("parsing {id:?}: the number of segments is not even")]
    UnevenSegments { id: String },
}

/// How fixed segments are compared while decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Casing {
    /// Fixed segments must match exactly
    Exact,
    /// Fixed segments may differ in ASCII case (IDs echoed back by Azure)
    Insensitive,
}

impl Casing {
    fn matches(self, expected: &str, got: &str) -> bool {
        match self {
            Casing::Exact => expected == got,
            Casing::Insensitive => expected.eq_ignore_ascii_case(got),
        }
    }
}

/// Fixed shape of a resource type's ID below the resource group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdTemplate {
    /// Provider namespace (e.g., "Microsoft.Automation")
    pub provider: &'static str,
    /// Type segments in order (e.g., ["automationAccounts", "runbooks"])
    pub types: &'static [&'static str],
}

/// Values extracted from an ID by an [`IdTemplate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdSegments {
    pub subscription_id: String,
    pub resource_group: String,
    /// One value per template type segment, in order
    pub names: Vec<String>,
}

impl IdTemplate {
    pub const fn new(provider: &'static str, types: &'static [&'static str]) -> Self {
        Self { provider, types }
    }

    /// Build the ID string; `names` holds one value per type segment
    pub fn encode(&self, subscription_id: &str, resource_group: &str, names: &[&str]) -> String {
        let mut id = format!(
            "/subscriptions/{}/resourceGroups/{}/providers/{}",
            subscription_id, resource_group, self.provider
        );
        for (segment, name) in self.types.iter().zip(names) {
            id.push('/');
            id.push_str(segment);
            id.push('/');
            id.push_str(name);
        }
        id
    }

    /// Decode an ID, matching fixed segments exactly
    pub fn decode(&self, id: &str) -> Result<IdSegments, IdParseError> {
        self.decode_with(id, Casing::Exact)
    }

    /// Decode an ID, tolerating different casing of fixed segments
    pub fn decode_insensitively(&self, id: &str) -> Result<IdSegments, IdParseError> {
        self.decode_with(id, Casing::Insensitive)
    }

    fn decode_with(&self, id: &str, casing: Casing) -> Result<IdSegments, IdParseError> {
        let mut parts = split_components(id)?.into_iter();

        expect_fixed_with(&mut parts, id, "subscriptions", casing)?;
        let subscription_id = take_value(&mut parts, id, "subscriptions")?;
        expect_fixed_with(&mut parts, id, "resourceGroups", casing)?;
        let resource_group = take_value(&mut parts, id, "resourceGroups")?;
        expect_fixed_with(&mut parts, id, "providers", casing)?;
        expect_fixed_with(&mut parts, id, self.provider, casing)?;

        let mut names = Vec::with_capacity(self.types.len());
        for segment in self.types {
            expect_fixed_with(&mut parts, id, segment, casing)?;
            names.push(take_value(&mut parts, id, segment)?);
        }

        let trailing: Vec<&str> = parts.collect();
        if !trailing.is_empty() {
            return Err(IdParseError::TrailingSegments {
                id: id.to_string(),
                trailing: trailing.join("/"),
            });
        }

        Ok(IdSegments {
            subscription_id,
            resource_group,
            names,
        })
    }
}

fn split_components(id: &str) -> Result<Vec<&str>, IdParseError> {
    if id.is_empty() {
        return Err(IdParseError::Empty);
    }
    match id.strip_prefix('/') {
        Some(rest) => Ok(rest.split('/').collect()),
        None => Err(IdParseError::MissingLeadingSlash { id: id.to_string() }),
    }
}

fn expect_fixed_with<'a>(
    parts: &mut impl Iterator<Item = &'a str>,
    id: &str,
    expected: &str,
    casing: Casing,
) -> Result<(), IdParseError> {
    match parts.next() {
        Some(got) if casing.matches(expected, got) => Ok(()),
        Some(got) => Err(IdParseError::UnexpectedSegment {
            id: id.to_string(),
            expected: expected.to_string(),
            got: got.to_string(),
        }),
        None => Err(IdParseError::MissingSegment {
            id: id.to_string(),
            expected: expected.to_string(),
        }),
    }
}

fn take_value<'a>(
    parts: &mut impl Iterator<Item = &'a str>,
    id: &str,
    key: &str,
) -> Result<String, IdParseError> {
    match parts.next() {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => Err(IdParseError::EmptyValue {
            id: id.to_string(),
            key: key.to_string(),
        }),
    }
}

/// An ARM ID of arbitrary shape, split into its type/value pairs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedResourceId {
    pub subscription_id: String,
    pub resource_group: Option<String>,
    pub provider: Option<String>,
    /// Remaining (type, value) pairs after the provider namespace
    pub path: Vec<(String, String)>,
}

impl ParsedResourceId {
    pub fn parse(id: &str) -> Result<Self, IdParseError> {
        let parts = split_components(id)?;
        if parts.len() % 2 != 0 {
            return Err(IdParseError::UnevenSegments { id: id.to_string() });
        }

        let mut subscription_id = None;
        let mut resource_group = None;
        let mut provider = None;
        let mut path = Vec::new();

        for pair in parts.chunks(2) {
            let (key, value) = (pair[0], pair[1]);
            if key.is_empty() || value.is_empty() {
                return Err(IdParseError::EmptyValue {
                    id: id.to_string(),
                    key: key.to_string(),
                });
            }
            match key {
                "subscriptions" if subscription_id.is_none() => {
                    subscription_id = Some(value.to_string())
                }
                "resourceGroups" if resource_group.is_none() => {
                    resource_group = Some(value.to_string())
                }
                "providers" if provider.is_none() => provider = Some(value.to_string()),
                _ => path.push((key.to_string(), value.to_string())),
            }
        }

        let subscription_id = subscription_id.ok_or_else(|| IdParseError::MissingSegment {
            id: id.to_string(),
            expected: "subscriptions".to_string(),
        })?;

        Ok(Self {
            subscription_id,
            resource_group,
            provider,
            path,
        })
    }

    /// Remove and return the value of the first segment with the given type
    pub fn pop(&mut self, key: &str) -> Option<String> {
        let pos = self.path.iter().position(|(k, _)| k == key)?;
        Some(self.path.remove(pos).1)
    }
}

impl fmt::Display for ParsedResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/subscriptions/{}", self.subscription_id)?;
        if let Some(rg) = &self.resource_group {
            write!(f, "/resourceGroups/{}", rg)?;
        }
        if let Some(provider) = &self.provider {
            write!(f, "/providers/{}", provider)?;
        }
        for (k, v) in &self.path {
            write!(f, "/{}/{}", k, v)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONNECTION: IdTemplate =
        IdTemplate::new("Microsoft.Automation", &["automationAccounts", "connections"]);

    #[test]
    fn encode_then_decode() {
        let id = CONNECTION.encode("12345678-1234-9876-4563-123456789012", "resGroup1", &[
            "account1",
            "connection1",
        ]);
        assert_eq!(
            id,
            "/subscriptions/12345678-1234-9876-4563-123456789012/resourceGroups/resGroup1/providers/Microsoft.Automation/automationAccounts/account1/connections/connection1"
        );

        let segments = CONNECTION.decode(&id).unwrap();
        assert_eq!(segments.subscription_id, "12345678-1234-9876-4563-123456789012");
        assert_eq!(segments.resource_group, "resGroup1");
        assert_eq!(segments.names, vec!["account1", "connection1"]);
    }

    #[test]
    fn decode_rejects_incomplete_ids() {
        let cases = [
            "",
            "/",
            "/subscriptions/",
            "/subscriptions/sub1/",
            "/subscriptions/sub1/resourceGroups/",
            "/subscriptions/sub1/resourceGroups/rg1/",
            "/subscriptions/sub1/resourceGroups/rg1/providers/",
            "/subscriptions/sub1/resourceGroups/rg1/providers/Microsoft.Automation/",
            "/subscriptions/sub1/resourceGroups/rg1/providers/Microsoft.Automation/automationAccounts/",
            "/subscriptions/sub1/resourceGroups/rg1/providers/Microsoft.Automation/automationAccounts/account1/",
            "/subscriptions/sub1/resourceGroups/rg1/providers/Microsoft.Automation/automationAccounts/account1/connections/",
        ];
        for case in cases {
            assert!(CONNECTION.decode(case).is_err(), "expected error for {case:?}");
        }
    }

    #[test]
    fn decode_is_case_sensitive() {
        let upper = "/subscriptions/sub1/resourceGroups/rg1/providers/Microsoft.Automation/automationAccounts/account1/Connections/connection1";
        assert!(matches!(
            CONNECTION.decode(upper),
            Err(IdParseError::UnexpectedSegment { .. })
        ));

        let segments = CONNECTION.decode_insensitively(upper).unwrap();
        assert_eq!(segments.names, vec!["account1", "connection1"]);

        let lower_rg = "/subscriptions/sub1/resourcegroups/rg1/providers/Microsoft.Automation/automationAccounts/account1/connections/connection1";
        assert!(CONNECTION.decode(lower_rg).is_err());
        assert!(CONNECTION.decode_insensitively(lower_rg).is_ok());
    }

    #[test]
    fn decode_rejects_trailing_segments() {
        let id = "/subscriptions/sub1/resourceGroups/rg1/providers/Microsoft.Automation/automationAccounts/account1/connections/connection1/extra/value";
        assert!(matches!(
            CONNECTION.decode(id),
            Err(IdParseError::TrailingSegments { .. })
        ));
    }

    #[test]
    fn decode_requires_leading_slash() {
        let id = "subscriptions/sub1/resourceGroups/rg1/providers/Microsoft.Automation/automationAccounts/account1/connections/connection1";
        assert!(matches!(
            CONNECTION.decode(id),
            Err(IdParseError::MissingLeadingSlash { .. })
        ));
    }

    #[test]
    fn parse_arbitrary_id() {
        let mut parsed = ParsedResourceId::parse(
            "/subscriptions/sub1/resourceGroups/rg1/providers/Microsoft.Network/publicIPAddresses/ip1",
        )
        .unwrap();
        assert_eq!(parsed.subscription_id, "sub1");
        assert_eq!(parsed.resource_group.as_deref(), Some("rg1"));
        assert_eq!(parsed.provider.as_deref(), Some("Microsoft.Network"));
        assert_eq!(
            parsed.to_string(),
            "/subscriptions/sub1/resourceGroups/rg1/providers/Microsoft.Network/publicIPAddresses/ip1"
        );
        assert_eq!(parsed.pop("publicIPAddresses").as_deref(), Some("ip1"));
        assert!(parsed.path.is_empty());
    }

    #[test]
    fn parse_arbitrary_id_rejects_bad_input() {
        assert!(ParsedResourceId::parse("/subscriptions").is_err());
        assert!(ParsedResourceId::parse("/resourceGroups/rg1").is_err());
        assert!(ParsedResourceId::parse("/subscriptions/sub1/resourceGroups/").is_err());
    }
}
