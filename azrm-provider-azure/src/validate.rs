//! Attribute types for Azure names and formats

use azrm_core::id::ParsedResourceId;
use azrm_core::resource::Value;
use azrm_core::schema::AttributeType;
use azrm_core::schema::types;

use crate::utils::parse_rfc3339;

pub fn resource_group_name() -> AttributeType {
    types::matching(
        "ResourceGroupName",
        r"^[-\w._()]{0,89}[-\w_()]$",
        "resource group names may only contain alphanumeric characters, dash, underscores, parentheses and periods, may not end in a period and must be 1 - 90 characters",
    )
}

pub fn automation_account_name() -> AttributeType {
    types::matching(
        "AutomationAccountName",
        r"^[a-zA-Z][-a-zA-Z0-9]{4,48}[a-zA-Z0-9]$",
        "automation account name must be 6 - 50 characters long, start with a letter, end with a letter or number and contain only letters, numbers and hyphens",
    )
}

pub fn runbook_name() -> AttributeType {
    types::matching(
        "RunbookName",
        r"^[a-zA-Z][-_a-zA-Z0-9]{0,62}$",
        "the name can contain only letters, numbers, underscores and dashes, must begin with a letter and be less than 64 characters",
    )
}

pub fn schedule_name() -> AttributeType {
    types::matching(
        "ScheduleName",
        r"^[^<>*%&:\\?.+/]{0,127}[^<>*%&:\\?.+/\s]$",
        "the name may not contain '<', '>', '*', '%', '&', ':', '\\', '?', '.', '+' or '/', may not end with a space and must be 1 - 128 characters",
    )
}

pub fn module_name() -> AttributeType {
    types::matching(
        "ModuleName",
        r"^[a-zA-Z][-_.a-zA-Z0-9]{0,127}$",
        "module names must begin with a letter and contain only letters, numbers, periods, underscores and dashes",
    )
}

pub fn dns_zone_name() -> AttributeType {
    types::matching(
        "DnsZoneName",
        r"^([a-zA-Z0-9_]([-a-zA-Z0-9_]{0,61}[a-zA-Z0-9_])?\.)*[a-zA-Z0-9_]([-a-zA-Z0-9_]{0,61}[a-zA-Z0-9_])?\.?$",
        "DNS zone names must be a valid domain name",
    )
}

/// RFC 3339 timestamp (e.g., "2026-10-20T10:00:00Z")
pub fn rfc3339() -> AttributeType {
    AttributeType::custom("Rfc3339Time", AttributeType::String, |value| match value {
        Value::String(s) => parse_rfc3339(s).map(|_| ()),
        _ => Err("Expected string".to_string()),
    })
}

pub fn uuid() -> AttributeType {
    AttributeType::custom("Uuid", AttributeType::String, |value| match value {
        Value::String(s) => uuid::Uuid::parse_str(s)
            .map(|_| ())
            .map_err(|e| format!("{:?} is not a valid UUID: {}", s, e)),
        _ => Err("Expected string".to_string()),
    })
}

/// A JSON document held as a string
pub fn json_text() -> AttributeType {
    AttributeType::custom("JsonString", AttributeType::String, |value| match value {
        Value::String(s) => serde_json::from_str::<serde_json::Value>(s)
            .map(|_| ())
            .map_err(|e| format!("{:?} is not valid JSON: {}", s, e)),
        _ => Err("Expected string".to_string()),
    })
}

/// Any ARM resource ID
pub fn resource_id() -> AttributeType {
    AttributeType::custom("ResourceId", AttributeType::String, |value| match value {
        Value::String(s) => ParsedResourceId::parse(s)
            .map(|_| ())
            .map_err(|e| e.to_string()),
        _ => Err("Expected string".to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accepts(t: &AttributeType, s: &str) -> bool {
        t.validate(&Value::from(s)).is_ok()
    }

    #[test]
    fn automation_account_names() {
        let t = automation_account_name();
        assert!(accepts(&t, "acctest-1"));
        assert!(accepts(&t, "account1"));
        assert!(!accepts(&t, "abc"));
        assert!(!accepts(&t, "1account"));
        assert!(!accepts(&t, "account-"));
        assert!(!accepts(&t, &"a".repeat(51)));
    }

    #[test]
    fn runbook_names() {
        let t = runbook_name();
        assert!(accepts(&t, "Get-AzureVMTutorial"));
        assert!(accepts(&t, "a"));
        assert!(!accepts(&t, "_runbook"));
        assert!(!accepts(&t, &format!("a{}", "b".repeat(63))));
    }

    #[test]
    fn schedule_names() {
        let t = schedule_name();
        assert!(accepts(&t, "nightly run"));
        assert!(!accepts(&t, "nightly.run"));
        assert!(!accepts(&t, "trailing "));
    }

    #[test]
    fn formats() {
        assert!(accepts(&rfc3339(), "2026-10-20T10:00:00Z"));
        assert!(!accepts(&rfc3339(), "tomorrow"));
        assert!(accepts(&uuid(), "6f1b6bde-2a8a-4c9e-9d7b-2f4d8c1e0a11"));
        assert!(!accepts(&uuid(), "not-a-uuid"));
        assert!(accepts(&json_text(), r#"{"a": [1, 2]}"#));
        assert!(!accepts(&json_text(), "{"));
        assert!(accepts(&dns_zone_name(), "example.com"));
        assert!(!accepts(&dns_zone_name(), "exa mple.com"));
        assert!(accepts(&resource_group_name(), "acctestRG-auto-1"));
        assert!(!accepts(&resource_group_name(), "rg."));
        assert!(accepts(
            &resource_id(),
            "/subscriptions/sub1/resourceGroups/rg1/providers/Microsoft.Network/publicIPAddresses/ip1"
        ));
        assert!(!accepts(&resource_id(), "ip1"));
    }
}
