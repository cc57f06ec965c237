//! Typed resource IDs for every Automation and DNS resource type
//!
//! Each ID type knows its [`IdTemplate`], renders the canonical ARM ID through
//! `Display` and decodes it strictly through [`ResourceIdentity::parse`].

use std::fmt;

use azrm_core::handler::ResourceIdentity;
use azrm_core::id::{IdParseError, IdSegments, IdTemplate};

const AUTOMATION: &str = "Microsoft.Automation";
const NETWORK: &str = "Microsoft.Network";

/// Define a typed ID over an [`IdTemplate`]
///
/// Each `"segment" => field: "Label"` entry adds one type/name pair below the
/// provider namespace; the label is used by `describe()`.
macro_rules! resource_id {
    (
        $(#[$meta:meta])*
        $name:ident => $label:literal,
        $provider:expr, [$($segment:literal => $field:ident : $field_label:literal),+ $(,)?]
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $name {
            pub subscription_id: String,
            pub resource_group_name: String,
            $(pub $field: String,)+
        }

        impl $name {
            pub const TEMPLATE: IdTemplate = IdTemplate::new($provider, &[$($segment),+]);

            pub fn new(
                subscription_id: impl Into<String>,
                resource_group_name: impl Into<String>,
                $($field: impl Into<String>,)+
            ) -> Self {
                Self {
                    subscription_id: subscription_id.into(),
                    resource_group_name: resource_group_name.into(),
                    $($field: $field.into(),)+
                }
            }

            /// Decode an ID echoed back by Azure, which may differ in casing
            pub fn parse_insensitively(id: &str) -> Result<Self, IdParseError> {
                Self::TEMPLATE.decode_insensitively(id).map(Self::from_segments)
            }

            fn from_segments(segments: IdSegments) -> Self {
                let mut names = segments.names.into_iter();
                Self {
                    subscription_id: segments.subscription_id,
                    resource_group_name: segments.resource_group,
                    $($field: names.next().unwrap_or_default(),)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&Self::TEMPLATE.encode(
                    &self.subscription_id,
                    &self.resource_group_name,
                    &[$(&self.$field),+],
                ))
            }
        }

        impl ResourceIdentity for $name {
            fn parse(id: &str) -> Result<Self, IdParseError> {
                Self::TEMPLATE.decode(id).map(Self::from_segments)
            }

            fn describe(&self) -> String {
                let parts = [
                    format!("Subscription: {:?}", self.subscription_id),
                    format!("Resource Group Name: {:?}", self.resource_group_name),
                    $(format!("{}: {:?}", $field_label, self.$field),)+
                ];
                format!("{} ({})", $label, parts.join(", "))
            }
        }
    };
}

// =============================================================================
// Automation
// =============================================================================

resource_id!(
    AutomationAccountId => "Automation Account",
    AUTOMATION, ["automationAccounts" => automation_account_name: "Automation Account Name"]
);

resource_id!(
    RunbookId => "Runbook",
    AUTOMATION, [
        "automationAccounts" => automation_account_name: "Automation Account Name",
        "runbooks" => runbook_name: "Runbook Name",
    ]
);

resource_id!(
    ScheduleId => "Schedule",
    AUTOMATION, [
        "automationAccounts" => automation_account_name: "Automation Account Name",
        "schedules" => schedule_name: "Schedule Name",
    ]
);

resource_id!(
    VariableId => "Variable",
    AUTOMATION, [
        "automationAccounts" => automation_account_name: "Automation Account Name",
        "variables" => variable_name: "Variable Name",
    ]
);

resource_id!(
    /// The name segment is a UUID chosen by the client
    JobScheduleId => "Job Schedule",
    AUTOMATION, [
        "automationAccounts" => automation_account_name: "Automation Account Name",
        "jobSchedules" => job_schedule_id: "Job Schedule ID",
    ]
);

resource_id!(
    ModuleId => "Module",
    AUTOMATION, [
        "automationAccounts" => automation_account_name: "Automation Account Name",
        "modules" => module_name: "Module Name",
    ]
);

resource_id!(
    ConnectionId => "Connection",
    AUTOMATION, [
        "automationAccounts" => automation_account_name: "Automation Account Name",
        "connections" => connection_name: "Connection Name",
    ]
);

resource_id!(
    CredentialId => "Credential",
    AUTOMATION, [
        "automationAccounts" => automation_account_name: "Automation Account Name",
        "credentials" => credential_name: "Credential Name",
    ]
);

/// Child IDs that hang off an Automation Account
pub trait AccountChild {
    fn account_id(&self) -> AutomationAccountId;
}

macro_rules! account_child {
    ($($name:ident),+) => {
        $(
            impl AccountChild for $name {
                fn account_id(&self) -> AutomationAccountId {
                    AutomationAccountId::new(
                        &self.subscription_id,
                        &self.resource_group_name,
                        &self.automation_account_name,
                    )
                }
            }
        )+
    };
}

account_child!(
    RunbookId,
    ScheduleId,
    VariableId,
    JobScheduleId,
    ModuleId,
    ConnectionId,
    CredentialId
);

// =============================================================================
// DNS
// =============================================================================

resource_id!(
    DnsZoneId => "DNS Zone",
    NETWORK, ["dnsZones" => zone_name: "DNS Zone Name"]
);

/// A record set ID: `.../dnsZones/{zone}/{RECORD_TYPE}/{name}`
pub trait RecordSetId: ResourceIdentity + 'static {
    fn from_parts(subscription_id: &str, resource_group_name: &str, zone_name: &str, name: &str) -> Self;

    fn zone_id(&self) -> DnsZoneId;

    fn record_name(&self) -> &str;
}

macro_rules! record_set_id {
    ($($name:ident => $label:literal, $record_type:literal, $name_label:literal;)+) => {
        $(
            resource_id!(
                $name => $label,
                NETWORK, [
                    "dnsZones" => zone_name: "DNS Zone Name",
                    $record_type => name: $name_label,
                ]
            );

            impl RecordSetId for $name {
                fn from_parts(
                    subscription_id: &str,
                    resource_group_name: &str,
                    zone_name: &str,
                    name: &str,
                ) -> Self {
                    Self::new(subscription_id, resource_group_name, zone_name, name)
                }

                fn zone_id(&self) -> DnsZoneId {
                    DnsZoneId::new(&self.subscription_id, &self.resource_group_name, &self.zone_name)
                }

                fn record_name(&self) -> &str {
                    &self.name
                }
            }
        )+
    };
}

record_set_id! {
    ARecordId => "A Record", "A", "A Record Name";
    AaaaRecordId => "AAAA Record", "AAAA", "AAAA Record Name";
    CnameRecordId => "CNAME Record", "CNAME", "CNAME Record Name";
    MxRecordId => "MX Record", "MX", "MX Record Name";
    NsRecordId => "NS Record", "NS", "NS Record Name";
    PtrRecordId => "PTR Record", "PTR", "PTR Record Name";
    SrvRecordId => "SRV Record", "SRV", "SRV Record Name";
    TxtRecordId => "TXT Record", "TXT", "TXT Record Name";
    CaaRecordId => "CAA Record", "CAA", "CAA Record Name";
}
