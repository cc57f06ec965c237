//! Azure Resource Manager provider
//!
//! Registers every resource and data source handler against one shared
//! [`Clients`] bundle, applying configured timeout overrides on top of each
//! handler's own defaults.

use std::sync::Arc;

use azrm_core::config::ProviderConfig;
use azrm_core::handler::{DataSource, DataSourceHandler, Managed, ResourceHandler};
use azrm_core::provider::{ManagedResource, Provider, ReadOnlyResource};
use log::debug;

use crate::automation::{
    AutomationAccountDataSource, AutomationAccountResource, ConnectionResource,
    CredentialResource, JobScheduleResource, ModuleResource, RunbookResource, ScheduleResource,
    VariableDataSource, VariableKind, VariableResource,
};
use crate::client::{ArmClient, Clients};
use crate::dns::{
    AaaaRecord, ARecord, CaaRecord, CnameRecord, DnsZoneDataSource, DnsZoneResource, MxRecord,
    NsRecord, PtrRecord, RecordSetResource, SrvRecord, TxtRecord,
};
use crate::memory::MemoryArm;

/// Azure provider for Automation and DNS
pub struct AzureProvider {
    config: ProviderConfig,
    resources: Vec<Box<dyn ManagedResource>>,
    data_sources: Vec<Box<dyn ReadOnlyResource>>,
}

impl AzureProvider {
    pub fn new(arm: Arc<dyn ArmClient>, config: ProviderConfig) -> Self {
        let clients = Clients::new(arm, config.clone());
        let mut resources: Vec<Box<dyn ManagedResource>> = vec![
            managed(AutomationAccountResource::new(clients.clone()), &clients),
            managed(RunbookResource::new(clients.clone()), &clients),
            managed(ScheduleResource::new(clients.clone()), &clients),
            managed(JobScheduleResource::new(clients.clone()), &clients),
            managed(ModuleResource::new(clients.clone()), &clients),
            managed(ConnectionResource::new(clients.clone()), &clients),
            managed(CredentialResource::new(clients.clone()), &clients),
        ];
        for kind in VariableKind::ALL {
            resources.push(managed(VariableResource::new(clients.clone(), kind), &clients));
        }
        resources.extend([
            managed(DnsZoneResource::new(clients.clone()), &clients),
            managed(RecordSetResource::<ARecord>::new(clients.clone()), &clients),
            managed(RecordSetResource::<AaaaRecord>::new(clients.clone()), &clients),
            managed(RecordSetResource::<CaaRecord>::new(clients.clone()), &clients),
            managed(RecordSetResource::<CnameRecord>::new(clients.clone()), &clients),
            managed(RecordSetResource::<MxRecord>::new(clients.clone()), &clients),
            managed(RecordSetResource::<NsRecord>::new(clients.clone()), &clients),
            managed(RecordSetResource::<PtrRecord>::new(clients.clone()), &clients),
            managed(RecordSetResource::<SrvRecord>::new(clients.clone()), &clients),
            managed(RecordSetResource::<TxtRecord>::new(clients.clone()), &clients),
        ]);

        let mut data_sources: Vec<Box<dyn ReadOnlyResource>> =
            vec![data_source(AutomationAccountDataSource::new(clients.clone()))];
        for kind in VariableKind::ALL {
            data_sources.push(data_source(VariableDataSource::new(clients.clone(), kind)));
        }
        data_sources.push(data_source(DnsZoneDataSource::new(clients)));

        debug!(
            "registered {} resources and {} data sources for subscription {}",
            resources.len(),
            data_sources.len(),
            config.subscription_id
        );

        Self {
            config,
            resources,
            data_sources,
        }
    }

    /// A provider backed by an in-memory store. Used for offline planning.
    pub fn offline(config: ProviderConfig) -> Self {
        Self::new(Arc::new(MemoryArm::new()), config)
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }
}

fn managed<H: ResourceHandler>(handler: H, clients: &Clients) -> Box<dyn ManagedResource> {
    let timeouts = clients.timeouts(handler.timeouts());
    Box::new(Managed::new(handler).with_timeouts(timeouts))
}

fn data_source<H: DataSourceHandler>(handler: H) -> Box<dyn ReadOnlyResource> {
    Box::new(DataSource::new(handler))
}

impl Provider for AzureProvider {
    fn name(&self) -> &'static str {
        "azurerm"
    }

    fn resources(&self) -> Vec<&dyn ManagedResource> {
        self.resources.iter().map(|r| r.as_ref()).collect()
    }

    fn data_sources(&self) -> Vec<&dyn ReadOnlyResource> {
        self.data_sources.iter().map(|d| d.as_ref()).collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::time::Duration;

    use azrm_core::provider::ErrorKind;
    use azrm_core::resource::{Attributes, Value};

    use super::*;

    fn provider() -> (Arc<MemoryArm>, AzureProvider) {
        let arm = Arc::new(MemoryArm::new());
        let config = ProviderConfig::new("sub1").with_poll_interval(Duration::from_millis(1));
        (arm.clone(), AzureProvider::new(arm, config))
    }

    #[test]
    fn registers_every_resource_type_once() {
        let (_, provider) = provider();
        let names: Vec<&str> = provider.resources().iter().map(|r| r.type_name()).collect();
        let unique: HashSet<&str> = names.iter().copied().collect();
        assert_eq!(names.len(), unique.len());
        assert_eq!(names.len(), 22);

        for expected in [
            "azurerm_automation_account",
            "azurerm_automation_runbook",
            "azurerm_automation_schedule",
            "azurerm_automation_job_schedule",
            "azurerm_automation_module",
            "azurerm_automation_connection",
            "azurerm_automation_credential",
            "azurerm_automation_variable_bool",
            "azurerm_automation_variable_datetime",
            "azurerm_automation_variable_int",
            "azurerm_automation_variable_string",
            "azurerm_automation_variable_object",
            "azurerm_dns_zone",
            "azurerm_dns_a_record",
            "azurerm_dns_aaaa_record",
            "azurerm_dns_caa_record",
            "azurerm_dns_cname_record",
            "azurerm_dns_mx_record",
            "azurerm_dns_ns_record",
            "azurerm_dns_ptr_record",
            "azurerm_dns_srv_record",
            "azurerm_dns_txt_record",
        ] {
            assert!(provider.resource(expected).is_some(), "missing {}", expected);
        }
    }

    #[test]
    fn registers_data_sources() {
        let (_, provider) = provider();
        assert_eq!(provider.data_sources().len(), 7);
        assert!(provider.data_source("azurerm_automation_account").is_some());
        assert!(provider.data_source("azurerm_automation_variable_int").is_some());
        assert!(provider.data_source("azurerm_dns_zone").is_some());
        assert!(provider.data_source("azurerm_dns_a_record").is_none());
    }

    #[test]
    fn unknown_type_is_absent() {
        let (_, provider) = provider();
        assert!(provider.resource("azurerm_virtual_network").is_none());
    }

    #[tokio::test]
    async fn zone_and_record_through_the_registry() {
        let (arm, provider) = provider();

        let mut zone = Attributes::new();
        zone.insert("name".to_string(), Value::from("contoso.com"));
        zone.insert("resource_group_name".to_string(), Value::from("rg1"));
        let zones = provider.resource("azurerm_dns_zone").unwrap();
        let zone_state = zones.create(&zone).await.unwrap();

        let mut record = zone.clone();
        record.insert("zone_name".to_string(), Value::from("contoso.com"));
        record.insert("name".to_string(), Value::from("www"));
        record.insert("ttl".to_string(), Value::Int(300));
        record.insert(
            "records".to_string(),
            Value::List(vec![Value::from("10.0.0.1")]),
        );
        let records = provider.resource("azurerm_dns_a_record").unwrap();
        let record_state = records.create(&record).await.unwrap();
        let record_id = record_state.id.clone().unwrap();

        let zone_state = zones.read(zone_state.id.as_ref().unwrap()).await.unwrap();
        assert_eq!(zone_state.get("number_of_record_sets"), Some(&Value::Int(3)));

        records.delete(&record_id).await.unwrap();
        assert!(!arm.contains(&record_id));
        assert!(!records.read(&record_id).await.unwrap().exists);
    }

    #[tokio::test]
    async fn errors_name_the_resource_type() {
        let (_, provider) = provider();
        let accounts = provider.resource("azurerm_automation_account").unwrap();
        let err = accounts.create(&Attributes::new()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(err.to_string().contains("azurerm_automation_account"));
    }

    #[test]
    fn configured_timeouts_are_applied() {
        let arm = Arc::new(MemoryArm::new());
        let mut config = ProviderConfig::new("sub1");
        config.timeouts.read = Some(Duration::from_secs(42));
        let provider = AzureProvider::new(arm, config);
        assert_eq!(provider.config().timeouts.read, Some(Duration::from_secs(42)));

        let handler = ModuleResource::new(Clients::new(
            Arc::new(MemoryArm::new()),
            ProviderConfig::new("sub1"),
        ));
        let timeouts = handler.timeouts().merged(&provider.config().timeouts);
        assert_eq!(timeouts.read, Duration::from_secs(42));
        assert_eq!(timeouts.create, Duration::from_secs(60 * 60));
    }
}
