use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;
use log::{LevelFilter, debug, info};

use azrm_core::config::ProviderConfig;
use azrm_core::id::ParsedResourceId;
use azrm_core::provider::Provider;
use azrm_core::schema::{AttributeSchema, Presence, ResourceSchema};
use azrm_provider_azure::AzureProvider;

mod document;
mod plan;

#[derive(Parser)]
#[command(name = "azrm")]
#[command(about = "Azure Automation and DNS resources, planned from JSON configuration", long_about = None)]
struct Cli {
    /// Provider configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List resource types, or show the schema of one
    Schema {
        /// Resource or data source type (e.g., azurerm_dns_a_record)
        resource_type: Option<String>,
    },
    /// Validate a configuration file without calling Azure
    Validate {
        /// Path to configuration file
        #[arg(default_value = "main.json")]
        file: PathBuf,
    },
    /// Parse an Azure resource ID
    ParseId {
        id: String,

        /// Parse strictly as the ID of this resource type
        #[arg(long = "type")]
        resource_type: Option<String>,
    },
    /// Show execution plan against a state file
    Plan {
        /// Path to configuration file
        #[arg(default_value = "main.json")]
        file: PathBuf,

        /// Path to state file
        #[arg(long, default_value = "azrm.state.json")]
        state: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = load_provider_config(cli.config.as_deref()).and_then(|config| {
        let provider = AzureProvider::offline(config);
        match cli.command {
            Commands::Schema { resource_type } => run_schema(&provider, resource_type.as_deref()),
            Commands::Validate { file } => run_validate(&provider, &file),
            Commands::ParseId { id, resource_type } => {
                run_parse_id(&provider, &id, resource_type.as_deref())
            }
            Commands::Plan { file, state } => run_plan(&provider, &file, &state),
        }
    });

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn load_provider_config(path: Option<&Path>) -> Result<ProviderConfig, String> {
    let config = match path {
        Some(path) => {
            info!("loading provider configuration from {}", path.display());
            ProviderConfig::from_file(path).map_err(|e| e.to_string())?
        }
        None => ProviderConfig::default(),
    };
    let config = config.with_env();
    debug!("provider configuration: {:?}", config);
    Ok(config)
}

fn run_schema(provider: &AzureProvider, resource_type: Option<&str>) -> Result<(), String> {
    let Some(resource_type) = resource_type else {
        println!("{}", "Resources:".cyan().bold());
        for resource in provider.resources() {
            println!("  • {}", resource.type_name());
        }
        println!("{}", "Data sources:".cyan().bold());
        for data_source in provider.data_sources() {
            println!("  • {}", data_source.type_name());
        }
        return Ok(());
    };

    let mut found = false;
    if let Some(resource) = provider.resource(resource_type) {
        print_schema("resource", &resource.schema());
        found = true;
    }
    if let Some(data_source) = provider.data_source(resource_type) {
        print_schema("data source", &data_source.schema());
        found = true;
    }
    if found {
        Ok(())
    } else {
        Err(format!("Unknown resource type: {}", resource_type))
    }
}

fn print_schema(kind: &str, schema: &ResourceSchema) {
    println!("{} ({})", schema.resource_type.bold(), kind);
    if let Some(description) = &schema.description {
        println!("  {}", description.dimmed());
    }
    for attr in schema.attributes.values() {
        println!("  {}", describe_attribute(attr));
    }
    println!();
}

/// One line per attribute, e.g. `ttl: Int [required]`
fn describe_attribute(attr: &AttributeSchema) -> String {
    let mut flags = vec![match attr.presence {
        Presence::Required => "required",
        Presence::Optional => "optional",
        Presence::Computed => "computed",
        Presence::OptionalComputed => "optional, computed",
    }
    .to_string()];
    if attr.force_new {
        flags.push("forces replacement".to_string());
    }
    if attr.sensitive {
        flags.push("sensitive".to_string());
    }
    if let Some(default) = &attr.default {
        flags.push(format!("default {}", default.to_json()));
    }
    if !attr.exactly_one_of.is_empty() {
        flags.push(format!("exactly one of {}", attr.exactly_one_of.join(", ")));
    }
    if !attr.conflicts_with.is_empty() {
        flags.push(format!("conflicts with {}", attr.conflicts_with.join(", ")));
    }
    format!("{}: {} [{}]", attr.name, attr.attr_type.type_name(), flags.join("; "))
}

fn run_validate(provider: &AzureProvider, file: &Path) -> Result<(), String> {
    let config = document::load_config(file)?;

    println!("{}", "Validating...".cyan());

    let mut errors = Vec::new();
    for block in &config.resources {
        match provider.resource(&block.resource_type) {
            Some(resource) => {
                if let Err(e) = resource.validate(&block.attributes()) {
                    errors.push(format!("{}: {}", block.address(), e));
                }
            }
            None => errors.push(format!("{}: unknown resource type", block.address())),
        }
    }
    for block in &config.data {
        match provider.data_source(&block.resource_type) {
            Some(data_source) => {
                if let Err(e) = data_source.validate(&block.attributes()) {
                    errors.push(format!("data.{}: {}", block.address(), e));
                }
            }
            None => errors.push(format!("data.{}: unknown data source", block.address())),
        }
    }
    if !errors.is_empty() {
        return Err(errors.join("\n"));
    }

    let total = config.resources.len() + config.data.len();
    println!(
        "{}",
        format!("✓ {} blocks validated successfully.", total)
            .green()
            .bold()
    );
    for block in &config.resources {
        println!("  • {}", block.address());
    }
    for block in &config.data {
        println!("  • data.{}", block.address());
    }
    Ok(())
}

fn run_parse_id(
    provider: &AzureProvider,
    id: &str,
    resource_type: Option<&str>,
) -> Result<(), String> {
    if let Some(resource_type) = resource_type {
        let resource = provider
            .resource(resource_type)
            .ok_or_else(|| format!("Unknown resource type: {}", resource_type))?;
        let described = resource.describe_id(id).map_err(|e| e.to_string())?;
        println!("{} {}", "✓".green(), described);
        return Ok(());
    }

    let parsed = ParsedResourceId::parse(id).map_err(|e| e.to_string())?;
    println!("{}: {}", "Subscription".bold(), parsed.subscription_id);
    if let Some(rg) = &parsed.resource_group {
        println!("{}: {}", "Resource Group".bold(), rg);
    }
    if let Some(namespace) = &parsed.provider {
        println!("{}: {}", "Provider".bold(), namespace);
    }
    for (key, value) in &parsed.path {
        println!("{}: {}", key.bold(), value);
    }

    let matches = matching_types(provider, id);
    if !matches.is_empty() {
        println!("{}: {}", "Matches".bold(), matches.join(", ").green());
    }
    Ok(())
}

/// Resource types whose ID format accepts `id`
fn matching_types(provider: &AzureProvider, id: &str) -> Vec<&'static str> {
    provider
        .resources()
        .into_iter()
        .filter(|r| r.describe_id(id).is_ok())
        .map(|r| r.type_name())
        .collect()
}

fn run_plan(provider: &AzureProvider, file: &Path, state: &Path) -> Result<(), String> {
    let config = document::load_config(file)?;
    let state = document::load_state(state)?;
    let plan = plan::create_plan(provider, &config, &state)?;
    plan::print_plan(&plan);
    Ok(())
}

#[cfg(test)]
mod tests {
    use azrm_core::schema::AttributeType;

    use super::*;

    fn provider() -> AzureProvider {
        AzureProvider::offline(ProviderConfig::new("sub1"))
    }

    #[test]
    fn describes_attribute_flags() {
        let attr = AttributeSchema::new("name", AttributeType::String)
            .required()
            .force_new();
        assert_eq!(
            describe_attribute(&attr),
            "name: String [required; forces replacement]"
        );

        let attr = AttributeSchema::new("name", AttributeType::String).with_default("@");
        assert_eq!(describe_attribute(&attr), r#"name: String [optional; default "@"]"#);
    }

    #[test]
    fn record_ids_match_their_type_only() {
        let id = "/subscriptions/sub1/resourceGroups/rg1/providers/Microsoft.Network/dnsZones/contoso.com/CNAME/www";
        assert_eq!(matching_types(&provider(), id), vec!["azurerm_dns_cname_record"]);
    }

    #[test]
    fn variable_ids_match_every_variable_kind() {
        let id = "/subscriptions/sub1/resourceGroups/rg1/providers/Microsoft.Automation/automationAccounts/acctest01/variables/var1";
        let matches = matching_types(&provider(), id);
        assert_eq!(matches.len(), 5);
        assert!(matches.iter().all(|t| t.starts_with("azurerm_automation_variable_")));
    }

    #[test]
    fn parse_id_with_wrong_type_fails() {
        let id = "/subscriptions/sub1/resourceGroups/rg1/providers/Microsoft.Network/dnsZones/contoso.com";
        assert!(run_parse_id(&provider(), id, Some("azurerm_dns_zone")).is_ok());
        assert!(run_parse_id(&provider(), id, Some("azurerm_dns_a_record")).is_err());
        assert!(run_parse_id(&provider(), id, Some("azurerm_nope")).is_err());
    }

    #[test]
    fn schema_of_unknown_type_fails() {
        assert!(run_schema(&provider(), Some("azurerm_dns_a_record")).is_ok());
        assert!(run_schema(&provider(), Some("azurerm_dns_zone")).is_ok());
        assert!(run_schema(&provider(), Some("azurerm_nope")).is_err());
    }
}
