//! Offline plan: compare configuration against a state file

use azrm_core::differ::Diff;
use azrm_core::provider::Provider;
use colored::Colorize;

use crate::document::{ConfigDocument, StateDocument};

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Create,
    Update { changed: Vec<String> },
    Replace { changed: Vec<String>, force_new: Vec<String> },
    Delete,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    pub address: String,
    pub id: Option<String>,
    pub action: Action,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PlanSummary {
    pub create: usize,
    pub update: usize,
    pub delete: usize,
}

#[derive(Debug, Default)]
pub struct Plan {
    changes: Vec<Change>,
}

impl Plan {
    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// A replacement counts as one destroy and one add
    pub fn summary(&self) -> PlanSummary {
        let mut summary = PlanSummary::default();
        for change in &self.changes {
            match change.action {
                Action::Create => summary.create += 1,
                Action::Update { .. } => summary.update += 1,
                Action::Replace { .. } => {
                    summary.create += 1;
                    summary.delete += 1;
                }
                Action::Delete => summary.delete += 1,
            }
        }
        summary
    }
}

pub fn create_plan(
    provider: &dyn Provider,
    config: &ConfigDocument,
    state: &StateDocument,
) -> Result<Plan, String> {
    let mut plan = Plan::default();
    let mut errors = Vec::new();

    for block in &config.resources {
        let Some(resource) = provider.resource(&block.resource_type) else {
            errors.push(format!("{}: unknown resource type", block.address()));
            continue;
        };

        let desired = block.attributes();
        let Some(entry) = state.find(&block.resource_type, &block.name) else {
            match resource.validate(&desired) {
                Ok(()) => plan.changes.push(Change {
                    address: block.address(),
                    id: None,
                    action: Action::Create,
                }),
                Err(e) => errors.push(format!("{}: {}", block.address(), e)),
            }
            continue;
        };

        let action = match resource.plan(&entry.attributes(), &desired) {
            Ok(Diff::NoChange) => continue,
            Ok(Diff::Update { changed_attributes }) => Action::Update {
                changed: changed_attributes,
            },
            Ok(Diff::Replace {
                changed_attributes,
                force_new_attributes,
            }) => Action::Replace {
                changed: changed_attributes,
                force_new: force_new_attributes,
            },
            Err(e) => {
                errors.push(format!("{}: {}", block.address(), e));
                continue;
            }
        };
        plan.changes.push(Change {
            address: block.address(),
            id: Some(entry.id.clone()),
            action,
        });
    }

    for entry in &state.resources {
        let configured = config
            .resources
            .iter()
            .any(|b| b.resource_type == entry.resource_type && b.name == entry.name);
        if !configured {
            plan.changes.push(Change {
                address: entry.address(),
                id: Some(entry.id.clone()),
                action: Action::Delete,
            });
        }
    }

    if errors.is_empty() {
        Ok(plan)
    } else {
        Err(errors.join("\n"))
    }
}

pub fn print_plan(plan: &Plan) {
    if plan.is_empty() {
        println!("{}", "No changes. Infrastructure is up-to-date.".green());
        return;
    }

    println!("{}", "Execution Plan:".cyan().bold());
    println!();

    for change in plan.changes() {
        let symbol = match change.action {
            Action::Create => "+".green().bold(),
            Action::Update { .. } => "~".yellow().bold(),
            Action::Replace { .. } => "-/+".red().bold(),
            Action::Delete => "-".red().bold(),
        };
        println!("{} {}", symbol, change.address.bold());
        if let Some(id) = &change.id {
            println!("    id: {}", id.dimmed());
        }

        match &change.action {
            Action::Update { changed } => {
                for attr in changed {
                    println!("    {} {}", "~".yellow(), attr);
                }
            }
            Action::Replace { changed, force_new } => {
                for attr in changed {
                    if force_new.contains(attr) {
                        println!("    {} {} {}", "~".yellow(), attr, "(forces replacement)".red());
                    } else {
                        println!("    {} {}", "~".yellow(), attr);
                    }
                }
            }
            Action::Create | Action::Delete => {}
        }
    }

    println!();
    let summary = plan.summary();
    println!(
        "Plan: {} to add, {} to change, {} to destroy.",
        summary.create.to_string().green(),
        summary.update.to_string().yellow(),
        summary.delete.to_string().red()
    );
}
