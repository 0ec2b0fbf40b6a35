//! Command execution.

use crate::{Commands, Format};
use colored::Colorize;
use std::path::Path;
use std::sync::Arc;
use trellis_core::{humanize, validate, Context, SchemaMap, StateId, Workflow};
use trellis_workflows::{progress, registry, states_by_phase};

/// Executes a command and returns the formatted output.
pub fn execute(cmd: Commands) -> Result<String, Box<dyn std::error::Error>> {
    match cmd {
        Commands::List => {
            let registry = registry();
            let mut output = String::new();
            for id in registry.identifiers() {
                let workflow = registry.get(&id).expect("listed identifier");
                let schema = workflow.schema();
                output.push_str(&format!(
                    "  {} {} ({} states, {} transitions)\n",
                    id.cyan(),
                    schema.name(),
                    schema.states().len(),
                    schema.transitions().len()
                ));
            }
            Ok(output)
        }

        Commands::Validate { workflow } => {
            let workflow = load_workflow(&workflow)?;
            let schema = workflow.schema();
            let report = validate(schema);

            if report.is_empty() {
                Ok(format!(
                    "{} {} ({} states, {} transitions, checksum {})",
                    "Valid".green(),
                    schema.identifier().cyan(),
                    schema.states().len(),
                    schema.transitions().len(),
                    schema.checksum()
                ))
            } else {
                let mut msg = format!(
                    "workflow '{}' has {} structural defect(s):\n",
                    schema.identifier(),
                    report.len()
                );
                for defect in &report {
                    msg.push_str(&format!("  - {defect}\n"));
                }
                Err(msg.into())
            }
        }

        Commands::Diagram { workflow } => {
            let workflow = load_workflow(&workflow)?;
            Ok(workflow.schema().to_diagram())
        }

        Commands::Export {
            workflow,
            format,
            output,
        } => {
            let workflow = load_workflow(&workflow)?;
            let map = workflow.schema().to_map();
            let serialized = match format {
                Format::Yaml => serde_yaml::to_string(&map)?,
                Format::Json => serde_json::to_string_pretty(&map)?,
            };

            match output {
                Some(path) => {
                    std::fs::write(&path, &serialized)?;
                    Ok(format!(
                        "{} {} to {}",
                        "Exported".green(),
                        workflow.schema().identifier().cyan(),
                        path.display()
                    ))
                }
                None => Ok(serialized),
            }
        }

        Commands::States { workflow } => {
            let workflow = load_workflow(&workflow)?;
            let schema = workflow.schema();
            let mut output = String::new();

            for (phase, states) in states_by_phase(schema) {
                output.push_str(&format!("{}\n", humanize(&phase).bold()));
                for state in states {
                    let id = state.id().clone();
                    let mut line = format!(
                        "  {} {} ({}%)",
                        id.as_str().cyan(),
                        state.label(),
                        progress(schema, &id)
                    );
                    if schema.initial() == &id {
                        line.push_str(&format!(" {}", "[initial]".green()));
                    }
                    if schema.is_final(&id) {
                        line.push_str(&format!(" {}", "[final]".yellow()));
                    }
                    output.push_str(&line);
                    output.push('\n');
                }
            }
            Ok(output)
        }

        Commands::Transitions {
            workflow,
            state,
            roles,
        } => {
            let workflow = load_workflow(&workflow)?;
            let ctx = context_from(roles, None)?;
            let state = StateId::from(state);

            let available = workflow.available_transitions(&state, &ctx)?;
            if available.is_empty() {
                return Ok(format!(
                    "No transitions available from {}",
                    state.as_str().yellow()
                ));
            }

            let mut output = String::new();
            for t in available {
                output.push_str(&format!(
                    "  {} {} → {}\n",
                    t.name.cyan(),
                    t.label,
                    t.target.as_str().yellow()
                ));
                if let Some(confirmation) = &t.confirmation {
                    output.push_str(&format!("      {}\n", confirmation.message.dimmed()));
                }
            }
            Ok(output)
        }

        Commands::Apply {
            workflow,
            state,
            transition,
            roles,
            data,
        } => {
            let workflow = load_workflow(&workflow)?;
            let ctx = context_from(roles, data)?;

            let result = workflow.apply(&StateId::from(state), &transition, &ctx)?;
            Ok(format!(
                "{} {}\n  {} → {}",
                "Applied".green(),
                result.transition.cyan(),
                result.from,
                result.to.as_str().yellow()
            ))
        }
    }
}

/// Resolves a built-in workflow identifier, or loads a definition file
/// (YAML by default, JSON for `.json` paths).
fn load_workflow(arg: &str) -> Result<Arc<Workflow>, Box<dyn std::error::Error>> {
    if let Some(workflow) = registry().get(arg) {
        return Ok(workflow);
    }

    let path = Path::new(arg);
    if !path.exists() {
        return Err(format!("no built-in workflow or definition file named '{arg}'").into());
    }

    let text = std::fs::read_to_string(path)?;
    let map: SchemaMap = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(&text)?,
        _ => serde_yaml::from_str(&text)?,
    };
    Ok(Arc::new(Workflow::new(map.into_schema()?)))
}

fn context_from(
    roles: Option<Vec<String>>,
    data: Option<String>,
) -> Result<Context, Box<dyn std::error::Error>> {
    let mut ctx = match roles {
        Some(roles) => Context::with_roles(roles),
        None => Context::new(),
    };
    if let Some(data) = data {
        ctx = ctx.with_data(parse_json_arg(&data)?);
    }
    Ok(ctx)
}

/// Parses a JSON argument, reading from a file when prefixed with `@`.
fn parse_json_arg(arg: &str) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    let text = match arg.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)?,
        None => arg.to_string(),
    };
    Ok(serde_json::from_str(&text)?)
}
