//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use super::RootArgs;
use confgraph::{AppError, Document, Settings, builtins};
use confgraph_core::{
    DefinitionValidator, ModuleName, Pipeline, ResourceFormat, RootModule, Stage, decode_resource,
    discover_definitions, primitives::MAX_RESOURCE_SIZE,
};
use serde_json::{Map, Value, json};
use std::path::{Path, PathBuf};

// =============================================================================
// SHARED HELPERS
// =============================================================================

/// Load settings and apply command-line overrides.
pub fn load_settings(
    config: Option<&Path>,
    search_path: Vec<PathBuf>,
    resource: Option<String>,
) -> Result<Settings, AppError> {
    let mut settings = Settings::resolve(config)?;
    if !search_path.is_empty() {
        settings.search_path = search_path;
    }
    if let Some(resource) = resource {
        settings.resource = resource;
    }
    Ok(settings)
}

/// Turn the root arguments into a root module.
pub fn resolve_root(args: &RootArgs) -> Result<RootModule, AppError> {
    if let Some(path) = &args.inline {
        return read_inline_root(path);
    }

    let raw = args.root.as_deref().unwrap_or_default();
    ModuleName::parse(raw)
        .map(RootModule::Name)
        .map_err(|source| AppError::InvalidName {
            name: raw.to_string(),
            source,
        })
}

/// Read a file holding exactly one module definition.
fn read_inline_root(path: &Path) -> Result<RootModule, AppError> {
    let io_error = |source| AppError::Io {
        path: path.to_path_buf(),
        source,
    };
    let size = std::fs::metadata(path).map_err(io_error)?.len();
    if size > MAX_RESOURCE_SIZE {
        return Err(AppError::InlineRoot {
            path: path.to_path_buf(),
            reason: format!("size {size} bytes exceeds maximum of {MAX_RESOURCE_SIZE} bytes"),
        });
    }
    let bytes = std::fs::read(path).map_err(io_error)?;

    let format = ResourceFormat::from_path(path).unwrap_or(ResourceFormat::Json);
    let records = decode_resource(&path.display().to_string(), &bytes, format)?;
    let [record] = records.as_slice() else {
        return Err(AppError::InlineRoot {
            path: path.to_path_buf(),
            reason: format!("expected one module definition, found {}", records.len()),
        });
    };

    Ok(RootModule::Inline(DefinitionValidator::validate(record)?))
}

// =============================================================================
// LIST COMMAND
// =============================================================================

/// List every discovered module.
pub fn cmd_list(settings: &Settings, json_mode: bool) -> Result<(), AppError> {
    let definitions = discover_definitions(&settings.discovery())?;

    if json_mode {
        println!("{}", serde_json::to_string(definitions.definitions())?);
        return Ok(());
    }

    if definitions.is_empty() {
        println!("No modules found on the search path.");
        return Ok(());
    }

    for name in definitions.names() {
        let Some(definition) = definitions.get(name) else {
            continue;
        };
        if definition.dependencies.is_empty() {
            println!("{name}");
        } else {
            let deps: Vec<&str> = definition
                .dependencies
                .iter()
                .map(ModuleName::as_str)
                .collect();
            println!("{name} -> {}", deps.join(", "));
        }
    }
    Ok(())
}

// =============================================================================
// PLAN COMMAND
// =============================================================================

/// Show the resolved order and per-phase steps without running them.
pub fn cmd_plan(settings: &Settings, root: &RootArgs, json_mode: bool) -> Result<(), AppError> {
    let root = resolve_root(root)?;
    let discovery = settings.discovery();
    let registry = builtins::registry()?;
    let collaborator = builtins::collaborator(&settings.base_dir)?;

    let plan = Pipeline::new(&discovery, &registry, &collaborator).plan(root)?;
    let callback_stages: Vec<Stage> = Stage::ALL
        .into_iter()
        .filter(Stage::runs_callbacks)
        .collect();

    if json_mode {
        let mut steps = Map::new();
        for stage in &callback_stages {
            let rendered: Vec<Value> = plan
                .steps(*stage)
                .iter()
                .map(|step| Value::String(step.to_string()))
                .collect();
            steps.insert(stage.name().to_string(), Value::Array(rendered));
        }
        let order: Vec<&str> = plan
            .init_order()
            .iter()
            .map(|definition| definition.name.as_str())
            .collect();
        let output = json!({
            "root": plan.root(),
            "order": order,
            "steps": steps,
        });
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    println!("Plan for `{}` ({} modules)", plan.root(), plan.len());
    for (position, definition) in plan.init_order().iter().enumerate() {
        println!("  {:>3}. {}", position + 1, definition.name);
    }
    for stage in callback_stages {
        let steps = plan.steps(stage);
        println!();
        println!("{}:", stage.name());
        if steps.is_empty() {
            println!("  (none)");
        }
        for step in steps {
            println!("  {step}");
        }
    }
    Ok(())
}

// =============================================================================
// BUILD COMMAND
// =============================================================================

/// How `cmd_build` runs and reports.
#[derive(Debug)]
pub struct BuildOptions {
    pub strict: bool,
    pub output: Option<PathBuf>,
    pub json_mode: bool,
    pub quiet: bool,
}

/// Build the document for a root and emit its data.
pub fn cmd_build(
    settings: &Settings,
    root: &RootArgs,
    options: BuildOptions,
) -> Result<(), AppError> {
    let root = resolve_root(root)?;
    let root_name = root.name().clone();
    let discovery = settings.discovery();
    let registry = builtins::registry()?;
    let collaborator = builtins::collaborator(&settings.base_dir)?;

    let validated = Pipeline::new(&discovery, &registry, &collaborator).build_config(
        root,
        Document::new(),
        options.strict,
    )?;

    let text = if options.json_mode {
        serde_json::to_string(&json!({
            "root": root_name,
            "data": validated.config.data,
            "diagnostics": validated.diagnostics,
        }))?
    } else {
        for diagnostic in &validated.diagnostics {
            eprintln!("warning: {diagnostic}");
        }
        serde_json::to_string_pretty(&validated.config.data)?
    };

    match options.output {
        Some(path) => {
            std::fs::write(&path, format!("{text}\n")).map_err(|source| AppError::Io {
                path: path.clone(),
                source,
            })?;
            if !options.quiet {
                eprintln!("Wrote configuration for `{root_name}` to {}", path.display());
            }
        }
        None => println!("{text}"),
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
