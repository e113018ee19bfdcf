//! Command dispatch: runs one parsed command against the service container

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use clap::CommandFactory;
use clap_complete::generate;
use itertools::Itertools;
use tracing::{debug, instrument};

use crate::application::services::{FamilyData, FamilyService};
use crate::cli::args::{Cli, Commands, ConfigCommands, SnapshotArg};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::{Lineage, ViewMode};
use crate::exitcode;
use crate::infrastructure::{InfraError, InfraResult, ServiceContainer};

/// Run a command and return the process exit code.
pub fn execute_command(cli: &Cli, container: &ServiceContainer) -> CliResult<i32> {
    let Some(command) = &cli.command else {
        return Err(CliError::Usage(
            "no command given, see `pyebwa --help`".to_string(),
        ));
    };

    match command {
        Commands::Tree {
            snapshot,
            view,
            focus,
            user,
            json,
        } => _tree(
            container,
            snapshot,
            view.as_deref(),
            focus.as_deref(),
            user.as_deref(),
            *json,
        ),
        Commands::Ancestors { snapshot, id } => _lineage(container, snapshot, ViewMode::Ancestors, id),
        Commands::Descendants { snapshot, id } => {
            _lineage(container, snapshot, ViewMode::Descendants, id)
        }
        Commands::Hourglass { snapshot, id } => _lineage(container, snapshot, ViewMode::Hourglass, id),
        Commands::Focus { snapshot, user } => _focus(container, snapshot, user.as_deref()),
        Commands::Path { snapshot, from, to } => _path(container, snapshot, from, to),
        Commands::Relation {
            snapshot,
            from,
            to,
            all,
        } => _relation(container, snapshot, from, to.as_deref(), *all),
        Commands::Common { snapshot, a, b } => _common(container, snapshot, a, b),
        Commands::Stats {
            snapshot,
            csv,
            output,
        } => _stats(container, snapshot, *csv, output.as_deref()),
        Commands::Validate { snapshot } => _validate(container, snapshot),
        Commands::Config { command } => _config(container, command),
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(exitcode::OK)
        }
    }
}

/// Service honouring a `--user` override.
fn service_for(container: &ServiceContainer, user: Option<&str>) -> FamilyService {
    let mut settings: Settings = (*container.settings).clone();
    if let Some(user) = user {
        settings.current_user = Some(user.to_string());
    }
    FamilyService::new(container.fs.clone(), Arc::new(settings))
}

fn load(service: &FamilyService, snapshot: &SnapshotArg) -> CliResult<FamilyData> {
    let source = service.resolve_source(snapshot.file.as_deref())?;
    Ok(service.load(&source)?)
}

#[instrument(skip(container))]
fn _tree(
    container: &ServiceContainer,
    snapshot: &SnapshotArg,
    view: Option<&str>,
    focus: Option<&str>,
    user: Option<&str>,
    json: bool,
) -> CliResult<i32> {
    let service = service_for(container, user);
    let mode = match view {
        Some(view) => view.parse::<ViewMode>()?,
        None => service.settings().view_mode()?,
    };
    let family = load(&service, snapshot)?;
    let forest = service.build_view_forest(&family, mode, focus);

    if json {
        let rendered = serde_json::to_string_pretty(&forest.to_view()).map_err(InfraError::from)?;
        output::info(&rendered);
    } else {
        write_stdout(&forest.to_tree_string())?;
    }
    Ok(exitcode::OK)
}

#[instrument(skip(container))]
fn _lineage(
    container: &ServiceContainer,
    snapshot: &SnapshotArg,
    mode: ViewMode,
    id: &str,
) -> CliResult<i32> {
    let service = &container.family;
    let family = load(service, snapshot)?;
    let graph = family.graph();
    let lineage: Lineage<'_> = match mode {
        ViewMode::Ancestors => graph.ancestors(id)?,
        ViewMode::Descendants => graph.descendants(id)?,
        _ => graph.hourglass(id)?,
    };

    output::header(&format!("{mode} of {id}"));
    for member in lineage.lineal() {
        output::member(member);
    }
    if !lineage.partners().is_empty() {
        output::header("partners");
        for member in lineage.partners() {
            output::member(member);
        }
    }
    Ok(exitcode::OK)
}

#[instrument(skip(container))]
fn _focus(container: &ServiceContainer, snapshot: &SnapshotArg, user: Option<&str>) -> CliResult<i32> {
    let service = service_for(container, user);
    let family = load(&service, snapshot)?;
    match service.focus_person(&family) {
        Some(member) => output::action("focus", member),
        None => output::warning("snapshot has no members"),
    }
    Ok(exitcode::OK)
}

#[instrument(skip(container))]
fn _path(container: &ServiceContainer, snapshot: &SnapshotArg, from: &str, to: &str) -> CliResult<i32> {
    let family = load(&container.family, snapshot)?;
    match family.graph().find_relationship_path(from, to)? {
        Some(steps) => {
            output::header(&format!("{} steps", steps.len()));
            output::info(&steps.iter().join("\n"));
        }
        None => output::warning(&format!("no relationship path from {from} to {to}")),
    }
    Ok(exitcode::OK)
}

#[instrument(skip(container))]
fn _relation(
    container: &ServiceContainer,
    snapshot: &SnapshotArg,
    from: &str,
    to: Option<&str>,
    all: bool,
) -> CliResult<i32> {
    let family = load(&container.family, snapshot)?;
    let graph = family.graph();

    if all {
        for (id, label) in graph.relationships_from(from)? {
            match label {
                Some(label) => output::action(id.as_str(), &label),
                None => output::detail(&format!("{id}: no relation found")),
            }
        }
        return Ok(exitcode::OK);
    }

    let to = to.ok_or_else(|| CliError::InvalidArgs("--to or --all is required".to_string()))?;
    match graph.calculate_relationship(from, to)? {
        Some(label) => output::action(&format!("{to} is {from}'s"), &label),
        None => output::warning(&format!("no relation found between {from} and {to}")),
    }
    Ok(exitcode::OK)
}

#[instrument(skip(container))]
fn _common(container: &ServiceContainer, snapshot: &SnapshotArg, a: &str, b: &str) -> CliResult<i32> {
    let family = load(&container.family, snapshot)?;
    let common = family.graph().find_common_ancestors(a, b)?;
    if common.is_empty() {
        output::warning(&format!("{a} and {b} share no ancestors"));
    }
    for member in common {
        output::member(member);
    }
    Ok(exitcode::OK)
}

#[instrument(skip(container))]
fn _stats(
    container: &ServiceContainer,
    snapshot: &SnapshotArg,
    csv: bool,
    output_path: Option<&Path>,
) -> CliResult<i32> {
    let service = &container.family;
    let family = load(service, snapshot)?;
    let stats = service.statistics(&family, Local::now().date_naive());

    if let Some(path) = output_path {
        service.export(path, &stats.to_csv())?;
        output::success(&format!("statistics written to {}", path.display()));
        return Ok(exitcode::OK);
    }
    if csv {
        write_stdout(&stats.to_csv())?;
        return Ok(exitcode::OK);
    }

    output::header(&format!("Family statistics ({})", family.source.display()));
    output::action("members", &stats.total);
    output::action("living / deceased", &format!("{} / {}", stats.living, stats.deceased));
    output::action("male / female", &format!("{} / {}", stats.male, stats.female));
    output::action("generations", &stats.generations);
    output::action("average lifespan", &stats.average_lifespan);
    for (label, count) in stats.age_groups.rows() {
        output::detail(&format!("{label:>6}: {count}"));
    }
    Ok(exitcode::OK)
}

#[instrument(skip(container))]
fn _validate(container: &ServiceContainer, snapshot: &SnapshotArg) -> CliResult<i32> {
    let service = &container.family;
    let family = load(service, snapshot)?;
    let forest = service.build_forest(&family);

    let problems: Vec<_> = family
        .diagnostics
        .iter()
        .chain(forest.diagnostics())
        .collect();
    debug!(problems = problems.len(), "validation finished");

    if problems.is_empty() {
        output::success(&format!(
            "{} members, {} placed, no problems",
            family.index.len(),
            forest.placed_member_ids().len()
        ));
        return Ok(exitcode::OK);
    }

    output::failure(&format!(
        "{} members, {} placed, {} problems",
        family.index.len(),
        forest.placed_member_ids().len(),
        problems.len()
    ));
    for diagnostic in problems {
        output::diagnostic(diagnostic);
    }
    Ok(exitcode::PROBLEMS)
}

/// Raw data output; a closed pipe is reported instead of panicking.
fn write_stdout(content: &str) -> InfraResult<()> {
    let mut stdout = io::stdout().lock();
    stdout
        .write_all(content.as_bytes())
        .and_then(|()| stdout.flush())
        .map_err(|e| InfraError::io("write to stdout", e))
}

fn _config(container: &ServiceContainer, command: &ConfigCommands) -> CliResult<i32> {
    match command {
        ConfigCommands::Show => output::info(&container.settings.to_toml()?),
        ConfigCommands::Template => output::info(&Settings::template()),
        ConfigCommands::Path => {
            let global = global_config_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(no config directory)".to_string());
            let local = std::env::current_dir()
                .map(|dir| local_config_path(&dir))
                .unwrap_or_else(|_| PathBuf::from(".pyebwa.toml"));
            output::action("global", &global);
            output::action("local", &local.display());
        }
    }
    Ok(exitcode::OK)
}
