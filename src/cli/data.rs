//! todo export/import/reset command implementations.

use std::io::Read;
use std::path::PathBuf;

use serde::Serialize;
use tracing::debug;

use crate::cli::context::load_context;
use crate::cli::task::push_warnings;
use crate::error::{Error, Result};
use crate::lock;
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::persistence::Persistence;

pub struct ExportOptions {
    pub output: Option<PathBuf>,
    pub dir: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct ImportOptions {
    pub source: String,
    pub dir: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct ResetOptions {
    pub dir: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

#[derive(Serialize)]
struct ExportWrittenOutput {
    path: String,
    tasks: usize,
    bytes: usize,
}

#[derive(Serialize)]
struct ImportOutput {
    tasks: usize,
    is_admin: bool,
}

#[derive(Serialize)]
struct ResetOutput {
    removed_tasks: usize,
}

pub fn run_export(options: ExportOptions) -> Result<()> {
    let ctx = load_context(options.dir)?;
    let document = ctx.store.persistence().export_data();

    let Some(path) = options.output else {
        if options.json {
            let value: serde_json::Value = serde_json::from_str(&document)?;
            let mut human = HumanOutput::new("Export");
            push_warnings(&mut human, &ctx);
            return emit_success(
                OutputOptions {
                    json: true,
                    quiet: options.quiet,
                },
                "export",
                &value,
                Some(&human),
            );
        }
        // The document itself is the output; quiet does not apply.
        println!("{document}");
        return Ok(());
    };

    lock::write_atomic(&path, document.as_bytes())?;
    debug!(path = %path.display(), bytes = document.len(), "export written");

    let tasks = ctx.store.tasks().len();
    let mut human = HumanOutput::new("Export written");
    push_warnings(&mut human, &ctx);
    human.push_summary("Path", path.display().to_string());
    human.push_summary("Tasks", tasks.to_string());

    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "export",
        &ExportWrittenOutput {
            path: path.display().to_string(),
            tasks,
            bytes: document.len(),
        },
        Some(&human),
    )
}

pub fn run_import(options: ImportOptions) -> Result<()> {
    let mut ctx = load_context(options.dir)?;
    let document = read_source(&options.source)?;

    if !ctx.store.persistence().import_data(&document) {
        return Err(Error::InvalidArgument(format!(
            "{} is not a valid export document",
            source_label(&options.source)
        )));
    }
    ctx.store.reload();

    let state = ctx.store.snapshot();
    let mut human = HumanOutput::new("Import applied");
    push_warnings(&mut human, &ctx);
    human.push_summary("Source", source_label(&options.source));
    human.push_summary("Tasks", state.tasks.len().to_string());
    human.push_summary("Admin mode", if state.is_admin { "on" } else { "off" });
    human.push_next_step("todo list");

    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "import",
        &ImportOutput {
            tasks: state.tasks.len(),
            is_admin: state.is_admin,
        },
        Some(&human),
    )
}

pub fn run_reset(options: ResetOptions) -> Result<()> {
    let mut ctx = load_context(options.dir)?;
    let removed_tasks = ctx.store.tasks().len();
    ctx.store.persistence().clear_all();
    ctx.store.reload();

    let mut human = HumanOutput::new("Storage reset");
    push_warnings(&mut human, &ctx);
    human.push_summary("Removed tasks", removed_tasks.to_string());
    human.push_summary("Settings", "defaults");

    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "reset",
        &ResetOutput { removed_tasks },
        Some(&human),
    )
}

fn read_source(source: &str) -> Result<String> {
    if source == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        return Ok(buffer);
    }
    std::fs::read_to_string(source).map_err(|err| {
        if err.kind() == std::io::ErrorKind::NotFound {
            Error::InvalidArgument(format!("import file not found: {source}"))
        } else {
            Error::Io(err)
        }
    })
}

fn source_label(source: &str) -> String {
    if source == "-" {
        "stdin".to_string()
    } else {
        source.to_string()
    }
}
