//! Command-line interface for todo
//!
//! This module defines the CLI structure using clap derive macros.
//! Each command group is implemented in its own submodule.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::error::Result;

mod admin;
mod context;
mod data;
mod task;

/// todo - a local task list
///
/// Tasks and settings live in a data directory as JSON records. Every
/// command opens the directory, applies one operation and exits.
#[derive(Parser, Debug)]
#[command(name = "todo")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Data directory (defaults to the platform data directory)
    #[arg(long, global = true, env = "TODO_DIR")]
    pub dir: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Add a task
    Add {
        /// Task title
        title: String,

        /// Longer description
        #[arg(short, long)]
        description: Option<String>,

        /// Priority: low, medium, high (defaults to tasks.default_priority)
        #[arg(short, long)]
        priority: Option<String>,

        /// Due date (RFC 3339 or YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,
    },

    /// Change fields of a task
    Edit {
        /// Task ID or unique prefix
        id: String,

        /// New title
        #[arg(long)]
        title: Option<String>,

        /// New description
        #[arg(short, long, conflicts_with = "clear_description")]
        description: Option<String>,

        /// Remove the description
        #[arg(long)]
        clear_description: bool,

        /// New priority
        #[arg(short, long)]
        priority: Option<String>,

        /// New due date (RFC 3339 or YYYY-MM-DD)
        #[arg(long, conflicts_with = "clear_due")]
        due: Option<String>,

        /// Remove the due date
        #[arg(long)]
        clear_due: bool,

        /// Set completion explicitly
        #[arg(long)]
        completed: Option<bool>,
    },

    /// Flip a task between active and completed
    Toggle {
        /// Task ID or unique prefix
        id: String,
    },

    /// Delete a task
    Rm {
        /// Task ID or unique prefix
        id: String,
    },

    /// List tasks
    List {
        /// all, active or completed (defaults to view.filter)
        #[arg(short, long)]
        filter: Option<String>,

        /// createdAt, dueDate or priority (defaults to view.sort_by)
        #[arg(short, long)]
        sort: Option<String>,
    },

    /// Show one task
    Show {
        /// Task ID or unique prefix
        id: String,
    },

    /// Task counts and completion rate
    Stats,

    /// Delete every task
    Clear,

    /// Admin mode flag
    Admin {
        #[arg(value_enum, default_value_t = AdminAction::Show)]
        action: AdminAction,
    },

    /// Write tasks and settings as one JSON document
    Export {
        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Replace tasks and/or settings from an export document
    Import {
        /// Input file, or `-` for stdin
        source: String,
    },

    /// Remove both stored records
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AdminAction {
    On,
    Off,
    Show,
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Add {
                title,
                description,
                priority,
                due,
            } => task::run_add(task::AddOptions {
                title,
                description,
                priority,
                due,
                dir: self.dir,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Edit {
                id,
                title,
                description,
                clear_description,
                priority,
                due,
                clear_due,
                completed,
            } => task::run_edit(task::EditOptions {
                id,
                title,
                description,
                clear_description,
                priority,
                due,
                clear_due,
                completed,
                dir: self.dir,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Toggle { id } => task::run_toggle(task::IdOptions {
                id,
                dir: self.dir,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Rm { id } => task::run_rm(task::IdOptions {
                id,
                dir: self.dir,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::List { filter, sort } => task::run_list(task::ListOptions {
                filter,
                sort,
                dir: self.dir,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Show { id } => task::run_show(task::IdOptions {
                id,
                dir: self.dir,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Stats => task::run_stats(task::StatsOptions {
                dir: self.dir,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Clear => task::run_clear(task::ClearOptions {
                dir: self.dir,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Admin { action } => admin::run(admin::AdminOptions {
                action,
                dir: self.dir,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Export { output } => data::run_export(data::ExportOptions {
                output,
                dir: self.dir,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Import { source } => data::run_import(data::ImportOptions {
                source,
                dir: self.dir,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Reset => data::run_reset(data::ResetOptions {
                dir: self.dir,
                json: self.json,
                quiet: self.quiet,
            }),
        }
    }
}
