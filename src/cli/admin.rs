//! todo admin command implementation.

use std::path::PathBuf;

use serde::Serialize;

use crate::cli::context::load_context;
use crate::cli::task::push_warnings;
use crate::cli::AdminAction;
use crate::error::Result;
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::persistence::StorageStatus;

pub struct AdminOptions {
    pub action: AdminAction,
    pub dir: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

#[derive(Serialize)]
struct AdminOutput {
    is_admin: bool,
    changed: bool,
    storage: StorageStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    data_dir: Option<String>,
}

pub fn run(options: AdminOptions) -> Result<()> {
    let mut ctx = load_context(options.dir)?;
    let before = ctx.store.state().is_admin;

    let command = match options.action {
        AdminAction::On => {
            ctx.store.set_admin_mode(true);
            "admin on"
        }
        AdminAction::Off => {
            ctx.store.set_admin_mode(false);
            "admin off"
        }
        AdminAction::Show => "admin show",
    };
    let is_admin = ctx.store.state().is_admin;
    let storage = ctx.storage_status();

    let header = if is_admin {
        "Admin mode: on"
    } else {
        "Admin mode: off"
    };
    let mut human = HumanOutput::new(header);
    push_warnings(&mut human, &ctx);
    if let Some(dir) = ctx.data_dir.as_ref() {
        human.push_summary("Data dir", dir.display().to_string());
    }
    if storage == StorageStatus::Unavailable {
        human.push_warning("admin mode lasts only for this command without durable storage");
    }
    if is_admin {
        human.push_next_step("todo admin off");
    }

    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        command,
        &AdminOutput {
            is_admin,
            changed: before != is_admin,
            storage,
            data_dir: ctx.data_dir.as_ref().map(|dir| dir.display().to_string()),
        },
        Some(&human),
    )
}
