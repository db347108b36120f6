//! todo task command implementations.

use std::path::PathBuf;

use chrono::{DateTime, Local, Utc};
use serde::Serialize;

use crate::cli::context::{load_context, parse_due, Context};
use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::task::{NewTask, Priority, Task, TaskPatch};
use crate::view::{self, Filter, SortKey, TaskStats};

/// Message shown in place of the list while admin mode is on
pub(crate) const ADMIN_VIEW_MESSAGE: &str = "Admin dashboard: admin features are not available yet";

pub struct AddOptions {
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub due: Option<String>,
    pub dir: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct EditOptions {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub clear_description: bool,
    pub priority: Option<String>,
    pub due: Option<String>,
    pub clear_due: bool,
    pub completed: Option<bool>,
    pub dir: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct IdOptions {
    pub id: String,
    pub dir: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct ListOptions {
    pub filter: Option<String>,
    pub sort: Option<String>,
    pub dir: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct StatsOptions {
    pub dir: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct ClearOptions {
    pub dir: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TaskOutput {
    #[serde(flatten)]
    task: Task,
    overdue: bool,
    due_today: bool,
}

impl TaskOutput {
    fn new(task: Task, now: DateTime<Utc>) -> Self {
        Self {
            overdue: view::is_overdue(&task, now),
            due_today: view::is_due_today(&task, now),
            task,
        }
    }
}

#[derive(Serialize)]
struct TaskListOutput {
    filter: Filter,
    sort_by: SortKey,
    /// Size of the whole collection
    total: usize,
    /// Tasks that passed the filter
    shown: usize,
    tasks: Vec<TaskOutput>,
}

#[derive(Serialize)]
struct AdminViewOutput {
    admin: bool,
    message: &'static str,
}

#[derive(Serialize)]
struct TaskRemovedOutput {
    id: String,
    title: String,
}

#[derive(Serialize)]
struct ClearOutput {
    removed: usize,
}

pub fn run_add(options: AddOptions) -> Result<()> {
    let mut ctx = load_context(options.dir)?;
    let priority = match options.priority.as_deref() {
        Some(value) => value.parse::<Priority>()?,
        None => ctx.config.tasks.default_priority,
    };
    let mut new = NewTask::new(options.title, priority);
    if let Some(description) = options.description {
        new = new.with_description(description);
    }
    if let Some(due) = options.due.as_deref() {
        new = new.with_due_date(parse_due(due)?);
    }

    let task = ctx.store.add_task(new)?;
    let now = ctx.store.now();

    let mut human = HumanOutput::new("Task added");
    push_warnings(&mut human, &ctx);
    push_task_summary(&mut human, &task, now);

    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "add",
        &TaskOutput::new(task, now),
        Some(&human),
    )
}

pub fn run_edit(options: EditOptions) -> Result<()> {
    let mut ctx = load_context(options.dir)?;
    let resolved = ctx.store.resolve_id(&options.id)?;

    let mut patch = TaskPatch {
        title: options.title,
        completed: options.completed,
        ..TaskPatch::default()
    };
    if let Some(value) = options.priority.as_deref() {
        patch.priority = Some(value.parse::<Priority>()?);
    }
    if options.clear_description {
        patch.description = Some(None);
    } else if let Some(description) = options.description {
        patch.description = Some(Some(description));
    }
    if options.clear_due {
        patch.due_date = Some(None);
    } else if let Some(due) = options.due.as_deref() {
        patch.due_date = Some(Some(parse_due(due)?));
    }
    if patch.is_empty() {
        return Err(Error::InvalidArgument(
            "nothing to change; pass at least one field".to_string(),
        ));
    }

    let task = ctx
        .store
        .update_task(&resolved, patch)?
        .ok_or_else(|| Error::TaskNotFound(resolved.clone()))?;
    let now = ctx.store.now();

    let mut human = HumanOutput::new("Task updated");
    push_warnings(&mut human, &ctx);
    push_task_summary(&mut human, &task, now);

    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "edit",
        &TaskOutput::new(task, now),
        Some(&human),
    )
}

pub fn run_toggle(options: IdOptions) -> Result<()> {
    let mut ctx = load_context(options.dir)?;
    let resolved = ctx.store.resolve_id(&options.id)?;
    let task = ctx
        .store
        .toggle_task(&resolved)
        .ok_or_else(|| Error::TaskNotFound(resolved.clone()))?;
    let now = ctx.store.now();

    let header = if task.completed {
        "Task completed"
    } else {
        "Task reopened"
    };
    let mut human = HumanOutput::new(header);
    push_warnings(&mut human, &ctx);
    push_task_summary(&mut human, &task, now);

    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "toggle",
        &TaskOutput::new(task, now),
        Some(&human),
    )
}

pub fn run_rm(options: IdOptions) -> Result<()> {
    let mut ctx = load_context(options.dir)?;
    let resolved = ctx.store.resolve_id(&options.id)?;
    let removed = ctx
        .store
        .delete_task(&resolved)
        .ok_or_else(|| Error::TaskNotFound(resolved.clone()))?;

    let mut human = HumanOutput::new("Task deleted");
    push_warnings(&mut human, &ctx);
    human.push_summary("ID", removed.id.clone());
    human.push_summary("Title", removed.title.clone());

    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "rm",
        &TaskRemovedOutput {
            id: removed.id,
            title: removed.title,
        },
        Some(&human),
    )
}

pub fn run_list(options: ListOptions) -> Result<()> {
    let mut ctx = load_context(options.dir)?;
    if let Some(value) = options.filter.as_deref() {
        ctx.store.set_filter(value.parse()?);
    }
    if let Some(value) = options.sort.as_deref() {
        ctx.store.set_sort_by(value.parse()?);
    }
    let output_options = OutputOptions {
        json: options.json,
        quiet: options.quiet,
    };

    if ctx.store.state().is_admin {
        let mut human = HumanOutput::new(ADMIN_VIEW_MESSAGE);
        push_warnings(&mut human, &ctx);
        human.push_next_step("todo admin off");
        return emit_success(
            output_options,
            "list",
            &AdminViewOutput {
                admin: true,
                message: ADMIN_VIEW_MESSAGE,
            },
            Some(&human),
        );
    }

    let now = ctx.store.now();
    let state = ctx.store.snapshot();
    let tasks = ctx.store.visible_tasks();

    let mut human = HumanOutput::new("Tasks");
    push_warnings(&mut human, &ctx);
    human.push_summary("Filter", state.filter.to_string());
    human.push_summary("Sort", state.sort_by.to_string());
    human.push_summary("Shown", format!("{} of {}", tasks.len(), state.tasks.len()));
    for task in &tasks {
        human.push_detail(format_task_line(task, now));
    }
    if state.tasks.is_empty() {
        human.push_next_step("todo add \"<title>\"");
    }

    let output = TaskListOutput {
        filter: state.filter,
        sort_by: state.sort_by,
        total: state.tasks.len(),
        shown: tasks.len(),
        tasks: tasks
            .into_iter()
            .map(|task| TaskOutput::new(task, now))
            .collect(),
    };

    emit_success(output_options, "list", &output, Some(&human))
}

pub fn run_show(options: IdOptions) -> Result<()> {
    let ctx = load_context(options.dir)?;
    let resolved = ctx.store.resolve_id(&options.id)?;
    let task = ctx
        .store
        .task(&resolved)
        .cloned()
        .ok_or_else(|| Error::TaskNotFound(resolved.clone()))?;
    let now = ctx.store.now();

    let mut human = HumanOutput::new(format!("Task {}", task.id));
    push_warnings(&mut human, &ctx);
    push_task_summary(&mut human, &task, now);
    human.push_summary("Created", format_local(task.created_at));
    human.push_summary("Updated", format_local(task.updated_at));
    if let Some(description) = task.description.as_deref() {
        human.push_detail(description);
    }

    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "show",
        &TaskOutput::new(task, now),
        Some(&human),
    )
}

pub fn run_stats(options: StatsOptions) -> Result<()> {
    let ctx = load_context(options.dir)?;
    let stats: TaskStats = ctx.store.stats();

    let mut human = HumanOutput::new("Task stats");
    push_warnings(&mut human, &ctx);
    human.push_summary("Total", stats.total.to_string());
    human.push_summary("Completed", stats.completed.to_string());
    human.push_summary("Active", stats.active.to_string());
    human.push_summary("Overdue", stats.overdue.to_string());
    human.push_summary("Due today", stats.due_today.to_string());
    human.push_summary("Completion rate", format!("{}%", stats.completion_rate));
    human.push_detail(format!(
        "Priority: high {}, medium {}, low {}",
        stats.priority.high, stats.priority.medium, stats.priority.low
    ));

    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "stats",
        &stats,
        Some(&human),
    )
}

pub fn run_clear(options: ClearOptions) -> Result<()> {
    let mut ctx = load_context(options.dir)?;
    let removed = ctx.store.tasks().len();
    ctx.store.clear_all_tasks();

    let mut human = HumanOutput::new("Tasks cleared");
    push_warnings(&mut human, &ctx);
    human.push_summary("Removed", removed.to_string());

    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "clear",
        &ClearOutput { removed },
        Some(&human),
    )
}

pub(crate) fn push_warnings(human: &mut HumanOutput, ctx: &Context) {
    for warning in &ctx.warnings {
        human.push_warning(warning.clone());
    }
}

fn push_task_summary(human: &mut HumanOutput, task: &Task, now: DateTime<Utc>) {
    human.push_summary("ID", task.id.clone());
    human.push_summary("Title", task.title.clone());
    human.push_summary("Priority", task.priority.to_string());
    human.push_summary(
        "Status",
        if task.completed { "completed" } else { "active" },
    );
    if let Some(due) = task.due_date {
        human.push_summary("Due", format!("{}{}", format_local(due), due_marker(task, now)));
    }
}

fn format_task_line(task: &Task, now: DateTime<Utc>) -> String {
    let check = if task.completed { "x" } else { " " };
    let short_id: String = task.id.chars().take(8).collect();
    let mut line = format!("[{check}][{}] {short_id} {}", task.priority, task.title);
    if let Some(due) = task.due_date {
        line.push_str(&format!(
            " (due {}{})",
            due.with_timezone(&Local).format("%Y-%m-%d"),
            due_marker(task, now)
        ));
    }
    line
}

fn due_marker(task: &Task, now: DateTime<Utc>) -> &'static str {
    if view::is_overdue(task, now) {
        ", overdue"
    } else if view::is_due_today(task, now) {
        ", today"
    } else {
        ""
    }
}

fn format_local(value: DateTime<Utc>) -> String {
    value.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}
