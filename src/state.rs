//! Application state and its pure transition function.
//!
//! `reduce` never touches storage. It returns the next state together with
//! the persistence [`Effect`] the caller must run; `TaskStore` runs it
//! before publishing the new snapshot.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::task::{Task, TaskPatch};
use crate::view::{Filter, SortKey};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AppState {
    pub tasks: Vec<Task>,
    pub filter: Filter,
    pub sort_by: SortKey,
    pub is_admin: bool,
}

impl AppState {
    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.tasks.iter().position(|task| task.id == id)
    }
}

#[derive(Debug, Clone)]
pub enum Action {
    /// Seed from storage at startup
    Load { tasks: Vec<Task>, is_admin: bool },
    Add(Task),
    Update { id: String, patch: TaskPatch },
    Delete(String),
    Toggle(String),
    SetFilter(Filter),
    SetSortBy(SortKey),
    SetAdminMode(bool),
    ClearAll,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Load { .. } => "load",
            Action::Add(_) => "add",
            Action::Update { .. } => "update",
            Action::Delete(_) => "delete",
            Action::Toggle(_) => "toggle",
            Action::SetFilter(_) => "set_filter",
            Action::SetSortBy(_) => "set_sort_by",
            Action::SetAdminMode(_) => "set_admin_mode",
            Action::ClearAll => "clear_all",
        }
    }
}

/// Side effect a transition asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    None,
    /// Overwrite the stored collection with the new state's tasks
    WriteTasks,
    /// Merge `is_admin` into the stored settings record
    WriteSettings { is_admin: bool },
}

#[derive(Debug, Clone)]
pub struct Transition {
    pub state: AppState,
    pub effect: Effect,
    /// False when the action matched nothing (unknown id)
    pub changed: bool,
}

impl Transition {
    fn unchanged(state: &AppState) -> Self {
        Self {
            state: state.clone(),
            effect: Effect::None,
            changed: false,
        }
    }

    fn to(state: AppState, effect: Effect) -> Self {
        Self {
            state,
            effect,
            changed: true,
        }
    }
}

/// Compute the state that follows `action`.
///
/// Fails only when an update would leave a task with a blank title.
pub fn reduce(state: &AppState, action: Action, now: DateTime<Utc>) -> Result<Transition> {
    let transition = match action {
        Action::Load { tasks, is_admin } => Transition::to(
            AppState {
                tasks,
                is_admin,
                ..state.clone()
            },
            Effect::None,
        ),
        Action::Add(task) => {
            let mut next = state.clone();
            next.tasks.push(task);
            Transition::to(next, Effect::WriteTasks)
        }
        Action::Update { id, patch } => match state.position(&id) {
            Some(index) => {
                let mut next = state.clone();
                next.tasks[index].apply(&patch, now)?;
                Transition::to(next, Effect::WriteTasks)
            }
            None => Transition::unchanged(state),
        },
        Action::Delete(id) => match state.position(&id) {
            Some(index) => {
                let mut next = state.clone();
                next.tasks.remove(index);
                Transition::to(next, Effect::WriteTasks)
            }
            None => Transition::unchanged(state),
        },
        Action::Toggle(id) => match state.position(&id) {
            Some(index) => {
                let mut next = state.clone();
                next.tasks[index].toggle(now);
                Transition::to(next, Effect::WriteTasks)
            }
            None => Transition::unchanged(state),
        },
        Action::SetFilter(filter) => Transition::to(
            AppState {
                filter,
                ..state.clone()
            },
            Effect::None,
        ),
        Action::SetSortBy(sort_by) => Transition::to(
            AppState {
                sort_by,
                ..state.clone()
            },
            Effect::None,
        ),
        Action::SetAdminMode(is_admin) => Transition::to(
            AppState {
                is_admin,
                ..state.clone()
            },
            Effect::WriteSettings { is_admin },
        ),
        Action::ClearAll => Transition::to(
            AppState {
                tasks: Vec::new(),
                ..state.clone()
            },
            Effect::WriteTasks,
        ),
    };
    Ok(transition)
}
