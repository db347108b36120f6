//! Derived views over a task snapshot: filter, sort, due-date checks and
//! aggregate statistics. Everything here is pure; inputs are never mutated.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::task::{Priority, Task};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Filter {
    #[default]
    All,
    Active,
    Completed,
}

impl Filter {
    pub fn as_str(self) -> &'static str {
        match self {
            Filter::All => "all",
            Filter::Active => "active",
            Filter::Completed => "completed",
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Filter {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Filter::All),
            "active" => Ok(Filter::Active),
            "completed" | "done" => Ok(Filter::Completed),
            other => Err(Error::InvalidArgument(format!(
                "unknown filter '{other}' (expected all|active|completed)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    #[default]
    CreatedAt,
    DueDate,
    Priority,
}

impl SortKey {
    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::CreatedAt => "createdAt",
            SortKey::DueDate => "dueDate",
            SortKey::Priority => "priority",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = Error;

    /// Accepts `createdAt`, `created-at` and `created_at` spellings.
    fn from_str(value: &str) -> Result<Self> {
        let normalized: String = value
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match normalized.as_str() {
            "createdat" | "created" => Ok(SortKey::CreatedAt),
            "duedate" | "due" => Ok(SortKey::DueDate),
            "priority" => Ok(SortKey::Priority),
            _ => Err(Error::InvalidArgument(format!(
                "unknown sort key '{}' (expected createdAt|dueDate|priority)",
                value.trim()
            ))),
        }
    }
}

pub fn filter(tasks: &[Task], mode: Filter) -> Vec<Task> {
    tasks
        .iter()
        .filter(|task| match mode {
            Filter::All => true,
            Filter::Active => !task.completed,
            Filter::Completed => task.completed,
        })
        .cloned()
        .collect()
}

/// Stable sort into a new vector.
pub fn sort(tasks: &[Task], key: SortKey) -> Vec<Task> {
    let mut sorted = tasks.to_vec();
    match key {
        SortKey::CreatedAt => sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        SortKey::DueDate => sorted.sort_by(|a, b| compare_due(a.due_date, b.due_date)),
        SortKey::Priority => sorted.sort_by(|a, b| b.priority.rank().cmp(&a.priority.rank())),
    }
    sorted
}

// Undated tasks go last.
fn compare_due(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// `filter` then `sort`, the order a list is rendered in.
pub fn visible(tasks: &[Task], mode: Filter, key: SortKey) -> Vec<Task> {
    sort(&filter(tasks, mode), key)
}

pub fn is_overdue(task: &Task, now: DateTime<Utc>) -> bool {
    match task.due_date {
        Some(due) => !task.completed && now > due,
        None => false,
    }
}

/// Due on `now`'s calendar day in the local timezone, completed or not.
pub fn is_due_today(task: &Task, now: DateTime<Utc>) -> bool {
    is_due_today_in(task, now, &Local)
}

pub fn is_due_today_in<Tz: TimeZone>(task: &Task, now: DateTime<Utc>, tz: &Tz) -> bool {
    match task.due_date {
        Some(due) => due.with_timezone(tz).date_naive() == now.with_timezone(tz).date_naive(),
        None => false,
    }
}

/// `round(completed / total * 100)`, 0 for an empty list.
pub fn completion_rate(tasks: &[Task]) -> u32 {
    if tasks.is_empty() {
        return 0;
    }
    let completed = tasks.iter().filter(|task| task.completed).count();
    ((completed as f64 / tasks.len() as f64) * 100.0).round() as u32
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct PriorityCounts {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub active: usize,
    pub overdue: usize,
    pub due_today: usize,
    pub completion_rate: u32,
    pub priority: PriorityCounts,
}

pub fn stats(tasks: &[Task], now: DateTime<Utc>) -> TaskStats {
    stats_in(tasks, now, &Local)
}

pub fn stats_in<Tz: TimeZone>(tasks: &[Task], now: DateTime<Utc>, tz: &Tz) -> TaskStats {
    let mut stats = TaskStats {
        total: tasks.len(),
        completion_rate: completion_rate(tasks),
        ..TaskStats::default()
    };
    for task in tasks {
        if task.completed {
            stats.completed += 1;
        }
        if is_overdue(task, now) {
            stats.overdue += 1;
        }
        if is_due_today_in(task, now, tz) {
            stats.due_today += 1;
        }
        match task.priority {
            Priority::High => stats.priority.high += 1,
            Priority::Medium => stats.priority.medium += 1,
            Priority::Low => stats.priority.low += 1,
        }
    }
    stats.active = stats.total - stats.completed;
    stats
}
