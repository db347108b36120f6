//! todo - a local task list
//!
//! This library provides the core of the `todo` CLI: a task store that
//! mirrors every change into a durable key-value store, plus the pure
//! functions that derive what to render from a snapshot.
//!
//! # Core Concepts
//!
//! - **Tasks**: titled items with priority, completion and an optional due date
//! - **Settings**: the admin-mode flag and theme, stored beside the tasks
//! - **Snapshots**: immutable `AppState` values published after each change
//! - **Effects**: the persistence write a state transition asks for
//!
//! # Module Organization
//!
//! - `cli`: Command-line interface using clap
//! - `config`: Configuration loading from `todo.toml`
//! - `error`: Error types and result aliases
//! - `task`: Task and settings records and their wire format
//! - `kv`: Durable key-value backends (files, memory)
//! - `lock`: File locking and atomic writes
//! - `persistence`: Reading and writing the two stored records, export/import
//! - `state`: Application state and the pure transition function
//! - `store`: The task store that runs transitions and their effects
//! - `view`: Filtering, sorting, due-date checks and statistics
//! - `clock`: Injectable time source

pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod kv;
pub mod lock;
pub mod output;
pub mod persistence;
pub mod state;
pub mod store;
pub mod task;
pub mod view;

pub use error::{Error, Result};
pub use persistence::{LocalPersistence, Persistence};
pub use store::TaskStore;
