//! The task store: authoritative in-memory state for one session.
//!
//! Construct one `TaskStore` per session and pass it by reference. It reads
//! both records once at construction, then serves operations until dropped.
//!
//! Every mutation follows the same sequence:
//! 1. `state::reduce` computes the next snapshot and its effect (pure)
//! 2. the effect runs against the injected [`Persistence`] (best-effort)
//! 3. the snapshot is swapped in and observers are called
//!
//! An observer that sees a snapshot can rely on its write having been
//! attempted. Mutations take `&mut self`, which serializes them; share a
//! store across threads only behind a `Mutex`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};
use crate::persistence::Persistence;
use crate::state::{reduce, Action, AppState, Effect};
use crate::task::{NewTask, Task, TaskPatch};
use crate::view::{self, Filter, SortKey, TaskStats};

type Observer = Box<dyn FnMut(&AppState)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub struct TaskStore<P> {
    persistence: P,
    clock: Box<dyn Clock>,
    state: Arc<AppState>,
    observers: Vec<(SubscriptionId, Observer)>,
    next_subscription: u64,
}

impl<P: Persistence> TaskStore<P> {
    /// Open a store on the system clock
    pub fn open(persistence: P) -> Self {
        Self::with_clock(persistence, SystemClock)
    }

    pub fn with_clock(persistence: P, clock: impl Clock + 'static) -> Self {
        let mut store = Self {
            persistence,
            clock: Box::new(clock),
            state: Arc::new(AppState::default()),
            observers: Vec::new(),
            next_subscription: 0,
        };
        store.reload();
        store
    }

    /// Re-read both records, keeping the session's filter and sort key
    pub fn reload(&mut self) {
        let tasks = self.persistence.read_tasks();
        let settings = self.persistence.read_settings();
        debug!(
            tasks = tasks.len(),
            is_admin = settings.is_admin,
            "store loaded"
        );
        self.apply(Action::Load {
            tasks,
            is_admin: settings.is_admin,
        });
    }

    /// Current immutable snapshot
    pub fn snapshot(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn tasks(&self) -> &[Task] {
        &self.state.tasks
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.state.task(id)
    }

    pub fn persistence(&self) -> &P {
        &self.persistence
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Resolve a full id or a unique id prefix
    pub fn resolve_id(&self, input: &str) -> Result<String> {
        let needle = input.trim();
        if needle.is_empty() {
            return Err(Error::InvalidArgument("task id cannot be empty".to_string()));
        }

        if let Some(task) = self.state.tasks.iter().find(|task| task.id == needle) {
            return Ok(task.id.clone());
        }

        let needle = needle.to_ascii_lowercase();
        let mut matches: Vec<&str> = self
            .state
            .tasks
            .iter()
            .filter(|task| task.id.to_ascii_lowercase().starts_with(&needle))
            .map(|task| task.id.as_str())
            .collect();
        match matches.len() {
            0 => Err(Error::TaskNotFound(input.trim().to_string())),
            1 => Ok(matches.remove(0).to_string()),
            _ => {
                matches.sort_unstable();
                Err(Error::InvalidArgument(format!(
                    "ambiguous task id '{}': {}",
                    input.trim(),
                    matches.join(", ")
                )))
            }
        }
    }

    pub fn add_task(&mut self, new: NewTask) -> Result<Task> {
        let task = Task::create(new, self.clock.now())?;
        self.dispatch(Action::Add(task.clone()))?;
        Ok(task)
    }

    /// Merge `patch` into task `id`; `Ok(None)` when there is no such task
    pub fn update_task(&mut self, id: &str, patch: TaskPatch) -> Result<Option<Task>> {
        self.dispatch(Action::Update {
            id: id.to_string(),
            patch,
        })?;
        Ok(self.task(id).cloned())
    }

    /// Remove task `id`, returning it if it existed
    pub fn delete_task(&mut self, id: &str) -> Option<Task> {
        let removed = self.task(id).cloned();
        if removed.is_some() {
            self.apply(Action::Delete(id.to_string()));
        }
        removed
    }

    /// Flip completion of task `id`, returning the updated task
    pub fn toggle_task(&mut self, id: &str) -> Option<Task> {
        self.apply(Action::Toggle(id.to_string()));
        self.task(id).cloned()
    }

    pub fn set_filter(&mut self, filter: Filter) {
        self.apply(Action::SetFilter(filter));
    }

    pub fn set_sort_by(&mut self, sort_by: SortKey) {
        self.apply(Action::SetSortBy(sort_by));
    }

    pub fn set_admin_mode(&mut self, is_admin: bool) {
        self.apply(Action::SetAdminMode(is_admin));
    }

    pub fn clear_all_tasks(&mut self) {
        self.apply(Action::ClearAll);
    }

    /// Tasks as they should be rendered: filtered, then sorted
    pub fn visible_tasks(&self) -> Vec<Task> {
        view::visible(&self.state.tasks, self.state.filter, self.state.sort_by)
    }

    pub fn stats(&self) -> TaskStats {
        view::stats(&self.state.tasks, self.clock.now())
    }

    /// Register an observer for every published snapshot
    pub fn subscribe(&mut self, observer: impl FnMut(&AppState) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(existing, _)| *existing != id);
        self.observers.len() != before
    }

    // For actions `reduce` cannot reject.
    fn apply(&mut self, action: Action) {
        if let Err(err) = self.dispatch(action) {
            debug!(error = %err, "transition rejected");
        }
    }

    fn dispatch(&mut self, action: Action) -> Result<()> {
        let name = action.name();
        let transition = reduce(&self.state, action, self.clock.now())?;
        if !transition.changed {
            debug!(action = name, "no matching task");
            return Ok(());
        }

        self.run_effect(&transition.state, transition.effect);
        self.state = Arc::new(transition.state);
        debug!(action = name, tasks = self.state.tasks.len(), "state updated");
        self.notify();
        Ok(())
    }

    fn run_effect(&self, next: &AppState, effect: Effect) {
        match effect {
            Effect::None => {}
            Effect::WriteTasks => self.persistence.write_tasks(&next.tasks),
            Effect::WriteSettings { is_admin } => {
                let mut settings = self.persistence.read_settings();
                settings.is_admin = is_admin;
                self.persistence.write_settings(&settings);
            }
        }
    }

    fn notify(&mut self) {
        let snapshot = Arc::clone(&self.state);
        for (_, observer) in self.observers.iter_mut() {
            observer(&snapshot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::kv::MemoryStore;
    use crate::persistence::LocalPersistence;
    use crate::task::{Priority, Settings, Theme};
    use chrono::{Duration, TimeZone};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn clock() -> Rc<ManualClock> {
        Rc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 2, 1, 9, 0, 0).unwrap(),
        ))
    }

    fn memory_store() -> (Rc<MemoryStore>, TaskStore<LocalPersistence<Rc<MemoryStore>>>, Rc<ManualClock>) {
        let backend = Rc::new(MemoryStore::new());
        let clock = clock();
        let store = TaskStore::with_clock(
            LocalPersistence::new(Rc::clone(&backend)),
            Rc::clone(&clock),
        );
        (backend, store, clock)
    }

    #[test]
    fn buy_milk_scenario() {
        let (_, mut store, clock) = memory_store();
        let task = store
            .add_task(NewTask::new("Buy milk", Priority::Medium))
            .unwrap();
        assert!(!task.completed);
        assert_eq!(task.created_at, task.updated_at);

        clock.advance(Duration::seconds(5));
        let toggled = store.toggle_task(&task.id).unwrap();
        assert!(toggled.completed);
        assert!(toggled.updated_at > toggled.created_at);

        let removed = store.delete_task(&task.id);
        assert_eq!(removed.map(|t| t.id), Some(task.id.clone()));
        assert!(store.task(&task.id).is_none());
        assert!(store
            .persistence()
            .read_tasks()
            .iter()
            .all(|stored| stored.id != task.id));
    }

    #[test]
    fn toggle_twice_restores_completion_and_advances_updated_at() {
        let (_, mut store, _clock) = memory_store();
        let task = store.add_task(NewTask::new("flip", Priority::Low)).unwrap();
        let once = store.toggle_task(&task.id).unwrap();
        let twice = store.toggle_task(&task.id).unwrap();
        assert_eq!(twice.completed, task.completed);
        assert!(once.updated_at > task.updated_at);
        assert!(twice.updated_at > once.updated_at);
        assert_eq!(twice.title, task.title);
        assert_eq!(twice.created_at, task.created_at);
        assert_eq!(twice.priority, task.priority);
    }

    #[test]
    fn every_mutation_is_persisted() {
        let (backend, mut store, _clock) = memory_store();
        let a = store.add_task(NewTask::new("a", Priority::Low)).unwrap();
        store.add_task(NewTask::new("b", Priority::High)).unwrap();
        store
            .update_task(&a.id, TaskPatch::default().priority(Priority::High))
            .unwrap();
        let stored = store.persistence().read_tasks();
        assert_eq!(stored, store.tasks());
        assert_eq!(backend.write_count(), 3);

        store.clear_all_tasks();
        assert!(store.persistence().read_tasks().is_empty());
    }

    #[test]
    fn view_preferences_are_not_persisted() {
        let (backend, mut store, _clock) = memory_store();
        store.set_filter(Filter::Active);
        store.set_sort_by(SortKey::DueDate);
        assert_eq!(backend.write_count(), 0);
        assert_eq!(store.state().filter, Filter::Active);
        assert_eq!(store.state().sort_by, SortKey::DueDate);
    }

    #[test]
    fn admin_mode_preserves_theme() {
        let backend = Rc::new(
            MemoryStore::new().with_entry("appSettings", r#"{"isAdmin":false,"theme":"dark"}"#),
        );
        let mut store = TaskStore::with_clock(LocalPersistence::new(Rc::clone(&backend)), clock());
        store.set_admin_mode(true);
        assert!(store.state().is_admin);
        assert_eq!(
            store.persistence().read_settings(),
            Settings {
                is_admin: true,
                theme: Theme::Dark
            }
        );
    }

    #[test]
    fn construction_seeds_from_storage() {
        let backend = Rc::new(MemoryStore::new());
        {
            let mut first = TaskStore::with_clock(LocalPersistence::new(Rc::clone(&backend)), clock());
            first.add_task(NewTask::new("persisted", Priority::High)).unwrap();
            first.set_admin_mode(true);
        }
        let second = TaskStore::with_clock(LocalPersistence::new(Rc::clone(&backend)), clock());
        assert_eq!(second.tasks().len(), 1);
        assert!(second.state().is_admin);
        assert_eq!(second.state().filter, Filter::All);
    }

    #[test]
    fn failed_write_keeps_in_memory_mutation() {
        let (backend, mut store, _clock) = memory_store();
        backend.set_fail_writes(true);
        let task = store.add_task(NewTask::new("volatile", Priority::Low)).unwrap();
        assert!(store.task(&task.id).is_some());
        assert!(store.persistence().read_tasks().is_empty());
    }

    #[test]
    fn update_of_unknown_id_is_a_no_op() {
        let (backend, mut store, _clock) = memory_store();
        let result = store
            .update_task("missing", TaskPatch::default().completed(true))
            .unwrap();
        assert!(result.is_none());
        assert!(store.toggle_task("missing").is_none());
        assert!(store.delete_task("missing").is_none());
        assert_eq!(backend.write_count(), 0);
    }

    #[test]
    fn add_rejects_blank_title_without_writing() {
        let (backend, mut store, _clock) = memory_store();
        let err = store.add_task(NewTask::new(" \t", Priority::Low)).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(store.tasks().is_empty());
        assert_eq!(backend.write_count(), 0);
    }

    #[test]
    fn observers_see_snapshot_after_write() {
        let (backend, mut store, _clock) = memory_store();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_in_observer = Rc::clone(&seen);
        let backend_in_observer = Rc::clone(&backend);
        let subscription = store.subscribe(move |state| {
            seen_in_observer
                .borrow_mut()
                .push((state.tasks.len(), backend_in_observer.write_count()));
        });

        store.add_task(NewTask::new("one", Priority::Low)).unwrap();
        store.set_filter(Filter::Completed);
        assert_eq!(*seen.borrow(), vec![(1, 1), (1, 1)]);

        assert!(store.unsubscribe(subscription));
        store.add_task(NewTask::new("two", Priority::Low)).unwrap();
        assert_eq!(seen.borrow().len(), 2);
    }

    #[test]
    fn snapshots_are_immutable() {
        let (_, mut store, _clock) = memory_store();
        let before = store.snapshot();
        store.add_task(NewTask::new("new", Priority::Low)).unwrap();
        assert!(before.tasks.is_empty());
        assert_eq!(store.snapshot().tasks.len(), 1);
    }

    #[test]
    fn visible_tasks_apply_filter_then_sort() {
        let (_, mut store, clock) = memory_store();
        let low = store.add_task(NewTask::new("low", Priority::Low)).unwrap();
        clock.advance(Duration::seconds(1));
        store.add_task(NewTask::new("high", Priority::High)).unwrap();
        clock.advance(Duration::seconds(1));
        let done = store.add_task(NewTask::new("done", Priority::High)).unwrap();
        store.toggle_task(&done.id);

        store.set_filter(Filter::Active);
        store.set_sort_by(SortKey::Priority);
        let titles: Vec<String> = store.visible_tasks().into_iter().map(|t| t.title).collect();
        assert_eq!(titles, vec!["high", "low"]);
        assert_eq!(store.tasks()[0].id, low.id);
    }

    #[test]
    fn resolve_id_accepts_unique_prefixes() {
        let (_, mut store, _clock) = memory_store();
        let task = store.add_task(NewTask::new("find me", Priority::Low)).unwrap();
        assert_eq!(store.resolve_id(&task.id).unwrap(), task.id);
        assert_eq!(store.resolve_id(&task.id[..8]).unwrap(), task.id);
        assert_eq!(
            store.resolve_id(&task.id[..8].to_ascii_uppercase()).unwrap(),
            task.id
        );
        assert!(matches!(
            store.resolve_id("zzzz"),
            Err(Error::TaskNotFound(_))
        ));
        assert!(store.resolve_id("  ").is_err());
    }

    #[test]
    fn resolve_id_matches_imported_ids_exactly_first() {
        let record = r#"[
          {"id":"ABC","title":"upper","completed":false,"priority":"low",
           "createdAt":"2024-01-01T00:00:00.000Z","updatedAt":"2024-01-01T00:00:00.000Z"},
          {"id":"abcd","title":"lower","completed":false,"priority":"low",
           "createdAt":"2024-01-01T00:00:00.000Z","updatedAt":"2024-01-01T00:00:00.000Z"}
        ]"#;
        let backend = MemoryStore::new().with_entry(crate::persistence::TASKS_KEY, record);
        let store = TaskStore::with_clock(LocalPersistence::new(backend), clock());
        assert_eq!(store.tasks().len(), 2);

        assert_eq!(store.resolve_id("ABC").unwrap(), "ABC");
        assert_eq!(store.resolve_id(" abcd ").unwrap(), "abcd");
        assert_eq!(store.resolve_id("ABCD").unwrap(), "abcd");
        assert!(matches!(
            store.resolve_id("ab"),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn stats_use_store_clock() {
        let (_, mut store, clock) = memory_store();
        let due = clock.now() + Duration::hours(1);
        store
            .add_task(NewTask::new("soon", Priority::High).with_due_date(due))
            .unwrap();
        assert_eq!(store.stats().overdue, 0);
        clock.advance(Duration::hours(2));
        assert_eq!(store.stats().overdue, 1);
    }
}
