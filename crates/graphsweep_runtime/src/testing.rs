//! Scripted in-memory backend for tests.
//!
//! Each query text maps to a list of steps consumed one per execute call;
//! the last step repeats once the list is exhausted. Every open and execute
//! call is counted so tests can assert what was (not) dispatched.

use crate::backend::{Backend, ExecuteRequest, Session};
use async_trait::async_trait;
use graphsweep_core::{BackendError, ResultSet, SchemaInventory};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One scripted response
#[derive(Debug, Clone)]
pub enum Step {
    /// Return this result set
    Return(ResultSet),
    /// Fail with this error
    Fail(BackendError),
    /// Wait, then perform the inner step
    Delay(Duration, Box<Step>),
}

impl Step {
    /// Delay this step by `delay`
    #[must_use]
    pub fn after(self, delay: Duration) -> Self {
        Self::Delay(delay, Box::new(self))
    }
}

#[derive(Debug, Default)]
struct Shared {
    inventory: SchemaInventory,
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    fallback: Option<Step>,
    open_error: Option<BackendError>,
    inventory_error: Option<BackendError>,
    inventory_delay: Option<Duration>,
    opens: AtomicUsize,
    inventories: AtomicUsize,
    executes: Mutex<HashMap<String, usize>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

/// In-memory [`Backend`] driven by per-query scripts
#[derive(Debug, Clone, Default)]
pub struct ScriptedBackend {
    shared: Arc<Shared>,
}

impl ScriptedBackend {
    /// Backend reporting `inventory`; unscripted queries return one row
    #[must_use]
    pub fn new(inventory: SchemaInventory) -> Self {
        Self {
            shared: Arc::new(Shared {
                inventory,
                fallback: Some(Step::Return(Self::rows(&["value"], 1))),
                ..Shared::default()
            }),
        }
    }

    fn shared_mut(&mut self) -> &mut Shared {
        // builders run before any session is opened
        Arc::get_mut(&mut self.shared).expect("configure ScriptedBackend before cloning it")
    }

    /// Script the responses for `query`
    #[must_use]
    pub fn with_script(mut self, query: impl Into<String>, steps: Vec<Step>) -> Self {
        self.shared_mut()
            .scripts
            .get_mut()
            .expect("script lock")
            .insert(query.into(), steps.into());
        self
    }

    /// Response for queries without a script
    #[must_use]
    pub fn with_fallback(mut self, step: Step) -> Self {
        self.shared_mut().fallback = Some(step);
        self
    }

    /// Make every `open` call fail
    #[must_use]
    pub fn with_open_error(mut self, err: BackendError) -> Self {
        self.shared_mut().open_error = Some(err);
        self
    }

    /// Make the inventory call fail
    #[must_use]
    pub fn with_inventory_error(mut self, err: BackendError) -> Self {
        self.shared_mut().inventory_error = Some(err);
        self
    }

    /// Make the inventory call take `delay`
    #[must_use]
    pub fn with_inventory_delay(mut self, delay: Duration) -> Self {
        self.shared_mut().inventory_delay = Some(delay);
        self
    }

    /// Result set with `columns` and `count` rows of `"<column>-<row>"` strings
    #[must_use]
    pub fn rows(columns: &[&str], count: usize) -> ResultSet {
        let rows = (0..count)
            .map(|i| {
                columns
                    .iter()
                    .map(|c| Value::String(format!("{}-{}", c, i)))
                    .collect()
            })
            .collect();
        ResultSet::try_new(columns.iter().map(|c| (*c).to_string()).collect(), rows)
            .expect("scripted rows are rectangular")
    }

    /// Number of sessions opened
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.shared.opens.load(Ordering::SeqCst)
    }

    /// Number of inventory calls
    #[must_use]
    pub fn inventory_count(&self) -> usize {
        self.shared.inventories.load(Ordering::SeqCst)
    }

    /// Execute calls made for `query`
    #[must_use]
    pub fn execute_count(&self, query: &str) -> usize {
        self.shared
            .executes
            .lock()
            .expect("execute lock")
            .get(query)
            .copied()
            .unwrap_or(0)
    }

    /// Execute calls across all queries
    #[must_use]
    pub fn total_executes(&self) -> usize {
        self.shared.executes.lock().expect("execute lock").values().sum()
    }

    /// Highest number of execute calls that were running at once
    #[must_use]
    pub fn peak_in_flight(&self) -> usize {
        self.shared.peak_in_flight.load(Ordering::SeqCst)
    }

    fn next_step(&self, query: &str) -> Option<Step> {
        let mut scripts = self.shared.scripts.lock().expect("script lock");
        match scripts.get_mut(query) {
            Some(steps) if steps.len() > 1 => steps.pop_front(),
            Some(steps) => steps.front().cloned(),
            None => self.shared.fallback.clone(),
        }
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    async fn open(&self, _database: &str) -> Result<Box<dyn Session>, BackendError> {
        self.shared.opens.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.shared.open_error {
            return Err(err.clone());
        }
        Ok(Box::new(ScriptedSession {
            backend: self.clone(),
        }))
    }

    async fn inventory(&self, _database: &str) -> Result<SchemaInventory, BackendError> {
        self.shared.inventories.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.shared.inventory_delay {
            tokio::time::sleep(delay).await;
        }
        match &self.shared.inventory_error {
            Some(err) => Err(err.clone()),
            None => Ok(self.shared.inventory.clone()),
        }
    }
}

struct ScriptedSession {
    backend: ScriptedBackend,
}

impl ScriptedSession {
    async fn perform(mut step: Step) -> Result<ResultSet, BackendError> {
        loop {
            match step {
                Step::Return(rs) => return Ok(rs),
                Step::Fail(err) => return Err(err),
                Step::Delay(delay, inner) => {
                    tokio::time::sleep(delay).await;
                    step = *inner;
                }
            }
        }
    }
}

#[async_trait]
impl Session for ScriptedSession {
    async fn execute(&mut self, request: &ExecuteRequest) -> Result<ResultSet, BackendError> {
        let shared = &self.backend.shared;
        *shared
            .executes
            .lock()
            .expect("execute lock")
            .entry(request.query.clone())
            .or_insert(0) += 1;

        let Some(step) = self.backend.next_step(&request.query) else {
            return Err(BackendError::new(format!("no script for query: {}", request.query)));
        };

        let now = shared.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        shared.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        let guard = InFlight(&shared.in_flight);
        let out = Self::perform(step).await;
        drop(guard);

        out.map(|mut rs| {
            rs.truncate(request.row_limit);
            rs
        })
    }
}

// Keeps the in-flight gauge right when an execute future is dropped mid-way
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
