//! Observer registration.
//!
//! [`Observers`] is a name-keyed registry of callbacks invoked for every
//! [`ExecutionEvent`] of the runs that share it. It lives on the
//! [`ExecutionContext`](crate::context::ExecutionContext) that was built with
//! it, never in a global.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use taskweave_graph::context::ExecutionContext;
//! use taskweave_graph::hooks::{EventKind, ExecutionEvent, Observers};
//!
//! let observers = Arc::new(Observers::new());
//! observers
//!     .register_for("logger", &[EventKind::NodeCompleted], |event| {
//!         if let ExecutionEvent::NodeCompleted { name, outcome, .. } = event {
//!             tracing::info!(%name, outcome, "node finished");
//!         }
//!     })
//!     .unwrap();
//!
//! let ctx = ExecutionContext::builder("problem").observers(observers).build();
//! # let _ = ctx;
//! ```

use core::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use super::events::{EventKind, ExecutionEvent};

type Handler = Arc<dyn Fn(&ExecutionEvent) + Send + Sync>;

/// Errors that can occur during observer registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObserverError {
    /// An observer with this name is already registered.
    DuplicateName {
        /// The duplicate name.
        name: String,
    },
}

impl fmt::Display for ObserverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObserverError::DuplicateName { name } => {
                write!(f, "observer '{name}' is already registered")
            }
        }
    }
}

impl core::error::Error for ObserverError {}

struct ObserverEntry {
    name: String,
    /// `None` subscribes to every event.
    kinds: Option<Vec<EventKind>>,
    handler: Handler,
}

/// Registry of execution observers.
///
/// Observers run synchronously on the worker thread that produced the event,
/// in registration order. A handler may register or unregister observers;
/// the change applies from the next event.
#[derive(Default)]
pub struct Observers {
    entries: RwLock<Vec<ObserverEntry>>,
}

impl Observers {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an observer for every event.
    ///
    /// # Errors
    ///
    /// [`ObserverError::DuplicateName`] if `name` is taken.
    pub fn register<F>(&self, name: impl Into<String>, handler: F) -> Result<&Self, ObserverError>
    where
        F: Fn(&ExecutionEvent) + Send + Sync + 'static,
    {
        self.insert(name.into(), None, Arc::new(handler))
    }

    /// Registers an observer for the listed event kinds only.
    ///
    /// # Errors
    ///
    /// [`ObserverError::DuplicateName`] if `name` is taken.
    pub fn register_for<F>(
        &self,
        name: impl Into<String>,
        kinds: &[EventKind],
        handler: F,
    ) -> Result<&Self, ObserverError>
    where
        F: Fn(&ExecutionEvent) + Send + Sync + 'static,
    {
        self.insert(name.into(), Some(kinds.to_vec()), Arc::new(handler))
    }

    fn insert(
        &self,
        name: String,
        kinds: Option<Vec<EventKind>>,
        handler: Handler,
    ) -> Result<&Self, ObserverError> {
        let mut entries = self.entries.write();
        if entries.iter().any(|entry| entry.name == name) {
            return Err(ObserverError::DuplicateName { name });
        }
        entries.push(ObserverEntry {
            name,
            kinds,
            handler,
        });
        Ok(self)
    }

    /// Removes an observer. Returns `false` if it was not registered.
    pub fn unregister(&self, name: &str) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|entry| entry.name != name);
        entries.len() != before
    }

    /// Registered names, in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.entries
            .read()
            .iter()
            .map(|entry| entry.name.clone())
            .collect()
    }

    /// Number of registered observers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Delivers `event` to every matching observer.
    pub fn notify(&self, event: &ExecutionEvent) {
        let kind = event.kind();
        // Handlers run outside the lock so they may register observers.
        let handlers: Vec<Handler> = self
            .entries
            .read()
            .iter()
            .filter(|entry| entry.kinds.as_ref().is_none_or(|kinds| kinds.contains(&kind)))
            .map(|entry| Arc::clone(&entry.handler))
            .collect();
        for handler in handlers {
            handler(event);
        }
    }
}

impl fmt::Debug for Observers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers")
            .field("names", &self.names())
            .finish()
    }
}
