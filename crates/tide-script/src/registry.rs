//! Ordered evaluator registry.
//!
//! Registration order is priority order: the dispatcher scans front to back
//! and the first capable evaluator wins. Membership is compared by handle
//! identity, never by value.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::config::RegistryConfig;
use crate::evaluator::EvaluatorRef;
use crate::obs;

/// Shared, ordered collection of evaluators.
///
/// The lock is held only while copying or mutating the sequence, never while
/// evaluator code runs.
#[derive(Default)]
pub struct EvaluatorRegistry {
    evaluators: RwLock<Vec<EvaluatorRef>>,
    config: RegistryConfig,
}

impl EvaluatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            evaluators: RwLock::new(Vec::new()),
            config,
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Append an evaluator as the lowest-priority candidate.
    ///
    /// The same handle may be registered more than once unless
    /// `allow_duplicates` is off, in which case re-adding is a no-op.
    pub fn add(&self, evaluator: EvaluatorRef) {
        // `name()` is evaluator code and must not run under the lock.
        let name = evaluator.name().to_string();
        let position = {
            let mut evaluators = self.write();
            if !self.config.allow_duplicates
                && evaluators.iter().any(|e| Arc::ptr_eq(e, &evaluator))
            {
                None
            } else {
                evaluators.push(evaluator);
                Some(evaluators.len() - 1)
            }
        };
        match position {
            Some(pos) => obs::emit_evaluator_added(&name, pos),
            None => obs::emit_evaluator_duplicate_ignored(&name),
        }
    }

    /// Remove the first registration of `evaluator`.
    ///
    /// Returns `false` when it was not registered; that is not an error.
    pub fn remove(&self, evaluator: &EvaluatorRef) -> bool {
        let name = evaluator.name().to_string();
        let removed = {
            let mut evaluators = self.write();
            let position = evaluators.iter().position(|e| Arc::ptr_eq(e, evaluator));
            if let Some(pos) = position {
                evaluators.remove(pos);
            }
            position
        };
        match removed {
            Some(pos) => {
                obs::emit_evaluator_removed(&name, pos);
                true
            }
            None => {
                obs::emit_evaluator_remove_missed(&name);
                false
            }
        }
    }

    /// Copy of the current sequence, in registration order.
    pub fn snapshot(&self) -> Vec<EvaluatorRef> {
        self.read().clone()
    }

    pub fn contains(&self, evaluator: &EvaluatorRef) -> bool {
        self.read().iter().any(|e| Arc::ptr_eq(e, evaluator))
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Evaluator names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.snapshot().iter().map(|e| e.name().to_string()).collect()
    }

    pub fn clear(&self) {
        // Dropped after the guard, so evaluator destructors run unlocked.
        let _evaluators = std::mem::take(&mut *self.write());
    }

    // Every critical section leaves the Vec consistent, so a poisoned lock
    // only means a panic elsewhere and the data is still usable.
    fn read(&self) -> RwLockReadGuard<'_, Vec<EvaluatorRef>> {
        self.evaluators.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<EvaluatorRef>> {
        self.evaluators.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for EvaluatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvaluatorRegistry")
            .field("evaluators", &self.names())
            .field("config", &self.config)
            .finish()
    }
}
