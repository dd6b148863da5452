//! Internal disposal bag for managing cleanup hooks.

use crate::error::DiResult;

/// Disposal hook owned by a container.
pub(crate) type DisposeHook = Box<dyn FnOnce() -> DiResult<()> + Send>;

/// Container for disposal hooks with LIFO execution order.
///
/// Hooks are popped one at a time so the owner can run each one without
/// holding its own lock; a hook that fails leaves the rest queued.
#[derive(Default)]
pub(crate) struct DisposeBag {
    hooks: Vec<DisposeHook>,
}

impl DisposeBag {
    /// Add a disposal hook.
    pub(crate) fn push(&mut self, f: DisposeHook) {
        self.hooks.push(f);
    }

    /// Take the most recently added hook.
    pub(crate) fn pop(&mut self) -> Option<DisposeHook> {
        self.hooks.pop()
    }

    /// Execute all hooks in reverse order (LIFO), stopping at the first failure.
    #[cfg(test)]
    pub(crate) fn run_all_reverse(&mut self) -> DiResult<()> {
        while let Some(f) = self.hooks.pop() {
            (f)()?;
        }
        Ok(())
    }

    pub(crate) fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Check if the bag is empty (no disposers registered).
    pub(crate) fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DiError;
    use std::sync::{Arc, Mutex};

    #[test]
    fn runs_hooks_last_in_first_out() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut bag = DisposeBag::default();
        for i in 0..3 {
            let order = order.clone();
            bag.push(Box::new(move || {
                order.lock().unwrap().push(i);
                Ok(())
            }));
        }

        bag.run_all_reverse().unwrap();
        assert_eq!(*order.lock().unwrap(), vec![2, 1, 0]);
        assert!(bag.is_empty());
    }

    #[test]
    fn failure_leaves_remaining_hooks_queued() {
        let mut bag = DisposeBag::default();
        bag.push(Box::new(|| Ok(())));
        bag.push(Box::new(|| Err(DiError::Configuration("boom".to_string()))));

        assert!(bag.run_all_reverse().is_err());
        assert_eq!(bag.len(), 1);
        assert!(bag.run_all_reverse().is_ok());
        assert!(bag.is_empty());
    }
}
