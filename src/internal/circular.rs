//! Circular dependency detection infrastructure.

use std::cell::RefCell;

use crate::error::{DiError, DiResult};
use crate::key::ServiceKey;

const MAX_DEPTH: usize = 1024;

// Thread-local stack of factories currently running on this thread
thread_local! {
    static RESOLUTION_TLS: RefCell<Vec<Frame>> = const { RefCell::new(Vec::new()) };
}

struct Frame {
    container: u64,
    key: ServiceKey,
}

/// Guard marking a factory invocation as in progress on the current thread.
///
/// Only zero-argument factories are checked for cycles: re-entering one for the
/// same key in the same container can never terminate, while argument-taking
/// factories may legitimately recurse with different arguments.
pub(crate) struct ResolutionGuard {
    _private: (),
}

impl ResolutionGuard {
    pub(crate) fn enter(container: u64, key: &ServiceKey) -> DiResult<Self> {
        RESOLUTION_TLS.with(|tls| {
            let mut stack = tls.borrow_mut();

            if key.is_plain()
                && stack.iter().any(|f| f.container == container && &f.key == key)
            {
                let mut path: Vec<&'static str> =
                    stack.iter().map(|f| f.key.display_name()).collect();
                path.push(key.display_name());
                return Err(DiError::Circular(path));
            }

            if stack.len() >= MAX_DEPTH {
                return Err(DiError::DepthExceeded(stack.len()));
            }

            stack.push(Frame { container, key: key.clone() });
            Ok(Self { _private: () })
        })
    }
}

impl Drop for ResolutionGuard {
    fn drop(&mut self) {
        RESOLUTION_TLS.with(|tls| {
            tls.borrow_mut().pop();
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_reentry_of_plain_key() {
        let key = ServiceKey::of::<String, ()>(None);
        let _outer = ResolutionGuard::enter(1, &key).unwrap();
        match ResolutionGuard::enter(1, &key) {
            Err(DiError::Circular(path)) => assert_eq!(path, vec!["alloc::string::String"; 2]),
            _ => panic!("expected circular error"),
        }
    }

    #[test]
    fn same_key_in_other_container_is_allowed() {
        let key = ServiceKey::of::<String, ()>(None);
        let _outer = ResolutionGuard::enter(1, &key).unwrap();
        assert!(ResolutionGuard::enter(2, &key).is_ok());
    }

    #[test]
    fn argument_factories_may_recurse() {
        let key = ServiceKey::of::<String, u32>(None);
        let _outer = ResolutionGuard::enter(1, &key).unwrap();
        assert!(ResolutionGuard::enter(1, &key).is_ok());
    }

    #[test]
    fn stack_unwinds_on_drop() {
        let key = ServiceKey::of::<u8, ()>(None);
        {
            let _guard = ResolutionGuard::enter(1, &key).unwrap();
        }
        assert!(ResolutionGuard::enter(1, &key).is_ok());
    }
}
