//! Request-scoped item store.
//!
//! Instances of [`ReuseScope::Request`](crate::ReuseScope::Request) registrations
//! are kept in a per-thread store keyed by the registration entry, so each
//! logical request handled on a thread sees its own instance. Disposal hooks
//! for container-owned request instances are kept beside them and run when
//! the request ends.

use std::cell::RefCell;
use std::collections::HashMap;
use std::marker::PhantomData;

use crate::error::DiResult;
use crate::internal::{DisposeBag, DisposeHook};
use crate::registration::AnyArc;

thread_local! {
    static REQUEST_ITEMS: RefCell<HashMap<u64, AnyArc>> = RefCell::new(HashMap::new());
    static REQUEST_HOOKS: RefCell<DisposeBag> = RefCell::new(DisposeBag::default());
}

/// Guard delimiting one logical request on the current thread.
///
/// Dropping the guard (or calling [`end`](RequestScope::end)) disposes the
/// container-owned request instances in reverse creation order and clears
/// every request-scoped instance cached on this thread. The guard is tied to
/// the thread that created it.
///
/// # Examples
///
/// ```
/// use ferrous_container::{Container, RequestScope, ReuseScope};
/// use std::sync::Arc;
///
/// struct RequestId(u32);
///
/// let container = Container::new();
/// container
///     .register(|_| Arc::new(RequestId(1)))
///     .unwrap()
///     .reused_within(ReuseScope::Request);
///
/// let first = {
///     let _request = RequestScope::begin();
///     let a = container.resolve::<Arc<RequestId>>().unwrap();
///     let b = container.resolve::<Arc<RequestId>>().unwrap();
///     assert!(Arc::ptr_eq(&a, &b));
///     a
/// };
///
/// let _request = RequestScope::begin();
/// let next = container.resolve::<Arc<RequestId>>().unwrap();
/// assert!(!Arc::ptr_eq(&first, &next));
/// ```
pub struct RequestScope {
    ended: bool,
    _thread_bound: PhantomData<*const ()>,
}

impl RequestScope {
    /// Starts a request with an empty item store.
    ///
    /// Leftovers from resolutions made outside any request are released first.
    pub fn begin() -> Self {
        if let Err(error) = release() {
            tracing::warn!(%error, "disposing leftover request instances failed");
        }
        tracing::trace!("request scope started");
        Self { ended: false, _thread_bound: PhantomData }
    }

    /// Ends the request, disposing and dropping its cached instances.
    ///
    /// Every hook runs even when one fails; the first failure is returned.
    pub fn end(mut self) -> DiResult<()> {
        self.ended = true;
        release()
    }

    /// Number of request-scoped instances waiting to be disposed on this thread.
    pub fn pending_disposals() -> usize {
        REQUEST_HOOKS.with(|hooks| hooks.borrow().len())
    }

    /// Number of request-scoped instances cached on this thread.
    pub fn item_count() -> usize {
        REQUEST_ITEMS.with(|items| items.borrow().len())
    }
}

impl Drop for RequestScope {
    fn drop(&mut self) {
        if self.ended {
            return;
        }
        if let Err(error) = release() {
            tracing::warn!(%error, "request scope dropped with a failed disposal");
        }
    }
}

pub(crate) fn get(entry: u64) -> Option<AnyArc> {
    REQUEST_ITEMS.with(|items| items.borrow().get(&entry).cloned())
}

pub(crate) fn get_or_insert(entry: u64, value: AnyArc) -> AnyArc {
    REQUEST_ITEMS.with(|items| items.borrow_mut().entry(entry).or_insert(value).clone())
}

pub(crate) fn track(hook: DisposeHook) {
    REQUEST_HOOKS.with(|hooks| hooks.borrow_mut().push(hook));
}

fn release() -> DiResult<()> {
    // Hooks and destructors run outside the borrows; a hook may resolve again
    let mut hooks = REQUEST_HOOKS.with(|hooks| std::mem::take(&mut *hooks.borrow_mut()));
    let mut first_error = None;
    while let Some(hook) = hooks.pop() {
        if let Err(error) = hook() {
            match first_error {
                None => first_error = Some(error),
                Some(_) => tracing::warn!(%error, "request disposal failed"),
            }
        }
    }

    let items = REQUEST_ITEMS.with(|items| std::mem::take(&mut *items.borrow_mut()));
    tracing::trace!(released = items.len(), "request scope ended");
    drop(items);

    first_error.map_or(Ok(()), Err)
}
