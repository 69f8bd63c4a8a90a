//! Execution-scope-local attribution state.
//!
//! Each logical execution (request, background task) that wants its
//! mutations attributed enters a scope carrying an actor resolver and
//! origin metadata. Scope state lives in thread-local storage; two
//! concurrent executions never observe each other's actor or origin.
//! The guard returned by `Scope::enter` tears the scope down on drop,
//! so teardown runs even when the scope body panics.

use std::cell::{Cell, RefCell};
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

use crate::core::dispatch;
use crate::core::errors::{Result, VestigeError};
use crate::core::models::actor::Actor;
use crate::core::traits::principal::PrincipalResolver;

static SCOPE_COUNTER: AtomicU64 = AtomicU64::new(0);

thread_local! {
    static SCOPE_STACK: RefCell<Vec<ScopeFrame>> = const { RefCell::new(Vec::new()) };
    static DISABLED_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Identifier binding one scope to its registered attribution handler.
///
/// Unique among all scopes that are live at the same time: the
/// sequence number alone guarantees that, the entry timestamp makes
/// tokens distinguishable across process restarts in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeToken {
    seq: u64,
    entered_at_ms: i64,
}

impl ScopeToken {
    fn next() -> Self {
        Self {
            seq: SCOPE_COUNTER.fetch_add(1, Ordering::Relaxed),
            entered_at_ms: Utc::now().timestamp_millis(),
        }
    }
}

/// Network origin of the execution a scope attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Origin {
    pub address: Option<String>,
    pub port: Option<u16>,
}

impl Origin {
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: Some(address.into()),
            port: Some(port),
        }
    }
}

struct ScopeFrame {
    token: ScopeToken,
    resolver: Arc<dyn PrincipalResolver>,
    origin: Origin,
}

/// Entry point for attribution scopes.
pub struct Scope;

impl Scope {
    /// Establish a new attribution scope on the current execution.
    ///
    /// The actor is resolved lazily, at the moment a record is
    /// attributed, so entering a scope never forces authentication
    /// state. Scopes nest: the innermost scope wins until its guard
    /// drops, after which the outer scope's state is visible again.
    pub fn enter(resolver: Arc<dyn PrincipalResolver>, origin: Origin) -> ScopeGuard {
        let token = ScopeToken::next();
        dispatch::register(token, resolver.clone(), origin.clone());
        SCOPE_STACK.with(|stack| {
            stack.borrow_mut().push(ScopeFrame {
                token,
                resolver,
                origin,
            });
        });
        tracing::debug!(?token, "entered attribution scope");
        ScopeGuard {
            token,
            _not_send: PhantomData,
        }
    }

    /// Suppress all change logging for the current execution until the
    /// returned guard drops. Nests; each guard restores the prior
    /// state.
    pub fn disable() -> DisableGuard {
        DISABLED_DEPTH.with(|depth| depth.set(depth.get() + 1));
        DisableGuard {
            _not_send: PhantomData,
        }
    }
}

/// Token of the innermost active scope on this execution, if any.
pub(crate) fn current_token() -> Option<ScopeToken> {
    SCOPE_STACK.with(|stack| stack.borrow().last().map(|frame| frame.token))
}

/// Resolve the actor of the innermost active scope.
///
/// Fails with `NoActiveScope` outside any scope.
pub fn current_actor() -> Result<Actor> {
    let resolver = SCOPE_STACK.with(|stack| {
        stack
            .borrow()
            .last()
            .map(|frame| frame.resolver.clone())
            .ok_or(VestigeError::NoActiveScope)
    })?;
    Ok(resolver.resolve())
}

/// Origin metadata of the innermost active scope.
///
/// Fails with `NoActiveScope` outside any scope.
pub fn current_origin() -> Result<Origin> {
    SCOPE_STACK.with(|stack| {
        stack
            .borrow()
            .last()
            .map(|frame| frame.origin.clone())
            .ok_or(VestigeError::NoActiveScope)
    })
}

/// Whether change logging is currently suppressed on this execution.
pub fn is_disabled() -> bool {
    DISABLED_DEPTH.with(|depth| depth.get() > 0)
}

/// Tears down its scope on drop: pops the frame and deregisters the
/// attribution handler, including on unwind.
#[must_use = "dropping the guard immediately exits the scope"]
pub struct ScopeGuard {
    token: ScopeToken,
    // Scope state is thread-local; the guard must drop on the thread
    // that entered the scope.
    _not_send: PhantomData<*const ()>,
}

impl ScopeGuard {
    /// Token of the scope this guard owns.
    pub fn token(&self) -> ScopeToken {
        self.token
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        SCOPE_STACK.with(|stack| {
            let mut frames = stack.borrow_mut();
            if let Some(position) = frames.iter().rposition(|frame| frame.token == self.token) {
                frames.remove(position);
            }
        });
        dispatch::deregister(self.token);
        tracing::debug!(token = ?self.token, "exited attribution scope");
    }
}

#[must_use = "dropping the guard immediately re-enables logging"]
pub struct DisableGuard {
    _not_send: PhantomData<*const ()>,
}

impl Drop for DisableGuard {
    fn drop(&mut self) {
        DISABLED_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::actor::{Actor, Principal};

    fn alice() -> Actor {
        Actor::Resolved(Principal {
            id: "1".to_string(),
            username: "alice".to_string(),
            email: None,
        })
    }

    #[test]
    fn accessors_fail_outside_any_scope() {
        assert!(matches!(
            current_actor(),
            Err(VestigeError::NoActiveScope)
        ));
        assert!(matches!(
            current_origin(),
            Err(VestigeError::NoActiveScope)
        ));
    }

    #[test]
    fn scope_exposes_actor_and_origin() {
        let _guard = Scope::enter(Arc::new(alice()), Origin::new("10.0.0.1", 443));

        assert_eq!(current_actor().unwrap(), alice());
        let origin = current_origin().unwrap();
        assert_eq!(origin.address.as_deref(), Some("10.0.0.1"));
        assert_eq!(origin.port, Some(443));
    }

    #[test]
    fn nested_scope_restores_outer_state_on_exit() {
        let _outer = Scope::enter(Arc::new(alice()), Origin::new("10.0.0.1", 443));
        {
            let _inner = Scope::enter(Arc::new(Actor::Anonymous), Origin::new("127.0.0.1", 80));
            assert_eq!(current_actor().unwrap(), Actor::Anonymous);
            assert_eq!(
                current_origin().unwrap().address.as_deref(),
                Some("127.0.0.1")
            );
        }

        assert_eq!(current_actor().unwrap(), alice());
        assert_eq!(
            current_origin().unwrap().address.as_deref(),
            Some("10.0.0.1")
        );
    }

    #[test]
    fn guard_tears_down_on_panic() {
        let result = std::panic::catch_unwind(|| {
            let _guard = Scope::enter(Arc::new(alice()), Origin::default());
            panic!("scope body failed");
        });

        assert!(result.is_err());
        assert!(matches!(
            current_actor(),
            Err(VestigeError::NoActiveScope)
        ));
    }

    #[test]
    fn tokens_are_unique_per_scope() {
        let first = Scope::enter(Arc::new(alice()), Origin::default());
        let second = Scope::enter(Arc::new(alice()), Origin::default());

        assert_ne!(first.token(), second.token());
    }

    #[test]
    fn disable_nests_and_restores() {
        assert!(!is_disabled());
        {
            let _outer = Scope::disable();
            assert!(is_disabled());
            {
                let _inner = Scope::disable();
                assert!(is_disabled());
            }
            assert!(is_disabled());
        }
        assert!(!is_disabled());
    }

    #[test]
    fn scopes_are_isolated_per_thread() {
        let _guard = Scope::enter(Arc::new(alice()), Origin::new("10.0.0.1", 443));

        std::thread::spawn(|| {
            assert!(matches!(
                current_actor(),
                Err(VestigeError::NoActiveScope)
            ));
        })
        .join()
        .unwrap();

        assert_eq!(current_actor().unwrap(), alice());
    }
}
