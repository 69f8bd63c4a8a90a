//! Token-keyed attribution dispatch.
//!
//! The registry of active `token -> handler` bindings is the only
//! process-wide mutable state in the crate. Handlers are registered on
//! scope entry and removed on scope exit; at fire time every handler
//! compares its own token against the live scope's token, so handlers
//! from interleaved scopes never attribute each other's records.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex, PoisonError};

use crate::core::models::actor::Actor;
use crate::core::models::change_record::ChangeRecord;
use crate::core::scope::{self, Origin, ScopeToken};
use crate::core::traits::principal::PrincipalResolver;

static HANDLERS: LazyLock<Mutex<HashMap<ScopeToken, AttributionHandler>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Captured attribution state for one scope, applied to records
/// created while that scope is the active one.
#[derive(Clone)]
struct AttributionHandler {
    token: ScopeToken,
    resolver: Arc<dyn PrincipalResolver>,
    origin: Origin,
}

impl AttributionHandler {
    /// Attribute `record` if this handler's scope is the live one.
    ///
    /// A token mismatch is the expected steady state when several
    /// scopes are active in the process; it is silently skipped. On a
    /// match, `source` is only filled when unset and when the lazily
    /// resolved actor is a real principal; origin metadata is copied
    /// unconditionally.
    fn apply(&self, active: ScopeToken, record: &mut ChangeRecord) {
        if self.token != active {
            tracing::trace!(handler = ?self.token, ?active, "token mismatch, skipping handler");
            return;
        }

        if record.source.is_none()
            && let Actor::Resolved(principal) = self.resolver.resolve()
        {
            record.source_email = principal.email.clone();
            record.source = Some(principal);
        }

        record.remote_addr = self.origin.address.clone();
        record.remote_port = self.origin.port;
    }
}

fn registry() -> std::sync::MutexGuard<'static, HashMap<ScopeToken, AttributionHandler>> {
    HANDLERS.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Bind an attribution handler to `token`. Called on scope entry.
pub(crate) fn register(token: ScopeToken, resolver: Arc<dyn PrincipalResolver>, origin: Origin) {
    registry().insert(
        token,
        AttributionHandler {
            token,
            resolver,
            origin,
        },
    );
    tracing::debug!(?token, "registered attribution handler");
}

/// Remove the handler bound to `token`. Called on scope exit; a
/// missing binding is a no-op, not an error.
pub(crate) fn deregister(token: ScopeToken) {
    if registry().remove(&token).is_some() {
        tracing::debug!(?token, "deregistered attribution handler");
    }
}

/// Run every registered handler against an about-to-be-created record.
///
/// Outside any scope this is a no-op: the record stays unattributed.
/// The token check happens here, at creation time, so a record created
/// just before its scope exits still receives correct attribution.
pub fn apply_attribution(record: &mut ChangeRecord) {
    let Some(active) = scope::current_token() else {
        return;
    };

    // Snapshot under the lock, fire outside it: resolving the actor
    // may be arbitrarily slow and must not block other scopes'
    // registration.
    let handlers: Vec<AttributionHandler> = registry().values().cloned().collect();
    for handler in handlers {
        handler.apply(active, record);
    }
}

#[cfg(test)]
pub(crate) fn is_registered(token: ScopeToken) -> bool {
    registry().contains_key(&token)
}
