use crate::core::models::actor::Actor;

/// Port supplying the current actor on demand.
///
/// Resolution is deferred to the moment a record is attributed, so
/// entering a scope never forces authentication state that the host
/// may not have established yet.
pub trait PrincipalResolver: Send + Sync {
    fn resolve(&self) -> Actor;
}

/// An already-resolved actor is its own resolver. Convenient when the
/// caller has the principal in hand at scope entry.
impl PrincipalResolver for Actor {
    fn resolve(&self) -> Actor {
        self.clone()
    }
}
