use serde::{Deserialize, Serialize};

/// A fully resolved principal that can be attributed as the source
/// of a change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    pub username: String,
    pub email: Option<String>,
}

/// The attributed cause of an operation.
///
/// Only `Resolved` carries a principal that may be written into a
/// record's `source`. `Anonymous` covers unauthenticated callers and
/// `System` covers background work with no acting user; neither ever
/// sets `source`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    Resolved(Principal),
    Anonymous,
    System,
}

impl Actor {
    /// The principal behind this actor, if one was resolved.
    pub fn principal(&self) -> Option<&Principal> {
        match self {
            Actor::Resolved(principal) => Some(principal),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_resolved_exposes_a_principal() {
        let alice = Actor::Resolved(Principal {
            id: "1".to_string(),
            username: "alice".to_string(),
            email: Some("alice@test.com".to_string()),
        });

        assert_eq!(alice.principal().map(|p| p.username.as_str()), Some("alice"));
        assert!(Actor::Anonymous.principal().is_none());
        assert!(Actor::System.principal().is_none());
    }
}
