//! Request method metadata the request invariants depend on.

use http::Method;

/// How a request method treats a request entity.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RequestEntityAcceptance {
    /// The method is expected to carry an entity (POST, PUT, PATCH, ...)
    Expected,
    /// An entity has no defined semantics but is not forbidden (GET, DELETE)
    Tolerated,
    /// The method must not carry an entity (CONNECT, HEAD, TRACE)
    Disallowed,
}

/// Extension methods for [`http::Method`].
pub trait MethodExt {
    fn request_entity_acceptance(&self) -> RequestEntityAcceptance;

    /// Returns true if a request with this method may carry a non-empty entity.
    fn is_entity_accepted(&self) -> bool {
        self.request_entity_acceptance() != RequestEntityAcceptance::Disallowed
    }
}

impl MethodExt for Method {
    fn request_entity_acceptance(&self) -> RequestEntityAcceptance {
        match *self {
            Method::CONNECT | Method::HEAD | Method::TRACE => RequestEntityAcceptance::Disallowed,
            Method::GET | Method::DELETE => RequestEntityAcceptance::Tolerated,
            // extension methods are assumed to expect a body
            _ => RequestEntityAcceptance::Expected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_acceptance() {
        assert!(!Method::HEAD.is_entity_accepted());
        assert!(!Method::TRACE.is_entity_accepted());
        assert!(!Method::CONNECT.is_entity_accepted());
        assert!(Method::GET.is_entity_accepted());
        assert_eq!(Method::POST.request_entity_acceptance(), RequestEntityAcceptance::Expected);
        assert_eq!(Method::from_bytes(b"PURGE").unwrap().request_entity_acceptance(), RequestEntityAcceptance::Expected);
    }
}
