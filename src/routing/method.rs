//! HTTP method bitmasks.
//!
//! Each route carries a `MethodSet`. Dispatch checks the request's method
//! with a single AND, and method-mismatching routes are OR-ed together to
//! build the `Allow` set for 405 and `OPTIONS` answers.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use axum::http::Method;

/// A set of HTTP methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MethodSet(u16);

impl MethodSet {
    pub const EMPTY: MethodSet = MethodSet(0);
    pub const CONNECT: MethodSet = MethodSet(1 << 0);
    pub const DELETE: MethodSet = MethodSet(1 << 1);
    pub const GET: MethodSet = MethodSet(1 << 2);
    pub const HEAD: MethodSet = MethodSet(1 << 3);
    pub const OPTIONS: MethodSet = MethodSet(1 << 4);
    pub const PATCH: MethodSet = MethodSet(1 << 5);
    pub const POST: MethodSet = MethodSet(1 << 6);
    pub const PUT: MethodSet = MethodSet(1 << 7);
    pub const TRACE: MethodSet = MethodSet(1 << 8);
    /// Any method outside the nine above (extension methods).
    pub const OTHER: MethodSet = MethodSet(1 << 9);
    pub const ALL: MethodSet = MethodSet((1 << 10) - 1);

    const NAMED: [(MethodSet, &'static str); 9] = [
        (MethodSet::CONNECT, "CONNECT"),
        (MethodSet::DELETE, "DELETE"),
        (MethodSet::GET, "GET"),
        (MethodSet::HEAD, "HEAD"),
        (MethodSet::OPTIONS, "OPTIONS"),
        (MethodSet::PATCH, "PATCH"),
        (MethodSet::POST, "POST"),
        (MethodSet::PUT, "PUT"),
        (MethodSet::TRACE, "TRACE"),
    ];

    /// The single-bit set for a request method.
    pub fn of(method: &Method) -> MethodSet {
        Self::NAMED
            .iter()
            .find(|(_, name)| *name == method.as_str())
            .map(|(set, _)| *set)
            .unwrap_or(MethodSet::OTHER)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, other: MethodSet) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn intersects(self, other: MethodSet) -> bool {
        self.0 & other.0 != 0
    }

    /// Names of the standard methods in the set, in a stable order.
    pub fn names(self) -> impl Iterator<Item = &'static str> {
        Self::NAMED
            .iter()
            .filter(move |(set, _)| self.intersects(*set))
            .map(|(_, name)| *name)
    }

    /// Render the set as the value of an `Allow` header.
    pub fn to_allow_header(self) -> String {
        self.names().collect::<Vec<_>>().join(", ")
    }
}

impl BitOr for MethodSet {
    type Output = MethodSet;

    fn bitor(self, rhs: MethodSet) -> MethodSet {
        MethodSet(self.0 | rhs.0)
    }
}

impl BitOrAssign for MethodSet {
    fn bitor_assign(&mut self, rhs: MethodSet) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for MethodSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == MethodSet::ALL {
            return f.write_str("*");
        }
        f.write_str(&self.to_allow_header())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_and_extension_methods() {
        assert_eq!(MethodSet::of(&Method::GET), MethodSet::GET);
        assert_eq!(MethodSet::of(&Method::TRACE), MethodSet::TRACE);

        let purge = Method::from_bytes(b"PURGE").unwrap();
        assert_eq!(MethodSet::of(&purge), MethodSet::OTHER);
        assert!(MethodSet::ALL.contains(MethodSet::OTHER));
    }

    #[test]
    fn test_allow_header_order() {
        let set = MethodSet::PUT | MethodSet::GET | MethodSet::DELETE;
        assert_eq!(set.to_allow_header(), "DELETE, GET, PUT");
        assert_eq!(MethodSet::EMPTY.to_allow_header(), "");
    }
}
