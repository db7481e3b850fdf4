//! Dispatch automaton.
//!
//! # States
//! ```text
//! scanning ──compare hit──▶ scanning (cursor advanced)
//!    │ └─compare miss──▶ jump forward │ terminal-fail
//!    └──route terminal──▶ method check ──hit──▶ terminal-match
//!                                  └──miss──▶ record methods, scanning
//! ```
//! The program counter only ever moves forward, so a lookup runs at most
//! once through the program.

use std::sync::Arc;

use crate::routing::method::MethodSet;
use crate::routing::pattern::Params;
use crate::routing::table::{Route, RouteTable};

/// Maximum number of literal bytes in one compare.
pub const MAX_COMPARE: usize = 3;

/// Where a failed compare goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Jump {
    To(usize),
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// Move the scan cursor to an absolute path offset.
    SetCursor(usize),
    /// Compare `len` bytes at the cursor; advance on a hit.
    Compare {
        bytes: [u8; MAX_COMPARE],
        len: u8,
        on_mismatch: Jump,
    },
    /// Try the route at this table index.
    Route(usize),
}

/// Outcome of a lookup.
#[derive(Debug)]
pub enum Resolution<'a> {
    Matched {
        route: &'a Arc<Route>,
        params: Params,
    },
    /// No route took the request. `allowed` holds the methods of routes
    /// whose pattern matched the path; empty means the path itself is
    /// unknown.
    Unmatched { allowed: MethodSet },
}

/// A compiled, immutable route program together with the table snapshot its
/// route indexes refer to.
#[derive(Debug)]
pub struct Automaton {
    program: Vec<Instruction>,
    table: RouteTable,
}

impl Automaton {
    pub(crate) fn new(program: Vec<Instruction>, table: RouteTable) -> Self {
        Self { program, table }
    }

    pub fn program(&self) -> &[Instruction] {
        &self.program
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// Find the route for `method` and `path`.
    pub fn route(&self, method: MethodSet, path: &str) -> Resolution<'_> {
        let bytes = path.as_bytes();
        let mut allowed = MethodSet::EMPTY;
        let mut cursor = 0;
        let mut pc = 0;

        while let Some(instruction) = self.program.get(pc) {
            match *instruction {
                Instruction::SetCursor(offset) => {
                    cursor = offset.min(bytes.len());
                    pc += 1;
                }
                Instruction::Compare {
                    bytes: literal,
                    len,
                    on_mismatch,
                } => {
                    let len = usize::from(len);
                    let hit = bytes
                        .get(cursor..cursor + len)
                        .is_some_and(|window| window == &literal[..len]);
                    if hit {
                        cursor += len;
                        pc += 1;
                    } else {
                        match on_mismatch {
                            Jump::To(target) => pc = target,
                            Jump::Fail => break,
                        }
                    }
                }
                Instruction::Route(index) => {
                    if let Some(route) = self.table.get(index) {
                        if route.methods().intersects(method) {
                            if let Some(params) = route.pattern().matches(path) {
                                return Resolution::Matched { route, params };
                            }
                        } else if route.pattern().is_match(path) {
                            allowed |= route.methods();
                        }
                    }
                    pc += 1;
                }
            }
        }

        Resolution::Unmatched { allowed }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{handler_fn, Context, Request, ResponseWriter};
    use crate::routing::compiler::compile;
    use crate::routing::pattern::Pattern;

    fn build(routes: &[(&str, MethodSet)]) -> Automaton {
        let table = routes.iter().fold(RouteTable::new(), |t, (template, methods)| {
            let noop = handler_fn(|_: &Context, _: &mut ResponseWriter, _: &Request| {});
            t.with_route(Route::new(
                Pattern::parse(template).unwrap(),
                *methods,
                Arc::new(noop),
            ))
        });
        compile(&table)
    }

    fn matched<'a>(resolution: &'a Resolution<'_>) -> Option<(&'a str, &'a Params)> {
        match resolution {
            Resolution::Matched { route, params } => Some((route.pattern().as_str(), params)),
            Resolution::Unmatched { .. } => None,
        }
    }

    fn allowed(resolution: &Resolution<'_>) -> Option<MethodSet> {
        match resolution {
            Resolution::Unmatched { allowed } => Some(*allowed),
            Resolution::Matched { .. } => None,
        }
    }

    #[test]
    fn test_empty_automaton_misses() {
        let automaton = build(&[]);
        let r = automaton.route(MethodSet::GET, "/");
        assert_eq!(allowed(&r), Some(MethodSet::EMPTY));
    }

    #[test]
    fn test_matches_and_binds() {
        let automaton = build(&[
            ("/hello/:name", MethodSet::GET),
            ("/users/:id/posts/:post", MethodSet::GET),
            ("/users", MethodSet::GET),
        ]);

        let r = automaton.route(MethodSet::GET, "/users/7/posts/99");
        let (template, params) = matched(&r).unwrap();
        assert_eq!(template, "/users/:id/posts/:post");
        assert_eq!(params.get("id"), Some("7"));
        assert_eq!(params.get("post"), Some("99"));

        let r = automaton.route(MethodSet::GET, "/users");
        assert_eq!(matched(&r).unwrap().0, "/users");

        let r = automaton.route(MethodSet::GET, "/hello");
        assert_eq!(allowed(&r), Some(MethodSet::EMPTY));
    }

    #[test]
    fn test_short_path_does_not_overrun() {
        let automaton = build(&[("/abcdef", MethodSet::GET), ("/a", MethodSet::GET)]);
        assert_eq!(matched(&automaton.route(MethodSet::GET, "/a")).unwrap().0, "/a");
        assert!(matched(&automaton.route(MethodSet::GET, "/abc")).is_none());
        assert!(matched(&automaton.route(MethodSet::GET, "")).is_none());
    }

    #[test]
    fn test_method_mismatch_accumulates() {
        let automaton = build(&[
            ("/things/:id", MethodSet::GET),
            ("/things/:id", MethodSet::PUT),
            ("/things/:id", MethodSet::DELETE),
            ("/things", MethodSet::POST),
        ]);

        let r = automaton.route(MethodSet::OPTIONS, "/things/3");
        assert_eq!(
            allowed(&r),
            Some(MethodSet::GET | MethodSet::PUT | MethodSet::DELETE)
        );

        let r = automaton.route(MethodSet::POST, "/things/3");
        assert_eq!(
            allowed(&r),
            Some(MethodSet::GET | MethodSet::PUT | MethodSet::DELETE)
        );

        let r = automaton.route(MethodSet::PUT, "/things/3");
        assert!(matched(&r).is_some());
    }

    #[test]
    fn test_first_registered_wins_within_prefix_group() {
        let automaton = build(&[
            ("/files/:name", MethodSet::GET),
            ("/files/:other", MethodSet::GET),
        ]);
        let r = automaton.route(MethodSet::GET, "/files/a.txt");
        let (template, params) = matched(&r).unwrap();
        assert_eq!(template, "/files/:name");
        assert_eq!(params.get("name"), Some("a.txt"));
    }

    #[test]
    fn test_falls_through_to_later_branches() {
        let automaton = build(&[
            ("/api/v1/status", MethodSet::GET),
            ("/api/:version/items", MethodSet::GET),
            ("/:page", MethodSet::GET),
            ("/api/*", MethodSet::GET),
        ]);

        let r = automaton.route(MethodSet::GET, "/api/v2/items");
        assert_eq!(matched(&r).unwrap().0, "/api/:version/items");

        let r = automaton.route(MethodSet::GET, "/api/v1/other");
        let (template, params) = matched(&r).unwrap();
        assert_eq!(template, "/api/*");
        assert_eq!(params.wildcard(), Some("/v1/other"));

        let r = automaton.route(MethodSet::GET, "/about");
        assert_eq!(matched(&r).unwrap().0, "/:page");
    }
}
