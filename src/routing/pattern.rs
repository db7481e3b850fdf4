//! Route templates.
//!
//! A template such as `/users/:id/files/:name.:ext` is split into literal
//! fragments and named parameters. A parameter starts after a break
//! character followed by `:` and its name runs up to the next break
//! character. While matching, a parameter consumes path bytes until the byte
//! that followed its name in the template (`/` when the name ends the
//! template).
//!
//! A trailing `/*` turns the template into a prefix match. Whatever is left
//! of the path after the last literal binds to `*`, leading slash included.

use std::collections::HashMap;
use std::fmt;

use crate::error::Error;

/// Characters that end a parameter name. `/` separates path segments, `.`
/// usually starts a file extension and `;`/`,` are the sub-delimiters
/// RFC 3986 section 3.3 suggests for path parameters.
pub const BREAK_CHARS: &[u8] = b"/.;,";

/// Name under which a prefix pattern binds the unmatched remainder.
pub const WILDCARD: &str = "*";

fn is_break(b: u8) -> bool {
    BREAK_CHARS.contains(&b)
}

/// A compiled route template.
///
/// There is always exactly one more literal than there are parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    raw: String,
    literals: Vec<String>,
    params: Vec<String>,
    breaks: Vec<u8>,
    wildcard: bool,
}

impl Pattern {
    /// Compile a template.
    pub fn parse(template: &str) -> Result<Pattern, Error> {
        if template.is_empty() {
            return Err(Error::configuration(template, "template is empty"));
        }
        if !template.starts_with('/') {
            return Err(Error::configuration(template, "template must start with '/'"));
        }

        let wildcard = template.ends_with("/*");
        let body = if wildcard {
            &template[..template.len() - 1]
        } else {
            template
        };

        let bytes = body.as_bytes();
        let mut literals = Vec::new();
        let mut params: Vec<String> = Vec::new();
        let mut breaks = Vec::new();
        let mut literal_start = 0;
        let mut i = 0;

        while i + 1 < bytes.len() {
            if is_break(bytes[i]) && bytes[i + 1] == b':' {
                let name_start = i + 2;
                let name_end = bytes[name_start..]
                    .iter()
                    .position(|b| is_break(*b))
                    .map_or(bytes.len(), |n| name_start + n);

                if name_end > name_start {
                    let name = &body[name_start..name_end];
                    if params.iter().any(|p| p == name) {
                        return Err(Error::configuration(template, "duplicate parameter name"));
                    }
                    // The literal keeps the break character but drops the colon.
                    literals.push(body[literal_start..=i].to_string());
                    params.push(name.to_string());
                    breaks.push(bytes.get(name_end).copied().unwrap_or(b'/'));
                    literal_start = name_end;
                    i = name_end;
                    continue;
                }
            }
            i += 1;
        }
        literals.push(body[literal_start..].to_string());

        Ok(Pattern {
            raw: template.to_string(),
            literals,
            params,
            breaks,
            wildcard,
        })
    }

    /// The template this pattern was compiled from.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Literal text every matching path starts with.
    pub fn prefix(&self) -> &str {
        &self.literals[0]
    }

    /// Parameter names in template order.
    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn is_wildcard(&self) -> bool {
        self.wildcard
    }

    /// Structural check only; never allocates.
    pub fn is_match(&self, path: &str) -> bool {
        self.walk(path, |_, _| {})
    }

    /// Match `path`, returning the parameter bindings on success.
    ///
    /// A dry run checks the structure first so that a miss never allocates.
    pub fn matches(&self, path: &str) -> Option<Params> {
        if !self.is_match(path) {
            return None;
        }

        let capacity = self.params.len() + usize::from(self.wildcard);
        let mut bindings = HashMap::with_capacity(capacity);
        self.walk(path, |name, value| {
            bindings.insert(name.to_string(), value.to_string());
        });
        Some(Params(bindings))
    }

    fn walk<'p>(&self, path: &'p str, mut bind: impl FnMut(&str, &'p str)) -> bool {
        let mut rest = path;

        for (i, name) in self.params.iter().enumerate() {
            rest = match rest.strip_prefix(self.literals[i].as_str()) {
                Some(r) => r,
                None => return false,
            };

            let stop = self.breaks[i];
            let len = rest.bytes().position(|b| b == stop).unwrap_or(rest.len());
            // Empty values never match, otherwise "/:id" would match "/".
            if len == 0 {
                return false;
            }
            bind(name, &rest[..len]);
            rest = &rest[len..];
        }

        let tail = self.literals[self.params.len()].as_str();
        if self.wildcard {
            if !rest.starts_with(tail) {
                return false;
            }
            // tail always ends in '/'; keep that slash in the remainder.
            bind(WILDCARD, &rest[tail.len() - 1..]);
            true
        } else {
            rest == tail
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pattern({:?})", self.raw)
    }
}

/// Values bound by a successful match, keyed by parameter name.
///
/// A fresh set is built for every matched request and attached to that
/// request's context only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(HashMap<String, String>);

impl Params {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// The remainder bound by a prefix pattern.
    pub fn wildcard(&self) -> Option<&str> {
        self.get(WILDCARD)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Params(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
