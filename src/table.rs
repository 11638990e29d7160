//! Route table and path matching.
//!
//! Patterns are split on `/` into segments:
//! - `name`   static segment, compared case-sensitively
//! - `:id`    one non-empty segment, captured as a parameter
//! - `:rest*` the remaining segments (possibly none); must be last
//!
//! When several patterns match, a pattern without a catch-all wins over one
//! with a catch-all, then segments are ranked left to right (static over
//! parameter over catch-all). Equal specificity falls back to table order.
//!
//! Request paths arrive percent-encoded. Each segment is decoded before it is
//! compared or captured, so parameters hold decoded values; concrete paths
//! produced by the table are always encoded again.

use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::error::RouteError;
use crate::models::RouteDescriptor;

pub type Params = BTreeMap<String, String>;

/// Characters escaped inside one path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Static(String),
    Param(String),
    CatchAll(String),
}

impl Segment {
    fn rank(&self) -> u8 {
        match self {
            Segment::Static(_) => 3,
            Segment::Param(_) => 2,
            Segment::CatchAll(_) => 1,
        }
    }
}

/// A parsed route path pattern.
#[derive(Debug, Clone)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    pub fn parse(raw: &str) -> Result<Self, RouteError> {
        let invalid = |reason: &str| RouteError::InvalidPattern {
            path: raw.to_string(),
            reason: reason.to_string(),
        };

        if !raw.starts_with('/') {
            return Err(invalid("must start with '/'"));
        }

        let parts: Vec<&str> = split_segments(raw).collect();
        let mut segments = Vec::with_capacity(parts.len());
        for (index, part) in parts.iter().enumerate() {
            let segment = match part.strip_prefix(':') {
                Some(param) => match param.strip_suffix('*') {
                    Some(rest) => {
                        if index + 1 != parts.len() {
                            return Err(invalid("catch-all must be the last segment"));
                        }
                        Segment::CatchAll(rest.to_string())
                    }
                    None => Segment::Param(param.to_string()),
                },
                None => Segment::Static(decode_segment(part).into_owned()),
            };
            if let Segment::Param(name) | Segment::CatchAll(name) = &segment {
                if name.is_empty() {
                    return Err(invalid("parameter name is empty"));
                }
            }
            segments.push(segment);
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    fn has_catch_all(&self) -> bool {
        matches!(self.segments.last(), Some(Segment::CatchAll(_)))
    }

    fn specificity(&self) -> (bool, Vec<u8>) {
        (
            !self.has_catch_all(),
            self.segments.iter().map(Segment::rank).collect(),
        )
    }

    /// Matches already-split path segments, returning captured parameters.
    fn matches(&self, parts: &[Cow<'_, str>]) -> Option<Params> {
        let mut params = Params::new();
        for (index, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::CatchAll(name) => {
                    params.insert(name.clone(), parts.get(index..)?.join("/"));
                    return Some(params);
                }
                Segment::Static(expected) => {
                    if *parts.get(index)? != *expected {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    params.insert(name.clone(), parts.get(index)?.to_string());
                }
            }
        }
        // Without a catch-all the whole path must be consumed, so `/` only
        // matches an empty remainder.
        (parts.len() == self.segments.len()).then_some(params)
    }

    fn build(&self, route: &str, params: &Params) -> Result<String, RouteError> {
        let mut path = String::new();
        for segment in &self.segments {
            let missing = |param: &String| RouteError::MissingParam {
                name: route.to_string(),
                param: param.clone(),
            };
            // A catch-all value spans several segments; anything else is one.
            let pieces: Vec<&str> = match segment {
                Segment::Static(value) => vec![value.as_str()],
                Segment::Param(param) => {
                    vec![params.get(param).map(String::as_str).ok_or_else(|| missing(param))?]
                }
                Segment::CatchAll(param) => params
                    .get(param)
                    .ok_or_else(|| missing(param))?
                    .split('/')
                    .collect(),
            };
            for piece in pieces.into_iter().filter(|piece| !piece.is_empty()) {
                path.push('/');
                path.extend(utf8_percent_encode(piece, SEGMENT));
            }
        }
        if path.is_empty() {
            path.push('/');
        }
        Ok(path)
    }
}

fn decode_segment(segment: &str) -> Cow<'_, str> {
    percent_decode_str(segment).decode_utf8_lossy()
}

/// Splits a path into its non-empty segments, ignoring query and fragment.
fn split_segments(path: &str) -> impl Iterator<Item = &str> {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    path[..end].split('/').filter(|part| !part.is_empty())
}

/// The result of resolving a path: the descriptor, its captured parameters
/// and the concrete path that was navigated to.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedRoute {
    pub route: Arc<RouteDescriptor>,
    pub params: Params,
    pub path: String,
}

impl MatchedRoute {
    pub fn name(&self) -> &str {
        &self.route.name
    }
}

#[derive(Debug)]
struct Entry {
    descriptor: Arc<RouteDescriptor>,
    pattern: PathPattern,
}

/// RouteTable
///
/// Immutable, ordered set of route descriptors. Built once at startup and
/// shared behind an `Arc`.
#[derive(Debug)]
pub struct RouteTable {
    version: u32,
    entries: Vec<Entry>,
    by_name: HashMap<String, usize>,
}

impl RouteTable {
    pub fn new(version: u32, routes: Vec<RouteDescriptor>) -> Result<Self, RouteError> {
        let mut entries = Vec::with_capacity(routes.len());
        let mut by_name = HashMap::with_capacity(routes.len());

        for descriptor in routes {
            if descriptor.name.trim().is_empty() {
                return Err(RouteError::EmptyName(descriptor.path));
            }
            if by_name.contains_key(&descriptor.name) {
                return Err(RouteError::DuplicateName(descriptor.name));
            }
            let pattern = PathPattern::parse(&descriptor.path)?;
            by_name.insert(descriptor.name.clone(), entries.len());
            entries.push(Entry {
                descriptor: Arc::new(descriptor),
                pattern,
            });
        }

        Ok(Self {
            version,
            entries,
            by_name,
        })
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Descriptors in table order.
    pub fn routes(&self) -> impl Iterator<Item = &Arc<RouteDescriptor>> {
        self.entries.iter().map(|entry| &entry.descriptor)
    }

    pub fn by_name(&self, name: &str) -> Option<&Arc<RouteDescriptor>> {
        self.by_name
            .get(name)
            .map(|&index| &self.entries[index].descriptor)
    }

    /// Resolves a concrete path to the single best-matching route.
    pub fn resolve(&self, path: &str) -> Result<MatchedRoute, RouteError> {
        let parts: Vec<Cow<'_, str>> = split_segments(path).map(decode_segment).collect();

        let mut best: Option<(&Entry, Params, (bool, Vec<u8>))> = None;
        for entry in &self.entries {
            let Some(params) = entry.pattern.matches(&parts) else {
                continue;
            };
            let specificity = entry.pattern.specificity();
            // Strictly greater only: earlier entries win ties.
            let better = best
                .as_ref()
                .is_none_or(|(_, _, current)| specificity > *current);
            if better {
                best = Some((entry, params, specificity));
            }
        }

        let (entry, params, _) = best.ok_or_else(|| RouteError::NotFound(path.to_string()))?;
        tracing::debug!(path, route = %entry.descriptor.name, pattern = entry.pattern.as_str(), "path resolved");

        Ok(MatchedRoute {
            route: entry.descriptor.clone(),
            params,
            path: canonical_path(&parts),
        })
    }

    /// Resolves a route by name, for redirects. The route's pattern must not
    /// need any parameters.
    pub fn resolve_named(&self, name: &str) -> Result<MatchedRoute, RouteError> {
        let path = self.build_path(name, &Params::new())?;
        let entry = &self.entries[self.by_name[name]];
        Ok(MatchedRoute {
            route: entry.descriptor.clone(),
            params: Params::new(),
            path,
        })
    }

    /// Builds the concrete path of a named route from parameter values.
    pub fn build_path(&self, name: &str, params: &Params) -> Result<String, RouteError> {
        let index = *self
            .by_name
            .get(name)
            .ok_or_else(|| RouteError::UnknownName(name.to_string()))?;
        self.entries[index].pattern.build(name, params)
    }
}

fn canonical_path(parts: &[Cow<'_, str>]) -> String {
    let mut path = String::from("/");
    for (index, part) in parts.iter().enumerate() {
        if index > 0 {
            path.push('/');
        }
        path.extend(utf8_percent_encode(part, SEGMENT));
    }
    path
}
