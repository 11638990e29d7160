use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::MetaError;

// --- Route Configuration Schemas ---

/// Capability
///
/// A requirement a route places on the session before it may be entered.
/// Each capability is declared through a boolean flag in the route's `meta`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// `needsUser`: any signed-in user, verified or not.
    NeedsUser,
    /// `requiresAuth`: a user whose session is backed by a validated token.
    RequiresAuth,
}

impl Capability {
    pub const ALL: [Capability; 2] = [Capability::NeedsUser, Capability::RequiresAuth];

    /// The `meta` key that declares this capability.
    pub fn flag(self) -> &'static str {
        match self {
            Capability::NeedsUser => "needsUser",
            Capability::RequiresAuth => "requiresAuth",
        }
    }

    /// Whether the given session user satisfies this capability.
    pub fn is_satisfied_by(self, user: Option<&SessionUser>) -> bool {
        match self {
            Capability::NeedsUser => user.is_some(),
            Capability::RequiresAuth => user.is_some_and(|u| u.verified),
        }
    }
}

/// RouteMeta
///
/// Free-form flag mapping attached to a route. Values are kept raw so that a
/// malformed flag can be told apart from a missing one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RouteMeta(#[ts(type = "Record<string, unknown>")] pub BTreeMap<String, Value>);

impl RouteMeta {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder helper used by route revisions and tests.
    pub fn with_flag(mut self, flag: &str, value: bool) -> Self {
        self.0.insert(flag.to_string(), Value::Bool(value));
        self
    }

    /// Reads a boolean flag. Missing flags (and explicit nulls) read as false.
    pub fn flag(&self, flag: &str) -> Result<bool, MetaError> {
        match self.0.get(flag) {
            None | Some(Value::Null) => Ok(false),
            Some(Value::Bool(value)) => Ok(*value),
            Some(other) => Err(MetaError::NotBoolean {
                flag: flag.to_string(),
                found: other.to_string(),
            }),
        }
    }

    /// Every capability whose flag is set to true.
    pub fn required_capabilities(&self) -> Result<Vec<Capability>, MetaError> {
        let mut required = Vec::new();
        for capability in Capability::ALL {
            if self.flag(capability.flag())? {
                required.push(capability);
            }
        }
        Ok(required)
    }
}

/// ComponentRef
///
/// Reference to the view a route renders. Lazy views live in a separately
/// fetched chunk and are only materialized on first navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(tag = "load", rename_all = "lowercase")]
#[ts(export)]
pub enum ComponentRef {
    Eager { view: String },
    Lazy { view: String, chunk: String },
}

impl ComponentRef {
    pub fn eager(view: &str) -> Self {
        ComponentRef::Eager {
            view: view.to_string(),
        }
    }

    pub fn lazy(view: &str, chunk: &str) -> Self {
        ComponentRef::Lazy {
            view: view.to_string(),
            chunk: chunk.to_string(),
        }
    }

    pub fn view(&self) -> &str {
        match self {
            ComponentRef::Eager { view } | ComponentRef::Lazy { view, .. } => view,
        }
    }
}

/// RouteDescriptor
///
/// One entry of the route table: a path pattern mapped to a named view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RouteDescriptor {
    /// Pattern such as `/`, `/projects/:id` or `/docs/:rest*`.
    pub path: String,
    /// Unique across the table; redirects target routes by name.
    pub name: String,
    pub component: ComponentRef,
    /// Missing or `null` reads as an empty mapping.
    #[serde(default, deserialize_with = "meta_or_default")]
    #[schema(value_type = Object)]
    pub meta: RouteMeta,
}

fn meta_or_default<'de, D>(deserializer: D) -> Result<RouteMeta, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<RouteMeta>::deserialize(deserializer)?.unwrap_or_default())
}

impl RouteDescriptor {
    pub fn new(path: &str, name: &str, component: ComponentRef) -> Self {
        Self {
            path: path.to_string(),
            name: name.to_string(),
            component,
            meta: RouteMeta::new(),
        }
    }

    pub fn with_meta(mut self, meta: RouteMeta) -> Self {
        self.meta = meta;
        self
    }
}

// --- Session & Navigation Schemas ---

/// SessionUser
///
/// The externally owned "current user". `verified` is only true when the
/// session was established from a validated token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SessionUser {
    pub id: Uuid,
    pub verified: bool,
}

/// NavigationOutcome
///
/// The single decision a guard makes for one navigation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(tag = "action", rename_all = "lowercase")]
#[ts(export)]
pub enum NavigationOutcome {
    Proceed,
    Redirect { name: String },
}

impl NavigationOutcome {
    pub fn is_redirect(&self) -> bool {
        matches!(self, NavigationOutcome::Redirect { .. })
    }
}

/// LoadedView
///
/// A materialized component: the view name and, for lazy views, the chunk
/// asset that was fetched for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoadedView {
    pub view: String,
    pub chunk: Option<String>,
    pub asset: Option<String>,
}

// --- Response Payloads (Output Schemas) ---

/// RouteTableView
///
/// Response for GET /routes.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RouteTableView {
    pub version: u32,
    pub routes: Vec<RouteDescriptor>,
}

/// NavigationResponse
///
/// Response for a completed navigation. `outcome` is what the guard decided
/// for the requested path; `route` is where the navigation finally landed.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct NavigationResponse {
    pub request_id: Uuid,
    pub outcome: NavigationOutcome,
    pub route: String,
    pub path: String,
    pub params: BTreeMap<String, String>,
    pub view: LoadedView,
}
