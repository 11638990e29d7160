use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::RouteError;
use crate::models::{Capability, ComponentRef, RouteDescriptor, RouteMeta};
use crate::table::RouteTable;

/// RouteLayer
///
/// One versioned revision of the route configuration. Layers are applied on
/// top of each other instead of duplicating whole table literals:
/// - `remove` drops routes by name,
/// - `routes` replaces a route with the same name in place, or appends it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteLayer {
    pub version: u32,
    #[serde(default)]
    pub routes: Vec<RouteDescriptor>,
    #[serde(default)]
    pub remove: Vec<String>,
}

impl RouteLayer {
    pub fn from_json(json: &str) -> Result<Self, RouteError> {
        serde_json::from_str(json).map_err(|e| RouteError::Config(e.to_string()))
    }

    /// Reads an override layer from a JSON file.
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self, RouteError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| RouteError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&contents)
    }
}

/// base_revision
///
/// The portal's route set: the home page needs a user, login and signup are
/// lazily loaded public pages, and the profile requires an authenticated
/// session.
pub fn base_revision() -> RouteLayer {
    RouteLayer {
        version: 1,
        routes: vec![
            RouteDescriptor::new("/", "home", ComponentRef::eager("Home"))
                .with_meta(RouteMeta::new().with_flag(Capability::NeedsUser.flag(), true)),
            RouteDescriptor::new("/login", "login", ComponentRef::lazy("Login", "login")),
            RouteDescriptor::new("/signup", "signup", ComponentRef::lazy("Signup", "signup")),
            RouteDescriptor::new("/profile", "profile", ComponentRef::eager("Profile"))
                .with_meta(RouteMeta::new().with_flag(Capability::RequiresAuth.flag(), true)),
        ],
        remove: Vec::new(),
    }
}

/// RouteTableBuilder
///
/// Folds route layers, in order, into a validated `RouteTable`.
#[derive(Debug, Default)]
pub struct RouteTableBuilder {
    version: u32,
    routes: Vec<RouteDescriptor>,
}

impl RouteTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from the portal's base revision.
    pub fn portal() -> Result<Self, RouteError> {
        Self::new().layer(base_revision())
    }

    pub fn layer(mut self, layer: RouteLayer) -> Result<Self, RouteError> {
        if layer.version < self.version {
            return Err(RouteError::StaleRevision {
                current: self.version,
                layer: layer.version,
            });
        }

        self.routes
            .retain(|route| !layer.remove.contains(&route.name));

        for route in layer.routes {
            match self.routes.iter_mut().find(|r| r.name == route.name) {
                Some(existing) => *existing = route,
                None => self.routes.push(route),
            }
        }

        self.version = layer.version;
        tracing::debug!(version = self.version, routes = self.routes.len(), "route layer applied");
        Ok(self)
    }

    pub fn build(self) -> Result<RouteTable, RouteError> {
        RouteTable::new(self.version, self.routes)
    }
}
