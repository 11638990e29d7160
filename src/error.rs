use thiserror::Error;

/// Errors raised while building or querying the route table.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// Two descriptors share the same `name`.
    #[error("duplicate route name: {0}")]
    DuplicateName(String),

    /// A descriptor was declared without a name.
    #[error("route for path {0} has an empty name")]
    EmptyName(String),

    /// The path pattern could not be parsed.
    #[error("invalid path pattern {path}: {reason}")]
    InvalidPattern { path: String, reason: String },

    /// No descriptor matches the requested path.
    #[error("no route matches path {0}")]
    NotFound(String),

    /// No descriptor carries the requested name.
    #[error("unknown route name: {0}")]
    UnknownName(String),

    /// A path could not be built because a parameter value was not supplied.
    #[error("route {name} needs a value for parameter {param}")]
    MissingParam { name: String, param: String },

    /// A configuration layer is older than the table it is applied to.
    #[error("route layer version {layer} is older than current revision {current}")]
    StaleRevision { current: u32, layer: u32 },

    /// A configuration layer could not be read or parsed.
    #[error("route configuration error: {0}")]
    Config(String),
}

/// A route's `meta` mapping held a value of the wrong shape.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MetaError {
    #[error("meta flag {flag} must be a boolean, found {found}")]
    NotBoolean { flag: String, found: String },
}

/// Errors raised while materializing a view component.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// The chunk is not part of the manifest.
    #[error("unknown view chunk: {0}")]
    UnknownChunk(String),

    /// The loader reached the chunk but could not fetch it.
    #[error("failed to load chunk {chunk}: {reason}")]
    Fetch { chunk: String, reason: String },
}

/// Errors that end a navigation attempt without committing it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NavigationError {
    #[error(transparent)]
    Route(#[from] RouteError),

    #[error(transparent)]
    Load(#[from] LoadError),

    /// Guards kept redirecting without settling on a route.
    #[error("navigation to {target} redirected more than {hops} times")]
    RedirectLoop { target: String, hops: usize },

    /// A newer navigation started before this one could commit.
    #[error("navigation was superseded by a newer request")]
    Superseded,
}
