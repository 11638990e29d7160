/// Router Module Index
///
/// The service exposes a single public surface: access control for pages is
/// decided per navigation by the guard, not by axum layers.

/// Routes accessible to all clients (anonymous or signed in).
pub mod public;
