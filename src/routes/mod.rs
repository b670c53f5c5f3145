/// Router Module Index
///
/// Routes are split by access level so the session requirement is applied once, as a
/// layer, instead of being remembered per handler.

/// Routes open to anonymous clients: read-only catalogue access and account entry points.
pub mod public;

/// Routes wrapped in the session middleware. Requests without a valid session are
/// answered with 401 before any handler runs.
pub mod authenticated;
