/// Router Module Index
///
/// Routes are split by access level so authentication is applied once, as a layer,
/// rather than remembered per handler.

/// Routes reachable without a token: registration and login.
pub mod public;

/// Routes behind the `AuthUser` middleware: notes, folders, tags, token refresh.
pub mod authenticated;
