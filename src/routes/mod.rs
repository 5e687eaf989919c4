/// Router Module Index
///
/// One router per resource, each mounted under its own prefix by
/// `create_router`. Routers carry no access-control layers: every mutating
/// handler names its policy in its signature (`Guarded<ModeratorOnly>`,
/// `Guarded<AdminOnly>`), so the permission is visible at the handler.
pub mod auth;
pub mod categories;
pub mod products;
pub mod roles;
pub mod users;
