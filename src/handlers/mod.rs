//! HTTP handlers, one module per resource.
//!
//! Every handler follows the same shape: guards run as extractors, then the
//! repository, then an `ApiResponse` envelope (or an `ApiError`).

pub mod auth;
pub mod categories;
pub mod products;
pub mod roles;
pub mod users;
