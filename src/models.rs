use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::permissions::PermissionLevel;

// --- Stored Entities ---

/// Category
///
/// A product grouping. Deleting a category only raises `is_deleted`; the row
/// stays in the `categories` table and keeps resolving for products.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub is_deleted: bool,
}

/// Product
///
/// A catalog item as stored. `category` holds the id of the owning category.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub price: f64,
    pub quantity: i64,
    #[sqlx(rename = "category_id")]
    pub category: Uuid,
    pub is_deleted: bool,
}

/// CategoryRef
///
/// The slice of a category joined into product listings.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct CategoryRef {
    pub id: Uuid,
    pub name: String,
}

/// ProductListing
///
/// A product with its category's name populated, as returned by `GET /products`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProductListing {
    pub id: Uuid,
    pub name: String,
    pub price: f64,
    pub quantity: i64,
    pub category: CategoryRef,
    pub is_deleted: bool,
}

/// Role
///
/// A named role record. Names are unique; deletion is permanent.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub description: String,
}

/// User
///
/// An account record. `status == false` marks the account inactive, which is
/// also how deletion is represented. The password hash never leaves the server.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(skip)]
    pub password_hash: String,
    pub email: String,
    pub full_name: String,
    pub avatar_url: String,
    pub status: bool,
    #[sqlx(try_from = "String")]
    pub role: PermissionLevel,
    pub login_count: i64,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// UserDetails
///
/// A user with the role record whose name matches `user.role` joined in, when
/// such a record exists.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UserDetails {
    #[serde(flatten)]
    pub user: User,
    pub role_details: Option<Role>,
}

// --- Request Payloads ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
}

/// UpdateCategoryRequest
///
/// Only the name of a category can change.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[serde(deny_unknown_fields)]
#[ts(export)]
pub struct UpdateCategoryRequest {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
}

/// CreateProductRequest
///
/// `category` is the *name* of an existing category, resolved at write time.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0, message = "price must not be negative"))]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0, message = "quantity must not be negative"))]
    pub quantity: Option<i64>,
    #[validate(length(min = 1, message = "category is required"))]
    pub category: String,
}

/// UpdateProductRequest
///
/// Allow-list of product fields a moderator may change. Anything else in the
/// body (e.g. `isDeleted`, `id`) is rejected during deserialization.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[serde(deny_unknown_fields)]
#[ts(export)]
pub struct UpdateProductRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0, message = "price must not be negative"))]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0, message = "quantity must not be negative"))]
    pub quantity: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "category must not be empty"))]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct CreateRoleRequest {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// UpdateRoleRequest
///
/// Partial update: absent or empty fields leave the stored value untouched.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[serde(deny_unknown_fields)]
#[ts(export)]
pub struct UpdateRoleRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// CreateUserRequest
///
/// `role` defaults to `user`; `status` defaults to `false` (inactive).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, message = "username is required"))]
    pub username: String,
    #[validate(email(message = "email is invalid"))]
    pub email: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<PermissionLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<bool>,
}

/// UpdateUserRequest
///
/// Allow-list of account fields an admin may change. `status` and
/// `loginCount` are deliberately absent: deactivation goes through
/// `DELETE /users/{id}` and login counts are owned by the login flow.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
#[ts(export)]
pub struct UpdateUserRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "username must not be empty"))]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(email(message = "email is invalid"))]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "password must not be empty"))]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<PermissionLevel>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

// --- Repository Inputs ---

/// ProductQuery
///
/// Resolved listing filter: substring on name plus an inclusive price window.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductQuery {
    pub name: Option<String>,
    pub min_price: f64,
    pub max_price: f64,
}

/// UserQuery
///
/// Listing filter for users. Inactive accounts are always excluded by the
/// repository, whatever the filter says.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserQuery {
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub min_login: Option<i64>,
    pub max_login: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub price: f64,
    pub quantity: i64,
    pub category_name: String,
}

#[derive(Debug, Clone, Default)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub quantity: Option<i64>,
    pub category_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewRole {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Default)]
pub struct RoleChanges {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub avatar_url: String,
    pub status: bool,
    pub role: PermissionLevel,
}

#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub role: Option<PermissionLevel>,
}

impl From<CreateProductRequest> for NewProduct {
    fn from(req: CreateProductRequest) -> Self {
        Self {
            name: req.name,
            price: req.price.unwrap_or(0.0),
            quantity: req.quantity.unwrap_or(0),
            category_name: req.category,
        }
    }
}

impl From<UpdateProductRequest> for ProductChanges {
    fn from(req: UpdateProductRequest) -> Self {
        Self {
            name: req.name,
            price: req.price,
            quantity: req.quantity,
            category_name: req.category,
        }
    }
}

impl From<UpdateRoleRequest> for RoleChanges {
    /// Empty strings count as "not provided".
    fn from(req: UpdateRoleRequest) -> Self {
        Self {
            name: req.name.filter(|n| !n.is_empty()),
            description: req.description.filter(|d| !d.is_empty()),
        }
    }
}
