use crate::error::{RepoError, RepoResult};
use crate::models::{
    Category, CategoryRef, NewProduct, NewRole, NewUser, Product, ProductChanges, ProductListing,
    ProductQuery, Role, RoleChanges, User, UserChanges, UserDetails, UserQuery,
};
use crate::permissions::PermissionLevel;
use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Postgres, query_builder::QueryBuilder};
use std::sync::Arc;
use uuid::Uuid;

/// Repository Trait
///
/// The persistence contract for the four resources. Handlers only ever talk to
/// `Arc<dyn Repository>`, so the Postgres store and the in-memory store are
/// interchangeable behind the application state.
///
/// Every method is a single store operation. Where a write depends on another
/// record (product → category, user updates → active status) the dependency is
/// checked inside that same operation.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Categories ---
    async fn list_categories(&self) -> RepoResult<Vec<Category>>;
    async fn get_category(&self, id: Uuid) -> RepoResult<Option<Category>>;
    async fn create_category(&self, name: String) -> RepoResult<Category>;
    async fn rename_category(&self, id: Uuid, name: String) -> RepoResult<Option<Category>>;
    async fn soft_delete_category(&self, id: Uuid) -> RepoResult<Option<Category>>;

    // --- Products ---
    async fn list_products(&self, query: &ProductQuery) -> RepoResult<Vec<ProductListing>>;
    async fn get_product(&self, id: Uuid) -> RepoResult<Option<Product>>;
    /// Fails with `RepoError::NotFound("Category")` and writes nothing when no
    /// category carries `category_name`.
    async fn create_product(&self, product: NewProduct) -> RepoResult<Product>;
    /// Returns `Ok(None)` when the product does not exist; fails with
    /// `RepoError::NotFound("Category")` when a new category name is unknown.
    async fn update_product(&self, id: Uuid, changes: ProductChanges) -> RepoResult<Option<Product>>;
    async fn soft_delete_product(&self, id: Uuid) -> RepoResult<Option<Product>>;

    // --- Roles ---
    async fn list_roles(&self) -> RepoResult<Vec<Role>>;
    async fn get_role(&self, id: Uuid) -> RepoResult<Option<Role>>;
    async fn find_role_by_name(&self, name: &str) -> RepoResult<Option<Role>>;
    /// Fails with `RepoError::Conflict` when the name is taken.
    async fn create_role(&self, role: NewRole) -> RepoResult<Role>;
    async fn update_role(&self, id: Uuid, changes: RoleChanges) -> RepoResult<Option<Role>>;
    /// Hard delete. Returns false when nothing was removed.
    async fn delete_role(&self, id: Uuid) -> RepoResult<bool>;

    // --- Users ---
    /// Active users only, with their role record joined.
    async fn list_users(&self, query: &UserQuery) -> RepoResult<Vec<UserDetails>>;
    /// Raw lookup, active or not.
    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>>;
    async fn get_user_details(&self, id: Uuid) -> RepoResult<Option<UserDetails>>;
    async fn find_user_by_username(&self, username: &str) -> RepoResult<Option<User>>;
    /// Fails with `RepoError::Conflict` when the username or email is taken.
    async fn create_user(&self, user: NewUser) -> RepoResult<User>;
    /// Applies only to active users; `Ok(None)` when missing or inactive.
    async fn update_user(&self, id: Uuid, changes: UserChanges) -> RepoResult<Option<User>>;
    /// Sets `status = false` on an active user; `Ok(None)` when missing or
    /// already inactive.
    async fn deactivate_user(&self, id: Uuid) -> RepoResult<Option<User>>;
    /// Increments `login_count` and returns the updated user.
    async fn record_login(&self, id: Uuid) -> RepoResult<Option<User>>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// Escapes `%`, `_` and `\` so user input is matched literally by `ILIKE`.
fn like_pattern(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len() + 2);
    escaped.push('%');
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Maps Postgres constraint violations onto the repository taxonomy.
fn classify(err: sqlx::Error) -> RepoError {
    if let sqlx::Error::Database(db_err) = &err {
        match db_err.code().as_deref() {
            Some("23505") => {
                let message = match db_err.constraint() {
                    Some("users_username_key") => "Username already exists".to_string(),
                    Some("users_email_key") => "Email already exists".to_string(),
                    Some("roles_name_key") => "Role already exists".to_string(),
                    other => format!("Duplicate value violates {}", other.unwrap_or("unique constraint")),
                };
                return RepoError::Conflict(message);
            }
            Some("23514") => {
                let what = db_err.constraint().unwrap_or("check constraint");
                return RepoError::Validation(format!("Value violates {what}"));
            }
            _ => {}
        }
    }
    tracing::error!("postgres error: {:?}", err);
    RepoError::Database(err)
}

const CATEGORY_COLUMNS: &str = "id, name, is_deleted";
const PRODUCT_COLUMNS: &str = "id, name, price, quantity, category_id, is_deleted";
const ROLE_COLUMNS: &str = "id, name, description";
const USER_COLUMNS: &str = "id, username, password_hash, email, full_name, avatar_url, status, role, login_count, created_at, updated_at";

/// Row shape for the products ⋈ categories listing query.
#[derive(FromRow)]
struct ProductListingRow {
    id: Uuid,
    name: String,
    price: f64,
    quantity: i64,
    is_deleted: bool,
    category_id: Uuid,
    category_name: String,
}

impl From<ProductListingRow> for ProductListing {
    fn from(row: ProductListingRow) -> Self {
        ProductListing {
            id: row.id,
            name: row.name,
            price: row.price,
            quantity: row.quantity,
            category: CategoryRef {
                id: row.category_id,
                name: row.category_name,
            },
            is_deleted: row.is_deleted,
        }
    }
}

/// Row shape for users ⋈ roles (joined on role name).
#[derive(FromRow)]
struct UserDetailsRow {
    #[sqlx(flatten)]
    user: User,
    role_id: Option<Uuid>,
    role_name: Option<String>,
    role_description: Option<String>,
}

impl From<UserDetailsRow> for UserDetails {
    fn from(row: UserDetailsRow) -> Self {
        let role_details = match (row.role_id, row.role_name) {
            (Some(id), Some(name)) => Some(Role {
                id,
                name,
                description: row.role_description.unwrap_or_default(),
            }),
            _ => None,
        };
        UserDetails {
            user: row.user,
            role_details,
        }
    }
}

const USER_DETAILS_SELECT: &str = r#"
    SELECT
        u.id, u.username, u.password_hash, u.email, u.full_name, u.avatar_url,
        u.status, u.role, u.login_count, u.created_at, u.updated_at,
        r.id AS role_id, r.name AS role_name, r.description AS role_description
    FROM users u
    LEFT JOIN roles r ON r.name = u.role
"#;

/// PostgresRepository
///
/// The `Repository` implementation backed by PostgreSQL. Queries are checked at
/// runtime (`query_as::<_, T>`), so building the crate needs no live database.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn list_categories(&self) -> RepoResult<Vec<Category>> {
        sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY created_at"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(classify)
    }

    async fn get_category(&self, id: Uuid) -> RepoResult<Option<Category>> {
        sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)
    }

    async fn create_category(&self, name: String) -> RepoResult<Category> {
        sqlx::query_as::<_, Category>(&format!(
            "INSERT INTO categories (id, name) VALUES ($1, $2) RETURNING {CATEGORY_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(classify)
    }

    async fn rename_category(&self, id: Uuid, name: String) -> RepoResult<Option<Category>> {
        sqlx::query_as::<_, Category>(&format!(
            "UPDATE categories SET name = $2, updated_at = NOW() WHERE id = $1 RETURNING {CATEGORY_COLUMNS}"
        ))
        .bind(id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)
    }

    async fn soft_delete_category(&self, id: Uuid) -> RepoResult<Option<Category>> {
        sqlx::query_as::<_, Category>(&format!(
            "UPDATE categories SET is_deleted = true, updated_at = NOW() WHERE id = $1 RETURNING {CATEGORY_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)
    }

    /// list_products
    ///
    /// Builds the filter with `QueryBuilder` so every user-supplied value is bound,
    /// never interpolated. The soft-delete flag is intentionally not filtered.
    async fn list_products(&self, query: &ProductQuery) -> RepoResult<Vec<ProductListing>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            r#"
            SELECT
                p.id, p.name, p.price, p.quantity, p.is_deleted,
                c.id AS category_id, c.name AS category_name
            FROM products p
            JOIN categories c ON c.id = p.category_id
            WHERE p.price >= "#,
        );
        builder.push_bind(query.min_price);
        builder.push(" AND p.price <= ");
        builder.push_bind(query.max_price);

        if let Some(name) = &query.name {
            builder.push(" AND p.name ILIKE ");
            builder.push_bind(like_pattern(name));
        }

        builder.push(" ORDER BY p.created_at");

        let rows = builder
            .build_query_as::<ProductListingRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(classify)?;
        Ok(rows.into_iter().map(ProductListing::from).collect())
    }

    async fn get_product(&self, id: Uuid) -> RepoResult<Option<Product>> {
        sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)
    }

    /// create_product
    ///
    /// Resolves the category and inserts in a single `INSERT ... SELECT`, so the
    /// category cannot vanish between lookup and write. No row back means the
    /// name did not resolve.
    async fn create_product(&self, product: NewProduct) -> RepoResult<Product> {
        sqlx::query_as::<_, Product>(&format!(
            r#"
            INSERT INTO products (id, name, price, quantity, category_id)
            SELECT $1, $2, $3, $4, c.id
            FROM categories c
            WHERE c.name = $5
            ORDER BY c.created_at
            LIMIT 1
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(product.name)
        .bind(product.price)
        .bind(product.quantity)
        .bind(product.category_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)?
        .ok_or(RepoError::NotFound("Category"))
    }

    /// update_product
    ///
    /// Runs in a transaction when the category changes so the resolved id is
    /// still valid when the product row is written.
    async fn update_product(&self, id: Uuid, changes: ProductChanges) -> RepoResult<Option<Product>> {
        let mut tx = self.pool.begin().await.map_err(classify)?;

        let category_id = match &changes.category_name {
            Some(name) => {
                let found: Option<(Uuid,)> = sqlx::query_as(
                    "SELECT id FROM categories WHERE name = $1 ORDER BY created_at LIMIT 1 FOR SHARE",
                )
                .bind(name)
                .fetch_optional(&mut *tx)
                .await
                .map_err(classify)?;
                match found {
                    Some((category_id,)) => Some(category_id),
                    None => return Err(RepoError::NotFound("Category")),
                }
            }
            None => None,
        };

        let updated = sqlx::query_as::<_, Product>(&format!(
            r#"
            UPDATE products
            SET name = COALESCE($2, name),
                price = COALESCE($3, price),
                quantity = COALESCE($4, quantity),
                category_id = COALESCE($5, category_id),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(changes.name)
        .bind(changes.price)
        .bind(changes.quantity)
        .bind(category_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(classify)?;

        tx.commit().await.map_err(classify)?;
        Ok(updated)
    }

    async fn soft_delete_product(&self, id: Uuid) -> RepoResult<Option<Product>> {
        sqlx::query_as::<_, Product>(&format!(
            "UPDATE products SET is_deleted = true, updated_at = NOW() WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)
    }

    async fn list_roles(&self) -> RepoResult<Vec<Role>> {
        sqlx::query_as::<_, Role>(&format!(
            "SELECT {ROLE_COLUMNS} FROM roles ORDER BY created_at"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(classify)
    }

    async fn get_role(&self, id: Uuid) -> RepoResult<Option<Role>> {
        sqlx::query_as::<_, Role>(&format!("SELECT {ROLE_COLUMNS} FROM roles WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(classify)
    }

    async fn find_role_by_name(&self, name: &str) -> RepoResult<Option<Role>> {
        sqlx::query_as::<_, Role>(&format!("SELECT {ROLE_COLUMNS} FROM roles WHERE name = $1"))
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(classify)
    }

    async fn create_role(&self, role: NewRole) -> RepoResult<Role> {
        sqlx::query_as::<_, Role>(&format!(
            "INSERT INTO roles (id, name, description) VALUES ($1, $2, $3) RETURNING {ROLE_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(role.name)
        .bind(role.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match classify(e) {
            RepoError::Conflict(_) => RepoError::Conflict("Role already exists".to_string()),
            other => other,
        })
    }

    async fn update_role(&self, id: Uuid, changes: RoleChanges) -> RepoResult<Option<Role>> {
        sqlx::query_as::<_, Role>(&format!(
            r#"
            UPDATE roles
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {ROLE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(changes.name)
        .bind(changes.description)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)
    }

    async fn delete_role(&self, id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(classify)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_users(&self, query: &UserQuery) -> RepoResult<Vec<UserDetails>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(USER_DETAILS_SELECT);
        builder.push(" WHERE u.status = true");

        if let Some(username) = &query.username {
            builder.push(" AND u.username ILIKE ");
            builder.push_bind(like_pattern(username));
        }
        if let Some(full_name) = &query.full_name {
            builder.push(" AND u.full_name ILIKE ");
            builder.push_bind(like_pattern(full_name));
        }
        if let Some(min) = query.min_login {
            builder.push(" AND u.login_count >= ");
            builder.push_bind(min);
        }
        if let Some(max) = query.max_login {
            builder.push(" AND u.login_count <= ");
            builder.push_bind(max);
        }

        builder.push(" ORDER BY u.created_at");

        let rows = builder
            .build_query_as::<UserDetailsRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(classify)?;
        Ok(rows.into_iter().map(UserDetails::from).collect())
    }

    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(classify)
    }

    async fn get_user_details(&self, id: Uuid) -> RepoResult<Option<UserDetails>> {
        let row = sqlx::query_as::<_, UserDetailsRow>(&format!("{USER_DETAILS_SELECT} WHERE u.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(classify)?;
        Ok(row.map(UserDetails::from))
    }

    async fn find_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)
    }

    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, username, password_hash, email, full_name, avatar_url, status, role)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(user.username)
        .bind(user.password_hash)
        .bind(user.email)
        .bind(user.full_name)
        .bind(user.avatar_url)
        .bind(user.status)
        .bind(user.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(classify)
    }

    async fn update_user(&self, id: Uuid, changes: UserChanges) -> RepoResult<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET username = COALESCE($2, username),
                email = COALESCE($3, email),
                password_hash = COALESCE($4, password_hash),
                full_name = COALESCE($5, full_name),
                avatar_url = COALESCE($6, avatar_url),
                role = COALESCE($7, role),
                updated_at = NOW()
            WHERE id = $1 AND status = true
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(changes.username)
        .bind(changes.email)
        .bind(changes.password_hash)
        .bind(changes.full_name)
        .bind(changes.avatar_url)
        .bind(changes.role.map(PermissionLevel::as_str))
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)
    }

    async fn deactivate_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET status = false, updated_at = NOW() WHERE id = $1 AND status = true RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)
    }

    async fn record_login(&self, id: Uuid) -> RepoResult<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET login_count = login_count + 1 WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)
    }
}
