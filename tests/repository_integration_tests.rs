use catalog_api::{
    InMemoryRepository, PermissionLevel,
    error::RepoError,
    models::{NewProduct, NewRole, NewUser, ProductChanges, ProductQuery, RoleChanges, UserChanges, UserQuery},
    repository::{PostgresRepository, Repository},
};
use sqlx::PgPool;
use uuid::Uuid;

// --- Test Context and Setup ---

/// Holds the pool for the Postgres-backed tests. These need a reachable
/// `DATABASE_URL` and are ignored by default:
/// `cargo test -- --ignored` runs them.
struct DbTestContext {
    pool: PgPool,
}

impl DbTestContext {
    async fn setup() -> Self {
        dotenv::dotenv().ok();

        let db_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set to run integration tests");

        let pool = PgPool::connect(&db_url)
            .await
            .expect("Failed to connect to database for integration tests.");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run database migrations.");

        DbTestContext { pool }
    }

    fn repository(&self) -> PostgresRepository {
        PostgresRepository::new(self.pool.clone())
    }
}

// --- Test Data Helpers ---

/// Names are suffixed so runs against a shared database never collide.
fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

fn new_user(username: &str, status: bool) -> NewUser {
    NewUser {
        username: username.to_string(),
        email: format!("{username}@example.com"),
        password_hash: "not-a-real-hash".to_string(),
        full_name: format!("{username} tester"),
        avatar_url: String::new(),
        status,
        role: PermissionLevel::User,
    }
}

fn all_prices(name: &str) -> ProductQuery {
    ProductQuery {
        name: Some(name.to_string()),
        min_price: 0.0,
        max_price: 10_000.0,
    }
}

// --- Shared Contract ---
// Each check runs against both stores so they cannot drift apart.

async fn check_product_requires_existing_category(repo: &dyn Repository) {
    let product_name = unique("orphan");
    let err = repo
        .create_product(NewProduct {
            name: product_name.clone(),
            price: 5.0,
            quantity: 1,
            category_name: unique("missing"),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound("Category")));

    let listed = repo.list_products(&all_prices(&product_name)).await.unwrap();
    assert!(listed.is_empty());
}

async fn check_product_listing_joins_category(repo: &dyn Repository) {
    let category_name = unique("books");
    let category = repo.create_category(category_name.clone()).await.unwrap();
    let product_name = unique("Dune");
    let product = repo
        .create_product(NewProduct {
            name: product_name.clone(),
            price: 15.0,
            quantity: 2,
            category_name: category_name.clone(),
        })
        .await
        .unwrap();
    assert_eq!(product.category, category.id);

    repo.soft_delete_category(category.id).await.unwrap().unwrap();

    // Case-insensitive match; deleted categories still join.
    let listed = repo
        .list_products(&all_prices(&product_name.to_uppercase()))
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].category.id, category.id);
    assert_eq!(listed[0].category.name, category_name);

    let priced_out = ProductQuery {
        min_price: 16.0,
        ..all_prices(&product_name)
    };
    assert!(repo.list_products(&priced_out).await.unwrap().is_empty());
}

async fn check_product_update_resolves_category(repo: &dyn Repository) {
    let first = unique("first");
    let second = unique("second");
    repo.create_category(first.clone()).await.unwrap();
    let target = repo.create_category(second.clone()).await.unwrap();
    let product = repo
        .create_product(NewProduct {
            name: unique("widget"),
            price: 1.0,
            quantity: 1,
            category_name: first,
        })
        .await
        .unwrap();

    let updated = repo
        .update_product(
            product.id,
            ProductChanges {
                quantity: Some(9),
                category_name: Some(second),
                ..ProductChanges::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.quantity, 9);
    assert_eq!(updated.price, 1.0);
    assert_eq!(updated.category, target.id);

    let err = repo
        .update_product(
            product.id,
            ProductChanges {
                category_name: Some(unique("missing")),
                ..ProductChanges::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound("Category")));

    assert!(
        repo.update_product(Uuid::new_v4(), ProductChanges::default())
            .await
            .unwrap()
            .is_none()
    );
}

async fn check_role_lifecycle(repo: &dyn Repository) {
    let name = unique("editor");
    let role = repo
        .create_role(NewRole {
            name: name.clone(),
            description: "Edits".to_string(),
        })
        .await
        .unwrap();

    let err = repo
        .create_role(NewRole {
            name: name.clone(),
            description: String::new(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::Conflict(_)));

    let updated = repo
        .update_role(
            role.id,
            RoleChanges {
                name: None,
                description: Some("Edits everything".to_string()),
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.name, name);
    assert_eq!(updated.description, "Edits everything");

    assert!(repo.delete_role(role.id).await.unwrap());
    assert!(repo.get_role(role.id).await.unwrap().is_none());
    assert!(!repo.delete_role(role.id).await.unwrap());
}

async fn check_role_update_missing_id(repo: &dyn Repository) {
    let name = unique("editor");
    repo.create_role(NewRole {
        name: name.clone(),
        description: String::new(),
    })
    .await
    .unwrap();

    // A taken name on an unknown id is still a miss, not a conflict.
    let missing = repo
        .update_role(
            Uuid::new_v4(),
            RoleChanges {
                name: Some(name),
                description: None,
            },
        )
        .await
        .unwrap();
    assert!(missing.is_none());
}

async fn check_user_lifecycle(repo: &dyn Repository) {
    let username = unique("ada");
    let user = repo.create_user(new_user(&username, true)).await.unwrap();
    assert_eq!(user.login_count, 0);

    let err = repo
        .create_user(NewUser {
            email: format!("other-{username}@example.com"),
            ..new_user(&username, true)
        })
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::Conflict(_)));

    let logged = repo.record_login(user.id).await.unwrap().unwrap();
    assert_eq!(logged.login_count, 1);

    let updated = repo
        .update_user(
            user.id,
            UserChanges {
                role: Some(PermissionLevel::Moderator),
                ..UserChanges::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.role, PermissionLevel::Moderator);
    assert_eq!(updated.username, username);

    let query = UserQuery {
        username: Some(username.clone()),
        ..UserQuery::default()
    };
    assert_eq!(repo.list_users(&query).await.unwrap().len(), 1);

    let deactivated = repo.deactivate_user(user.id).await.unwrap().unwrap();
    assert!(!deactivated.status);
    assert!(repo.list_users(&query).await.unwrap().is_empty());
    assert!(repo.deactivate_user(user.id).await.unwrap().is_none());
    assert!(
        repo.update_user(user.id, UserChanges::default())
            .await
            .unwrap()
            .is_none()
    );

    // Deactivation keeps the record.
    assert!(repo.get_user(user.id).await.unwrap().is_some());
}

async fn check_user_details_join_role_by_name(repo: &dyn Repository) {
    let username = unique("grace");
    let user = repo.create_user(new_user(&username, true)).await.unwrap();

    let details = repo.get_user_details(user.id).await.unwrap().unwrap();
    let joined = details.role_details.map(|r| r.name);
    let expected = repo
        .find_role_by_name("user")
        .await
        .unwrap()
        .map(|r| r.name);
    assert_eq!(joined, expected);
}

// --- In-Memory Store ---

#[tokio::test]
async fn test_memory_product_requires_existing_category() {
    check_product_requires_existing_category(&InMemoryRepository::new()).await;
}

#[tokio::test]
async fn test_memory_product_listing_joins_category() {
    check_product_listing_joins_category(&InMemoryRepository::new()).await;
}

#[tokio::test]
async fn test_memory_product_update_resolves_category() {
    check_product_update_resolves_category(&InMemoryRepository::new()).await;
}

#[tokio::test]
async fn test_memory_role_lifecycle() {
    check_role_lifecycle(&InMemoryRepository::new()).await;
}

#[tokio::test]
async fn test_memory_role_update_missing_id() {
    check_role_update_missing_id(&InMemoryRepository::new()).await;
}

#[tokio::test]
async fn test_memory_user_lifecycle() {
    check_user_lifecycle(&InMemoryRepository::new()).await;
}

#[tokio::test]
async fn test_memory_user_details_join_role_by_name() {
    let repo = InMemoryRepository::new();
    repo.create_role(NewRole {
        name: "user".to_string(),
        description: "Regular account".to_string(),
    })
    .await
    .unwrap();
    check_user_details_join_role_by_name(&repo).await;
}

// --- Postgres Store ---

#[tokio::test]
#[ignore]
async fn test_pg_product_requires_existing_category() {
    let ctx = DbTestContext::setup().await;
    check_product_requires_existing_category(&ctx.repository()).await;
}

#[tokio::test]
#[ignore]
async fn test_pg_product_listing_joins_category() {
    let ctx = DbTestContext::setup().await;
    check_product_listing_joins_category(&ctx.repository()).await;
}

#[tokio::test]
#[ignore]
async fn test_pg_product_update_resolves_category() {
    let ctx = DbTestContext::setup().await;
    check_product_update_resolves_category(&ctx.repository()).await;
}

#[tokio::test]
#[ignore]
async fn test_pg_role_lifecycle() {
    let ctx = DbTestContext::setup().await;
    check_role_lifecycle(&ctx.repository()).await;
}

#[tokio::test]
#[ignore]
async fn test_pg_role_update_missing_id() {
    let ctx = DbTestContext::setup().await;
    check_role_update_missing_id(&ctx.repository()).await;
}

#[tokio::test]
#[ignore]
async fn test_pg_user_lifecycle() {
    let ctx = DbTestContext::setup().await;
    check_user_lifecycle(&ctx.repository()).await;
}

#[tokio::test]
#[ignore]
async fn test_pg_user_details_join_role_by_name() {
    let ctx = DbTestContext::setup().await;
    check_user_details_join_role_by_name(&ctx.repository()).await;
}

#[tokio::test]
#[ignore]
async fn test_pg_role_check_constraint_rejects_unknown_level() {
    let ctx = DbTestContext::setup().await;
    let result = sqlx::query("INSERT INTO users (id, username, password_hash, email, role) VALUES ($1, $2, 'x', $3, 'overlord')")
        .bind(Uuid::new_v4())
        .bind(unique("rogue"))
        .bind(format!("{}@example.com", unique("rogue")))
        .execute(&ctx.pool)
        .await;
    assert!(result.is_err(), "the role check constraint should reject unknown levels");
}
