use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use catalog_api::{
    AppConfig, AppState, InMemoryRepository, PermissionLevel, create_router,
    auth::hash_password,
    models::{NewUser, User},
    repository::{Repository, RepositoryState},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

// --- Test Harness ---

/// A router over a fresh in-memory store. Callers are identified with the
/// local `x-user-id` header.
struct TestApp {
    router: Router,
    repo: Arc<InMemoryRepository>,
}

fn spawn_app() -> TestApp {
    let repo = Arc::new(InMemoryRepository::new());
    let state = AppState {
        repo: repo.clone() as RepositoryState,
        config: AppConfig::default(),
    };
    TestApp {
        router: create_router(state),
        repo,
    }
}

impl TestApp {
    async fn seed_user(&self, username: &str, role: PermissionLevel, status: bool) -> User {
        self.repo
            .create_user(NewUser {
                username: username.to_string(),
                email: format!("{username}@example.com"),
                password_hash: hash_password("secret", 4).unwrap(),
                full_name: format!("{username} tester"),
                avatar_url: String::new(),
                status,
                role,
            })
            .await
            .unwrap()
    }

    async fn admin(&self) -> Uuid {
        self.seed_user("admin", PermissionLevel::Admin, true).await.id
    }

    async fn moderator(&self) -> Uuid {
        self.seed_user("moderator", PermissionLevel::Moderator, true).await.id
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        caller: Option<Uuid>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(id) = caller {
            builder = builder.header("x-user-id", id.to_string());
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn create_category(&self, caller: Uuid, name: &str) -> Value {
        let (status, body) = self
            .send(Method::POST, "/categories", Some(caller), Some(json!({ "name": name })))
            .await;
        assert_eq!(status, StatusCode::OK);
        body["data"].clone()
    }
}

// --- Categories ---

#[tokio::test]
async fn test_category_create_returns_200_envelope() {
    let app = spawn_app();
    let admin = app.admin().await;

    let (status, body) = app
        .send(Method::POST, "/categories", Some(admin), Some(json!({ "name": "Books" })))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["name"], "Books");
    assert_eq!(body["data"]["isDeleted"], false);
}

#[tokio::test]
async fn test_category_reads_are_public() {
    let app = spawn_app();
    let admin = app.admin().await;
    let created = app.create_category(admin, "Games").await;

    let (status, body) = app.send(Method::GET, "/categories", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let uri = format!("/categories/{}", created["id"].as_str().unwrap());
    let (status, body) = app.send(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Games");
}

#[tokio::test]
async fn test_category_create_requires_moderator() {
    let app = spawn_app();
    let user = app.seed_user("reader", PermissionLevel::User, true).await;

    let (status, body) = app
        .send(Method::POST, "/categories", Some(user.id), Some(json!({ "name": "Books" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);

    let (status, _) = app
        .send(Method::POST, "/categories", None, Some(json!({ "name": "Books" })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_category_rename_and_unknown_field() {
    let app = spawn_app();
    let moderator = app.moderator().await;
    let created = app.create_category(moderator, "Bookz").await;
    let uri = format!("/categories/{}", created["id"].as_str().unwrap());

    let (status, body) = app
        .send(Method::PUT, &uri, Some(moderator), Some(json!({ "name": "Books" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Books");

    let (status, body) = app
        .send(
            Method::PUT,
            &uri,
            Some(moderator),
            Some(json!({ "name": "Books", "isDeleted": true })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_category_delete_needs_admin_and_is_soft() {
    let app = spawn_app();
    let moderator = app.moderator().await;
    let admin = app.admin().await;
    let created = app.create_category(moderator, "Books").await;
    let uri = format!("/categories/{}", created["id"].as_str().unwrap());

    let (status, _) = app.send(Method::DELETE, &uri, Some(moderator), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.send(Method::DELETE, &uri, Some(admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isDeleted"], true);

    // Reads are not soft-delete aware.
    let (status, body) = app.send(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isDeleted"], true);
}

#[tokio::test]
async fn test_category_unknown_and_malformed_ids_are_404() {
    let app = spawn_app();

    let uri = format!("/categories/{}", Uuid::new_v4());
    let (status, body) = app.send(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Category not found");

    let (status, _) = app.send(Method::GET, "/categories/not-an-id", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// --- Products ---

#[tokio::test]
async fn test_product_create_with_unknown_category_writes_nothing() {
    let app = spawn_app();
    let moderator = app.moderator().await;

    let (status, body) = app
        .send(
            Method::POST,
            "/products",
            Some(moderator),
            Some(json!({ "name": "Dune", "price": 15, "category": "Nowhere" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Category not found");

    let (_, body) = app.send(Method::GET, "/products", None, None).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_product_create_defaults_and_negative_price() {
    let app = spawn_app();
    let moderator = app.moderator().await;
    let category = app.create_category(moderator, "Books").await;

    let (status, body) = app
        .send(
            Method::POST,
            "/products",
            Some(moderator),
            Some(json!({ "name": "Dune", "category": "Books" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["price"], 0.0);
    assert_eq!(body["data"]["quantity"], 0);
    assert_eq!(body["data"]["category"], category["id"]);

    let (status, body) = app
        .send(
            Method::POST,
            "/products",
            Some(moderator),
            Some(json!({ "name": "Dune", "price": -1, "category": "Books" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "price must not be negative");
}

#[tokio::test]
async fn test_product_list_filters() {
    let app = spawn_app();
    let moderator = app.moderator().await;
    app.create_category(moderator, "Books").await;
    for (name, price) in [("Dune", 15.0), ("Dune Messiah", 120.0), ("Emma", 8.0)] {
        let (status, _) = app
            .send(
                Method::POST,
                "/products",
                Some(moderator),
                Some(json!({ "name": name, "price": price, "category": "Books" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let names = |body: &Value| -> Vec<String> {
        body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["name"].as_str().unwrap().to_string())
            .collect()
    };

    let (_, body) = app.send(Method::GET, "/products?name=DUNE", None, None).await;
    assert_eq!(names(&body), vec!["Dune", "Dune Messiah"]);

    let (_, body) = app
        .send(Method::GET, "/products?price%5B%24gte%5D=10&price%5B%24lte%5D=100", None, None)
        .await;
    assert_eq!(names(&body), vec!["Dune"]);

    // A non-numeric bound falls back to its default.
    let (status, body) = app
        .send(Method::GET, "/products?price%5B%24gte%5D=abc", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&body), vec!["Dune", "Dune Messiah", "Emma"]);
}

#[tokio::test]
async fn test_product_update_allow_list_and_category_change() {
    let app = spawn_app();
    let moderator = app.moderator().await;
    app.create_category(moderator, "Books").await;
    let films = app.create_category(moderator, "Films").await;

    let (_, created) = app
        .send(
            Method::POST,
            "/products",
            Some(moderator),
            Some(json!({ "name": "Dune", "price": 15, "category": "Books" })),
        )
        .await;
    let uri = format!("/products/{}", created["data"]["id"].as_str().unwrap());

    let (status, body) = app
        .send(
            Method::PUT,
            &uri,
            Some(moderator),
            Some(json!({ "price": 20, "category": "Films" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["price"], 20.0);
    assert_eq!(body["data"]["category"], films["id"]);
    assert_eq!(body["data"]["name"], "Dune");

    let (status, _) = app
        .send(Method::PUT, &uri, Some(moderator), Some(json!({ "isDeleted": true })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(Method::PUT, &uri, Some(moderator), Some(json!({ "category": "Nowhere" })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_product_delete_is_soft() {
    let app = spawn_app();
    let admin = app.admin().await;
    app.create_category(admin, "Books").await;
    let (_, created) = app
        .send(
            Method::POST,
            "/products",
            Some(admin),
            Some(json!({ "name": "Dune", "category": "Books" })),
        )
        .await;
    let uri = format!("/products/{}", created["data"]["id"].as_str().unwrap());

    let (status, body) = app.send(Method::DELETE, &uri, Some(admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isDeleted"], true);

    let (status, body) = app.send(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isDeleted"], true);
}

#[tokio::test]
async fn test_catalog_scenario_survives_category_delete() {
    let app = spawn_app();
    let admin = app.admin().await;
    let moderator = app.moderator().await;

    let (status, body) = app
        .send(Method::POST, "/categories", Some(admin), Some(json!({ "name": "Books" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Books");
    let category_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .send(
            Method::POST,
            "/products",
            Some(moderator),
            Some(json!({ "name": "Dune", "price": 15, "category": "Books" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.send(Method::GET, "/products?name=dun", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["name"], "Dune");

    let uri = format!("/categories/{category_id}");
    let (status, body) = app.send(Method::DELETE, &uri, Some(admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isDeleted"], true);

    let (status, body) = app.send(Method::GET, "/products", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let listing = &body["data"][0];
    assert_eq!(listing["name"], "Dune");
    assert_eq!(listing["category"]["id"], category_id.as_str());
    assert_eq!(listing["category"]["name"], "Books");
}

// --- Roles ---

#[tokio::test]
async fn test_role_create_conflict_keeps_single_record() {
    let app = spawn_app();
    let admin = app.admin().await;

    let payload = json!({ "name": "editor", "description": "Edits things" });
    let (status, body) = app
        .send(Method::POST, "/roles", Some(admin), Some(payload.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["name"], "editor");

    let (status, body) = app.send(Method::POST, "/roles", Some(admin), Some(payload)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Role already exists");

    let (_, body) = app.send(Method::GET, "/roles", None, None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_role_writes_need_admin() {
    let app = spawn_app();
    let moderator = app.moderator().await;

    let (status, _) = app
        .send(Method::POST, "/roles", Some(moderator), Some(json!({ "name": "editor" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_role_partial_update_ignores_empty_fields() {
    let app = spawn_app();
    let admin = app.admin().await;
    let (_, created) = app
        .send(
            Method::POST,
            "/roles",
            Some(admin),
            Some(json!({ "name": "editor", "description": "Edits things" })),
        )
        .await;
    let uri = format!("/roles/{}", created["data"]["id"].as_str().unwrap());

    let (status, body) = app
        .send(
            Method::PUT,
            &uri,
            Some(admin),
            Some(json!({ "name": "", "description": "Edits everything" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "editor");
    assert_eq!(body["data"]["description"], "Edits everything");
}

#[tokio::test]
async fn test_role_update_unknown_id_is_404() {
    let app = spawn_app();
    let admin = app.admin().await;
    app.send(Method::POST, "/roles", Some(admin), Some(json!({ "name": "editor" })))
        .await;

    let uri = format!("/roles/{}", Uuid::new_v4());
    let (status, body) = app
        .send(Method::PUT, &uri, Some(admin), Some(json!({ "name": "editor" })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Role not found");
}

#[tokio::test]
async fn test_role_delete_is_hard() {
    let app = spawn_app();
    let admin = app.admin().await;
    let (_, created) = app
        .send(Method::POST, "/roles", Some(admin), Some(json!({ "name": "editor" })))
        .await;
    let uri = format!("/roles/{}", created["data"]["id"].as_str().unwrap());

    let (status, body) = app.send(Method::DELETE, &uri, Some(admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Role deleted");

    let (status, _) = app.send(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.send(Method::DELETE, &uri, Some(admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// --- Users ---

#[tokio::test]
async fn test_user_create_hides_password_and_defaults() {
    let app = spawn_app();
    let admin = app.admin().await;

    let (status, body) = app
        .send(
            Method::POST,
            "/users",
            Some(admin),
            Some(json!({
                "username": "ada",
                "email": "ada@example.com",
                "password": "analytical"
            })),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    let data = &body["data"];
    assert_eq!(data["username"], "ada");
    assert_eq!(data["role"], "user");
    assert_eq!(data["status"], false);
    assert_eq!(data["loginCount"], 0);
    assert!(data.get("password").is_none());
    assert!(data.get("passwordHash").is_none());
}

#[tokio::test]
async fn test_user_create_duplicate_username_is_conflict() {
    let app = spawn_app();
    let admin = app.admin().await;
    app.seed_user("ada", PermissionLevel::User, true).await;

    let (status, body) = app
        .send(
            Method::POST,
            "/users",
            Some(admin),
            Some(json!({
                "username": "ada",
                "email": "other@example.com",
                "password": "analytical"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_user_create_rejects_invalid_email() {
    let app = spawn_app();
    let admin = app.admin().await;

    let (status, body) = app
        .send(
            Method::POST,
            "/users",
            Some(admin),
            Some(json!({ "username": "ada", "email": "nope", "password": "x" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "email is invalid");
}

#[tokio::test]
async fn test_user_list_excludes_inactive_and_joins_role() {
    let app = spawn_app();
    let admin = app.admin().await;
    app.seed_user("active", PermissionLevel::User, true).await;
    app.seed_user("dormant", PermissionLevel::User, false).await;
    app.send(
        Method::POST,
        "/roles",
        Some(admin),
        Some(json!({ "name": "user", "description": "Regular account" })),
    )
    .await;

    let (status, body) = app.send(Method::GET, "/users", Some(admin), None).await;
    assert_eq!(status, StatusCode::OK);
    let users = body["data"].as_array().unwrap();
    assert!(users.iter().all(|u| u["status"] == true));
    assert!(users.iter().all(|u| u["username"] != "dormant"));

    let active = users.iter().find(|u| u["username"] == "active").unwrap();
    assert_eq!(active["roleDetails"]["description"], "Regular account");

    let (_, body) = app.send(Method::GET, "/users?username=dorm", Some(admin), None).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_user_list_login_bounds() {
    let app = spawn_app();
    let admin = app.admin().await;
    let frequent = app.seed_user("frequent", PermissionLevel::User, true).await;
    for _ in 0..3 {
        app.repo.record_login(frequent.id).await.unwrap();
    }

    let (_, body) = app.send(Method::GET, "/users?minLogin=2", Some(admin), None).await;
    let users = body["data"].as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["username"], "frequent");

    // Non-numeric bounds are ignored.
    let (status, body) = app
        .send(Method::GET, "/users?minLogin=lots", Some(admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_user_reads_need_moderator() {
    let app = spawn_app();
    let user = app.seed_user("reader", PermissionLevel::User, true).await;

    let (status, _) = app.send(Method::GET, "/users", Some(user.id), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.send(Method::GET, "/users", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_user_self_lookup_is_forbidden_for_every_role() {
    let app = spawn_app();
    let admin = app.admin().await;
    let moderator = app.moderator().await;

    for caller in [admin, moderator] {
        let uri = format!("/users/{caller}");
        let (status, body) = app.send(Method::GET, &uri, Some(caller), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "You cannot view your own account.");
    }

    let uri = format!("/users/{moderator}");
    let (status, body) = app.send(Method::GET, &uri, Some(admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "moderator");
}

#[tokio::test]
async fn test_user_update_allow_list() {
    let app = spawn_app();
    let admin = app.admin().await;
    let target = app.seed_user("ada", PermissionLevel::User, true).await;
    let uri = format!("/users/{}", target.id);

    let (status, body) = app
        .send(
            Method::PUT,
            &uri,
            Some(admin),
            Some(json!({ "fullName": "Ada Lovelace", "role": "moderator" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["fullName"], "Ada Lovelace");
    assert_eq!(body["data"]["role"], "moderator");

    let (status, _) = app
        .send(Method::PUT, &uri, Some(admin), Some(json!({ "loginCount": 99 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(Method::PUT, &uri, Some(admin), Some(json!({ "role": "overlord" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_user_delete_then_get_is_404() {
    let app = spawn_app();
    let admin = app.admin().await;
    let target = app.seed_user("ada", PermissionLevel::User, true).await;
    let uri = format!("/users/{}", target.id);

    let (status, body) = app.send(Method::DELETE, &uri, Some(admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User soft deleted");

    let (status, _) = app.send(Method::GET, &uri, Some(admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Already inactive: both update and delete report NotFound.
    let (status, _) = app.send(Method::DELETE, &uri, Some(admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app
        .send(Method::PUT, &uri, Some(admin), Some(json!({ "fullName": "Ghost" })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The record itself is kept.
    let stored = app.repo.get_user(target.id).await.unwrap().unwrap();
    assert!(!stored.status);
}

// --- Misc ---

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app();
    let response = app
        .router
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_malformed_json_is_400_envelope() {
    let app = spawn_app();
    let moderator = app.moderator().await;

    let request = Request::post("/categories")
        .header("x-user-id", moderator.to_string())
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{ not json"))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Malformed JSON body");
}
