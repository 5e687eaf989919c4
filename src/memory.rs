use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{RepoError, RepoResult};
use crate::models::{
    Category, CategoryRef, NewProduct, NewRole, NewUser, Product, ProductChanges, ProductListing,
    ProductQuery, Role, RoleChanges, User, UserChanges, UserDetails, UserQuery,
};
use crate::repository::Repository;

#[derive(Default)]
struct Store {
    categories: Vec<Category>,
    products: Vec<Product>,
    roles: Vec<Role>,
    users: Vec<User>,
}

impl Store {
    fn category_by_name(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name == name)
    }

    fn role_for(&self, user: &User) -> Option<Role> {
        self.roles
            .iter()
            .find(|r| r.name == user.role.as_str())
            .cloned()
    }

    fn details(&self, user: &User) -> UserDetails {
        UserDetails {
            user: user.clone(),
            role_details: self.role_for(user),
        }
    }

    fn ensure_unique_user(&self, id: Option<Uuid>, username: Option<&str>, email: Option<&str>) -> RepoResult<()> {
        let others = self.users.iter().filter(|u| Some(u.id) != id);
        for other in others {
            if username.is_some_and(|name| other.username == name) {
                return Err(RepoError::Conflict("Username already exists".to_string()));
            }
            if email.is_some_and(|mail| other.email == mail) {
                return Err(RepoError::Conflict("Email already exists".to_string()));
            }
        }
        Ok(())
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// InMemoryRepository
///
/// A `Repository` kept entirely in process memory, used for local runs without
/// `DATABASE_URL` and by the test suites. Insertion order is preserved for
/// listings. Each trait call takes the lock once, so multi-record checks (the
/// product's category, a user's active status) are atomic with their writes.
#[derive(Default)]
pub struct InMemoryRepository {
    store: RwLock<Store>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn list_categories(&self) -> RepoResult<Vec<Category>> {
        Ok(self.store.read().await.categories.clone())
    }

    async fn get_category(&self, id: Uuid) -> RepoResult<Option<Category>> {
        let store = self.store.read().await;
        Ok(store.categories.iter().find(|c| c.id == id).cloned())
    }

    async fn create_category(&self, name: String) -> RepoResult<Category> {
        let category = Category {
            id: Uuid::new_v4(),
            name,
            is_deleted: false,
        };
        self.store.write().await.categories.push(category.clone());
        Ok(category)
    }

    async fn rename_category(&self, id: Uuid, name: String) -> RepoResult<Option<Category>> {
        let mut store = self.store.write().await;
        Ok(store.categories.iter_mut().find(|c| c.id == id).map(|c| {
            c.name = name;
            c.clone()
        }))
    }

    async fn soft_delete_category(&self, id: Uuid) -> RepoResult<Option<Category>> {
        let mut store = self.store.write().await;
        Ok(store.categories.iter_mut().find(|c| c.id == id).map(|c| {
            c.is_deleted = true;
            c.clone()
        }))
    }

    async fn list_products(&self, query: &ProductQuery) -> RepoResult<Vec<ProductListing>> {
        let store = self.store.read().await;
        let listings = store
            .products
            .iter()
            .filter(|p| p.price >= query.min_price && p.price <= query.max_price)
            .filter(|p| {
                query
                    .name
                    .as_deref()
                    .is_none_or(|name| contains_ignore_case(&p.name, name))
            })
            .filter_map(|p| {
                let category = store.categories.iter().find(|c| c.id == p.category)?;
                Some(ProductListing {
                    id: p.id,
                    name: p.name.clone(),
                    price: p.price,
                    quantity: p.quantity,
                    category: CategoryRef {
                        id: category.id,
                        name: category.name.clone(),
                    },
                    is_deleted: p.is_deleted,
                })
            })
            .collect();
        Ok(listings)
    }

    async fn get_product(&self, id: Uuid) -> RepoResult<Option<Product>> {
        let store = self.store.read().await;
        Ok(store.products.iter().find(|p| p.id == id).cloned())
    }

    async fn create_product(&self, product: NewProduct) -> RepoResult<Product> {
        let mut store = self.store.write().await;
        let category = store
            .category_by_name(&product.category_name)
            .ok_or(RepoError::NotFound("Category"))?
            .id;
        let created = Product {
            id: Uuid::new_v4(),
            name: product.name,
            price: product.price,
            quantity: product.quantity,
            category,
            is_deleted: false,
        };
        store.products.push(created.clone());
        Ok(created)
    }

    async fn update_product(&self, id: Uuid, changes: ProductChanges) -> RepoResult<Option<Product>> {
        let mut store = self.store.write().await;
        if !store.products.iter().any(|p| p.id == id) {
            return Ok(None);
        }
        let category = match &changes.category_name {
            Some(name) => Some(
                store
                    .category_by_name(name)
                    .ok_or(RepoError::NotFound("Category"))?
                    .id,
            ),
            None => None,
        };
        Ok(store.products.iter_mut().find(|p| p.id == id).map(|p| {
            if let Some(name) = changes.name {
                p.name = name;
            }
            if let Some(price) = changes.price {
                p.price = price;
            }
            if let Some(quantity) = changes.quantity {
                p.quantity = quantity;
            }
            if let Some(category) = category {
                p.category = category;
            }
            p.clone()
        }))
    }

    async fn soft_delete_product(&self, id: Uuid) -> RepoResult<Option<Product>> {
        let mut store = self.store.write().await;
        Ok(store.products.iter_mut().find(|p| p.id == id).map(|p| {
            p.is_deleted = true;
            p.clone()
        }))
    }

    async fn list_roles(&self) -> RepoResult<Vec<Role>> {
        Ok(self.store.read().await.roles.clone())
    }

    async fn get_role(&self, id: Uuid) -> RepoResult<Option<Role>> {
        let store = self.store.read().await;
        Ok(store.roles.iter().find(|r| r.id == id).cloned())
    }

    async fn find_role_by_name(&self, name: &str) -> RepoResult<Option<Role>> {
        let store = self.store.read().await;
        Ok(store.roles.iter().find(|r| r.name == name).cloned())
    }

    async fn create_role(&self, role: NewRole) -> RepoResult<Role> {
        let mut store = self.store.write().await;
        if store.roles.iter().any(|r| r.name == role.name) {
            return Err(RepoError::Conflict("Role already exists".to_string()));
        }
        let created = Role {
            id: Uuid::new_v4(),
            name: role.name,
            description: role.description,
        };
        store.roles.push(created.clone());
        Ok(created)
    }

    async fn update_role(&self, id: Uuid, changes: RoleChanges) -> RepoResult<Option<Role>> {
        let mut store = self.store.write().await;
        if !store.roles.iter().any(|r| r.id == id) {
            return Ok(None);
        }
        if let Some(name) = &changes.name {
            if store.roles.iter().any(|r| r.id != id && &r.name == name) {
                return Err(RepoError::Conflict("Role already exists".to_string()));
            }
        }
        Ok(store.roles.iter_mut().find(|r| r.id == id).map(|r| {
            if let Some(name) = changes.name {
                r.name = name;
            }
            if let Some(description) = changes.description {
                r.description = description;
            }
            r.clone()
        }))
    }

    async fn delete_role(&self, id: Uuid) -> RepoResult<bool> {
        let mut store = self.store.write().await;
        let before = store.roles.len();
        store.roles.retain(|r| r.id != id);
        Ok(store.roles.len() < before)
    }

    async fn list_users(&self, query: &UserQuery) -> RepoResult<Vec<UserDetails>> {
        let store = self.store.read().await;
        let users = store
            .users
            .iter()
            .filter(|u| u.status)
            .filter(|u| {
                query
                    .username
                    .as_deref()
                    .is_none_or(|name| contains_ignore_case(&u.username, name))
            })
            .filter(|u| {
                query
                    .full_name
                    .as_deref()
                    .is_none_or(|name| contains_ignore_case(&u.full_name, name))
            })
            .filter(|u| query.min_login.is_none_or(|min| u.login_count >= min))
            .filter(|u| query.max_login.is_none_or(|max| u.login_count <= max))
            .map(|u| store.details(u))
            .collect();
        Ok(users)
    }

    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        let store = self.store.read().await;
        Ok(store.users.iter().find(|u| u.id == id).cloned())
    }

    async fn get_user_details(&self, id: Uuid) -> RepoResult<Option<UserDetails>> {
        let store = self.store.read().await;
        Ok(store.users.iter().find(|u| u.id == id).map(|u| store.details(u)))
    }

    async fn find_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let store = self.store.read().await;
        Ok(store.users.iter().find(|u| u.username == username).cloned())
    }

    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        let mut store = self.store.write().await;
        store.ensure_unique_user(None, Some(&user.username), Some(&user.email))?;
        let now = Utc::now();
        let created = User {
            id: Uuid::new_v4(),
            username: user.username,
            password_hash: user.password_hash,
            email: user.email,
            full_name: user.full_name,
            avatar_url: user.avatar_url,
            status: user.status,
            role: user.role,
            login_count: 0,
            created_at: now,
            updated_at: now,
        };
        store.users.push(created.clone());
        Ok(created)
    }

    async fn update_user(&self, id: Uuid, changes: UserChanges) -> RepoResult<Option<User>> {
        let mut store = self.store.write().await;
        if !store.users.iter().any(|u| u.id == id && u.status) {
            return Ok(None);
        }
        store.ensure_unique_user(Some(id), changes.username.as_deref(), changes.email.as_deref())?;
        Ok(store.users.iter_mut().find(|u| u.id == id).map(|u| {
            if let Some(username) = changes.username {
                u.username = username;
            }
            if let Some(email) = changes.email {
                u.email = email;
            }
            if let Some(hash) = changes.password_hash {
                u.password_hash = hash;
            }
            if let Some(full_name) = changes.full_name {
                u.full_name = full_name;
            }
            if let Some(avatar_url) = changes.avatar_url {
                u.avatar_url = avatar_url;
            }
            if let Some(role) = changes.role {
                u.role = role;
            }
            u.updated_at = Utc::now();
            u.clone()
        }))
    }

    async fn deactivate_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        let mut store = self.store.write().await;
        Ok(store
            .users
            .iter_mut()
            .find(|u| u.id == id && u.status)
            .map(|u| {
                u.status = false;
                u.updated_at = Utc::now();
                u.clone()
            }))
    }

    async fn record_login(&self, id: Uuid) -> RepoResult<Option<User>> {
        let mut store = self.store.write().await;
        Ok(store.users.iter_mut().find(|u| u.id == id).map(|u| {
            u.login_count += 1;
            u.clone()
        }))
    }
}
