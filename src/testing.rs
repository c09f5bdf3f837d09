//! In-memory stores and request helpers shared by the router tests.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request},
    response::Response,
};
use bytes::Bytes;
use serde_json::Value;
use time::OffsetDateTime;
use tower::ServiceExt;
use uuid::Uuid;

use crate::{
    app::build_app,
    auth::{
        claims::Role,
        password::{hash_password, HashedSecret},
        repo::UserRepo,
        repo_types::{NewUser, ProfileChanges, User, DEFAULT_PROFILE_PICTURE},
    },
    banners::repo::{Banner, BannerChanges, BannerRepo, NewBanner},
    categories::{
        dto::slugify,
        repo::{Category, CategoryChanges, CategoryRepo, NewCategory},
    },
    config::{AppConfig, JwtConfig},
    error::StoreError,
    state::AppState,
    storage::StorageClient,
};

pub const BASE_URL: &str = "http://localhost:9495/public";

pub fn sample_user(username: &str, role: Role) -> User {
    let now = OffsetDateTime::now_utc();
    User {
        id: Uuid::new_v4(),
        full_name: "Test User".into(),
        username: username.into(),
        email: format!("{username}@x.com"),
        password_hash: "unused".into(),
        role,
        phone: Some("081234567890".into()),
        profile_picture: DEFAULT_PROFILE_PICTURE.into(),
        balance: 0.0,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

fn duplicate(field: &str) -> StoreError {
    StoreError::Duplicate { field: field.into() }
}

/// Newest-first page over records kept in insertion order.
fn page<T: Clone>(rows: Vec<T>, limit: i64, offset: i64) -> (Vec<T>, i64) {
    let total = rows.len() as i64;
    let page = rows
        .into_iter()
        .rev()
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect();
    (page, total)
}

#[derive(Default)]
pub struct MemoryUsers {
    rows: Mutex<Vec<User>>,
}

#[async_trait]
impl UserRepo for MemoryUsers {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.rows.lock().unwrap().iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.rows.lock().unwrap().iter().find(|u| u.email == email).cloned())
    }

    async fn find_active_by_identifier(&self, identifier: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.is_active && (u.email == identifier || u.username == identifier))
            .cloned())
    }

    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|u| u.username == user.username) {
            return Err(duplicate("username"));
        }
        if rows.iter().any(|u| u.email == user.email) {
            return Err(duplicate("email"));
        }
        let now = OffsetDateTime::now_utc();
        let created = User {
            id: Uuid::new_v4(),
            full_name: user.full_name,
            username: user.username,
            email: user.email,
            password_hash: user.password.as_str().to_string(),
            role: user.role,
            phone: Some(user.phone),
            profile_picture: DEFAULT_PROFILE_PICTURE.into(),
            balance: 0.0,
            is_active: user.is_active,
            created_at: now,
            updated_at: now,
        };
        rows.push(created.clone());
        Ok(created)
    }

    async fn update_profile(&self, id: Uuid, changes: ProfileChanges) -> Result<Option<User>, StoreError> {
        let mut rows = self.rows.lock().unwrap();
        let Some(user) = rows.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(v) = changes.full_name {
            user.full_name = v;
        }
        if let Some(v) = changes.phone {
            user.phone = Some(v);
        }
        if let Some(v) = changes.profile_picture {
            user.profile_picture = v;
        }
        user.updated_at = OffsetDateTime::now_utc();
        Ok(Some(user.clone()))
    }

    async fn update_password(&self, id: Uuid, password: &HashedSecret) -> Result<bool, StoreError> {
        let mut rows = self.rows.lock().unwrap();
        match rows.iter_mut().find(|u| u.id == id) {
            Some(user) => {
                user.password_hash = password.as_str().to_string();
                user.updated_at = OffsetDateTime::now_utc();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

fn words(s: &str) -> Vec<String> {
    s.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Default)]
pub struct MemoryBanners {
    rows: Mutex<Vec<Banner>>,
}

#[async_trait]
impl BannerRepo for MemoryBanners {
    async fn list(&self, search: Option<&str>, limit: i64, offset: i64) -> Result<(Vec<Banner>, i64), StoreError> {
        let terms = search.map(words).unwrap_or_default();
        let rows: Vec<Banner> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|b| {
                let title = words(&b.title);
                terms.iter().all(|t| title.contains(t))
            })
            .cloned()
            .collect();
        Ok(page(rows, limit, offset))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Banner>, StoreError> {
        Ok(self.rows.lock().unwrap().iter().find(|b| b.id == id).cloned())
    }

    async fn create(&self, banner: NewBanner) -> Result<Banner, StoreError> {
        let now = OffsetDateTime::now_utc();
        let created = Banner {
            id: Uuid::new_v4(),
            title: banner.title,
            image: banner.image,
            is_show: banner.is_show,
            created_at: now,
            updated_at: now,
        };
        self.rows.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: Uuid, changes: BannerChanges) -> Result<Option<Banner>, StoreError> {
        let mut rows = self.rows.lock().unwrap();
        let Some(banner) = rows.iter_mut().find(|b| b.id == id) else {
            return Ok(None);
        };
        if let Some(v) = changes.title {
            banner.title = v;
        }
        if let Some(v) = changes.image {
            banner.image = v;
        }
        if let Some(v) = changes.is_show {
            banner.is_show = v;
        }
        banner.updated_at = OffsetDateTime::now_utc();
        Ok(Some(banner.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|b| b.id != id);
        Ok(rows.len() != before)
    }
}

#[derive(Default)]
pub struct MemoryCategories {
    rows: Mutex<Vec<Category>>,
}

#[async_trait]
impl CategoryRepo for MemoryCategories {
    async fn list(&self, search: Option<&str>, limit: i64, offset: i64) -> Result<(Vec<Category>, i64), StoreError> {
        let needle = search.map(str::to_lowercase);
        let rows: Vec<Category> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|c| match &needle {
                Some(n) => c.name.to_lowercase().contains(n.as_str()),
                None => true,
            })
            .cloned()
            .collect();
        Ok(page(rows, limit, offset))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Category>, StoreError> {
        Ok(self.rows.lock().unwrap().iter().find(|c| c.id == id).cloned())
    }

    async fn create(&self, category: NewCategory) -> Result<Category, StoreError> {
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|c| c.slug == category.slug) {
            return Err(duplicate("slug"));
        }
        let now = OffsetDateTime::now_utc();
        let created = Category {
            id: Uuid::new_v4(),
            name: category.name,
            slug: category.slug,
            description: category.description,
            icon: category.icon,
            created_at: now,
            updated_at: now,
        };
        rows.push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: Uuid, changes: CategoryChanges) -> Result<Option<Category>, StoreError> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(slug) = &changes.slug {
            if rows.iter().any(|c| c.id != id && &c.slug == slug) {
                return Err(duplicate("slug"));
            }
        }
        let Some(category) = rows.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        if let Some(v) = changes.name {
            category.name = v;
        }
        if let Some(v) = changes.slug {
            category.slug = v;
        }
        if let Some(v) = changes.description {
            category.description = v;
        }
        if let Some(v) = changes.icon {
            category.icon = v;
        }
        category.updated_at = OffsetDateTime::now_utc();
        Ok(Some(category.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|c| c.id != id);
        Ok(rows.len() != before)
    }
}

/// Object store that keeps bodies in a map.
#[derive(Default)]
pub struct MemoryStorage {
    objects: Mutex<BTreeMap<String, Bytes>>,
}

impl MemoryStorage {
    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait]
impl StorageClient for MemoryStorage {
    async fn put_object(&self, key: &str, body: Bytes, _content_type: &str) -> anyhow::Result<()> {
        self.objects.lock().unwrap().insert(key.to_string(), body);
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
        match self.objects.lock().unwrap().remove(key) {
            Some(_) => Ok(()),
            None => anyhow::bail!("no such object {key}"),
        }
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "postgres://unused".into(),
        jwt: JwtConfig {
            secret: "test-secret".into(),
            issuer: "kantin".into(),
            audience: "kantin-users".into(),
            expires_in: Duration::from_secs(3600),
            cookie_expire_days: 30,
        },
        production: false,
        base_url: BASE_URL.into(),
        host: "127.0.0.1".into(),
        port: 9495,
        cors_origin: "http://localhost:3000".into(),
        public_dir: std::env::temp_dir().join("kantin-test-public"),
    }
}

/// A file part for `multipart_body`.
pub struct FilePart {
    pub field: &'static str,
    pub file_name: &'static str,
    pub content_type: &'static str,
    pub data: Vec<u8>,
}

const BOUNDARY: &str = "kantin-test-boundary";

pub fn multipart_body(fields: &[(&str, &str)], file: Option<FilePart>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some(f) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                f.field, f.file_name, f.content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(&f.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub async fn read_json(res: Response) -> Value {
    let bytes = to_bytes(res.into_body(), usize::MAX).await.expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}

pub struct TestApp {
    pub state: AppState,
    pub users: Arc<MemoryUsers>,
    pub banners: Arc<MemoryBanners>,
    pub categories: Arc<MemoryCategories>,
    pub storage: Arc<MemoryStorage>,
}

impl TestApp {
    pub fn new() -> Self {
        let users = Arc::new(MemoryUsers::default());
        let banners = Arc::new(MemoryBanners::default());
        let categories = Arc::new(MemoryCategories::default());
        let storage = Arc::new(MemoryStorage::default());
        let state = AppState::from_parts(
            test_config(),
            users.clone(),
            banners.clone(),
            categories.clone(),
            storage.clone(),
        );
        Self {
            state,
            users,
            banners,
            categories,
            storage,
        }
    }

    pub async fn insert_user(&self, username: &str, password: &str, role: Role, active: bool) -> User {
        self.users
            .create(NewUser {
                full_name: "Test User".into(),
                username: username.into(),
                email: format!("{username}@x.com"),
                phone: "081234567890".into(),
                password: hash_password(password).expect("hash"),
                role,
                is_active: active,
            })
            .await
            .expect("insert user")
    }

    pub async fn insert_banner(&self, title: &str) -> Banner {
        self.banners
            .create(NewBanner {
                title: title.into(),
                image: format!("{BASE_URL}/images/seed-{}.png", slugify(title)),
                is_show: true,
            })
            .await
            .expect("insert banner")
    }

    pub async fn insert_category(&self, name: &str) -> Category {
        let slug = slugify(name);
        self.categories
            .create(NewCategory {
                name: name.into(),
                description: format!("All about {name}"),
                icon: format!("{BASE_URL}/images/seed-{slug}.png"),
                slug,
            })
            .await
            .expect("insert category")
    }

    pub fn session_cookie(&self, user: &User) -> String {
        let token = self.state.jwt.issue(user.id, user.role).expect("issue token");
        format!("token={token}")
    }

    async fn send(&self, req: Request<Body>) -> Response {
        build_app(self.state.clone())
            .expect("build app")
            .oneshot(req)
            .await
            .expect("infallible")
    }

    fn request(method: Method, path: &str, cookie: Option<String>) -> axum::http::request::Builder {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(c) = cookie {
            builder = builder.header(header::COOKIE, c);
        }
        builder
    }

    pub async fn json(&self, method: Method, path: &str, body: Value, cookie: Option<String>) -> Response {
        let req = Self::request(method, path, cookie)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(req).await
    }

    pub async fn get(&self, path: &str, cookie: Option<String>) -> Response {
        let req = Self::request(Method::GET, path, cookie)
            .body(Body::empty())
            .unwrap();
        self.send(req).await
    }

    pub async fn delete(&self, path: &str, cookie: Option<String>) -> Response {
        let req = Self::request(Method::DELETE, path, cookie)
            .body(Body::empty())
            .unwrap();
        self.send(req).await
    }

    pub async fn multipart(&self, method: Method, path: &str, body: Vec<u8>, cookie: Option<String>) -> Response {
        let req = Self::request(method, path, cookie)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();
        self.send(req).await
    }
}
