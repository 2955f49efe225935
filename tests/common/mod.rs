#![allow(dead_code)]

use actix_web::{
    dev::{ServiceFactory, ServiceRequest, ServiceResponse},
    web, App,
};
use chrono::{NaiveDate, Utc};
use movie_rating_backend::config::AppConfig;
use movie_rating_backend::db::init_sqlite_schema;
use movie_rating_backend::entity::{movie, user};
use movie_rating_backend::password::hash_password;
use movie_rating_backend::routes;
use movie_rating_backend::token::{issue_pair, TokenPair};
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use serde_json::{json, Value};
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const PASSWORD: &str = "Tr1cky-Passphrase";

pub struct TestContext {
    pub db: DatabaseConnection,
    pub config: AppConfig,
    db_file: Option<PathBuf>,
}

impl Drop for TestContext {
    fn drop(&mut self) {
        if let Some(path) = self.db_file.take() {
            for suffix in ["", "-wal", "-shm"] {
                let _ = fs::remove_file(format!("{}{}", path.display(), suffix));
            }
        }
    }
}

impl TestContext {
    pub async fn new() -> TestContext {
        let config = AppConfig::for_tests();
        let mut opts = ConnectOptions::new(config.database_url());
        opts.max_connections(1).min_connections(1).sqlx_logging(false);
        let db = Database::connect(opts)
            .await
            .expect("Failed to open in-memory database");
        init_sqlite_schema(&db).await.expect("Failed to apply schema");

        TestContext { db, config, db_file: None }
    }

    /// File-backed SQLite with a multi-connection pool, so concurrent
    /// requests really run on separate connections.
    pub async fn file_backed(max_connections: u32) -> TestContext {
        static SEQ: AtomicUsize = AtomicUsize::new(0);
        let path = std::env::temp_dir().join(format!(
            "movie-rating-test-{}-{}-{}.sqlite",
            std::process::id(),
            SEQ.fetch_add(1, Ordering::SeqCst),
            Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));
        let mut config = AppConfig::for_tests();
        config.database_url = Some(format!("sqlite://{}?mode=rwc", path.display()));

        let mut opts = ConnectOptions::new(config.database_url());
        opts.max_connections(max_connections)
            .min_connections(1)
            .sqlx_logging(false);
        let db = Database::connect(opts)
            .await
            .expect("Failed to open file database");
        init_sqlite_schema(&db).await.expect("Failed to apply schema");

        TestContext { db, config, db_file: Some(path) }
    }

    pub fn create_app(
        &self,
    ) -> App<
        impl ServiceFactory<
            ServiceRequest,
            Config = (),
            Response = ServiceResponse,
            Error = actix_web::Error,
            InitError = (),
        >,
    > {
        App::new()
            .app_data(web::Data::new(self.config.clone()))
            .app_data(web::Data::new(self.db.clone()))
            .configure(routes::configure)
    }

    /// Inserts an account directly and returns it with a fresh token pair.
    pub async fn create_account(&self, username: &str, role: &str) -> (user::Model, TokenPair) {
        let now = Utc::now();
        let is_admin = role == user::ROLE_ADMIN;
        let model = user::ActiveModel {
            username: Set(username.to_string()),
            email: Set(format!("{}@example.com", username)),
            password_hash: Set(hash_password(PASSWORD).expect("hash")),
            first_name: Set(Some(username.to_string())),
            last_name: Set(Some("Tester".to_string())),
            phone_number: Set(None),
            date_of_birth: Set(None),
            role: Set(role.to_string()),
            is_active: Set(true),
            is_staff: Set(is_admin),
            is_superuser: Set(is_admin),
            last_login: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .expect("Failed to insert user");
        let tokens = issue_pair(&self.config, &model).expect("Failed to issue tokens");
        (model, tokens)
    }

    pub async fn create_user(&self, username: &str) -> (user::Model, TokenPair) {
        self.create_account(username, user::ROLE_USER).await
    }

    pub async fn create_admin(&self, username: &str) -> (user::Model, TokenPair) {
        self.create_account(username, user::ROLE_ADMIN).await
    }

    pub async fn create_movie(&self, owner: &user::Model, name: &str) -> movie::Model {
        let now = Utc::now();
        movie::ActiveModel {
            name: Set(name.to_string()),
            description: Set(format!("{} description", name)),
            released_at: Set(NaiveDate::from_ymd_opt(2008, 5, 2).expect("date")),
            duration: Set(126),
            genre: Set("Science Fiction".to_string()),
            language: Set("English".to_string()),
            created_by: Set(Some(owner.id)),
            avg_rating: Set(0.0),
            total_rating: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .expect("Failed to insert movie")
    }
}

pub fn bearer(tokens: &TokenPair) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", tokens.access))
}

pub fn movie_payload(name: &str) -> Value {
    json!({
        "name": name,
        "description": "An epic science fiction adventure",
        "released_at": "2008-05-02",
        "duration": 126,
        "genre": "Science Fiction",
        "language": "English"
    })
}
