use std::env;

const MAX_ACCESS_TOKEN_MINUTES: i64 = 60 * 24 * 30;
const MAX_REFRESH_TOKEN_DAYS: i64 = 365 * 10;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server_port: u16,
    pub sqlite_path: String,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub access_token_minutes: i64,
    pub refresh_token_days: i64,
    pub page_size: u64,
    pub max_page_size: u64,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

/// Credentials for the first administrator, created at startup when no admin exists.
#[derive(Clone, Debug)]
pub struct BootstrapAdmin {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let server_port = parse_var("SERVER_PORT").unwrap_or(8000);

        let sqlite_path =
            env::var("SQLITE_PATH").unwrap_or_else(|_| "./data/movie.sqlite".to_string());
        let database_url = env::var("DATABASE_URL").ok().filter(|v| !v.trim().is_empty());

        let jwt_secret = env::var("JWT_SECRET")
            .unwrap_or_else(|_| "dev-only-movie-rating-secret".to_string());

        let bootstrap_admin = match (
            env::var("ADMIN_USERNAME"),
            env::var("ADMIN_EMAIL"),
            env::var("ADMIN_PASSWORD"),
        ) {
            (Ok(username), Ok(email), Ok(password)) => Some(BootstrapAdmin {
                username,
                email,
                password,
            }),
            _ => None,
        };

        Self {
            server_port,
            sqlite_path,
            database_url,
            jwt_secret,
            access_token_minutes: lifetime(parse_var("ACCESS_TOKEN_MINUTES"), 60, MAX_ACCESS_TOKEN_MINUTES),
            refresh_token_days: lifetime(parse_var("REFRESH_TOKEN_DAYS"), 1, MAX_REFRESH_TOKEN_DAYS),
            page_size: parse_var("PAGE_SIZE").filter(|v| *v > 0).unwrap_or(10),
            max_page_size: parse_var("MAX_PAGE_SIZE").filter(|v| *v > 0).unwrap_or(100),
            bootstrap_admin,
        }
    }

    /// Settings used by tests: in-memory SQLite and a fixed signing key.
    pub fn for_tests() -> Self {
        Self {
            server_port: 0,
            sqlite_path: ":memory:".to_string(),
            database_url: Some("sqlite::memory:".to_string()),
            jwt_secret: "test-secret".to_string(),
            access_token_minutes: 5,
            refresh_token_days: 1,
            page_size: 10,
            max_page_size: 100,
            bootstrap_admin: None,
        }
    }

    pub fn database_url(&self) -> String {
        if let Some(url) = &self.database_url {
            return url.clone();
        }

        let path = self.sqlite_path.trim();
        if path.starts_with("sqlite:") || path.starts_with("file:") {
            return path.to_string();
        }
        format!("sqlite://{}", path)
    }
}

/// Token lifetimes stay within 1..=max so expiry arithmetic cannot overflow.
fn lifetime(value: Option<i64>, default: i64, max: i64) -> i64 {
    value.unwrap_or(default).clamp(1, max)
}

fn parse_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}
