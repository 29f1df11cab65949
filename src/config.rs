use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Firebase Identity Toolkit + Realtime Database
    Firebase,
    /// In-process store and identity provider for local development
    Memory,
}

impl std::str::FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "firebase" => Ok(Backend::Firebase),
            "memory" => Ok(Backend::Memory),
            other => Err(format!("unknown backend '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub backend: Backend,

    pub firebase_database_url: String,
    pub firebase_credentials: String,
    pub identity_base_url: String,

    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_base_url: String,

    pub http_timeout_secs: u64,
    pub request_timeout_secs: u64,

    pub admin_jwt_secret: Option<String>,
    pub cors_allowed_origins: Vec<String>,

    pub auth_rate_limit_max: u32,
    pub auth_rate_limit_window_secs: u64,
}

impl Config {
    pub fn from_env() -> Self {
        let backend: Backend = env::var("BACKEND")
            .unwrap_or_else(|_| "firebase".into())
            .parse()
            .expect("BACKEND must be 'firebase' or 'memory'");

        let firebase_database_url = match backend {
            Backend::Firebase => {
                env::var("FIREBASE_DATABASE_URL").expect("FIREBASE_DATABASE_URL must be set")
            }
            Backend::Memory => env::var("FIREBASE_DATABASE_URL").unwrap_or_default(),
        };

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "5000".into())
                .parse()
                .expect("PORT must be a number"),
            backend,

            firebase_database_url,
            firebase_credentials: env::var("FIREBASE_CREDENTIALS")
                .unwrap_or_else(|_| "serviceAccountKey.json".into()),
            identity_base_url: env::var("IDENTITY_BASE_URL")
                .unwrap_or_else(|_| "https://identitytoolkit.googleapis.com/v1".into()),

            gemini_api_key: env::var("GEMINI_API_KEY").unwrap_or_default(),
            gemini_model: env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| "gemini-1.5-flash".into()),
            gemini_base_url: env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| "https://generativelanguage.googleapis.com/v1beta".into()),

            http_timeout_secs: env::var("HTTP_TIMEOUT_SECS")
                .unwrap_or_else(|_| "15".into())
                .parse()
                .unwrap_or(15),
            request_timeout_secs: env::var("REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".into())
                .parse()
                .unwrap_or(30),

            admin_jwt_secret: env::var("ADMIN_JWT_SECRET").ok().filter(|s| !s.is_empty()),
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .map(|v| split_list(&v))
                .unwrap_or_default(),

            auth_rate_limit_max: env::var("AUTH_RATE_LIMIT_MAX")
                .unwrap_or_else(|_| "5".into())
                .parse()
                .unwrap_or(5),
            auth_rate_limit_window_secs: env::var("AUTH_RATE_LIMIT_WINDOW_SECS")
                .unwrap_or_else(|_| "60".into())
                .parse()
                .unwrap_or(60),
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Configuration for in-process runs with no remote collaborators.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            backend: Backend::Memory,
            firebase_database_url: String::new(),
            firebase_credentials: String::new(),
            identity_base_url: String::new(),
            gemini_api_key: String::new(),
            gemini_model: "test-model".into(),
            gemini_base_url: String::new(),
            http_timeout_secs: 1,
            request_timeout_secs: 5,
            admin_jwt_secret: Some("test-admin-secret".into()),
            cors_allowed_origins: Vec::new(),
            auth_rate_limit_max: 100,
            auth_rate_limit_window_secs: 60,
        }
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
