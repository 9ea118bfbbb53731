use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::features::files::services::AccessPolicy;
use crate::shared::mime::DEFAULT_ALLOWED_MIME_TYPES;

#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub database: Option<DatabaseConfig>,
    pub auth: AuthConfig,
    pub swagger: SwaggerConfig,
    pub storage: StorageConfig,
    pub files: FilesConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub issuer: String,
    pub audience: String,
    pub jwks_cache_ttl: Duration,
    pub jwt_leeway: Duration,
}

#[derive(Debug, Clone)]
pub struct SwaggerConfig {
    pub username: Option<String>,
    pub password: Option<String>,
    pub title: String,
    pub version: String,
    pub description: String,
}

/// Which physical storage backend serves files
#[derive(Debug, Clone)]
pub enum StorageConfig {
    MinIO(MinIOConfig),
    Memory(MemoryStorageConfig),
}

/// MinIO/S3 storage configuration
#[derive(Debug, Clone)]
pub struct MinIOConfig {
    /// MinIO/S3 endpoint URL
    pub endpoint: String,
    /// Endpoint used in public file URLs (defaults to endpoint)
    pub public_endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    /// AWS region (for S3 compatibility)
    pub region: String,
    /// Prefix for public objects (e.g., "public")
    pub public_prefix: String,
    /// Prefix for private objects (e.g., "private")
    pub private_prefix: String,
}

/// In-process storage configuration
#[derive(Debug, Clone)]
pub struct MemoryStorageConfig {
    /// Base URL prepended to every file path
    pub base_url: String,
    /// Key used to sign time-limited URLs
    pub signing_key: String,
}

/// File access rules and upload limits
#[derive(Debug, Clone)]
pub struct FilesConfig {
    pub access_policy: AccessPolicy,
    pub signed_url_default_expiry_secs: u32,
    pub max_upload_size: usize,
    pub allowed_mime_types: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if exists, ignore if not found (optional for production)
        if let Err(e) = dotenvy::dotenv() {
            if !e.to_string().contains("not found") {
                eprintln!("Warning: Error loading .env file: {}", e);
            }
        }

        let metadata_store = env::var("METADATA_STORE").unwrap_or_else(|_| "postgres".to_string());
        let database = match metadata_store.as_str() {
            "postgres" => Some(DatabaseConfig::from_env()?),
            "memory" => None,
            other => {
                return Err(format!(
                    "METADATA_STORE must be 'postgres' or 'memory', got '{}'",
                    other
                ))
            }
        };

        Ok(Config {
            app: AppConfig::from_env()?,
            database,
            auth: AuthConfig::from_env()?,
            swagger: SwaggerConfig::from_env()?,
            storage: StorageConfig::from_env()?,
            files: FilesConfig::from_env()?,
        })
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|e| format!("Invalid PORT: {}", e))?;

        let cors_allowed_origins = parse_list(
            &env::var("CORS_ALLOWED_ORIGINS").unwrap_or_else(|_| "*".to_string()),
        );

        Ok(Self {
            host,
            port,
            cors_allowed_origins,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl DatabaseConfig {
    const DEFAULT_MAX_CONNECTIONS: u32 = 10;
    const DEFAULT_MIN_CONNECTIONS: u32 = 1;
    const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 5;
    const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600; // 10 minutes
    const DEFAULT_MAX_LIFETIME_SECS: u64 = 1800; // 30 minutes

    pub fn from_env() -> Result<Self, String> {
        let url = env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set".to_string())?;

        Ok(Self {
            url,
            max_connections: parse_env("DB_MAX_CONNECTIONS", Self::DEFAULT_MAX_CONNECTIONS)?,
            min_connections: parse_env("DB_MIN_CONNECTIONS", Self::DEFAULT_MIN_CONNECTIONS)?,
            acquire_timeout_secs: parse_env(
                "DB_ACQUIRE_TIMEOUT_SECS",
                Self::DEFAULT_ACQUIRE_TIMEOUT_SECS,
            )?,
            idle_timeout_secs: parse_env("DB_IDLE_TIMEOUT_SECS", Self::DEFAULT_IDLE_TIMEOUT_SECS)?,
            max_lifetime_secs: parse_env("DB_MAX_LIFETIME_SECS", Self::DEFAULT_MAX_LIFETIME_SECS)?,
        })
    }
}

impl AuthConfig {
    const DEFAULT_JWKS_CACHE_TTL_SECS: u64 = 3600; // 1 hour
    const DEFAULT_JWT_LEEWAY_SECS: u64 = 60;

    pub fn from_env() -> Result<Self, String> {
        let issuer = env::var("AUTH_ISSUER")
            .map_err(|_| "AUTH_ISSUER environment variable is required".to_string())?;

        let audience = env::var("AUTH_AUDIENCE")
            .map_err(|_| "AUTH_AUDIENCE environment variable is required".to_string())?;

        let jwks_cache_ttl_secs = parse_env("JWKS_CACHE_TTL", Self::DEFAULT_JWKS_CACHE_TTL_SECS)?;
        let jwt_leeway_secs = parse_env("JWT_LEEWAY", Self::DEFAULT_JWT_LEEWAY_SECS)?;

        Ok(Self {
            issuer: issuer.trim_end_matches('/').to_string(),
            audience,
            jwks_cache_ttl: Duration::from_secs(jwks_cache_ttl_secs),
            jwt_leeway: Duration::from_secs(jwt_leeway_secs),
        })
    }
}

impl SwaggerConfig {
    pub fn from_env() -> Result<Self, String> {
        let username = env::var("SWAGGER_USERNAME").ok().filter(|s| !s.is_empty());
        let password = env::var("SWAGGER_PASSWORD").ok().filter(|s| !s.is_empty());
        let title = env::var("SWAGGER_TITLE").unwrap_or_else(|_| "Filegate API".to_string());
        let version = env::var("SWAGGER_VERSION").unwrap_or_else(|_| "0.1.0".to_string());
        let description = env::var("SWAGGER_DESCRIPTION")
            .unwrap_or_else(|_| "Image storage with per-file access control".to_string());

        Ok(Self {
            username,
            password,
            title,
            version,
            description,
        })
    }

    /// Returns credentials in "username:password" format if auth is enabled
    pub fn credentials(&self) -> Option<String> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some(format!("{}:{}", user, pass)),
            _ => None,
        }
    }
}

impl StorageConfig {
    pub fn from_env() -> Result<Self, String> {
        let provider = env::var("STORAGE_PROVIDER").unwrap_or_else(|_| "minio".to_string());
        match provider.as_str() {
            "minio" => Ok(Self::MinIO(MinIOConfig::from_env()?)),
            "memory" => Ok(Self::Memory(MemoryStorageConfig::from_env()?)),
            other => Err(format!(
                "STORAGE_PROVIDER must be 'minio' or 'memory', got '{}'",
                other
            )),
        }
    }
}

impl MinIOConfig {
    pub fn from_env() -> Result<Self, String> {
        let endpoint =
            env::var("MINIO_ENDPOINT").unwrap_or_else(|_| "http://localhost:9000".to_string());

        // Public endpoint defaults to the main endpoint if not specified
        let public_endpoint =
            env::var("MINIO_PUBLIC_ENDPOINT").unwrap_or_else(|_| endpoint.clone());

        let access_key = env::var("MINIO_ACCESS_KEY").unwrap_or_else(|_| "minioadmin".to_string());
        let secret_key = env::var("MINIO_SECRET_KEY").unwrap_or_else(|_| "minioadmin".to_string());
        let bucket = env::var("MINIO_BUCKET").unwrap_or_else(|_| "filegate-images".to_string());
        let region = env::var("MINIO_REGION").unwrap_or_else(|_| "us-east-1".to_string());
        let public_prefix =
            env::var("MINIO_PUBLIC_PREFIX").unwrap_or_else(|_| "public".to_string());
        let private_prefix =
            env::var("MINIO_PRIVATE_PREFIX").unwrap_or_else(|_| "private".to_string());

        if public_prefix == private_prefix {
            return Err("MINIO_PUBLIC_PREFIX and MINIO_PRIVATE_PREFIX must differ".to_string());
        }

        Ok(Self {
            endpoint,
            public_endpoint,
            access_key,
            secret_key,
            bucket,
            region,
            public_prefix,
            private_prefix,
        })
    }
}

impl MemoryStorageConfig {
    pub fn from_env() -> Result<Self, String> {
        let base_url = env::var("MEMORY_STORAGE_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:3000/files".to_string());
        let signing_key = env::var("MEMORY_STORAGE_SIGNING_KEY")
            .map_err(|_| "MEMORY_STORAGE_SIGNING_KEY must be set for memory storage".to_string())?;

        Ok(Self {
            base_url,
            signing_key,
        })
    }
}

impl FilesConfig {
    const DEFAULT_SIGNED_URL_EXPIRY_SECS: u32 = 3600; // 1 hour
    const DEFAULT_MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024; // 10MB

    pub fn from_env() -> Result<Self, String> {
        let access_policy = env::var("FILES_ACCESS_POLICY")
            .map(|v| AccessPolicy::from_str(&v))
            .unwrap_or(Ok(AccessPolicy::default()))?;

        let signed_url_default_expiry_secs = parse_env(
            "FILES_SIGNED_URL_DEFAULT_EXPIRY_SECS",
            Self::DEFAULT_SIGNED_URL_EXPIRY_SECS,
        )?;
        if signed_url_default_expiry_secs == 0 {
            return Err("FILES_SIGNED_URL_DEFAULT_EXPIRY_SECS must be positive".to_string());
        }

        let max_upload_size = parse_env("FILES_MAX_UPLOAD_SIZE", Self::DEFAULT_MAX_UPLOAD_SIZE)?;

        let allowed_mime_types = env::var("FILES_ALLOWED_MIME_TYPES")
            .map(|v| parse_list(&v))
            .unwrap_or_else(|_| {
                DEFAULT_ALLOWED_MIME_TYPES
                    .iter()
                    .map(|s| s.to_string())
                    .collect()
            });

        Ok(Self {
            access_policy,
            signed_url_default_expiry_secs,
            max_upload_size,
            allowed_mime_types,
        })
    }

    pub fn is_mime_type_allowed(&self, content_type: &str) -> bool {
        self.allowed_mime_types.iter().any(|t| t == content_type)
    }
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            access_policy: AccessPolicy::default(),
            signed_url_default_expiry_secs: Self::DEFAULT_SIGNED_URL_EXPIRY_SECS,
            max_upload_size: Self::DEFAULT_MAX_UPLOAD_SIZE,
            allowed_mime_types: DEFAULT_ALLOWED_MIME_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Read an optional numeric variable, falling back to `default`
fn parse_env<T>(name: &str, default: T) -> Result<T, String>
where
    T: FromStr,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| format!("{} must be a valid number", name)),
        Err(_) => Ok(default),
    }
}

/// Split a comma-separated list, dropping blanks
fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list_drops_blanks() {
        assert_eq!(
            parse_list(" image/png, ,image/jpeg,"),
            vec!["image/png".to_string(), "image/jpeg".to_string()]
        );
        assert!(parse_list("").is_empty());
    }

    #[test]
    fn test_parse_env_uses_default_when_unset() {
        let value: u32 = parse_env("FILEGATE_TEST_SURELY_UNSET_VARIABLE", 42).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_files_config_defaults() {
        let config = FilesConfig::default();
        assert_eq!(config.access_policy, AccessPolicy::ExplicitPermissions);
        assert_eq!(config.signed_url_default_expiry_secs, 3600);
        assert!(config.is_mime_type_allowed("image/png"));
        assert!(!config.is_mime_type_allowed("application/x-msdownload"));
    }
}
