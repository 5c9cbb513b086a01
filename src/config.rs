use crate::services::{
    animal_service::UrlPolicy, image_storage_service::DEFAULT_URL_EXPIRY,
    object_store::S3Settings,
};
use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use std::{env, str::FromStr, time::Duration};

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub s3: S3Settings,
    pub bucket: String,
    pub url_expiry: Duration,
    pub url_policy: UrlPolicy,
    pub reject_referenced_deletes: bool,
    pub max_upload_bytes: usize,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum UrlPolicyKind {
    /// Sign a new URL on every read
    AlwaysResign,
    /// Persist signed URLs and reuse them until close to expiry
    Reuse,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Animal records with images in an S3-compatible store")]
pub struct Args {
    /// Host to bind to (overrides ANIMAL_IMAGES_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides ANIMAL_IMAGES_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Database URL (overrides ANIMAL_IMAGES_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// S3 endpoint (overrides ANIMAL_IMAGES_S3_ENDPOINT)
    #[arg(long)]
    pub s3_endpoint: Option<String>,

    /// S3 access key (overrides ANIMAL_IMAGES_S3_ACCESS_KEY)
    #[arg(long)]
    pub s3_access_key: Option<String>,

    /// S3 secret key (overrides ANIMAL_IMAGES_S3_SECRET_KEY)
    #[arg(long)]
    pub s3_secret_key: Option<String>,

    /// Bucket holding the images (overrides ANIMAL_IMAGES_S3_BUCKET)
    #[arg(long)]
    pub s3_bucket: Option<String>,

    /// S3 region (overrides ANIMAL_IMAGES_S3_REGION)
    #[arg(long)]
    pub s3_region: Option<String>,

    /// Presigned URL lifetime in seconds, at most 7 days (overrides ANIMAL_IMAGES_URL_EXPIRY_SECS)
    #[arg(long)]
    pub url_expiry_secs: Option<u64>,

    /// Read-time URL policy (overrides ANIMAL_IMAGES_URL_POLICY)
    #[arg(long, value_enum)]
    pub url_policy: Option<UrlPolicyKind>,

    /// With `reuse`, re-sign once a stored URL is this close to expiry
    /// (overrides ANIMAL_IMAGES_URL_REFRESH_MARGIN_SECS)
    #[arg(long)]
    pub url_refresh_margin_secs: Option<u64>,

    /// Refuse to delete objects still referenced by an animal
    /// (overrides ANIMAL_IMAGES_REJECT_REFERENCED_DELETES)
    #[arg(long)]
    pub reject_referenced_deletes: Option<bool>,

    /// Maximum accepted upload body in bytes (overrides ANIMAL_IMAGES_MAX_UPLOAD_BYTES)
    #[arg(long)]
    pub max_upload_bytes: Option<usize>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        let args = Args::parse();
        let migrate = args.migrate;
        let cfg = Self::resolve(args, |name| env::var(name).ok())?;
        Ok((cfg, migrate))
    }

    /// Merge CLI args over values found through `lookup`, then defaults.
    pub fn resolve(args: Args, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let env_or = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.into());

        let url_expiry_secs = match args.url_expiry_secs {
            Some(secs) => secs,
            None => parse_env(&lookup, "ANIMAL_IMAGES_URL_EXPIRY_SECS")?
                .unwrap_or(DEFAULT_URL_EXPIRY.as_secs()),
        };
        if url_expiry_secs == 0 || url_expiry_secs > DEFAULT_URL_EXPIRY.as_secs() {
            bail!(
                "URL expiry must be between 1 and {} seconds, got {}",
                DEFAULT_URL_EXPIRY.as_secs(),
                url_expiry_secs
            );
        }

        let policy_kind = match args.url_policy {
            Some(kind) => kind,
            None => match lookup("ANIMAL_IMAGES_URL_POLICY") {
                Some(value) => <UrlPolicyKind as ValueEnum>::from_str(&value, true)
                    .map_err(|e| anyhow::anyhow!(e))
                    .with_context(|| {
                        format!("parsing ANIMAL_IMAGES_URL_POLICY value `{}`", value)
                    })?,
                None => UrlPolicyKind::AlwaysResign,
            },
        };
        let refresh_margin_secs = match args.url_refresh_margin_secs {
            Some(secs) => secs,
            None => parse_env(&lookup, "ANIMAL_IMAGES_URL_REFRESH_MARGIN_SECS")?.unwrap_or(3600),
        };
        let url_policy = match policy_kind {
            UrlPolicyKind::AlwaysResign => UrlPolicy::AlwaysResign,
            UrlPolicyKind::Reuse => {
                if refresh_margin_secs >= url_expiry_secs {
                    bail!(
                        "URL refresh margin must be below the URL expiry of {} seconds, got {}",
                        url_expiry_secs,
                        refresh_margin_secs
                    );
                }
                UrlPolicy::ReuseUntilExpiry {
                    refresh_margin: Duration::from_secs(refresh_margin_secs),
                }
            }
        };

        let port = match args.port {
            Some(port) => port,
            None => parse_env(&lookup, "ANIMAL_IMAGES_PORT")?.unwrap_or(8080),
        };
        let reject_referenced_deletes = match args.reject_referenced_deletes {
            Some(flag) => flag,
            None => parse_env(&lookup, "ANIMAL_IMAGES_REJECT_REFERENCED_DELETES")?.unwrap_or(false),
        };
        let max_upload_bytes = match args.max_upload_bytes {
            Some(bytes) => bytes,
            None => {
                parse_env(&lookup, "ANIMAL_IMAGES_MAX_UPLOAD_BYTES")?.unwrap_or(10 * 1024 * 1024)
            }
        };

        Ok(Self {
            host: args
                .host
                .unwrap_or_else(|| env_or("ANIMAL_IMAGES_HOST", "0.0.0.0")),
            port,
            database_url: args.database_url.unwrap_or_else(|| {
                env_or("ANIMAL_IMAGES_DATABASE_URL", "sqlite://./data/animals.db")
            }),
            s3: S3Settings {
                endpoint: args
                    .s3_endpoint
                    .unwrap_or_else(|| env_or("ANIMAL_IMAGES_S3_ENDPOINT", "http://minio:9000")),
                region: args
                    .s3_region
                    .unwrap_or_else(|| env_or("ANIMAL_IMAGES_S3_REGION", "us-east-1")),
                access_key: args
                    .s3_access_key
                    .unwrap_or_else(|| env_or("ANIMAL_IMAGES_S3_ACCESS_KEY", "minioadmin")),
                secret_key: args
                    .s3_secret_key
                    .unwrap_or_else(|| env_or("ANIMAL_IMAGES_S3_SECRET_KEY", "minioadmin123")),
            },
            bucket: args
                .s3_bucket
                .unwrap_or_else(|| env_or("ANIMAL_IMAGES_S3_BUCKET", "pets-images")),
            url_expiry: Duration::from_secs(url_expiry_secs),
            url_policy,
            reject_referenced_deletes,
            max_upload_bytes,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_env<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(name) {
        Some(value) => value
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("parsing {} value `{}`", name, value)),
        None => Ok(None),
    }
}
