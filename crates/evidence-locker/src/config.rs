//! Configuration loading and validation
//!
//! All settings arrive through the environment (or matching CLI flags).
//! The raw arguments are validated in one pass into a frozen [`Config`];
//! every failing field is reported together.

use clap::Parser;
use std::collections::HashMap;
use thiserror::Error;

use locker_ipfs::{KuboConfig, PinningServiceConfig};
use locker_storage::S3Config;

/// Evidence Locker - content-addressed evidence storage service
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Listen port
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// SQLite catalog URL
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite:evidence-locker.db?mode=rwc")]
    pub database_url: String,

    /// Object store backend: "s3" or "local"
    #[arg(long, env = "STORAGE_BACKEND", default_value = "local")]
    pub storage_backend: String,

    /// Base directory for the local storage backend
    #[arg(long, env = "LOCAL_STORAGE_PATH", default_value = "./data/objects")]
    pub local_storage_path: String,

    #[arg(long, env = "S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,

    #[arg(long, env = "S3_REGION", default_value = "us-east-1")]
    pub s3_region: String,

    #[arg(long, env = "S3_BUCKET")]
    pub s3_bucket: Option<String>,

    #[arg(long, env = "S3_ACCESS_KEY")]
    pub s3_access_key: Option<String>,

    #[arg(long, env = "S3_SECRET_KEY")]
    pub s3_secret_key: Option<String>,

    #[arg(long, env = "S3_FORCE_PATH_STYLE", default_value_t = true, action = clap::ArgAction::Set)]
    pub s3_force_path_style: bool,

    /// Serve artifact downloads without authentication
    #[arg(long, env = "PUBLIC_READ", default_value_t = false, action = clap::ArgAction::Set)]
    pub public_read: bool,

    #[arg(long, env = "MAX_UPLOAD_BYTES", default_value_t = 52_428_800)]
    pub max_upload_bytes: u64,

    /// Comma-separated `app:secret` pairs for HMAC callers
    #[arg(long, env = "HMAC_APP_KEYS", default_value = "")]
    pub hmac_app_keys: String,

    /// Comma-separated CORS origins; empty disables CORS
    #[arg(long, env = "CORS_ALLOWLIST", default_value = "")]
    pub cors_allowlist: String,

    /// Shared secret for bearer and upload tokens
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    #[arg(long, env = "JWT_AUDIENCE", default_value = "evidence-locker")]
    pub jwt_audience: String,

    #[arg(long, env = "IPFS_ENABLED", default_value_t = false, action = clap::ArgAction::Set)]
    pub ipfs_enabled: bool,

    /// Replica flavor when enabled: "self-hosted" or "pinning-service"
    #[arg(long, env = "IPFS_MODE", default_value = "self-hosted")]
    pub ipfs_mode: String,

    #[arg(long, env = "IPFS_API_URL")]
    pub ipfs_api_url: Option<String>,

    #[arg(long, env = "IPFS_API_KEY")]
    pub ipfs_api_key: Option<String>,

    #[arg(long, env = "IPFS_GATEWAY_URL", default_value = "https://ipfs.io")]
    pub ipfs_gateway_url: String,

    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

/// Object store driver selected at startup
#[derive(Debug, Clone)]
pub enum StorageDriver {
    S3(S3Config),
    Local { path: String },
}

/// Secondary replica driver selected at startup
#[derive(Debug, Clone)]
pub enum ReplicaDriver {
    SelfHosted(KuboConfig),
    ThirdParty(PinningServiceConfig),
    None,
}

/// Frozen, validated configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub storage: StorageDriver,
    pub replica: ReplicaDriver,
    pub public_read: bool,
    pub max_upload_bytes: u64,
    pub hmac_app_keys: HashMap<String, String>,
    pub cors_allowlist: Vec<String>,
    pub jwt_secret: Option<String>,
    pub jwt_audience: String,
    pub log_level: String,
}

#[derive(Debug, Error)]
#[error("invalid configuration: {}", .problems.join("; "))]
pub struct ConfigError {
    pub problems: Vec<String>,
}

impl Config {
    /// Validate raw arguments into a frozen configuration, reporting
    /// every failing field at once.
    pub fn from_args(args: Args) -> Result<Self, ConfigError> {
        let mut problems = Vec::new();

        let hmac_app_keys = parse_app_keys(&args.hmac_app_keys, &mut problems);
        if hmac_app_keys.is_empty() && problems.is_empty() {
            problems.push("HMAC_APP_KEYS must contain at least one app:secret pair".to_string());
        }

        let storage = match args.storage_backend.as_str() {
            "s3" => {
                let bucket = match &args.s3_bucket {
                    Some(bucket) if !bucket.is_empty() => bucket.clone(),
                    _ => {
                        problems.push("S3_BUCKET is required when STORAGE_BACKEND=s3".to_string());
                        String::new()
                    }
                };
                let allow_http = args
                    .s3_endpoint
                    .as_deref()
                    .is_some_and(|e| e.starts_with("http://"));
                StorageDriver::S3(S3Config {
                    bucket,
                    region: args.s3_region.clone(),
                    endpoint: args.s3_endpoint.clone(),
                    access_key_id: args.s3_access_key.clone(),
                    secret_access_key: args.s3_secret_key.clone(),
                    force_path_style: args.s3_force_path_style,
                    allow_http,
                })
            }
            "local" => StorageDriver::Local {
                path: args.local_storage_path.clone(),
            },
            other => {
                problems.push(format!(
                    "STORAGE_BACKEND must be 's3' or 'local', got '{}'",
                    other
                ));
                StorageDriver::Local {
                    path: args.local_storage_path.clone(),
                }
            }
        };

        let replica = if !args.ipfs_enabled {
            ReplicaDriver::None
        } else {
            match args.ipfs_mode.as_str() {
                "self-hosted" => ReplicaDriver::SelfHosted(KuboConfig {
                    api_url: args
                        .ipfs_api_url
                        .clone()
                        .unwrap_or_else(|| "http://127.0.0.1:5001".to_string()),
                    gateway_url: args.ipfs_gateway_url.clone(),
                }),
                "pinning-service" => {
                    let api_key = match &args.ipfs_api_key {
                        Some(key) if !key.is_empty() => key.clone(),
                        _ => {
                            problems.push(
                                "IPFS_API_KEY is required when IPFS_MODE=pinning-service"
                                    .to_string(),
                            );
                            String::new()
                        }
                    };
                    ReplicaDriver::ThirdParty(PinningServiceConfig {
                        api_url: args
                            .ipfs_api_url
                            .clone()
                            .unwrap_or_else(|| "https://api.pinata.cloud".to_string()),
                        api_key,
                        gateway_url: args.ipfs_gateway_url.clone(),
                    })
                }
                other => {
                    problems.push(format!(
                        "IPFS_MODE must be 'self-hosted' or 'pinning-service', got '{}'",
                        other
                    ));
                    ReplicaDriver::None
                }
            }
        };

        if args.max_upload_bytes == 0 {
            problems.push("MAX_UPLOAD_BYTES must be positive".to_string());
        }

        let cors_allowlist: Vec<String> = args
            .cors_allowlist
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        if !problems.is_empty() {
            return Err(ConfigError { problems });
        }

        Ok(Config {
            port: args.port,
            database_url: args.database_url,
            storage,
            replica,
            public_read: args.public_read,
            max_upload_bytes: args.max_upload_bytes,
            hmac_app_keys,
            cors_allowlist,
            jwt_secret: args.jwt_secret,
            jwt_audience: args.jwt_audience,
            log_level: args.log_level,
        })
    }
}

fn parse_app_keys(raw: &str, problems: &mut Vec<String>) -> HashMap<String, String> {
    let mut keys = HashMap::new();
    for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match pair.split_once(':') {
            Some((app, secret)) if !app.is_empty() && !secret.is_empty() => {
                keys.insert(app.to_string(), secret.to_string());
            }
            _ => problems.push(format!(
                "HMAC_APP_KEYS entry '{}' is not of the form app:secret",
                pair
            )),
        }
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Args {
        Args {
            port: 8080,
            database_url: "sqlite::memory:".to_string(),
            storage_backend: "local".to_string(),
            local_storage_path: "./data/objects".to_string(),
            s3_endpoint: None,
            s3_region: "us-east-1".to_string(),
            s3_bucket: None,
            s3_access_key: None,
            s3_secret_key: None,
            s3_force_path_style: true,
            public_read: false,
            max_upload_bytes: 52_428_800,
            hmac_app_keys: "registry:secret,portal:other".to_string(),
            cors_allowlist: String::new(),
            jwt_secret: None,
            jwt_audience: "evidence-locker".to_string(),
            ipfs_enabled: false,
            ipfs_mode: "self-hosted".to_string(),
            ipfs_api_url: None,
            ipfs_api_key: None,
            ipfs_gateway_url: "https://ipfs.io".to_string(),
            log_level: "info".to_string(),
        }
    }

    #[test]
    fn test_valid_local_config() {
        let config = Config::from_args(base_args()).unwrap();
        assert_eq!(config.hmac_app_keys.len(), 2);
        assert!(matches!(config.storage, StorageDriver::Local { .. }));
        assert!(matches!(config.replica, ReplicaDriver::None));
    }

    #[test]
    fn test_s3_requires_bucket() {
        let mut args = base_args();
        args.storage_backend = "s3".to_string();
        let err = Config::from_args(args).unwrap_err();
        assert!(err.problems.iter().any(|p| p.contains("S3_BUCKET")));
    }

    #[test]
    fn test_http_endpoint_enables_allow_http() {
        let mut args = base_args();
        args.storage_backend = "s3".to_string();
        args.s3_bucket = Some("evidence".to_string());
        args.s3_endpoint = Some("http://127.0.0.1:9000".to_string());
        let config = Config::from_args(args).unwrap();
        match config.storage {
            StorageDriver::S3(s3) => assert!(s3.allow_http),
            other => panic!("expected S3 driver, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_app_keys_reported() {
        let mut args = base_args();
        args.hmac_app_keys = "registry:secret,broken".to_string();
        let err = Config::from_args(args).unwrap_err();
        assert!(err.problems.iter().any(|p| p.contains("broken")));
    }

    #[test]
    fn test_all_problems_reported_together() {
        let mut args = base_args();
        args.storage_backend = "s3".to_string();
        args.hmac_app_keys = String::new();
        args.max_upload_bytes = 0;
        let err = Config::from_args(args).unwrap_err();
        assert!(err.problems.len() >= 3);
    }

    #[test]
    fn test_pinning_service_requires_api_key() {
        let mut args = base_args();
        args.ipfs_enabled = true;
        args.ipfs_mode = "pinning-service".to_string();
        let err = Config::from_args(args).unwrap_err();
        assert!(err.problems.iter().any(|p| p.contains("IPFS_API_KEY")));
    }

    #[test]
    fn test_self_hosted_replica_defaults() {
        let mut args = base_args();
        args.ipfs_enabled = true;
        let config = Config::from_args(args).unwrap();
        match config.replica {
            ReplicaDriver::SelfHosted(kubo) => {
                assert_eq!(kubo.api_url, "http://127.0.0.1:5001");
            }
            other => panic!("expected self-hosted replica, got {:?}", other),
        }
    }
}
