use crate::cache::BlockCacheConfig;
use crate::logger::LogFormat;
use crate::service::DEFAULT_RECENT_BLOCKS;
use aws_config::BehaviorVersion;
use aws_credential_types::{Credentials, provider::SharedCredentialsProvider};
use aws_sdk_s3::Client as S3Client;
use aws_sdk_s3::config::{Builder as S3ConfigBuilder, Region};
use clap::{Args, ValueEnum};
use std::net::SocketAddr;
use std::time::Duration;
use tracing::info;
use url::Url;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum S3ConfigType {
    /// Region and credentials from the default AWS provider chain.
    #[default]
    Aws,
    /// Path-style addressing against an explicit endpoint, e.g. MinIO.
    Manual,
}

#[derive(Args, Debug, Clone)]
pub struct Config {
    /// Ethereum JSON-RPC endpoint used to fetch blocks
    #[arg(long, env = "TIPS_EXPLORER_RPC_URL", default_value = "http://localhost:8545")]
    pub rpc_url: Url,

    /// Bucket holding bundle histories, the transaction index and cached blocks
    #[arg(long, env = "TIPS_EXPLORER_S3_BUCKET_NAME", default_value = "tips")]
    pub s3_bucket: String,

    #[arg(
        long,
        env = "TIPS_EXPLORER_S3_CONFIG_TYPE",
        value_enum,
        default_value_t = S3ConfigType::Aws
    )]
    pub s3_config_type: S3ConfigType,

    #[arg(long, env = "TIPS_EXPLORER_AWS_REGION", default_value = "us-east-1")]
    pub aws_region: String,

    /// Only used with `--s3-config-type manual`
    #[arg(long, env = "TIPS_EXPLORER_S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,

    #[arg(long, env = "TIPS_EXPLORER_S3_ACCESS_KEY_ID")]
    pub s3_access_key_id: Option<String>,

    #[arg(long, env = "TIPS_EXPLORER_S3_SECRET_ACCESS_KEY", hide_env_values = true)]
    pub s3_secret_access_key: Option<String>,

    #[arg(long, env = "TIPS_EXPLORER_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[arg(long, env = "TIPS_EXPLORER_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Serve Prometheus metrics on this address
    #[arg(long, env = "TIPS_EXPLORER_METRICS_ADDR")]
    pub metrics_addr: Option<SocketAddr>,

    /// Refetch cached blocks older than this many seconds
    #[arg(long, env = "TIPS_EXPLORER_BLOCK_CACHE_MAX_AGE_SECS")]
    pub block_cache_max_age_secs: Option<u64>,

    #[arg(long, env = "TIPS_EXPLORER_RECENT_BLOCKS", default_value_t = DEFAULT_RECENT_BLOCKS)]
    pub recent_blocks: u64,
}

impl Config {
    pub fn block_cache_config(&self) -> BlockCacheConfig {
        BlockCacheConfig {
            max_age: self.block_cache_max_age_secs.map(Duration::from_secs),
        }
    }

    pub async fn s3_client(&self) -> S3Client {
        let region = Region::new(self.aws_region.clone());

        match self.s3_config_type {
            S3ConfigType::Aws => {
                info!(region = %self.aws_region, "Using AWS S3 configuration");
                let config = aws_config::defaults(BehaviorVersion::latest())
                    .region(region)
                    .load()
                    .await;
                S3Client::new(&config)
            }
            S3ConfigType::Manual => {
                info!(
                    region = %self.aws_region,
                    endpoint = ?self.s3_endpoint,
                    "Using manual S3 configuration"
                );
                let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(region);
                if let Some(endpoint) = &self.s3_endpoint {
                    loader = loader.endpoint_url(endpoint);
                }
                if let (Some(access_key), Some(secret_key)) =
                    (&self.s3_access_key_id, &self.s3_secret_access_key)
                {
                    let creds = Credentials::new(
                        access_key,
                        secret_key,
                        None,
                        None,
                        "tips-explorer",
                    );
                    loader = loader.credentials_provider(SharedCredentialsProvider::new(creds));
                }
                let base_config = loader.load().await;

                let s3_config = S3ConfigBuilder::from(&base_config)
                    .force_path_style(true)
                    .build();
                S3Client::from_conf(s3_config)
            }
        }
    }
}
