use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::db::config::DbConfig;
use crate::engine::MeaningStrategyKind;

const DEFAULT_JUDGE_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub db: DbConfig,
    pub meaning_strategy: MeaningStrategyKind,
    pub judge_timeout: Duration,
    pub jwt_secret: Option<String>,
    pub seed_catalog: bool,
}

impl Config {
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(3000);

        let host = std::env::var("HOST")
            .ok()
            .and_then(|value| value.parse::<IpAddr>().ok())
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));

        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let meaning_strategy = match std::env::var("MEANING_STRATEGY") {
            Ok(raw) => MeaningStrategyKind::parse(&raw).unwrap_or_else(|| {
                eprintln!("unknown MEANING_STRATEGY {raw:?}, using assisted");
                MeaningStrategyKind::Assisted
            }),
            Err(_) => MeaningStrategyKind::default(),
        };

        let judge_timeout = Duration::from_millis(
            std::env::var("JUDGE_TIMEOUT_MS")
                .ok()
                .and_then(|value| value.parse::<u64>().ok())
                .unwrap_or(DEFAULT_JUDGE_TIMEOUT_MS),
        );

        let jwt_secret = std::env::var("JWT_SECRET")
            .ok()
            .filter(|value| !value.trim().is_empty());

        let seed_catalog = std::env::var("SEED_CATALOG")
            .map(|v| {
                !matches!(
                    v.trim().to_ascii_lowercase().as_str(),
                    "0" | "false" | "no" | "off"
                )
            })
            .unwrap_or(true);

        Self {
            host,
            port,
            log_level,
            db: DbConfig::from_env(),
            meaning_strategy,
            judge_timeout,
            jwt_secret,
            seed_catalog,
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
