//! Runtime configuration.
//!
//! | variable | default | meaning |
//! |---|---|---|
//! | `STOCKROOM_BIND_ADDR` | `0.0.0.0:8080` | HTTP listen address |
//! | `STOCKROOM_ORDER_TTL_SECS` | `1800` | reservation window |
//! | `STOCKROOM_REAPER_INTERVAL_SECS` | `60` | sweep cadence |
//! | `STOCKROOM_SEED_DEMO_DATA` | `false` | seed the demo catalog at startup |

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context};

pub const BIND_ADDR_VAR: &str = "STOCKROOM_BIND_ADDR";
pub const ORDER_TTL_VAR: &str = "STOCKROOM_ORDER_TTL_SECS";
pub const REAPER_INTERVAL_VAR: &str = "STOCKROOM_REAPER_INTERVAL_SECS";
pub const SEED_DEMO_DATA_VAR: &str = "STOCKROOM_SEED_DEMO_DATA";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShopConfig {
    pub bind_addr: SocketAddr,
    pub order_ttl: Duration,
    pub reaper_interval: Duration,
    pub seed_demo_data: bool,
}

impl Default for ShopConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            order_ttl: Duration::from_secs(30 * 60),
            reaper_interval: Duration::from_secs(60),
            seed_demo_data: false,
        }
    }
}

impl ShopConfig {
    /// Defaults overridden by whatever is set in the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by `lookup`. Unset keys keep their default; set
    /// but unparsable keys are an error.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut cfg = Self::default();

        if let Some(raw) = lookup(BIND_ADDR_VAR) {
            cfg.bind_addr = parse(BIND_ADDR_VAR, &raw)?;
        }
        if let Some(raw) = lookup(ORDER_TTL_VAR) {
            cfg.order_ttl = Duration::from_secs(positive_secs(ORDER_TTL_VAR, &raw)?);
        }
        if let Some(raw) = lookup(REAPER_INTERVAL_VAR) {
            cfg.reaper_interval = Duration::from_secs(positive_secs(REAPER_INTERVAL_VAR, &raw)?);
        }
        if let Some(raw) = lookup(SEED_DEMO_DATA_VAR) {
            cfg.seed_demo_data = parse_flag(SEED_DEMO_DATA_VAR, &raw)?;
        }

        Ok(cfg)
    }

    pub fn with_order_ttl(mut self, ttl: Duration) -> Self {
        self.order_ttl = ttl;
        self
    }

    pub fn with_reaper_interval(mut self, interval: Duration) -> Self {
        self.reaper_interval = interval;
        self
    }

    pub fn with_seed_demo_data(mut self, seed: bool) -> Self {
        self.seed_demo_data = seed;
        self
    }

    /// Reservation window as a calendar duration for timestamp arithmetic.
    pub fn order_ttl_chrono(&self) -> anyhow::Result<chrono::Duration> {
        chrono::Duration::from_std(self.order_ttl).context("order ttl out of range")
    }
}

fn parse<T>(key: &str, raw: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse()
        .with_context(|| format!("invalid value for {key}: {raw:?}"))
}

fn positive_secs(key: &str, raw: &str) -> anyhow::Result<u64> {
    let secs: u64 = parse(key, raw)?;
    if secs == 0 {
        bail!("{key} must be greater than zero");
    }
    Ok(secs)
}

fn parse_flag(key: &str, raw: &str) -> anyhow::Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => bail!("invalid value for {key}: {other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from(pairs: &[(&str, &str)]) -> anyhow::Result<ShopConfig> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ShopConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let cfg = from(&[]).unwrap();
        assert_eq!(cfg, ShopConfig::default());
        assert_eq!(cfg.order_ttl, Duration::from_secs(1800));
        assert_eq!(cfg.reaper_interval, Duration::from_secs(60));
        assert!(!cfg.seed_demo_data);
    }

    #[test]
    fn overrides_are_applied() {
        let cfg = from(&[
            (BIND_ADDR_VAR, "127.0.0.1:9000"),
            (ORDER_TTL_VAR, "90"),
            (REAPER_INTERVAL_VAR, "5"),
            (SEED_DEMO_DATA_VAR, "TRUE"),
        ])
        .unwrap();
        assert_eq!(cfg.bind_addr, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(cfg.order_ttl, Duration::from_secs(90));
        assert_eq!(cfg.reaper_interval, Duration::from_secs(5));
        assert!(cfg.seed_demo_data);
        assert_eq!(cfg.order_ttl_chrono().unwrap(), chrono::Duration::seconds(90));
    }

    #[test]
    fn bad_values_name_the_variable() {
        let err = from(&[(ORDER_TTL_VAR, "soon")]).unwrap_err();
        assert!(err.to_string().contains(ORDER_TTL_VAR));

        let err = from(&[(REAPER_INTERVAL_VAR, "0")]).unwrap_err();
        assert!(err.to_string().contains(REAPER_INTERVAL_VAR));

        assert!(from(&[(SEED_DEMO_DATA_VAR, "maybe")]).is_err());
        assert!(from(&[(BIND_ADDR_VAR, "not-an-addr")]).is_err());
    }

    #[test]
    fn builders_override_fields() {
        let cfg = ShopConfig::default()
            .with_order_ttl(Duration::from_secs(10))
            .with_reaper_interval(Duration::from_secs(1))
            .with_seed_demo_data(true);
        assert_eq!(cfg.order_ttl, Duration::from_secs(10));
        assert_eq!(cfg.reaper_interval, Duration::from_secs(1));
        assert!(cfg.seed_demo_data);
    }
}
