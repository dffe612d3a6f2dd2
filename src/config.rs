use crate::error::ConfigError;
use crate::models::MicroAlgos;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub app_id: u64,
    pub asset_id: u64,
    pub genesis_id: String,
    pub storage_prefix: String,
    pub vote_delay: Duration,
    pub feedback_ttl: Duration,
    pub confirm_rounds: u64,
    pub dev_funding: MicroAlgos,
    pub dev_accounts: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_id: 745892582,
            asset_id: 745892583,
            genesis_id: "testnet-v1.0".to_string(),
            storage_prefix: "anjali-dao-donation-".to_string(),
            vote_delay: Duration::from_millis(1500),
            feedback_ttl: Duration::from_millis(4000),
            confirm_rounds: 4,
            dev_funding: MicroAlgos::from_algos(10),
            dev_accounts: 3,
        }
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    expected: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            key,
            expected,
            value,
        }),
        None => Ok(default),
    }
}

impl Config {
    /// Reads `ANJOLI_*` variables from the process environment (after `.env`).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Config::default();

        let vote_delay_ms = parse_or(
            &lookup,
            "ANJOLI_VOTE_DELAY_MS",
            "millisecond count",
            defaults.vote_delay.as_millis() as u64,
        )?;
        let feedback_ttl_ms = parse_or(
            &lookup,
            "ANJOLI_FEEDBACK_TTL_MS",
            "millisecond count",
            defaults.feedback_ttl.as_millis() as u64,
        )?;
        let dev_funding: MicroAlgos = parse_or(
            &lookup,
            "ANJOLI_DEV_FUNDING",
            "ALGO amount",
            defaults.dev_funding,
        )?;

        Ok(Self {
            app_id: parse_or(&lookup, "ANJOLI_APP_ID", "application id", defaults.app_id)?,
            asset_id: parse_or(&lookup, "ANJOLI_ASSET_ID", "asset id", defaults.asset_id)?,
            genesis_id: lookup("ANJOLI_GENESIS_ID").unwrap_or(defaults.genesis_id),
            storage_prefix: lookup("ANJOLI_STORAGE_PREFIX").unwrap_or(defaults.storage_prefix),
            vote_delay: Duration::from_millis(vote_delay_ms),
            feedback_ttl: Duration::from_millis(feedback_ttl_ms),
            confirm_rounds: parse_or(
                &lookup,
                "ANJOLI_CONFIRM_ROUNDS",
                "round count",
                defaults.confirm_rounds,
            )?,
            dev_funding,
            dev_accounts: parse_or(
                &lookup,
                "ANJOLI_DEV_ACCOUNTS",
                "account count",
                defaults.dev_accounts,
            )?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config.app_id, 745892582);
        assert_eq!(config.storage_prefix, "anjali-dao-donation-");
        assert_eq!(config.vote_delay, Duration::from_millis(1500));
        assert_eq!(config.dev_funding, MicroAlgos(10_000_000));
    }

    #[test]
    fn overrides_are_parsed() {
        let config = Config::from_lookup(lookup_from(&[
            ("ANJOLI_APP_ID", "42"),
            ("ANJOLI_DEV_FUNDING", "2.5"),
            ("ANJOLI_VOTE_DELAY_MS", " 10 "),
        ]))
        .unwrap();
        assert_eq!(config.app_id, 42);
        assert_eq!(config.dev_funding, MicroAlgos(2_500_000));
        assert_eq!(config.vote_delay, Duration::from_millis(10));
    }

    #[test]
    fn malformed_values_name_the_key() {
        let err = Config::from_lookup(lookup_from(&[("ANJOLI_CONFIRM_ROUNDS", "four")]))
            .unwrap_err();
        assert!(err.to_string().contains("ANJOLI_CONFIRM_ROUNDS"));
    }
}
