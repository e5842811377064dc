use std::{collections::BTreeMap, env};

use anyhow::{anyhow, Context, Result};
use serde::{Serialize, Serializer};

pub const SOLIDITY_VERSION: &str = "0.8.17";
pub const DEFAULT_NETWORK: &str = "calibration";

pub const CALIBRATION_CHAIN_ID: u64 = 314159;
pub const CALIBRATION_URL: &str = "https://api.calibration.node.glif.io/rpc/v1";

const PRIVATE_KEY_ENV_VAR: &str = "PRIVATE_KEY";
const CALIBRATION_URL_ENV_VAR: &str = "CALIBRATION_URL";
const CHAIN_ID_ENV_VAR: &str = "CHAIN_ID";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub solidity: String,
    pub default_network: String,
    pub networks: BTreeMap<String, NetworkConfig>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    pub chain_id: u64,
    pub url: String,
    #[serde(serialize_with = "redact_accounts")]
    pub accounts: Vec<String>,
}

impl Config {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any variable lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let chain_id = match var(CHAIN_ID_ENV_VAR) {
            Some(value) => value
                .trim()
                .parse()
                .with_context(|| format!("{CHAIN_ID_ENV_VAR} is not a valid chain id: {value}"))?,
            None => CALIBRATION_CHAIN_ID,
        };
        let url = var(CALIBRATION_URL_ENV_VAR).unwrap_or_else(|| CALIBRATION_URL.to_string());
        let accounts = var(PRIVATE_KEY_ENV_VAR).into_iter().collect();

        let mut networks = BTreeMap::new();
        networks.insert(
            DEFAULT_NETWORK.to_string(),
            NetworkConfig {
                chain_id,
                url,
                accounts,
            },
        );

        Ok(Self {
            solidity: SOLIDITY_VERSION.to_string(),
            default_network: DEFAULT_NETWORK.to_string(),
            networks,
        })
    }

    /// Resolves a network by name, falling back to the default network.
    pub fn network(&self, name: Option<&str>) -> Result<(&str, &NetworkConfig)> {
        let name = name.unwrap_or(&self.default_network);
        self.networks
            .get_key_value(name)
            .map(|(name, network)| (name.as_str(), network))
            .ok_or_else(|| {
                anyhow!(
                    "network `{}` is not configured, available networks: {}",
                    name,
                    self.networks.keys().cloned().collect::<Vec<_>>().join(", ")
                )
            })
    }
}

impl NetworkConfig {
    pub fn signer_key(&self) -> Result<&str> {
        self.accounts
            .first()
            .map(String::as_str)
            .ok_or_else(|| anyhow!("no account configured, set {PRIVATE_KEY_ENV_VAR}"))
    }
}

fn redact_accounts<S: Serializer>(accounts: &[String], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(accounts.iter().map(|_| "<redacted>"))
}
