use std::{future::Future, sync::Arc, time::Duration};

use anyhow::{anyhow, bail, Context, Result};
use ethers::{
    middleware::SignerMiddleware,
    providers::{Http, Middleware, Provider},
    signers::{LocalWallet, Signer},
    utils::hex,
};

use crate::config::NetworkConfig;

/// Provider bound to a local signing key, used for every transaction we send.
pub type SignerClient = SignerMiddleware<Provider<Http>, LocalWallet>;

pub fn strip_hex_prefix(value: &str) -> &str {
    let value = value.trim();
    value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value)
}

pub fn decode_hex(value: &str) -> Result<Vec<u8>> {
    Ok(hex::decode(strip_hex_prefix(value))?)
}

pub fn decode_bytes32(value: &str) -> Result<[u8; 32]> {
    decode_hex(value)?
        .try_into()
        .map_err(|bytes: Vec<u8>| anyhow!("expected 32 bytes, got {}", bytes.len()))
}

pub fn provider(network: &NetworkConfig) -> Result<Provider<Http>> {
    Provider::<Http>::try_from(network.url.as_str())
        .with_context(|| format!("invalid rpc url {}", network.url))
}

/// Fails when the node behind the rpc url serves another chain than the configured one.
pub async fn check_chain_id<M: Middleware>(provider: &M, network: &NetworkConfig) -> Result<()>
where
    M::Error: 'static,
{
    let chain_id = provider
        .get_chainid()
        .await
        .with_context(|| format!("failed to fetch chain id from {}", network.url))?
        .as_u64();
    log::debug!("connected to {} on chain id {}", network.url, chain_id);
    if chain_id != network.chain_id {
        bail!(
            "configured chain id {} does not match chain id {} reported by {}",
            network.chain_id,
            chain_id,
            network.url
        );
    }
    Ok(())
}

pub async fn connect(network: &NetworkConfig, wallet: LocalWallet) -> Result<Arc<SignerClient>> {
    let provider = provider(network)?;
    check_chain_id(&provider, network).await?;

    let client = Arc::new(SignerMiddleware::new(
        provider,
        wallet.with_chain_id(network.chain_id),
    ));
    log::info!("signing as {:?}", client.address());
    Ok(client)
}

pub async fn with_timeout<F, T>(limit: Duration, what: &str, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(limit, future)
        .await
        .map_err(|_| anyhow!("{what} timed out after {limit:?}"))?
}

#[cfg(test)]
mod tests {
    use ethers::{providers::MockProvider, types::U256};

    use super::*;

    fn calibration() -> NetworkConfig {
        NetworkConfig {
            chain_id: 314159,
            url: "http://localhost:1234/rpc/v1".to_string(),
            accounts: Vec::new(),
        }
    }

    #[test]
    fn strips_prefix() {
        assert_eq!(strip_hex_prefix("0xabcd"), "abcd");
        assert_eq!(strip_hex_prefix("0XABCD"), "ABCD");
        assert_eq!(strip_hex_prefix(" abcd\n"), "abcd");
    }

    #[test]
    fn decodes_bytes32() {
        let id = decode_bytes32(&format!("0x{}", "11".repeat(32))).unwrap();
        assert_eq!(id, [0x11; 32]);

        let err = decode_bytes32("0x1122").unwrap_err();
        assert!(err.to_string().contains("got 2"));
        assert!(decode_bytes32("0xzz").is_err());
    }

    #[tokio::test]
    async fn timeout_is_an_error() {
        let err = with_timeout(Duration::from_millis(10), "get project", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await
        .unwrap_err();
        assert!(err.to_string().contains("get project timed out"));

        let value = with_timeout(Duration::from_secs(1), "get project", async { Ok(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn accepts_matching_chain_id() {
        let (provider, mock) = Provider::<MockProvider>::mocked();
        mock.push::<U256, _>(U256::from(314159)).unwrap();

        check_chain_id(&provider, &calibration()).await.unwrap();
    }

    #[tokio::test]
    async fn rejects_other_chain_id() {
        let (provider, mock) = Provider::<MockProvider>::mocked();
        mock.push::<U256, _>(U256::from(1)).unwrap();

        let err = check_chain_id(&provider, &calibration()).await.unwrap_err();
        let err = err.to_string();
        assert!(err.contains("configured chain id 314159 does not match chain id 1"));
    }
}
