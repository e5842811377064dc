use std::{sync::Arc, time::Duration};

use anyhow::{anyhow, bail, Result};
use ethers::{
    providers::Middleware,
    types::{Bytes, H160, H256},
};
use sha2::{Digest, Sha256};

use crate::{
    contracts::ProjectRegistry,
    utils::{decode_bytes32, with_timeout},
};

pub const DEFAULT_GET_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_SET_TIMEOUT: Duration = Duration::from_secs(5 * 60);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timeouts {
    pub get: Duration,
    pub set: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            get: DEFAULT_GET_TIMEOUT,
            set: DEFAULT_SET_TIMEOUT,
        }
    }
}

/// Key of a repository in the registry: a raw `0x` bytes32 value, or the SHA-256 of its name.
pub fn repository_identifier(repository: &str) -> [u8; 32] {
    let repository = repository.trim();
    if repository.len() == 66 && repository.starts_with("0x") {
        if let Ok(id) = decode_bytes32(repository) {
            return id;
        }
    }
    Sha256::digest(repository.as_bytes()).into()
}

/// Reads and writes repository CIDs on a deployed project registry.
pub struct ProjectActions<M> {
    contract: ProjectRegistry<M>,
    timeouts: Timeouts,
}

impl<M> ProjectActions<M>
where
    M: Middleware + 'static,
{
    pub fn new(address: H160, client: Arc<M>, timeouts: Timeouts) -> Self {
        Self {
            contract: ProjectRegistry::new(address, client),
            timeouts,
        }
    }

    async fn project(&self, id: [u8; 32]) -> Result<(Bytes, bool)> {
        with_timeout(self.timeouts.get, "get project", async {
            Ok(self.contract.get_project(id).call().await?)
        })
        .await
    }

    pub async fn exists(&self, id: [u8; 32]) -> Result<bool> {
        let (_, exists) = self.project(id).await?;
        Ok(exists)
    }

    pub async fn get_cid(&self, id: [u8; 32]) -> Result<String> {
        let (cid, exists) = self.project(id).await?;
        if !exists {
            bail!("project not found");
        }
        String::from_utf8(cid.to_vec()).map_err(|_| anyhow!("stored cid is not valid utf-8"))
    }

    /// Sends `setProject` and waits for inclusion, returning the transaction hash.
    pub async fn set_cid(&self, id: [u8; 32], cid: &str) -> Result<H256> {
        if cid.trim().is_empty() {
            bail!("cid must not be empty");
        }

        with_timeout(self.timeouts.set, "set project", async {
            let call = self
                .contract
                .set_project(id, Bytes::from(cid.as_bytes().to_vec()));
            let pending = call.send().await?;
            let tx_hash = pending.tx_hash();
            log::info!("pending set project transaction {:?}", tx_hash);

            let receipt = pending
                .await?
                .ok_or_else(|| anyhow!("transaction {tx_hash:?} was dropped"))?;
            log::info!(
                "set project transaction included in block {:?}",
                receipt.block_number
            );
            Ok(receipt.transaction_hash)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use ethers::{
        abi::{encode, Token},
        providers::{MockProvider, Provider},
        utils::hex,
    };

    use super::*;

    const CID: &str = "bafkreihdwdcefgh4dqkjv67uzcmw7ojee6xedzdetojuzjevtenxquvyku";

    fn mocked(cid: &str, exists: bool) -> ProjectActions<Provider<MockProvider>> {
        let (provider, mock) = Provider::<MockProvider>::mocked();
        let output = encode(&[
            Token::Bytes(cid.as_bytes().to_vec()),
            Token::Bool(exists),
        ]);
        mock.push::<Bytes, _>(Bytes::from(output)).unwrap();
        ProjectActions::new(H160::repeat_byte(0x42), Arc::new(provider), Timeouts::default())
    }

    #[test]
    fn identifier_hashes_names() {
        let id = repository_identifier("alice/project");
        assert_eq!(
            hex::encode(id),
            "0052b6b9b812da3d3f3dfaa2c85a98daea47e140733e59f0eba4700d47af196b"
        );
        assert_eq!(id, repository_identifier(" alice/project "));
        assert_ne!(id, repository_identifier("alice/other"));
    }

    #[test]
    fn identifier_accepts_raw_bytes32() {
        let raw = format!("0x{}", "ab".repeat(32));
        assert_eq!(repository_identifier(&raw), [0xab; 32]);
    }

    #[tokio::test]
    async fn reads_existing_project() {
        let actions = mocked(CID, true);
        let id = repository_identifier("alice/project");
        assert_eq!(actions.get_cid(id).await.unwrap(), CID);

        let actions = mocked(CID, true);
        assert!(actions.exists(id).await.unwrap());
    }

    #[tokio::test]
    async fn missing_project_is_not_found() {
        let id = repository_identifier("alice/missing");

        let actions = mocked("", false);
        assert!(!actions.exists(id).await.unwrap());

        let actions = mocked("", false);
        let err = actions.get_cid(id).await.unwrap_err();
        assert_eq!(err.to_string(), "project not found");
    }

    #[tokio::test]
    async fn empty_cid_is_rejected_before_sending() {
        let (provider, _mock) = Provider::<MockProvider>::mocked();
        let actions =
            ProjectActions::new(H160::zero(), Arc::new(provider), Timeouts::default());

        let err = actions.set_cid([0; 32], " ").await.unwrap_err();
        assert!(err.to_string().contains("cid must not be empty"));
    }
}
