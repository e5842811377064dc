use std::{io::Write, sync::Arc};

use anyhow::{Context, Result};
use ethers::{signers::LocalWallet, types::H160};

use crate::{
    artifacts::Artifact,
    config::NetworkConfig,
    utils::{connect, SignerClient},
};

#[derive(Clone, Copy, Debug)]
pub struct DeployOptions {
    pub confirmations: usize,
    pub legacy: bool,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self {
            confirmations: 1,
            legacy: false,
        }
    }
}

pub struct Deploy {
    client: Arc<SignerClient>,
    options: DeployOptions,
}

impl Deploy {
    pub async fn new(
        network: &NetworkConfig,
        wallet: LocalWallet,
        options: DeployOptions,
    ) -> Result<Self> {
        let client = connect(network, wallet).await?;
        Ok(Self::with_client(client, options))
    }

    pub fn with_client(client: Arc<SignerClient>, options: DeployOptions) -> Self {
        Self { client, options }
    }

    /// Deploys the artifact without constructor arguments and waits for its receipt.
    pub async fn run(&self, artifact: &Artifact) -> Result<H160> {
        let factory = artifact.factory(self.client.clone())?;

        let mut deployer = factory
            .deploy(())
            .with_context(|| format!("failed to build {} deployment", artifact.contract_name))?
            .confirmations(self.options.confirmations);
        if self.options.legacy {
            deployer = deployer.legacy();
        }

        log::info!("deploying {}", artifact.contract_name);
        let (contract, receipt) = deployer
            .send_with_receipt()
            .await
            .with_context(|| format!("failed to deploy {}", artifact.contract_name))?;
        log::info!(
            "{} deployed in transaction {:?} at block {:?}",
            artifact.contract_name,
            receipt.transaction_hash,
            receipt.block_number
        );

        Ok(contract.address())
    }
}

/// Writes the single result line of a deployment.
pub fn report_address<W: Write>(out: &mut W, address: H160) -> Result<()> {
    writeln!(out, "contract address: {:?}", address)?;
    Ok(())
}
