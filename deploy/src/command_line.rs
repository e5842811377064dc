use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use ethers::{
    signers::{LocalWallet, Signer},
    types::H160,
};

use crate::{
    artifacts::Artifact,
    config::{Config, NetworkConfig},
    deploy::{report_address, Deploy, DeployOptions},
    registry::{repository_identifier, ProjectActions, Timeouts},
    utils::{check_chain_id, connect, provider},
    wallet::{create_wallet, init_keystore_wallet, signer_from_key},
};

#[derive(Debug, Parser)]
#[clap(
    name = "calibration-deploy",
    version,
    about = "Deploy and manage contracts on the calibration network"
)]
pub struct CommandLine {
    /// Network to use, defaults to the configured default network
    #[clap(short, long, global = true)]
    network: Option<String>,

    /// Keystore directory holding the signing account, used instead of PRIVATE_KEY
    #[clap(long, global = true, env = "KEYSTORE_DIR")]
    keystore: Option<PathBuf>,

    #[clap(long, global = true, env = "KEYSTORE_PASSWORD", hide_env_values = true)]
    keystore_password: Option<String>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Deploy a contract and print its address
    Deploy(DeployArgs),
    /// Print the resolved configuration
    Config,
    /// Read or write repository CIDs on a project registry
    Project {
        #[clap(flatten)]
        registry: RegistryArgs,

        #[clap(subcommand)]
        action: ProjectCommand,
    },
    /// Create wallets
    Wallet {
        #[clap(subcommand)]
        action: WalletCommand,
    },
}

#[derive(Debug, Args)]
struct DeployArgs {
    /// Contract name, or fully qualified `contracts/Name.sol:Name`
    #[clap(default_value = "MyContract")]
    contract: String,

    #[clap(long, default_value = "artifacts")]
    artifacts: PathBuf,

    #[clap(long, default_value_t = 1)]
    confirmations: usize,

    /// Send a legacy (pre EIP-1559) transaction
    #[clap(long)]
    legacy: bool,
}

#[derive(Debug, Args)]
struct RegistryArgs {
    #[clap(short, long, env = "REGISTRY_ADDRESS")]
    registry: H160,

    /// Timeout for reads, in seconds
    #[clap(long, default_value_t = 30)]
    get_timeout: u64,

    /// Timeout for writes, in minutes
    #[clap(long, default_value_t = 5)]
    set_timeout: u64,
}

impl RegistryArgs {
    fn timeouts(&self) -> Result<Timeouts> {
        let set = self
            .set_timeout
            .checked_mul(60)
            .ok_or_else(|| {
                anyhow!("--set-timeout of {} minutes is too large", self.set_timeout)
            })?;
        Ok(Timeouts {
            get: Duration::from_secs(self.get_timeout),
            set: Duration::from_secs(set),
        })
    }
}

#[derive(Debug, Subcommand)]
enum ProjectCommand {
    /// Check whether a repository is registered
    Exists { repository: String },
    /// Print the CID stored for a repository
    Get { repository: String },
    /// Store a CID for a repository
    Set { repository: String, cid: String },
}

#[derive(Debug, Subcommand)]
enum WalletCommand {
    /// Generate a new anonymous wallet
    New,
    /// Create or load the single account of the keystore directory
    Keystore,
}

impl CommandLine {
    pub async fn execute(self) -> Result<()> {
        match &self.command {
            Command::Deploy(args) => {
                let config = Config::from_env()?;
                let network = self.network(&config)?;
                let artifact = Artifact::find(&args.artifacts, &args.contract)?;
                let options = DeployOptions {
                    confirmations: args.confirmations,
                    legacy: args.legacy,
                };
                let deploy = Deploy::new(network, self.signer(network)?, options).await?;
                let address = deploy.run(&artifact).await?;
                report_address(&mut std::io::stdout().lock(), address)
            }
            Command::Config => {
                let config = Config::from_env()?;
                println!("{}", serde_json::to_string_pretty(&config)?);
                Ok(())
            }
            Command::Project { registry, action } => {
                let config = Config::from_env()?;
                let network = self.network(&config)?;
                self.project(network, registry, action).await
            }
            Command::Wallet { action } => match action {
                WalletCommand::New => {
                    println!("{}", serde_json::to_string_pretty(&create_wallet())?);
                    Ok(())
                }
                WalletCommand::Keystore => {
                    let dir = self
                        .keystore
                        .as_ref()
                        .ok_or_else(|| anyhow!("--keystore is required"))?;
                    let wallet = init_keystore_wallet(dir, self.keystore_password()?)?;
                    println!("account address: {:?}", wallet.address());
                    Ok(())
                }
            },
        }
    }

    fn network<'a>(&self, config: &'a Config) -> Result<&'a NetworkConfig> {
        let (name, network) = config.network(self.network.as_deref())?;
        log::debug!("using network {} at {}", name, network.url);
        Ok(network)
    }

    async fn project(
        &self,
        network: &NetworkConfig,
        registry: &RegistryArgs,
        action: &ProjectCommand,
    ) -> Result<()> {
        let timeouts = registry.timeouts()?;

        match action {
            ProjectCommand::Exists { repository } | ProjectCommand::Get { repository } => {
                let provider = provider(network)?;
                check_chain_id(&provider, network).await?;
                let actions = ProjectActions::new(registry.registry, Arc::new(provider), timeouts);
                let id = repository_identifier(repository);

                if matches!(action, ProjectCommand::Exists { .. }) {
                    println!("exists: {}", actions.exists(id).await?);
                } else {
                    println!("cid: {}", actions.get_cid(id).await?);
                }
                Ok(())
            }
            ProjectCommand::Set { repository, cid } => {
                let client = connect(network, self.signer(network)?).await?;
                let actions = ProjectActions::new(registry.registry, client, timeouts);
                let tx_hash = actions
                    .set_cid(repository_identifier(repository), cid)
                    .await?;
                println!("transaction hash: {:?}", tx_hash);
                Ok(())
            }
        }
    }

    fn keystore_password(&self) -> Result<&str> {
        self.keystore_password
            .as_deref()
            .ok_or_else(|| anyhow!("--keystore-password or KEYSTORE_PASSWORD is required"))
    }

    fn signer(&self, network: &NetworkConfig) -> Result<LocalWallet> {
        match &self.keystore {
            Some(dir) => init_keystore_wallet(dir, self.keystore_password()?),
            None => signer_from_key(network.signer_key()?).context("invalid PRIVATE_KEY"),
        }
    }
}
