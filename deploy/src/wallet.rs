use std::{fs, path::Path};

use anyhow::{bail, Context, Result};
use ethers::{
    core::rand::thread_rng,
    signers::{LocalWallet, Signer},
    types::H160,
    utils::hex,
};
use serde::Serialize;

use crate::utils::decode_hex;

/// A freshly generated account that is not tied to any keystore.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnonymousWallet {
    pub address: H160,
    pub private_key: String,
}

pub fn signer_from_key(key: &str) -> Result<LocalWallet> {
    let bytes = decode_hex(key).context("private key is not valid hex")?;
    LocalWallet::from_bytes(&bytes).context("private key is not a valid secp256k1 key")
}

pub fn create_wallet() -> AnonymousWallet {
    let wallet = LocalWallet::new(&mut thread_rng());
    AnonymousWallet {
        address: wallet.address(),
        private_key: hex::encode(wallet.signer().to_bytes()),
    }
}

/// Uses the only account of a keystore directory, creating it when the directory is empty.
pub fn init_keystore_wallet(dir: &Path, password: &str) -> Result<LocalWallet> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create keystore directory {}", dir.display()))?;

    let mut accounts = Vec::new();
    for entry in fs::read_dir(dir)
        .with_context(|| format!("failed to read keystore directory {}", dir.display()))?
    {
        let path = entry?.path();
        if path.is_file() && !is_hidden(&path) {
            accounts.push(path);
        }
    }

    match accounts.as_slice() {
        [] => {
            let (wallet, name) = LocalWallet::new_keystore(dir, &mut thread_rng(), password, None)
                .context("failed to create keystore account")?;
            log::info!(
                "created keystore account {:?} in {}",
                wallet.address(),
                dir.join(name).display()
            );
            Ok(wallet)
        }
        [path] => {
            let wallet = LocalWallet::decrypt_keystore(path, password)
                .with_context(|| format!("failed to decrypt keystore {}", path.display()))?;
            log::debug!("loaded keystore account {:?}", wallet.address());
            Ok(wallet)
        }
        _ => bail!(
            "too many accounts found in {}, expected at most one",
            dir.display()
        ),
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4ff80";
    const ADDRESS: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

    #[test]
    fn signer_from_key_with_or_without_prefix() {
        let with_prefix = signer_from_key(KEY).unwrap();
        let without_prefix = signer_from_key(&KEY[2..]).unwrap();

        assert_eq!(format!("{:?}", with_prefix.address()), ADDRESS);
        assert_eq!(with_prefix.address(), without_prefix.address());
    }

    #[test]
    fn rejects_bad_keys() {
        assert!(signer_from_key("0xnothex").is_err());
        assert!(signer_from_key("0x1234").is_err());
        assert!(signer_from_key(&format!("0x{}", "00".repeat(32))).is_err());
    }

    #[test]
    fn created_wallet_matches_its_key() {
        let created = create_wallet();
        assert_eq!(created.private_key.len(), 64);

        let restored = signer_from_key(&created.private_key).unwrap();
        assert_eq!(restored.address(), created.address);
        assert_ne!(create_wallet().address, created.address);
    }

    #[test]
    fn keystore_creates_then_reuses_account() {
        let dir = tempfile::tempdir().unwrap();
        let keystore = dir.path().join("keystore");

        let created = init_keystore_wallet(&keystore, "secret").unwrap();
        assert_eq!(fs::read_dir(&keystore).unwrap().count(), 1);

        let loaded = init_keystore_wallet(&keystore, "secret").unwrap();
        assert_eq!(created.address(), loaded.address());
        assert_eq!(fs::read_dir(&keystore).unwrap().count(), 1);

        assert!(init_keystore_wallet(&keystore, "wrong").is_err());
    }

    #[test]
    fn keystore_with_two_accounts_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a"), "{}").unwrap();
        fs::write(dir.path().join("b"), "{}").unwrap();

        let err = init_keystore_wallet(dir.path(), "secret").unwrap_err();
        assert!(err.to_string().contains("too many accounts found"));
    }
}
