use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{anyhow, bail, Context, Result};
use ethers::{
    abi::Abi,
    contract::ContractFactory,
    providers::Middleware,
    types::Bytes,
};
use serde::Deserialize;

/// Compiled contract as written by the contract build: `<Name>.sol/<Name>.json`.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub contract_name: String,
    #[serde(default)]
    pub source_name: String,
    pub abi: Abi,
    pub bytecode: Bytes,
}

impl Artifact {
    /// Looks up an artifact either by bare contract name or by `path/To.sol:Name`.
    pub fn find(artifacts_dir: &Path, name: &str) -> Result<Self> {
        let path = match name.rsplit_once(':') {
            Some((source, contract)) => {
                let path = artifacts_dir.join(source).join(format!("{contract}.json"));
                if !path.is_file() {
                    bail!("artifact for {name} not found at {}", path.display());
                }
                path
            }
            None => {
                let mut matches = Vec::new();
                collect_artifacts(artifacts_dir, name, &mut matches).with_context(|| {
                    format!("failed to read artifacts in {}", artifacts_dir.display())
                })?;
                match matches.len() {
                    0 => bail!(
                        "artifact for contract {name} not found in {}",
                        artifacts_dir.display()
                    ),
                    1 => matches.remove(0),
                    _ => bail!(
                        "multiple artifacts for contract {name}, use a fully qualified name: {}",
                        matches
                            .iter()
                            .map(|path| qualified_name(artifacts_dir, path))
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                }
            }
        };

        let artifact = Self::load(&path)?;
        log::debug!(
            "loaded {} from {} ({})",
            artifact.contract_name,
            artifact.source_name,
            path.display()
        );
        Ok(artifact)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read artifact {}", path.display()))?;
        serde_json::from_str(&data)
            .with_context(|| format!("malformed artifact {}", path.display()))
    }

    /// Builds the deployment factory; abstract contracts and interfaces have no bytecode.
    pub fn factory<M: Middleware>(&self, client: Arc<M>) -> Result<ContractFactory<M>> {
        if self.bytecode.is_empty() {
            return Err(anyhow!(
                "contract {} is abstract or an interface and cannot be deployed",
                self.contract_name
            ));
        }
        Ok(ContractFactory::new(
            self.abi.clone(),
            self.bytecode.clone(),
            client,
        ))
    }
}

fn collect_artifacts(dir: &Path, name: &str, matches: &mut Vec<PathBuf>) -> Result<()> {
    let file_name = format!("{name}.json");
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            // build-info holds compiler input/output, not contract artifacts
            if path.file_name().is_some_and(|dir| dir == "build-info") {
                continue;
            }
            collect_artifacts(&path, name, matches)?;
        } else if path.file_name().is_some_and(|file| file == file_name.as_str())
            && path
                .parent()
                .and_then(Path::extension)
                .is_some_and(|ext| ext == "sol")
        {
            matches.push(path);
        }
    }
    Ok(())
}

fn qualified_name(artifacts_dir: &Path, path: &Path) -> String {
    let source = path
        .parent()
        .and_then(|source| source.strip_prefix(artifacts_dir).ok())
        .map(|source| source.display().to_string())
        .unwrap_or_default();
    let contract = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default();
    format!("{source}:{contract}")
}
