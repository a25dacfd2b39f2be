use std::path::PathBuf;
use std::process::Command;

use serde::Deserialize;

use crate::config::Metadata;
use crate::report::{Error, ErrorExt, Report};

#[derive(Deserialize)]
struct CargoManifest {
    name: String,
    version: String,
    manifest_path: PathBuf,
    #[serde(default)]
    metadata: Option<Metadata>,
}

#[derive(Deserialize)]
struct CargoMetadata {
    target_directory: PathBuf,
}

pub struct Manifest {
    pub crate_name: String,
    pub crate_version: String,
    /// Directory holding the package's `Cargo.toml`
    pub root: PathBuf,
    pub target: PathBuf,
    pub metadata: Metadata,
}

impl Manifest {
    /// Name of the `.wasm` artifact cargo produces for this package.
    pub fn artifact_name(&self) -> String {
        self.crate_name.replace('-', "_")
    }
}

pub fn manifest() -> Report<Manifest> {
    let out = Command::new("cargo")
        .arg("read-manifest")
        .output()
        .message("failed to run cargo")?;

    if !out.status.success() {
        let err = String::from_utf8_lossy(&out.stderr);
        return Err(Error::message(format!(
            "failed to read cargo manifest\n{err}",
        )));
    }

    let manifest: CargoManifest =
        serde_json::from_slice(&out.stdout).message("failed to parse cargo manifest")?;

    let out = Command::new("cargo")
        .args([
            "metadata",
            "--format-version=1",
            "--filter-platform=wasm32-unknown-unknown",
            "--no-deps",
        ])
        .output()
        .message("failed to run cargo")?;

    if !out.status.success() {
        let err = String::from_utf8_lossy(&out.stderr);
        return Err(Error::message(format!(
            "failed to read cargo metadata\n{err}",
        )));
    }

    let metadata: CargoMetadata =
        serde_json::from_slice(&out.stdout).message("failed to parse cargo metadata")?;

    let root = match manifest.manifest_path.parent() {
        Some(root) => root.to_path_buf(),
        None => {
            return Err(Error::message(format!(
                "manifest path {} has no parent directory",
                manifest.manifest_path.display(),
            )))
        }
    };

    Ok(Manifest {
        crate_name: manifest.name,
        crate_version: manifest.version,
        root,
        target: metadata.target_directory,
        metadata: manifest.metadata.unwrap_or_default(),
    })
}
