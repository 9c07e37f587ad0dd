use std::path::PathBuf;

use buildnum_protocol::BuildNumRequest;
use tracing::{debug, info};

use crate::client::{BuildNumberSource, ClientError};
use crate::config::Config;
use crate::manifest::{Manifest, ManifestError};

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Updated {
    pub path: PathBuf,
    pub version: String,
}

/// Reads the manifest, fetches the next build number and rewrites the
/// manifest in place. The file is only touched once a build number has been
/// obtained.
pub fn run(config: &Config, source: &impl BuildNumberSource) -> Result<Updated, RunError> {
    let manifest = Manifest::read(&config.manifest_path)?;
    let current = manifest.tag();
    debug!(
        path = %config.manifest_path.display(),
        base = %current.base(),
        build = %current.build(),
        "Found version tag"
    );

    let request = BuildNumRequest::new(&config.product, current.base(), &config.commit);
    let build = source.next_build_num(&request)?;

    let updated = manifest.with_build(build.as_str());
    updated.write(&config.manifest_path)?;

    let version = updated.tag().version();
    info!(path = %config.manifest_path.display(), %version, "Manifest updated");

    Ok(Updated {
        path: config.manifest_path.clone(),
        version,
    })
}
