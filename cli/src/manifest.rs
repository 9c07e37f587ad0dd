//! Reading and rewriting the version tag of a manifest file.
//!
//! Only the first `Version="A.B.C.D"` tag is looked at. Everything around it
//! is carried through as raw bytes, whatever its encoding, so the rewritten
//! file differs from the original in the build component alone.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::bytes::Regex;

static VERSION_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"Version="([0-9]+\.[0-9]+\.[0-9]+)\.([0-9]+)""#).unwrap()
});

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("could not open file for read: {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not find the version string")]
    VersionNotFound,

    #[error("could not open file for write: {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Manifest text split around its version tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    prefix: Vec<u8>,
    tag: VersionTag,
    suffix: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionTag {
    /// `major.minor.patch` exactly as written.
    base: String,
    build: String,
}

impl VersionTag {
    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn build(&self) -> &str {
        &self.build
    }

    pub fn version(&self) -> String {
        format!("{}.{}", self.base, self.build)
    }

    pub fn with_build(&self, build: &str) -> Self {
        Self {
            base: self.base.clone(),
            build: build.to_string(),
        }
    }

    fn render(&self) -> String {
        format!("Version=\"{}\"", self.version())
    }
}

impl Manifest {
    pub fn parse(content: impl AsRef<[u8]>) -> Result<Self, ManifestError> {
        let content = content.as_ref();
        let caps = VERSION_TAG
            .captures(content)
            .ok_or(ManifestError::VersionNotFound)?;
        let (Some(whole), Some(base), Some(build)) = (caps.get(0), caps.get(1), caps.get(2))
        else {
            return Err(ManifestError::VersionNotFound);
        };

        // Both groups are ASCII digits and dots.
        Ok(Self {
            prefix: content[..whole.start()].to_vec(),
            tag: VersionTag {
                base: String::from_utf8_lossy(base.as_bytes()).into_owned(),
                build: String::from_utf8_lossy(build.as_bytes()).into_owned(),
            },
            suffix: content[whole.end()..].to_vec(),
        })
    }

    pub fn read(path: &Path) -> Result<Self, ManifestError> {
        let content = fs::read(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn tag(&self) -> &VersionTag {
        &self.tag
    }

    /// Same manifest with the build component replaced.
    pub fn with_build(&self, build: &str) -> Self {
        Self {
            prefix: self.prefix.clone(),
            tag: self.tag.with_build(build),
            suffix: self.suffix.clone(),
        }
    }

    pub fn render(&self) -> Vec<u8> {
        let tag = self.tag.render();
        let mut out = Vec::with_capacity(self.prefix.len() + tag.len() + self.suffix.len());
        out.extend_from_slice(&self.prefix);
        out.extend_from_slice(tag.as_bytes());
        out.extend_from_slice(&self.suffix);
        out
    }

    /// Truncates and rewrites the file at `path`.
    pub fn write(&self, path: &Path) -> Result<(), ManifestError> {
        fs::write(path, self.render()).map_err(|source| ManifestError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}
