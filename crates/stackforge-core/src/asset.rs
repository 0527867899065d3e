//! Container image assets.
//!
//! An image asset names a local build context; the actual image build and
//! push are owned by external tooling. Synthesis only fingerprints the
//! context so the template references a content-addressed image URI.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{SynthError, SynthResult};
use crate::stack::Environment;

/// Registry repository all image assets resolve into.
pub const ASSET_REPOSITORY: &str = "stackforge-assets";

/// A container image built from a local directory context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAsset {
    pub context: PathBuf,
    pub fingerprint: String,
}

impl ImageAsset {
    /// Fingerprint a build context.
    ///
    /// The digest covers the sorted relative paths and file bytes of the
    /// context directory. Hidden entries and `target` directories are
    /// excluded so local build output does not perturb the fingerprint.
    pub fn from_context(context: &Path) -> SynthResult<Self> {
        if !context.is_dir() {
            return Err(SynthError::AssetNotFound(context.display().to_string()));
        }

        let mut files = Vec::new();
        collect_files(context, context, &mut files)?;
        files.sort();

        let mut hasher = Sha256::new();
        for relative in &files {
            hasher.update(relative.to_string_lossy().as_bytes());
            hasher.update([0u8]);
            hasher.update(fs::read(context.join(relative))?);
        }

        Ok(Self {
            context: context.to_path_buf(),
            fingerprint: hex::encode(hasher.finalize()),
        })
    }

    /// Content-addressed image URI in the given environment's registry.
    pub fn image_uri(&self, env: &Environment) -> String {
        format!(
            "{}.dkr.ecr.{}.amazonaws.com/{}:{}",
            env.account, env.region, ASSET_REPOSITORY, self.fingerprint
        )
    }
}

fn collect_files(root: &Path, dir: &Path, files: &mut Vec<PathBuf>) -> SynthResult<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with('.') {
            continue;
        }
        if path.is_dir() {
            if name == "target" {
                continue;
            }
            collect_files(root, &path, files)?;
        } else if let Ok(relative) = path.strip_prefix(root) {
            files.push(relative.to_path_buf());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_fingerprint_is_stable_for_unchanged_context() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("Dockerfile"), "FROM scratch\n").unwrap();
        fs::write(dir.path().join("app.txt"), "hello").unwrap();

        let first = ImageAsset::from_context(dir.path()).unwrap();
        let second = ImageAsset::from_context(dir.path()).unwrap();
        assert_eq!(first.fingerprint, second.fingerprint);
    }

    #[test]
    fn test_fingerprint_changes_when_content_changes() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("Dockerfile"), "FROM scratch\n").unwrap();

        let before = ImageAsset::from_context(dir.path()).unwrap();
        fs::write(dir.path().join("Dockerfile"), "FROM alpine\n").unwrap();
        let after = ImageAsset::from_context(dir.path()).unwrap();
        assert_ne!(before.fingerprint, after.fingerprint);
    }

    #[test]
    fn test_build_output_does_not_perturb_fingerprint() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("Dockerfile"), "FROM scratch\n").unwrap();

        let before = ImageAsset::from_context(dir.path()).unwrap();
        fs::create_dir(dir.path().join("target")).unwrap();
        fs::write(dir.path().join("target").join("binary"), "bits").unwrap();
        fs::write(dir.path().join(".dockerignore"), "target\n").unwrap();
        let after = ImageAsset::from_context(dir.path()).unwrap();
        assert_eq!(before.fingerprint, after.fingerprint);
    }

    #[test]
    fn test_missing_context_is_an_error() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        let result = ImageAsset::from_context(&missing);
        assert!(matches!(result.unwrap_err(), SynthError::AssetNotFound(_)));
    }

    #[test]
    fn test_image_uri_is_content_addressed() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("Dockerfile"), "FROM scratch\n").unwrap();

        let asset = ImageAsset::from_context(dir.path()).unwrap();
        let env = Environment::new("123456789012", "eu-west-1");
        let uri = asset.image_uri(&env);
        assert!(uri.starts_with("123456789012.dkr.ecr.eu-west-1.amazonaws.com/stackforge-assets:"));
        assert!(uri.ends_with(&asset.fingerprint));
    }
}
