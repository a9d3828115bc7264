use super::signing::{KeyPair, RunSigner, RunVerifier};
use crate::error::ConfigError;
use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

const PRIVATE_SUFFIX: &str = ".private.pem";
const PUBLIC_SUFFIX: &str = ".public.pem";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPaths {
    pub private: PathBuf,
    pub public: PathBuf,
}

impl KeyPaths {
    /// `<name>.private.pem` / `<name>.public.pem` next to `name`.
    pub fn for_name(name: &Path) -> Self {
        let with_suffix = |suffix: &str| {
            let mut raw = name.as_os_str().to_os_string();
            raw.push(suffix);
            PathBuf::from(raw)
        };
        Self {
            private: with_suffix(PRIVATE_SUFFIX),
            public: with_suffix(PUBLIC_SUFFIX),
        }
    }
}

/// Key id recorded in signed runs: the key file name without its
/// `.private.pem` / `.public.pem` / `.pem` suffix.
pub fn key_id_from_path(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    [PRIVATE_SUFFIX, PUBLIC_SUFFIX, ".pem"]
        .iter()
        .find_map(|suffix| file_name.strip_suffix(suffix))
        .unwrap_or(&file_name)
        .to_string()
}

pub fn expand_path(raw: &Path) -> PathBuf {
    let raw = raw.to_string_lossy();
    PathBuf::from(shellexpand::tilde(raw.as_ref()).into_owned())
}

/// Write a key pair. Refuses to touch existing files and never leaves a
/// half-written pair behind.
pub fn write_keypair(name: &Path, pair: &KeyPair) -> Result<KeyPaths> {
    let paths = KeyPaths::for_name(&expand_path(name));
    for existing in [&paths.private, &paths.public] {
        if existing.exists() {
            return Err(ConfigError::KeysExist(existing.display().to_string()).into());
        }
    }

    if let Some(parent) = paths.private.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).context("failed to create key directory")?;
    }

    write_private_key_file(&paths.private, pair.private_pem.as_bytes())?;
    if let Err(error) = write_new_file(&paths.public, pair.public_pem.as_bytes()) {
        let _ = fs::remove_file(&paths.private);
        return Err(error.context("failed to write public key"));
    }
    Ok(paths)
}

fn write_private_key_file(path: &Path, pem: &[u8]) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(0o600)
            .open(path)
            .context("failed to create private key file")?;
        let written = file
            .write_all(pem)
            .and_then(|()| file.sync_all())
            .context("failed to write private key file");
        discard_on_error(path, written)?;
    }

    #[cfg(not(unix))]
    {
        write_new_file(path, pem)?;
    }

    discard_on_error(path, enforce_key_permissions(path))
}

/// Removes a half-written private key so a failed keygen leaves nothing behind.
fn discard_on_error<T>(path: &Path, result: Result<T>) -> Result<T> {
    if result.is_err() {
        let _ = fs::remove_file(path);
    }
    result
}

fn write_new_file(path: &Path, contents: &[u8]) -> Result<()> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    file.write_all(contents)
        .and_then(|()| file.sync_all())
        .with_context(|| format!("failed to write {}", path.display()))
}

fn enforce_key_permissions(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .context("failed to set key file permissions")?;
    }
    Ok(())
}

fn read_key_file(path: &Path) -> Result<String> {
    let path = expand_path(path);
    if !path.exists() {
        return Err(ConfigError::KeyNotFound(path.display().to_string()).into());
    }
    fs::read_to_string(&path).with_context(|| format!("failed to read key file {}", path.display()))
}

pub fn load_signer(path: &Path) -> Result<RunSigner> {
    let pem = zeroize::Zeroizing::new(read_key_file(path)?);
    Ok(RunSigner::from_pem(&pem)?)
}

pub fn load_verifier(path: &Path) -> Result<RunVerifier> {
    let pem = read_key_file(path)?;
    Ok(RunVerifier::from_pem(&pem)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::signing::generate_keypair;
    use tempfile::TempDir;

    #[test]
    fn failed_private_key_write_is_removed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ops.private.pem");
        fs::write(&path, "partial").unwrap();

        let failed: Result<()> = Err(anyhow::anyhow!("chmod refused"));
        assert!(discard_on_error(&path, failed).is_err());
        assert!(!path.exists());

        fs::write(&path, "complete").unwrap();
        assert!(discard_on_error(&path, Ok(())).is_ok());
        assert!(path.exists());
    }

    #[test]
    fn key_paths_append_suffixes() {
        let paths = KeyPaths::for_name(Path::new("keys/ops"));
        assert_eq!(paths.private, PathBuf::from("keys/ops.private.pem"));
        assert_eq!(paths.public, PathBuf::from("keys/ops.public.pem"));
    }

    #[test]
    fn key_id_strips_pem_suffixes() {
        assert_eq!(key_id_from_path(Path::new("/k/ops.private.pem")), "ops");
        assert_eq!(key_id_from_path(Path::new("ops.public.pem")), "ops");
        assert_eq!(key_id_from_path(Path::new("legacy.pem")), "legacy");
        assert_eq!(key_id_from_path(Path::new("raw")), "raw");
    }

    #[test]
    fn written_keys_load_back() {
        let dir = TempDir::new().unwrap();
        let pair = generate_keypair().unwrap();
        let paths = write_keypair(&dir.path().join("ops"), &pair).unwrap();

        let signer = load_signer(&paths.private).unwrap();
        let verifier = load_verifier(&paths.public).unwrap();
        let sig = signer.sign(b"abc");
        assert!(verifier.verify(b"abc", &sig));
    }

    #[cfg(unix)]
    #[test]
    fn private_key_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let pair = generate_keypair().unwrap();
        let paths = write_keypair(&dir.path().join("ops"), &pair).unwrap();
        let mode = fs::metadata(&paths.private).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn refuses_to_overwrite_existing_keys() {
        let dir = TempDir::new().unwrap();
        let first = generate_keypair().unwrap();
        let paths = write_keypair(&dir.path().join("ops"), &first).unwrap();
        let before = fs::read_to_string(&paths.private).unwrap();

        let second = generate_keypair().unwrap();
        let err = write_keypair(&dir.path().join("ops"), &second).unwrap_err();
        assert!(err.to_string().contains("already exists"));
        assert_eq!(fs::read_to_string(&paths.private).unwrap(), before);
    }

    #[test]
    fn existing_public_half_blocks_generation() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("ops.public.pem"), "stale").unwrap();
        let pair = generate_keypair().unwrap();
        assert!(write_keypair(&dir.path().join("ops"), &pair).is_err());
        assert!(!dir.path().join("ops.private.pem").exists());
    }

    #[test]
    fn missing_key_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let err = load_signer(&dir.path().join("absent.private.pem"))
            .err()
            .unwrap();
        assert!(err.to_string().contains("not found"));
    }
}
