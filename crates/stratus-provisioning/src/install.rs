//! ---
//! srt_section: "05-networking-external-interfaces"
//! srt_subsection: "module"
//! srt_type: "source"
//! srt_scope: "code"
//! srt_description: "Managed download of the Terraform binary."
//! srt_version: "v0.0.0-prealpha"
//! srt_owner: "tbd"
//! ---
use std::io::{Cursor, Read};
use std::path::Path;

use sha2::{Digest, Sha256};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{cancellable, ProvisionError, Result};

/// Downloads a pinned Terraform release and verifies it against the published checksums.
#[derive(Debug, Clone)]
pub struct TerraformInstaller {
    version: String,
    release_base_url: String,
    client: reqwest::Client,
}

impl TerraformInstaller {
    pub fn new(version: impl Into<String>, release_base_url: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            release_base_url: release_base_url.into().trim_end_matches('/').to_owned(),
            client: reqwest::Client::new(),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Archive name for the running host.
    pub fn archive_name(&self) -> String {
        release_archive_name(&self.version, std::env::consts::OS, std::env::consts::ARCH)
    }

    fn url(&self, file: &str) -> String {
        format!("{}/{}/{}", self.release_base_url, self.version, file)
    }

    async fn fetch(&self, url: String) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|source| ProvisionError::Download {
                url: url.clone(),
                source,
            })?;
        let body = response
            .bytes()
            .await
            .map_err(|source| ProvisionError::Download { url, source })?;
        Ok(body.to_vec())
    }

    /// Download, verify and unpack the binary to `destination`.
    pub async fn install(&self, destination: &Path, cancel: &CancellationToken) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(ProvisionError::Cancelled);
        }
        let archive = self.archive_name();
        info!(version = %self.version, destination = %destination.display(), "installing terraform");

        let sums_file = format!("terraform_{}_SHA256SUMS", self.version);
        let sums = cancellable(cancel, self.fetch(self.url(&sums_file))).await?;
        let sums = String::from_utf8_lossy(&sums);
        let expected = expected_checksum(&sums, &archive).ok_or_else(|| {
            ProvisionError::Install(format!("no checksum published for {archive}"))
        })?;

        let bytes = cancellable(cancel, self.fetch(self.url(&archive))).await?;
        verify_checksum(&archive, &bytes, &expected)?;
        let binary = extract_binary(&bytes, binary_file_name())?;

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| ProvisionError::io(parent, err))?;
        }
        let staging = destination.with_extension("download");
        tokio::fs::write(&staging, &binary)
            .await
            .map_err(|err| ProvisionError::io(&staging, err))?;
        make_executable(&staging).await?;
        tokio::fs::rename(&staging, destination)
            .await
            .map_err(|err| ProvisionError::io(destination, err))?;
        info!(destination = %destination.display(), "terraform installed");
        Ok(())
    }
}

/// `terraform_<version>_<os>_<arch>.zip` using HashiCorp's platform names.
pub fn release_archive_name(version: &str, os: &str, arch: &str) -> String {
    let os = match os {
        "macos" => "darwin",
        other => other,
    };
    let arch = match arch {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        "x86" => "386",
        other => other,
    };
    format!("terraform_{version}_{os}_{arch}.zip")
}

/// Look up `file` in a `SHA256SUMS` document.
pub fn expected_checksum(sums: &str, file: &str) -> Option<String> {
    sums.lines().find_map(|line| {
        let mut parts = line.split_whitespace();
        let digest = parts.next()?;
        let name = parts.next()?;
        (name == file).then(|| digest.to_ascii_lowercase())
    })
}

pub(crate) fn verify_checksum(file: &str, bytes: &[u8], expected: &str) -> Result<()> {
    let actual = hex::encode(Sha256::digest(bytes));
    if actual != expected {
        return Err(ProvisionError::Checksum {
            file: file.to_owned(),
            expected: expected.to_owned(),
            actual,
        });
    }
    Ok(())
}

/// Pull `name` out of a zip archive held in memory.
pub fn extract_binary(archive: &[u8], name: &str) -> Result<Vec<u8>> {
    let mut zip = zip::ZipArchive::new(Cursor::new(archive))
        .map_err(|err| ProvisionError::Install(format!("invalid release archive: {err}")))?;
    let mut entry = zip
        .by_name(name)
        .map_err(|err| ProvisionError::Install(format!("{name} not found in archive: {err}")))?;
    let mut binary = Vec::new();
    entry
        .read_to_end(&mut binary)
        .map_err(|err| ProvisionError::Install(format!("unable to unpack {name}: {err}")))?;
    Ok(binary)
}

fn binary_file_name() -> &'static str {
    if cfg!(windows) {
        "terraform.exe"
    } else {
        "terraform"
    }
}

#[cfg(unix)]
async fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .await
        .map_err(|err| ProvisionError::io(path, err))
}

#[cfg(not(unix))]
async fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn archive_with(name: &str, contents: &[u8]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file(
                name,
                SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored),
            )
            .unwrap();
        writer.write_all(contents).unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn archive_names_follow_release_layout() {
        assert_eq!(
            release_archive_name("1.1.2", "linux", "x86_64"),
            "terraform_1.1.2_linux_amd64.zip"
        );
        assert_eq!(
            release_archive_name("1.1.2", "macos", "aarch64"),
            "terraform_1.1.2_darwin_arm64.zip"
        );
    }

    #[test]
    fn checksum_lookup() {
        let sums = "\
aaaa  terraform_1.1.2_darwin_amd64.zip
BBBB  terraform_1.1.2_linux_amd64.zip
";
        assert_eq!(
            expected_checksum(sums, "terraform_1.1.2_linux_amd64.zip").as_deref(),
            Some("bbbb")
        );
        assert!(expected_checksum(sums, "terraform_1.1.2_windows_amd64.zip").is_none());
    }

    #[test]
    fn checksum_verification() {
        let payload = b"terraform";
        let digest = hex::encode(Sha256::digest(payload));
        verify_checksum("tf.zip", payload, &digest).unwrap();
        let err = verify_checksum("tf.zip", payload, "00").unwrap_err();
        assert!(matches!(err, ProvisionError::Checksum { .. }));
    }

    #[test]
    fn extracts_named_entry() {
        let archive = archive_with("terraform", b"#!/bin/sh\n");
        assert_eq!(extract_binary(&archive, "terraform").unwrap(), b"#!/bin/sh\n");
        assert!(extract_binary(&archive, "terraform.exe").is_err());
        assert!(extract_binary(b"garbage", "terraform").is_err());
    }

    #[test]
    fn base_url_trailing_slash_is_ignored() {
        let installer = TerraformInstaller::new("1.1.2", "https://mirror.example.invalid/terraform/");
        assert_eq!(
            installer.url("x.zip"),
            "https://mirror.example.invalid/terraform/1.1.2/x.zip"
        );
        assert_eq!(installer.version(), "1.1.2");
    }

    #[tokio::test]
    async fn cancelled_install_does_not_touch_disk() {
        let dir = tempfile::tempdir().unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let installer = TerraformInstaller::new("1.1.2", "https://releases.example.invalid");
        let err = installer
            .install(&dir.path().join("terraform"), &cancel)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert!(!dir.path().join("terraform").exists());
    }
}
