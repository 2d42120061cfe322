use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use uuid::Uuid;
use walkdir::WalkDir;

use crate::mount::{Mount, MountError, Mounter};

/// Mounts disk images with the system `mount`/`umount` utilities.
///
/// Each image gets its own directory under the mount root, attached with
/// `-o ro,loop` so nothing can write through it. The worker process needs
/// the privileges the mount utility demands; that is a deployment concern.
#[derive(Debug, Clone)]
pub struct LoopbackMounter {
    mount_root: PathBuf,
}

impl LoopbackMounter {
    pub fn new(mount_root: impl Into<PathBuf>) -> Self {
        Self {
            mount_root: mount_root.into(),
        }
    }

    fn new_mount_point(&self) -> PathBuf {
        self.mount_root.join(format!("img-{}", Uuid::new_v4()))
    }
}

#[async_trait]
impl Mounter for LoopbackMounter {
    async fn mount(&self, image: &Path) -> Result<Mount, MountError> {
        let mount_point = self.new_mount_point();
        tokio::fs::create_dir_all(&mount_point).await?;

        let output = Command::new("mount")
            .arg("-o")
            .arg("ro,loop")
            .arg(image)
            .arg(&mount_point)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            // Mount never happened; drop the directory again.
            let _ = tokio::fs::remove_dir(&mount_point).await;
            return Err(MountError::Tool {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let files = enumerate_files(mount_point.clone()).await?;
        Ok(Mount {
            image: image.to_path_buf(),
            mount_point,
            files,
        })
    }

    async fn unmount(&self, mount: &Mount) -> Result<(), MountError> {
        let output = Command::new("umount")
            .arg(&mount.mount_point)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            return Err(MountError::Tool {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        tokio::fs::remove_dir(&mount.mount_point).await?;
        Ok(())
    }

    fn unmount_blocking(&self, mount: &Mount) {
        let status = std::process::Command::new("umount")
            .arg(&mount.mount_point)
            .status();
        match status {
            Ok(status) if status.success() => {
                if let Err(e) = std::fs::remove_dir(&mount.mount_point) {
                    tracing::warn!(
                        mount_point = %mount.mount_point.display(),
                        error = %e,
                        "Failed to remove mount point"
                    );
                }
            }
            Ok(status) => {
                tracing::warn!(
                    mount_point = %mount.mount_point.display(),
                    code = ?status.code(),
                    "Fallback unmount failed"
                );
            }
            Err(e) => {
                tracing::warn!(
                    mount_point = %mount.mount_point.display(),
                    error = %e,
                    "Failed to run umount"
                );
            }
        }
    }
}

/// Walk the mount point and list regular files, sorted by name so scan
/// order is stable across runs.
async fn enumerate_files(mount_point: PathBuf) -> Result<Vec<PathBuf>, MountError> {
    tokio::task::spawn_blocking(move || {
        let mut files = Vec::new();
        for entry in WalkDir::new(&mount_point).sort_by_file_name() {
            let entry = entry.map_err(|e| match e.into_io_error() {
                Some(io) => MountError::Io(io),
                None => MountError::Io(std::io::Error::other("walk error")),
            })?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    })
    .await
    .map_err(|e| MountError::Io(std::io::Error::other(e)))?
}
