//! Read-only disk-image mounting.
//!
//! A disk image is exposed as a set of concrete file paths for the
//! duration of one search task. [`MountedImage`] is the owning guard:
//! the normal path releases the mount explicitly, and `Drop` falls back
//! to a blocking unmount so no exit path leaks a mount point.

pub mod loopback;

pub use loopback::LoopbackMounter;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MountError {
    #[error("Mount tool failed (exit {code:?}): {stderr}")]
    Tool { code: Option<i32>, stderr: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// An active mount: where the image is attached and which files it exposes.
#[derive(Debug, Clone)]
pub struct Mount {
    pub image: PathBuf,
    pub mount_point: PathBuf,
    /// Regular files under the mount point, sorted for deterministic
    /// scan order
    pub files: Vec<PathBuf>,
}

#[async_trait]
pub trait Mounter: Send + Sync {
    /// Attach an image read-only and enumerate its files.
    async fn mount(&self, image: &Path) -> Result<Mount, MountError>;

    /// Detach a mount and clean up its mount point.
    async fn unmount(&self, mount: &Mount) -> Result<(), MountError>;

    /// Synchronous unmount for `Drop`. Must not panic; failures are
    /// logged by the implementation.
    fn unmount_blocking(&self, mount: &Mount);
}

/// Scoped ownership of a mounted image.
pub struct MountedImage {
    mount: Mount,
    mounter: Arc<dyn Mounter>,
    released: bool,
}

impl MountedImage {
    pub async fn acquire(
        mounter: Arc<dyn Mounter>,
        image: &Path,
    ) -> Result<Self, MountError> {
        let mount = mounter.mount(image).await?;
        tracing::debug!(
            image = %mount.image.display(),
            mount_point = %mount.mount_point.display(),
            files = mount.files.len(),
            "Mounted disk image"
        );
        Ok(Self {
            mount,
            mounter,
            released: false,
        })
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.mount.files
    }

    pub fn mount_point(&self) -> &Path {
        &self.mount.mount_point
    }

    /// Unmount explicitly. Preferred over the `Drop` fallback because the
    /// caller sees the error.
    pub async fn release(mut self) -> Result<(), MountError> {
        self.released = true;
        self.mounter.unmount(&self.mount).await
    }
}

impl Drop for MountedImage {
    fn drop(&mut self) {
        if !self.released {
            self.mounter.unmount_blocking(&self.mount);
        }
    }
}
