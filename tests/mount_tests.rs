mod test_harness;

use std::sync::Arc;

use grep_worker::mount::MountedImage;
use tempfile::TempDir;
use test_harness::{write_fixture, MockMounter};

#[tokio::test]
async fn explicit_release_unmounts_once() {
    let dir = TempDir::new().unwrap();
    let image = dir.path().join("image");
    write_fixture(&image, "a.txt", "a\n");

    let mounter = Arc::new(MockMounter::new());
    let mounted = MountedImage::acquire(mounter.clone(), &image).await.unwrap();

    assert_eq!(mounted.files().len(), 1);
    mounted.release().await.unwrap();

    assert_eq!(mounter.mount_count(), 1);
    assert_eq!(mounter.unmount_count(), 1);
}

#[tokio::test]
async fn dropping_the_guard_unmounts() {
    let dir = TempDir::new().unwrap();
    let image = dir.path().join("image");
    write_fixture(&image, "a.txt", "a\n");

    let mounter = Arc::new(MockMounter::new());
    {
        let _mounted = MountedImage::acquire(mounter.clone(), &image).await.unwrap();
        // Guard dropped without release, e.g. an early return.
    }

    assert_eq!(mounter.unmount_count(), 1);
}

#[tokio::test]
async fn failed_mount_leaves_nothing_to_release() {
    let dir = TempDir::new().unwrap();
    let mounter = Arc::new(MockMounter::failing());

    let result = MountedImage::acquire(mounter.clone(), &dir.path().join("img")).await;

    assert!(result.is_err());
    assert_eq!(mounter.mount_count(), 0);
    assert_eq!(mounter.unmount_count(), 0);
}
