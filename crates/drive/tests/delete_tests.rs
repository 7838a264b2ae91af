//! Recursive delete tests.

mod common;

use bytes::Bytes;
use common::{TestDrive, entry, owner, payload};
use larder_core::config::DriveConfig;
use larder_drive::DriveError;

#[tokio::test]
async fn test_delete_directory_removes_rows_and_blobs() {
    let t = TestDrive::new().await;
    let owner = owner();
    let root = t.mkdir(owner, None, "root").await;
    let sub = t.mkdir(owner, Some(root), "sub").await;
    t.upload(owner, Some(root), "a.txt", b"aaa").await.unwrap();
    t.upload(owner, Some(sub), "b.txt", b"bbbb").await.unwrap();
    t.upload(owner, None, "keep.txt", b"keep").await.unwrap();
    assert_eq!(t.storage.keys().len(), 3);

    let summary = t.drive.delete(owner, root).await.unwrap();
    assert_eq!(summary.nodes_removed, 4);
    assert_eq!(summary.blobs_removed, 2);
    assert_eq!(summary.blobs_failed, 0);

    let remaining = t.drive.get_tree(owner, None).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].name, "keep.txt");
    assert_eq!(t.storage.keys().len(), 1);
    assert_eq!(t.drive.space(owner, 100).await.unwrap().used, 4);
}

#[tokio::test]
async fn test_blob_failures_never_fail_delete() {
    let t = TestDrive::failing(DriveConfig::default()).await;
    let owner = owner();
    let dir = t.mkdir(owner, None, "dir").await;
    let inner = t.mkdir(owner, Some(dir), "inner").await;

    const FILES: usize = 6;
    for i in 0..FILES {
        let parent = if i % 2 == 0 { dir } else { inner };
        t.upload(owner, Some(parent), &format!("f{i}"), &payload(10, i as u8))
            .await
            .unwrap();
    }

    t.failing_store().fail_deletes(true);
    let summary = t.drive.delete(owner, dir).await.unwrap();

    assert_eq!(t.failing_store().deletes(), FILES);
    assert_eq!(summary.blobs_failed, FILES as u64);
    assert_eq!(summary.nodes_removed, (FILES + 2) as u64);
    assert_eq!(t.metadata.count("nodes").await, 0);
    assert_eq!(t.metadata.count("file_contents").await, 0);
}

#[tokio::test]
async fn test_delete_single_file() {
    let t = TestDrive::new().await;
    let owner = owner();
    let listing = t.upload(owner, None, "solo.bin", &payload(64, 0)).await.unwrap();
    let file = entry(&listing, "solo.bin").id;

    let summary = t.drive.delete(owner, file).await.unwrap();
    assert_eq!(summary.nodes_removed, 1);
    assert!(t.storage.keys().is_empty());

    let err = t.drive.delete(owner, file).await.unwrap_err();
    assert!(matches!(err, DriveError::NotFound(_)));
}

#[tokio::test]
async fn test_delete_foreign_node_is_not_found() {
    let t = TestDrive::new().await;
    let owner = owner();
    let dir = t.mkdir(owner, None, "private").await;

    let err = t.drive.delete(common::owner(), dir).await.unwrap_err();
    assert!(matches!(err, DriveError::NotFound(_)));
    assert_eq!(t.parent_of(dir).await, None);
}

#[tokio::test]
async fn test_delete_pending_chunked_upload_removes_parts() {
    let t = TestDrive::new().await;
    let owner = owner();
    let dir = t.mkdir(owner, None, "uploads").await;
    let handle = t
        .drive
        .prepare_chunked_upload(owner, Some(dir), "big.iso", 30, t.limits())
        .await
        .unwrap();
    for n in 0..3 {
        t.drive
            .append_chunk(owner, handle, n, Bytes::from(payload(10, n as u8)))
            .await
            .unwrap();
    }
    assert_eq!(t.storage.keys().len(), 3);

    let summary = t.drive.delete(owner, dir).await.unwrap();
    assert_eq!(summary.blobs_removed, 3);
    assert!(t.storage.keys().is_empty());
    assert_eq!(t.metadata.count("chunks").await, 0);
}
