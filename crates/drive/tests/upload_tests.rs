//! Direct upload tests.

mod common;

use common::{TestDrive, entry, owner, payload, read_all};
use larder_core::NodeKind;
use larder_core::config::DriveConfig;
use larder_drive::{BytesSource, DriveError, ErrorKind, FileSource, StreamSource, UploadLimits};

#[tokio::test]
async fn test_upload_lists_file_and_reads_back() {
    let t = TestDrive::new().await;
    let owner = owner();
    let data = payload(500, 1);

    let listing = t.upload(owner, None, "a.JPG", &data).await.unwrap();
    let file = entry(&listing, "a.JPG");
    assert_eq!(file.kind, NodeKind::File);
    assert_eq!(file.size, Some(500));
    assert_eq!(file.extension.as_deref(), Some("jpg"));
    assert!(!file.is_chunked);

    let download = t.drive.get_file(owner, file.id).await.unwrap();
    assert_eq!(download.original_name, "a.JPG");
    assert_eq!(download.size, 500);
    assert_eq!(read_all(download.stream).await, data);
}

#[tokio::test]
async fn test_blob_keys_are_sharded() {
    let t = TestDrive::new().await;
    let owner = owner();

    t.upload(owner, None, "first.txt", b"one").await.unwrap();
    t.upload(owner, None, "second.txt", b"two").await.unwrap();

    let keys = t.storage.keys();
    assert_eq!(keys.len(), 2);
    assert!(keys[0].starts_with("1/1/1-"), "{keys:?}");
    assert!(keys[1].starts_with("1/1/2-"), "{keys:?}");
}

#[tokio::test]
async fn test_upload_into_directory() {
    let t = TestDrive::new().await;
    let owner = owner();
    let dir = t.mkdir(owner, None, "docs").await;

    let listing = t.upload(owner, Some(dir), "notes.md", b"# hi").await.unwrap();
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].parent, Some(dir));

    let root = t.drive.get_tree(owner, None).await.unwrap();
    assert_eq!(root.len(), 1);
    assert_eq!(root[0].kind, NodeKind::Directory);
    assert_eq!(root[0].size, None);
}

#[tokio::test]
async fn test_upload_from_file_source() {
    let t = TestDrive::new().await;
    let owner = owner();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.pdf");
    let data = payload(200_000, 9);
    tokio::fs::write(&path, &data).await.unwrap();

    let mut source = FileSource::open(&path).await.unwrap();
    let listing = t
        .drive
        .upload_file(owner, None, "report.pdf", &mut source, t.limits())
        .await
        .unwrap();
    let file = entry(&listing, "report.pdf");
    assert_eq!(file.size, Some(200_000));

    let download = t.drive.get_file(owner, file.id).await.unwrap();
    assert_eq!(read_all(download.stream).await, data);
}

#[tokio::test]
async fn test_quota_equal_accepted_over_rejected() {
    let t = TestDrive::new().await;
    let owner = owner();
    let limits = UploadLimits {
        max_size: 10_000,
        quota: 1000,
    };

    let mut source = BytesSource::new(payload(600, 0));
    t.drive
        .upload_file(owner, None, "a", &mut source, limits)
        .await
        .unwrap();

    let mut source = BytesSource::new(payload(400, 0));
    t.drive
        .upload_file(owner, None, "b", &mut source, limits)
        .await
        .expect("reaching the ceiling exactly is allowed");

    let mut source = BytesSource::new(payload(1, 0));
    let err = t
        .drive
        .upload_file(owner, None, "c", &mut source, limits)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DriveError::QuotaExceeded {
            used: 1000,
            incoming: 1,
            ceiling: 1000
        }
    ));
    assert_eq!(err.kind(), ErrorKind::QuotaExceeded);
    assert_eq!(t.storage.keys().len(), 2);
}

#[tokio::test]
async fn test_size_limits() {
    let t = TestDrive::with_config(DriveConfig {
        direct_upload_ceiling: 100,
        ..DriveConfig::default()
    })
    .await;
    let owner = owner();

    let err = t.upload(owner, None, "big", &payload(101, 0)).await.unwrap_err();
    assert!(matches!(err, DriveError::UseChunkedUpload { size: 101, limit: 100 }));

    let limits = UploadLimits {
        max_size: 10,
        quota: u64::MAX,
    };
    let mut source = BytesSource::new(payload(50, 0));
    let err = t
        .drive
        .upload_file(owner, None, "medium", &mut source, limits)
        .await
        .unwrap_err();
    assert!(matches!(err, DriveError::TooLarge { size: 50, limit: 10 }));
    assert_eq!(err.kind(), ErrorKind::Validation);

    assert!(t.storage.keys().is_empty());
}

#[tokio::test]
async fn test_unsized_source_is_measured_then_rejected() {
    let t = TestDrive::with_config(DriveConfig {
        direct_upload_ceiling: 100,
        ..DriveConfig::default()
    })
    .await;
    let owner = owner();

    let small = payload(10, 0);
    let mut source = StreamSource::new(&small[..]);
    let err = t
        .drive
        .upload_file(owner, None, "piped", &mut source, t.limits())
        .await
        .unwrap_err();
    assert!(matches!(err, DriveError::NotSeekable));

    let large = payload(5000, 0);
    let mut source = StreamSource::new(&large[..]);
    let err = t
        .drive
        .upload_file(owner, None, "piped", &mut source, t.limits())
        .await
        .unwrap_err();
    assert!(matches!(err, DriveError::UseChunkedUpload { size: 101, .. }));
}

#[tokio::test]
async fn test_duplicate_filename_rejected() {
    let t = TestDrive::new().await;
    let owner = owner();

    t.upload(owner, None, "same.txt", b"1").await.unwrap();
    let err = t.upload(owner, None, "same.txt", b"2").await.unwrap_err();
    assert!(matches!(err, DriveError::FilenameExists(ref n) if n == "same.txt"));

    // A directory may share the name
    t.mkdir(owner, None, "same.txt").await;
    // So may another owner
    t.upload(common::owner(), None, "same.txt", b"3").await.unwrap();
}

#[tokio::test]
async fn test_bad_filenames() {
    let t = TestDrive::new().await;
    let owner = owner();

    for name in ["../escape", "a/b", "..", "nul\0byte"] {
        let err = t.upload(owner, None, name, b"x").await.unwrap_err();
        assert!(matches!(err, DriveError::UnsafeFilename(_)), "{name}: {err}");
    }
    let err = t.upload(owner, None, "   ", b"x").await.unwrap_err();
    assert!(matches!(err, DriveError::InvalidName(_)));

    assert!(t.storage.keys().is_empty());
}

#[tokio::test]
async fn test_parent_must_be_owned_directory() {
    let t = TestDrive::new().await;
    let owner = owner();
    let stranger = common::owner();

    let theirs = t.mkdir(stranger, None, "theirs").await;
    let listing = t.upload(owner, None, "file.txt", b"x").await.unwrap();
    let file = entry(&listing, "file.txt").id;

    for parent in [theirs, file, 424242] {
        let err = t.upload(owner, Some(parent), "f", b"x").await.unwrap_err();
        assert!(matches!(err, DriveError::ParentNotFound), "{parent}: {err}");
    }
}

#[tokio::test]
async fn test_failed_save_leaves_no_catalog_row() {
    let t = TestDrive::failing(DriveConfig::default()).await;
    let owner = owner();
    t.failing_store().fail_saves(true);

    let err = t.upload(owner, None, "doomed.bin", &payload(1000, 3)).await.unwrap_err();
    assert!(matches!(err, DriveError::SaveFailed(_)));
    assert_eq!(err.kind(), ErrorKind::BackendIo);

    assert!(t.drive.get_tree(owner, None).await.unwrap().is_empty());
    assert_eq!(t.metadata.count("nodes").await, 0);
    assert_eq!(t.metadata.count("file_contents").await, 0);
    assert!(t.storage.keys().is_empty());
}

#[tokio::test]
async fn test_get_file_rejects_directories_and_strangers() {
    let t = TestDrive::new().await;
    let owner = owner();
    let dir = t.mkdir(owner, None, "dir").await;
    let listing = t.upload(owner, None, "f.txt", b"data").await.unwrap();
    let file = entry(&listing, "f.txt").id;

    assert!(matches!(
        t.drive.get_file(owner, dir).await.unwrap_err(),
        DriveError::NotFound(_)
    ));
    assert!(matches!(
        t.drive.get_file(common::owner(), file).await.unwrap_err(),
        DriveError::NotFound(_)
    ));
}
