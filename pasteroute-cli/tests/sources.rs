use pasteroute_cli::sources::{ClipboardSourceError, encode_png, entry_for_path};

#[test]
fn encoded_png_decodes_to_same_pixels() {
    let rgba: Vec<u8> = vec![
        255, 0, 0, 255, //
        0, 255, 0, 255, //
        0, 0, 255, 255, //
        255, 255, 255, 0,
    ];

    let png = encode_png(2, 2, &rgba).expect("encode png");
    assert_eq!(&png[1..4], b"PNG");

    let decoded = image::load_from_memory(&png).expect("decode png").to_rgba8();
    assert_eq!(decoded.dimensions(), (2, 2));
    assert_eq!(decoded.into_raw(), rgba);
}

#[test]
fn short_pixel_buffer_is_rejected() {
    let err = encode_png(4, 4, &[0_u8; 12]).expect_err("buffer too small");
    assert!(matches!(
        err,
        ClipboardSourceError::InvalidImage {
            width: 4,
            height: 4
        }
    ));
}

#[tokio::test]
async fn entry_for_path_describes_file_on_disk() {
    let dir = tempfile::tempdir().expect("create tempdir");
    let path = dir.path().join("Report.PDF");
    std::fs::write(&path, b"%PDF-1.7").expect("write file");

    let entry = entry_for_path(&path).await.expect("describe file");

    assert_eq!(entry.file_name(), Some("Report.PDF"));
    assert_eq!(entry.mime, "application/pdf");
    assert_eq!(entry.size, 8);
    assert_eq!(entry.origin_path.as_deref(), Some(path.as_path()));
    assert!(entry.last_modified_ms > 0);
}

#[tokio::test]
async fn entry_for_path_rejects_directories_and_missing_paths() {
    let dir = tempfile::tempdir().expect("create tempdir");

    let err = entry_for_path(dir.path()).await.expect_err("directory");
    assert!(matches!(err, ClipboardSourceError::NotAFile(_)));

    let err = entry_for_path(&dir.path().join("gone.txt"))
        .await
        .expect_err("missing file");
    assert!(matches!(err, ClipboardSourceError::Stat { .. }));
}
