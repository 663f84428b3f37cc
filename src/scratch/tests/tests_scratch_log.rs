use crate::scratch::{ScratchAnchor, ScratchError, ScratchLog};

fn sample_anchors() -> Vec<ScratchAnchor> {
    vec![
        ScratchAnchor {
            chr: 0,
            strand_positive: true,
            pos: 3,
        },
        ScratchAnchor {
            chr: 0,
            strand_positive: false,
            pos: 17,
        },
        ScratchAnchor {
            chr: 1,
            strand_positive: true,
            pos: 0,
        },
    ]
}

#[test]
fn round_trips_via_file_iterator() {
    let dir = tempfile::tempdir().unwrap();
    let mut log = ScratchLog::create(dir.path(), "t1").unwrap();
    for a in sample_anchors() {
        log.append(&a).unwrap();
    }
    log.finish().unwrap();

    let replayed: Vec<_> = log
        .replay_iter()
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(replayed, sample_anchors());
}

#[test]
fn round_trips_via_mmap_iterator() {
    let dir = tempfile::tempdir().unwrap();
    let mut log = ScratchLog::create(dir.path(), "t2").unwrap();
    for a in sample_anchors() {
        log.append(&a).unwrap();
    }
    log.finish().unwrap();

    let replayed: Vec<_> = log
        .mmap_iter()
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(replayed, sample_anchors());
}

#[test]
fn empty_log_replays_to_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let mut log = ScratchLog::create(dir.path(), "empty").unwrap();
    log.finish().unwrap();

    assert!(log.replay_iter().unwrap().next().is_none());
    assert!(log.mmap_iter().unwrap().next().is_none());
}

#[test]
fn corrupted_record_is_detected() {
    let dir = tempfile::tempdir().unwrap();
    let mut log = ScratchLog::create(dir.path(), "corrupt").unwrap();
    log.append(&sample_anchors()[0]).unwrap();
    log.finish().unwrap();

    let path = log.path().to_path_buf();
    drop(log);

    let mut bytes = std::fs::read(&path).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    std::fs::write(&path, &bytes).unwrap();

    let mut reopened = std::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .open(&path)
        .unwrap();
    let _ = reopened.sync_all();

    // Re-derive a ScratchLog-like replay manually isn't possible without
    // a reopen constructor, so exercise the corruption via mmap_iter on a
    // freshly constructed log pointed at the tampered file.
    let log = ScratchLog {
        file: reopened,
        path,
        max_record_size: 64,
    };
    let result: Result<Vec<_>, _> = log.mmap_iter().unwrap().collect();
    assert!(matches!(result, Err(ScratchError::ChecksumMismatch(_))));
}

#[test]
fn remove_deletes_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let log = ScratchLog::create(dir.path(), "gone").unwrap();
    let path = log.path().to_path_buf();
    assert!(path.exists());
    log.remove().unwrap();
    assert!(!path.exists());
}

#[test]
fn normal_sized_record_fits_under_the_default_limit() {
    let dir = tempfile::tempdir().unwrap();
    let mut log = ScratchLog::create(dir.path(), "sized").unwrap();
    assert!(log.append(&sample_anchors()[0]).is_ok());
}
