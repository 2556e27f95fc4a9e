use super::*;

fn temp_dir(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "animstream_{name}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ))
}

#[test]
fn sha256_hex_known_vector() {
    assert_eq!(
        sha256_hex(b"abc"),
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
}

#[test]
fn write_then_verify() {
    let tmp = temp_dir("sidecar_write");
    let blob = tmp.join("_cat_delays.bin");
    let side = tmp.join("_cat_delays.sha256");

    write_with_sidecar(&blob, &side, b"payload").unwrap();
    assert_eq!(std::fs::read(&blob).unwrap(), b"payload");
    assert_eq!(sidecar_present(&side), SidecarStatus::Valid);
    assert_eq!(verify_sidecar(&side, b"payload"), SidecarStatus::Valid);
    assert_eq!(verify_sidecar(&side, b"tampered"), SidecarStatus::Mismatch);
    assert!(!blob.with_extension("bin.tmp").exists());

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn missing_and_empty_sidecars_are_not_valid() {
    let tmp = temp_dir("sidecar_gate");
    std::fs::create_dir_all(&tmp).unwrap();
    let side = tmp.join("x.sha256");

    assert_eq!(sidecar_present(&side), SidecarStatus::Missing);
    std::fs::write(&side, b"").unwrap();
    assert_eq!(sidecar_present(&side), SidecarStatus::Empty);
    assert_eq!(verify_sidecar(&side, b""), SidecarStatus::Empty);

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn concurrent_writers_to_the_same_blob_all_succeed() {
    let tmp = temp_dir("sidecar_concurrent");
    let blob = tmp.join("_cat_delays.bin");
    let side = tmp.join("_cat_delays.sha256");

    std::thread::scope(|s| {
        let handles: Vec<_> = (0..2)
            .map(|_| {
                s.spawn(|| {
                    (0..300)
                        .filter(|_| write_with_sidecar(&blob, &side, b"same table").is_err())
                        .count()
                })
            })
            .collect();
        let errors: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(errors, 0);
    });

    assert_eq!(verify_sidecar(&side, &std::fs::read(&blob).unwrap()), SidecarStatus::Valid);
    let leftovers = std::fs::read_dir(&tmp)
        .unwrap()
        .filter(|e| e.as_ref().unwrap().file_name().to_string_lossy().ends_with(".tmp"))
        .count();
    assert_eq!(leftovers, 0);
    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn declined_commit_leaves_the_target_untouched() {
    let tmp = temp_dir("sidecar_declined");
    let path = tmp.join("frame.png");
    write_atomic(&path, b"newer").unwrap();

    assert!(!write_atomic_if(&path, b"older", || false).unwrap());
    assert_eq!(std::fs::read(&path).unwrap(), b"newer");
    assert_eq!(std::fs::read_dir(&tmp).unwrap().count(), 1);
    std::fs::remove_dir_all(&tmp).ok();
}
