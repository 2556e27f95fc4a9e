use super::*;
use crate::codec::delays::encode_delays;
use crate::codec::sidecar::write_with_sidecar;
use crate::foundation::naming::ArtifactLayout;
use crate::test_support::{FakeDecoder, temp_dir};

#[test]
fn insert_get_remove() {
    let repo = DelayRepository::new();
    assert!(repo.is_empty());
    repo.insert("a.gif", vec![10, 20]);
    assert_eq!(&*repo.get(Path::new("a.gif")).unwrap(), &[10, 20]);
    assert!(repo.get(Path::new("b.gif")).is_none());
    assert_eq!(repo.len(), 1);
    assert!(repo.remove(Path::new("a.gif")).is_some());
    assert!(repo.is_empty());
}

#[test]
fn sessions_are_isolated() {
    let a = DelayRepository::new();
    let b = DelayRepository::new();
    a.insert("x.gif", vec![1]);
    assert!(b.get(Path::new("x.gif")).is_none());
    a.clear();
    assert!(a.is_empty());
}

#[test]
fn resolve_prefers_memory_then_disk_then_probe() {
    let tmp = temp_dir("delay_repo_resolve");
    let source = tmp.join("cat.gif");
    let decoder = FakeDecoder::new(3, 2, 2);
    let repo = DelayRepository::new();

    // Probe.
    assert_eq!(&*repo.resolve(&source, &tmp, &decoder, false).unwrap(), &[100, 100, 100]);

    // Memory wins over disk.
    let layout = ArtifactLayout::for_source(&tmp, &source);
    write_with_sidecar(
        &layout.delay_blob(),
        &layout.delay_sidecar(),
        &encode_delays(&[40, 50]).unwrap(),
    )
    .unwrap();
    assert_eq!(&*repo.resolve(&source, &tmp, &decoder, false).unwrap(), &[100, 100, 100]);

    // Disk wins over probe.
    repo.clear();
    assert_eq!(&*repo.resolve(&source, &tmp, &decoder, true).unwrap(), &[40, 50]);

    std::fs::remove_dir_all(&tmp).ok();
}
