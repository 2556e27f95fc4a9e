use super::*;
use crate::codec::delays::decode_delays;
use crate::codec::preview::decode_preview;
use crate::codec::sidecar::{SidecarStatus, sidecar_present};
use crate::extract::progress::ProgressEvent;
use crate::test_support::{FakeDecoder, temp_dir};
use std::sync::mpsc;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(60);

fn small_opts(batch_size: usize) -> ExtractOpts {
    ExtractOpts {
        batch_size,
        auto_pause_threshold: None,
        ..ExtractOpts::default()
    }
}

#[test]
fn opts_validation() {
    assert!(ExtractOpts::default().validate().is_ok());
    assert!(small_opts(0).validate().is_err());
    let none = ExtractOpts {
        kinds: ArtifactKinds {
            full_frame: false,
            preview: false,
        },
        ..ExtractOpts::default()
    };
    assert!(none.validate().is_err());
}

#[test]
fn extracts_all_kinds_and_persists_metadata() {
    let tmp = temp_dir("coord_basic");
    let source = tmp.join("cat.gif");
    let coord = ExtractionCoordinator::new(Arc::new(FakeDecoder::new(7, 300, 150)));

    let job = coord.start(&source, &tmp, small_opts(3)).unwrap();
    assert_eq!(job.wait(), JobStatus::Completed);

    let layout = ArtifactLayout::for_source(&tmp, &source);
    for i in 0..7 {
        assert!(layout.artifact_path(ArtifactKind::FullFrame, i).is_file());
        let preview = read_artifact(&layout.artifact_path(ArtifactKind::Preview, i)).unwrap();
        assert_eq!((preview.width, preview.height), (120, 60));
    }
    assert_eq!(job.progress(ArtifactKind::FullFrame).current, 7);
    assert!(job.progress(ArtifactKind::Preview).is_done());

    let delays = decode_delays(&std::fs::read(layout.delay_blob()).unwrap()).unwrap();
    assert_eq!(delays, vec![100; 7]);
    assert_eq!(sidecar_present(&layout.delay_sidecar()), SidecarStatus::Valid);

    let bundle = decode_preview(&std::fs::read(layout.preview_blob()).unwrap()).unwrap();
    assert_eq!((bundle.width, bundle.height), (300, 150));
    assert_eq!(bundle.frame_count(), 7);
    assert_eq!(bundle.frames[3].width, 120);

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn large_source_auto_pauses_once_at_threshold() {
    let tmp = temp_dir("coord_autopause");
    let source = tmp.join("big.gif");
    let (tx, rx) = mpsc::channel::<ProgressEvent>();
    let coord = ExtractionCoordinator::new(Arc::new(FakeDecoder::new(1500, 2, 2)))
        .with_sink(Arc::new(tx));
    let opts = ExtractOpts {
        kinds: ArtifactKinds {
            full_frame: true,
            preview: false,
        },
        ..ExtractOpts::default()
    };

    let job = coord.start(&source, &tmp, opts).unwrap();
    assert_eq!(
        job.wait_for(WAIT, |s| s == JobStatus::Paused),
        JobStatus::Paused
    );
    assert!(job.auto_paused());
    assert_eq!(job.progress(ArtifactKind::FullFrame).current, 1000);

    // Manual pause/resume after the threshold does not re-arm the auto-pause.
    assert!(job.resume());
    assert_eq!(job.wait(), JobStatus::Completed);
    assert_eq!(job.progress(ArtifactKind::FullFrame).current, 1500);

    let auto_pauses = rx
        .try_iter()
        .filter(|e| matches!(e, ProgressEvent::Status { auto: true, .. }))
        .count();
    assert_eq!(auto_pauses, 1);

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn rerun_after_auto_pause_cancel_finishes_the_source() {
    let tmp = temp_dir("coord_autopause_rerun");
    let source = tmp.join("big.gif");
    let coord = ExtractionCoordinator::new(Arc::new(FakeDecoder::new(1500, 2, 2)));
    let opts = ExtractOpts {
        kinds: ArtifactKinds {
            full_frame: true,
            preview: false,
        },
        ..ExtractOpts::default()
    };
    let layout = ArtifactLayout::for_source(&tmp, &source);

    let first = coord.start(&source, &tmp, opts.clone()).unwrap();
    assert_eq!(
        first.wait_for(WAIT, |s| s == JobStatus::Paused),
        JobStatus::Paused
    );
    first.cancel();
    assert_eq!(first.wait(), JobStatus::Cancelled);
    let after_first = layout.present_indices(ArtifactKind::FullFrame).unwrap().len();
    assert_eq!(after_first, 1000);

    // Only 500 frames are left to produce, which stays under the threshold.
    let second = coord.start(&source, &tmp, opts).unwrap();
    assert_eq!(second.wait(), JobStatus::Completed);
    assert!(!second.auto_paused());
    assert_eq!(
        layout.present_indices(ArtifactKind::FullFrame).unwrap().len(),
        1500
    );

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn decode_failures_are_skipped() {
    let tmp = temp_dir("coord_skip");
    let source = tmp.join("flaky.gif");
    let coord = ExtractionCoordinator::new(Arc::new(FakeDecoder::new(10, 4, 4).failing([3, 8])));

    let job = coord.start(&source, &tmp, small_opts(4)).unwrap();
    assert_eq!(job.wait(), JobStatus::Completed);

    let layout = ArtifactLayout::for_source(&tmp, &source);
    let present = layout.present_indices(ArtifactKind::FullFrame).unwrap();
    assert_eq!(present.len(), 8);
    assert!(!present.contains(&3) && !present.contains(&8));
    assert_eq!(job.progress(ArtifactKind::FullFrame).current, 10);
    // Incomplete previews mean no bundle.
    assert!(!layout.preview_blob().exists());

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn rerun_skips_existing_and_renames_padded() {
    let tmp = temp_dir("coord_rerun");
    let source = tmp.join("cat.gif");
    let decoder = Arc::new(FakeDecoder::new(12, 4, 4));
    let coord = ExtractionCoordinator::new(decoder.clone());

    assert_eq!(
        coord.start(&source, &tmp, small_opts(5)).unwrap().wait(),
        JobStatus::Completed
    );
    let first = decoder.decode_count();
    assert_eq!(first, 12);

    // Second run: everything present, nothing decoded.
    let job = coord.start(&source, &tmp, small_opts(5)).unwrap();
    assert_eq!(job.wait(), JobStatus::Completed);
    assert_eq!(decoder.decode_count(), first);
    assert!(job.progress(ArtifactKind::FullFrame).is_done());

    // Legacy padded name for one frame, bare one missing.
    let layout = ArtifactLayout::for_source(&tmp, &source);
    let bare = layout.artifact_path(ArtifactKind::FullFrame, 7);
    let padded = layout.kind_dir(ArtifactKind::FullFrame).join("frame.0007");
    std::fs::rename(&bare, &padded).unwrap();
    std::fs::remove_file(layout.artifact_path(ArtifactKind::Preview, 9)).unwrap();

    let job = coord.start(&source, &tmp, small_opts(5)).unwrap();
    assert_eq!(job.wait(), JobStatus::Completed);
    assert!(bare.is_file());
    assert!(!padded.exists());
    // Only frame 9 needed decoding (for its preview).
    assert_eq!(decoder.decode_count(), first + 1);

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn restart_cancels_previous_job() {
    let tmp = temp_dir("coord_restart");
    let a = tmp.join("a.gif");
    let b = tmp.join("b.gif");
    let coord = ExtractionCoordinator::new(Arc::new(FakeDecoder::new(600, 2, 2)));
    let opts = ExtractOpts {
        auto_pause_threshold: None,
        batch_size: 10,
        ..ExtractOpts::default()
    };

    let first = coord.start(&a, &tmp, opts.clone()).unwrap();
    first.pause();
    let second = coord.start(&b, &tmp, opts.clone()).unwrap();
    let third = coord.start(&a, &tmp, opts).unwrap();

    assert_eq!(first.status(), JobStatus::Cancelled);
    assert_eq!(second.status(), JobStatus::Cancelled);
    assert!(!first.is_current() && !second.is_current());
    assert!(third.is_current());
    assert_eq!(coord.active_epoch(), third.epoch());
    assert_eq!(coord.current().unwrap().epoch(), third.epoch());

    let running = [&first, &second, &third]
        .iter()
        .filter(|j| j.status() == JobStatus::Running)
        .count();
    assert!(running <= 1);

    assert_eq!(third.wait(), JobStatus::Completed);
    assert_eq!(first.wait(), JobStatus::Cancelled);
    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn cancel_current_stops_at_batch_boundary() {
    let tmp = temp_dir("coord_cancel");
    let source = tmp.join("cat.gif");
    let coord = ExtractionCoordinator::new(Arc::new(FakeDecoder::new(3000, 2, 2)));

    let job = coord.start(&source, &tmp, small_opts(10)).unwrap();
    job.pause();
    let cancelled = coord.cancel_current().unwrap();
    assert_eq!(cancelled.epoch(), job.epoch());
    assert_eq!(job.wait(), JobStatus::Cancelled);

    coord.shutdown();
    let layout = ArtifactLayout::for_source(&tmp, &source);
    assert!(layout.present_indices(ArtifactKind::FullFrame).unwrap().len() < 3000);

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn open_failure_marks_job_failed() {
    let tmp = temp_dir("coord_fail");
    let coord = ExtractionCoordinator::new(Arc::new(crate::decode::GifFrameDecoder::new()));
    let job = coord
        .start(&tmp.join("missing.gif"), &tmp, ExtractOpts::default())
        .unwrap();
    assert_eq!(job.wait(), JobStatus::Failed);
    assert!(job.error().is_some());
    std::fs::remove_dir_all(&tmp).ok();
}
