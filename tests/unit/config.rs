use super::*;
use std::time::Duration;

#[test]
fn empty_object_is_all_defaults() {
    let cfg = PipelineConfig::from_json_str("{}").unwrap();
    assert_eq!(cfg, PipelineConfig::default());
    assert_eq!(cfg.extract.batch_size, 100);
    assert_eq!(cfg.extract.max_preview_dim, 120);
    assert_eq!(cfg.extract.auto_pause_threshold, Some(1000));
    assert_eq!(cfg.preload.capacity, 20);
    assert!(!cfg.verify_disk_cache);
}

#[test]
fn partial_overrides() {
    let cfg = PipelineConfig::from_json_str(
        r#"{
            "verify_disk_cache": true,
            "work_dir": "/tmp/anim",
            "extract": { "batch_size": 25, "auto_pause_threshold": null },
            "preload": { "focus_retry": 500, "threads": 3 }
        }"#,
    )
    .unwrap();
    assert!(cfg.verify_disk_cache);
    assert_eq!(cfg.work_dir.as_deref(), Some(Path::new("/tmp/anim")));
    assert_eq!(cfg.extract.batch_size, 25);
    assert_eq!(cfg.extract.auto_pause_threshold, None);
    assert_eq!(cfg.extract.max_preview_dim, 120);
    assert_eq!(cfg.preload.focus_retry, Duration::from_millis(500));
    assert_eq!(cfg.preload.window_retry, Duration::from_secs(1));
    assert_eq!(cfg.preload.threads, Some(3));
}

#[test]
fn round_trips_through_json() {
    let mut cfg = PipelineConfig::default();
    cfg.extract.kinds.preview = false;
    cfg.preload.capacity = 64;
    let s = cfg.to_json_pretty().unwrap();
    assert_eq!(PipelineConfig::from_json_str(&s).unwrap(), cfg);
}

#[test]
fn malformed_and_invalid_configs() {
    assert!(matches!(
        PipelineConfig::from_json_str("{ not json"),
        Err(AnimstreamError::ConfigParse(_))
    ));
    assert!(matches!(
        PipelineConfig::from_json_str(r#"{"extract": {"batch_size": 0}}"#),
        Err(AnimstreamError::Validation(_))
    ));
    assert!(matches!(
        PipelineConfig::from_path("/definitely/not/here.json"),
        Err(AnimstreamError::Io { .. })
    ));
}
