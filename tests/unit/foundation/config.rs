use super::*;

#[test]
fn defaults_match_documented_values() {
    let cfg = DrawingConfig::default();
    assert_eq!(cfg.num_threads, None);
    assert_eq!(cfg.cache_budget_bytes, 64 * 1024 * 1024);
    assert_eq!(cfg.cache_score_threshold, 50_000.0);
    assert_eq!(cfg.worker_wait, WaitStrategy::Yield);
    assert_eq!(cfg.blur_quality, Quality::Best);
}

#[test]
fn json_fills_missing_fields_with_defaults() {
    let cfg = DrawingConfig::from_json_str(
        r#"{ "num_threads": 3, "worker_wait": "block", "filter_quality": "worst" }"#,
    )
    .unwrap();
    assert_eq!(cfg.num_threads, Some(3));
    assert_eq!(cfg.worker_wait, WaitStrategy::Block);
    assert_eq!(cfg.filter_quality, Quality::Worst);
    assert_eq!(cfg.cache_budget_bytes, DrawingConfig::default().cache_budget_bytes);
}

#[test]
fn json_errors_are_config_errors() {
    let err = DrawingConfig::from_json_str("{ not json").unwrap_err();
    assert!(err.to_string().contains("config error:"));

    let err = DrawingConfig::from_json_str(r#"{ "outline_overlay_opacity": 2.0 }"#).unwrap_err();
    assert!(err.to_string().contains("outline_overlay_opacity"));
}

#[test]
fn thread_count_is_clamped_then_bounded_by_hardware() {
    assert_eq!(resolve_thread_count(None, 8), 8);
    assert_eq!(resolve_thread_count(Some(0), 8), 1);
    assert_eq!(resolve_thread_count(Some(-5), 8), 1);
    assert_eq!(resolve_thread_count(Some(4), 8), 4);
    assert_eq!(resolve_thread_count(Some(1000), 8), 8);
    assert_eq!(resolve_thread_count(Some(1000), 512), 256);
    assert_eq!(resolve_thread_count(None, 0), 1);
}

#[test]
fn wait_strategy_parses_case_insensitively() {
    assert_eq!(WaitStrategy::parse(" Block "), Some(WaitStrategy::Block));
    assert_eq!(WaitStrategy::parse("spin"), Some(WaitStrategy::Spin));
    assert_eq!(WaitStrategy::parse("nap"), None);
}

#[test]
fn env_config_falls_back_to_base() {
    let base = DrawingConfig {
        cache_budget_bytes: 1234,
        ..DrawingConfig::default()
    };
    let src = EnvConfig::new(base);
    // Variables are not set in the test environment.
    if std::env::var(ENV_CACHE_BUDGET).is_err() {
        assert_eq!(src.cache_budget(), 1234);
    }
}
