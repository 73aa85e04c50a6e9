//! 설정 및 어댑터 조립 통합 테스트.
//!
//! AppConfig → 파이프라인 설정/어댑터 생성 검증.

use std::path::PathBuf;
use std::sync::Arc;

use replay_app::pipeline::PipelineConfig;
use replay_app::settings::{resolve_api_keys, CliOverrides};
use replay_app::wiring::build_pipeline;
use replay_core::config::{AiProviderType, AppConfig, ExternalApiEndpoint};
use replay_network::retry::RetryPolicy;
use replay_storage::session_output::SessionOutputStorage;
use replay_timeline::consolidation::TypingMergePolicy;
use replay_vision::click_observer::ClickObserverSettings;

#[test]
fn config_defaults_are_valid() {
    let config = AppConfig::default_config();
    config.validate().unwrap();

    assert!(config.sampling.seconds_per_sample > 0.0);
    assert!(config.vision.marker_template.is_none());
    assert!(config.ai_provider.classifier_api.is_none());
    assert_eq!(config.ai_provider.max_concurrency, 4);
    assert_eq!(config.output.base_dir, PathBuf::from("output"));
}

#[test]
fn pipeline_config_follows_app_config() {
    let mut config = AppConfig::default_config();
    config.vision.click_cooldown_secs = 3.0;
    config.vision.ocr_frame_stride = 5;
    config.consolidation.typing_gap_secs = 8.0;

    let pipeline = PipelineConfig::from(&config);
    assert_eq!(
        pipeline.click,
        ClickObserverSettings {
            similarity_threshold: 0.98,
            cooldown_secs: 3.0,
            box_half_width: 10,
            label_search_radius: 100,
        }
    );
    assert_eq!(
        pipeline.typing,
        TypingMergePolicy {
            gap_threshold_secs: 8.0
        }
    );
    assert_eq!(pipeline.ocr_frame_stride, 5);
    assert!(pipeline.click_observer_enabled && pipeline.text_observer_enabled);
}

#[test]
fn retry_policy_from_config() {
    let config = AppConfig::default_config();
    let policy = RetryPolicy::from(&config.retry);
    assert_eq!(policy.max_attempts, 5);
    assert_eq!(policy.initial_backoff.as_millis(), 1000);
    assert_eq!(policy.max_backoff.as_secs(), 30);
}

#[test]
fn cli_flags_disable_observers() {
    let mut config = AppConfig::default_config();
    resolve_api_keys(&mut config, Some("key".to_string()));
    assert!(config.ai_provider.classifier_api.is_some());

    CliOverrides {
        no_classifier: true,
        no_text_observer: true,
        keep_temp_files: true,
        marker_template: Some(PathBuf::from("cursor.png")),
        ..CliOverrides::default()
    }
    .apply(&mut config);

    assert!(config.ai_provider.classifier_api.is_none());
    assert!(config.ai_provider.speech_api.is_some());
    assert!(!config.vision.text_observer_enabled);
    assert!(config.output.keep_temp_files);
    assert_eq!(config.vision.marker_template, Some(PathBuf::from("cursor.png")));
}

#[tokio::test]
async fn all_adapters_instantiate_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(
        SessionOutputStorage::create(dir.path().join("run"))
            .await
            .unwrap(),
    );

    let mut config = AppConfig::default_config();
    // 없는 템플릿과 키 없는 엔드포인트는 경고 후 빠진다
    config.vision.marker_template = Some(dir.path().join("missing.png"));
    config.ai_provider.classifier_api = Some(ExternalApiEndpoint {
        endpoint: "http://localhost:1/classify".to_string(),
        api_key: String::new(),
        model: None,
        timeout_secs: 1,
        provider_type: AiProviderType::Generic,
    });
    config.ai_provider.speech_api = Some(ExternalApiEndpoint::gemini("m", "k".to_string()));

    let _pipeline = build_pipeline(&config, storage);
}

#[test]
fn config_serde_roundtrip() {
    let mut config = AppConfig::default_config();
    config.ai_provider.report_api = Some(ExternalApiEndpoint::gemini("m", "k".to_string()));

    let json = serde_json::to_string(&config).unwrap();
    let deserialized: AppConfig = serde_json::from_str(&json).unwrap();

    assert_eq!(
        deserialized.vision.similarity_threshold,
        config.vision.similarity_threshold
    );
    let report = deserialized.ai_provider.report_api.unwrap();
    assert_eq!(report.provider_type, AiProviderType::Gemini);
    assert_eq!(report.api_key, "k");
}

#[test]
fn partial_config_json_uses_defaults() {
    let config: AppConfig =
        serde_json::from_str(r#"{ "vision": { "click_cooldown_secs": 1.5 } }"#).unwrap();
    assert!((config.vision.click_cooldown_secs - 1.5).abs() < f64::EPSILON);
    assert!((config.vision.similarity_threshold - 0.98).abs() < f64::EPSILON);
    assert!((config.consolidation.typing_gap_secs - 15.0).abs() < f64::EPSILON);
}
