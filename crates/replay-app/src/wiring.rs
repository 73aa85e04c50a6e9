//! 설정 → 어댑터 조립.
//!
//! 선택 협력자(마커 템플릿, 분류기, 전사기, 리포트 합성기)는 만들 수 없으면
//! 경고만 남기고 빠진 채로 파이프라인을 구성한다.

use std::sync::Arc;
use tracing::warn;

use replay_core::config::AppConfig;
use replay_core::ports::storage::SessionLogWriter;
use replay_network::ai_classifier_client::RemoteFramePairClassifier;
use replay_network::ai_report_client::RemoteReportSynthesizer;
use replay_network::ai_speech_client::RemoteSpeechTranscriber;
use replay_network::retry::RetryPolicy;
use replay_vision::extractor::FfmpegExtractor;
use replay_vision::marker::TemplateMarkerTracker;
use replay_vision::recognizer::TesseractRecognizer;

use crate::pipeline::{PipelineConfig, SessionPipeline};

/// 설정대로 어댑터를 만들어 파이프라인 조립
pub fn build_pipeline(config: &AppConfig, writer: Arc<dyn SessionLogWriter>) -> SessionPipeline {
    let vision = &config.vision;
    if !TesseractRecognizer::is_available() {
        warn!("ocr 기능 없이 빌드됨, 클릭 라벨과 텍스트 diff 관측이 비어 있게 된다");
    }

    let mut pipeline = SessionPipeline::new(
        PipelineConfig::from(config),
        Arc::new(FfmpegExtractor::new(&config.sampling)),
        writer,
        Arc::new(TesseractRecognizer::new(vision.tessdata_path.clone())),
        Arc::new(TesseractRecognizer::single_block(vision.tessdata_path.clone())),
    );

    match &vision.marker_template {
        Some(path) => match TemplateMarkerTracker::from_path(path, vision.marker_confidence) {
            Ok(tracker) => pipeline = pipeline.with_marker(Arc::new(tracker)),
            Err(e) => warn!(path = %path.display(), error = %e, "마커 템플릿 로드 실패"),
        },
        None => warn!("마커 템플릿 미지정"),
    }

    let retry = RetryPolicy::from(&config.retry);
    let ai = &config.ai_provider;

    if let Some(endpoint) = &ai.classifier_api {
        match RemoteFramePairClassifier::new(endpoint, retry.clone()) {
            Ok(classifier) => pipeline = pipeline.with_classifier(Arc::new(classifier)),
            Err(e) => warn!(error = %e, "프레임 쌍 분류기 생성 실패"),
        }
    }
    if let Some(endpoint) = &ai.speech_api {
        match RemoteSpeechTranscriber::new(endpoint, retry.clone()) {
            Ok(transcriber) => pipeline = pipeline.with_transcriber(Arc::new(transcriber)),
            Err(e) => warn!(error = %e, "음성 전사기 생성 실패"),
        }
    }
    if let Some(endpoint) = &ai.report_api {
        match RemoteReportSynthesizer::new(endpoint, retry) {
            Ok(synthesizer) => pipeline = pipeline.with_synthesizer(Arc::new(synthesizer)),
            Err(e) => warn!(error = %e, "리포트 합성기 생성 실패"),
        }
    }

    pipeline
}
