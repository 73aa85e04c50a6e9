//! 애플리케이션 설정 구조체.
//!
//! 샘플링 간격, 클릭 게이팅/텍스트 diff 파라미터, 타이핑 병합 간격,
//! 외부 AI API, 재시도 정책, 출력 경로 등 런타임 설정을 정의한다.
//! 바이너리에서 `config` crate로 기본값 → 파일 → 환경변수 순으로 겹쳐 로드한다.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::CoreError;

/// 최상위 애플리케이션 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// 프레임 샘플링 설정
    #[serde(default)]
    pub sampling: SamplingConfig,
    /// 비전 관측기 설정
    #[serde(default)]
    pub vision: VisionConfig,
    /// 이벤트 통합 설정
    #[serde(default)]
    pub consolidation: ConsolidationConfig,
    /// AI 제공자 설정 (분류기/전사/리포트)
    #[serde(default)]
    pub ai_provider: AiProviderConfig,
    /// 외부 호출 재시도 정책
    #[serde(default)]
    pub retry: RetryConfig,
    /// 출력 설정
    #[serde(default)]
    pub output: OutputConfig,
}

// ============================================================
// 샘플링 설정
// ============================================================

/// 프레임 샘플링 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// 샘플 간격 (초)
    #[serde(default = "default_seconds_per_sample")]
    pub seconds_per_sample: f64,
    /// 영상 FPS를 알 수 없을 때 사용하는 값
    #[serde(default = "default_fps")]
    pub default_fps: f64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            seconds_per_sample: default_seconds_per_sample(),
            default_fps: default_fps(),
        }
    }
}

// ============================================================
// 비전 설정
// ============================================================

/// 비전 관측기 설정: 클릭 게이팅, 마커 추적, 텍스트 diff
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisionConfig {
    /// SSIM이 이 값 미만이면 "유의미한 변화"
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
    /// 클릭 재발생 억제 시간 (초)
    #[serde(default = "default_click_cooldown_secs")]
    pub click_cooldown_secs: f64,
    /// 마커 템플릿 매칭 최소 점수
    #[serde(default = "default_marker_confidence")]
    pub marker_confidence: f32,
    /// 클릭 박스 반폭 (픽셀)
    #[serde(default = "default_click_box_half_width")]
    pub click_box_half_width: u32,
    /// 클릭 라벨 탐색 반경 (픽셀, 세로는 위/아래 전체, 가로는 절반)
    #[serde(default = "default_label_search_radius")]
    pub label_search_radius: u32,
    /// 텍스트 diff 관측기가 OCR을 돌리는 프레임 간격 (N번째마다)
    #[serde(default = "default_ocr_frame_stride")]
    pub ocr_frame_stride: usize,
    /// 마커(커서) 템플릿 이미지 경로
    #[serde(default)]
    pub marker_template: Option<PathBuf>,
    /// Tesseract 데이터 경로 (None이면 시스템 기본값)
    #[serde(default)]
    pub tessdata_path: Option<PathBuf>,
    /// 클릭 관측기 사용 여부
    #[serde(default = "default_true")]
    pub click_observer_enabled: bool,
    /// 텍스트 diff 관측기 사용 여부
    #[serde(default = "default_true")]
    pub text_observer_enabled: bool,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            click_cooldown_secs: default_click_cooldown_secs(),
            marker_confidence: default_marker_confidence(),
            click_box_half_width: default_click_box_half_width(),
            label_search_radius: default_label_search_radius(),
            ocr_frame_stride: default_ocr_frame_stride(),
            marker_template: None,
            tessdata_path: None,
            click_observer_enabled: true,
            text_observer_enabled: true,
        }
    }
}

// ============================================================
// 통합 설정
// ============================================================

/// 이벤트 통합 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolidationConfig {
    /// 연속 TYPE 관측을 한 블록으로 묶는 최대 간격 (초, 경계 포함)
    #[serde(default = "default_typing_gap_secs")]
    pub typing_gap_secs: f64,
}

impl Default for ConsolidationConfig {
    fn default() -> Self {
        Self {
            typing_gap_secs: default_typing_gap_secs(),
        }
    }
}

// ============================================================
// AI 제공자 설정
// ============================================================

/// AI 제공자 설정: 용도별 외부 API 엔드포인트
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiProviderConfig {
    /// 프레임 쌍 분류 API
    #[serde(default)]
    pub classifier_api: Option<ExternalApiEndpoint>,
    /// 음성 전사 API
    #[serde(default)]
    pub speech_api: Option<ExternalApiEndpoint>,
    /// 리포트 합성 API
    #[serde(default)]
    pub report_api: Option<ExternalApiEndpoint>,
    /// 동시 분류 요청 수
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

impl Default for AiProviderConfig {
    fn default() -> Self {
        Self {
            classifier_api: None,
            speech_api: None,
            report_api: None,
            max_concurrency: default_max_concurrency(),
        }
    }
}

/// AI API 제공자 타입: 요청/응답 형식과 인증 헤더를 결정한다
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AiProviderType {
    /// Google Gemini: `x-goog-api-key` 헤더 + `contents[].parts[]` 형식
    #[default]
    Gemini,
    /// Anthropic Claude API: `x-api-key` 헤더 + `/v1/messages` 형식
    Anthropic,
    /// OpenAI 호환 API: `Authorization: Bearer` 헤더 + `/v1/chat/completions` 형식
    OpenAi,
    /// 기타 제공자: Bearer 인증, 범용 응답 파싱
    Generic,
}

/// 외부 AI API 엔드포인트 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalApiEndpoint {
    /// API URL (예: "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent")
    pub endpoint: String,
    /// API 키 (비어 있으면 `GEMINI_API_KEY` 환경변수 사용)
    #[serde(default)]
    pub api_key: String,
    /// 모델 이름
    #[serde(default)]
    pub model: Option<String>,
    /// 요청 타임아웃 (초)
    #[serde(default = "default_api_timeout_secs")]
    pub timeout_secs: u64,
    /// 제공자 타입
    #[serde(default)]
    pub provider_type: AiProviderType,
}

impl ExternalApiEndpoint {
    /// Gemini 기본 엔드포인트
    pub fn gemini(model: &str, api_key: String) -> Self {
        Self {
            endpoint: format!(
                "https://generativelanguage.googleapis.com/v1beta/models/{model}:generateContent"
            ),
            api_key,
            model: Some(model.to_string()),
            timeout_secs: default_api_timeout_secs(),
            provider_type: AiProviderType::Gemini,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ============================================================
// 재시도 설정
// ============================================================

/// 외부 호출 재시도 정책
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// 총 시도 횟수 (첫 시도 포함)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// 첫 대기 시간 (밀리초), 이후 2배씩 증가
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    /// 대기 시간 상한 (초)
    #[serde(default = "default_max_backoff_secs")]
    pub max_backoff_secs: u64,
    /// 0~1초 무작위 지연 추가
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_secs: default_max_backoff_secs(),
            jitter: true,
        }
    }
}

// ============================================================
// 출력 설정
// ============================================================

/// 출력 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// 실행별 출력 디렉토리의 상위 경로
    #[serde(default = "default_output_base_dir")]
    pub base_dir: PathBuf,
    /// 임시 프레임/오디오 보존 여부
    #[serde(default)]
    pub keep_temp_files: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            base_dir: default_output_base_dir(),
            keep_temp_files: false,
        }
    }
}

// ============================================================
// AppConfig impl
// ============================================================

impl Default for AppConfig {
    fn default() -> Self {
        Self::default_config()
    }
}

impl AppConfig {
    /// 기본 설정값 반환
    pub fn default_config() -> Self {
        Self {
            sampling: SamplingConfig::default(),
            vision: VisionConfig::default(),
            consolidation: ConsolidationConfig::default(),
            ai_provider: AiProviderConfig::default(),
            retry: RetryConfig::default(),
            output: OutputConfig::default(),
        }
    }

    /// 값 범위 검증
    pub fn validate(&self) -> Result<(), CoreError> {
        if !(self.sampling.seconds_per_sample > 0.0) {
            return Err(CoreError::Config(format!(
                "seconds_per_sample은 0보다 커야 함: {}",
                self.sampling.seconds_per_sample
            )));
        }
        if !(self.sampling.default_fps > 0.0) {
            return Err(CoreError::Config(format!(
                "default_fps는 0보다 커야 함: {}",
                self.sampling.default_fps
            )));
        }
        let sim = self.vision.similarity_threshold;
        if !(sim > 0.0 && sim <= 1.0) {
            return Err(CoreError::Config(format!(
                "similarity_threshold는 (0, 1] 범위여야 함: {sim}"
            )));
        }
        if !(self.vision.click_cooldown_secs >= 0.0) {
            return Err(CoreError::Config(format!(
                "click_cooldown_secs는 음수일 수 없음: {}",
                self.vision.click_cooldown_secs
            )));
        }
        if !(self.consolidation.typing_gap_secs >= 0.0) {
            return Err(CoreError::Config(format!(
                "typing_gap_secs는 음수일 수 없음: {}",
                self.consolidation.typing_gap_secs
            )));
        }
        if self.vision.ocr_frame_stride == 0 {
            return Err(CoreError::Config(
                "ocr_frame_stride는 1 이상이어야 함".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(CoreError::Config(
                "retry.max_attempts는 1 이상이어야 함".to_string(),
            ));
        }
        Ok(())
    }

    /// 샘플 간격을 Duration으로 반환
    pub fn sample_interval(&self) -> Duration {
        Duration::from_secs_f64(self.sampling.seconds_per_sample)
    }
}

// ============================================================
// 기본값 함수
// ============================================================

fn default_true() -> bool {
    true
}

fn default_seconds_per_sample() -> f64 {
    2.0
}
fn default_fps() -> f64 {
    25.0
}
fn default_similarity_threshold() -> f64 {
    0.98
}
fn default_click_cooldown_secs() -> f64 {
    2.0
}
fn default_marker_confidence() -> f32 {
    0.6
}
fn default_click_box_half_width() -> u32 {
    10
}
fn default_label_search_radius() -> u32 {
    100
}
fn default_ocr_frame_stride() -> usize {
    2
}
fn default_typing_gap_secs() -> f64 {
    15.0
}
fn default_max_concurrency() -> usize {
    4
}
fn default_api_timeout_secs() -> u64 {
    60
}
fn default_max_attempts() -> u32 {
    5
}
fn default_initial_backoff_ms() -> u64 {
    1_000
}
fn default_max_backoff_secs() -> u64 {
    30
}
fn default_output_base_dir() -> PathBuf {
    PathBuf::from("output")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(AppConfig::default_config().validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let json = r#"{"consolidation": {"typing_gap_secs": 8.5}}"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert!((config.consolidation.typing_gap_secs - 8.5).abs() < f64::EPSILON);
        assert_eq!(config.vision.label_search_radius, 100);
        assert_eq!(config.ai_provider.max_concurrency, 4);
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = AppConfig::default_config();
        config.sampling.seconds_per_sample = 0.0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default_config();
        config.vision.similarity_threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default_config();
        config.vision.ocr_frame_stride = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default_config();
        config.consolidation.typing_gap_secs = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn provider_type_lowercase() {
        let ep: ExternalApiEndpoint = serde_json::from_str(
            r#"{"endpoint": "http://localhost", "provider_type": "openai"}"#,
        )
        .unwrap();
        assert_eq!(ep.provider_type, AiProviderType::OpenAi);
        assert_eq!(ep.timeout_secs, 60);
        assert!(ep.api_key.is_empty());
    }

    #[test]
    fn gemini_endpoint_url() {
        let ep = ExternalApiEndpoint::gemini("gemini-2.5-flash", "k".to_string());
        assert!(ep.endpoint.ends_with("models/gemini-2.5-flash:generateContent"));
        assert_eq!(ep.provider_type, AiProviderType::Gemini);
    }
}
