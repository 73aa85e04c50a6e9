//! 외부 멀티모달 모델 기반 프레임 쌍 분류기.
//!
//! BEFORE/AFTER 두 프레임을 보내 사용자 행동 하나를 JSON으로 받는다.
//! 응답을 해석할 수 없으면 `Ok(None)`이고, 재시도 소진은 `Err`다.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use replay_core::config::ExternalApiEndpoint;
use replay_core::error::CoreError;
use replay_core::ports::classifier::{Classification, FramePairClassifier, FrameAction};

use crate::ai_common::{extract_json_object, AiHttpClient, ContentPart};
use crate::retry::RetryPolicy;

/// 모델 미지정 시 기본값
pub const DEFAULT_CLASSIFIER_MODEL: &str = "gemini-2.5-flash";

const MAX_OUTPUT_TOKENS: u32 = 512;

const CLASSIFIER_PROMPT: &str = r#"You are an expert UI/UX session replay analyst. Your task is to analyze two sequential screenshots and identify the single, direct user action that occurred.

**Primary Objective:** Focus ONLY on actions directly caused by the user's cursor or keyboard. Ignore automated changes like loading spinners, ads appearing, or content refreshing as a result of a previous action.

**Analysis Steps:**
1. Compare the 'BEFORE' and 'AFTER' frames.
2. Identify the most likely user action: `CLICK`, `TYPE`, `SCROLL`, `PAGE_LOAD`, or `NONE`.
3. A `PAGE_LOAD` occurs when the entire screen layout changes drastically, indicating navigation.
4. For a `CLICK`, describe the element clicked by its visible text label (e.g., 'Search button', 'User profile link').
5. For a `TYPE` action, provide only the new characters that were added.

**Output Format:** Respond ONLY with a single, minified JSON object. Do not use markdown.
{
  "action": "CLICK" | "TYPE" | "SCROLL" | "PAGE_LOAD" | "NONE",
  "target": "For a CLICK, this is the text on the element (e.g., 'Apply Filters'). For TYPE, this is the text that was added.",
  "confidence": "High" | "Medium" | "Low"
}"#;

/// 모델 응답 원형 (대소문자·형식이 느슨하다)
#[derive(Debug, Deserialize)]
struct RawClassification {
    #[serde(default)]
    action: String,
    #[serde(default)]
    target: Option<String>,
    #[serde(default)]
    confidence: Option<serde_json::Value>,
}

// ============================================================
// RemoteFramePairClassifier
// ============================================================

/// 외부 API 프레임 쌍 분류기: `FramePairClassifier` 포트 구현
#[derive(Debug)]
pub struct RemoteFramePairClassifier {
    client: AiHttpClient,
}

impl RemoteFramePairClassifier {
    pub fn new(config: &ExternalApiEndpoint, retry: RetryPolicy) -> Result<Self, CoreError> {
        Ok(Self {
            client: AiHttpClient::new(config, DEFAULT_CLASSIFIER_MODEL, retry)?,
        })
    }

    fn build_parts(prev_frame: &[u8], curr_frame: &[u8]) -> Vec<ContentPart> {
        vec![
            ContentPart::text(CLASSIFIER_PROMPT),
            ContentPart::text("---"),
            ContentPart::text("BEFORE:"),
            ContentPart::inline("image/jpeg", prev_frame),
            ContentPart::text("AFTER:"),
            ContentPart::inline("image/jpeg", curr_frame),
        ]
    }

    /// 응답 텍스트 → 분류 결과. 해석 불가는 `None`.
    fn parse_classification(text: &str) -> Option<Classification> {
        let json_str = extract_json_object(text)?;
        let raw: RawClassification = match serde_json::from_str(json_str) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, raw = %json_str.chars().take(200).collect::<String>(), "분류 응답 JSON 해석 실패");
                return None;
            }
        };

        let action: FrameAction = match raw.action.parse() {
            Ok(action) => action,
            Err(e) => {
                warn!(error = %e, "분류 응답의 행동 값 해석 실패");
                return None;
            }
        };

        let confidence = match raw.confidence {
            Some(serde_json::Value::String(s)) => s,
            Some(other) => other.to_string(),
            None => String::new(),
        };

        Some(Classification {
            action,
            target: raw.target.unwrap_or_default(),
            confidence,
        })
    }
}

#[async_trait]
impl FramePairClassifier for RemoteFramePairClassifier {
    async fn classify_frame_pair(
        &self,
        prev_frame: &[u8],
        curr_frame: &[u8],
    ) -> Result<Option<Classification>, CoreError> {
        let parts = Self::build_parts(prev_frame, curr_frame);
        let text = self
            .client
            .generate("classify_frame_pair", &parts, MAX_OUTPUT_TOKENS)
            .await?;

        let classification = Self::parse_classification(&text);
        debug!(
            action = ?classification.as_ref().map(|c| c.action),
            confidence = ?classification.as_ref().map(|c| c.confidence.as_str()),
            "프레임 쌍 분류 완료"
        );
        Ok(classification)
    }

    fn provider_name(&self) -> &str {
        self.client.model()
    }
}

// ============================================================
// 테스트
// ============================================================
