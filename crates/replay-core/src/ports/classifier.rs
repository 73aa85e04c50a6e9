//! 프레임 쌍 분류기 포트.
//!
//! 연속된 두 프레임을 외부 멀티모달 모델에 보내 사용자 행동 하나를 추론한다.
//! 결과는 신뢰할 수 없는 신호로 취급되며 통합 엔진이 정리한다.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::models::observation::EventKind;

/// 분류기가 추론한 행동
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FrameAction {
    Click,
    Type,
    Scroll,
    PageLoad,
    None,
}

impl FrameAction {
    /// 관측 이벤트 종류로 변환 (`None`은 관측을 만들지 않음)
    pub fn event_kind(&self) -> Option<EventKind> {
        match self {
            FrameAction::Click => Some(EventKind::Click),
            FrameAction::Type => Some(EventKind::Type),
            FrameAction::Scroll => Some(EventKind::Scroll),
            FrameAction::PageLoad => Some(EventKind::PageLoad),
            FrameAction::None => None,
        }
    }
}

impl fmt::Display for FrameAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FrameAction::Click => "CLICK",
            FrameAction::Type => "TYPE",
            FrameAction::Scroll => "SCROLL",
            FrameAction::PageLoad => "PAGE_LOAD",
            FrameAction::None => "NONE",
        };
        f.write_str(s)
    }
}

impl FromStr for FrameAction {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace(' ', "_").as_str() {
            "CLICK" => Ok(FrameAction::Click),
            "TYPE" => Ok(FrameAction::Type),
            "SCROLL" => Ok(FrameAction::Scroll),
            "PAGE_LOAD" | "PAGELOAD" => Ok(FrameAction::PageLoad),
            "NONE" | "" => Ok(FrameAction::None),
            other => Err(CoreError::Validation {
                field: "action".to_string(),
                message: format!("알 수 없는 행동: {other}"),
            }),
        }
    }
}

/// 프레임 쌍 분류 결과
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// 추론된 행동
    pub action: FrameAction,
    /// 대상 설명 (CLICK: 요소 라벨, TYPE: 입력된 텍스트)
    #[serde(default)]
    pub target: String,
    /// 모델이 보고한 신뢰도 ("High" | "Medium" | "Low")
    #[serde(default)]
    pub confidence: String,
}

/// 프레임 쌍 분류기
///
/// 구현체: `RemoteFramePairClassifier` (Gemini / Claude / OpenAI 호환 API)
#[async_trait]
pub trait FramePairClassifier: Send + Sync {
    /// 이전/현재 프레임(JPEG 바이트)에서 행동 하나를 추론한다.
    ///
    /// - `Ok(Some(_))`: 분류 성공
    /// - `Ok(None)`: 응답은 받았으나 해석 불가 (null)
    /// - `Err(_)`: 재시도 소진 후에도 호출 실패
    async fn classify_frame_pair(
        &self,
        prev_frame: &[u8],
        curr_frame: &[u8],
    ) -> Result<Option<Classification>, CoreError>;

    /// 제공자 이름 (예: 모델명)
    fn provider_name(&self) -> &str;
}
