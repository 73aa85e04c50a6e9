//! 관측(raw) 이벤트와 최종(consolidated) 이벤트 모델.
//!
//! 관측은 각 관측기(시각 diff, 텍스트 diff, 외부 분류기)가 독립적으로 내보내는
//! 원자 단위이고, 최종 이벤트는 통합 엔진만 생성한다.
//! JSON 필드명(`timestamp`, `eventType`, `value`, `targetElement`, `screenshot`)은
//! 하위 소비자와의 계약이므로 변경하지 않는다.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::CoreError;

/// 클릭 대상 텍스트를 읽지 못했을 때 사용하는 라벨
pub const UNKNOWN_ELEMENT: &str = "Unknown Element";

/// 분류기가 대상 설명을 주지 않았을 때 사용하는 값
pub const NO_DETAIL: &str = "No detail";

// ============================================================
// EventKind
// ============================================================

/// 이벤트 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    Click,
    Type,
    Scroll,
    PageLoad,
    Speak,
    Unknown,
}

impl EventKind {
    /// 직렬화 이름 (예: "PAGE_LOAD")
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Click => "CLICK",
            EventKind::Type => "TYPE",
            EventKind::Scroll => "SCROLL",
            EventKind::PageLoad => "PAGE_LOAD",
            EventKind::Speak => "SPEAK",
            EventKind::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = CoreError;

    /// 대소문자 무시 파싱 ("click", "Type", "page_load" 모두 허용)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CLICK" => Ok(EventKind::Click),
            "TYPE" => Ok(EventKind::Type),
            "SCROLL" => Ok(EventKind::Scroll),
            "PAGE_LOAD" => Ok(EventKind::PageLoad),
            "SPEAK" => Ok(EventKind::Speak),
            "UNKNOWN" => Ok(EventKind::Unknown),
            other => Err(CoreError::Validation {
                field: "eventType".to_string(),
                message: format!("알 수 없는 이벤트 종류: {other}"),
            }),
        }
    }
}

// ============================================================
// BoundingBox
// ============================================================

/// 픽셀 좌표 바운딩 박스 `[x1, y1, x2, y2]`
///
/// 불변식: `x1 <= x2`, `y1 <= y2`. 생성자와 역직렬화 모두 이를 검증한다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "[u32; 4]", into = "[u32; 4]")]
pub struct BoundingBox {
    x1: u32,
    y1: u32,
    x2: u32,
    y2: u32,
}

impl BoundingBox {
    /// 좌표 검증 후 생성
    pub fn new(x1: u32, y1: u32, x2: u32, y2: u32) -> Result<Self, CoreError> {
        if x1 > x2 || y1 > y2 {
            return Err(CoreError::Validation {
                field: "bbox".to_string(),
                message: format!("좌표 역전: [{x1}, {y1}, {x2}, {y2}]"),
            });
        }
        Ok(Self { x1, y1, x2, y2 })
    }

    /// `(cx, cy)` 중심, 반폭 `half` 정사각형을 프레임 경계 안으로 잘라서 생성
    ///
    /// 중심이 프레임 밖이어도 박스는 `[0, width] x [0, height]` 범위를 벗어나지 않는다.
    pub fn centered_square(cx: u32, cy: u32, half: u32, width: u32, height: u32) -> Self {
        let cx = cx.min(width);
        let cy = cy.min(height);
        Self {
            x1: cx.saturating_sub(half),
            y1: cy.saturating_sub(half),
            x2: cx.saturating_add(half).min(width),
            y2: cy.saturating_add(half).min(height),
        }
    }

    pub fn x1(&self) -> u32 {
        self.x1
    }

    pub fn y1(&self) -> u32 {
        self.y1
    }

    pub fn x2(&self) -> u32 {
        self.x2
    }

    pub fn y2(&self) -> u32 {
        self.y2
    }

    /// 중심 좌표 (정수 나눗셈)
    pub fn center(&self) -> (u32, u32) {
        ((self.x1 + self.x2) / 2, (self.y1 + self.y2) / 2)
    }
}

impl TryFrom<[u32; 4]> for BoundingBox {
    type Error = CoreError;

    fn try_from(v: [u32; 4]) -> Result<Self, Self::Error> {
        BoundingBox::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BoundingBox> for [u32; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

/// 클릭 대상 요소 (박스 + 라벨 텍스트)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetElement {
    /// 대상 영역
    pub bbox: BoundingBox,
    /// 라벨 텍스트 (판독 실패 시 [`UNKNOWN_ELEMENT`])
    pub text: String,
}

impl TargetElement {
    /// 라벨이 판독된 텍스트인지 여부
    pub fn has_legible_text(&self) -> bool {
        !self.text.is_empty() && self.text != UNKNOWN_ELEMENT
    }
}

// ============================================================
// Observation
// ============================================================

/// 관측 이벤트: 관측기 하나가 프레임 쌍 하나에서 추론한 결과
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// 세션 시작 기준 초
    pub timestamp: f64,
    /// 이벤트 종류
    #[serde(rename = "eventType")]
    pub kind: EventKind,
    /// 자유 텍스트 (CLICK: 라벨, TYPE: 증분 텍스트 조각, SPEAK: 발화 문장)
    pub value: String,
    /// CLICK 대상 요소
    #[serde(
        rename = "targetElement",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub target_element: Option<TargetElement>,
    /// 관련 프레임 참조 (통합 엔진은 전달만 한다)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<PathBuf>,
}

impl Observation {
    /// 대상 요소/스크린샷 없는 관측 생성
    pub fn new(timestamp: f64, kind: EventKind, value: impl Into<String>) -> Self {
        Self {
            timestamp,
            kind,
            value: value.into(),
            target_element: None,
            screenshot: None,
        }
    }

    /// 대상 요소 지정
    pub fn with_target(mut self, target: TargetElement) -> Self {
        self.target_element = Some(target);
        self
    }

    /// 프레임 참조 지정
    pub fn with_screenshot(mut self, screenshot: impl Into<PathBuf>) -> Self {
        self.screenshot = Some(screenshot.into());
        self
    }
}

// ============================================================
// FinalEvent
// ============================================================

/// 최종 이벤트: 통합 엔진 출력 단위
///
/// 통합 관련 필드(시각, 종류, 값, 대상)는 생성 후 고정된다.
/// 하위 단계가 추가할 수 있는 것은 서술 문장과 스크린샷 경로뿐이다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalEvent {
    timestamp: f64,
    #[serde(rename = "eventType")]
    kind: EventKind,
    value: String,
    #[serde(rename = "targetElement")]
    target_element: Option<TargetElement>,
    screenshot: Option<PathBuf>,
    #[serde(
        rename = "naturalLanguageDescription",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    narrative: Option<String>,
    /// 이 이벤트로 흡수된 관측 수 (로그 계약에는 포함하지 않음)
    #[serde(skip, default = "one")]
    absorbed: usize,
}

fn one() -> usize {
    1
}

impl FinalEvent {
    /// 관측 하나를 그대로 옮긴 최종 이벤트
    pub fn from_observation(obs: &Observation) -> Self {
        Self {
            timestamp: obs.timestamp,
            kind: obs.kind,
            value: obs.value.clone(),
            target_element: obs.target_element.clone(),
            screenshot: obs.screenshot.clone(),
            narrative: None,
            absorbed: 1,
        }
    }

    /// TYPE 블록 병합 결과
    pub fn merged_type(
        timestamp: f64,
        value: String,
        screenshot: Option<PathBuf>,
        absorbed: usize,
    ) -> Self {
        Self {
            timestamp,
            kind: EventKind::Type,
            value,
            target_element: None,
            screenshot,
            narrative: None,
            absorbed,
        }
    }

    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn target_element(&self) -> Option<&TargetElement> {
        self.target_element.as_ref()
    }

    pub fn screenshot(&self) -> Option<&PathBuf> {
        self.screenshot.as_ref()
    }

    pub fn narrative(&self) -> Option<&str> {
        self.narrative.as_deref()
    }

    /// 흡수된 관측 수 (비 TYPE 이벤트는 항상 1)
    pub fn absorbed(&self) -> usize {
        self.absorbed
    }

    /// 서술 문장 부착
    pub fn attach_narrative(&mut self, narrative: String) {
        self.narrative = Some(narrative);
    }

    /// 스크린샷 경로 부착 (출력 디렉토리 기준 상대 경로, 없으면 None)
    pub fn attach_screenshot(&mut self, screenshot: Option<PathBuf>) {
        self.screenshot = screenshot;
    }
}
