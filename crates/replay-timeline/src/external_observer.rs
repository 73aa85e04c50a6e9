//! 외부 협력자 결과 → 관측 변환.
//!
//! 분류기 경계 어댑터. 분류기가 어떤 형태로 TYPE 대상을 돌려주든
//! 여기서 증분 조각으로 정규화하므로 통합 엔진은 패턴 매칭을 하지 않는다.

use replay_core::models::frame::SampledFrame;
use replay_core::models::observation::{EventKind, Observation, NO_DETAIL};
use replay_core::ports::classifier::{Classification, FrameAction};
use tracing::trace;

use crate::typed_text::{extract_incremental_fragment, normalize_whitespace};

/// 분류 결과 하나를 관측으로 변환
///
/// - `NONE`은 관측을 만들지 않는다.
/// - timestamp와 스크린샷 참조는 AFTER 프레임 기준이다.
/// - TYPE 대상은 증분 조각으로 정규화하고, 그 외 종류는 빈 대상을 `"No detail"`로 채운다.
pub fn observation_from_classification(
    classification: &Classification,
    after_frame: &SampledFrame,
) -> Option<Observation> {
    let kind = match classification.action.event_kind() {
        Some(kind) => kind,
        None => {
            trace!(timestamp = after_frame.timestamp, "분류 결과 NONE, 관측 없음");
            return None;
        }
    };

    let value = match kind {
        EventKind::Type => extract_incremental_fragment(&classification.target),
        _ => {
            let target = normalize_whitespace(&classification.target);
            if target.is_empty() {
                NO_DETAIL.to_string()
            } else {
                target
            }
        }
    };

    Some(Observation::new(after_frame.timestamp, kind, value).with_screenshot(&after_frame.path))
}

/// 분류 실패(재시도 소진)나 null 응답은 NONE과 같게 취급한다
pub fn observation_from_outcome(
    outcome: Option<&Classification>,
    after_frame: &SampledFrame,
) -> Option<Observation> {
    match outcome {
        Some(c) if c.action != FrameAction::None => {
            observation_from_classification(c, after_frame)
        }
        _ => None,
    }
}

/// 음성 전사 결과를 세션 시작 시점의 SPEAK 관측으로 변환
///
/// 내레이션은 녹화 시작부터 이어진다고 본다. 빈 전사는 관측을 만들지 않는다.
pub fn speech_observation(transcript: &str) -> Option<Observation> {
    let text = transcript.trim();
    if text.is_empty() {
        return None;
    }
    Some(Observation::new(0.0, EventKind::Speak, text))
}
