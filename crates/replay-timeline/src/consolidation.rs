//! 이벤트 통합 엔진.
//!
//! 정렬된 관측 목록을 한 번 훑으면서 연속 TYPE 관측을 블록으로 묶는다.
//!
//! - TYPE이 아닌 관측은 그대로 최종 이벤트 하나가 된다.
//! - TYPE 블록은 다음 관측이 TYPE이고 *직전 흡수 관측*과의 간격이
//!   임계값 이하(경계 포함)인 동안 계속 자란다. 블록 시작점 기준이 아니므로
//!   느린 타이핑은 임계값보다 훨씬 긴 구간을 하나로 묶을 수 있다.
//! - 블록을 끊은 관측은 소비하지 않고 다음 스캔 위치가 된다.
//!
//! 상태는 스캔 커서와 현재 블록뿐이며 호출 사이에 남지 않는다. O(n), 역추적 없음.

use replay_core::config::ConsolidationConfig;
use replay_core::error::CoreError;
use replay_core::models::observation::{EventKind, FinalEvent, Observation};
use tracing::{debug, info};

use crate::ingest;

/// 기본 타이핑 간격 임계값 (초)
pub const DEFAULT_TYPING_GAP_SECS: f64 = 15.0;

/// TYPE 블록 병합 정책
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TypingMergePolicy {
    /// 인접 TYPE 관측 간 최대 간격 (초, 이 값과 같으면 병합)
    pub gap_threshold_secs: f64,
}

impl Default for TypingMergePolicy {
    fn default() -> Self {
        Self {
            gap_threshold_secs: DEFAULT_TYPING_GAP_SECS,
        }
    }
}

impl From<&ConsolidationConfig> for TypingMergePolicy {
    fn from(config: &ConsolidationConfig) -> Self {
        Self {
            gap_threshold_secs: config.typing_gap_secs,
        }
    }
}

impl TypingMergePolicy {
    fn continues_block(&self, last: &Observation, next: &Observation) -> bool {
        next.kind == EventKind::Type && next.timestamp - last.timestamp <= self.gap_threshold_secs
    }
}

/// 검증/정렬 후 통합
///
/// 형식 오류가 있으면 스캔을 시작하지 않고 에러를 반환한다.
pub fn consolidate_batch(
    observations: Vec<Observation>,
    policy: &TypingMergePolicy,
) -> Result<Vec<FinalEvent>, CoreError> {
    let sorted = ingest::prepare(observations)?;
    Ok(consolidate(&sorted, policy))
}

/// 정렬된 관측 목록 통합
///
/// 입력은 timestamp 비내림차순이어야 한다 ([`ingest::prepare`] 결과).
pub fn consolidate(observations: &[Observation], policy: &TypingMergePolicy) -> Vec<FinalEvent> {
    let mut events = Vec::with_capacity(observations.len());
    let mut merged_blocks = 0usize;
    let mut i = 0;

    while i < observations.len() {
        let current = &observations[i];

        if current.kind != EventKind::Type {
            events.push(FinalEvent::from_observation(current));
            i += 1;
            continue;
        }

        // TYPE 블록: [i, end)
        let mut end = i + 1;
        while end < observations.len()
            && policy.continues_block(&observations[end - 1], &observations[end])
        {
            end += 1;
        }

        let block = &observations[i..end];
        events.push(merge_type_block(block));
        if block.len() > 1 {
            merged_blocks += 1;
            debug!(
                start = block[0].timestamp,
                end = block[block.len() - 1].timestamp,
                fragments = block.len(),
                "TYPE 블록 병합"
            );
        }
        i = end;
    }

    info!(
        raw = observations.len(),
        final_events = events.len(),
        merged_blocks,
        "이벤트 통합 완료"
    );
    events
}

/// TYPE 블록 하나를 최종 이벤트로 병합
///
/// - timestamp: 첫 관측
/// - value: 조각을 한 칸 공백으로 이어 붙이고 이중 공백 제거 후 trim
/// - screenshot: 마지막 관측 (최종 입력 상태에 가장 가까운 화면)
fn merge_type_block(block: &[Observation]) -> FinalEvent {
    let first = &block[0];
    let last = &block[block.len() - 1];
    let value = join_fragments(block.iter().map(|o| o.value.as_str()));
    FinalEvent::merged_type(first.timestamp, value, last.screenshot.clone(), block.len())
}

fn join_fragments<'a>(fragments: impl Iterator<Item = &'a str>) -> String {
    let mut joined = fragments.collect::<Vec<_>>().join(" ");
    while joined.contains("  ") {
        joined = joined.replace("  ", " ");
    }
    joined.trim().to_string()
}
