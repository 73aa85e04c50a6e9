//! 샘플 프레임 모델.
//!
//! 영상에서 일정 간격으로 추출한 프레임과, 추출 시점에 한 번 만들어서
//! 하위 단계로 넘기는 timestamp → 프레임 매핑을 정의한다.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 샘플링된 프레임 하나
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampledFrame {
    /// 샘플 순번 (0부터)
    pub index: usize,
    /// 세션 시작 기준 초
    pub timestamp: f64,
    /// 디스크상의 이미지 경로
    pub path: PathBuf,
}

/// timestamp → 프레임 매핑
///
/// 프레임은 timestamp 오름차순으로 보관된다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameIndex {
    frames: Vec<SampledFrame>,
}

impl FrameIndex {
    /// 프레임 목록으로 생성 (timestamp 기준 안정 정렬)
    pub fn new(mut frames: Vec<SampledFrame>) -> Self {
        frames.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        Self { frames }
    }

    /// 균일 간격 프레임 경로 목록으로 생성 (i번째 프레임 = i × spacing 초)
    pub fn from_uniform(paths: Vec<PathBuf>, seconds_per_sample: f64) -> Self {
        let frames = paths
            .into_iter()
            .enumerate()
            .map(|(index, path)| SampledFrame {
                index,
                timestamp: index as f64 * seconds_per_sample,
                path,
            })
            .collect();
        Self { frames }
    }

    /// 원본 프레임 `interval`개마다 하나씩 뽑은 경로 목록으로 생성
    ///
    /// i번째 샘플은 원본 프레임 `i × interval`이므로 timestamp는 `i × interval / fps`.
    /// fps가 유효하지 않으면 원본 1프레임 = 1초로 본다.
    pub fn from_source_sampling(paths: Vec<PathBuf>, interval: u64, fps: f64) -> Self {
        let fps = if fps.is_finite() && fps > 0.0 { fps } else { 1.0 };
        let interval = interval.max(1) as f64;
        let frames = paths
            .into_iter()
            .enumerate()
            .map(|(index, path)| SampledFrame {
                index,
                timestamp: index as f64 * interval / fps,
                path,
            })
            .collect();
        Self { frames }
    }

    pub fn frames(&self) -> &[SampledFrame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// 주어진 시각에 화면에 보이던 프레임 (해당 시각 이하 중 가장 늦은 프레임)
    pub fn frame_at(&self, timestamp: f64) -> Option<&SampledFrame> {
        let upper = self.frames.partition_point(|f| f.timestamp <= timestamp);
        upper.checked_sub(1).and_then(|i| self.frames.get(i))
    }

    /// 연속 프레임 쌍 (이전, 현재)
    pub fn pairs(&self) -> impl Iterator<Item = (&SampledFrame, &SampledFrame)> {
        self.frames.windows(2).map(|w| (&w[0], &w[1]))
    }
}

/// 추출 단계 결과물
#[derive(Debug, Clone, Default)]
pub struct ExtractedMedia {
    /// 샘플 프레임 매핑
    pub frames: FrameIndex,
    /// 추출된 오디오 (WAV, 오디오 트랙이 없으면 None)
    pub audio: Option<PathBuf>,
}
