//! 세션 출력 저장소 포트.
//!
//! 구현: `replay-storage` crate (tokio::fs)

use async_trait::async_trait;
use std::path::PathBuf;

use crate::error::CoreError;
use crate::models::frame::SampledFrame;
use crate::models::observation::{FinalEvent, Observation};

/// 실행 1회 분량의 로그/스크린샷 기록기
#[async_trait]
pub trait SessionLogWriter: Send + Sync {
    /// 통합 전 관측 전체 기록 (감사/디버깅용, 생략 불가)
    async fn write_raw_log(&self, observations: &[Observation]) -> Result<PathBuf, CoreError>;

    /// 최종 이벤트 기록
    async fn write_final_log(&self, events: &[FinalEvent]) -> Result<PathBuf, CoreError>;

    /// 이벤트 대표 프레임을 스크린샷으로 복사하고 출력 디렉토리 기준 상대 경로 반환
    async fn save_screenshot(
        &self,
        event: &FinalEvent,
        frame: &SampledFrame,
    ) -> Result<PathBuf, CoreError>;

    /// 음성 전사 결과 기록
    async fn write_transcription(&self, text: &str) -> Result<PathBuf, CoreError>;

    /// 단계별 안내문 기록
    async fn write_report(&self, text: &str) -> Result<PathBuf, CoreError>;
}
