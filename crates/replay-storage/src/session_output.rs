//! 실행별 세션 출력 디렉토리.
//!
//! 구조: `<base_dir>/<영상 이름>_<YYYYmmdd_HHMMSS>/`
//! - `raw_llm_events.json`: 통합 전 관측 전체
//! - `final_session_log.json`: 최종 이벤트
//! - `screenshots/event_at_{t}s_{KIND}.jpg`
//! - `audio_transcription.txt`, `step_by_step_instructions.txt`
//! - `temp/`: 추출 프레임과 오디오 (실행 끝에 삭제)

use async_trait::async_trait;
use chrono::{DateTime, TimeZone};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

use replay_core::error::CoreError;
use replay_core::models::frame::SampledFrame;
use replay_core::models::observation::{FinalEvent, Observation};
use replay_core::ports::storage::SessionLogWriter;

pub const RAW_LOG_FILE: &str = "raw_llm_events.json";
pub const FINAL_LOG_FILE: &str = "final_session_log.json";
pub const TRANSCRIPTION_FILE: &str = "audio_transcription.txt";
pub const REPORT_FILE: &str = "step_by_step_instructions.txt";
pub const SCREENSHOTS_DIR: &str = "screenshots";
pub const TEMP_DIR: &str = "temp";

/// 세션 출력 저장소: `SessionLogWriter` 포트 구현
#[derive(Debug, Clone)]
pub struct SessionOutputStorage {
    output_dir: PathBuf,
}

impl SessionOutputStorage {
    /// 출력 디렉토리와 `screenshots/`, `temp/` 하위 폴더 생성
    pub async fn create(output_dir: PathBuf) -> Result<Self, CoreError> {
        for dir in [
            output_dir.clone(),
            output_dir.join(SCREENSHOTS_DIR),
            output_dir.join(TEMP_DIR),
        ] {
            fs::create_dir_all(&dir).await.map_err(|e| {
                CoreError::Internal(format!("출력 디렉토리 생성 실패 ({}): {e}", dir.display()))
            })?;
        }

        info!(output_dir = %output_dir.display(), "세션 출력 디렉토리 준비");
        Ok(Self { output_dir })
    }

    /// `<base_dir>/<영상 파일 이름(확장자 제외)>_<YYYYmmdd_HHMMSS>`
    pub fn output_dir_for<Tz>(base_dir: &Path, video: &Path, now: DateTime<Tz>) -> PathBuf
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        let stem = video
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "session".to_string());
        base_dir.join(format!("{stem}_{}", now.format("%Y%m%d_%H%M%S")))
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// 추출 작업 디렉토리
    pub fn temp_dir(&self) -> PathBuf {
        self.output_dir.join(TEMP_DIR)
    }

    /// `temp/` 삭제. 이미 없으면 아무것도 하지 않는다.
    pub async fn cleanup_temp(&self) -> Result<(), CoreError> {
        let temp = self.temp_dir();
        match fs::remove_dir_all(&temp).await {
            Ok(()) => {
                info!(path = %temp.display(), "임시 파일 정리 완료");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CoreError::Internal(format!("임시 디렉토리 삭제 실패: {e}"))),
        }
    }

    /// 이벤트 스크린샷 파일 이름 (timestamp와 종류로 결정)
    pub fn screenshot_file_name(event: &FinalEvent) -> String {
        format!(
            "event_at_{:.0}s_{}.jpg",
            event.timestamp(),
            event.kind().as_str()
        )
    }

    async fn write_json<T: Serialize + ?Sized>(
        &self,
        file_name: &str,
        value: &T,
    ) -> Result<PathBuf, CoreError> {
        let bytes = to_pretty_json(value)?;
        let path = self.output_dir.join(file_name);
        fs::write(&path, &bytes)
            .await
            .map_err(|e| CoreError::Internal(format!("{file_name} 저장 실패: {e}")))?;
        debug!(path = %path.display(), bytes = bytes.len(), "JSON 저장");
        Ok(path)
    }

    async fn write_text(&self, file_name: &str, text: &str) -> Result<PathBuf, CoreError> {
        let path = self.output_dir.join(file_name);
        fs::write(&path, text)
            .await
            .map_err(|e| CoreError::Internal(format!("{file_name} 저장 실패: {e}")))?;
        Ok(path)
    }
}

/// 4칸 들여쓰기 JSON
fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CoreError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    Ok(buf)
}

#[async_trait]
impl SessionLogWriter for SessionOutputStorage {
    async fn write_raw_log(&self, observations: &[Observation]) -> Result<PathBuf, CoreError> {
        let path = self.write_json(RAW_LOG_FILE, observations).await?;
        info!(count = observations.len(), path = %path.display(), "원시 관측 로그 저장");
        Ok(path)
    }

    async fn write_final_log(&self, events: &[FinalEvent]) -> Result<PathBuf, CoreError> {
        let path = self.write_json(FINAL_LOG_FILE, events).await?;
        info!(count = events.len(), path = %path.display(), "최종 세션 로그 저장");
        Ok(path)
    }

    async fn save_screenshot(
        &self,
        event: &FinalEvent,
        frame: &SampledFrame,
    ) -> Result<PathBuf, CoreError> {
        if !fs::try_exists(&frame.path).await.unwrap_or(false) {
            return Err(CoreError::NotFound {
                resource_type: "Frame".to_string(),
                id: frame.path.display().to_string(),
            });
        }

        let file_name = Self::screenshot_file_name(event);
        let relative = PathBuf::from(SCREENSHOTS_DIR).join(&file_name);
        fs::copy(&frame.path, self.output_dir.join(&relative))
            .await
            .map_err(|e| CoreError::Internal(format!("스크린샷 복사 실패: {e}")))?;

        debug!(
            timestamp = event.timestamp(),
            kind = %event.kind(),
            frame = frame.index,
            "스크린샷 저장"
        );
        Ok(relative)
    }

    async fn write_transcription(&self, text: &str) -> Result<PathBuf, CoreError> {
        self.write_text(TRANSCRIPTION_FILE, text).await
    }

    async fn write_report(&self, text: &str) -> Result<PathBuf, CoreError> {
        if text.trim().is_empty() {
            warn!("빈 리포트 저장");
        }
        self.write_text(REPORT_FILE, text).await
    }
}

// ============================================================
// 테스트
// ============================================================
