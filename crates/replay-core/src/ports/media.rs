//! 미디어 추출 포트.
//!
//! 구현: `replay-vision::extractor` (ffmpeg/ffprobe 프로세스)

use async_trait::async_trait;
use std::path::Path;

use crate::error::CoreError;
use crate::models::frame::ExtractedMedia;

/// 영상 → 샘플 프레임 + 오디오 추출기
#[async_trait]
pub trait MediaExtractor: Send + Sync {
    /// `video`에서 프레임과 오디오를 `work_dir` 아래로 추출한다.
    ///
    /// 오디오 트랙이 없으면 `audio = None`으로 성공한다.
    async fn extract(&self, video: &Path, work_dir: &Path) -> Result<ExtractedMedia, CoreError>;
}
