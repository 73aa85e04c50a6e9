//! ffmpeg 기반 프레임/오디오 추출기.
//!
//! 1. `ffprobe`로 영상 프레임레이트 조회 (실패 시 기본값)
//! 2. `ffmpeg select` 필터로 첫 프레임과 이후 `floor(fps × 간격)`번째 프레임마다 JPEG 저장
//! 3. 16kHz 모노 PCM WAV로 오디오 추출. 오디오 트랙이 없으면 `None`

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info, warn};

use replay_core::config::SamplingConfig;
use replay_core::error::CoreError;
use replay_core::models::frame::{ExtractedMedia, FrameIndex};
use replay_core::ports::media::MediaExtractor;

/// 추출 프레임 파일명 접두사
const FRAME_PREFIX: &str = "frame_";

/// ffmpeg가 오디오 스트림 부재를 알릴 때 쓰는 문구들
const NO_AUDIO_MARKERS: [&str; 2] = ["does not contain any stream", "matches no streams"];

/// ffmpeg 기반 `MediaExtractor` 구현
pub struct FfmpegExtractor {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    seconds_per_sample: f64,
    default_fps: f64,
}

impl FfmpegExtractor {
    /// PATH의 `ffmpeg`/`ffprobe` 사용
    pub fn new(sampling: &SamplingConfig) -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
            seconds_per_sample: sampling.seconds_per_sample,
            default_fps: sampling.default_fps,
        }
    }

    /// 바이너리 경로 지정
    pub fn with_binaries(mut self, ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        self.ffmpeg = ffmpeg.into();
        self.ffprobe = ffprobe.into();
        self
    }

    /// ffmpeg 실행 가능 여부 확인
    async fn ensure_ffmpeg(&self) -> Result<(), CoreError> {
        match Command::new(&self.ffmpeg).arg("-version").output().await {
            Ok(output) if output.status.success() => Ok(()),
            Ok(output) => Err(CoreError::Media(format!(
                "ffmpeg 실행 실패: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ))),
            Err(e) => Err(CoreError::MissingInput(format!(
                "ffmpeg를 찾을 수 없음 ({}): {e}",
                self.ffmpeg.display()
            ))),
        }
    }

    /// 영상 프레임레이트 조회. 조회 실패나 0이면 기본값.
    async fn probe_fps(&self, video: &Path) -> f64 {
        let output = Command::new(&self.ffprobe)
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=avg_frame_rate",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(video)
            .output()
            .await;

        let probed = match output {
            Ok(o) if o.status.success() => parse_frame_rate(&String::from_utf8_lossy(&o.stdout)),
            Ok(o) => {
                debug!(stderr = %String::from_utf8_lossy(&o.stderr).trim(), "ffprobe 실패");
                None
            }
            Err(e) => {
                debug!(error = %e, "ffprobe 실행 불가");
                None
            }
        };

        probed.unwrap_or_else(|| {
            warn!(default_fps = self.default_fps, "프레임레이트 확인 불가, 기본값 사용");
            self.default_fps
        })
    }

    async fn extract_frames(&self, video: &Path, frame_dir: &Path) -> Result<FrameIndex, CoreError> {
        tokio::fs::create_dir_all(frame_dir).await?;

        let fps = self.probe_fps(video).await;
        let interval = frame_interval(fps, self.seconds_per_sample);
        let pattern = frame_dir.join(format!("{FRAME_PREFIX}%04d.jpg"));
        let select = format!("select=not(mod(n\\,{interval}))");

        let output = Command::new(&self.ffmpeg)
            .args(["-hide_banner", "-loglevel", "error", "-y", "-i"])
            .arg(video)
            .args([
                "-vf",
                select.as_str(),
                "-vsync",
                "vfr",
                "-q:v",
                "2",
                "-start_number",
                "0",
            ])
            .arg(&pattern)
            .output()
            .await?;

        if !output.status.success() {
            return Err(CoreError::Media(format!(
                "프레임 추출 실패: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let paths = collect_frame_paths(frame_dir).await?;
        info!(
            fps,
            interval,
            frames = paths.len(),
            seconds_per_sample = self.seconds_per_sample,
            "프레임 추출 완료"
        );
        Ok(FrameIndex::from_source_sampling(paths, interval, fps))
    }

    /// 오디오 추출. 트랙이 없거나 실패하면 `None` (파이프라인은 계속)
    async fn extract_audio(&self, video: &Path, work_dir: &Path) -> Option<PathBuf> {
        let audio_path = work_dir.join("audio.wav");
        let output = Command::new(&self.ffmpeg)
            .arg("-i")
            .arg(video)
            .args(["-y", "-vn", "-acodec", "pcm_s16le", "-ar", "16000", "-ac", "1"])
            .arg(&audio_path)
            .output()
            .await;

        match output {
            Ok(o) if o.status.success() => {
                info!(path = %audio_path.display(), "오디오 추출 완료");
                Some(audio_path)
            }
            Ok(o) => {
                let stderr = String::from_utf8_lossy(&o.stderr);
                if is_missing_audio_stream(&stderr) {
                    info!("영상에 오디오 트랙 없음");
                } else {
                    warn!(stderr = %stderr.trim(), "오디오 추출 실패");
                }
                None
            }
            Err(e) => {
                warn!(error = %e, "오디오 추출 실행 불가");
                None
            }
        }
    }
}

#[async_trait]
impl MediaExtractor for FfmpegExtractor {
    async fn extract(&self, video: &Path, work_dir: &Path) -> Result<ExtractedMedia, CoreError> {
        if !tokio::fs::try_exists(video).await.unwrap_or(false) {
            return Err(CoreError::MissingInput(format!(
                "영상 파일 없음: {}",
                video.display()
            )));
        }
        self.ensure_ffmpeg().await?;

        let frames = self.extract_frames(video, &work_dir.join("frames")).await?;
        if frames.is_empty() {
            return Err(CoreError::MissingInput(format!(
                "추출된 프레임 없음: {}",
                video.display()
            )));
        }

        let audio = self.extract_audio(video, work_dir).await;
        Ok(ExtractedMedia { frames, audio })
    }
}

// ============================================================
// 순수 헬퍼
// ============================================================

/// ffprobe 프레임레이트 출력 파싱 (`"30000/1001"`, `"25"`). 0이나 해석 불가는 `None`.
pub fn parse_frame_rate(raw: &str) -> Option<f64> {
    let raw = raw.lines().next()?.trim();
    let fps = match raw.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => raw.parse().ok()?,
    };
    (fps.is_finite() && fps > 0.0).then_some(fps)
}

/// 샘플 사이 원본 프레임 수 `floor(fps × 간격)`, 최소 1
pub fn frame_interval(fps: f64, seconds_per_sample: f64) -> u64 {
    let interval = (fps * seconds_per_sample).floor();
    if interval.is_finite() && interval >= 1.0 {
        interval as u64
    } else {
        1
    }
}

/// ffmpeg stderr가 "오디오 스트림 없음"을 뜻하는지
pub fn is_missing_audio_stream(stderr: &str) -> bool {
    NO_AUDIO_MARKERS.iter().any(|m| stderr.contains(m))
}

/// `frame_XXXX.jpg` 파일을 이름순으로 수집
pub async fn collect_frame_paths(frame_dir: &Path) -> Result<Vec<PathBuf>, CoreError> {
    let mut entries = tokio::fs::read_dir(frame_dir).await?;
    let mut paths = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_frame = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(FRAME_PREFIX) && n.ends_with(".jpg"));
        if is_frame {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}
