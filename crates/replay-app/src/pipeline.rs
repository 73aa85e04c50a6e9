//! 세션 리플레이 파이프라인.
//!
//! 추출 → {분류기, 클릭 관측기, 텍스트 diff 관측기, 음성 전사} → 통합 → 서술 → 스크린샷 → 로그/리포트.
//! 관측 단계는 서로 독립이라 동시에 돌리고, 통합 이후는 순서대로 진행한다.
//! 영상이 없거나 프레임이 하나도 없을 때만 실패하며, 나머지 단계 실패는 경고 후 계속한다.

use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, error, info, warn};

use replay_core::config::AppConfig;
use replay_core::error::CoreError;
use replay_core::models::frame::{FrameIndex, SampledFrame};
use replay_core::models::observation::{FinalEvent, Observation};
use replay_core::models::transcript::Transcript;
use replay_core::ports::classifier::FramePairClassifier;
use replay_core::ports::llm_provider::{ReportSynthesizer, SpeechTranscriber};
use replay_core::ports::media::MediaExtractor;
use replay_core::ports::storage::SessionLogWriter;
use replay_core::ports::vision::{MarkerTracker, TextRecognizer};
use replay_timeline::consolidation::{consolidate, TypingMergePolicy};
use replay_timeline::external_observer::{observation_from_outcome, speech_observation};
use replay_timeline::ingest;
use replay_timeline::narrative::attach_narratives;
use replay_vision::click_observer::{detect_clicks, ClickObserverSettings};
use replay_vision::text_observer::detect_typed_text;

const AUDIO_MIME_TYPE: &str = "audio/wav";

/// 파이프라인 설정
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub click: ClickObserverSettings,
    pub click_observer_enabled: bool,
    pub text_observer_enabled: bool,
    /// 텍스트 diff 관측기 OCR 간격 (N번째 프레임마다)
    pub ocr_frame_stride: usize,
    pub typing: TypingMergePolicy,
    /// 동시 분류 요청 수
    pub max_concurrency: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default_config())
    }
}

impl From<&AppConfig> for PipelineConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            click: ClickObserverSettings::from(&config.vision),
            click_observer_enabled: config.vision.click_observer_enabled,
            text_observer_enabled: config.vision.text_observer_enabled,
            ocr_frame_stride: config.vision.ocr_frame_stride,
            typing: TypingMergePolicy::from(&config.consolidation),
            max_concurrency: config.ai_provider.max_concurrency,
        }
    }
}

/// 실행 결과 요약
#[derive(Debug, Clone)]
pub struct SessionSummary {
    /// 통합 전 관측 수
    pub raw_count: usize,
    /// 최종 이벤트
    pub events: Vec<FinalEvent>,
    pub transcript: Transcript,
    pub raw_log: PathBuf,
    pub final_log: PathBuf,
    /// 안내문 파일 (합성하지 못했으면 None)
    pub report: Option<PathBuf>,
}

impl SessionSummary {
    pub fn final_count(&self) -> usize {
        self.events.len()
    }
}

/// 세션 리플레이 파이프라인
pub struct SessionPipeline {
    config: PipelineConfig,
    extractor: Arc<dyn MediaExtractor>,
    writer: Arc<dyn SessionLogWriter>,
    /// 화면 전체 텍스트 인식 (텍스트 diff 관측기)
    page_recognizer: Arc<dyn TextRecognizer>,
    /// 클릭 라벨 인식 (단일 블록)
    label_recognizer: Arc<dyn TextRecognizer>,
    marker: Option<Arc<dyn MarkerTracker>>,
    classifier: Option<Arc<dyn FramePairClassifier>>,
    transcriber: Option<Arc<dyn SpeechTranscriber>>,
    synthesizer: Option<Arc<dyn ReportSynthesizer>>,
}

impl SessionPipeline {
    pub fn new(
        config: PipelineConfig,
        extractor: Arc<dyn MediaExtractor>,
        writer: Arc<dyn SessionLogWriter>,
        page_recognizer: Arc<dyn TextRecognizer>,
        label_recognizer: Arc<dyn TextRecognizer>,
    ) -> Self {
        Self {
            config,
            extractor,
            writer,
            page_recognizer,
            label_recognizer,
            marker: None,
            classifier: None,
            transcriber: None,
            synthesizer: None,
        }
    }

    pub fn with_marker(mut self, marker: Arc<dyn MarkerTracker>) -> Self {
        self.marker = Some(marker);
        self
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn FramePairClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn with_transcriber(mut self, transcriber: Arc<dyn SpeechTranscriber>) -> Self {
        self.transcriber = Some(transcriber);
        self
    }

    pub fn with_synthesizer(mut self, synthesizer: Arc<dyn ReportSynthesizer>) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    /// 영상 하나를 처리한다. 추출물은 `work_dir` 아래에 만든다.
    pub async fn run(&self, video: &Path, work_dir: &Path) -> Result<SessionSummary, CoreError> {
        if !fs::try_exists(video).await.unwrap_or(false) {
            return Err(CoreError::MissingInput(format!(
                "영상 파일 없음: {}",
                video.display()
            )));
        }

        // ── 1. 추출 ──
        let media = self.extractor.extract(video, work_dir).await?;
        if media.frames.is_empty() {
            return Err(CoreError::MissingInput(format!(
                "추출된 프레임 없음: {}",
                video.display()
            )));
        }
        info!(
            frames = media.frames.len(),
            audio = media.audio.is_some(),
            "미디어 추출 완료"
        );
        let frames = Arc::new(media.frames);

        // ── 2. 관측 (동시 실행) ──
        let (classified, clicks, typed, transcript) = tokio::join!(
            self.classify_pairs(&frames),
            self.observe_clicks(Arc::clone(&frames)),
            self.observe_typed_text(Arc::clone(&frames)),
            self.transcribe(media.audio.as_deref()),
        );

        let mut observations = classified;
        observations.extend(clicks);
        observations.extend(typed);
        if let Some(speech) = transcript.spoken().and_then(speech_observation) {
            observations.push(speech);
        }

        // ── 3. 검증 + 원시 로그 ──
        let observations = match ingest::prepare(observations.clone()) {
            Ok(sorted) => sorted,
            Err(e) => {
                // 감사용으로 정렬 전 목록이라도 남긴다
                self.writer.write_raw_log(&observations).await?;
                return Err(e);
            }
        };
        let raw_log = self.writer.write_raw_log(&observations).await?;

        // ── 4. 통합 + 서술 ──
        let mut events = consolidate(&observations, &self.config.typing);
        attach_narratives(&mut events);

        // ── 5. 스크린샷 ──
        self.attach_screenshots(&mut events, &frames).await;

        // ── 6. 최종 로그, 전사, 리포트 ──
        let final_log = self.writer.write_final_log(&events).await?;
        let transcript_text = transcript.to_string();
        self.writer.write_transcription(&transcript_text).await?;
        let report = self.synthesize_report(&events, &transcript_text).await;

        info!(
            raw = observations.len(),
            final_events = events.len(),
            report = report.is_some(),
            "세션 처리 완료"
        );

        Ok(SessionSummary {
            raw_count: observations.len(),
            events,
            transcript,
            raw_log,
            final_log,
            report,
        })
    }

    // ============================================================
    // 관측 단계
    // ============================================================

    async fn classify_pairs(&self, frames: &FrameIndex) -> Vec<Observation> {
        let Some(classifier) = self.classifier.as_deref() else {
            warn!("프레임 쌍 분류기 미설정, 분류 관측 생략");
            return Vec::new();
        };

        let concurrency = self.config.max_concurrency.max(1);
        let outcomes: Vec<Option<Observation>> = stream::iter(frames.pairs())
            .map(|(prev, curr)| classify_pair(classifier, prev, curr))
            .buffered(concurrency)
            .collect()
            .await;

        let observations: Vec<Observation> = outcomes.into_iter().flatten().collect();
        info!(
            pairs = frames.len().saturating_sub(1),
            observations = observations.len(),
            provider = classifier.provider_name(),
            "프레임 쌍 분류 완료"
        );
        observations
    }

    async fn observe_clicks(&self, frames: Arc<FrameIndex>) -> Vec<Observation> {
        if !self.config.click_observer_enabled {
            debug!("클릭 관측기 비활성");
            return Vec::new();
        }
        let Some(marker) = self.marker.clone() else {
            warn!("마커 템플릿 없음, 클릭 관측 생략");
            return Vec::new();
        };

        let recognizer = Arc::clone(&self.label_recognizer);
        let settings = self.config.click;
        let handle = tokio::task::spawn_blocking(move || {
            detect_clicks(&frames, Some(marker.as_ref()), recognizer.as_ref(), &settings)
        });
        join_observer("click", handle).await
    }

    async fn observe_typed_text(&self, frames: Arc<FrameIndex>) -> Vec<Observation> {
        if !self.config.text_observer_enabled {
            debug!("텍스트 diff 관측기 비활성");
            return Vec::new();
        }

        let recognizer = Arc::clone(&self.page_recognizer);
        let stride = self.config.ocr_frame_stride;
        let handle = tokio::task::spawn_blocking(move || {
            detect_typed_text(&frames, recognizer.as_ref(), stride)
        });
        join_observer("text_diff", handle).await
    }

    async fn transcribe(&self, audio: Option<&Path>) -> Transcript {
        let Some(audio) = audio else {
            warn!("오디오 트랙 없음");
            return Transcript::NoAudio;
        };
        let Some(transcriber) = self.transcriber.as_deref() else {
            warn!("음성 전사 API 미설정");
            return Transcript::NotConfigured;
        };

        let bytes = match fs::read(audio).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(path = %audio.display(), error = %e, "오디오 파일 읽기 실패");
                return Transcript::Failed(e.to_string());
            }
        };

        match transcriber.transcribe(&bytes, AUDIO_MIME_TYPE).await {
            Ok(text) => Transcript::from_text(&text),
            Err(e) => {
                warn!(error = %e, provider = transcriber.provider_name(), "음성 전사 실패");
                Transcript::Failed(e.to_string())
            }
        }
    }

    // ============================================================
    // 후처리 단계
    // ============================================================

    /// 이벤트마다 대표 프레임을 복사해 스크린샷 경로를 붙인다.
    ///
    /// 이벤트 자신의 프레임 참조가 우선이고, 없으면 해당 시각에 보이던 프레임을 쓴다.
    async fn attach_screenshots(&self, events: &mut [FinalEvent], frames: &FrameIndex) {
        for event in events.iter_mut() {
            let frame = event
                .screenshot()
                .and_then(|path| frames.frames().iter().find(|f| &f.path == path))
                .or_else(|| frames.frame_at(event.timestamp()))
                .cloned();

            let relative = match frame {
                Some(frame) => match self.writer.save_screenshot(event, &frame).await {
                    Ok(relative) => Some(relative),
                    Err(e) => {
                        warn!(timestamp = event.timestamp(), error = %e, "스크린샷 저장 실패");
                        None
                    }
                },
                None => None,
            };
            event.attach_screenshot(relative);
        }
    }

    async fn synthesize_report(&self, events: &[FinalEvent], transcription: &str) -> Option<PathBuf> {
        let Some(synthesizer) = self.synthesizer.as_deref() else {
            warn!("리포트 합성 API 미설정, 안내문 생략");
            return None;
        };

        let report = match synthesizer.synthesize(events, transcription).await {
            Ok(report) => report,
            Err(e) => {
                error!(error = %e, provider = synthesizer.provider_name(), "리포트 합성 실패");
                return None;
            }
        };

        match self.writer.write_report(&report).await {
            Ok(path) => Some(path),
            Err(e) => {
                error!(error = %e, "안내문 저장 실패");
                None
            }
        }
    }
}

/// 프레임 쌍 하나 분류. 읽기/분류 실패는 NONE과 같다.
async fn classify_pair(
    classifier: &dyn FramePairClassifier,
    prev: &SampledFrame,
    curr: &SampledFrame,
) -> Option<Observation> {
    let (prev_bytes, curr_bytes) = match tokio::try_join!(fs::read(&prev.path), fs::read(&curr.path))
    {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(timestamp = curr.timestamp, error = %e, "프레임 읽기 실패");
            return None;
        }
    };

    match classifier.classify_frame_pair(&prev_bytes, &curr_bytes).await {
        Ok(outcome) => observation_from_outcome(outcome.as_ref(), curr),
        Err(e) => {
            warn!(timestamp = curr.timestamp, error = %e, "프레임 쌍 분류 실패, NONE으로 처리");
            None
        }
    }
}

async fn join_observer(
    name: &str,
    handle: tokio::task::JoinHandle<Vec<Observation>>,
) -> Vec<Observation> {
    match handle.await {
        Ok(observations) => observations,
        Err(e) => {
            error!(observer = name, error = %e, "관측기 태스크 실패");
            Vec::new()
        }
    }
}
