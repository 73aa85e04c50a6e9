//! 파이프라인 통합 테스트.
//!
//! 가짜 추출기/분류기/인식기/전사기/합성기 + 실제 세션 출력 저장소로
//! 추출 → 관측 → 통합 → 출력 전체 흐름을 검증한다.
//!
//! 가짜 추출기는 i번째 프레임의 빨강 채널을 `i * 40`으로 칠하고,
//! 가짜 협력자들은 그 값으로 프레임 번호를 알아낸다.

use async_trait::async_trait;
use image::{DynamicImage, Rgb, RgbImage};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use replay_app::pipeline::{PipelineConfig, SessionPipeline};
use replay_core::error::CoreError;
use replay_core::models::frame::{ExtractedMedia, FrameIndex};
use replay_core::models::observation::{EventKind, FinalEvent};
use replay_core::models::transcript::{Transcript, NO_AUDIO_TRACK};
use replay_core::ports::classifier::{Classification, FrameAction, FramePairClassifier};
use replay_core::ports::llm_provider::{ReportSynthesizer, SpeechTranscriber};
use replay_core::ports::media::MediaExtractor;
use replay_core::ports::vision::{MarkerTracker, TextRecognizer};
use replay_storage::session_output::{
    SessionOutputStorage, FINAL_LOG_FILE, RAW_LOG_FILE, REPORT_FILE, TRANSCRIPTION_FILE,
};

const SPACING: f64 = 2.0;

// ============================================================
// 가짜 협력자
// ============================================================

fn frame_number(img: &DynamicImage) -> usize {
    let rgb = img.to_rgb8();
    let red = rgb.get_pixel(rgb.width() / 2, rgb.height() / 2)[0];
    ((u32::from(red) + 20) / 40) as usize
}

struct FakeExtractor {
    frames: usize,
    with_audio: bool,
}

#[async_trait]
impl MediaExtractor for FakeExtractor {
    async fn extract(&self, _video: &Path, work_dir: &Path) -> Result<ExtractedMedia, CoreError> {
        let frame_dir = work_dir.join("frames");
        std::fs::create_dir_all(&frame_dir)?;

        let mut paths = Vec::new();
        for i in 0..self.frames {
            // 홀짝 프레임의 밝기를 크게 바꿔 매 쌍이 유의미한 변화가 되게 한다
            let green = if i % 2 == 0 { 0 } else { 255 };
            let img = RgbImage::from_pixel(64, 48, Rgb([(i * 40) as u8, green, 64]));
            let path = frame_dir.join(format!("frame_{i:04}.jpg"));
            img.save(&path)
                .map_err(|e| CoreError::Media(e.to_string()))?;
            paths.push(path);
        }

        let audio = if self.with_audio {
            let path = work_dir.join("audio.wav");
            std::fs::write(&path, b"RIFF0000WAVE")?;
            Some(path)
        } else {
            None
        };

        Ok(ExtractedMedia {
            frames: FrameIndex::from_uniform(paths, SPACING),
            audio,
        })
    }
}

#[derive(Default)]
struct ScriptedClassifier {
    script: HashMap<usize, Classification>,
    fail: bool,
}

impl ScriptedClassifier {
    fn on(mut self, frame: usize, action: FrameAction, target: &str) -> Self {
        self.script.insert(
            frame,
            Classification {
                action,
                target: target.to_string(),
                confidence: "High".to_string(),
            },
        );
        self
    }
}

#[async_trait]
impl FramePairClassifier for ScriptedClassifier {
    async fn classify_frame_pair(
        &self,
        _prev_frame: &[u8],
        curr_frame: &[u8],
    ) -> Result<Option<Classification>, CoreError> {
        if self.fail {
            return Err(CoreError::RateLimit {
                retry_after_secs: 0,
            });
        }
        let img =
            image::load_from_memory(curr_frame).map_err(|e| CoreError::Media(e.to_string()))?;
        Ok(self.script.get(&frame_number(&img)).cloned())
    }

    fn provider_name(&self) -> &str {
        "scripted"
    }
}

/// 프레임 번호별 화면 텍스트
#[derive(Default)]
struct ScriptedRecognizer {
    texts: HashMap<usize, &'static str>,
}

impl TextRecognizer for ScriptedRecognizer {
    fn recognize_text(&self, image: &DynamicImage) -> Result<String, CoreError> {
        Ok(self
            .texts
            .get(&frame_number(image))
            .map(|s| s.to_string())
            .unwrap_or_default())
    }

    fn provider_name(&self) -> &str {
        "scripted"
    }
}

struct FixedLabel(&'static str);

impl TextRecognizer for FixedLabel {
    fn recognize_text(&self, _image: &DynamicImage) -> Result<String, CoreError> {
        Ok(self.0.to_string())
    }

    fn provider_name(&self) -> &str {
        "fixed"
    }
}

struct FixedMarker;

impl MarkerTracker for FixedMarker {
    fn extract_marker_position(&self, _frame: &DynamicImage) -> Option<(u32, u32)> {
        Some((32, 24))
    }
}

struct FixedTranscriber(&'static str);

#[async_trait]
impl SpeechTranscriber for FixedTranscriber {
    async fn transcribe(&self, audio: &[u8], mime_type: &str) -> Result<String, CoreError> {
        assert!(!audio.is_empty());
        assert_eq!(mime_type, "audio/wav");
        Ok(self.0.to_string())
    }

    fn provider_name(&self) -> &str {
        "fixed"
    }
}

#[derive(Default)]
struct RecordingSynthesizer {
    seen: Mutex<Vec<(usize, String)>>,
}

#[async_trait]
impl ReportSynthesizer for RecordingSynthesizer {
    async fn synthesize(
        &self,
        events: &[FinalEvent],
        transcription: &str,
    ) -> Result<String, CoreError> {
        self.seen
            .lock()
            .unwrap()
            .push((events.len(), transcription.to_string()));
        Ok("1. Search for flights.\n2. Click Search.".to_string())
    }

    fn provider_name(&self) -> &str {
        "recording"
    }
}

// ============================================================
// 헬퍼
// ============================================================

struct Harness {
    _dir: TempDir,
    video: PathBuf,
    storage: Arc<SessionOutputStorage>,
}

async fn harness() -> Harness {
    let dir = TempDir::new().unwrap();
    let video = dir.path().join("demo.mp4");
    std::fs::write(&video, b"not really a video").unwrap();
    let storage = Arc::new(
        SessionOutputStorage::create(dir.path().join("out"))
            .await
            .unwrap(),
    );
    Harness {
        _dir: dir,
        video,
        storage,
    }
}

fn observers_off() -> PipelineConfig {
    PipelineConfig {
        click_observer_enabled: false,
        text_observer_enabled: false,
        ..PipelineConfig::default()
    }
}

fn pipeline(
    h: &Harness,
    config: PipelineConfig,
    extractor: FakeExtractor,
    page: ScriptedRecognizer,
) -> SessionPipeline {
    SessionPipeline::new(
        config,
        Arc::new(extractor),
        h.storage.clone(),
        Arc::new(page),
        Arc::new(FixedLabel("Submit")),
    )
}

fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

// ============================================================
// 테스트
// ============================================================

#[tokio::test]
async fn classifier_and_speech_become_consolidated_timeline() {
    let h = harness().await;
    let classifier = ScriptedClassifier::default()
        .on(1, FrameAction::Type, "Typed 'hello'")
        .on(2, FrameAction::Type, "world")
        .on(3, FrameAction::Click, "Search button")
        .on(4, FrameAction::None, "");
    let synthesizer = Arc::new(RecordingSynthesizer::default());

    let summary = pipeline(
        &h,
        observers_off(),
        FakeExtractor {
            frames: 5,
            with_audio: true,
        },
        ScriptedRecognizer::default(),
    )
    .with_classifier(Arc::new(classifier))
    .with_transcriber(Arc::new(FixedTranscriber("I am looking for flights")))
    .with_synthesizer(synthesizer.clone())
    .run(&h.video, &h.storage.temp_dir())
    .await
    .unwrap();

    assert_eq!(summary.raw_count, 4);
    assert_eq!(summary.final_count(), 3);
    assert_eq!(
        summary.transcript,
        Transcript::Spoken("I am looking for flights".to_string())
    );

    let kinds: Vec<EventKind> = summary.events.iter().map(|e| e.kind()).collect();
    assert_eq!(kinds, vec![EventKind::Speak, EventKind::Type, EventKind::Click]);

    let typed = &summary.events[1];
    assert!((typed.timestamp() - 2.0).abs() < f64::EPSILON);
    assert_eq!(typed.value(), "hello world");
    assert_eq!(typed.absorbed(), 2);
    assert_eq!(
        typed.narrative(),
        Some("At 2.00s, the user typed: 'hello world'")
    );
    assert_eq!(
        typed.screenshot(),
        Some(&PathBuf::from("screenshots/event_at_2s_TYPE.jpg"))
    );

    let out = h.storage.output_dir();
    assert!(out.join("screenshots/event_at_0s_SPEAK.jpg").is_file());
    assert!(out.join("screenshots/event_at_6s_CLICK.jpg").is_file());

    let raw = read_json(&out.join(RAW_LOG_FILE));
    assert_eq!(raw.as_array().unwrap().len(), 4);
    let final_log = read_json(&out.join(FINAL_LOG_FILE));
    assert_eq!(final_log[2]["eventType"], "CLICK");
    assert_eq!(final_log[2]["value"], "Search button");
    assert_eq!(
        final_log[2]["naturalLanguageDescription"],
        "At 6.00s, the user clicked the 'Search button' element."
    );

    assert_eq!(
        std::fs::read_to_string(out.join(TRANSCRIPTION_FILE)).unwrap(),
        "I am looking for flights"
    );
    assert!(out.join(REPORT_FILE).is_file());
    assert_eq!(summary.report, Some(out.join(REPORT_FILE)));

    let seen = synthesizer.seen.lock().unwrap();
    assert_eq!(seen.as_slice(), &[(3, "I am looking for flights".to_string())]);
}

#[tokio::test]
async fn degraded_collaborators_still_write_logs() {
    let h = harness().await;
    let classifier = ScriptedClassifier {
        fail: true,
        ..ScriptedClassifier::default()
    };

    let summary = pipeline(
        &h,
        observers_off(),
        FakeExtractor {
            frames: 3,
            with_audio: false,
        },
        ScriptedRecognizer::default(),
    )
    .with_classifier(Arc::new(classifier))
    .with_transcriber(Arc::new(FixedTranscriber("unused")))
    .run(&h.video, &h.storage.temp_dir())
    .await
    .unwrap();

    assert_eq!(summary.raw_count, 0);
    assert_eq!(summary.final_count(), 0);
    assert_eq!(summary.transcript, Transcript::NoAudio);
    assert!(summary.report.is_none());

    let out = h.storage.output_dir();
    assert_eq!(std::fs::read_to_string(out.join(RAW_LOG_FILE)).unwrap(), "[]");
    assert_eq!(std::fs::read_to_string(out.join(FINAL_LOG_FILE)).unwrap(), "[]");
    assert_eq!(
        std::fs::read_to_string(out.join(TRANSCRIPTION_FILE)).unwrap(),
        NO_AUDIO_TRACK
    );
    assert!(!out.join(REPORT_FILE).exists());
}

#[tokio::test]
async fn no_frames_is_fatal() {
    let h = harness().await;
    let result = pipeline(
        &h,
        observers_off(),
        FakeExtractor {
            frames: 0,
            with_audio: true,
        },
        ScriptedRecognizer::default(),
    )
    .run(&h.video, &h.storage.temp_dir())
    .await;

    assert!(matches!(result, Err(CoreError::MissingInput(_))));
    assert!(!h.storage.output_dir().join(FINAL_LOG_FILE).exists());
}

#[tokio::test]
async fn missing_video_is_fatal() {
    let h = harness().await;
    let result = pipeline(
        &h,
        observers_off(),
        FakeExtractor {
            frames: 3,
            with_audio: false,
        },
        ScriptedRecognizer::default(),
    )
    .run(&h.video.with_file_name("missing.mp4"), &h.storage.temp_dir())
    .await;

    assert!(matches!(result, Err(CoreError::MissingInput(_))));
}

#[tokio::test]
async fn click_observer_respects_cooldown() {
    let h = harness().await;
    let config = PipelineConfig {
        click_observer_enabled: true,
        text_observer_enabled: false,
        ..PipelineConfig::default()
    };

    let summary = pipeline(
        &h,
        config,
        FakeExtractor {
            frames: 5,
            with_audio: false,
        },
        ScriptedRecognizer::default(),
    )
    .with_marker(Arc::new(FixedMarker))
    .run(&h.video, &h.storage.temp_dir())
    .await
    .unwrap();

    // t=2 수락, t=4는 경계(2+2)라 거부, t=6 수락, t=8 거부
    let times: Vec<f64> = summary.events.iter().map(|e| e.timestamp()).collect();
    assert_eq!(times, vec![2.0, 6.0]);

    let click = &summary.events[0];
    assert_eq!(click.kind(), EventKind::Click);
    assert_eq!(click.value(), "Potential click detected at (32, 24)");
    let target = click.target_element().unwrap();
    assert_eq!(target.text, "Submit");
    assert_eq!(<[u32; 4]>::from(target.bbox), [22, 14, 42, 34]);
    assert_eq!(
        click.narrative(),
        Some("At 2.00s, the user clicked the 'Submit' element.")
    );
}

#[tokio::test]
async fn click_observer_without_marker_emits_nothing() {
    let h = harness().await;
    let config = PipelineConfig {
        click_observer_enabled: true,
        text_observer_enabled: false,
        ..PipelineConfig::default()
    };

    let summary = pipeline(
        &h,
        config,
        FakeExtractor {
            frames: 4,
            with_audio: false,
        },
        ScriptedRecognizer::default(),
    )
    .run(&h.video, &h.storage.temp_dir())
    .await
    .unwrap();

    assert_eq!(summary.raw_count, 0);
}

#[tokio::test]
async fn text_observer_finds_inserted_words() {
    let h = harness().await;
    let config = PipelineConfig {
        click_observer_enabled: false,
        text_observer_enabled: true,
        ocr_frame_stride: 1,
        ..PipelineConfig::default()
    };
    let page = ScriptedRecognizer {
        texts: HashMap::from([
            (0, "Search"),
            (1, "Search flights"),
            (2, "Search flights"),
            (3, "Search flights to Paris"),
        ]),
    };

    let summary = pipeline(
        &h,
        config,
        FakeExtractor {
            frames: 4,
            with_audio: false,
        },
        page,
    )
    .run(&h.video, &h.storage.temp_dir())
    .await
    .unwrap();

    // 2초와 6초의 조각이 간격 4초라 한 블록으로 합쳐진다
    assert_eq!(summary.raw_count, 2);
    assert_eq!(summary.final_count(), 1);
    let typed = &summary.events[0];
    assert_eq!(typed.kind(), EventKind::Type);
    assert!((typed.timestamp() - 2.0).abs() < f64::EPSILON);
    assert_eq!(typed.value(), "flights to Paris");
}
