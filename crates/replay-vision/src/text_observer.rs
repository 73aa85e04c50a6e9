//! OCR 단어 diff 기반 타이핑 관측기.
//!
//! 샘플 프레임마다 화면 텍스트를 읽고, 직전 텍스트 대비 새로 끼어든 단어 구간을
//! TYPE 관측으로 낸다. 관측기 사이 중복 제거는 통합 엔진이 맡는다.

use std::path::Path;
use tracing::{debug, info, warn};

use replay_core::models::frame::FrameIndex;
use replay_core::models::observation::{EventKind, Observation};
use replay_core::ports::vision::TextRecognizer;

use crate::word_diff::{diff_words, DiffTag};

/// 실행 단위 "직전 인식 텍스트" 상태
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffObserverState {
    previous_text: Option<String>,
}

impl DiffObserverState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn previous_text(&self) -> Option<&str> {
        self.previous_text.as_deref()
    }
}

/// 현재 프레임의 인식 텍스트를 반영하고 TYPE 관측 목록을 돌려준다.
///
/// - 직전 텍스트가 없거나 비어 있으면 비교 대상이 없으므로 관측도 없다.
/// - 삽입 구간 하나당 관측 하나. 같은 간극에 삭제가 함께 있으면 치환(OCR 오독)으로 보고 버린다.
/// - 호출 후 상태의 직전 텍스트는 `current_text`가 된다.
pub fn observe_text(
    state: &mut DiffObserverState,
    current_text: &str,
    timestamp: f64,
    screenshot: &Path,
) -> Vec<Observation> {
    let previous = state.previous_text.replace(current_text.to_string());
    let Some(previous) = previous.filter(|p| !p.trim().is_empty()) else {
        return Vec::new();
    };

    let ops = diff_words(&previous, current_text);
    let mut observations = Vec::new();
    let mut gap_has_delete = false;
    for op in ops {
        match op.tag {
            DiffTag::Equal => gap_has_delete = false,
            DiffTag::Delete => gap_has_delete = true,
            DiffTag::Insert if gap_has_delete => {
                debug!(timestamp, words = op.words.len(), "치환 구간, 타이핑으로 보지 않음");
            }
            DiffTag::Insert => {
                let typed = op.words.join(" ");
                let typed = typed.trim();
                if typed.is_empty() {
                    continue;
                }
                debug!(timestamp, text = %typed, "타이핑 감지");
                observations.push(
                    Observation::new(timestamp, EventKind::Type, typed).with_screenshot(screenshot),
                );
            }
        }
    }
    observations
}

/// `stride`번째 프레임마다 OCR을 돌려 TYPE 관측 목록을 만든다.
///
/// 인식 실패는 빈 텍스트로 취급하므로 다음 프레임은 비교 대상 없이 시작한다.
pub fn detect_typed_text(
    frames: &FrameIndex,
    recognizer: &dyn TextRecognizer,
    stride: usize,
) -> Vec<Observation> {
    let stride = stride.max(1);
    let mut state = DiffObserverState::new();
    let mut observations = Vec::new();

    for frame in frames.frames().iter().step_by(stride) {
        let text = match image::open(&frame.path) {
            Ok(img) => recognizer.recognize_text(&img).unwrap_or_else(|e| {
                warn!(path = %frame.path.display(), error = %e, "프레임 OCR 실패");
                String::new()
            }),
            Err(e) => {
                warn!(path = %frame.path.display(), error = %e, "프레임 읽기 실패");
                String::new()
            }
        };
        observations.extend(observe_text(&mut state, &text, frame.timestamp, &frame.path));
    }

    info!(
        frames = frames.len(),
        stride,
        typed = observations.len(),
        provider = recognizer.provider_name(),
        "타이핑 관측 완료"
    );
    observations
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::DynamicImage;
    use replay_core::error::CoreError;
    use std::sync::Mutex;

    fn shot() -> &'static Path {
        Path::new("frames/frame_0002.jpg")
    }

    #[test]
    fn first_frame_has_nothing_to_diff() {
        let mut state = DiffObserverState::new();
        assert!(observe_text(&mut state, "Login Username", 0.0, shot()).is_empty());
        assert_eq!(state.previous_text(), Some("Login Username"));
    }

    #[test]
    fn empty_previous_text_is_skipped() {
        let mut state = DiffObserverState::new();
        observe_text(&mut state, "   ", 0.0, shot());
        assert!(observe_text(&mut state, "hello", 4.0, shot()).is_empty());
    }

    #[test]
    fn each_insert_run_becomes_one_observation() {
        let mut state = DiffObserverState::new();
        observe_text(&mut state, "Username Password Sign in", 0.0, shot());
        let obs = observe_text(&mut state, "Username alice Password Sign in now", 4.0, shot());

        let values: Vec<&str> = obs.iter().map(|o| o.value.as_str()).collect();
        assert_eq!(values, vec!["alice", "now"]);
        assert!(obs.iter().all(|o| o.kind == EventKind::Type && o.timestamp == 4.0));
        assert_eq!(obs[0].screenshot.as_deref(), Some(shot()));
        assert!(obs[0].target_element.is_none());
    }

    #[test]
    fn newlines_in_inserted_text_are_collapsed() {
        let mut state = DiffObserverState::new();
        observe_text(&mut state, "Notes:", 0.0, shot());
        let obs = observe_text(&mut state, "Notes: buy\nmilk", 4.0, shot());
        assert_eq!(obs.len(), 1);
        assert_eq!(obs[0].value, "buy milk");
    }

    #[test]
    fn replaced_words_are_not_typing() {
        let mut state = DiffObserverState::new();
        observe_text(&mut state, "Total 10 items", 0.0, shot());
        assert!(observe_text(&mut state, "Total 1O items", 4.0, shot()).is_empty());
    }

    #[test]
    fn deletions_emit_nothing() {
        let mut state = DiffObserverState::new();
        observe_text(&mut state, "draft text here", 0.0, shot());
        assert!(observe_text(&mut state, "draft here", 4.0, shot()).is_empty());
    }

    /// 호출 순서대로 미리 정한 텍스트를 돌려주는 인식기
    struct Scripted(Mutex<Vec<Result<String, CoreError>>>);

    impl TextRecognizer for Scripted {
        fn recognize_text(&self, _image: &DynamicImage) -> Result<String, CoreError> {
            self.0.lock().unwrap().remove(0)
        }
        fn provider_name(&self) -> &str {
            "scripted"
        }
    }

    #[test]
    fn runner_uses_stride_and_frame_timestamps() {
        let dir = tempfile::tempdir().unwrap();
        let mut paths = Vec::new();
        for i in 0..5 {
            let path = dir.path().join(format!("frame_{i:04}.png"));
            image::GrayImage::new(4, 4).save(&path).unwrap();
            paths.push(path);
        }
        let frames = FrameIndex::from_uniform(paths, 2.0);

        // stride 2 → 프레임 0, 2, 4만 OCR
        let recognizer = Scripted(Mutex::new(vec![
            Ok("Search".to_string()),
            Ok("Search rust".to_string()),
            Ok("Search rust lang".to_string()),
        ]));
        let obs = detect_typed_text(&frames, &recognizer, 2);
        let got: Vec<(f64, &str)> = obs.iter().map(|o| (o.timestamp, o.value.as_str())).collect();
        assert_eq!(got, vec![(4.0, "rust"), (8.0, "lang")]);
    }

    #[test]
    fn runner_treats_ocr_failure_as_no_text() {
        let dir = tempfile::tempdir().unwrap();
        let mut paths = Vec::new();
        for i in 0..3 {
            let path = dir.path().join(format!("frame_{i:04}.png"));
            image::GrayImage::new(4, 4).save(&path).unwrap();
            paths.push(path);
        }
        let frames = FrameIndex::from_uniform(paths, 2.0);

        let recognizer = Scripted(Mutex::new(vec![
            Ok("Form".to_string()),
            Err(CoreError::OcrError("엔진 오류".to_string())),
            Ok("Form name".to_string()),
        ]));
        assert!(detect_typed_text(&frames, &recognizer, 1).is_empty());
    }
}
