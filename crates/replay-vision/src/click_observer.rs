//! 변화 게이팅 클릭 관측기.
//!
//! 연속 프레임 쌍에서 최대 한 개의 CLICK 관측을 만든다. 조건은 세 가지가 모두 성립할 때다:
//! SSIM 기준 유의미한 변화, 추적된 마커 위치, 쿨다운 경과 (`t > last + cooldown`).
//! 쿨다운 상태는 실행마다 새로 만드는 [`ClickGateState`]가 들고 다닌다.

use image::{DynamicImage, GenericImageView, GrayImage, Luma};
use std::path::Path;
use tracing::{debug, info, trace, warn};

use replay_core::config::VisionConfig;
use replay_core::models::frame::FrameIndex;
use replay_core::models::observation::{
    BoundingBox, EventKind, Observation, TargetElement, UNKNOWN_ELEMENT,
};
use replay_core::ports::vision::{MarkerTracker, TextRecognizer};

use crate::similarity::is_significant_change;

// ============================================================
// 쿨다운 상태
// ============================================================

/// 마지막으로 채택한 클릭 시각. 채택 시에만 갱신되고 감소하지 않는다.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClickGateState {
    last_accepted_timestamp: f64,
}

impl ClickGateState {
    /// 첫 클릭이 억제되지 않도록 `-cooldown`에서 시작
    pub fn new(cooldown_secs: f64) -> Self {
        Self {
            last_accepted_timestamp: -cooldown_secs,
        }
    }

    /// 지정한 시각에 클릭이 이미 채택된 상태
    pub fn with_last_accepted(timestamp: f64) -> Self {
        Self {
            last_accepted_timestamp: timestamp,
        }
    }

    pub fn last_accepted_timestamp(&self) -> f64 {
        self.last_accepted_timestamp
    }

    /// 쿨다운 밖인지 (경계값은 거부)
    pub fn admits(&self, timestamp: f64, cooldown_secs: f64) -> bool {
        timestamp > self.last_accepted_timestamp + cooldown_secs
    }

    fn accept(&mut self, timestamp: f64) {
        if timestamp > self.last_accepted_timestamp {
            self.last_accepted_timestamp = timestamp;
        }
    }
}

// ============================================================
// 설정
// ============================================================

/// 클릭 관측기 파라미터
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClickObserverSettings {
    /// 이 값 미만 SSIM이면 유의미한 변화
    pub similarity_threshold: f64,
    pub cooldown_secs: f64,
    /// 클릭 bbox 반폭 (px)
    pub box_half_width: u32,
    /// 라벨 OCR 영역 반경 (세로 ±r, 가로 ±r/2)
    pub label_search_radius: u32,
}

impl Default for ClickObserverSettings {
    fn default() -> Self {
        Self::from(&VisionConfig::default())
    }
}

impl From<&VisionConfig> for ClickObserverSettings {
    fn from(config: &VisionConfig) -> Self {
        Self {
            similarity_threshold: config.similarity_threshold,
            cooldown_secs: config.click_cooldown_secs,
            box_half_width: config.click_box_half_width,
            label_search_radius: config.label_search_radius,
        }
    }
}

// ============================================================
// 프레임 쌍 단위 관측
// ============================================================

/// 프레임 쌍 하나를 평가한다.
///
/// `marker`는 현재 프레임에서 추적한 마커 위치이고, 라벨은 이전 프레임(클릭 직전 화면)에서 읽는다.
/// 게이트에 걸린 후보는 에러가 아니며 trace 로그만 남긴다.
#[allow(clippy::too_many_arguments)]
pub fn observe_click(
    state: &mut ClickGateState,
    settings: &ClickObserverSettings,
    prev: &DynamicImage,
    curr: &DynamicImage,
    timestamp: f64,
    marker: Option<(u32, u32)>,
    recognizer: &dyn TextRecognizer,
    screenshot: &Path,
) -> Option<Observation> {
    if !is_significant_change(prev, curr, settings.similarity_threshold) {
        return None;
    }

    let Some((mx, my)) = marker else {
        trace!(timestamp, "변화 감지, 마커 없음, 클릭 후보 제외");
        return None;
    };

    if !state.admits(timestamp, settings.cooldown_secs) {
        trace!(
            timestamp,
            last_accepted = state.last_accepted_timestamp(),
            "변화 감지, 쿨다운 중, 클릭 후보 제외"
        );
        return None;
    }

    state.accept(timestamp);

    let (width, height) = curr.dimensions();
    let bbox = BoundingBox::centered_square(mx, my, settings.box_half_width, width, height);
    let label = identify_label(prev, (mx, my), settings.label_search_radius, recognizer);

    debug!(timestamp, x = mx, y = my, label = %label, "클릭 감지");

    Some(
        Observation::new(
            timestamp,
            EventKind::Click,
            format!("Potential click detected at ({mx}, {my})"),
        )
        .with_target(TargetElement { bbox, text: label })
        .with_screenshot(screenshot),
    )
}

/// 마커 주변 영역 OCR로 라벨을 읽는다. 실패하거나 읽을 글자가 없으면 `"Unknown Element"`.
pub fn identify_label(
    frame: &DynamicImage,
    (x, y): (u32, u32),
    radius: u32,
    recognizer: &dyn TextRecognizer,
) -> String {
    let (w, h) = frame.dimensions();
    let x0 = x.saturating_sub(radius / 2);
    let y0 = y.saturating_sub(radius);
    let x1 = x.saturating_add(radius / 2).min(w);
    let y1 = y.saturating_add(radius).min(h);
    if x1 <= x0 || y1 <= y0 {
        return UNKNOWN_ELEMENT.to_string();
    }

    let roi = frame.crop_imm(x0, y0, x1 - x0, y1 - y0).to_luma8();
    let binary = DynamicImage::ImageLuma8(binarize_inverted(&roi));

    match recognizer.recognize_text(&binary) {
        Ok(text) => {
            let cleaned = clean_label(&text);
            if cleaned.is_empty() {
                UNKNOWN_ELEMENT.to_string()
            } else {
                cleaned
            }
        }
        Err(e) => {
            warn!(error = %e, "클릭 라벨 OCR 실패");
            UNKNOWN_ELEMENT.to_string()
        }
    }
}

/// 영숫자만 남기고 단어 사이는 공백 하나로 둔다
fn clean_label(text: &str) -> String {
    text.split_whitespace()
        .map(|word| word.chars().filter(|c| c.is_alphanumeric()).collect::<String>())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Otsu 임계값으로 이진화하고 반전 (어두운 글자 → 흰색)
fn binarize_inverted(gray: &GrayImage) -> GrayImage {
    let threshold = otsu_threshold(gray);
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        if gray.get_pixel(x, y)[0] > threshold {
            Luma([0])
        } else {
            Luma([255])
        }
    })
}

/// 클래스 간 분산을 최대화하는 밝기 임계값
fn otsu_threshold(gray: &GrayImage) -> u8 {
    let mut histogram = [0u64; 256];
    for p in gray.pixels() {
        histogram[p[0] as usize] += 1;
    }

    let total = f64::from(gray.width()) * f64::from(gray.height());
    let sum_all: f64 = histogram
        .iter()
        .enumerate()
        .map(|(v, &n)| v as f64 * n as f64)
        .sum();

    let (mut weight_bg, mut sum_bg) = (0.0, 0.0);
    let (mut best_threshold, mut best_variance) = (0u8, -1.0);
    for (value, &count) in histogram.iter().enumerate() {
        weight_bg += count as f64;
        if weight_bg == 0.0 {
            continue;
        }
        let weight_fg = total - weight_bg;
        if weight_fg == 0.0 {
            break;
        }
        sum_bg += value as f64 * count as f64;
        let mean_bg = sum_bg / weight_bg;
        let mean_fg = (sum_all - sum_bg) / weight_fg;
        let variance = weight_bg * weight_fg * (mean_bg - mean_fg).powi(2);
        if variance > best_variance {
            best_variance = variance;
            best_threshold = value as u8;
        }
    }
    best_threshold
}

// ============================================================
// 실행 단위 러너
// ============================================================

/// 추출된 프레임 전체를 순서대로 훑어 CLICK 관측 목록을 만든다.
///
/// 읽을 수 없는 프레임은 건너뛰고, 다음 프레임은 마지막으로 읽은 프레임과 비교한다.
/// `tracker`가 없으면 마커가 항상 미확인이므로 클릭도 나오지 않는다.
pub fn detect_clicks(
    frames: &FrameIndex,
    tracker: Option<&dyn MarkerTracker>,
    recognizer: &dyn TextRecognizer,
    settings: &ClickObserverSettings,
) -> Vec<Observation> {
    let mut state = ClickGateState::new(settings.cooldown_secs);
    let mut observations = Vec::new();
    let mut prev: Option<DynamicImage> = None;

    for frame in frames.frames() {
        let curr = match image::open(&frame.path) {
            Ok(img) => img,
            Err(e) => {
                warn!(path = %frame.path.display(), error = %e, "프레임 읽기 실패, 건너뜀");
                continue;
            }
        };

        if let Some(prev_img) = prev.as_ref() {
            let marker = tracker.and_then(|t| t.extract_marker_position(&curr));
            if let Some(obs) = observe_click(
                &mut state,
                settings,
                prev_img,
                &curr,
                frame.timestamp,
                marker,
                recognizer,
                &frame.path,
            ) {
                observations.push(obs);
            }
        }

        prev = Some(curr);
    }

    info!(
        frames = frames.len(),
        clicks = observations.len(),
        "클릭 관측 완료"
    );
    observations
}
