//! 템플릿 매칭 마커(커서) 추적.
//!
//! 정규화 상관계수(CCOEFF_NORMED) 점수가 임계값을 넘는 최고 위치의 중심을 반환한다.
//! 큰 프레임은 2배씩 축소한 영상에서 먼저 찾고, 원본 해상도에서 주변만 다시 본다.

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage};
use replay_core::error::CoreError;
use replay_core::ports::vision::MarkerTracker;
use std::path::Path;
use tracing::{debug, info, trace};

/// 이 너비 이하가 될 때까지 축소해서 대략 위치를 찾는다
const COARSE_MAX_WIDTH: u32 = 640;

/// 축소해도 템플릿 한 변이 이 값 미만이 되면 더 줄이지 않는다
const MIN_TEMPLATE_SIDE: u32 = 8;

/// 매칭 결과 (템플릿 좌상단 좌표 + 점수)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerMatch {
    pub x: u32,
    pub y: u32,
    pub score: f32,
}

/// 템플릿 기반 마커 추적기: `MarkerTracker` 포트 구현
pub struct TemplateMarkerTracker {
    template: GrayImage,
    min_confidence: f32,
}

impl TemplateMarkerTracker {
    /// 템플릿 이미지로 생성
    pub fn new(template: GrayImage, min_confidence: f32) -> Result<Self, CoreError> {
        if template.width() == 0 || template.height() == 0 {
            return Err(CoreError::Validation {
                field: "marker_template".to_string(),
                message: "빈 템플릿 이미지".to_string(),
            });
        }
        Ok(Self {
            template,
            min_confidence,
        })
    }

    /// 템플릿 파일 로드
    pub fn from_path(path: &Path, min_confidence: f32) -> Result<Self, CoreError> {
        let template = image::open(path)
            .map_err(|e| CoreError::NotFound {
                resource_type: "MarkerTemplate".to_string(),
                id: format!("{}: {e}", path.display()),
            })?
            .to_luma8();
        info!(
            path = %path.display(),
            width = template.width(),
            height = template.height(),
            "마커 템플릿 로드"
        );
        Self::new(template, min_confidence)
    }

    /// 프레임 전체에서 최고 점수 위치 탐색 (임계값 미적용)
    pub fn locate(&self, frame: &GrayImage) -> Option<MarkerMatch> {
        let (fw, fh) = frame.dimensions();
        let (tw, th) = self.template.dimensions();
        if tw > fw || th > fh {
            return None;
        }

        let mut scale = 1u32;
        while fw / (scale * 2) >= COARSE_MAX_WIDTH / 2
            && fw / scale > COARSE_MAX_WIDTH
            && tw.min(th) / (scale * 2) >= MIN_TEMPLATE_SIDE
        {
            scale *= 2;
        }

        if scale == 1 {
            return best_match(frame, &self.template, (0, 0, fw - tw, fh - th));
        }

        let small_frame = imageops::resize(frame, fw / scale, fh / scale, FilterType::Triangle);
        let small_template =
            imageops::resize(&self.template, tw / scale, th / scale, FilterType::Triangle);
        let (sw, sh) = small_frame.dimensions();
        let (stw, sth) = small_template.dimensions();
        let Some(coarse) = best_match(&small_frame, &small_template, (0, 0, sw - stw, sh - sth))
        else {
            // 축소하면서 템플릿 무늬가 뭉개진 경우
            return best_match(frame, &self.template, (0, 0, fw - tw, fh - th));
        };

        // 원본 해상도에서 주변 재탐색
        let margin = scale * 2;
        let cx = coarse.x * scale;
        let cy = coarse.y * scale;
        let region = (
            cx.saturating_sub(margin),
            cy.saturating_sub(margin),
            (cx + margin).min(fw - tw),
            (cy + margin).min(fh - th),
        );
        best_match(frame, &self.template, region)
    }
}

impl MarkerTracker for TemplateMarkerTracker {
    fn extract_marker_position(&self, frame: &DynamicImage) -> Option<(u32, u32)> {
        let found = self.locate(&frame.to_luma8())?;
        if found.score > self.min_confidence {
            let (tw, th) = self.template.dimensions();
            Some((found.x + tw / 2, found.y + th / 2))
        } else {
            trace!(score = found.score, "마커 매칭 점수 미달");
            None
        }
    }
}

/// 좌상단 좌표 범위 `(x0, y0, x1, y1)` (양끝 포함) 안에서 CCOEFF_NORMED 최고점
fn best_match(
    frame: &GrayImage,
    template: &GrayImage,
    (x0, y0, x1, y1): (u32, u32, u32, u32),
) -> Option<MarkerMatch> {
    let (tw, th) = template.dimensions();
    let n = f64::from(tw * th);

    let t_mean = template.pixels().map(|p| f64::from(p[0])).sum::<f64>() / n;
    let t_centered: Vec<f64> = template.pixels().map(|p| f64::from(p[0]) - t_mean).collect();
    let t_norm = t_centered.iter().map(|v| v * v).sum::<f64>();
    if t_norm <= f64::EPSILON {
        return None;
    }

    let integral = Integral::build(frame);
    let fw = frame.width() as usize;
    let raw = frame.as_raw();

    let mut best: Option<MarkerMatch> = None;
    for y in y0..=y1 {
        for x in x0..=x1 {
            let (sum, sum_sq) = integral.window(x, y, tw, th);
            let f_var = sum_sq - sum * sum / n;
            let denom = (t_norm * f_var).sqrt();

            let score = if denom <= f64::EPSILON {
                0.0
            } else {
                let mut cross = 0.0;
                for ty in 0..th as usize {
                    let row = (y as usize + ty) * fw + x as usize;
                    let t_row = ty * tw as usize;
                    for tx in 0..tw as usize {
                        cross += t_centered[t_row + tx] * f64::from(raw[row + tx]);
                    }
                }
                cross / denom
            };

            let score = score as f32;
            if best.map_or(true, |b| score > b.score) {
                best = Some(MarkerMatch { x, y, score });
            }
        }
    }

    if let Some(b) = best {
        debug!(x = b.x, y = b.y, score = b.score, "템플릿 최고점");
    }
    best
}

/// Σp, Σp² 적분 영상
struct Integral {
    stride: usize,
    sum: Vec<f64>,
    sum_sq: Vec<f64>,
}

impl Integral {
    fn build(img: &GrayImage) -> Self {
        let (w, h) = (img.width() as usize, img.height() as usize);
        let stride = w + 1;
        let mut sum = vec![0.0; stride * (h + 1)];
        let mut sum_sq = vec![0.0; stride * (h + 1)];
        let raw = img.as_raw();
        for y in 0..h {
            let (mut row, mut row_sq) = (0.0, 0.0);
            for x in 0..w {
                let p = f64::from(raw[y * w + x]);
                row += p;
                row_sq += p * p;
                sum[(y + 1) * stride + x + 1] = sum[y * stride + x + 1] + row;
                sum_sq[(y + 1) * stride + x + 1] = sum_sq[y * stride + x + 1] + row_sq;
            }
        }
        Self {
            stride,
            sum,
            sum_sq,
        }
    }

    fn window(&self, x: u32, y: u32, w: u32, h: u32) -> (f64, f64) {
        let (x0, y0) = (x as usize, y as usize);
        let (x1, y1) = (x0 + w as usize, y0 + h as usize);
        let s = |t: &[f64]| {
            t[y1 * self.stride + x1] - t[y0 * self.stride + x1] - t[y1 * self.stride + x0]
                + t[y0 * self.stride + x0]
        };
        (s(&self.sum), s(&self.sum_sq))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    /// 화살표 모양(좌하단 삼각형) 커서 템플릿
    fn cursor_template(side: u32) -> GrayImage {
        GrayImage::from_fn(side, side, |x, y| {
            if x <= y {
                Luma([250])
            } else {
                Luma([10])
            }
        })
    }

    fn frame_with_cursor(w: u32, h: u32, at: (u32, u32), template: &GrayImage) -> GrayImage {
        let mut frame = GrayImage::from_fn(w, h, |x, y| Luma([((x + y) % 7 * 3 + 100) as u8]));
        imageops::overlay(&mut frame, template, i64::from(at.0), i64::from(at.1));
        frame
    }

    #[test]
    fn finds_cursor_in_small_frame() {
        let template = cursor_template(12);
        let frame = frame_with_cursor(120, 80, (40, 30), &template);
        let tracker = TemplateMarkerTracker::new(template, 0.6).unwrap();

        let found = tracker.locate(&frame).unwrap();
        assert_eq!((found.x, found.y), (40, 30));
        assert!(found.score > 0.99);

        let pos = tracker.extract_marker_position(&DynamicImage::ImageLuma8(frame));
        assert_eq!(pos, Some((46, 36)));
    }

    #[test]
    fn finds_cursor_in_large_frame_via_coarse_search() {
        let template = cursor_template(32);
        let frame = frame_with_cursor(1600, 900, (1000, 500), &template);
        let tracker = TemplateMarkerTracker::new(template, 0.6).unwrap();

        let found = tracker.locate(&frame).unwrap();
        assert!(found.x.abs_diff(1000) <= 2 && found.y.abs_diff(500) <= 2, "{found:?}");
        assert!(tracker
            .extract_marker_position(&DynamicImage::ImageLuma8(frame))
            .is_some());
    }

    #[test]
    fn flat_frame_yields_no_marker() {
        let tracker = TemplateMarkerTracker::new(cursor_template(12), 0.6).unwrap();
        let frame = DynamicImage::ImageLuma8(GrayImage::from_pixel(100, 100, Luma([128])));
        assert!(tracker.extract_marker_position(&frame).is_none());
    }

    #[test]
    fn template_larger_than_frame() {
        let tracker = TemplateMarkerTracker::new(cursor_template(40), 0.6).unwrap();
        assert!(tracker.locate(&GrayImage::new(20, 20)).is_none());
    }

    #[test]
    fn flat_template_matches_nothing() {
        let tracker =
            TemplateMarkerTracker::new(GrayImage::from_pixel(8, 8, Luma([200])), 0.6).unwrap();
        assert!(tracker.locate(&GrayImage::new(40, 40)).is_none());
    }

    #[test]
    fn empty_template_rejected() {
        assert!(TemplateMarkerTracker::new(GrayImage::new(0, 0), 0.6).is_err());
    }

    #[test]
    fn missing_template_file() {
        let result = TemplateMarkerTracker::from_path(Path::new("/nonexistent/cursor.png"), 0.6);
        assert!(matches!(result, Err(CoreError::NotFound { .. })));
    }
}
