//! 구조적 유사도(SSIM) 기반 변화 감지.
//!
//! 7x7 균일 윈도우, K1=0.01, K2=0.03, 데이터 범위 255, 표본 공분산 보정.
//! 윈도우 합은 적분 영상(summed-area table)으로 구해 픽셀 수에 선형이다.
//! 윈도우가 완전히 들어가는 픽셀만 평균에 포함한다.

use image::{DynamicImage, GrayImage};
use tracing::{debug, trace};

/// 윈도우 한 변 길이
const WIN_SIZE: u32 = 7;

const K1: f64 = 0.01;
const K2: f64 = 0.03;
const DATA_RANGE: f64 = 255.0;

/// 두 프레임 사이에 유의미한 변화가 있는지 (SSIM < threshold)
pub fn is_significant_change(prev: &DynamicImage, curr: &DynamicImage, threshold: f64) -> bool {
    let score = structural_similarity(&prev.to_luma8(), &curr.to_luma8());
    trace!(score, threshold, "프레임 유사도");
    score < threshold
}

/// 그레이스케일 두 장의 평균 SSIM (-1.0 ~ 1.0)
///
/// 해상도가 다르면 전체 변경으로 보고 0.0을 반환한다.
pub fn structural_similarity(a: &GrayImage, b: &GrayImage) -> f64 {
    if a.dimensions() != b.dimensions() {
        debug!(
            a = ?a.dimensions(),
            b = ?b.dimensions(),
            "해상도 불일치, 유사도 0으로 처리"
        );
        return 0.0;
    }

    let (w, h) = a.dimensions();
    if w == 0 || h == 0 {
        return 1.0;
    }

    // 윈도우보다 작은 이미지는 전체를 한 윈도우로 본다
    let win_w = WIN_SIZE.min(w);
    let win_h = WIN_SIZE.min(h);

    let tables = SumTables::build(a, b);
    let n = f64::from(win_w * win_h);
    let cov_norm = if n > 1.0 { n / (n - 1.0) } else { 1.0 };
    let c1 = (K1 * DATA_RANGE).powi(2);
    let c2 = (K2 * DATA_RANGE).powi(2);

    let mut total = 0.0;
    let mut count = 0u64;
    for y in 0..=(h - win_h) {
        for x in 0..=(w - win_w) {
            let s = tables.window(x, y, win_w, win_h);
            let ux = s.x / n;
            let uy = s.y / n;
            let vx = cov_norm * (s.xx / n - ux * ux);
            let vy = cov_norm * (s.yy / n - uy * uy);
            let vxy = cov_norm * (s.xy / n - ux * uy);

            let num = (2.0 * ux * uy + c1) * (2.0 * vxy + c2);
            let den = (ux * ux + uy * uy + c1) * (vx + vy + c2);
            total += num / den;
            count += 1;
        }
    }

    total / count as f64
}

#[derive(Debug, Default, Clone, Copy)]
struct WindowSums {
    x: f64,
    y: f64,
    xx: f64,
    yy: f64,
    xy: f64,
}

/// 다섯 개 적분 영상 (Σx, Σy, Σx², Σy², Σxy), 크기 (w+1)×(h+1)
struct SumTables {
    stride: usize,
    sums: Vec<WindowSums>,
}

impl SumTables {
    fn build(a: &GrayImage, b: &GrayImage) -> Self {
        let (w, h) = a.dimensions();
        let stride = w as usize + 1;
        let mut sums = vec![WindowSums::default(); stride * (h as usize + 1)];
        let (ra, rb) = (a.as_raw(), b.as_raw());

        for y in 0..h as usize {
            let mut row = WindowSums::default();
            for x in 0..w as usize {
                let pa = f64::from(ra[y * w as usize + x]);
                let pb = f64::from(rb[y * w as usize + x]);
                row.x += pa;
                row.y += pb;
                row.xx += pa * pa;
                row.yy += pb * pb;
                row.xy += pa * pb;

                let above = sums[y * stride + x + 1];
                sums[(y + 1) * stride + x + 1] = WindowSums {
                    x: above.x + row.x,
                    y: above.y + row.y,
                    xx: above.xx + row.xx,
                    yy: above.yy + row.yy,
                    xy: above.xy + row.xy,
                };
            }
        }

        Self { stride, sums }
    }

    fn window(&self, x: u32, y: u32, w: u32, h: u32) -> WindowSums {
        let (x0, y0) = (x as usize, y as usize);
        let (x1, y1) = (x0 + w as usize, y0 + h as usize);
        let at = |xx: usize, yy: usize| self.sums[yy * self.stride + xx];
        let (br, bl, tr, tl) = (at(x1, y1), at(x0, y1), at(x1, y0), at(x0, y0));
        WindowSums {
            x: br.x - bl.x - tr.x + tl.x,
            y: br.y - bl.y - tr.y + tl.y,
            xx: br.xx - bl.xx - tr.xx + tl.xx,
            yy: br.yy - bl.yy - tr.yy + tl.yy,
            xy: br.xy - bl.xy - tr.xy + tl.xy,
        }
    }
}
