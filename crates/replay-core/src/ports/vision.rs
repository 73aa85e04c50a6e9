//! 비전(이미지 처리) 포트.
//!
//! 구현: `replay-vision` crate (image, leptess)

use image::DynamicImage;

use crate::error::CoreError;

/// 커서 같은 마커의 프레임 내 위치 추적기
pub trait MarkerTracker: Send + Sync {
    /// 마커 중심 좌표. 신뢰도 임계값 미만이거나 추적 실패면 `None`.
    fn extract_marker_position(&self, frame: &DynamicImage) -> Option<(u32, u32)>;
}

/// 화면 텍스트 인식기
///
/// 구현체: `TesseractRecognizer` (`ocr` feature)
pub trait TextRecognizer: Send + Sync {
    /// 이미지(또는 잘라낸 영역)에서 텍스트 추출.
    ///
    /// 호출자는 빈 문자열과 에러를 모두 "텍스트 없음"으로 취급한다.
    fn recognize_text(&self, image: &DynamicImage) -> Result<String, CoreError>;

    /// 제공자 이름 (예: "local-tesseract")
    fn provider_name(&self) -> &str;
}
