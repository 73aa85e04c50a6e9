//! 로컬 텍스트 인식기: Tesseract 래퍼.
//!
//! `ocr` feature가 꺼져 있으면 항상 빈 문자열을 돌려준다.
//! 관측기는 빈 문자열을 "텍스트 없음"으로 처리하므로 파이프라인은 계속 돈다.

use image::DynamicImage;
use std::path::PathBuf;

use replay_core::error::CoreError;
use replay_core::ports::vision::TextRecognizer;

// ============================================================
// TesseractRecognizer: TextRecognizer 포트 구현
// ============================================================

/// 로컬 Tesseract 인식기
pub struct TesseractRecognizer {
    tessdata_path: Option<PathBuf>,
    /// 잘라낸 라벨 영역처럼 한 블록짜리 입력이면 true (psm 6)
    single_block: bool,
}

impl TesseractRecognizer {
    /// 전체 화면용 인식기
    pub fn new(tessdata_path: Option<PathBuf>) -> Self {
        Self {
            tessdata_path,
            single_block: false,
        }
    }

    /// 라벨 영역용 인식기 (단일 텍스트 블록 가정)
    pub fn single_block(tessdata_path: Option<PathBuf>) -> Self {
        Self {
            tessdata_path,
            single_block: true,
        }
    }

    /// 실제 OCR 엔진이 빌드에 포함됐는지
    pub fn is_available() -> bool {
        cfg!(feature = "ocr")
    }
}

impl TextRecognizer for TesseractRecognizer {
    fn recognize_text(&self, image: &DynamicImage) -> Result<String, CoreError> {
        #[cfg(feature = "ocr")]
        {
            use crate::ocr::{OcrExtractor, PageSegMode};

            let mode = if self.single_block {
                PageSegMode::SingleBlock
            } else {
                PageSegMode::Auto
            };
            OcrExtractor::new(self.tessdata_path.clone())
                .extract(image, mode)
                .map_err(|e| CoreError::OcrError(e.to_string()))
        }

        #[cfg(not(feature = "ocr"))]
        {
            let _ = (image, &self.tessdata_path, self.single_block);
            Ok(String::new())
        }
    }

    fn provider_name(&self) -> &str {
        "local-tesseract"
    }
}
