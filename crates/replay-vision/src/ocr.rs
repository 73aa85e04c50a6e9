//! OCR 텍스트 추출 모듈.
//!
//! `leptess` 기반 Tesseract OCR 래퍼.
//! `ocr` feature flag 활성화 시에만 빌드된다.

use std::io::Cursor;
use std::path::PathBuf;
use thiserror::Error;
use tracing::trace;

/// OCR 에러 타입
#[derive(Debug, Error)]
pub enum OcrError {
    /// Tesseract 초기화 실패
    #[error("OCR 초기화 실패: {0}")]
    Init(String),

    /// 이미지 설정 실패
    #[error("OCR 이미지 설정 실패: {0}")]
    ImageSetup(String),

    /// 텍스트 추출 실패
    #[error("OCR 텍스트 추출 실패: {0}")]
    Extraction(String),

    /// 빈 이미지 입력
    #[error("빈 이미지: 너비 또는 높이가 0")]
    EmptyImage,
}

/// Tesseract 페이지 분할 모드
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSegMode {
    /// 엔진 기본값 (자동 분할)
    Auto,
    /// 균일한 텍스트 블록 하나로 가정 (psm 6)
    SingleBlock,
}

impl PageSegMode {
    fn as_tess_value(&self) -> Option<&'static str> {
        match self {
            Self::Auto => None,
            Self::SingleBlock => Some("6"),
        }
    }
}

/// OCR 텍스트 추출기
///
/// 호출마다 Tesseract 인스턴스를 새로 만든다. `LepTess`는 `Send`가 아니라
/// 블로킹 워커 스레드 안에서 생성해 써야 한다.
pub struct OcrExtractor {
    /// Tesseract 데이터 경로 (None이면 시스템 기본값)
    tessdata_path: Option<PathBuf>,
    /// 인식 언어
    language: String,
}

impl OcrExtractor {
    /// 새 OCR 추출기 생성
    pub fn new(tessdata_path: Option<PathBuf>) -> Self {
        Self {
            tessdata_path,
            language: "eng".to_string(),
        }
    }

    /// 인식 언어 변경 (예: "kor+eng")
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// 이미지에서 텍스트 추출 (동기)
    pub fn extract(
        &self,
        image: &image::DynamicImage,
        mode: PageSegMode,
    ) -> Result<String, OcrError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(OcrError::EmptyImage);
        }

        // leptess는 인코딩된 이미지 바이트를 받는다
        let mut png = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .map_err(|e| OcrError::ImageSetup(e.to_string()))?;

        let tessdata = self
            .tessdata_path
            .as_ref()
            .map(|p| p.to_string_lossy().to_string());

        let mut lt = leptess::LepTess::new(tessdata.as_deref(), &self.language)
            .map_err(|e| OcrError::Init(format!("{e}")))?;

        if let Some(psm) = mode.as_tess_value() {
            lt.set_variable(leptess::Variable::TesseditPagesegMode, psm)
                .map_err(|e| OcrError::Init(format!("{e}")))?;
        }

        lt.set_image_from_mem(&png)
            .map_err(|e| OcrError::ImageSetup(format!("{e}")))?;

        let text = lt
            .get_utf8_text()
            .map_err(|e| OcrError::Extraction(format!("{e}")))?;

        trace!(chars = text.len(), ?mode, "OCR 완료");
        Ok(text.trim().to_string())
    }

    /// tessdata 경로 반환
    pub fn tessdata_path(&self) -> Option<&PathBuf> {
        self.tessdata_path.as_ref()
    }
}
