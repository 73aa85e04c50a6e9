//! 세션 리플레이 핵심 에러 타입.
//!
//! 모든 어댑터 crate는 자체 에러를 이 타입으로 매핑해서 포트 밖으로 내보낸다.

use thiserror::Error;

/// 코어 레이어 에러.
#[derive(Debug, Error)]
pub enum CoreError {
    /// JSON 직렬화/역직렬화 실패
    #[error("직렬화 에러: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 설정값 오류
    #[error("설정 에러: {0}")]
    Config(String),

    /// 필드 유효성 검증 실패
    #[error("유효성 검증 실패 ({field}): {message}")]
    Validation {
        /// 검증 실패한 필드명
        field: String,
        /// 실패 사유
        message: String,
    },

    /// 관측 레코드 형식 오류 (수집 단계에서 배치 전체 거부)
    #[error("잘못된 관측 레코드 #{index}: {reason}")]
    MalformedObservation {
        /// 입력 배열 내 위치 (0부터)
        index: usize,
        /// 거부 사유
        reason: String,
    },

    /// 필수 입력 없음 (영상 파일 부재, 추출된 프레임 0개 등)
    #[error("필수 입력 없음: {0}")]
    MissingInput(String),

    /// 영상/오디오 추출 실패
    #[error("미디어 처리 에러: {0}")]
    Media(String),

    /// 리소스를 찾을 수 없음
    #[error("{resource_type} 미발견: {id}")]
    NotFound {
        /// 리소스 종류 (예: "Frame", "Template")
        resource_type: String,
        /// 리소스 식별자
        id: String,
    },

    /// 내부 에러 (예상치 못한 상황)
    #[error("내부 에러: {0}")]
    Internal(String),

    /// 네트워크 에러 (연결 실패, 타임아웃)
    #[error("네트워크 에러: {0}")]
    Network(String),

    /// Rate Limit 초과 (429)
    #[error("요청 한도 초과, {retry_after_secs}초 후 재시도")]
    RateLimit {
        /// 서버가 지정한 대기 시간 (초, 0이면 백오프 스케줄 사용)
        retry_after_secs: u64,
    },

    /// 서비스 일시 불가 (502/503/504)
    #[error("서비스 일시 불가: {0}")]
    ServiceUnavailable(String),

    /// I/O 에러
    #[error("I/O 에러: {0}")]
    Io(#[from] std::io::Error),

    /// OCR 처리 실패
    #[error("OCR 에러: {0}")]
    OcrError(String),
}

impl CoreError {
    /// 재시도하면 성공할 수 있는 일시적 외부 장애인지 여부
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CoreError::Network(_) | CoreError::ServiceUnavailable(_) | CoreError::RateLimit { .. }
        )
    }
}
