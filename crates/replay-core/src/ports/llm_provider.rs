//! 텍스트 생성 LLM 제공자 포트.
//!
//! 음성 전사와 단계별 리포트 합성을 추상화한다.
//! 둘 다 통합 엔진 밖의 얇은 협력자이며 실패해도 파이프라인은 계속된다.

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::observation::FinalEvent;

/// 음성 → 텍스트 전사기
#[async_trait]
pub trait SpeechTranscriber: Send + Sync {
    /// 오디오 바이트를 전사한다. 발화가 없으면 빈 문자열.
    ///
    /// - `mime_type`: 예) "audio/wav"
    async fn transcribe(&self, audio: &[u8], mime_type: &str) -> Result<String, CoreError>;

    /// 제공자 이름
    fn provider_name(&self) -> &str;
}

/// 최종 타임라인 → 단계별 안내문 합성기
#[async_trait]
pub trait ReportSynthesizer: Send + Sync {
    /// 최종 이벤트와 전사 텍스트로 번호 목록 형식의 안내문을 만든다.
    async fn synthesize(
        &self,
        events: &[FinalEvent],
        transcription: &str,
    ) -> Result<String, CoreError>;

    /// 제공자 이름
    fn provider_name(&self) -> &str;
}
