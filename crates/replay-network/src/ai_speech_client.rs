//! 외부 AI 음성 전사 클라이언트.
//!
//! WAV를 인라인 데이터로 보내 전사 텍스트만 받는다.
//! Anthropic API는 오디오 입력이 없어 생성 단계에서 거부한다.

use async_trait::async_trait;
use tracing::{debug, info};

use replay_core::config::{AiProviderType, ExternalApiEndpoint};
use replay_core::error::CoreError;
use replay_core::ports::llm_provider::SpeechTranscriber;

use crate::ai_common::{AiHttpClient, ContentPart};
use crate::retry::RetryPolicy;

/// 모델 미지정 시 기본값
pub const DEFAULT_SPEECH_MODEL: &str = "gemini-2.5-flash";

const TRANSCRIBE_PROMPT: &str =
    "Transcribe the following audio file. Provide only the transcribed text.";

const MAX_OUTPUT_TOKENS: u32 = 8192;

/// 외부 API 음성 전사기: `SpeechTranscriber` 포트 구현
#[derive(Debug)]
pub struct RemoteSpeechTranscriber {
    client: AiHttpClient,
}

impl RemoteSpeechTranscriber {
    pub fn new(config: &ExternalApiEndpoint, retry: RetryPolicy) -> Result<Self, CoreError> {
        if config.provider_type == AiProviderType::Anthropic {
            return Err(CoreError::Config(
                "Anthropic API는 음성 전사를 지원하지 않음".into(),
            ));
        }
        Ok(Self {
            client: AiHttpClient::new(config, DEFAULT_SPEECH_MODEL, retry)?,
        })
    }
}

#[async_trait]
impl SpeechTranscriber for RemoteSpeechTranscriber {
    async fn transcribe(&self, audio: &[u8], mime_type: &str) -> Result<String, CoreError> {
        debug!(bytes = audio.len(), mime_type, "음성 전사 요청");
        let parts = [
            ContentPart::text(TRANSCRIBE_PROMPT),
            ContentPart::inline(mime_type, audio),
        ];
        let text = self
            .client
            .generate("transcribe", &parts, MAX_OUTPUT_TOKENS)
            .await?;
        let text = text.trim().to_string();
        info!(chars = text.chars().count(), "음성 전사 완료");
        Ok(text)
    }

    fn provider_name(&self) -> &str {
        self.client.model()
    }
}
