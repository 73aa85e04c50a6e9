//! 외부 AI 리포트 합성 클라이언트.
//!
//! 최종 이벤트 로그와 음성 전사를 합쳐 번호 목록 형식의 단계별 안내문을 만든다.

use async_trait::async_trait;
use tracing::{debug, info};

use replay_core::config::ExternalApiEndpoint;
use replay_core::error::CoreError;
use replay_core::models::observation::FinalEvent;
use replay_core::ports::llm_provider::ReportSynthesizer;

use crate::ai_common::{AiHttpClient, ContentPart};
use crate::retry::RetryPolicy;

/// 모델 미지정 시 기본값
pub const DEFAULT_REPORT_MODEL: &str = "gemini-2.5-flash";

const MAX_OUTPUT_TOKENS: u32 = 4096;

/// 외부 API 리포트 합성기: `ReportSynthesizer` 포트 구현
#[derive(Debug)]
pub struct RemoteReportSynthesizer {
    client: AiHttpClient,
}

impl RemoteReportSynthesizer {
    pub fn new(config: &ExternalApiEndpoint, retry: RetryPolicy) -> Result<Self, CoreError> {
        Ok(Self {
            client: AiHttpClient::new(config, DEFAULT_REPORT_MODEL, retry)?,
        })
    }

    /// 기술 문서 작성자 역할 프롬프트 구성
    fn build_prompt(events: &[FinalEvent], transcription: &str) -> Result<String, CoreError> {
        let events_json = serde_json::to_string_pretty(events)?;
        Ok(format!(
            r#"You are an expert technical writer. Your task is to create a clear, concise, step-by-step guide based on a session replay log and an audio transcription.

**CONTEXT:**
1.  **Event Log:** A JSON object detailing user actions on a screen (clicks, typing, scrolling).
2.  **Audio Narration:** A transcription of the user's spoken words during the session, which provides context and intent.

**YOUR TASK:**
Synthesize the information from both sources into a single, easy-to-follow instructional document.
- Merge the user's actions with their narration.
- Interpret the actions. For example, a "TYPE" action followed by a "CLICK" on a 'Search' button should be described as "Search for...".
- Ignore minor or irrelevant events. Focus on the main steps to complete the task.
- Present the output as a numbered list.
- Do not mention timestamps or technical details from the JSON.

**INPUT DATA:**

**1. JSON Event Log:**
```json
{events_json}
```

**2. Audio Narration:**
```text
{transcription}
```

**OUTPUT (Numbered List of Instructions):**
"#
        ))
    }
}

#[async_trait]
impl ReportSynthesizer for RemoteReportSynthesizer {
    async fn synthesize(
        &self,
        events: &[FinalEvent],
        transcription: &str,
    ) -> Result<String, CoreError> {
        let prompt = Self::build_prompt(events, transcription)?;
        debug!(events = events.len(), prompt_chars = prompt.len(), "리포트 합성 요청");

        let report = self
            .client
            .generate("synthesize_report", &[ContentPart::text(prompt)], MAX_OUTPUT_TOKENS)
            .await?;
        let report = report.trim().to_string();
        if report.is_empty() {
            return Err(CoreError::Internal("빈 리포트 응답".to_string()));
        }

        info!(chars = report.chars().count(), "리포트 합성 완료");
        Ok(report)
    }

    fn provider_name(&self) -> &str {
        self.client.model()
    }
}
