//! 외부 AI API 공통 HTTP 클라이언트.
//!
//! 제공자 타입별 요청 본문·인증 헤더·응답 텍스트 위치를 한곳에서 처리한다.
//!
//! | 제공자 | 인증 | 응답 텍스트 |
//! |---|---|---|
//! | Gemini | `x-goog-api-key` | `candidates[0].content.parts[].text` |
//! | Anthropic | `x-api-key` + `anthropic-version` | `content[].text` |
//! | OpenAI / Generic | `Authorization: Bearer` | `choices[0].message.content` |

use base64::Engine as _;
use serde_json::{json, Value};
use tracing::{debug, warn};

use replay_core::config::{AiProviderType, ExternalApiEndpoint};
use replay_core::error::CoreError;

use crate::retry::RetryPolicy;

/// Anthropic API 버전 헤더 값
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// 에러 메시지에 남길 응답 본문 최대 길이
const BODY_PREVIEW_CHARS: usize = 200;

/// 요청 본문 조각
#[derive(Debug, Clone, PartialEq)]
pub enum ContentPart {
    Text(String),
    /// 인라인 바이너리 (이미지, 오디오)
    Inline { mime_type: String, data: Vec<u8> },
}

impl ContentPart {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn inline(mime_type: impl Into<String>, data: &[u8]) -> Self {
        Self::Inline {
            mime_type: mime_type.into(),
            data: data.to_vec(),
        }
    }
}

/// 제공자 공통 AI HTTP 클라이언트
#[derive(Debug)]
pub struct AiHttpClient {
    http_client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    provider_type: AiProviderType,
    retry: RetryPolicy,
}

impl AiHttpClient {
    /// 엔드포인트 설정으로 생성. API 키가 비어 있으면 설정 에러.
    pub fn new(
        config: &ExternalApiEndpoint,
        default_model: &str,
        retry: RetryPolicy,
    ) -> Result<Self, CoreError> {
        if config.api_key.trim().is_empty() {
            return Err(CoreError::Config("AI API 키 미설정".into()));
        }
        if config.endpoint.trim().is_empty() {
            return Err(CoreError::Config("AI API 엔드포인트 미설정".into()));
        }

        let http_client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| CoreError::Network(format!("HTTP 클라이언트 생성 실패: {e}")))?;

        let model = config
            .model
            .clone()
            .unwrap_or_else(|| default_model.to_string());

        debug!(
            endpoint = %config.endpoint,
            model = %model,
            provider = ?config.provider_type,
            timeout = config.timeout_secs,
            "AiHttpClient 초기화"
        );

        Ok(Self {
            http_client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            model,
            provider_type: config.provider_type,
            retry,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn provider_type(&self) -> AiProviderType {
        self.provider_type
    }

    /// 조각들을 한 번의 사용자 메시지로 보내고 응답 텍스트를 받는다 (재시도 포함)
    pub async fn generate(
        &self,
        label: &str,
        parts: &[ContentPart],
        max_tokens: u32,
    ) -> Result<String, CoreError> {
        let body = build_request_body(self.provider_type, &self.model, parts, max_tokens)?;
        self.retry
            .execute(label, || async { self.send_once(&body).await })
            .await
    }

    async fn send_once(&self, body: &Value) -> Result<String, CoreError> {
        let mut builder = self.http_client.post(&self.endpoint).json(body);
        builder = match self.provider_type {
            AiProviderType::Gemini => builder.header("x-goog-api-key", &self.api_key),
            AiProviderType::Anthropic => builder
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION),
            AiProviderType::OpenAi | AiProviderType::Generic => {
                builder.bearer_auth(&self.api_key)
            }
        };

        let response = builder
            .send()
            .await
            .map_err(|e| CoreError::Network(format!("AI API 호출 실패: {e}")))?;

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let text = response
            .text()
            .await
            .map_err(|e| CoreError::Network(format!("AI API 응답 읽기 실패: {e}")))?;

        if !(200..300).contains(&status) {
            return Err(map_status_error(status, retry_after, &text));
        }

        extract_response_text(self.provider_type, &text)
    }
}

/// HTTP 상태 코드 → 에러 매핑
pub fn map_status_error(status: u16, retry_after: Option<u64>, body: &str) -> CoreError {
    let preview: String = body.chars().take(BODY_PREVIEW_CHARS).collect();
    match status {
        429 => CoreError::RateLimit {
            retry_after_secs: retry_after.unwrap_or(0),
        },
        502..=504 => CoreError::ServiceUnavailable(format!("{status}: {preview}")),
        401 | 403 => CoreError::Config(format!("AI API 인증 실패 ({status}): {preview}")),
        404 => CoreError::NotFound {
            resource_type: "AI API".to_string(),
            id: preview,
        },
        _ => {
            warn!(status, "AI API 오류 응답");
            CoreError::Internal(format!("AI API 오류 ({status}): {preview}"))
        }
    }
}

/// 제공자별 요청 본문 생성
pub fn build_request_body(
    provider: AiProviderType,
    model: &str,
    parts: &[ContentPart],
    max_tokens: u32,
) -> Result<Value, CoreError> {
    let b64 = |data: &[u8]| base64::engine::general_purpose::STANDARD.encode(data);

    let body = match provider {
        AiProviderType::Gemini => {
            let parts: Vec<Value> = parts
                .iter()
                .map(|p| match p {
                    ContentPart::Text(t) => json!({ "text": t }),
                    ContentPart::Inline { mime_type, data } => json!({
                        "inline_data": { "mime_type": mime_type, "data": b64(data) }
                    }),
                })
                .collect();
            json!({
                "contents": [{ "role": "user", "parts": parts }],
                "generationConfig": { "maxOutputTokens": max_tokens }
            })
        }
        AiProviderType::Anthropic => {
            let mut content = Vec::with_capacity(parts.len());
            for p in parts {
                content.push(match p {
                    ContentPart::Text(t) => json!({ "type": "text", "text": t }),
                    ContentPart::Inline { mime_type, data } if mime_type.starts_with("image/") => {
                        json!({
                            "type": "image",
                            "source": { "type": "base64", "media_type": mime_type, "data": b64(data) }
                        })
                    }
                    ContentPart::Inline { mime_type, .. } => {
                        return Err(CoreError::Config(format!(
                            "Anthropic API는 {mime_type} 입력을 지원하지 않음"
                        )))
                    }
                });
            }
            json!({
                "model": model,
                "max_tokens": max_tokens,
                "messages": [{ "role": "user", "content": content }]
            })
        }
        AiProviderType::OpenAi | AiProviderType::Generic => {
            let mut content = Vec::with_capacity(parts.len());
            for p in parts {
                content.push(match p {
                    ContentPart::Text(t) => json!({ "type": "text", "text": t }),
                    ContentPart::Inline { mime_type, data } if mime_type.starts_with("image/") => {
                        json!({
                            "type": "image_url",
                            "image_url": { "url": format!("data:{mime_type};base64,{}", b64(data)) }
                        })
                    }
                    ContentPart::Inline { mime_type, data } if mime_type.starts_with("audio/") => {
                        let format = mime_type.trim_start_matches("audio/").replace("x-", "");
                        json!({
                            "type": "input_audio",
                            "input_audio": { "data": b64(data), "format": format }
                        })
                    }
                    ContentPart::Inline { mime_type, .. } => {
                        return Err(CoreError::Config(format!(
                            "지원하지 않는 입력 형식: {mime_type}"
                        )))
                    }
                });
            }
            json!({
                "model": model,
                "max_tokens": max_tokens,
                "messages": [{ "role": "user", "content": content }]
            })
        }
    };
    Ok(body)
}

/// 제공자별 응답 본문에서 생성 텍스트 추출
pub fn extract_response_text(provider: AiProviderType, body: &str) -> Result<String, CoreError> {
    let response: Value = serde_json::from_str(body)
        .map_err(|e| CoreError::Internal(format!("AI 응답 JSON 파싱 실패: {e}")))?;

    let text = match provider {
        AiProviderType::Gemini => response
            .pointer("/candidates/0/content/parts")
            .and_then(Value::as_array)
            .map(|parts| join_text_blocks(parts)),
        AiProviderType::Anthropic => response
            .get("content")
            .and_then(Value::as_array)
            .map(|blocks| join_text_blocks(blocks)),
        AiProviderType::OpenAi | AiProviderType::Generic => response
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(str::to_string),
    };

    text.ok_or_else(|| {
        CoreError::Internal(format!(
            "AI 응답에서 텍스트를 찾을 수 없음: {}",
            body.chars().take(BODY_PREVIEW_CHARS).collect::<String>()
        ))
    })
}

fn join_text_blocks(blocks: &[Value]) -> String {
    blocks
        .iter()
        .filter_map(|b| b.get("text").and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join("")
}

/// 첫 `{`부터 마지막 `}`까지 잘라낸 JSON 객체 후보 (마크다운 코드 블록 대응)
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start <= end).then(|| &text[start..=end])
}
