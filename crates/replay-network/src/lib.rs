//! # replay-network
//!
//! 외부 AI API 어댑터.
//! 프레임 쌍 분류, 음성 전사, 리포트 합성을 담당하며
//! Gemini / Anthropic / OpenAI 호환 API 형식과 재시도 정책을 지원한다.
//!
//! ## 사용 예시
//!
//! ```rust,ignore
//! use replay_network::ai_classifier_client::RemoteFramePairClassifier;
//! use replay_network::retry::RetryPolicy;
//!
//! let classifier = RemoteFramePairClassifier::new(&endpoint, RetryPolicy::from(&config.retry))?;
//! ```

pub mod ai_classifier_client;
pub mod ai_common;
pub mod ai_report_client;
pub mod ai_speech_client;
pub mod retry;
