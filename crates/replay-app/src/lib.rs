//! # replay-app
//!
//! `session-replay` 바이너리의 조립 계층.
//! 설정 계층 로드, 어댑터 조립, 파이프라인 오케스트레이션을 제공한다.

pub mod pipeline;
pub mod settings;
pub mod wiring;
