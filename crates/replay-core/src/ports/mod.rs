//! 포트 인터페이스 (trait).
//!
//! Hexagonal Architecture의 포트 레이어.
//! 각 어댑터 crate가 이 trait들을 구현하며,
//! `replay-app`에서 `Arc<dyn T>`로 와이어링한다.
//!
//! I/O가 있는 포트는 `async_trait`을 사용하고,
//! 프레임 단위 CPU 연산 포트(마커 추적, 텍스트 인식)는 동기 trait이다.

pub mod classifier;
pub mod llm_provider;
pub mod media;
pub mod storage;
pub mod vision;
