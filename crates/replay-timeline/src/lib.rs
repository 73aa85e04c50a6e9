//! # replay-timeline
//!
//! 관측 스트림을 최종 행동 타임라인으로 바꾸는 통합 엔진.
//!
//! 처리 순서:
//! 1. [`external_observer`]: 분류기·음성 전사 결과를 관측으로 변환 (TYPE 값 정규화 포함)
//! 2. [`ingest`]: 레코드 검증 + timestamp 정렬 (스캔 전에 전부 끝낸다)
//! 3. [`consolidation`]: 단일 패스 TYPE 블록 병합
//! 4. [`narrative`]: 최종 이벤트에 서술 문장 부착
//!
//! 이 crate는 I/O가 없고 동기 순수 함수만 제공한다.

pub mod consolidation;
pub mod external_observer;
pub mod ingest;
pub mod narrative;
pub mod typed_text;
