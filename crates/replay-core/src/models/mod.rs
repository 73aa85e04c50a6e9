//! 세션 리플레이 도메인 모델.
//!
//! 관측기 → 통합 엔진 → 출력 단계가 공유하는 데이터 구조체를 정의한다.
//! 모든 모델은 `serde` Serialize/Deserialize를 구현한다.

pub mod frame;
pub mod observation;
pub mod transcript;
