//! # replay-storage
//!
//! 세션 출력 저장소 어댑터.
//! 실행 1회마다 출력 디렉토리를 만들고 원시/최종 이벤트 로그,
//! 이벤트 스크린샷, 음성 전사, 단계별 안내문을 기록한다.
//!
//! ## 모듈
//! - `session_output`: 출력 디렉토리 (SessionLogWriter 구현)

pub mod session_output;
