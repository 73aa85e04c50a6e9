//! # replay-vision
//!
//! 영상 프레임에서 저수준 관측을 만드는 비전 어댑터 크레이트.
//! 프레임 추출, 변화 감지, 마커 추적, 클릭/타이핑 관측기를 담당한다.
//!
//! 관측기는 동기 함수로 제공한다. 호출자가 `spawn_blocking` 안에서 돌린다.

pub mod click_observer;
pub mod extractor;
pub mod marker;
#[cfg(feature = "ocr")]
pub mod ocr;
pub mod recognizer;
pub mod similarity;
pub mod text_observer;
pub mod word_diff;
