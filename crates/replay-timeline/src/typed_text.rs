//! 입력 텍스트 정규화.
//!
//! TYPE 관측의 `value`는 항상 "이 관측이 새로 더한 텍스트 조각"이다.
//! 분류기는 가끔 `Typed 'abc' into the search field, changing the text from 'x' to 'xabc'`
//! 같은 문장을 돌려주므로, 분류기 경계에서 아래 규칙으로 조각을 뽑아낸다.
//!
//! 1. `to '<x>'`가 있으면 첫 번째 `<x>`
//! 2. 아니면 맨 앞의 `Typed '<x>'`를 `<x>`로 치환 (나머지 문장은 유지)
//! 3. 공백 정규화 (개행 포함 연속 공백 → 한 칸, 앞뒤 제거)
//!
//! 분류기 문장에 대해서는 "증분" 보장이 최선 노력일 뿐이다. 규칙 1은 입력란의
//! 최종 전체 텍스트를 돌려주므로, 앞 조각 `hel` 뒤에 `... to 'hello'`가 오면
//! 병합 결과는 `hel hello`가 된다.

use once_cell::sync::Lazy;
use regex::Regex;

static CHANGED_TO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"to '(.*?)'").expect("CHANGED_TO pattern must compile"));
static TYPED_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Typed '(.*?)'").expect("TYPED_PREFIX pattern must compile"));

/// 연속 공백(개행, 탭 포함)을 한 칸으로 줄이고 앞뒤 공백 제거
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 분류기 TYPE 설명에서 증분 텍스트 조각 추출
///
/// `to '<x>'` 형태는 추가된 부분이 아니라 입력란의 최종 텍스트를 돌려준다.
pub fn extract_incremental_fragment(value: &str) -> String {
    if let Some(caps) = CHANGED_TO.captures(value) {
        if let Some(inner) = caps.get(1) {
            return normalize_whitespace(inner.as_str());
        }
    }
    let unwrapped = TYPED_PREFIX.replace(value, "$1");
    normalize_whitespace(&unwrapped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_fragment_passes_through() {
        assert_eq!(extract_incremental_fragment("hello"), "hello");
        assert_eq!(extract_incremental_fragment("  hello \n world "), "hello world");
    }

    #[test]
    fn changed_from_to_takes_final_text() {
        let v = "Typed 'lo' into the search input field, changing the text from 'hel' to 'hello'";
        assert_eq!(extract_incremental_fragment(v), "hello");
    }

    #[test]
    fn typed_prefix_is_unwrapped() {
        assert_eq!(extract_incremental_fragment("Typed 'rust'"), "rust");
        assert_eq!(
            extract_incremental_fragment("Typed 'rust' in the box"),
            "rust in the box"
        );
    }

    #[test]
    fn typed_prefix_only_at_start() {
        assert_eq!(
            extract_incremental_fragment("User Typed 'x'"),
            "User Typed 'x'"
        );
    }

    #[test]
    fn empty_quotes() {
        assert_eq!(extract_incremental_fragment("changed to ''"), "");
    }
}
