//! 최종 이벤트 서술 문장 부착.

use replay_core::models::observation::{EventKind, FinalEvent};

/// 모든 최종 이벤트에 `naturalLanguageDescription`을 채운다
pub fn attach_narratives(events: &mut [FinalEvent]) {
    for event in events.iter_mut() {
        let narrative = describe(event);
        event.attach_narrative(narrative);
    }
}

/// 이벤트 하나의 서술 문장
pub fn describe(event: &FinalEvent) -> String {
    let t = event.timestamp();
    match event.kind() {
        EventKind::Click => match event.target_element() {
            Some(target) if target.has_legible_text() => {
                format!("At {t:.2}s, the user clicked the '{}' element.", target.text)
            }
            Some(target) => {
                let (cx, cy) = target.bbox.center();
                format!("At {t:.2}s, the user clicked near position ({cx}, {cy}) on an unidentified element.")
            }
            // 분류기 CLICK은 박스 없이 라벨만 있다
            None => format!("At {t:.2}s, the user clicked the '{}' element.", event.value()),
        },
        EventKind::Type => format!("At {t:.2}s, the user typed: '{}'", event.value()),
        EventKind::Speak => format!("At {t:.2}s, the user spoke: '{}'", event.value()),
        EventKind::Scroll => format!("At {t:.2}s, the user scrolled the page."),
        EventKind::PageLoad => format!("At {t:.2}s, a new page loaded."),
        EventKind::Unknown => format!("At {t:.2}s, an event of type '{}' occurred.", event.kind()),
    }
}
