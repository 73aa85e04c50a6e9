//! 음성 전사 결과.
//!
//! 전사가 없거나 실패해도 파이프라인은 계속되므로, 실제 발화 외의 경우는
//! 고정 문구로 기록한다. SPEAK 관측은 실제 발화일 때만 만든다.

use std::fmt;

/// 오디오 트랙 없음
pub const NO_AUDIO_TRACK: &str = "No audio track was found in the video.";
/// 전사 API 미설정
pub const TRANSCRIPTION_NOT_CONFIGURED: &str =
    "Audio transcription skipped: API key not configured.";
/// 발화 없음
pub const NO_DISCERNIBLE_SPEECH: &str = "Audio contained no discernible speech.";

/// 전사 단계 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transcript {
    /// 실제 발화 텍스트
    Spoken(String),
    NoAudio,
    NotConfigured,
    NoSpeech,
    /// 전사 호출 실패 (사유)
    Failed(String),
}

impl Transcript {
    /// 전사기 응답 텍스트로 생성 (공백뿐이면 발화 없음)
    pub fn from_text(text: &str) -> Self {
        let text = text.trim();
        if text.is_empty() {
            Self::NoSpeech
        } else {
            Self::Spoken(text.to_string())
        }
    }

    /// 실제 발화일 때만 텍스트 반환
    pub fn spoken(&self) -> Option<&str> {
        match self {
            Self::Spoken(text) => Some(text),
            _ => None,
        }
    }
}

impl fmt::Display for Transcript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spoken(text) => f.write_str(text),
            Self::NoAudio => f.write_str(NO_AUDIO_TRACK),
            Self::NotConfigured => f.write_str(TRANSCRIPTION_NOT_CONFIGURED),
            Self::NoSpeech => f.write_str(NO_DISCERNIBLE_SPEECH),
            Self::Failed(reason) => write!(f, "Audio transcription failed: {reason}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_texts() {
        assert_eq!(Transcript::NoAudio.to_string(), NO_AUDIO_TRACK);
        assert_eq!(Transcript::NotConfigured.to_string(), TRANSCRIPTION_NOT_CONFIGURED);
        assert_eq!(
            Transcript::Failed("timeout".into()).to_string(),
            "Audio transcription failed: timeout"
        );
    }

    #[test]
    fn only_real_speech_is_spoken() {
        assert_eq!(Transcript::from_text("  \n"), Transcript::NoSpeech);
        assert_eq!(Transcript::from_text(" hi ").spoken(), Some("hi"));
        assert_eq!(Transcript::NoSpeech.spoken(), None);
        assert_eq!(Transcript::Failed("x".into()).spoken(), None);
    }
}
