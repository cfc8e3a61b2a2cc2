//! Prosody-Markup Generator (C10): turns plain text plus detected emotion
//! dynamics into an `<speak>…</speak>` markup string for the synthesizer.

use relay_core::{Emotion, EmotionDynamics, VolumeLevel};

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

fn rate_keyword(wpm: u32) -> &'static str {
    if wpm < 120 {
        "slow"
    } else if wpm < 170 {
        "medium"
    } else if wpm < 200 {
        "fast"
    } else {
        "x-fast"
    }
}

fn volume_keyword(level: VolumeLevel) -> &'static str {
    match level {
        VolumeLevel::Whisper => "x-soft",
        VolumeLevel::Soft => "soft",
        VolumeLevel::Normal => "medium",
        VolumeLevel::Loud => "loud",
    }
}

fn needs_strong_emphasis(dynamics: &EmotionDynamics) -> bool {
    matches!(dynamics.emotion, Emotion::Angry | Emotion::Excited | Emotion::Surprised)
        && dynamics.intensity >= 0.7
}

fn needs_leading_break(dynamics: &EmotionDynamics) -> bool {
    matches!(dynamics.emotion, Emotion::Sad | Emotion::Fearful)
}

/// Generates `<speak>…</speak>` markup: rate-prosody wraps volume-prosody
/// wraps emphasis (innermost).
pub fn generate(text: &str, dynamics: &EmotionDynamics) -> String {
    let escaped = escape_xml(text);

    let mut inner = escaped;
    if needs_strong_emphasis(dynamics) {
        inner = format!(r#"<emphasis level="strong">{inner}</emphasis>"#);
    }
    if needs_leading_break(dynamics) {
        inner = format!(r#"<break time="300ms"/>{inner}"#);
    }

    let rate = rate_keyword(dynamics.rate_wpm);
    let volume = volume_keyword(dynamics.volume_level);

    format!(
        r#"<speak><prosody rate="{rate}"><prosody volume="{volume}">{inner}</prosody></prosody></speak>"#
    )
}
