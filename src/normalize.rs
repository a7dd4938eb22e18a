//! Canonical text cleanup for scraped pages.
//!
//! The source renders the same word with inconsistent diacritic placement,
//! so every page is funneled through [`normalize`] before anchor matching:
//! NFD decomposition, removal of the Arabic harakat combining range,
//! NFC recomposition, and whitespace collapsing.  The function is total and
//! idempotent — it is applied at more than one pipeline stage and must be a
//! fixed point on its own output.

use std::borrow::Cow;

use unicode_normalization::UnicodeNormalization;

/// Combining marks stripped during page normalization (Arabic harakat).
fn is_harakat(c: char) -> bool {
    matches!(c, '\u{064B}'..='\u{0652}')
}

/// Wider combining-mark set removed when preparing embedding input.
fn is_embedding_mark(c: char) -> bool {
    matches!(
        c,
        '\u{064B}'..='\u{065F}' | '\u{0670}' | '\u{06D6}'..='\u{06ED}'
    )
}

/// Canonicalizes raw page text: decompose, strip harakat, recompose,
/// collapse whitespace.
///
/// Returns `Cow::Borrowed` when the input is already canonical.
pub fn normalize(raw: &str) -> Cow<'_, str> {
    if is_canonical(raw) {
        return Cow::Borrowed(raw);
    }
    let stripped: String = raw.nfd().filter(|c| !is_harakat(*c)).nfc().collect();
    Cow::Owned(collapse_whitespace(&stripped))
}

/// Prepares text for the embedding model: strips the wider combining-mark
/// set and collapses whitespace.  Callers remove any literal invocation
/// phrases before invoking this.
pub fn clean_for_embedding(text: &str) -> String {
    let recomposed: String = text.nfc().filter(|c| !is_embedding_mark(*c)).collect();
    collapse_whitespace(&recomposed)
}

fn is_canonical(input: &str) -> bool {
    use unicode_normalization::{IsNormalized, is_nfc_quick};

    if is_nfc_quick(input.chars()) != IsNormalized::Yes {
        return false;
    }
    if input.chars().any(|c| is_harakat(c) || is_dropped(c)) {
        return false;
    }
    whitespace_is_collapsed(input)
}

/// Zero-width and directional marks that never survive normalization.
fn is_dropped(c: char) -> bool {
    matches!(c, '\u{200C}' | '\u{200F}')
}

fn whitespace_is_collapsed(input: &str) -> bool {
    let mut prev_space = true; // also rejects leading whitespace
    for c in input.chars() {
        if c == ' ' {
            if prev_space {
                return false;
            }
            prev_space = true;
        } else if c.is_whitespace() {
            // Any non-ASCII-space whitespace must be folded.
            return false;
        } else {
            prev_space = false;
        }
    }
    !(prev_space && !input.is_empty())
}

/// Folds NBSP into ASCII space, drops ZWNJ and the RLM directional mark,
/// and collapses every whitespace run (including `\r\n\t`) to one space.
fn collapse_whitespace(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_space = false;
    for c in input.chars() {
        let c = if c == '\u{00A0}' { ' ' } else { c };
        if is_dropped(c) {
            continue;
        }
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space && !out.is_empty() {
            out.push(' ');
        }
        pending_space = false;
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_fast_path_borrows() {
        let result = normalize("plain ascii text");
        assert!(matches!(result, Cow::Borrowed(_)));
    }

    #[test]
    fn collapses_whitespace_runs() {
        assert_eq!(normalize("  a\r\n\tb\u{00A0} c  "), "a b c");
    }

    #[test]
    fn drops_zwnj_and_rlm() {
        assert_eq!(normalize("سوال\u{200C}\u{200F} جواب"), "سوال جواب");
    }

    #[test]
    fn strips_harakat_from_invocation() {
        let diacritized = "اَلْجَوَابُ بِعَوْنِ الْمَلِکِ الْوَھَّابِ";
        assert_eq!(normalize(diacritized), "الجواب بعون الملک الوھاب");
    }

    #[test]
    fn keeps_superscript_alef_in_page_normalization() {
        // U+0670 is outside the harakat range; the title regex tolerates it.
        assert_eq!(normalize("الرحمٰن"), "الرحمٰن");
    }

    #[test]
    fn idempotent_on_arbitrary_input() {
        let samples = [
            "",
            "already clean",
            "  messy \t input \u{200C} here ",
            "بِسْمِ اللہِ الرَّحْمٰنِ الرَّحِیْمِ",
            "mixed عربی and english\u{00A0}text",
        ];
        for sample in samples {
            let once = normalize(sample).into_owned();
            let twice = normalize(&once).into_owned();
            assert_eq!(once, twice, "normalize must be idempotent for {sample:?}");
        }
    }

    #[test]
    fn embedding_cleanup_strips_superscript_alef() {
        assert_eq!(clean_for_embedding("تَعَالٰی"), "تعالی");
    }

    #[test]
    fn embedding_cleanup_idempotent() {
        let once = clean_for_embedding("وَاٰلِہٖ  وَسَلَّم");
        assert_eq!(clean_for_embedding(&once), once);
    }
}
