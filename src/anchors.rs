//! Anchor-rule cascade recovering question/answer fields from page text.
//!
//! A page is carved up by an ordered list of named [`AnchorRule`]s.  Each
//! rule must match somewhere in the span left over by its predecessor; the
//! split always happens at the *first* occurrence, and the text matched by
//! the anchor itself is consumed.  Later occurrences of an earlier anchor
//! remain embedded in the tail for subsequent rules to work over.  A rule
//! that never matches fails the whole parse with its name — partial
//! extraction is disallowed because a half-parsed record is worse than a
//! flagged failure.

use std::sync::LazyLock;

use regex::Regex;

use crate::normalize;
use crate::types::FatwaError;

/// Opening invocation phrase, diacritics intact, re-prepended to the answer.
pub const ANSWER_START: &str =
    "بِسْمِ اللہِ الرَّحْمٰنِ الرَّحِیْمِ اَلْجَوَابُ بِعَوْنِ الْمَلِکِ الْوَھَّابِ";

/// Closing invocation phrase, diacritics intact, re-appended to the answer.
pub const ANSWER_END: &str =
    "وَاللہُ اَعْلَمُ عَزَّوَجَلَّ وَرَسُوْلُہ اَعْلَم صَلَّی اللہُ تَعَالٰی عَلَیْہِ وَاٰلِہٖ وَسَلَّم";

/// Label introducing the question body on most pages.
const QUESTION_LABEL: &str = "سوال";

/// Label that leaks across the title split boundary on some pages.
const ANSWER_LABEL: &str = "جواب";

/// Optional combining marks tolerated between the title letters.
const MARKS: &str = "[\u{064B}-\u{0652}\u{0670}]*";

/// Diacritic-insensitive pattern for the دارالافتاء اہلسنت section title.
///
/// The source renders this heading with inconsistent diacritic placement,
/// so the anchor is a character class per letter rather than a literal.
static QUESTION_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    let letters = [
        "د", "ا", "ر", "ا", "ل", "ا", "ف", "ت", "ا", "ء", "ا", "[هہھۃ]", "ل", "س", "[نں]", "ت",
    ];
    let pattern = letters
        .iter()
        .map(|letter| format!("{letter}{MARKS}"))
        .collect::<Vec<_>>()
        .join(r"\s*");
    Regex::new(&pattern).expect("title anchor pattern is valid")
});

static ANSWER_START_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"الجواب\s*بعون\s*الملک\s*الوھاب").expect("valid pattern"));

static ANSWER_END_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"و\s*اللہ\s*اعلم\s*عز\s*و\s*جل\s*و\s*رسولہ\s*اعلم").expect("valid pattern")
});

/// The tasmiya sometimes lands inside the question region and is removed.
static TASMIYA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("بسم\\s*الل[هہھ]\\s*الرحم[\u{0670}]?[نں]\\s*الرح[یيى]م").expect("valid pattern")
});

/// One step of the cascade: a named pattern splitting the remaining span
/// at its first occurrence.
struct AnchorRule {
    name: &'static str,
    pattern: &'static LazyLock<Regex>,
}

impl AnchorRule {
    /// Returns `(before, after)` around the first match, consuming the
    /// anchor text itself.
    fn split<'a>(&self, span: &'a str) -> Result<(&'a str, &'a str), FatwaError> {
        match self.pattern.find(span) {
            Some(found) => Ok((&span[..found.start()], &span[found.end()..])),
            None => Err(FatwaError::Anchor(self.name)),
        }
    }
}

static TITLE_RULE: AnchorRule = AnchorRule {
    name: "question-title",
    pattern: &QUESTION_TITLE,
};
static ANSWER_START_RULE: AnchorRule = AnchorRule {
    name: "answer-start",
    pattern: &ANSWER_START_RE,
};
static ANSWER_END_RULE: AnchorRule = AnchorRule {
    name: "answer-end",
    pattern: &ANSWER_END_RE,
};

/// Question and answer fields recovered from one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFields {
    pub question: String,
    pub answer: String,
}

/// Splits page text into question and answer using the anchor cascade.
///
/// The input is re-normalized defensively; [`normalize::normalize`] is
/// idempotent so already-canonical text passes through untouched.  Fails
/// with [`FatwaError::Anchor`] naming the first rule that never matched.
pub fn parse(page_text: &str) -> Result<ParsedFields, FatwaError> {
    let text = normalize::normalize(page_text);

    let (_, after_title) = TITLE_RULE.split(&text)?;
    let (question_region, answer_span) = ANSWER_START_RULE.split(after_title)?;
    let (answer_body, _) = ANSWER_END_RULE.split(answer_span)?;

    let question = polish_question(question_region);
    // The splitting regex consumed the invocation phrases; downstream
    // consumers expect the full bounded quotation, so both are restored
    // verbatim with their diacritics.
    let answer = format!("{ANSWER_START}{answer_body}{ANSWER_END}")
        .trim()
        .to_string();

    Ok(ParsedFields { question, answer })
}

/// Soft cleanup of the isolated question region.  Absence of any of these
/// markers degrades gracefully — only the three split anchors are hard
/// requirements.
fn polish_question(region: &str) -> String {
    let without_label = region.replace(ANSWER_LABEL, "");
    let without_tasmiya = TASMIYA.replace_all(&without_label, "");
    let span: &str = without_tasmiya.as_ref();
    let span = match span.find(QUESTION_LABEL) {
        Some(pos) => &span[pos + QUESTION_LABEL.len()..],
        None => span,
    };
    span.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_page() -> String {
        [
            "فتوی نمبر 1234",
            "دارالافتاء اہلسنت",
            "سوال: کیا نماز میں سورہ فاتحہ پڑھنا ضروری ہے؟",
            "جواب",
            "بِسْمِ اللہِ الرَّحْمٰنِ الرَّحِیْمِ",
            "اَلْجَوَابُ بِعَوْنِ الْمَلِکِ الْوَھَّابِ",
            "نماز میں سورہ فاتحہ پڑھنا واجب ہے۔",
            "وَاللہُ اَعْلَمُ عَزَّوَجَلَّ وَرَسُوْلُہ اَعْلَم صَلَّی اللہُ تَعَالٰی عَلَیْہِ وَاٰلِہٖ وَسَلَّم",
        ]
        .join(" ")
    }

    #[test]
    fn parses_well_formed_page() {
        let fields = parse(&sample_page()).unwrap();
        assert_eq!(fields.question, ": کیا نماز میں سورہ فاتحہ پڑھنا ضروری ہے؟");
        assert_eq!(
            fields.answer,
            format!("{ANSWER_START} نماز میں سورہ فاتحہ پڑھنا واجب ہے۔ {ANSWER_END}")
        );
    }

    #[test]
    fn question_label_cut_and_tasmiya_removed() {
        let fields = parse(&sample_page()).unwrap();
        assert!(!fields.question.contains("بسم"));
        assert!(!fields.question.contains(ANSWER_LABEL));
        assert!(!fields.question.contains(QUESTION_LABEL));
    }

    #[test]
    fn title_anchor_tolerates_diacritics() {
        let diacritized =
            sample_page().replace("دارالافتاء اہلسنت", "دَارُالاِفتَاء اَہلِسُنَّت");
        let fields = parse(&diacritized).unwrap();
        assert!(fields.question.contains("نماز"));
    }

    #[test]
    fn missing_title_is_named_failure() {
        let page = sample_page().replace("دارالافتاء اہلسنت", "");
        match parse(&page) {
            Err(FatwaError::Anchor(name)) => assert_eq!(name, "question-title"),
            other => panic!("expected anchor failure, got {other:?}"),
        }
    }

    #[test]
    fn missing_answer_start_is_named_failure() {
        let page = sample_page().replace("اَلْجَوَابُ بِعَوْنِ الْمَلِکِ الْوَھَّابِ", "");
        match parse(&page) {
            Err(FatwaError::Anchor(name)) => assert_eq!(name, "answer-start"),
            other => panic!("expected anchor failure, got {other:?}"),
        }
    }

    #[test]
    fn missing_answer_end_produces_no_partial_record() {
        let page = sample_page().replace(
            "وَاللہُ اَعْلَمُ عَزَّوَجَلَّ وَرَسُوْلُہ اَعْلَم صَلَّی اللہُ تَعَالٰی عَلَیْہِ وَاٰلِہٖ وَسَلَّم",
            "",
        );
        match parse(&page) {
            Err(FatwaError::Anchor(name)) => assert_eq!(name, "answer-end"),
            other => panic!("expected anchor failure, got {other:?}"),
        }
    }

    #[test]
    fn first_occurrence_wins_on_duplicate_anchors() {
        // A second answer-start phrase inside the answer body must stay in
        // the answer; only the first split boundary is honored.
        let page = sample_page().replace(
            "نماز میں سورہ فاتحہ پڑھنا واجب ہے۔",
            "پہلا حصہ الجواب بعون الملک الوھاب دوسرا حصہ",
        );
        let fields = parse(&page).unwrap();
        assert!(fields.answer.contains("پہلا حصہ"));
        assert!(fields.answer.contains("دوسرا حصہ"));
        assert!(fields.answer.contains("الجواب بعون الملک الوھاب"));
    }

    #[test]
    fn absent_question_label_keeps_region_intact() {
        let page = sample_page().replace("سوال: ", "");
        let fields = parse(&page).unwrap();
        assert!(fields.question.contains("کیا نماز"));
    }
}
