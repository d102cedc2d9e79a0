//! Answer extraction and line-level recovery.

use tracing::warn;

const OPEN_TAG: &str = "<answer>";
const CLOSE_TAG: &str = "</answer>";

/// Narration markers that disqualify a line during recovery. Compared
/// against the trimmed, upper-cased line.
const BANNED_PREFIXES: [&str; 5] = [
    "WE NEED TO",
    "I WILL NOW",
    "LET'S CALL",
    "FOLLOWING THE",
    "STEP 1",
];

/// ASCII case-insensitive reverse search within `text[..end]`.
///
/// Both tags are pure ASCII, so a byte-window match always lands on a
/// char boundary even in non-ASCII output.
fn rfind_ascii_ci(text: &str, needle: &str, end: usize) -> Option<usize> {
    let hay = &text.as_bytes()[..end];
    let needle = needle.as_bytes();
    if needle.len() > hay.len() {
        return None;
    }
    (0..=hay.len() - needle.len())
        .rev()
        .find(|&i| hay[i..i + needle.len()].eq_ignore_ascii_case(needle))
}

/// Locate the last well-formed answer block, scanning backward: the
/// final closing tag first, then the nearest opening tag before it.
/// The span is inclusive of both tags.
pub fn extract_answer_span(text: &str) -> Option<(usize, usize)> {
    let close = rfind_ascii_ci(text, CLOSE_TAG, text.len())?;
    let open = rfind_ascii_ci(text, OPEN_TAG, close)?;
    Some((open, close + CLOSE_TAG.len()))
}

/// Recovery fallback: drop lines that open with a narration marker,
/// keep everything else in original order.
pub fn strip_narration(text: &str) -> String {
    text.lines()
        .filter(|line| {
            let stripped = line.trim().to_uppercase();
            !BANNED_PREFIXES.iter().any(|b| stripped.starts_with(b))
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Reduce raw agent output to the user-facing answer: the last tagged
/// block when one exists, line recovery otherwise.
pub fn clean_response(text: &str) -> String {
    if let Some((start, end)) = extract_answer_span(text) {
        return text[start..end].to_string();
    }
    warn!("no answer tag pair found in agent output");
    strip_narration(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_single_block_inclusive_of_tags() {
        let raw = "noise before <answer>42 units</answer> noise after";
        assert_eq!(clean_response(raw), "<answer>42 units</answer>");
    }

    #[test]
    fn last_pair_wins_over_earlier_pairs() {
        let raw = "<answer>draft</answer> more thinking <answer>final</answer>";
        assert_eq!(clean_response(raw), "<answer>final</answer>");
    }

    #[test]
    fn tag_matching_is_case_insensitive() {
        let raw = "<ANSWER>Result</Answer>";
        assert_eq!(clean_response(raw), "<ANSWER>Result</Answer>");
    }

    #[test]
    fn nested_open_tags_take_the_innermost() {
        // Backward scan from the close tag finds the nearest open tag.
        let raw = "<answer>outer <answer>inner</answer>";
        assert_eq!(clean_response(raw), "<answer>inner</answer>");
    }

    #[test]
    fn unterminated_tag_falls_back_to_recovery() {
        let raw = "We need to call the tool\n<answer>never closed\nHere is the data";
        let cleaned = clean_response(raw);
        assert!(!cleaned.contains("We need to call"));
        assert!(cleaned.contains("Here is the data"));
        assert!(cleaned.contains("<answer>never closed"));
    }

    #[test]
    fn close_without_open_falls_back_to_recovery() {
        let raw = "Step 1: inspect\nTotal: 7</answer>";
        assert_eq!(clean_response(raw), "Total: 7</answer>");
    }

    #[test]
    fn open_tag_after_close_is_not_a_pair() {
        assert!(extract_answer_span("</answer> then <answer>").is_none());
    }

    #[test]
    fn recovery_drops_every_banned_line_and_keeps_order() {
        let raw = "we need to inspect first\n\
                   The top region is West.\n\
                   I will now summarize\n\
                   Following the plan, done.\n\
                   let's call it a day\n\
                   step 1 was easy\n\
                   | region | total |";
        assert_eq!(
            strip_narration(raw),
            "The top region is West.\n| region | total |"
        );
    }

    #[test]
    fn recovery_trims_surrounding_whitespace() {
        assert_eq!(strip_narration("\n\n  hello  \n\n"), "hello");
    }

    #[test]
    fn non_ascii_output_does_not_break_scanning() {
        let raw = "préambule — <answer>Résultat: 42 €</answer>";
        assert_eq!(clean_response(raw), "<answer>Résultat: 42 €</answer>");
    }
}
