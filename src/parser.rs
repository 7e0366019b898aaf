use std::sync::LazyLock;

use regex::Regex;
use tokio::time::Instant;

use crate::models::Item;

static UNAUTHORIZED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"unauthori[sz]ed labour").expect("valid regex"));

/// Extracts per-item seen events from a raw device line.
///
/// Matching is case-insensitive substring matching. A literal "not" anywhere
/// on the line suppresses every monitored-item match, not just the negated
/// one -- "Helmet detected, Vest not detected" yields no events at all. The
/// unauthorized condition is exempt from that suppression.
pub fn parse_line(line: &str, at: Instant) -> Vec<(Item, Instant)> {
    let lower = line.to_lowercase();
    let mut events = Vec::new();

    if mentions_unauthorized(&lower) {
        events.push((Item::UnauthorizedLabourer, at));
    }

    if !lower.contains("not") {
        for item in Item::MONITORED {
            if lower.contains(item.keyword()) {
                events.push((item, at));
            }
        }
    }

    events
}

/// Recognizes "unauthorized/unauthorised labour ... detected" while
/// rejecting "labourer". The `regex` crate has no lookaround, so the "er"
/// rejection is a manual check on the match tail.
fn mentions_unauthorized(lower: &str) -> bool {
    UNAUTHORIZED_RE.find_iter(lower).any(|m| {
        let rest = &lower[m.end()..];
        !rest.starts_with("er") && rest.contains("detected")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(line: &str) -> Vec<Item> {
        parse_line(line, Instant::now())
            .into_iter()
            .map(|(item, _)| item)
            .collect()
    }

    #[test]
    fn monitored_item_emits_seen_event() {
        assert_eq!(items("Helmet detected"), vec![Item::Helmet]);
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert_eq!(items("HELMET DETECTED"), vec![Item::Helmet]);
    }

    #[test]
    fn multiple_items_on_one_line() {
        assert_eq!(
            items("Helmet detected, Goggle detected, Vest detected"),
            vec![Item::Helmet, Item::Goggle, Item::Vest]
        );
    }

    #[test]
    fn not_suppresses_every_item_on_the_line() {
        // The negation heuristic is whole-line: the mentioned-as-present
        // helmet is suppressed along with the negated vest.
        assert!(items("Helmet detected, Vest not detected").is_empty());
    }

    #[test]
    fn unrelated_line_emits_nothing() {
        assert!(items("device booted, firmware 1.2.3").is_empty());
    }

    #[test]
    fn unauthorized_labour_detected_matches() {
        assert_eq!(
            items("Unauthorized Labour intrusion detected"),
            vec![Item::UnauthorizedLabourer]
        );
    }

    #[test]
    fn unauthorised_british_spelling_matches() {
        assert_eq!(
            items("unauthorised labour detected"),
            vec![Item::UnauthorizedLabourer]
        );
    }

    #[test]
    fn unauthorized_labourer_does_not_match() {
        assert!(items("unauthorized labourer detected").is_empty());
    }

    #[test]
    fn unauthorized_without_detected_does_not_match() {
        assert!(items("unauthorized labour on site").is_empty());
    }

    #[test]
    fn not_does_not_suppress_the_unauthorized_condition() {
        assert_eq!(
            items("helmet not detected, unauthorized labour detected"),
            vec![Item::UnauthorizedLabourer]
        );
    }
}
