//! Keyword intent router for incoming chat messages.
//!
//! Classifies a chatbot message into an [`Intent`] with ordered rules over
//! the lower-cased text, and pulls out which dormitories the message names.
//! No LLM tokens are spent on routing.

use regex::Regex;
use std::cmp::Reverse;
use std::sync::OnceLock;
use tracing::info;

use crate::models::Dormitory;

/// What the user is asking about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    CheapestPrice,
    DistanceQuery,
    Other,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CheapestPrice => "cheapest_price",
            Self::DistanceQuery => "distance_query",
            Self::Other => "other",
        }
    }
}

/// Marker every cheapest-price question must contain ("dormitory").
///
/// "ถูก" alone also means "correct", so the price keywords only count when
/// the message is about a dormitory.
const DORM_MARKER: &str = "หอ";

fn cheap_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"ราคาถูก|ถูกที่สุด|ถูกสุด|ราคาต่ำ|ราคาน้อย").expect("valid cheap-price regex")
    })
}

fn distance_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"ระยะทาง|ไกล|ใกล้|กี่กิโล|กิโลเมตร|กม|เดินไป|ขับรถ|ปั่นจักรยาน|distance|how far|km\b",
        )
        .expect("valid distance regex")
    })
}

pub struct IntentRouter;

impl IntentRouter {
    /// Classify a message. Rules are checked in order; the first hit wins.
    pub fn classify(message: &str) -> Intent {
        let lower = message.to_lowercase();

        let intent = if Self::is_cheapest_query(&lower) {
            Intent::CheapestPrice
        } else if distance_pattern().is_match(&lower) {
            Intent::DistanceQuery
        } else {
            Intent::Other
        };

        info!(intent = intent.as_str(), "Intent Router classified message");
        intent
    }

    /// Both the cheap-price keyword and the dormitory marker are required.
    pub fn is_cheapest_query(message: &str) -> bool {
        let lower = message.to_lowercase();
        cheap_pattern().is_match(&lower) && lower.contains(DORM_MARKER)
    }

    /// Dormitories named in the message, in order of first appearance.
    ///
    /// When one name contains another ("บ้านสวน" inside "บ้านสวนสวย"), the
    /// longest match at a position claims that span of the message.
    pub fn extract_dorms<'a>(message: &str, dorms: &'a [Dormitory]) -> Vec<&'a Dormitory> {
        let haystack = compact(message);

        let mut hits: Vec<(usize, usize, &Dormitory)> = dorms
            .iter()
            .filter_map(|dorm| {
                let needle = normalize_name(&dorm.name);
                if needle.chars().count() < 2 {
                    return None;
                }
                haystack.find(&needle).map(|pos| (pos, needle.len(), dorm))
            })
            .collect();

        hits.sort_by_key(|&(pos, len, _)| (pos, Reverse(len)));

        let mut claimed_until = 0;
        let mut seen = Vec::new();
        let mut found = Vec::new();
        for (pos, len, dorm) in hits {
            if pos < claimed_until || seen.contains(&dorm.name.as_str()) {
                continue;
            }
            claimed_until = pos + len;
            seen.push(dorm.name.as_str());
            found.push(dorm);
        }
        found
    }
}

/// Lower-case and drop all whitespace.
fn compact(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

/// Strip the generic "หอพัก"/"หอ" prefix so "หอพักสุขใจ" matches "สุขใจ".
fn normalize_name(name: &str) -> String {
    let compacted = compact(name);
    compacted
        .strip_prefix("หอพัก")
        .or_else(|| compacted.strip_prefix(DORM_MARKER))
        .unwrap_or(&compacted)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cheapest_query() {
        assert_eq!(IntentRouter::classify("หอไหนถูกที่สุด"), Intent::CheapestPrice);
        assert_eq!(IntentRouter::classify("อยากได้หอพักราคาถูก"), Intent::CheapestPrice);
    }

    #[test]
    fn test_cheap_word_without_dorm_is_not_price() {
        assert!(!IntentRouter::is_cheapest_query("ถูกต้องไหม"));
        assert!(!IntentRouter::is_cheapest_query("ของราคาถูกที่ไหน"));
        assert_eq!(IntentRouter::classify("ถูกต้องไหม"), Intent::Other);
    }

    #[test]
    fn test_distance_query() {
        assert_eq!(
            IntentRouter::classify("หอสุขใจไปมหาลัยไกลไหม"),
            Intent::DistanceQuery
        );
        assert_eq!(IntentRouter::classify("How far is it?"), Intent::DistanceQuery);
        assert_eq!(IntentRouter::classify("ระยะทางกี่กิโล"), Intent::DistanceQuery);
    }

    #[test]
    fn test_price_rule_wins_over_distance() {
        assert_eq!(
            IntentRouter::classify("หอที่ใกล้และถูกที่สุด"),
            Intent::CheapestPrice
        );
    }

    #[test]
    fn test_general() {
        assert_eq!(IntentRouter::classify("วันนี้อากาศดี"), Intent::Other);
        assert_eq!(IntentRouter::classify("Hello"), Intent::Other);
    }

    #[test]
    fn test_extract_dorms_in_message_order() {
        let dorms = vec![
            Dormitory::new("หอพักสุขใจ"),
            Dormitory::new("Green House"),
            Dormitory::new("บ้านสวน"),
        ];

        let found = IntentRouter::extract_dorms("green house กับ หอสุขใจ ห่างกันเท่าไร", &dorms);
        let names: Vec<_> = found.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Green House", "หอพักสุขใจ"]);
    }

    #[test]
    fn test_extract_dorms_ignores_tiny_names() {
        let dorms = vec![Dormitory::new("หอ A"), Dormitory::new("หอพัก")];
        assert!(IntentRouter::extract_dorms("หอพักไหนดี", &dorms).is_empty());
    }

    #[test]
    fn test_extract_dorms_deduplicates() {
        let dorms = vec![Dormitory::new("บ้านสวน"), Dormitory::new("บ้านสวน")];
        let found = IntentRouter::extract_dorms("บ้านสวน บ้านสวน", &dorms);
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_extract_dorms_prefers_longest_overlapping_name() {
        let dorms = vec![Dormitory::new("บ้านสวน"), Dormitory::new("บ้านสวนสวย")];

        let found = IntentRouter::extract_dorms("บ้านสวนสวยไปมหาวิทยาลัยไกลไหม", &dorms);
        let names: Vec<_> = found.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["บ้านสวนสวย"]);

        let found = IntentRouter::extract_dorms("บ้านสวน กับ บ้านสวนสวย ห่างกันกี่กิโล", &dorms);
        let names: Vec<_> = found.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["บ้านสวน", "บ้านสวนสวย"]);
    }

    #[test]
    fn test_distance_units_without_punctuation() {
        assert_eq!(IntentRouter::classify("ไปมหาลัยกี่กม"), Intent::DistanceQuery);
        assert_eq!(IntentRouter::classify("is it under 5km?"), Intent::DistanceQuery);
        assert_eq!(IntentRouter::classify("ห่าง 3 km ไหม"), Intent::DistanceQuery);
    }
}
