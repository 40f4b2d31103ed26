//! Cheapest-dormitory answers.

use crate::agent::router::IntentRouter;
use crate::models::{positive, Dormitory};

/// How many dormitories a cheapest-price answer lists.
pub const TOP_N: usize = 3;

/// Outcome of a cheapest-price lookup.
///
/// `MatchedNoData` is kept apart from `NotMatched` so callers can say
/// "no pricing data" instead of silently trying another handler.
#[derive(Debug, Clone, PartialEq)]
pub enum CheapestAnswer<'a> {
    NotMatched,
    MatchedNoData,
    Matched(Vec<&'a Dormitory>),
}

impl CheapestAnswer<'_> {
    /// Render the ranked list, or `None` for both no-match cases.
    pub fn into_reply(self) -> Option<String> {
        match self {
            Self::Matched(top) => Some(format_ranking(&top)),
            Self::NotMatched | Self::MatchedNoData => None,
        }
    }
}

/// Answer "which dormitory is cheapest" questions.
///
/// Pure function over its inputs: classify, rank by comparable price with a
/// stable ascending sort, keep the first [`TOP_N`] priced dormitories.
pub fn answer_cheapest_dorm_query<'a>(message: &str, dorms: &'a [Dormitory]) -> CheapestAnswer<'a> {
    if !IntentRouter::is_cheapest_query(message) {
        return CheapestAnswer::NotMatched;
    }

    let top = rank_by_price(dorms, TOP_N);
    if top.is_empty() {
        CheapestAnswer::MatchedNoData
    } else {
        CheapestAnswer::Matched(top)
    }
}

/// Priced dormitories in ascending comparable-price order, at most `limit`.
pub fn rank_by_price(dorms: &[Dormitory], limit: usize) -> Vec<&Dormitory> {
    let mut ranked: Vec<(f64, &Dormitory)> = dorms
        .iter()
        .map(|d| (d.comparable_price(), d))
        .filter(|(price, _)| price.is_finite())
        .collect();

    // `sort_by` is stable, so equal prices keep their input order.
    ranked.sort_by(|a, b| a.0.total_cmp(&b.0));

    ranked.into_iter().take(limit).map(|(_, d)| d).collect()
}

pub fn format_ranking(top: &[&Dormitory]) -> String {
    let mut out = format!("หอพักที่ราคาถูกที่สุด {} อันดับ:", top.len());

    for (i, dorm) in top.iter().enumerate() {
        out.push_str(&format!("\n{}. {}", i + 1, dorm.name));
        for (label, price) in [
            ("รายวัน", dorm.price_daily),
            ("รายเดือน", dorm.price_monthly),
            ("รายเทอม", dorm.price_term),
        ] {
            if let Some(value) = positive(price) {
                out.push_str(&format!("\n   - {}: {} บาท", label, format_baht(value)));
            }
        }
    }

    out
}

/// Format a price with thousands separators, e.g. `12500.0` → `"12,500"`.
///
/// Fractional baht are kept to two places only when present.
pub fn format_baht(amount: f64) -> String {
    let rounded = (amount * 100.0).round() / 100.0;
    let whole = rounded.trunc() as i64;
    let cents = ((rounded - rounded.trunc()).abs() * 100.0).round() as i64;

    let digits = whole.abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if whole < 0 { "-" } else { "" };
    if cents > 0 {
        format!("{}{}.{:02}", sign, grouped, cents)
    } else {
        format!("{}{}", sign, grouped)
    }
}
