//! Answer parser — raw responder text → structured risk record.
//!
//! Pure transformation. Extraction order: identifier echo, risk label,
//! risk code + adjoining reason, "as of" date. Anything not found is left
//! absent; an unrecognised risk label yields [`RiskLevel::Unknown`]. The
//! parser never fails — worst case is an all-absent record with the cleaned
//! text preserved in `raw`.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

// ── Risk level ───────────────────────────────────────────────────────────────

/// Fixed classification outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    High,
    Medium,
    Low,
    None,
    Unknown,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::High => "high",
            RiskLevel::Medium => "medium",
            RiskLevel::Low => "low",
            RiskLevel::None => "none",
            RiskLevel::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered prefix table mapping responder labels to [`RiskLevel`].
/// Matched case-insensitively, first entry wins — order is significant.
const RISK_TABLE: [(&str, RiskLevel); 4] = [
    ("высок", RiskLevel::High),
    ("средн", RiskLevel::Medium),
    ("низк", RiskLevel::Low),
    ("отсут", RiskLevel::None),
];

// ── Parsed result ────────────────────────────────────────────────────────────

/// Structured fields extracted from one collected reply.
///
/// Never mutated after creation — a later re-query produces a new record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedResult {
    /// Identifier as echoed by the responder — may differ from the query.
    pub inn: Option<String>,
    pub risk: RiskLevel,
    /// Original-language risk label, capitalised as received.
    pub risk_ru: Option<String>,
    /// Short risk code, when the responder includes one.
    pub risk_code: Option<String>,
    /// Free-text reason adjoining the risk code.
    pub reason: Option<String>,
    /// "As of" date, normalised to a calendar day.
    pub checked_on: Option<NaiveDate>,
    /// Full cleaned reply text.
    pub raw: String,
}

// ── Patterns ─────────────────────────────────────────────────────────────────

static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// The responder echoes the subject as `… | <inn>`.
static INN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\|\s*(\d{10,12})").unwrap());

static RISK_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)уровень\s+риска.*?(Высокий|Средний|Низкий|Отсутствует)").unwrap()
});

static CODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)код\s*(?:риска|причины)?\s*[:№]?\s*([0-9]{1,3}(?:\.[0-9]{1,3})*)").unwrap()
});

static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{2}\.\d{2}\.\d{4})\b").unwrap());

// ── parse ────────────────────────────────────────────────────────────────────

/// Parse one collected reply into a [`ParsedResult`].
pub fn parse(raw: &str) -> ParsedResult {
    let text = WS_RE.replace_all(raw, " ").trim().to_string();

    let inn = INN_RE.captures(&text).map(|c| c[1].to_string());

    let risk_ru = RISK_LABEL_RE.captures(&text).map(|c| capitalize(&c[1]));
    let risk = risk_ru
        .as_deref()
        .map(lookup_risk)
        .unwrap_or(RiskLevel::Unknown);

    let (risk_code, reason) = extract_code_and_reason(&text);
    let checked_on = extract_date(&text);

    ParsedResult {
        inn,
        risk,
        risk_ru,
        risk_code,
        reason,
        checked_on,
        raw: text,
    }
}

/// Map a risk label through [`RISK_TABLE`] — first matching prefix wins.
fn lookup_risk(label: &str) -> RiskLevel {
    let lower = label.to_lowercase();
    for (prefix, level) in RISK_TABLE {
        if lower.starts_with(prefix) {
            return level;
        }
    }
    RiskLevel::Unknown
}

/// Risk code plus the free text adjoining it, cut at the next sentence
/// or field boundary.
fn extract_code_and_reason(text: &str) -> (Option<String>, Option<String>) {
    let Some(caps) = CODE_RE.captures(text) else {
        return (None, None);
    };
    let code = caps.get(1).map(|m| m.as_str().to_string());

    let tail = &text[caps.get(0).map(|m| m.end()).unwrap_or(text.len())..];
    let tail = tail.trim_start_matches(|c: char| {
        c.is_whitespace() || matches!(c, '-' | '—' | '–' | ':' | ',')
    });
    let cut = tail.find(['.', '|']).unwrap_or(tail.len());
    let reason = tail[..cut].trim();
    let reason = (!reason.is_empty()).then(|| reason.to_string());

    (code, reason)
}

/// First `DD.MM.YYYY` token that is a real calendar date.
fn extract_date(text: &str) -> Option<NaiveDate> {
    DATE_RE
        .captures_iter(text)
        .filter_map(|c| NaiveDate::parse_from_str(&c[1], "%d.%m.%Y").ok())
        .next()
}

/// First char uppercased, the rest lowercased — matches how the responder's
/// labels are stored in the latest records.
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_reply_parses() {
        let raw = "🔎 Проверка | 7712345678\n\
                   Уровень риска: Высокий\n\
                   Код: 14.11 — сомнительные операции.\n\
                   По состоянию на 05.08.2026";
        let r = parse(raw);
        assert_eq!(r.inn.as_deref(), Some("7712345678"));
        assert_eq!(r.risk, RiskLevel::High);
        assert_eq!(r.risk_ru.as_deref(), Some("Высокий"));
        assert_eq!(r.risk_code.as_deref(), Some("14.11"));
        assert_eq!(r.reason.as_deref(), Some("сомнительные операции"));
        assert_eq!(r.checked_on, NaiveDate::from_ymd_opt(2026, 8, 5));
    }

    #[test]
    fn whitespace_is_collapsed() {
        let r = parse("Уровень   риска:\n\n  Низкий");
        assert_eq!(r.raw, "Уровень риска: Низкий");
        assert_eq!(r.risk, RiskLevel::Low);
    }

    #[test]
    fn label_match_is_case_insensitive() {
        let r = parse("УРОВЕНЬ РИСКА: НИЗКИЙ");
        assert_eq!(r.risk, RiskLevel::Low);
        assert_eq!(r.risk_ru.as_deref(), Some("Низкий"));
    }

    #[test]
    fn absent_label_maps_to_none_level() {
        let r = parse("Компания | 123456789012 уровень риска: Отсутствует");
        assert_eq!(r.risk, RiskLevel::None);
        assert_eq!(r.inn.as_deref(), Some("123456789012"));
    }

    #[test]
    fn medium_label() {
        let r = parse("уровень риска — Средний");
        assert_eq!(r.risk, RiskLevel::Medium);
    }

    #[test]
    fn unrecognisable_text_yields_unknown() {
        let r = parse("добрый день, бот временно недоступен");
        assert_eq!(r.risk, RiskLevel::Unknown);
        assert!(r.inn.is_none());
        assert!(r.risk_ru.is_none());
        assert!(r.risk_code.is_none());
        assert!(r.reason.is_none());
        assert!(r.checked_on.is_none());
        assert_eq!(r.raw, "добрый день, бот временно недоступен");
    }

    #[test]
    fn empty_input_does_not_panic() {
        let r = parse("");
        assert_eq!(r.risk, RiskLevel::Unknown);
        assert_eq!(r.raw, "");
    }

    #[test]
    fn code_without_reason() {
        let r = parse("Уровень риска: Средний. Код 3.");
        assert_eq!(r.risk_code.as_deref(), Some("3"));
        assert!(r.reason.is_none());
    }

    #[test]
    fn invalid_date_is_skipped() {
        // 99.99.2024 is not a calendar date; the later token is.
        let r = parse("данные 99.99.2024 обновлены 01.02.2024");
        assert_eq!(r.checked_on, NaiveDate::from_ymd_opt(2024, 2, 1));
    }

    #[test]
    fn risk_serializes_lowercase() {
        let r = parse("уровень риска: Высокий");
        let json = serde_json::to_string(&r).unwrap();
        assert!(json.contains("\"risk\":\"high\""));
        let back: ParsedResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back.risk, RiskLevel::High);
    }

    #[test]
    fn prefix_table_order_is_stable() {
        // Guards the ordered-table contract: each vocabulary entry must keep
        // resolving through its own prefix.
        assert_eq!(lookup_risk("Высокий"), RiskLevel::High);
        assert_eq!(lookup_risk("Средний"), RiskLevel::Medium);
        assert_eq!(lookup_risk("Низкий"), RiskLevel::Low);
        assert_eq!(lookup_risk("Отсутствует"), RiskLevel::None);
        assert_eq!(lookup_risk("что-то ещё"), RiskLevel::Unknown);
    }
}
