//! Cleanup of ids, names and credit values coming out of table extraction.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static ASCII_LETTER: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z]").unwrap());
static ASCII_DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]").unwrap());

/// Official course codes mix letters and digits (`CSE101`). Anything else
/// is a placeholder, usually the course name standing in for a code.
pub fn is_real_id(text: &str) -> bool {
    ASCII_LETTER.is_match(text) && ASCII_DIGIT.is_match(text)
}

/// Drop footnote markers and everything after them.
fn strip_annotations(raw: &str) -> &str {
    let head = raw.split('※').next().unwrap_or(raw);
    head.split('*').next().unwrap_or(head)
}

pub fn clean_subject_id(raw: &str) -> String {
    strip_annotations(raw).replace('\n', "").trim().to_string()
}

/// Footnotes removed, line breaks turned into spaces, runs of whitespace
/// collapsed.
pub fn clean_subject_name(raw: &str) -> String {
    strip_annotations(raw)
        .replace('\n', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Name with all whitespace removed, for comparisons.
pub fn compact(name: &str) -> String {
    name.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Text of a scalar JSON value. Numbers are rendered, blanks are `None`.
pub fn value_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Whole credits from a number or numeric string; anything else is 0.
/// Composite schemes like `"3/12"` go to the credit note instead.
pub fn parse_credits(value: Option<&Value>) -> u32 {
    match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.trunc() as u64))
            .and_then(|c| u32::try_from(c).ok())
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

/// Like [`parse_credits`], but blanks and unreadable values stay `None`
/// so a missing figure is not mistaken for a zero requirement.
pub fn parse_optional_credits(value: Option<&Value>) -> Option<u32> {
    match value? {
        Value::Number(_) => Some(parse_credits(value)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Year from a number or numeric string.
pub fn parse_year(value: Option<&Value>) -> Option<i32> {
    match value? {
        Value::Number(n) => n.as_i64().and_then(|y| i32::try_from(y).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_is_real_id() {
        assert!(is_real_id("CSE101"));
        assert!(is_real_id("swcon2"));
        assert!(!is_real_id("자료구조"));
        assert!(!is_real_id("CSE"));
        assert!(!is_real_id("101"));
        assert!(!is_real_id("캡스톤디자인1"));
        assert!(!is_real_id(""));
    }

    #[test]
    fn test_clean_subject_fields() {
        assert_eq!(clean_subject_id("CSE\n101 ※2023 폐지"), "CSE101");
        assert_eq!(clean_subject_id(" AI201* "), "AI201");
        assert_eq!(clean_subject_name("자료\n구조  *비고"), "자료 구조");
        assert_eq!(clean_subject_name("  운영   체제 "), "운영 체제");
        assert_eq!(compact("운영 체 제"), "운영체제");
    }

    #[test]
    fn test_parse_credits() {
        assert_eq!(parse_credits(Some(&json!(3))), 3);
        assert_eq!(parse_credits(Some(&json!("3"))), 3);
        assert_eq!(parse_credits(Some(&json!(3.0))), 3);
        assert_eq!(parse_credits(Some(&json!("3/12"))), 0);
        assert_eq!(parse_credits(Some(&json!(-1))), 0);
        assert_eq!(parse_credits(Some(&Value::Null)), 0);
        assert_eq!(parse_credits(None), 0);
    }

    #[test]
    fn test_parse_optional_credits() {
        assert_eq!(parse_optional_credits(Some(&json!(42))), Some(42));
        assert_eq!(parse_optional_credits(Some(&json!(" 42 "))), Some(42));
        assert_eq!(parse_optional_credits(Some(&json!("없음"))), None);
        assert_eq!(parse_optional_credits(Some(&Value::Null)), None);
        assert_eq!(parse_optional_credits(None), None);
    }

    #[test]
    fn test_value_text_and_year() {
        assert_eq!(value_text(&json!(" CSE101 ")), Some("CSE101".into()));
        assert_eq!(value_text(&json!(2025)), Some("2025".into()));
        assert_eq!(value_text(&json!("  ")), None);
        assert_eq!(value_text(&json!(null)), None);
        assert_eq!(parse_year(Some(&json!("2024"))), Some(2024));
        assert_eq!(parse_year(Some(&json!(2025))), Some(2025));
        assert_eq!(parse_year(Some(&json!("올해"))), None);
    }
}
