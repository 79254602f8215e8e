//! Text mini-language for restrictions.
//!
//! A token such as `>=2020-01-01`, `(A,B)`, `10 & 20`, `%pend%` or
//! `>=1;<5` is classified by trying [`RULES`] in order and keeping the
//! first operator whose pattern matches. Rule order follows
//! [`Operator::ALL`], so `<=` is tried before `<` and every LIKE form is
//! tried before plain `=`.

use super::operator::{Operator, OperatorCategory, ValueShape};
use super::restriction::{Restriction, RestrictionValue};
use crate::coerce::parse_literal;
use crate::config::DateFormats;
use crate::error::Error;
use regex::{Captures, Regex};
use sift_proto::Value;
use std::sync::LazyLock;

/// Operators with a text form, in the order they are tried.
pub const RULES: &[(Operator, &str)] = &[
    (Operator::IsNull, r"(?i)^null$"),
    (Operator::IsNotNull, r"(?i)^not\s+null$"),
    (Operator::Multi, r"^[^;]+(?:;[^;]+)+$"),
    (Operator::NotEqual, r"^!=(.+)$"),
    (Operator::LessThanOrEqualTo, r"^<=(.+)$"),
    (Operator::LessThan, r"^<(.+)$"),
    (Operator::GreaterThanOrEqualTo, r"^>=(.+)$"),
    (Operator::GreaterThan, r"^>(.+)$"),
    (Operator::NotIn, r"^!\((.+)\)$"),
    (Operator::In, r"^\((.+)\)$"),
    (Operator::Between, r"^(.+?)\s*&\s*(.+)$"),
    (Operator::LikeExactMatch, r"^=%(.+)$"),
    (Operator::NotLikeExactMatch, r"^!%(.+)$"),
    (Operator::LikeMatchAnywhere, r"^%(.+)%$"),
    (Operator::LikeMatchEnd, r"^%(.+)$"),
    (Operator::LikeMatchStart, r"^(.+)%$"),
    (Operator::ILikeExactMatch, r"^=\*(.+)$"),
    (Operator::NotILikeExactMatch, r"^!\*(.+)$"),
    (Operator::ILikeMatchAnywhere, r"^\*(.+)\*$"),
    (Operator::ILikeMatchEnd, r"^\*(.+)$"),
    (Operator::ILikeMatchStart, r"^(.+)\*$"),
    (Operator::Equal, r"^=(.+)$"),
];

/// Compiled [`RULES`].
///
/// # Panics
///
/// Panics if a hard-coded pattern is invalid (impossible in practice).
#[allow(clippy::expect_used)]
static COMPILED: LazyLock<Vec<(Operator, Regex)>> = LazyLock::new(|| {
    RULES
        .iter()
        .map(|(op, pattern)| (*op, Regex::new(pattern).expect("valid regex literal")))
        .collect()
});

/// Categories a clause of a multi restriction may use.
const MULTI_CLAUSE_CATEGORIES: &[OperatorCategory] =
    &[OperatorCategory::Equality, OperatorCategory::Comparison];

/// Check if an operator has a text form.
pub fn has_text_form(operator: Operator) -> bool {
    RULES.iter().any(|(op, _)| *op == operator)
}

/// Classify a token, trying only operators in the whitelisted categories.
///
/// Returns `Ok(None)` when nothing matches.
pub fn classify(
    path: &str,
    token: &str,
    categories: &[OperatorCategory],
    formats: &DateFormats,
) -> Result<Option<Vec<Restriction>>, Error> {
    let token = token.trim();
    for (operator, regex) in COMPILED.iter() {
        if !categories.contains(&operator.category()) {
            continue;
        }
        let Some(caps) = regex.captures(token) else {
            continue;
        };
        if let Some(restrictions) = build(path, *operator, token, &caps, formats)? {
            return Ok(Some(restrictions));
        }
    }
    Ok(None)
}

/// Read a token as the given operator.
///
/// The operator's own pattern is tried first; failing that, the whole token
/// is taken as the operator's literal when the operator takes one.
pub fn parse_as(
    path: &str,
    operator: Operator,
    token: &str,
    formats: &DateFormats,
) -> Result<Option<Vec<Restriction>>, Error> {
    let token = token.trim();
    if token.is_empty() {
        return Ok(None);
    }

    if let Some((_, regex)) = COMPILED.iter().find(|(op, _)| *op == operator) {
        if let Some(caps) = regex.captures(token) {
            if let Some(restrictions) = build(path, operator, token, &caps, formats)? {
                return Ok(Some(restrictions));
            }
        }
    }

    let (value, text) = match operator.value_shape() {
        ValueShape::Scalar => scalar_value(operator, token, formats),
        ValueShape::List => match list_values(token, formats) {
            Some(parsed) => parsed,
            None => return Ok(None),
        },
        ValueShape::Text => return parse_multi(path, token, formats),
        ValueShape::None | ValueShape::Range | ValueShape::Path => return Ok(None),
    };
    Ok(Some(vec![Restriction::new(path, operator, value)?.with_text(text)]))
}

fn build(
    path: &str,
    operator: Operator,
    token: &str,
    caps: &Captures<'_>,
    formats: &DateFormats,
) -> Result<Option<Vec<Restriction>>, Error> {
    let first = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();

    let (value, text) = match operator.value_shape() {
        ValueShape::None => return Ok(Some(vec![Restriction::null_check(operator)])),
        ValueShape::Text => return parse_multi(path, token, formats),
        ValueShape::Path => return Ok(None),
        ValueShape::Scalar => {
            if first.is_empty() {
                return Ok(None);
            }
            scalar_value(operator, first, formats)
        }
        ValueShape::List => match list_values(first, formats) {
            Some(parsed) => parsed,
            None => return Ok(None),
        },
        ValueShape::Range => {
            let second = caps.get(2).map(|m| m.as_str().trim()).unwrap_or_default();
            if first.is_empty() || second.is_empty() {
                return Ok(None);
            }
            let low = parse_literal(first, formats).value;
            let high = parse_literal(second, formats).end_of_day();
            (
                RestrictionValue::Range(low, high),
                RestrictionValue::Range(first.into(), second.into()),
            )
        }
    };

    Ok(Some(vec![Restriction::new(path, operator, value)?.with_text(text)]))
}

/// Typed literal of a single-valued operator and its text. Ordering
/// comparisons read typed literals, upper bounds on a bare date move to the
/// end of that day.
fn scalar_value(
    operator: Operator,
    text: &str,
    formats: &DateFormats,
) -> (RestrictionValue, RestrictionValue) {
    let value = match operator {
        Operator::LessThan | Operator::LessThanOrEqualTo => {
            parse_literal(text, formats).end_of_day()
        }
        Operator::GreaterThan | Operator::GreaterThanOrEqualTo => {
            parse_literal(text, formats).value
        }
        _ => Value::String(text.to_string()),
    };
    (
        RestrictionValue::Scalar(value),
        RestrictionValue::Scalar(text.into()),
    )
}

/// Typed literals of a comma-separated list and their texts.
fn list_values(
    text: &str,
    formats: &DateFormats,
) -> Option<(RestrictionValue, RestrictionValue)> {
    let items: Vec<&str> = text
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .collect();
    if items.is_empty() {
        return None;
    }
    let values = items
        .iter()
        .map(|item| parse_literal(item, formats).value)
        .collect();
    let texts = items.iter().map(|item| Value::from(*item)).collect();
    Some((RestrictionValue::List(values), RestrictionValue::List(texts)))
}

/// Every `;`-separated clause must be an equality or comparison clause;
/// otherwise the whole token is rejected.
fn parse_multi(
    path: &str,
    token: &str,
    formats: &DateFormats,
) -> Result<Option<Vec<Restriction>>, Error> {
    let mut restrictions = Vec::new();
    for clause in token.split(';') {
        let clause = clause.trim();
        if clause.is_empty() {
            return Ok(None);
        }
        match classify(path, clause, MULTI_CLAUSE_CATEGORIES, formats)? {
            Some(parsed) => restrictions.extend(parsed),
            None => return Ok(None),
        }
    }
    Ok(Some(restrictions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn all(token: &str) -> Option<Vec<Restriction>> {
        classify("field", token, &OperatorCategory::ALL, &DateFormats::default()).unwrap()
    }

    fn single(token: &str) -> Restriction {
        let mut restrictions = all(token).unwrap();
        assert_eq!(restrictions.len(), 1, "token {token:?}");
        restrictions.remove(0)
    }

    fn ts(text: &str) -> Value {
        Value::from_datetime(NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f").unwrap())
    }

    #[test]
    fn test_rules_follow_declaration_order() {
        let positions: Vec<usize> = RULES
            .iter()
            .map(|(op, _)| Operator::ALL.iter().position(|o| o == op).unwrap())
            .collect();
        let mut sorted = positions.clone();
        sorted.sort_unstable();
        assert_eq!(positions, sorted);
        assert!(!has_text_form(Operator::NotLikeMatchAnywhere));
        assert!(!has_text_form(Operator::EqualField));
    }

    #[test]
    fn test_null_checks() {
        assert_eq!(single("null").operator, Operator::IsNull);
        assert_eq!(single(" NULL ").operator, Operator::IsNull);
        assert_eq!(single("not   null").operator, Operator::IsNotNull);
    }

    #[test]
    fn test_comparisons() {
        let r = single(">=2020-01-01");
        assert_eq!(r.operator, Operator::GreaterThanOrEqualTo);
        assert_eq!(r.value, RestrictionValue::Scalar(ts("2020-01-01T00:00:00")));

        let r = single("<=2020-01-01");
        assert_eq!(r.operator, Operator::LessThanOrEqualTo);
        assert_eq!(r.value, RestrictionValue::Scalar(ts("2020-01-01T23:59:59.999")));

        let r = single("<5");
        assert_eq!(r.operator, Operator::LessThan);
        assert_eq!(r.value, RestrictionValue::Scalar(Value::Int64(5)));

        let r = single(">2.5");
        assert_eq!(r.operator, Operator::GreaterThan);
        assert_eq!(r.value, RestrictionValue::Scalar(Value::Float64(2.5)));

        assert_eq!(single("!=x").operator, Operator::NotEqual);
    }

    #[test]
    fn test_membership() {
        let r = single("(A, B ,C)");
        assert_eq!(r.operator, Operator::In);
        assert_eq!(
            r.value,
            RestrictionValue::List(vec!["A".into(), "B".into(), "C".into()])
        );

        let r = single("!(1,2)");
        assert_eq!(r.operator, Operator::NotIn);
        assert_eq!(
            r.value,
            RestrictionValue::List(vec![Value::Int64(1), Value::Int64(2)])
        );
    }

    #[test]
    fn test_token_text_is_kept() {
        let r = single("(01234, 00501)");
        assert_eq!(
            r.value,
            RestrictionValue::List(vec![Value::Int64(1234), Value::Int64(501)])
        );
        assert_eq!(
            r.string_value(),
            &RestrictionValue::List(vec!["01234".into(), "00501".into()])
        );

        let r = single("<=2020-01-01");
        assert_eq!(r.string_value(), &RestrictionValue::Scalar("2020-01-01".into()));

        let r = single("007 & 010");
        assert_eq!(
            r.string_value(),
            &RestrictionValue::Range("007".into(), "010".into())
        );

        assert!(single("null").text.is_none());
    }

    #[test]
    fn test_between_normalizes_end_date() {
        let r = single("2020-01-01 & 2020-12-31");
        assert_eq!(r.operator, Operator::Between);
        assert_eq!(
            r.value,
            RestrictionValue::Range(ts("2020-01-01T00:00:00"), ts("2020-12-31T23:59:59.999"))
        );

        let r = single("10&20");
        assert_eq!(
            r.value,
            RestrictionValue::Range(Value::Int64(10), Value::Int64(20))
        );
    }

    #[test]
    fn test_like_forms() {
        let r = single("%pend%");
        assert_eq!(r.operator, Operator::LikeMatchAnywhere);
        assert_eq!(r.value, RestrictionValue::Scalar("pend".into()));

        assert_eq!(single("%pend").operator, Operator::LikeMatchEnd);
        assert_eq!(single("pend%").operator, Operator::LikeMatchStart);
        assert_eq!(single("=%pend").operator, Operator::LikeExactMatch);
        assert_eq!(single("!%pend").operator, Operator::NotLikeExactMatch);
        assert_eq!(single("*pend*").operator, Operator::ILikeMatchAnywhere);
        assert_eq!(single("*pend").operator, Operator::ILikeMatchEnd);
        assert_eq!(single("pend*").operator, Operator::ILikeMatchStart);
        assert_eq!(single("=*pend").operator, Operator::ILikeExactMatch);
        assert_eq!(single("!*pend").operator, Operator::NotILikeExactMatch);
    }

    #[test]
    fn test_first_match_wins() {
        // `=%abc` fits both LIKE EXACT MATCH and EQUAL; the earlier rule wins.
        let r = single("=%abc");
        assert_eq!(r.operator, Operator::LikeExactMatch);
        assert_eq!(r.value, RestrictionValue::Scalar("abc".into()));

        // With LIKE excluded, the same token falls through to EQUAL.
        let r = classify(
            "field",
            "=%abc",
            &[OperatorCategory::Equality],
            &DateFormats::default(),
        )
        .unwrap()
        .unwrap();
        assert_eq!(r[0].operator, Operator::Equal);
        assert_eq!(r[0].value, RestrictionValue::Scalar("%abc".into()));
    }

    #[test]
    fn test_multi() {
        let rs = all(">=1;<5").unwrap();
        assert_eq!(rs.len(), 2);
        assert_eq!(rs[0].operator, Operator::GreaterThanOrEqualTo);
        assert_eq!(rs[1].operator, Operator::LessThan);

        // A clause outside equality/comparison rejects the multi form,
        // and the token is classified by a later rule instead.
        let r = single("%a;b%");
        assert_eq!(r.operator, Operator::LikeMatchAnywhere);
        assert_eq!(r.value, RestrictionValue::Scalar("a;b".into()));

        assert!(classify("f", "1;2", &[OperatorCategory::Multi], &DateFormats::default())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_whitelist_excludes() {
        let formats = DateFormats::default();
        assert!(classify("f", "null", &[OperatorCategory::Equality], &formats)
            .unwrap()
            .is_none());
        assert!(classify("f", "plain", &OperatorCategory::ALL, &formats)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_parse_as_bare_token() {
        let formats = DateFormats::default();
        let rs = parse_as("status", Operator::LikeMatchAnywhere, "pend", &formats)
            .unwrap()
            .unwrap();
        assert_eq!(rs[0].operator, Operator::LikeMatchAnywhere);
        assert_eq!(rs[0].value, RestrictionValue::Scalar("pend".into()));

        let rs = parse_as("age", Operator::In, "1, 2", &formats).unwrap().unwrap();
        assert_eq!(
            rs[0].value,
            RestrictionValue::List(vec![Value::Int64(1), Value::Int64(2)])
        );

        let rs = parse_as("age", Operator::LessThan, "<9", &formats).unwrap().unwrap();
        assert_eq!(rs[0].value, RestrictionValue::Scalar(Value::Int64(9)));

        assert!(parse_as("age", Operator::Between, "9", &formats).unwrap().is_none());
        assert!(parse_as("age", Operator::IsNull, "x", &formats).unwrap().is_none());
    }
}
