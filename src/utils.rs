use crate::dsl::Scalar;

/// Strip one pair of matching surrounding quotes.
pub fn strip_quotes(text: &str) -> &str {
    let trimmed = text.trim();
    let bytes = trimmed.as_bytes();
    if bytes.len() >= 2
        && (bytes[0] == b'\'' || bytes[0] == b'"')
        && bytes[bytes.len() - 1] == bytes[0]
    {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    }
}

/// Numeric coercion for literal text: an `i64`, or an `f64` whose rendering
/// is the text itself. Anything else stays a string, so `1E5`, `1.0` and
/// out-of-range integers keep their spelling.
pub fn coerce_scalar(text: &str) -> Scalar {
    let trimmed = text.trim();
    if let Ok(i) = trimmed.parse::<i64>() {
        return Scalar::Int(i);
    }
    if looks_decimal(trimmed)
        && let Ok(n) = trimmed.parse::<f64>()
        && n.to_string() == trimmed
    {
        return Scalar::Float(n);
    }
    Scalar::Str(trimmed.to_string())
}

// f64::from_str also accepts "inf" and "NaN", which are valid field names.
fn looks_decimal(text: &str) -> bool {
    text.contains('.') && text.chars().all(|c| c.is_ascii_digit() || matches!(c, '-' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_quotes_removes_matching_pair() {
        assert_eq!(strip_quotes("'abc'"), "abc");
        assert_eq!(strip_quotes("\"abc\""), "abc");
        assert_eq!(strip_quotes("  'x' "), "x");
        assert_eq!(strip_quotes("''"), "");
    }

    #[test]
    fn strip_quotes_leaves_unbalanced_text() {
        assert_eq!(strip_quotes("'abc\""), "'abc\"");
        assert_eq!(strip_quotes("'"), "'");
        assert_eq!(strip_quotes("plain"), "plain");
    }

    #[test]
    fn coerce_scalar_prefers_integers() {
        assert_eq!(coerce_scalar("42"), Scalar::Int(42));
        assert_eq!(coerce_scalar(" -7 "), Scalar::Int(-7));
        assert_eq!(coerce_scalar("2.5"), Scalar::Float(2.5));
        assert_eq!(coerce_scalar("-0.125"), Scalar::Float(-0.125));
    }

    #[test]
    fn coerce_scalar_keeps_spelling_of_lossy_numbers() {
        assert_eq!(coerce_scalar("1E5"), Scalar::Str("1E5".into()));
        assert_eq!(coerce_scalar("1e400"), Scalar::Str("1e400".into()));
        assert_eq!(coerce_scalar("1.0"), Scalar::Str("1.0".into()));
        assert_eq!(coerce_scalar("0.10"), Scalar::Str("0.10".into()));
        assert_eq!(
            coerce_scalar("99999999999999999999"),
            Scalar::Str("99999999999999999999".into())
        );
    }

    #[test]
    fn coerce_scalar_keeps_words() {
        assert_eq!(coerce_scalar("inf"), Scalar::Str("inf".into()));
        assert_eq!(coerce_scalar("NaN"), Scalar::Str("NaN".into()));
        assert_eq!(coerce_scalar("True"), Scalar::Str("True".into()));
        assert_eq!(coerce_scalar("%s"), Scalar::Str("%s".into()));
        assert_eq!(coerce_scalar("1-2"), Scalar::Str("1-2".into()));
    }
}
