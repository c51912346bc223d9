// SPDX-License-Identifier: Apache-2.0

//! Extraction of typed scalar values from literal tokens.

use chrono::{DateTime, NaiveDateTime, Utc};
use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::Token;

use crate::error::{DriverError, DriverResult};
use crate::fql::Scalar;

/// Converts a literal token into a typed scalar.
///
/// `NONE`/`NULL` map to null, `TRUE`/`FALSE` to booleans, unquoted numbers
/// to integers or floats. Quoted strings stay strings — interior apostrophes
/// included — unless they parse as an ISO-8601 date-time, in which case they
/// become a timezone-aware timestamp (naive values are assumed UTC). Quoted
/// numbers stay strings.
pub fn extract_value(token: &Token) -> DriverResult<Scalar> {
    match token {
        Token::SingleQuotedString(text) | Token::DoubleQuotedString(text) => {
            match parse_datetime(text) {
                Some(timestamp) => Ok(Scalar::Timestamp(timestamp)),
                None => Ok(Scalar::String(text.clone())),
            }
        }
        Token::Number(digits, _) => {
            if let Ok(int) = digits.parse::<i64>() {
                Ok(Scalar::Int(int))
            } else {
                digits
                    .parse::<f64>()
                    .map(Scalar::Float)
                    .map_err(|_| {
                        DriverError::programming(format!("Invalid numeric literal: {digits}"))
                    })
            }
        }
        Token::Word(word) => match word.keyword {
            Keyword::TRUE => Ok(Scalar::Bool(true)),
            Keyword::FALSE => Ok(Scalar::Bool(false)),
            Keyword::NULL | Keyword::NONE => Ok(Scalar::Null),
            _ if word.value.eq_ignore_ascii_case("none") => Ok(Scalar::Null),
            _ => Ok(Scalar::String(word.value.clone())),
        },
        other => Err(DriverError::programming(format!(
            "Unable to extract a value from token: {other}"
        ))),
    }
}

fn parse_datetime(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }

    if let Ok(parsed) = DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(parsed.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use sqlparser::tokenizer::Word;

    fn word(value: &str, keyword: Keyword) -> Token {
        Token::Word(Word {
            value: value.to_string(),
            quote_style: None,
            keyword,
        })
    }

    #[test]
    fn extracts_null_and_booleans() {
        assert_eq!(extract_value(&word("NONE", Keyword::NONE)).unwrap(), Scalar::Null);
        assert_eq!(extract_value(&word("NULL", Keyword::NULL)).unwrap(), Scalar::Null);
        assert_eq!(
            extract_value(&word("TRUE", Keyword::TRUE)).unwrap(),
            Scalar::Bool(true)
        );
        assert_eq!(
            extract_value(&word("FALSE", Keyword::FALSE)).unwrap(),
            Scalar::Bool(false)
        );
    }

    #[test]
    fn extracts_bare_words_as_strings() {
        assert_eq!(
            extract_value(&word("pelican", Keyword::NoKeyword)).unwrap(),
            Scalar::String("pelican".into())
        );
    }

    #[test]
    fn extracts_numbers_by_shape() {
        assert_eq!(
            extract_value(&Token::Number("42".into(), false)).unwrap(),
            Scalar::Int(42)
        );
        assert_eq!(
            extract_value(&Token::Number("3.25".into(), false)).unwrap(),
            Scalar::Float(3.25)
        );
    }

    #[test]
    fn quoted_numbers_stay_strings() {
        assert_eq!(
            extract_value(&Token::SingleQuotedString("42".into())).unwrap(),
            Scalar::String("42".into())
        );
        assert_eq!(
            extract_value(&Token::SingleQuotedString("3.25".into())).unwrap(),
            Scalar::String("3.25".into())
        );
    }

    #[test]
    fn quoted_strings_keep_interior_apostrophes() {
        // The lexer has already unescaped the doubled quote from 'Bob''s'.
        assert_eq!(
            extract_value(&Token::SingleQuotedString("Bob's".into())).unwrap(),
            Scalar::String("Bob's".into())
        );
    }

    #[test]
    fn iso_datetimes_become_utc_timestamps() {
        let expected = Utc.with_ymd_and_hms(2021, 3, 14, 9, 26, 53).unwrap();

        assert_eq!(
            extract_value(&Token::SingleQuotedString("2021-03-14T09:26:53+00:00".into())).unwrap(),
            Scalar::Timestamp(expected)
        );
        assert_eq!(
            extract_value(&Token::SingleQuotedString("2021-03-14 09:26:53".into())).unwrap(),
            Scalar::Timestamp(expected)
        );
    }

    #[test]
    fn naive_datetimes_are_normalized_to_utc() {
        let expected = Utc.with_ymd_and_hms(2021, 3, 14, 9, 26, 53).unwrap();
        assert_eq!(
            extract_value(&Token::SingleQuotedString("2021-03-14T09:26:53".into())).unwrap(),
            Scalar::Timestamp(expected)
        );
    }

    #[test]
    fn offset_datetimes_convert_to_utc() {
        let expected = Utc.with_ymd_and_hms(2021, 3, 13, 22, 26, 53).unwrap();
        assert_eq!(
            extract_value(&Token::SingleQuotedString("2021-03-14T09:26:53+11:00".into())).unwrap(),
            Scalar::Timestamp(expected)
        );
    }

    #[test]
    fn punctuation_is_not_a_value() {
        assert!(extract_value(&Token::Comma).is_err());
    }
}
