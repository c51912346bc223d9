// SPDX-License-Identifier: Apache-2.0

//! SQL string normalization: keywords uppercased, comments stripped,
//! whitespace collapsed. Applied before parsing and used verbatim in error
//! logs.

use sqlparser::tokenizer::Token;

use super::lexer::tokenize;

/// Formats a SQL string for dispatch and logging. Lexing failures leave the
/// input untouched; the parser will report them properly.
pub fn format_sql(sql: &str) -> String {
    let Ok(tokens) = tokenize(sql) else {
        return sql.trim().to_string();
    };

    let mut out = String::new();
    let mut prev: Option<Token> = None;

    for token in tokens {
        if matches!(token, Token::Whitespace(_) | Token::EOF) {
            continue;
        }

        let text = match &token {
            Token::Word(word) if super::is_reserved(word.keyword) && word.quote_style.is_none() => {
                word.value.to_uppercase()
            }
            other => other.to_string(),
        };

        let tight_before = matches!(
            token,
            Token::Comma | Token::RParen | Token::SemiColon | Token::Period
        );
        let tight_after_prev = match &prev {
            Some(Token::LParen) | Some(Token::Period) => true,
            // Function-call style: no space between a plain word and `(`.
            Some(Token::Word(word)) if matches!(token, Token::LParen) => {
                word.quote_style.is_some() || !super::is_reserved(word.keyword)
            }
            _ => false,
        };

        if !out.is_empty() && !tight_before && !tight_after_prev {
            out.push(' ');
        }
        out.push_str(&text);
        prev = Some(token);
    }

    out
}
