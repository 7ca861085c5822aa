use crate::rules::EvalError;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Question,
    Colon,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    AndAnd,
    OrOr,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
}

/// A token and the byte offset where it starts in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: usize,
}

pub fn tokenize(source: &str) -> Result<Vec<Token>, EvalError> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some(&(pos, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        if c.is_ascii_digit() {
            let mut end = pos;
            let mut is_float = false;
            while let Some(&(i, d)) = chars.peek() {
                if d.is_ascii_digit() {
                    end = i + d.len_utf8();
                    chars.next();
                } else if d == '.' && !is_float {
                    // `1.5` is a float, `1.` followed by a non-digit is not.
                    let next_is_digit = source[i + 1..]
                        .chars()
                        .next()
                        .is_some_and(|n| n.is_ascii_digit());
                    if !next_is_digit {
                        break;
                    }
                    is_float = true;
                    end = i + 1;
                    chars.next();
                } else {
                    break;
                }
            }
            let text = &source[pos..end];
            let kind = if is_float {
                TokenKind::Float(text.parse().map_err(|_| syntax(pos, "invalid number"))?)
            } else {
                TokenKind::Int(text.parse().map_err(|_| syntax(pos, "integer out of range"))?)
            };
            tokens.push(Token {
                kind,
                position: pos,
            });
            continue;
        }

        if c.is_alphabetic() || c == '_' {
            let mut end = pos;
            while let Some(&(i, d)) = chars.peek() {
                if d.is_alphanumeric() || d == '_' {
                    end = i + d.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Token {
                kind: TokenKind::Ident(source[pos..end].to_string()),
                position: pos,
            });
            continue;
        }

        if c == '"' || c == '\'' {
            chars.next();
            let mut text = String::new();
            let mut closed = false;
            while let Some((_, d)) = chars.next() {
                match d {
                    '\\' => match chars.next() {
                        Some((_, 'n')) => text.push('\n'),
                        Some((_, 't')) => text.push('\t'),
                        Some((_, escaped)) => text.push(escaped),
                        None => break,
                    },
                    d if d == c => {
                        closed = true;
                        break;
                    }
                    d => text.push(d),
                }
            }
            if !closed {
                return Err(syntax(pos, "unterminated string literal"));
            }
            tokens.push(Token {
                kind: TokenKind::Str(text),
                position: pos,
            });
            continue;
        }

        chars.next();
        let next = chars.peek().map(|&(_, n)| n);
        let (kind, two_chars) = match (c, next) {
            ('&', Some('&')) => (TokenKind::AndAnd, true),
            ('|', Some('|')) => (TokenKind::OrOr, true),
            ('=', Some('=')) => (TokenKind::EqEq, true),
            ('!', Some('=')) => (TokenKind::NotEq, true),
            ('<', Some('=')) => (TokenKind::Le, true),
            ('>', Some('=')) => (TokenKind::Ge, true),
            ('(', _) => (TokenKind::LParen, false),
            (')', _) => (TokenKind::RParen, false),
            ('[', _) => (TokenKind::LBracket, false),
            (']', _) => (TokenKind::RBracket, false),
            (',', _) => (TokenKind::Comma, false),
            ('.', _) => (TokenKind::Dot, false),
            ('?', _) => (TokenKind::Question, false),
            (':', _) => (TokenKind::Colon, false),
            ('+', _) => (TokenKind::Plus, false),
            ('-', _) => (TokenKind::Minus, false),
            ('*', _) => (TokenKind::Star, false),
            ('/', _) => (TokenKind::Slash, false),
            ('%', _) => (TokenKind::Percent, false),
            ('!', _) => (TokenKind::Bang, false),
            ('<', _) => (TokenKind::Lt, false),
            ('>', _) => (TokenKind::Gt, false),
            _ => return Err(syntax(pos, &format!("unexpected character '{}'", c))),
        };
        if two_chars {
            chars.next();
        }
        tokens.push(Token {
            kind,
            position: pos,
        });
    }

    Ok(tokens)
}

fn syntax(position: usize, message: &str) -> EvalError {
    EvalError::Syntax {
        position,
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_member_access_and_numbers() {
        assert_eq!(
            kinds("fields.age >= 40.5"),
            vec![
                TokenKind::Ident("fields".into()),
                TokenKind::Dot,
                TokenKind::Ident("age".into()),
                TokenKind::Ge,
                TokenKind::Float(40.5),
            ]
        );
    }

    #[test]
    fn test_strings_both_quotes() {
        assert_eq!(
            kinds(r#"'1h' == "it\"s""#),
            vec![
                TokenKind::Str("1h".into()),
                TokenKind::EqEq,
                TokenKind::Str("it\"s".into()),
            ]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("!a && b || c != d"),
            vec![
                TokenKind::Bang,
                TokenKind::Ident("a".into()),
                TokenKind::AndAnd,
                TokenKind::Ident("b".into()),
                TokenKind::OrOr,
                TokenKind::Ident("c".into()),
                TokenKind::NotEq,
                TokenKind::Ident("d".into()),
            ]
        );
    }

    #[test]
    fn test_unterminated_string() {
        assert!(matches!(
            tokenize("'abc"),
            Err(EvalError::Syntax { position: 0, .. })
        ));
    }

    #[test]
    fn test_unexpected_character() {
        assert!(matches!(
            tokenize("a # b"),
            Err(EvalError::Syntax { position: 2, .. })
        ));
    }
}
