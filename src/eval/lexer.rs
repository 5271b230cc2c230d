/// Token stream for the expression language.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    LParen,
    RParen,
    Comma,
    Semicolon,
    Assign,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Not,
}

/// Scans expression text into tokens. Identifiers are case-sensitive;
/// numbers accept decimals, a leading dot, and exponents.
pub fn tokenize(text: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let bytes = text.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i] as char;
        match c {
            ' ' | '\t' | '\r' | '\n' => i += 1,
            '/' if bytes.get(i + 1) == Some(&b'/') => {
                // Line comment.
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '%' => {
                tokens.push(Token::Percent);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            ';' => {
                tokens.push(Token::Semicolon);
                i += 1;
            }
            '=' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push(Token::Eq);
                    i += 2;
                } else {
                    tokens.push(Token::Assign);
                    i += 1;
                }
            }
            '!' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push(Token::Ne);
                    i += 2;
                } else {
                    tokens.push(Token::Not);
                    i += 1;
                }
            }
            '<' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push(Token::Le);
                    i += 2;
                } else {
                    tokens.push(Token::Lt);
                    i += 1;
                }
            }
            '>' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push(Token::Ge);
                    i += 2;
                } else {
                    tokens.push(Token::Gt);
                    i += 1;
                }
            }
            '&' => {
                // Both `&` and `&&` mean logical and.
                i += if bytes.get(i + 1) == Some(&b'&') { 2 } else { 1 };
                tokens.push(Token::And);
            }
            '|' => {
                i += if bytes.get(i + 1) == Some(&b'|') { 2 } else { 1 };
                tokens.push(Token::Or);
            }
            '0'..='9' | '.' => {
                let start = i;
                while i < bytes.len() && bytes[i].is_ascii_digit() {
                    i += 1;
                }
                if i < bytes.len() && bytes[i] == b'.' {
                    i += 1;
                    while i < bytes.len() && bytes[i].is_ascii_digit() {
                        i += 1;
                    }
                }
                if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
                    let mut j = i + 1;
                    if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
                        j += 1;
                    }
                    if j < bytes.len() && bytes[j].is_ascii_digit() {
                        i = j;
                        while i < bytes.len() && bytes[i].is_ascii_digit() {
                            i += 1;
                        }
                    }
                }
                let literal = &text[start..i];
                let value: f64 = literal
                    .parse()
                    .map_err(|_| format!("Invalid number literal '{literal}'"))?;
                tokens.push(Token::Number(value));
            }
            'a'..='z' | 'A'..='Z' | '_' => {
                let start = i;
                while i < bytes.len()
                    && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_')
                {
                    i += 1;
                }
                tokens.push(Token::Ident(text[start..i].to_string()));
            }
            _ => return Err(format!("Unexpected character '{c}'")),
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scans_numbers_and_operators() {
        let tokens = tokenize("1 + 2.5 * .5e2").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Number(1.0),
                Token::Plus,
                Token::Number(2.5),
                Token::Star,
                Token::Number(50.0),
            ]
        );
    }

    #[test]
    fn distinguishes_assign_from_equality() {
        let tokens = tokenize("x = y == 2").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("x".into()),
                Token::Assign,
                Token::Ident("y".into()),
                Token::Eq,
                Token::Number(2.0),
            ]
        );
    }

    #[test]
    fn identifiers_are_case_sensitive() {
        let tokens = tokenize("Bass bass").unwrap();
        assert_eq!(
            tokens,
            vec![Token::Ident("Bass".into()), Token::Ident("bass".into())]
        );
    }

    #[test]
    fn logical_operators_single_and_double() {
        assert_eq!(tokenize("a && b").unwrap(), tokenize("a & b").unwrap());
        assert_eq!(tokenize("a || b").unwrap(), tokenize("a | b").unwrap());
    }

    #[test]
    fn skips_line_comments() {
        let tokens = tokenize("x // ignored\n; y").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("x".into()),
                Token::Semicolon,
                Token::Ident("y".into()),
            ]
        );
    }

    #[test]
    fn rejects_unknown_characters() {
        assert!(tokenize("x @ y").is_err());
    }
}
