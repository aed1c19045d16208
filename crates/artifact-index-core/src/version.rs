//! Maven-style version ordering.
//!
//! Versions are split into tokens on `.` and `-` and on every digit/letter
//! transition. Numeric tokens compare numerically, well-known qualifiers
//! compare by rank, and everything else compares lexically after them.
//! Missing trailing tokens behave like a release (`1.0` == `1.0.0`).

use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Number(u64),
    Qualifier(String),
}

fn qualifier_rank(q: &str) -> Option<u8> {
    match q {
        "alpha" | "a" => Some(0),
        "beta" | "b" => Some(1),
        "milestone" | "m" => Some(2),
        "rc" | "cr" => Some(3),
        "snapshot" => Some(4),
        "" | "ga" | "final" | "release" => Some(5),
        "sp" => Some(6),
        _ => None,
    }
}

fn tokenize(version: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut current_is_digit = false;

    let flush = |current: &mut String, is_digit: bool, tokens: &mut Vec<Token>| {
        if current.is_empty() {
            return;
        }
        if is_digit {
            // Overflowing numbers fall back to lexical comparison.
            match current.parse::<u64>() {
                Ok(n) => tokens.push(Token::Number(n)),
                Err(_) => tokens.push(Token::Qualifier(current.clone())),
            }
        } else {
            tokens.push(Token::Qualifier(current.to_ascii_lowercase()));
        }
        current.clear();
    };

    for ch in version.chars() {
        if ch == '.' || ch == '-' || ch == '_' {
            flush(&mut current, current_is_digit, &mut tokens);
            continue;
        }
        let is_digit = ch.is_ascii_digit();
        if !current.is_empty() && is_digit != current_is_digit {
            flush(&mut current, current_is_digit, &mut tokens);
        }
        current_is_digit = is_digit;
        current.push(ch);
    }
    flush(&mut current, current_is_digit, &mut tokens);

    // Trailing zeros and release markers carry no ordering information.
    while let Some(last) = tokens.last() {
        let is_null = match last {
            Token::Number(0) => true,
            Token::Qualifier(q) => qualifier_rank(q) == Some(5),
            _ => false,
        };
        if is_null {
            tokens.pop();
        } else {
            break;
        }
    }
    tokens
}

fn compare_token(a: Option<&Token>, b: Option<&Token>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (Some(t), None) => compare_to_release(t),
        (None, Some(t)) => compare_to_release(t).reverse(),
        (Some(Token::Number(x)), Some(Token::Number(y))) => x.cmp(y),
        (Some(Token::Number(_)), Some(Token::Qualifier(_))) => Ordering::Greater,
        (Some(Token::Qualifier(_)), Some(Token::Number(_))) => Ordering::Less,
        (Some(Token::Qualifier(x)), Some(Token::Qualifier(y))) => {
            match (qualifier_rank(x), qualifier_rank(y)) {
                (Some(rx), Some(ry)) => rx.cmp(&ry),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => x.cmp(y),
            }
        }
    }
}

/// Ordering of a token against an implicit release marker.
fn compare_to_release(token: &Token) -> Ordering {
    match token {
        Token::Number(0) => Ordering::Equal,
        Token::Number(_) => Ordering::Greater,
        Token::Qualifier(q) => match qualifier_rank(q) {
            Some(r) => r.cmp(&5),
            None => Ordering::Greater,
        },
    }
}

/// Compare two version strings.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let ta = tokenize(a);
    let tb = tokenize(b);
    let len = ta.len().max(tb.len());
    for i in 0..len {
        let ord = compare_token(ta.get(i), tb.get(i));
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_ordering() {
        assert_eq!(compare_versions("1.6.1", "1.5"), Ordering::Greater);
        assert_eq!(compare_versions("1.10", "1.9"), Ordering::Greater);
        assert_eq!(compare_versions("2", "10"), Ordering::Less);
    }

    #[test]
    fn test_trailing_zeros_equal() {
        assert_eq!(compare_versions("1.0", "1"), Ordering::Equal);
        assert_eq!(compare_versions("1.0.0", "1.0"), Ordering::Equal);
    }

    #[test]
    fn test_qualifiers() {
        assert_eq!(compare_versions("1.0-alpha-1", "1.0-beta-1"), Ordering::Less);
        assert_eq!(compare_versions("1.0-rc1", "1.0"), Ordering::Less);
        assert_eq!(compare_versions("1.0-SNAPSHOT", "1.0"), Ordering::Less);
        assert_eq!(compare_versions("1.0-rc1", "1.0-SNAPSHOT"), Ordering::Less);
        assert_eq!(compare_versions("1.0-sp1", "1.0"), Ordering::Greater);
        assert_eq!(compare_versions("1.0.1", "1.0-sp1"), Ordering::Greater);
    }

    #[test]
    fn test_unknown_qualifier_after_release() {
        assert_eq!(compare_versions("1.0-jdk5", "1.0"), Ordering::Greater);
        assert_eq!(compare_versions("1.0-jdk5", "1.0-jdk6"), Ordering::Less);
    }
}
