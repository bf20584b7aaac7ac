//! Sql string helpers.
//!
//! Literal values interpolated into statements issued by this crate always
//! go through [`quote_literal`]; identifiers through [`quote_ident`].
//! Identifiers inside caller supplied sql are the caller's text and pass
//! through untouched.

/// Quote a string literal, doubling embedded single quotes.
pub fn quote_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for ch in value.chars() {
        if ch == '\'' {
            out.push('\'');
        }
        out.push(ch);
    }
    out.push('\'');
    out
}

/// Quote an identifier, doubling embedded double quotes.
pub fn quote_ident(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    out.push('"');
    for ch in name.chars() {
        if ch == '"' {
            out.push('"');
        }
        out.push(ch);
    }
    out.push('"');
    out
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn literal() {
        assert_eq!(quote_literal("abc"), "'abc'");
        assert_eq!(quote_literal(""), "''");
        assert_eq!(quote_literal("it's"), "'it''s'");
        assert_eq!(quote_literal("'; DROP TABLE t; --"), "'''; DROP TABLE t; --'");
    }

    #[test]
    fn ident() {
        assert_eq!(quote_ident("events"), "\"events\"");
        assert_eq!(quote_ident("weird\"name"), "\"weird\"\"name\"");
    }
}
