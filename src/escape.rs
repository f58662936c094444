//! String escaping for MySQL string literals.

/// Escape a string for use inside a quoted MySQL string literal, the way
/// `mysql_real_escape_string` does for ASCII-compatible charsets.
pub fn escape_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len() * 2);
    for c in s.chars() {
        match c {
            '\0' => result.push_str("\\0"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\\' => result.push_str("\\\\"),
            '\'' => result.push_str("\\'"),
            '"' => result.push_str("\\\""),
            '\x1a' => result.push_str("\\Z"),
            c => result.push(c),
        }
    }
    result
}

/// Quote an identifier (database, table, column name) with backticks.
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}
