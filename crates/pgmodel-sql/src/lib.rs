//! SQL quoting helpers and deterministic probe-object names.
//!
//! Catalog queries are composed from a closed set of fragments: identifiers go
//! through [`Ident`], literals through [`Lit`]. Nothing else is spliced into
//! SQL text.

/// A PostgreSQL string literal wrapper.
///
/// Display writes the value escaped and quoted with single quotes.
///
/// # Example
/// ```
/// use pgmodel_sql::Lit;
/// assert_eq!(format!("{}", Lit("foo")), "'foo'");
/// assert_eq!(format!("{}", Lit("it's")), "'it''s'");
/// ```
pub struct Lit<T: AsRef<str>>(pub T);

impl<T: AsRef<str>> std::fmt::Display for Lit<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "'")?;
        for c in self.0.as_ref().chars() {
            if c == '\'' {
                write!(f, "''")?;
            } else {
                write!(f, "{}", c)?;
            }
        }
        write!(f, "'")
    }
}

/// A PostgreSQL identifier wrapper.
///
/// Display writes the value escaped and quoted with double quotes.
///
/// # Example
/// ```
/// use pgmodel_sql::Ident;
/// assert_eq!(format!("{}", Ident("user")), "\"user\"");
/// assert_eq!(format!("{}", Ident("bla\"h")), "\"bla\"\"h\"");
/// ```
pub struct Ident<T: AsRef<str>>(pub T);

impl<T: AsRef<str>> std::fmt::Display for Ident<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "\"")?;
        for c in self.0.as_ref().chars() {
            if c == '"' {
                write!(f, "\"\"")?;
            } else {
                write!(f, "{}", c)?;
            }
        }
        write!(f, "\"")
    }
}

/// Escape a string literal for SQL.
pub fn escape_string(s: &str) -> String {
    format!("{}", Lit(s))
}

/// Quote a schema-qualified identifier: `"schema"."name"`.
pub fn qualified_ident(schema: &str, name: &str) -> String {
    format!("{}.{}", Ident(schema), Ident(name))
}

/// Render a parenthesized, comma-separated list of string literals.
///
/// Returns `None` for an empty list: `IN ()` is not valid SQL, so callers
/// have to short-circuit instead.
///
/// # Example
/// ```
/// use pgmodel_sql::literal_list;
/// assert_eq!(literal_list(["a", "b"]).as_deref(), Some("('a', 'b')"));
/// assert_eq!(literal_list(Vec::<&str>::new()), None);
/// ```
pub fn literal_list<I, S>(values: I) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let items: Vec<String> = values
        .into_iter()
        .map(|v| escape_string(v.as_ref()))
        .collect();
    if items.is_empty() {
        None
    } else {
        Some(format!("({})", items.join(", ")))
    }
}

/// Generate a deterministic name for a session-local probe object
/// (prepared statement or temporary table).
///
/// The name is derived from a stable hash of `key` (after whitespace
/// normalization), so the same statement always probes under the same name
/// and stays within Postgres' identifier length limit. The result is
/// lowercase and needs no quoting.
pub fn probe_name(prefix: &str, key: &str) -> String {
    let normalized = normalize_sql_for_hash(key);
    let hex = blake3::hash(normalized.as_bytes()).to_hex().to_string();
    let suffix = &hex[..16];

    const PG_IDENT_MAX: usize = 63;
    let max_prefix_len = PG_IDENT_MAX.saturating_sub(suffix.len() + 1);

    let prefix: String = prefix
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .map(|c| c.to_ascii_lowercase())
        .take(max_prefix_len)
        .collect();

    format!("{}_{}", prefix, suffix)
}

/// Collapse whitespace runs outside of quoted sections into single spaces.
pub fn normalize_sql_for_hash(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut pending_space = false;

    let mut in_single_quote = false;
    let mut in_double_quote = false;

    let mut chars = sql.chars().peekable();
    while let Some(ch) = chars.next() {
        if in_single_quote {
            out.push(ch);
            if ch == '\'' {
                // doubled quote stays inside the literal
                if let Some(next) = chars.next_if_eq(&'\'') {
                    out.push(next);
                } else {
                    in_single_quote = false;
                }
            }
            continue;
        }

        if in_double_quote {
            out.push(ch);
            if ch == '"' {
                if let Some(next) = chars.next_if_eq(&'"') {
                    out.push(next);
                } else {
                    in_double_quote = false;
                }
            }
            continue;
        }

        if ch.is_whitespace() {
            pending_space = true;
            continue;
        }

        if pending_space && !out.is_empty() {
            out.push(' ');
        }
        pending_space = false;
        out.push(ch);
        match ch {
            '\'' => in_single_quote = true,
            '"' => in_double_quote = true,
            _ => {}
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualified_ident() {
        assert_eq!(qualified_ident("public", "user"), "\"public\".\"user\"");
        assert_eq!(qualified_ident("a\"b", "c"), "\"a\"\"b\".\"c\"");
    }

    #[test]
    fn test_probe_name_is_deterministic() {
        let a = probe_name("pgmodel_stmt", "getUser");
        let b = probe_name("pgmodel_stmt", "getUser");
        let c = probe_name("pgmodel_stmt", "getUsers");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("pgmodel_stmt_"));
        assert_eq!(a.len(), "pgmodel_stmt_".len() + 16);
    }

    #[test]
    fn test_probe_name_sanitizes_prefix() {
        let name = probe_name("Probe-Table!", "x");
        assert!(name.starts_with("probetable_"));
        assert!(name.len() <= 63);

        let long = probe_name(&"p".repeat(100), "x");
        assert_eq!(long.len(), 63);
    }

    #[test]
    fn test_normalize_keeps_quoted_whitespace() {
        insta::assert_snapshot!(
            normalize_sql_for_hash("SELECT  'a  b',\n\t\"x  y\"   FROM t"),
            @r#"SELECT 'a  b', "x  y" FROM t"#
        );
        insta::assert_snapshot!(
            normalize_sql_for_hash("  SELECT 'it''s   here'  "),
            @"SELECT 'it''s   here'"
        );
    }
}
