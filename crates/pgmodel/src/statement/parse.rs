//! Annotated SQL script parsing.
//!
//! ```sql
//! -- name: getUser :one
//! SELECT id, email AS email /*!*/
//! FROM "user"
//! WHERE id = /*:id*/ 42 OR parent_id = /*:id*/ 42;
//! ```
//!
//! Each `-- name:` header starts a statement. A `/*:name*/` marker turns the
//! literal right after it into a variable: the literal stays in the sample
//! SQL used for probing, the prepared SQL gets `$n` instead. `/*!*/` after
//! `AS <column>` marks that result column as never null.

use crate::{Error, Result};
use pgmodel_schema::{Cardinality, VariableRef};
use std::collections::{BTreeMap, BTreeSet};

/// One statement of a script, before type resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedStatement {
    pub name: String,
    pub cardinality: Cardinality,
    /// Every variable occurrence, in text order
    pub variables: Vec<VariableRef>,
    /// Unique variable names, in first-seen order
    pub unique_variables: Vec<String>,
    /// Result columns marked non-null
    pub non_null: BTreeSet<String>,
    /// Statement text with `$n` in place of each marked literal
    pub prepared_sql: String,
    /// Statement text with markers removed and literals kept
    pub sample_sql: String,
    /// True when the statement produces a result set that can be probed
    pub returns_rows: bool,
    /// Line of the `-- name:` header
    pub line: usize,
}

/// Parse every statement of a script.
pub fn parse_script(path: &str, source: &str) -> Result<Vec<ParsedStatement>> {
    let mut statements = Vec::new();
    let mut current: Option<(usize, &str, Cardinality)> = None;
    let mut body: Vec<&str> = Vec::new();

    for (i, line) in source.lines().enumerate() {
        let line_no = i + 1;
        match header(line) {
            Some(rest) => {
                if let Some((start, name, cardinality)) = current.take() {
                    statements.push(parse_statement(
                        path,
                        start,
                        name,
                        cardinality,
                        &body.join("\n"),
                    )?);
                }
                body.clear();
                let (name, cardinality) = parse_header(path, line_no, rest)?;
                current = Some((line_no, name, cardinality));
            }
            None if current.is_some() => body.push(line),
            None => {
                let trimmed = line.trim();
                if !trimmed.is_empty() && !trimmed.starts_with("--") {
                    return Err(script_error(
                        path,
                        line_no,
                        "statement text before the first `-- name:` header",
                    ));
                }
            }
        }
    }
    if let Some((start, name, cardinality)) = current {
        statements.push(parse_statement(
            path,
            start,
            name,
            cardinality,
            &body.join("\n"),
        )?);
    }

    if statements.is_empty() {
        tracing::warn!("script {} contains no statements", path);
    }
    Ok(statements)
}

fn script_error(path: &str, line: usize, message: impl Into<String>) -> Error {
    Error::Script {
        path: path.to_string(),
        line,
        message: message.into(),
    }
}

/// The text after `-- name:`, if `line` is a header.
fn header(line: &str) -> Option<&str> {
    line.trim_start()
        .strip_prefix("--")?
        .trim_start()
        .strip_prefix("name:")
}

fn parse_header<'a>(path: &str, line: usize, rest: &'a str) -> Result<(&'a str, Cardinality)> {
    let mut tokens = rest.split_whitespace();
    let name = tokens
        .next()
        .ok_or_else(|| script_error(path, line, "missing statement name"))?;
    if !is_identifier(name) {
        return Err(script_error(
            path,
            line,
            format!("invalid statement name '{}'", name),
        ));
    }

    let mut cardinality = None;
    for token in tokens {
        let parsed = token
            .strip_prefix(':')
            .and_then(Cardinality::from_token)
            .ok_or_else(|| {
                script_error(
                    path,
                    line,
                    format!("unknown token '{}' in header of {}", token, name),
                )
            })?;
        if cardinality.replace(parsed).is_some() {
            return Err(script_error(
                path,
                line,
                format!("statement {} has more than one cardinality", name),
            ));
        }
    }
    Ok((name, cardinality.unwrap_or_default()))
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

// ============================================================================
// Body scanning
// ============================================================================

fn parse_statement(
    path: &str,
    line: usize,
    name: &str,
    cardinality: Cardinality,
    body: &str,
) -> Result<ParsedStatement> {
    let body = body.trim();
    let body = body.strip_suffix(';').unwrap_or(body).trim_end();
    if body.is_empty() {
        return Err(script_error(
            path,
            line,
            format!("statement {} has no body", name),
        ));
    }

    let mut scanner = Scanner::new(body);
    scanner
        .run()
        .map_err(|message| script_error(path, line, format!("{}: {}", name, message)))?;

    let returns_rows = matches!(
        first_keyword(&scanner.sample).to_ascii_uppercase().as_str(),
        "SELECT" | "WITH" | "VALUES" | "TABLE"
    );

    let mut unique_variables: Vec<(usize, String)> = scanner
        .indexes
        .into_iter()
        .map(|(name, index)| (index, name))
        .collect();
    unique_variables.sort();

    Ok(ParsedStatement {
        name: name.to_string(),
        cardinality,
        variables: scanner.variables,
        unique_variables: unique_variables.into_iter().map(|(_, n)| n).collect(),
        non_null: scanner.non_null,
        prepared_sql: scanner.prepared,
        sample_sql: scanner.sample,
        returns_rows,
        line,
    })
}

/// Single pass over a statement body.
///
/// String literals, quoted identifiers, comments and dollar-quoted bodies
/// are copied verbatim; markers are only recognized outside of them.
struct Scanner<'a> {
    src: &'a str,
    pos: usize,
    prepared: String,
    sample: String,
    variables: Vec<VariableRef>,
    indexes: BTreeMap<String, usize>,
    non_null: BTreeSet<String>,
}

type ScanResult<T> = std::result::Result<T, String>;

impl<'a> Scanner<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            prepared: String::with_capacity(src.len()),
            sample: String::with_capacity(src.len()),
            variables: Vec::new(),
            indexes: BTreeMap::new(),
            non_null: BTreeSet::new(),
        }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn bytes(&self) -> &'a [u8] {
        self.src.as_bytes()
    }

    /// Copy `len` bytes to both outputs.
    fn copy(&mut self, len: usize) {
        let text = &self.src[self.pos..self.pos + len];
        self.prepared.push_str(text);
        self.sample.push_str(text);
        self.pos += len;
    }

    fn run(&mut self) -> ScanResult<()> {
        while self.pos < self.src.len() {
            let rest = self.rest();
            let b = self.bytes()[self.pos];
            match b {
                b'\'' => {
                    let len = quoted_len(rest, b'\'', false)?;
                    self.copy(len);
                }
                b'E' | b'e' if rest[1..].starts_with('\'') && !self.after_ident_char() => {
                    let len = 1 + quoted_len(&rest[1..], b'\'', true)?;
                    self.copy(len);
                }
                b'"' => {
                    let len = quoted_len(rest, b'"', false)?;
                    self.copy(len);
                }
                b'-' if rest.starts_with("--") => {
                    let len = rest.find('\n').unwrap_or(rest.len());
                    self.copy(len);
                }
                b'/' if rest.starts_with("/*:") => self.variable()?,
                b'/' if rest.starts_with("/*!*/") => self.non_null_marker()?,
                b'/' if rest.starts_with("/*") => {
                    let len = block_comment_len(rest)?;
                    self.copy(len);
                }
                b'$' if !self.after_ident_char() => match dollar_quote_len(rest)? {
                    Some(len) => self.copy(len),
                    None => self.copy(1),
                },
                _ => {
                    let len = rest.chars().next().map_or(1, char::len_utf8);
                    self.copy(len);
                }
            }
        }
        Ok(())
    }

    fn after_ident_char(&self) -> bool {
        self.pos > 0 && is_ident_char(self.bytes()[self.pos - 1])
    }

    /// `/*:name*/ <literal>`
    fn variable(&mut self) -> ScanResult<()> {
        let rest = self.rest();
        let end = rest
            .find("*/")
            .ok_or_else(|| "unterminated variable marker".to_string())?;
        let name = rest[3..end].trim();
        if !is_identifier(name) {
            return Err(format!("invalid variable name '{}'", name));
        }

        let after = &rest[end + 2..];
        let ws = after.len() - after.trim_start().len();
        let literal = literal_len(&after[ws..])
            .ok_or_else(|| format!("variable :{} must be followed by a literal", name))?;

        let next = self.indexes.len();
        let index = *self.indexes.entry(name.to_string()).or_insert(next);
        self.variables.push(VariableRef {
            name: name.to_string(),
            index,
        });

        let literal_start = self.pos + end + 2 + ws;
        self.prepared.push_str(&format!("${}", index + 1));
        self.sample
            .push_str(&self.src[literal_start..literal_start + literal]);
        self.pos = literal_start + literal;
        Ok(())
    }

    /// `AS <column> /*!*/`
    fn non_null_marker(&mut self) -> ScanResult<()> {
        let column = alias_before(&self.sample)
            .ok_or_else(|| "non-null marker must follow `AS <column>`".to_string())?;
        self.non_null.insert(column);
        self.pos += "/*!*/".len();
        Ok(())
    }
}

/// Length of a quoted section starting at `s[0] == quote`. A doubled quote
/// stays inside; with `backslash`, `\x` does too.
fn quoted_len(s: &str, quote: u8, backslash: bool) -> ScanResult<usize> {
    let bytes = s.as_bytes();
    let mut i = 1;
    while i < bytes.len() {
        let b = bytes[i];
        if backslash && b == b'\\' {
            i += 2;
            continue;
        }
        if b == quote {
            if bytes.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return Ok(i + 1);
        }
        i += 1;
    }
    Err(format!("unterminated {} quote", quote as char))
}

/// Length of a (possibly nested) block comment.
fn block_comment_len(s: &str) -> ScanResult<usize> {
    let bytes = s.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;
    while i + 1 < bytes.len() {
        match (bytes[i], bytes[i + 1]) {
            (b'/', b'*') => {
                depth += 1;
                i += 2;
            }
            (b'*', b'/') => {
                depth -= 1;
                i += 2;
                if depth == 0 {
                    return Ok(i);
                }
            }
            _ => i += 1,
        }
    }
    Err("unterminated block comment".to_string())
}

/// Length of a `$tag$ ... $tag$` section, or `None` if `s` does not start one.
fn dollar_quote_len(s: &str) -> ScanResult<Option<usize>> {
    let bytes = s.as_bytes();
    let mut i = 1;
    while i < bytes.len() && is_ident_char(bytes[i]) {
        i += 1;
    }
    if bytes.get(i) != Some(&b'$') || bytes.get(1).is_some_and(|b| b.is_ascii_digit()) {
        return Ok(None);
    }
    let tag = &s[..=i];
    match s[tag.len()..].find(tag) {
        Some(end) => Ok(Some(tag.len() + end + tag.len())),
        None => Err(format!("unterminated dollar quote {}", tag)),
    }
}

/// Length of the SQL literal at the start of `s`, if there is one.
fn literal_len(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    match bytes.first()? {
        b'\'' => quoted_len(s, b'\'', false).ok(),
        b'E' | b'e' if bytes.get(1) == Some(&b'\'') => {
            quoted_len(&s[1..], b'\'', true).ok().map(|n| n + 1)
        }
        b'0'..=b'9' | b'.' | b'-' | b'+' => number_len(s),
        _ => {
            let word_len = bytes.iter().take_while(|b| is_ident_char(**b)).count();
            let word = &s[..word_len];
            ["TRUE", "FALSE", "NULL"]
                .iter()
                .any(|k| word.eq_ignore_ascii_case(k))
                .then_some(word_len)
        }
    }
}

fn number_len(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut i = 0;
    if matches!(bytes.first(), Some(b'-' | b'+')) {
        i += 1;
    }
    let digits = |from: usize| bytes[from..].iter().take_while(|b| b.is_ascii_digit()).count();

    let int = digits(i);
    i += int;
    let mut frac = 0;
    if bytes.get(i) == Some(&b'.') {
        frac = digits(i + 1);
        i += 1 + frac;
    }
    if int == 0 && frac == 0 {
        return None;
    }
    if matches!(bytes.get(i), Some(b'e' | b'E')) {
        let mut j = i + 1;
        if matches!(bytes.get(j), Some(b'-' | b'+')) {
            j += 1;
        }
        let exp = digits(j);
        if exp > 0 {
            i = j + exp;
        }
    }
    if bytes.get(i).is_some_and(|b| is_ident_char(*b)) {
        return None;
    }
    Some(i)
}

/// The column alias at the end of `sql`, when it ends in `AS <column>`.
fn alias_before(sql: &str) -> Option<String> {
    let sql = sql.trim_end();
    let (column, before) = if let Some(inner) = sql.strip_suffix('"') {
        let start = inner.rfind('"')?;
        (inner[start + 1..].to_string(), &inner[..start])
    } else {
        let start = sql
            .bytes()
            .rposition(|b| !is_ident_char(b))
            .map_or(0, |p| p + 1);
        let word = &sql[start..];
        if word.is_empty() {
            return None;
        }
        (word.to_ascii_lowercase(), &sql[..start])
    };

    let before = before.trim_end();
    let keyword_start = before.len().checked_sub(2)?;
    let keyword = before.get(keyword_start..)?;
    let boundary = keyword_start == 0 || !is_ident_char(before.as_bytes()[keyword_start - 1]);
    (keyword.eq_ignore_ascii_case("AS") && boundary).then_some(column)
}

/// First keyword of `sql`, skipping whitespace, comments and parentheses.
fn first_keyword(sql: &str) -> &str {
    let mut rest = sql;
    loop {
        let trimmed = rest.trim_start_matches(|c: char| c.is_whitespace() || c == '(');
        if trimmed.starts_with("--") {
            rest = trimmed.find('\n').map_or("", |i| &trimmed[i..]);
        } else if trimmed.starts_with("/*") {
            rest = match block_comment_len(trimmed) {
                Ok(len) => &trimmed[len..],
                Err(_) => "",
            };
        } else {
            let len = trimmed.bytes().take_while(|b| is_ident_char(*b)).count();
            return &trimmed[..len];
        }
    }
}

/// Fail if two statements share a name once case and `_`/`-` are ignored.
///
/// The error lists every name of every colliding group.
pub fn check_unique_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Result<()> {
    let mut groups: BTreeMap<String, Vec<&str>> = BTreeMap::new();
    for name in names {
        let key: String = name
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();
        groups.entry(key).or_default().push(name);
    }

    let mut duplicates: Vec<String> = groups
        .into_values()
        .filter(|names| names.len() > 1)
        .flatten()
        .map(str::to_string)
        .collect();
    if duplicates.is_empty() {
        return Ok(());
    }
    duplicates.sort();
    Err(Error::DuplicateStatementNames(duplicates))
}

#[cfg(test)]
mod tests;
