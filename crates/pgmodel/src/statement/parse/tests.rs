use super::*;

fn parse(source: &str) -> Vec<ParsedStatement> {
    parse_script("queries.sql", source).unwrap()
}

fn parse_one(source: &str) -> ParsedStatement {
    let mut statements = parse(source);
    assert_eq!(statements.len(), 1);
    statements.remove(0)
}

fn error(source: &str) -> String {
    parse_script("queries.sql", source).unwrap_err().to_string()
}

#[test]
fn test_headers_split_statements() {
    let statements = parse(
        "-- shared helpers for the user screens\n\
         \n\
         -- name: getUser :one\n\
         SELECT * FROM \"user\" WHERE id = /*:id*/ 1;\n\
         \n\
         -- name: listUsers\n\
         SELECT * FROM \"user\"\n\
         ORDER BY id;\n",
    );
    assert_eq!(statements.len(), 2);

    assert_eq!(statements[0].name, "getUser");
    assert_eq!(statements[0].cardinality, Cardinality::One);
    assert_eq!(statements[0].line, 3);
    assert_eq!(
        statements[0].prepared_sql,
        "SELECT * FROM \"user\" WHERE id = $1"
    );
    assert_eq!(
        statements[0].sample_sql,
        "SELECT * FROM \"user\" WHERE id = 1"
    );

    assert_eq!(statements[1].name, "listUsers");
    assert_eq!(statements[1].cardinality, Cardinality::Many);
    assert_eq!(statements[1].sample_sql, "SELECT * FROM \"user\"\nORDER BY id");
    assert!(statements[1].variables.is_empty());
}

#[test]
fn test_repeated_variable_is_deduplicated() {
    let statement = parse_one(
        "-- name: related\n\
         SELECT id FROM post WHERE author_id = /*:id*/ 7 OR editor_id = /*:id*/ 7 LIMIT /*:limit*/ 10",
    );
    assert_eq!(statement.unique_variables, vec!["id", "limit"]);
    let occurrences: Vec<(&str, usize)> = statement
        .variables
        .iter()
        .map(|v| (v.name.as_str(), v.index))
        .collect();
    assert_eq!(occurrences, vec![("id", 0), ("id", 0), ("limit", 1)]);
    insta::assert_snapshot!(
        statement.prepared_sql,
        @"SELECT id FROM post WHERE author_id = $1 OR editor_id = $1 LIMIT $2"
    );
    insta::assert_snapshot!(
        statement.sample_sql,
        @"SELECT id FROM post WHERE author_id = 7 OR editor_id = 7 LIMIT 10"
    );
}

#[test]
fn test_literal_kinds() {
    let statement = parse_one(
        "-- name: literals\n\
         SELECT /*:a*/ 'it''s', /*:b*/ E'line\\'s', /*:c*/ -1.5e3, /*:d*/ true, /*:e*/ NULL::text, /*:f*/.5",
    );
    assert_eq!(statement.unique_variables, vec!["a", "b", "c", "d", "e", "f"]);
    assert_eq!(
        statement.prepared_sql,
        "SELECT $1, $2, $3, $4, $5::text, $6"
    );
    assert_eq!(
        statement.sample_sql,
        "SELECT 'it''s', E'line\\'s', -1.5e3, true, NULL::text, .5"
    );
}

#[test]
fn test_markers_in_strings_and_comments_are_inert() {
    let statement = parse_one(
        "-- name: inert\n\
         SELECT '/*:a*/ 1' AS \"/*:b*/\", $$ /*:c*/ 2 $$ -- /*:d*/ 3\n\
         /* outer /* /*:e*/ 4 */ */ FROM t WHERE x = /*:real*/ 5",
    );
    assert_eq!(statement.unique_variables, vec!["real"]);
    assert!(statement.prepared_sql.ends_with("WHERE x = $1"));
    assert!(statement.prepared_sql.contains("'/*:a*/ 1'"));
    assert!(statement.prepared_sql.contains("$$ /*:c*/ 2 $$"));
}

#[test]
fn test_non_null_markers() {
    let statement = parse_one(
        "-- name: counts :one\n\
         SELECT count(*) AS total /*!*/, max(id) as \"Latest\" /*!*/, min(id) AS first\n\
         FROM post",
    );
    assert_eq!(
        statement.non_null,
        BTreeSet::from(["Latest".to_string(), "total".to_string()])
    );
    assert_eq!(
        statement.prepared_sql,
        "SELECT count(*) AS total , max(id) as \"Latest\" , min(id) AS first\nFROM post"
    );
}

#[test]
fn test_returning_rows() {
    let select = parse_one("-- name: a\n  (SELECT 1)");
    assert!(select.returns_rows);
    let with = parse_one("-- name: a\n/* cte */ WITH x AS (SELECT 1) SELECT * FROM x");
    assert!(with.returns_rows);
    let values = parse_one("-- name: a\nvalues (1), (2)");
    assert!(values.returns_rows);
    let delete = parse_one("-- name: a\nDELETE FROM post WHERE id = /*:id*/ 1");
    assert!(!delete.returns_rows);
}

#[test]
fn test_header_errors() {
    insta::assert_snapshot!(
        error("-- name: getUser :one :many\nSELECT 1"),
        @"queries.sql:1: statement getUser has more than one cardinality"
    );
    insta::assert_snapshot!(
        error("-- name: getUser :some\nSELECT 1"),
        @"queries.sql:1: unknown token ':some' in header of getUser"
    );
    insta::assert_snapshot!(
        error("-- name:\nSELECT 1"),
        @"queries.sql:1: missing statement name"
    );
    insta::assert_snapshot!(
        error("SELECT 1;\n-- name: late\nSELECT 2"),
        @"queries.sql:1: statement text before the first `-- name:` header"
    );
    insta::assert_snapshot!(
        error("-- name: empty\n;\n-- name: next\nSELECT 1"),
        @"queries.sql:1: statement empty has no body"
    );
}

#[test]
fn test_marker_errors() {
    insta::assert_snapshot!(
        error("-- name: q\nSELECT * FROM t WHERE id = /*:id*/ other_id"),
        @"queries.sql:1: q: variable :id must be followed by a literal"
    );
    insta::assert_snapshot!(
        error("-- name: q\nSELECT count(*) /*!*/ FROM t"),
        @"queries.sql:1: q: non-null marker must follow `AS <column>`"
    );
    insta::assert_snapshot!(
        error("-- name: q\nSELECT 'open"),
        @"queries.sql:1: q: unterminated ' quote"
    );
}

#[test]
fn test_script_without_statements() {
    assert!(parse("-- nothing here yet\n\n").is_empty());
}

#[test]
fn test_duplicate_names() {
    assert!(check_unique_names(["getUser", "listUsers"]).is_ok());

    let err = check_unique_names(["getUser", "listUsers", "get_user", "list-users", "other"])
        .unwrap_err();
    insta::assert_snapshot!(
        err.to_string(),
        @"duplicate statement names: getUser, get_user, list-users, listUsers"
    );
}
