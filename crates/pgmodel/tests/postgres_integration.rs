//! Resolution against a real Postgres.
//!
//! Run with `cargo test -p pgmodel --features test-postgres` (needs docker).

#![cfg(feature = "test-postgres")]

use pgmodel::{
    Catalog, PgCatalog, ResolveRequest, Session, SqlObjectFilter, TypeOverwrites, resolve,
};
use pgmodel_schema::{Cardinality, ObjectName, Primitive, Type, ValueClass};
use testcontainers::ContainerAsync;
use testcontainers::runners::AsyncRunner;
use testcontainers_modules::postgres::Postgres;

const SCHEMA: &str = r#"
CREATE TYPE mood AS ENUM ('sad', 'ok', 'happy');
CREATE DOMAIN email AS text CHECK (VALUE LIKE '%@%');
CREATE DOMAIN work_email AS email;
CREATE TYPE address AS (street text, city text);

CREATE TABLE account (
    id bigserial PRIMARY KEY,
    balance numeric(10, 2) NOT NULL DEFAULT 0
);

CREATE TABLE "user" (
    id bigserial PRIMARY KEY,
    account_id bigint NOT NULL REFERENCES account (id),
    email work_email NOT NULL UNIQUE,
    tags text[] NOT NULL DEFAULT '{}',
    home address
);

CREATE TABLE post (
    id bigserial PRIMARY KEY,
    author_id bigint NOT NULL REFERENCES "user" (id),
    mood mood,
    title text NOT NULL CHECK (title <> '')
);

CREATE TABLE unrelated (id int4 PRIMARY KEY);
"#;

const SCRIPT: &str = r#"
-- name: postsByMood
SELECT p.id, p.title, u.email AS email /*!*/
FROM post p
JOIN "user" u ON u.id = p.author_id
WHERE p.mood = /*:mood*/ 'ok' AND p.author_id = /*:author*/ 1;

-- name: addBalance :one
UPDATE account SET balance = balance + /*:amount*/ 1.50 WHERE id = /*:id*/ 1;
"#;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn start() -> (ContainerAsync<Postgres>, String) {
    let container = Postgres::default().start().await.unwrap();
    let host = container.get_host().await.unwrap();
    let port = container.get_host_port_ipv4(5432).await.unwrap();
    let url = format!("postgres://postgres:postgres@{}:{}/postgres", host, port);
    (container, url)
}

async fn count(session: &Session, sql: &str) -> i64 {
    let row = session.client().query_one(sql, &[]).await.unwrap();
    row.get(0)
}

#[tokio::test]
async fn test_resolve_live_schema() {
    init_tracing();
    let (_container, url) = start().await;
    let session = Session::connect(&url).await.unwrap();
    session.client().batch_execute(SCHEMA).await.unwrap();

    let catalog = PgCatalog::new(session.client()).await.unwrap();
    assert_eq!(catalog.database(), "postgres");
    let name = |n: &str| ObjectName::new("postgres", "public", n);

    let mut overwrites = TypeOverwrites::default();
    overwrites
        .columns
        .insert(name("user").column("id"), ValueClass::new("app.UserId"));
    let request = ResolveRequest {
        filter: SqlObjectFilter::objects([name("post")]),
        scripts: vec![("posts.sql".to_string(), SCRIPT.to_string())],
        overwrites,
    };
    let model = resolve(&catalog, &request).await.unwrap();

    let tables: Vec<&str> = model.tables.iter().map(|t| t.name.name.as_str()).collect();
    assert_eq!(tables, vec!["account", "post", "user"]);

    let account = model.table("account").unwrap();
    assert_eq!(
        account.column("balance").unwrap().ty,
        Type::Numeric {
            precision: 10,
            scale: 2
        }
    );
    assert!(account.column("balance").unwrap().default.is_some());

    let user = model.table("user").unwrap();
    assert_eq!(user.primary_key.as_ref().unwrap().columns, vec!["id"]);
    assert!(user.unique_constraints.contains("user_email_key"));
    assert_eq!(
        user.column("email").unwrap().ty,
        Type::domain(name("work_email"), Type::Primitive(Primitive::Text))
    );
    assert_eq!(
        user.column("tags").unwrap().ty,
        Type::array(Type::Primitive(Primitive::Text))
    );
    assert_eq!(
        user.column("home").unwrap().ty,
        Type::Composite(name("address"))
    );
    assert!(!user.column("account_id").unwrap().nullable);
    assert!(user.column("home").unwrap().nullable);

    let post = model.table("post").unwrap();
    assert_eq!(post.foreign_keys[0].target, name("user"));
    assert!(post.check_constraints.contains("post_title_check"));
    assert_eq!(
        post.column("author_id").unwrap().ty,
        Type::reference(
            ValueClass::new("app.UserId"),
            Type::Primitive(Primitive::Int8)
        )
    );

    assert_eq!(model.enums.len(), 1);
    assert_eq!(model.enums[0].labels, vec!["sad", "ok", "happy"]);
    assert_eq!(model.composite_types.len(), 1);
    assert_eq!(model.composite_types[0].name, name("address"));

    let posts = model.statement("postsByMood").unwrap();
    assert_eq!(posts.parameters["mood"], Type::Enum(name("mood")));
    assert_eq!(
        posts.parameters["author"],
        Type::Primitive(Primitive::Int8)
    );
    let columns: Vec<(&str, bool)> = posts
        .columns
        .iter()
        .map(|c| (c.name.as_str(), c.nullable))
        .collect();
    assert_eq!(
        columns,
        vec![("id", true), ("title", true), ("email", false)]
    );
    assert_eq!(posts.columns[0].ty, Type::Primitive(Primitive::Int8));

    let add_balance = model.statement("addBalance").unwrap();
    assert_eq!(add_balance.cardinality, Cardinality::One);
    assert!(add_balance.columns.is_empty());
    assert_eq!(
        add_balance.parameters["amount"],
        Type::Primitive(Primitive::Numeric)
    );
    assert_eq!(
        add_balance.sql,
        "UPDATE account SET balance = balance + $1 WHERE id = $2"
    );

    // no probe objects survive resolution
    assert_eq!(
        count(&session, "SELECT count(*) FROM pg_prepared_statements").await,
        0
    );
    assert_eq!(
        count(
            &session,
            "SELECT count(*) FROM pg_class WHERE relnamespace = pg_my_temp_schema()"
        )
        .await,
        0
    );
}

#[tokio::test]
async fn test_failed_statement_is_named() {
    init_tracing();
    let (_container, url) = start().await;
    let session = Session::connect(&url).await.unwrap();
    session.client().batch_execute(SCHEMA).await.unwrap();
    let catalog = PgCatalog::new(session.client()).await.unwrap();

    let request = ResolveRequest {
        filter: SqlObjectFilter::Any(Vec::new()),
        scripts: vec![(
            "broken.sql".to_string(),
            "-- name: broken\nSELECT missing_column FROM post WHERE id = /*:id*/ 1".to_string(),
        )],
        overwrites: TypeOverwrites::default(),
    };
    let err = resolve(&catalog, &request).await.unwrap_err();
    assert!(matches!(err, pgmodel::Error::Probe { ref statement, .. } if statement == "broken"));

    // the session is still usable and holds no probe objects
    assert_eq!(
        count(&session, "SELECT count(*) FROM pg_prepared_statements").await,
        0
    );
}

#[tokio::test]
async fn test_label_free_enum_and_table_row_type() {
    init_tracing();
    let (_container, url) = start().await;
    let session = Session::connect(&url).await.unwrap();
    session
        .client()
        .batch_execute(
            r#"
CREATE TYPE pending AS ENUM ();
CREATE TABLE point_log (x float8 NOT NULL, y float8 NOT NULL);
CREATE TABLE track (
    id int8 PRIMARY KEY,
    state pending,
    last point_log
);
"#,
        )
        .await
        .unwrap();
    let catalog = PgCatalog::new(session.client()).await.unwrap();
    let name = |n: &str| ObjectName::new("postgres", "public", n);

    let request = ResolveRequest {
        filter: SqlObjectFilter::objects([name("track")]),
        scripts: Vec::new(),
        overwrites: TypeOverwrites::default(),
    };
    let model = resolve(&catalog, &request).await.unwrap();

    let tables: Vec<&str> = model.tables.iter().map(|t| t.name.name.as_str()).collect();
    assert_eq!(tables, vec!["track"]);

    assert_eq!(model.enums.len(), 1);
    assert_eq!(model.enums[0].name, name("pending"));
    assert!(model.enums[0].labels.is_empty());

    assert_eq!(model.composite_types.len(), 1);
    let row = &model.composite_types[0];
    assert_eq!(row.name, name("point_log"));
    let fields: Vec<&str> = row.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(fields, vec!["x", "y"]);
    assert_eq!(row.fields[0].ty, Type::Primitive(Primitive::Float8));
}
