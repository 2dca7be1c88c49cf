//! Catalog SQL.
//!
//! Every query reads `pg_catalog` only, casts all text-ish columns to `text`
//! and all integers to `int4`, and takes its object restriction as an
//! already-rendered [`SqlObjectFilter`](crate::SqlObjectFilter) fragment.

use pgmodel_sql::Lit;

/// Relation kinds that count as tables: ordinary, partitioned, views,
/// materialized views and foreign tables.
const TABLE_RELKINDS: &str = "('r', 'p', 'v', 'm', 'f')";

/// Relation kinds with a row type: standalone composites plus every table
/// kind, since a column may be typed as another table's row.
const ROW_TYPE_RELKINDS: &str = "('c', 'r', 'p', 'v', 'm', 'f')";

/// Resolves every domain to its innermost non-domain base type. A typmod
/// declared on an outer domain wins over inner ones.
const DOMAIN_BASE_CTE: &str = "\
WITH RECURSIVE domain_chain(oid, base_oid, typmod) AS (
    SELECT t.oid, t.typbasetype, t.typtypmod
    FROM pg_catalog.pg_type t
    WHERE t.typtype = 'd'
  UNION ALL
    SELECT d.oid, t.typbasetype, CASE WHEN d.typmod >= 0 THEN d.typmod ELSE t.typtypmod END
    FROM domain_chain d
    JOIN pg_catalog.pg_type t ON t.oid = d.base_oid
    WHERE t.typtype = 'd'
),
domain_base AS (
    SELECT d.oid, d.base_oid, d.typmod
    FROM domain_chain d
    JOIN pg_catalog.pg_type t ON t.oid = d.base_oid
    WHERE t.typtype <> 'd'
)";

/// Columns read by [`TypeRow`](super::TypeRow).
const TYPE_COLUMNS: &str = "\
    bt.typname::text AS type_name,
    btn.nspname::text AS type_schema,
    bt.typcategory::text AS type_category,
    eb.typname::text AS element_name,
    ebn.nspname::text AS element_schema,
    eb.typcategory::text AS element_category,
    CASE WHEN edb.oid IS NOT NULL THEN etn.nspname::text END AS element_domain_schema,
    CASE WHEN edb.oid IS NOT NULL THEN et.typname::text END AS element_domain_name,
    CASE WHEN db.oid IS NOT NULL THEN tn.nspname::text END AS domain_schema,
    CASE WHEN db.oid IS NOT NULL THEN t.typname::text END AS domain_name,
    CASE WHEN m.typmod >= 4 AND 'numeric' IN (bt.typname, eb.typname)
        THEN (((m.typmod - 4) >> 16) & 65535)::int4 END AS numeric_precision,
    CASE WHEN m.typmod >= 4 AND 'numeric' IN (bt.typname, eb.typname)
        THEN ((((m.typmod - 4) & 2047) # 1024) - 1024)::int4 END AS numeric_scale";

/// Joins resolving the type with oid `type_oid` and modifier `typmod` into
/// the aliases [`TYPE_COLUMNS`] reads.
fn type_joins(type_oid: &str, typmod: &str) -> String {
    format!(
        "\
JOIN pg_catalog.pg_type t ON t.oid = {type_oid}
JOIN pg_catalog.pg_namespace tn ON tn.oid = t.typnamespace
LEFT JOIN domain_base db ON db.oid = t.oid
JOIN pg_catalog.pg_type bt ON bt.oid = COALESCE(db.base_oid, t.oid)
JOIN pg_catalog.pg_namespace btn ON btn.oid = bt.typnamespace
LEFT JOIN pg_catalog.pg_type et ON bt.typcategory = 'A' AND et.oid = bt.typelem
LEFT JOIN pg_catalog.pg_namespace etn ON etn.oid = et.typnamespace
LEFT JOIN domain_base edb ON edb.oid = et.oid
LEFT JOIN pg_catalog.pg_type eb ON eb.oid = COALESCE(edb.base_oid, et.oid)
LEFT JOIN pg_catalog.pg_namespace ebn ON ebn.oid = eb.typnamespace
CROSS JOIN LATERAL (
    SELECT CASE WHEN db.oid IS NULL THEN {typmod} ELSE db.typmod END AS typmod
) m",
        type_oid = type_oid,
        typmod = typmod,
    )
}

fn attribute_query(relkinds: &str, filter: &str) -> String {
    format!(
        "\
{cte}
SELECT
    n.nspname::text AS schema_name,
    c.relname::text AS object_name,
    a.attnum::int4 AS position,
    a.attname::text AS column_name,
    (NOT a.attnotnull) AS nullable,
    pg_catalog.pg_get_expr(ad.adbin, ad.adrelid)::text AS column_default,
{type_columns}
FROM pg_catalog.pg_attribute a
JOIN pg_catalog.pg_class c ON c.oid = a.attrelid
JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
LEFT JOIN pg_catalog.pg_attrdef ad ON ad.adrelid = a.attrelid AND ad.adnum = a.attnum
{joins}
WHERE a.attnum > 0
  AND NOT a.attisdropped
  AND c.relkind IN {relkinds}
  AND {filter}
ORDER BY n.nspname, c.relname, a.attnum",
        cte = DOMAIN_BASE_CTE,
        type_columns = TYPE_COLUMNS,
        joins = type_joins("a.atttypid", "a.atttypmod"),
        relkinds = relkinds,
        filter = filter,
    )
}

/// Columns of tables, views and (probe) temp tables.
pub fn columns(filter: &str) -> String {
    attribute_query(TABLE_RELKINDS, filter)
}

/// Fields of composite types, including the row types of tables.
pub fn composite_fields(filter: &str) -> String {
    attribute_query(ROW_TYPE_RELKINDS, filter)
}

/// Primary key columns, one row per key column.
pub fn primary_keys(filter: &str) -> String {
    format!(
        "\
SELECT
    n.nspname::text AS schema_name,
    c.relname::text AS object_name,
    con.conname::text AS constraint_name,
    a.attname::text AS column_name,
    k.ordinal::int4 AS ordinal
FROM pg_catalog.pg_constraint con
JOIN pg_catalog.pg_class c ON c.oid = con.conrelid
JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
CROSS JOIN LATERAL unnest(con.conkey) WITH ORDINALITY AS k(attnum, ordinal)
JOIN pg_catalog.pg_attribute a ON a.attrelid = con.conrelid AND a.attnum = k.attnum
WHERE con.contype = 'p'
  AND {}
ORDER BY n.nspname, c.relname, con.conname, k.ordinal",
        filter
    )
}

/// Foreign key column pairs, one row per pair.
pub fn foreign_keys(filter: &str) -> String {
    format!(
        "\
SELECT
    n.nspname::text AS schema_name,
    c.relname::text AS object_name,
    con.conname::text AS constraint_name,
    tn.nspname::text AS target_schema,
    tc.relname::text AS target_name,
    a.attname::text AS column_name,
    ta.attname::text AS target_column,
    k.ordinal::int4 AS ordinal
FROM pg_catalog.pg_constraint con
JOIN pg_catalog.pg_class c ON c.oid = con.conrelid
JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
JOIN pg_catalog.pg_class tc ON tc.oid = con.confrelid
JOIN pg_catalog.pg_namespace tn ON tn.oid = tc.relnamespace
CROSS JOIN LATERAL unnest(con.conkey, con.confkey) WITH ORDINALITY AS k(attnum, target_attnum, ordinal)
JOIN pg_catalog.pg_attribute a ON a.attrelid = con.conrelid AND a.attnum = k.attnum
JOIN pg_catalog.pg_attribute ta ON ta.attrelid = con.confrelid AND ta.attnum = k.target_attnum
WHERE con.contype = 'f'
  AND {}
ORDER BY n.nspname, c.relname, con.conname, k.ordinal",
        filter
    )
}

/// Constraint kinds that are reported by name only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedConstraint {
    Unique,
    Check,
}

impl NamedConstraint {
    fn contype(self) -> &'static str {
        match self {
            NamedConstraint::Unique => "u",
            NamedConstraint::Check => "c",
        }
    }
}

/// Names of UNIQUE or CHECK constraints.
pub fn named_constraints(kind: NamedConstraint, filter: &str) -> String {
    format!(
        "\
SELECT
    n.nspname::text AS schema_name,
    c.relname::text AS object_name,
    con.conname::text AS constraint_name
FROM pg_catalog.pg_constraint con
JOIN pg_catalog.pg_class c ON c.oid = con.conrelid
JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
WHERE con.contype = {}
  AND {}
ORDER BY n.nspname, c.relname, con.conname",
        Lit(kind.contype()),
        filter
    )
}

/// Enum labels in catalog sort order. An enum without labels yields one
/// row with a NULL label.
pub fn enums(filter: &str) -> String {
    format!(
        "\
SELECT
    n.nspname::text AS schema_name,
    t.typname::text AS object_name,
    e.enumlabel::text AS label
FROM pg_catalog.pg_type t
JOIN pg_catalog.pg_namespace n ON n.oid = t.typnamespace
LEFT JOIN pg_catalog.pg_enum e ON e.enumtypid = t.oid
WHERE t.typtype = 'e'
  AND {}
ORDER BY n.nspname, t.typname, e.enumsortorder",
        filter
    )
}

/// Inferred parameter types of the prepared statement named `$1`.
pub fn prepared_parameter_types() -> String {
    format!(
        "\
{cte}
SELECT
    p.ordinal::int4 AS ordinal,
{type_columns}
FROM pg_catalog.pg_prepared_statements ps
CROSS JOIN LATERAL unnest(ps.parameter_types) WITH ORDINALITY AS p(type_oid, ordinal)
{joins}
WHERE ps.name = $1
ORDER BY p.ordinal",
        cte = DOMAIN_BASE_CTE,
        type_columns = TYPE_COLUMNS,
        joins = type_joins("p.type_oid::oid", "-1"),
    )
}

/// Identifier of the connected database.
pub const CURRENT_DATABASE: &str = "SELECT current_database()::text AS database_name";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_is_spliced_into_where_clause() {
        let sql = columns("n.nspname IN ('public')");
        assert!(sql.starts_with("WITH RECURSIVE domain_chain"));
        assert!(sql.contains("AND c.relkind IN ('r', 'p', 'v', 'm', 'f')\n  AND n.nspname IN ('public')\n"));

        let sql = composite_fields("n.nspname IN ('public')");
        assert!(sql.contains("AND c.relkind IN ('c', 'r', 'p', 'v', 'm', 'f')"));
    }

    #[test]
    fn test_enums_without_labels_are_kept() {
        let sql = enums("true");
        assert!(sql.contains("FROM pg_catalog.pg_type t"));
        assert!(sql.contains("LEFT JOIN pg_catalog.pg_enum e ON e.enumtypid = t.oid"));
        assert!(sql.contains("WHERE t.typtype = 'e'\n  AND true\n"));
    }

    #[test]
    fn test_named_constraint_kinds() {
        assert!(named_constraints(NamedConstraint::Unique, "true").contains("con.contype = 'u'"));
        assert!(named_constraints(NamedConstraint::Check, "true").contains("con.contype = 'c'"));
    }

    #[test]
    fn test_parameter_query_has_no_typmod() {
        let sql = prepared_parameter_types();
        assert!(sql.contains("THEN -1 ELSE db.typmod"));
        assert!(sql.contains("WHERE ps.name = $1"));
    }
}
