//! The column type algebra.

use crate::{ObjectName, SchemaName};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Built-in Postgres types, keyed by their physical (`pg_type.typname`) name.
///
/// The serialized form of each variant is the physical name itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Primitive {
    Bool,
    Int2,
    Int4,
    Int8,
    Float4,
    Float8,
    /// NUMERIC without precision and scale
    Numeric,
    Money,
    Text,
    Varchar,
    Bpchar,
    /// The single-byte `"char"` type
    Char,
    Name,
    Bytea,
    Date,
    Time,
    Timetz,
    Timestamp,
    Timestamptz,
    Interval,
    Uuid,
    Json,
    Jsonb,
    Xml,
    Inet,
    Cidr,
    Macaddr,
    Bit,
    Varbit,
    Tsvector,
    Tsquery,
    Oid,
    Regclass,
    Regtype,
    Int4range,
    Int8range,
    Numrange,
    Tsrange,
    Tstzrange,
    Daterange,
    Int4multirange,
    Int8multirange,
    Nummultirange,
    Tsmultirange,
    Tstzmultirange,
    Datemultirange,
}

impl Primitive {
    /// All primitives, in declaration order.
    pub const ALL: &'static [Primitive] = &[
        Primitive::Bool,
        Primitive::Int2,
        Primitive::Int4,
        Primitive::Int8,
        Primitive::Float4,
        Primitive::Float8,
        Primitive::Numeric,
        Primitive::Money,
        Primitive::Text,
        Primitive::Varchar,
        Primitive::Bpchar,
        Primitive::Char,
        Primitive::Name,
        Primitive::Bytea,
        Primitive::Date,
        Primitive::Time,
        Primitive::Timetz,
        Primitive::Timestamp,
        Primitive::Timestamptz,
        Primitive::Interval,
        Primitive::Uuid,
        Primitive::Json,
        Primitive::Jsonb,
        Primitive::Xml,
        Primitive::Inet,
        Primitive::Cidr,
        Primitive::Macaddr,
        Primitive::Bit,
        Primitive::Varbit,
        Primitive::Tsvector,
        Primitive::Tsquery,
        Primitive::Oid,
        Primitive::Regclass,
        Primitive::Regtype,
        Primitive::Int4range,
        Primitive::Int8range,
        Primitive::Numrange,
        Primitive::Tsrange,
        Primitive::Tstzrange,
        Primitive::Daterange,
        Primitive::Int4multirange,
        Primitive::Int8multirange,
        Primitive::Nummultirange,
        Primitive::Tsmultirange,
        Primitive::Tstzmultirange,
        Primitive::Datemultirange,
    ];

    /// The physical type name as found in `pg_type.typname`.
    pub fn pg_name(&self) -> &'static str {
        match self {
            Primitive::Bool => "bool",
            Primitive::Int2 => "int2",
            Primitive::Int4 => "int4",
            Primitive::Int8 => "int8",
            Primitive::Float4 => "float4",
            Primitive::Float8 => "float8",
            Primitive::Numeric => "numeric",
            Primitive::Money => "money",
            Primitive::Text => "text",
            Primitive::Varchar => "varchar",
            Primitive::Bpchar => "bpchar",
            Primitive::Char => "char",
            Primitive::Name => "name",
            Primitive::Bytea => "bytea",
            Primitive::Date => "date",
            Primitive::Time => "time",
            Primitive::Timetz => "timetz",
            Primitive::Timestamp => "timestamp",
            Primitive::Timestamptz => "timestamptz",
            Primitive::Interval => "interval",
            Primitive::Uuid => "uuid",
            Primitive::Json => "json",
            Primitive::Jsonb => "jsonb",
            Primitive::Xml => "xml",
            Primitive::Inet => "inet",
            Primitive::Cidr => "cidr",
            Primitive::Macaddr => "macaddr",
            Primitive::Bit => "bit",
            Primitive::Varbit => "varbit",
            Primitive::Tsvector => "tsvector",
            Primitive::Tsquery => "tsquery",
            Primitive::Oid => "oid",
            Primitive::Regclass => "regclass",
            Primitive::Regtype => "regtype",
            Primitive::Int4range => "int4range",
            Primitive::Int8range => "int8range",
            Primitive::Numrange => "numrange",
            Primitive::Tsrange => "tsrange",
            Primitive::Tstzrange => "tstzrange",
            Primitive::Daterange => "daterange",
            Primitive::Int4multirange => "int4multirange",
            Primitive::Int8multirange => "int8multirange",
            Primitive::Nummultirange => "nummultirange",
            Primitive::Tsmultirange => "tsmultirange",
            Primitive::Tstzmultirange => "tstzmultirange",
            Primitive::Datemultirange => "datemultirange",
        }
    }

    /// Look up a primitive by physical type name.
    ///
    /// Returns `None` for anything outside the closed set; callers treat that
    /// as a fatal error rather than guessing.
    pub fn from_pg_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.pg_name() == name)
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.pg_name())
    }
}

/// A caller-declared external value type that replaces a column or domain
/// type in generated code.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValueClass {
    /// Fully qualified name of the value type in the target language.
    pub name: String,
}

impl ValueClass {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl fmt::Display for ValueClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// The logical type of a column, field, parameter or result column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Type {
    Primitive(Primitive),
    Array(Box<Type>),
    Enum(ObjectName),
    Composite(ObjectName),
    /// NUMERIC with explicit precision and scale
    Numeric {
        precision: i32,
        scale: i32,
    },
    /// The pgvector extension type, installed in `schema`
    PgVector(SchemaName),
    Domain {
        name: ObjectName,
        original: Box<Type>,
    },
    Reference {
        value_class: ValueClass,
        original: Box<Type>,
    },
}

impl Type {
    pub fn array(element: Type) -> Self {
        Type::Array(Box::new(element))
    }

    pub fn domain(name: ObjectName, original: Type) -> Self {
        Type::Domain {
            name,
            original: Box::new(original),
        }
    }

    pub fn reference(value_class: ValueClass, original: Type) -> Self {
        Type::Reference {
            value_class,
            original: Box::new(original),
        }
    }

    /// SQL spelling of this type, usable in casts.
    ///
    /// References render their original type: the value class only exists
    /// in generated code.
    pub fn sql_name(&self) -> String {
        match self {
            Type::Primitive(p) => p.pg_name().to_string(),
            Type::Array(element) => format!("{}[]", element.sql_name()),
            Type::Enum(name) | Type::Composite(name) => name.to_sql(),
            Type::Numeric { precision, scale } => format!("numeric({},{})", precision, scale),
            Type::PgVector(schema) => pgmodel_sql::qualified_ident(&schema.schema, "vector"),
            Type::Domain { name, .. } => name.to_sql(),
            Type::Reference { original, .. } => original.sql_name(),
        }
    }

    /// Strip domain and reference wrappers, down to the storage type.
    pub fn storage(&self) -> &Type {
        match self {
            Type::Domain { original, .. } | Type::Reference { original, .. } => original.storage(),
            other => other,
        }
    }

    /// Every enum and composite type this type mentions, recursively.
    pub fn referenced_objects(&self) -> Vec<&ObjectName> {
        let mut out = Vec::new();
        self.collect_referenced_objects(&mut out);
        out
    }

    fn collect_referenced_objects<'a>(&'a self, out: &mut Vec<&'a ObjectName>) {
        match self {
            Type::Enum(name) | Type::Composite(name) => out.push(name),
            Type::Array(element) => element.collect_referenced_objects(out),
            Type::Domain { original, .. } | Type::Reference { original, .. } => {
                original.collect_referenced_objects(out)
            }
            Type::Primitive(_) | Type::Numeric { .. } | Type::PgVector(_) => {}
        }
    }

    /// Rebuild this type bottom-up, giving `f` a chance to replace each
    /// domain after its original type has been rewritten.
    pub fn map_domains(&self, f: &mut impl FnMut(&ObjectName, Type) -> Type) -> Type {
        match self {
            Type::Array(element) => Type::array(element.map_domains(f)),
            Type::Domain { name, original } => {
                let original = original.map_domains(f);
                f(name, Type::domain(name.clone(), original))
            }
            Type::Reference {
                value_class,
                original,
            } => Type::reference(value_class.clone(), original.map_domains(f)),
            other => other.clone(),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Reference {
                value_class,
                original,
            } => write!(f, "{} ({})", value_class, original),
            other => f.write_str(&other.sql_name()),
        }
    }
}
