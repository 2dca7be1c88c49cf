//! Hand-authored SQL statements: script parsing and type introspection.

mod introspect;
mod parse;

pub use introspect::{introspect_statement, introspect_statements};
pub use parse::{ParsedStatement, check_unique_names, parse_script};
