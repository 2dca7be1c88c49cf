//! Decoding catalog type rows into [`Type`]s.

use crate::catalog::{ElementRow, TypeRow};
use crate::{Error, Result};
use pgmodel_schema::{ObjectName, Primitive, Type};

const SYSTEM_SCHEMA: &str = "pg_catalog";
const ARRAY_PREFIX: char = '_';

/// Decode the type of a column, field or parameter, domain included.
pub fn decode_type(row: &TypeRow) -> Result<Type> {
    let ty = decode_physical(
        &row.name,
        &row.category,
        row.element.as_ref(),
        row.numeric_precision,
        row.numeric_scale,
    )?;
    Ok(wrap_domain(ty, row.domain.as_ref()))
}

fn wrap_domain(ty: Type, domain: Option<&ObjectName>) -> Type {
    match domain {
        Some(name) => Type::domain(name.clone(), ty),
        None => ty,
    }
}

fn decode_physical(
    name: &ObjectName,
    category: &str,
    element: Option<&ElementRow>,
    precision: Option<i32>,
    scale: Option<i32>,
) -> Result<Type> {
    // Array types are named after their element with a leading underscore
    if let (Some(element), true) = (element, name.name.starts_with(ARRAY_PREFIX)) {
        let inner = decode_physical(&element.name, &element.category, None, precision, scale)?;
        return Ok(Type::array(wrap_domain(inner, element.domain.as_ref())));
    }

    if name.schema_name() != SYSTEM_SCHEMA {
        return match category {
            "E" => Ok(Type::Enum(name.clone())),
            "C" => Ok(Type::Composite(name.clone())),
            "U" if name.name == "vector" => Ok(Type::PgVector(name.schema.clone())),
            _ => Err(Error::UnknownTypeCategory {
                schema: name.schema_name().to_string(),
                name: name.name.clone(),
                category: category.to_string(),
            }),
        };
    }

    let primitive = Primitive::from_pg_name(&name.name).ok_or_else(|| Error::UnknownPrimitive {
        name: name.name.clone(),
    })?;

    if primitive != Primitive::Numeric {
        return Ok(Type::Primitive(primitive));
    }
    match (precision, scale) {
        (Some(precision), Some(scale)) => Ok(Type::Numeric { precision, scale }),
        (None, None) => Ok(Type::Primitive(Primitive::Numeric)),
        (precision, scale) => Err(Error::InconsistentNumeric {
            type_name: name.to_string(),
            precision,
            scale,
        }),
    }
}
