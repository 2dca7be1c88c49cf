//! Caller-declared type overwrites.
//!
//! A column overwrite applies to every column connected to it through
//! foreign keys, in either direction. A domain overwrite applies to every
//! use of the domain.

use crate::error::OverwriteConflict;
use crate::{Error, Result};
use pgmodel_schema::{ColumnRef, CompositeType, ObjectName, Statement, Table, Type, ValueClass};
use std::collections::{BTreeMap, BTreeSet};

/// Overwrites requested for one database.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeOverwrites {
    pub columns: BTreeMap<ColumnRef, ValueClass>,
    pub domains: BTreeMap<ObjectName, ValueClass>,
}

impl TypeOverwrites {
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() && self.domains.is_empty()
    }
}

// ============================================================================
// Equivalence classes
// ============================================================================

/// Union-find over columns.
#[derive(Debug, Default)]
struct DisjointSet {
    index: BTreeMap<ColumnRef, usize>,
    parent: Vec<usize>,
}

impl DisjointSet {
    fn id(&mut self, column: &ColumnRef) -> usize {
        if let Some(&id) = self.index.get(column) {
            return id;
        }
        let id = self.parent.len();
        self.parent.push(id);
        self.index.insert(column.clone(), id);
        id
    }

    fn root(&mut self, mut id: usize) -> usize {
        while self.parent[id] != id {
            self.parent[id] = self.parent[self.parent[id]];
            id = self.parent[id];
        }
        id
    }

    fn union(&mut self, a: &ColumnRef, b: &ColumnRef) {
        let a = self.id(a);
        let b = self.id(b);
        let (ra, rb) = (self.root(a), self.root(b));
        if ra != rb {
            // keep the older root so ids stay stable
            let (keep, drop) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[drop] = keep;
        }
    }

    /// Members of every class, keyed by root.
    fn classes(&mut self) -> BTreeMap<usize, Vec<ColumnRef>> {
        let columns: Vec<(ColumnRef, usize)> =
            self.index.iter().map(|(c, id)| (c.clone(), *id)).collect();
        let mut classes: BTreeMap<usize, Vec<ColumnRef>> = BTreeMap::new();
        for (column, id) in columns {
            let root = self.root(id);
            classes.entry(root).or_default().push(column);
        }
        classes
    }
}

/// Extend column overwrites across foreign key equivalence classes.
///
/// Returns the overwrite for every column whose class holds one. Fails with
/// every class that received more than one distinct overwrite, or on an
/// overwrite naming a column no resolved table has.
pub fn merge_column_overwrites(
    tables: &[Table],
    overwrites: &BTreeMap<ColumnRef, ValueClass>,
) -> Result<BTreeMap<ColumnRef, ValueClass>> {
    let by_name: BTreeMap<&ObjectName, &Table> = tables.iter().map(|t| (&t.name, t)).collect();
    for column in overwrites.keys() {
        let known = by_name
            .get(&column.table)
            .is_some_and(|t| t.column(&column.column).is_some());
        if !known {
            return Err(Error::UnknownOverwriteColumn(column.clone()));
        }
    }

    let mut set = DisjointSet::default();
    for column in overwrites.keys() {
        set.id(column);
    }
    for table in tables {
        for fk in &table.foreign_keys {
            for pair in &fk.columns {
                set.union(&table.column_ref(&pair.source), &fk.target.column(&pair.target));
            }
        }
    }

    let mut merged = BTreeMap::new();
    let mut conflicts = Vec::new();
    for members in set.classes().into_values() {
        let found: BTreeSet<&ValueClass> =
            members.iter().filter_map(|c| overwrites.get(c)).collect();
        match found.len() {
            0 => {}
            1 => {
                if let Some(value_class) = found.into_iter().next() {
                    for column in members {
                        merged.insert(column, value_class.clone());
                    }
                }
            }
            _ => conflicts.push(OverwriteConflict {
                columns: members,
                overwrites: found.into_iter().cloned().collect(),
            }),
        }
    }

    if !conflicts.is_empty() {
        conflicts.sort_by(|a, b| a.columns.cmp(&b.columns));
        return Err(Error::ConflictingOverwrites(conflicts));
    }
    Ok(merged)
}

// ============================================================================
// Application
// ============================================================================

/// Replace overwritten domains anywhere inside `ty`.
fn apply_domains(
    ty: &Type,
    domains: &BTreeMap<ObjectName, ValueClass>,
    used: &mut BTreeSet<ObjectName>,
) -> Type {
    ty.map_domains(&mut |name, domain| match domains.get(name) {
        Some(value_class) => {
            used.insert(name.clone());
            Type::reference(value_class.clone(), domain)
        }
        None => domain,
    })
}

/// Apply overwrites to the resolved tables, composite types and statements.
///
/// A column overwrite wraps the column's type, domain included. Columns
/// without one, composite fields and statement types get domain overwrites.
pub fn apply_overwrites(
    tables: &mut [Table],
    composite_types: &mut [CompositeType],
    statements: &mut [Statement],
    overwrites: &TypeOverwrites,
) -> Result<()> {
    if overwrites.is_empty() {
        return Ok(());
    }
    let columns = merge_column_overwrites(tables, &overwrites.columns)?;
    let domains = &overwrites.domains;
    let mut used = BTreeSet::new();

    for table in tables.iter_mut() {
        for column in &mut table.columns {
            let column_ref = table.name.column(&column.name);
            column.ty = match columns.get(&column_ref) {
                Some(value_class) => Type::reference(value_class.clone(), column.ty.clone()),
                None => apply_domains(&column.ty, domains, &mut used),
            };
        }
    }
    for composite in composite_types.iter_mut() {
        for field in &mut composite.fields {
            field.ty = apply_domains(&field.ty, domains, &mut used);
        }
    }
    for statement in statements.iter_mut() {
        for ty in statement.parameters.values_mut() {
            *ty = apply_domains(ty, domains, &mut used);
        }
        for column in &mut statement.columns {
            column.ty = apply_domains(&column.ty, domains, &mut used);
        }
    }

    for domain in domains.keys().filter(|d| !used.contains(*d)) {
        tracing::warn!("type overwrite for domain {} matched no column", domain);
    }
    tracing::debug!(
        columns = columns.len(),
        domains = used.len(),
        "applied type overwrites"
    );
    Ok(())
}
