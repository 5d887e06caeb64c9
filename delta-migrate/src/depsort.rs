//! Foreign key ordering of tables.

use std::collections::HashMap;

use delta_schema::Table;

use crate::error::{MigrateResult, MigrationError};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Visiting,
    Done,
}

/// Orders tables so that every table comes after the tables it references.
///
/// Self-references and references to tables outside the input are ignored.
/// Among tables with no ordering constraint between them, input order is
/// kept.
#[derive(Debug, Default, Clone, Copy)]
pub struct DependencySorter;

impl DependencySorter {
    /// Create a sorter.
    pub fn new() -> Self {
        Self
    }

    /// Sort `tables` by foreign key dependency.
    ///
    /// Returns [`MigrationError::CircularDependency`] naming a table on the
    /// cycle when the references form one.
    pub fn sort<'a>(&self, tables: &[&'a Table]) -> MigrateResult<Vec<&'a Table>> {
        let positions: HashMap<&str, usize> = tables
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name(), i))
            .collect();

        let mut marks = vec![Mark::Unvisited; tables.len()];
        let mut ordered = Vec::with_capacity(tables.len());
        for start in 0..tables.len() {
            self.visit(start, tables, &positions, &mut marks, &mut ordered)?;
        }

        tracing::trace!(tables = ordered.len(), "sorted tables by dependency");
        Ok(ordered)
    }

    fn visit<'a>(
        &self,
        i: usize,
        tables: &[&'a Table],
        positions: &HashMap<&str, usize>,
        marks: &mut [Mark],
        ordered: &mut Vec<&'a Table>,
    ) -> MigrateResult<()> {
        match marks[i] {
            Mark::Done => return Ok(()),
            Mark::Visiting => return Err(MigrationError::circular(tables[i].name())),
            Mark::Unvisited => {}
        }

        marks[i] = Mark::Visiting;
        let table = tables[i];
        for referenced in table.referenced_tables() {
            if referenced == table.name() {
                continue;
            }
            if let Some(&dep) = positions.get(referenced) {
                self.visit(dep, tables, positions, marks, ordered)?;
            }
        }
        marks[i] = Mark::Done;
        ordered.push(table);
        Ok(())
    }
}
