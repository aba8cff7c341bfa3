use std::io;
use std::sync::Arc;

use ahash::HashMap;
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::error::StorageError;
use crate::table::Table;

#[derive(Default)]
/// The registry of named tables.
///
/// The catalog is an explicit value rather than process global state, callers
/// share it behind an `Arc` where needed.
pub struct Catalog {
    tables: RwLock<HashMap<String, Arc<Table>>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a table under the given name.
    pub fn add_table(&self, name: impl Into<String>, table: Arc<Table>) -> Result<(), StorageError> {
        let name = name.into();
        let mut tables = self.tables.write();
        if tables.contains_key(&name) {
            return Err(StorageError::TableAlreadyExists(name));
        }

        debug!(table = %name, "Registering table");
        tables.insert(name, table);
        Ok(())
    }

    /// Removes the table from the catalog.
    ///
    /// Operators and reference segments holding on to the table keep it alive.
    pub fn drop_table(&self, name: &str) -> Result<(), StorageError> {
        match self.tables.write().remove(name) {
            Some(_) => {
                debug!(table = %name, "Dropped table");
                Ok(())
            },
            None => Err(StorageError::TableNotFound(name.to_string())),
        }
    }

    pub fn get_table(&self, name: &str) -> Result<Arc<Table>, StorageError> {
        self.tables
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| StorageError::TableNotFound(name.to_string()))
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.tables.read().contains_key(name)
    }

    /// Returns the names of all registered tables in ascending order.
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.read().keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Removes every table.
    pub fn reset(&self) {
        let mut tables = self.tables.write();
        info!(num_tables = tables.len(), "Resetting catalog");
        tables.clear();
    }

    /// Writes one line per table with its columns, row count and chunk count.
    pub fn print(&self, out: &mut impl io::Write) -> io::Result<()> {
        let tables: Vec<(String, Arc<Table>)> = {
            let tables = self.tables.read();
            let mut entries: Vec<_> = tables
                .iter()
                .map(|(name, table)| (name.clone(), table.clone()))
                .collect();
            entries.sort_unstable_by(|a, b| a.0.cmp(&b.0));
            entries
        };

        for (name, table) in tables {
            writeln!(
                out,
                "({}, {} columns, {} rows, {} chunks)",
                name,
                table.column_count(),
                table.row_count(),
                table.chunk_count(),
            )?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DataType, Value};

    fn table(rows: i32) -> Arc<Table> {
        let table = Table::with_max_chunk_size(2);
        table.add_column("a", DataType::Int).unwrap();
        for i in 0..rows {
            table.append(vec![Value::Int(i)]).unwrap();
        }
        Arc::new(table)
    }

    #[test]
    fn test_add_get_drop() {
        let catalog = Catalog::new();
        let first = table(1);
        catalog.add_table("first", first.clone()).unwrap();

        assert!(catalog.has_table("first"));
        assert!(Arc::ptr_eq(&catalog.get_table("first").unwrap(), &first));

        catalog.drop_table("first").unwrap();
        assert!(!catalog.has_table("first"));
        assert_eq!(
            catalog.get_table("first").unwrap_err(),
            StorageError::TableNotFound("first".to_string())
        );
        assert!(catalog.drop_table("first").unwrap_err().is_not_found());
    }

    #[test]
    fn test_duplicate_name() {
        let catalog = Catalog::new();
        catalog.add_table("t", table(0)).unwrap();
        assert_eq!(
            catalog.add_table("t", table(0)),
            Err(StorageError::TableAlreadyExists("t".to_string()))
        );
    }

    #[test]
    fn test_table_names_and_reset() {
        let catalog = Catalog::new();
        assert!(catalog.table_names().is_empty());

        catalog.add_table("b", table(0)).unwrap();
        catalog.add_table("a", table(0)).unwrap();
        assert_eq!(catalog.table_names(), vec!["a".to_string(), "b".to_string()]);

        catalog.reset();
        assert!(catalog.table_names().is_empty());
        assert!(!catalog.has_table("a"));
    }

    #[test]
    fn test_print() {
        let catalog = Catalog::new();
        catalog.add_table("numbers", table(3)).unwrap();
        catalog.add_table("empty", table(0)).unwrap();

        let mut out = Vec::new();
        catalog.print(&mut out).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert_eq!(
            out,
            "(empty, 1 columns, 0 rows, 1 chunks)\n(numbers, 1 columns, 3 rows, 2 chunks)\n"
        );
    }
}
