use std::sync::Arc;

use strata_storage::{Catalog, Table};

use crate::error::ScanError;

/// A node of a query plan.
///
/// Operators are pulled synchronously: `execute` runs the operator and all of
/// its inputs to completion and returns the resulting table.
pub trait Operator: Send + Sync {
    /// A short name used in logs.
    fn name(&self) -> &'static str;

    fn execute(&self) -> Result<Arc<Table>, ScanError>;
}

#[derive(Debug, Clone)]
/// Feeds an existing table into a plan.
pub struct TableWrapper {
    table: Arc<Table>,
}

impl TableWrapper {
    pub fn new(table: Arc<Table>) -> Self {
        Self { table }
    }
}

impl Operator for TableWrapper {
    fn name(&self) -> &'static str {
        "TableWrapper"
    }

    fn execute(&self) -> Result<Arc<Table>, ScanError> {
        Ok(self.table.clone())
    }
}

/// Looks a table up in a [Catalog] at execution time.
pub struct GetTable {
    catalog: Arc<Catalog>,
    table_name: String,
}

impl GetTable {
    pub fn new(catalog: Arc<Catalog>, table_name: impl Into<String>) -> Self {
        Self {
            catalog,
            table_name: table_name.into(),
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }
}

impl Operator for GetTable {
    fn name(&self) -> &'static str {
        "GetTable"
    }

    fn execute(&self) -> Result<Arc<Table>, ScanError> {
        Ok(self.catalog.get_table(&self.table_name)?)
    }
}
