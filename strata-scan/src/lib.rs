//! Pull based operators over [strata_storage] tables.
//!
//! Every operator produces a whole table on [Operator::execute], the [TableScan]
//! produces a reference table that points straight at the base table it filtered.

mod error;
mod operator;
mod scan_type;
mod table_scan;

pub use self::error::ScanError;
pub use self::operator::{GetTable, Operator, TableWrapper};
pub use self::scan_type::{ScanType, UnknownScanType};
pub use self::table_scan::TableScan;
