use std::cmp::Ordering;
use std::iter::zip;
use std::sync::Arc;

use strata_storage::{
    with_data_type,
    AnyDictionarySegment,
    AnyValueSegment,
    Chunk,
    ChunkId,
    ChunkOffset,
    ColumnDefinition,
    ColumnId,
    ColumnType,
    DictionarySegment,
    PosList,
    ReferenceSegment,
    RowId,
    Segment,
    StorageError,
    Table,
    Value,
    ValueId,
    ValueSegment,
};
use tracing::{debug, instrument, trace};

use crate::error::ScanError;
use crate::operator::Operator;
use crate::scan_type::ScanType;

/// Filters the rows of its input by comparing one column against a literal.
///
/// The result is a single chunk reference table holding one reference segment
/// per input column, all pointing at the base table the input was built from.
/// Rows keep the order of the input.
pub struct TableScan {
    input: Arc<dyn Operator>,
    column_id: ColumnId,
    scan_type: ScanType,
    search_value: Value,
}

impl TableScan {
    pub fn new(
        input: Arc<dyn Operator>,
        column_id: ColumnId,
        scan_type: ScanType,
        search_value: impl Into<Value>,
    ) -> Self {
        Self {
            input,
            column_id,
            scan_type,
            search_value: search_value.into(),
        }
    }

    pub fn column_id(&self) -> ColumnId {
        self.column_id
    }

    pub fn scan_type(&self) -> ScanType {
        self.scan_type
    }

    pub fn search_value(&self) -> &Value {
        &self.search_value
    }

    fn scan_chunks<T: ColumnType>(&self, chunks: &[Arc<Chunk>]) -> Result<PosList, ScanError> {
        let literal =
            T::from_value(&self.search_value).ok_or(ScanError::LiteralTypeMismatch {
                column_type: T::DATA_TYPE,
                literal_type: self.search_value.data_type(),
            })?;

        let mut positions = PosList::new();
        for (chunk_id, chunk) in chunks.iter().enumerate() {
            let chunk_id = chunk_id as ChunkId;
            let before = positions.len();

            match chunk.segment(self.column_id)? {
                Segment::Value(segment) => {
                    let segment = value_segment::<T>(segment)?;
                    for (offset, value) in segment.values().iter().enumerate() {
                        if self.scan_type.matches(value.compare(literal)) {
                            positions.push(RowId::new(chunk_id, offset as ChunkOffset));
                        }
                    }
                },
                Segment::Dictionary(segment) => {
                    let segment = dictionary_segment::<T>(segment)?;
                    self.scan_dictionary(chunk_id, segment, literal, &mut positions);
                },
                Segment::Reference(segment) => {
                    let mut cache = ChunkCache::new(segment.referenced_table());
                    let column_id = segment.referenced_column_id();
                    for (offset, row_id) in segment.pos_list().iter().enumerate() {
                        let chunk = cache.get(row_id.chunk_id)?;
                        let ordering = compare_at(
                            chunk.segment(column_id)?,
                            row_id.chunk_offset as usize,
                            literal,
                        )?;
                        if self.scan_type.matches(ordering) {
                            positions.push(RowId::new(chunk_id, offset as ChunkOffset));
                        }
                    }
                },
            }

            trace!(chunk_id, matches = positions.len() - before, "Scanned chunk");
        }

        Ok(positions)
    }

    fn scan_dictionary<T: ColumnType>(
        &self,
        chunk_id: ChunkId,
        segment: &DictionarySegment<T>,
        literal: &T,
        positions: &mut PosList,
    ) {
        let filter = ValueIdFilter::for_dictionary(
            self.scan_type,
            segment.lower_bound(literal),
            segment.upper_bound(literal),
            segment.unique_values_count(),
        );

        match filter {
            ValueIdFilter::Nothing => {},
            ValueIdFilter::Everything => {
                let rows = (0..segment.len())
                    .map(|offset| RowId::new(chunk_id, offset as ChunkOffset));
                positions.extend(rows);
            },
            filter => segment.attribute_vector().for_each_matching(
                |value_id| filter.matches(value_id),
                |offset| positions.push(RowId::new(chunk_id, offset as ChunkOffset)),
            ),
        }
    }
}

impl Operator for TableScan {
    fn name(&self) -> &'static str {
        "TableScan"
    }

    #[instrument(
        "table-scan",
        skip(self),
        fields(
            column_id = self.column_id,
            scan_type = %self.scan_type,
            search_value = %self.search_value,
        ),
    )]
    fn execute(&self) -> Result<Arc<Table>, ScanError> {
        let input = self.input.execute()?;

        let (columns, chunks) = input.snapshot();
        let column_type = columns
            .get(self.column_id as usize)
            .map(|column| column.data_type)
            .ok_or(StorageError::IndexOutOfRange {
                what: "column",
                index: self.column_id as usize,
                len: columns.len(),
            })?;
        let literal_type = self.search_value.data_type();
        if column_type != literal_type {
            return Err(ScanError::LiteralTypeMismatch {
                column_type,
                literal_type,
            });
        }

        let positions = with_data_type!(column_type, |T| self.scan_chunks::<T>(&chunks)?);
        debug!(
            input_rows = input.row_count(),
            matches = positions.len(),
            "Scan complete",
        );

        build_result_table(&input, columns, &chunks, positions)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
/// A predicate over the value IDs of a dictionary segment.
enum ValueIdFilter {
    Nothing,
    Everything,
    Below(u64),
    AtOrAbove(u64),
    EqualTo(u64),
    NotEqualTo(u64),
}

impl ValueIdFilter {
    /// Translates a comparison against a literal into a comparison of value IDs.
    ///
    /// `lower_bound` and `upper_bound` are the bounds of the literal within a
    /// dictionary holding `unique_values` entries. Predicates that hold for all or
    /// none of the dictionary entries collapse into [Self::Everything] and
    /// [Self::Nothing].
    fn for_dictionary(
        scan_type: ScanType,
        lower_bound: ValueId,
        upper_bound: ValueId,
        unique_values: usize,
    ) -> Self {
        let unique_values = unique_values as u64;
        let lower = if lower_bound.is_valid() { lower_bound.0 } else { unique_values };
        let upper = if upper_bound.is_valid() { upper_bound.0 } else { unique_values };
        let is_present = lower != upper;

        let filter = match scan_type {
            ScanType::Equals if is_present => Self::EqualTo(lower),
            ScanType::Equals => Self::Nothing,
            ScanType::NotEquals if is_present => Self::NotEqualTo(lower),
            ScanType::NotEquals => Self::Everything,
            ScanType::LessThan => Self::Below(lower),
            ScanType::LessThanEquals => Self::Below(upper),
            ScanType::GreaterThan => Self::AtOrAbove(upper),
            ScanType::GreaterThanEquals => Self::AtOrAbove(lower),
        };

        match filter {
            Self::Below(0) => Self::Nothing,
            Self::Below(id) if id >= unique_values => Self::Everything,
            Self::AtOrAbove(0) => Self::Everything,
            Self::AtOrAbove(id) if id >= unique_values => Self::Nothing,
            Self::EqualTo(_) if unique_values == 1 => Self::Everything,
            Self::NotEqualTo(_) if unique_values == 1 => Self::Nothing,
            other => other,
        }
    }

    #[inline]
    fn matches(self, value_id: ValueId) -> bool {
        let id = value_id.0;
        match self {
            Self::Nothing => false,
            Self::Everything => true,
            Self::Below(bound) => id < bound,
            Self::AtOrAbove(bound) => id >= bound,
            Self::EqualTo(target) => id == target,
            Self::NotEqualTo(target) => id != target,
        }
    }
}

/// Holds on to the last chunk read from a referenced table.
///
/// Position lists produced by scans are ordered by chunk, so consecutive rows
/// almost always hit the same chunk.
struct ChunkCache<'a> {
    table: &'a Table,
    current: Option<(ChunkId, Arc<Chunk>)>,
}

impl<'a> ChunkCache<'a> {
    fn new(table: &'a Table) -> Self {
        Self {
            table,
            current: None,
        }
    }

    fn get(&mut self, chunk_id: ChunkId) -> Result<&Chunk, StorageError> {
        let entry = match self.current.take() {
            Some(entry) if entry.0 == chunk_id => entry,
            _ => (chunk_id, self.table.get_chunk(chunk_id)?),
        };
        Ok(&*self.current.insert(entry).1)
    }
}

/// Compares the cell at `offset` with the literal, following reference segments
/// down to the stored value.
fn compare_at<T: ColumnType>(
    segment: &Segment,
    offset: usize,
    literal: &T,
) -> Result<Ordering, StorageError> {
    let value = match segment {
        Segment::Value(segment) => value_segment::<T>(segment)?.get(offset),
        Segment::Dictionary(segment) => dictionary_segment::<T>(segment)?.get(offset),
        Segment::Reference(segment) => {
            let row_id = segment.row_id(offset)?;
            let chunk = segment.referenced_table().get_chunk(row_id.chunk_id)?;
            let target = chunk.segment(segment.referenced_column_id())?;
            return compare_at(target, row_id.chunk_offset as usize, literal);
        },
    };

    value
        .map(|value| value.compare(literal))
        .ok_or(StorageError::IndexOutOfRange {
            what: "row",
            index: offset,
            len: segment.len(),
        })
}

fn value_segment<T: ColumnType>(
    segment: &AnyValueSegment,
) -> Result<&ValueSegment<T>, StorageError> {
    T::value_segment(segment).ok_or(StorageError::TypeMismatch {
        expected: T::DATA_TYPE,
        actual: segment.data_type(),
    })
}

fn dictionary_segment<T: ColumnType>(
    segment: &AnyDictionarySegment,
) -> Result<&DictionarySegment<T>, StorageError> {
    T::dictionary_segment(segment).ok_or(StorageError::TypeMismatch {
        expected: T::DATA_TYPE,
        actual: segment.data_type(),
    })
}

/// The table and column an input column refers to, with the position list of
/// each input chunk.
struct ReferenceTarget {
    table: Arc<Table>,
    column_id: ColumnId,
    pos_lists: Vec<Arc<PosList>>,
}

/// Returns the common target of the column if its segments are reference segments.
fn reference_target(
    chunks: &[Arc<Chunk>],
    column_id: ColumnId,
) -> Result<Option<ReferenceTarget>, ScanError> {
    let mut target: Option<ReferenceTarget> = None;
    let mut has_direct_segments = false;

    for chunk in chunks {
        let Segment::Reference(segment) = chunk.segment(column_id)? else {
            has_direct_segments = true;
            continue;
        };

        match target.as_mut() {
            None => {
                target = Some(ReferenceTarget {
                    table: segment.referenced_table().clone(),
                    column_id: segment.referenced_column_id(),
                    pos_lists: vec![segment.pos_list().clone()],
                });
            },
            Some(target)
                if Arc::ptr_eq(&target.table, segment.referenced_table())
                    && target.column_id == segment.referenced_column_id() =>
            {
                target.pos_lists.push(segment.pos_list().clone());
            },
            Some(_) => return Err(ScanError::MixedReferenceTargets(column_id)),
        }
    }

    if has_direct_segments && target.is_some() {
        return Err(ScanError::MixedReferenceTargets(column_id));
    }

    Ok(target)
}

/// Maps positions within the input table to positions within the table the
/// input column refers to.
fn flatten(positions: &PosList, pos_lists: &[Arc<PosList>]) -> Result<PosList, StorageError> {
    positions
        .iter()
        .map(|row_id| {
            let chunk_id = row_id.chunk_id as usize;
            let pos_list = pos_lists.get(chunk_id).ok_or(StorageError::IndexOutOfRange {
                what: "chunk",
                index: chunk_id,
                len: pos_lists.len(),
            })?;

            let offset = row_id.chunk_offset as usize;
            pos_list.get(offset).copied().ok_or(StorageError::IndexOutOfRange {
                what: "row",
                index: offset,
                len: pos_list.len(),
            })
        })
        .collect()
}

fn same_pos_lists(a: &[Arc<PosList>], b: &[Arc<PosList>]) -> bool {
    a.len() == b.len() && zip(a, b).all(|(a, b)| Arc::ptr_eq(a, b))
}

/// Builds the reference table holding the matched rows of every input column.
///
/// `columns` and `chunks` must come from the same [Table::snapshot].
fn build_result_table(
    input: &Arc<Table>,
    columns: Vec<ColumnDefinition>,
    chunks: &[Arc<Chunk>],
    positions: PosList,
) -> Result<Arc<Table>, ScanError> {
    let positions = Arc::new(positions);

    let mut flattened: Vec<(Vec<Arc<PosList>>, Arc<PosList>)> = Vec::new();
    let mut segments = Vec::with_capacity(columns.len());
    for column_id in 0..columns.len() {
        let column_id = column_id as ColumnId;

        let segment = match reference_target(chunks, column_id)? {
            None => ReferenceSegment::new(input.clone(), column_id, positions.clone())?,
            Some(target) => {
                let shared = flattened
                    .iter()
                    .find(|(pos_lists, _)| same_pos_lists(pos_lists, &target.pos_lists))
                    .map(|(_, output)| output.clone());

                let pos_list = match shared {
                    Some(pos_list) => pos_list,
                    None => {
                        let pos_list = Arc::new(flatten(&positions, &target.pos_lists)?);
                        flattened.push((target.pos_lists, pos_list.clone()));
                        pos_list
                    },
                };

                ReferenceSegment::new(target.table, target.column_id, pos_list)?
            },
        };

        segments.push(Segment::Reference(segment));
    }

    let chunk = Chunk::from_segments(segments)?;
    let table = Table::new_reference(columns, chunk)?;
    Ok(Arc::new(table))
}

#[cfg(test)]
mod tests {
    use std::thread;

    use strata_storage::{DataType, SegmentKind, INVALID_VALUE_ID};

    use super::*;
    use crate::operator::TableWrapper;

    fn int_table(values: &[i32], max_chunk_size: ChunkOffset) -> Arc<Table> {
        let table = Table::with_max_chunk_size(max_chunk_size);
        table.add_column("a", DataType::Int).unwrap();
        table.add_column("b", DataType::Long).unwrap();
        for value in values {
            table
                .append(vec![Value::Int(*value), Value::Long(*value as i64 * 10)])
                .unwrap();
        }
        Arc::new(table)
    }

    fn compress_all(table: &Table) {
        for chunk_id in 0..table.chunk_count() {
            table.compress_chunk(chunk_id).unwrap();
        }
    }

    fn scan(
        table: &Arc<Table>,
        column_id: ColumnId,
        scan_type: ScanType,
        value: impl Into<Value>,
    ) -> Arc<Table> {
        let input = Arc::new(TableWrapper::new(table.clone()));
        TableScan::new(input, column_id, scan_type, value).execute().unwrap()
    }

    fn reference(table: &Table, column_id: ColumnId) -> ReferenceSegment {
        let chunk = table.get_chunk(0).unwrap();
        match chunk.segment(column_id).unwrap() {
            Segment::Reference(segment) => segment.clone(),
            other => panic!("expected a reference segment, got {:?}", other.kind()),
        }
    }

    fn column_values(table: &Table, column_id: ColumnId) -> Vec<Value> {
        let chunk = table.get_chunk(0).unwrap();
        let segment = chunk.segment(column_id).unwrap();
        (0..segment.len()).map(|offset| segment.value(offset).unwrap()).collect()
    }

    #[test]
    fn test_greater_than_on_dictionary() {
        let table = int_table(&[0, 2, 4, 6, 8, 10], 10);
        compress_all(&table);

        let result = scan(&table, 0, ScanType::GreaterThan, 5);
        assert!(result.is_reference_table());
        assert_eq!(result.row_count(), 3);
        assert_eq!(result.chunk_count(), 1);
        assert_eq!(result.column_names(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(
            column_values(&result, 0),
            vec![Value::Int(6), Value::Int(8), Value::Int(10)]
        );
        assert_eq!(
            column_values(&result, 1),
            vec![Value::Long(60), Value::Long(80), Value::Long(100)]
        );

        let a = reference(&result, 0);
        let b = reference(&result, 1);
        assert!(Arc::ptr_eq(a.referenced_table(), &table));
        assert!(Arc::ptr_eq(a.pos_list(), b.pos_list()));
        assert_eq!(
            a.pos_list().as_slice(),
            &[RowId::new(0, 3), RowId::new(0, 4), RowId::new(0, 5)]
        );
    }

    #[test]
    fn test_dictionary_matches_value_scan() {
        let values: Vec<i32> = (0..50).map(|i| (i * 7) % 11).collect();
        let plain = int_table(&values, 8);
        let compressed = int_table(&values, 8);
        compress_all(&compressed);

        for scan_type in ScanType::ALL {
            for literal in -2..=12 {
                let expected = scan(&plain, 0, scan_type, literal);
                let actual = scan(&compressed, 0, scan_type, literal);
                assert_eq!(
                    reference(&expected, 0).pos_list(),
                    reference(&actual, 0).pos_list(),
                    "scan {scan_type} {literal}",
                );
            }
        }
    }

    #[test]
    fn test_mixed_encodings_keep_row_order() {
        let values: Vec<i32> = (0..20).rev().collect();
        let table = int_table(&values, 6);
        table.compress_chunk(0).unwrap();
        table.compress_chunk(2).unwrap();

        let result = scan(&table, 0, ScanType::LessThanEquals, 9);
        let expected: Vec<Value> = (0..=9).rev().map(Value::Int).collect();
        assert_eq!(column_values(&result, 0), expected);

        let pos_list = reference(&result, 0).pos_list().clone();
        let keys: Vec<_> = pos_list.iter().map(|r| (r.chunk_id, r.chunk_offset)).collect();
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_scan_of_scan_points_at_base_table() {
        let values: Vec<i32> = (0..30).collect();
        let table = int_table(&values, 7);
        compress_all(&table);

        let first = scan(&table, 0, ScanType::GreaterThanEquals, 10);
        let second = scan(&first, 1, ScanType::LessThan, 200i64);
        let third = scan(&second, 0, ScanType::NotEquals, 15);

        for result in [&second, &third] {
            for column_id in 0..2 {
                let segment = reference(result, column_id);
                assert!(Arc::ptr_eq(segment.referenced_table(), &table));
                assert_eq!(segment.referenced_column_id(), column_id);
            }
            let (a, b) = (reference(result, 0), reference(result, 1));
            assert!(Arc::ptr_eq(a.pos_list(), b.pos_list()));
        }

        let expected: Vec<Value> = (10..20).filter(|v| *v != 15).map(Value::Int).collect();
        assert_eq!(column_values(&third, 0), expected);
    }

    #[test]
    fn test_string_scan() {
        let table = Table::with_max_chunk_size(4);
        table.add_column("name", DataType::String).unwrap();
        for name in ["Bill", "Steve", "Alexander", "Steve", "Hasso", "Bill"] {
            table.append(vec![Value::from(name)]).unwrap();
        }
        let table = Arc::new(table);
        table.compress_chunk(0).unwrap();

        let steve = scan(&table, 0, ScanType::Equals, "Steve");
        assert_eq!(
            reference(&steve, 0).pos_list().as_slice(),
            &[RowId::new(0, 1), RowId::new(0, 3)]
        );

        let before_bill = scan(&table, 0, ScanType::LessThan, "Bill");
        assert_eq!(column_values(&before_bill, 0), vec![Value::from("Alexander")]);

        let not_bill = scan(&table, 0, ScanType::NotEquals, "Bill");
        assert_eq!(not_bill.row_count(), 4);
    }

    #[test]
    fn test_literal_type_mismatch() {
        let table = int_table(&[1, 2, 3], 10);
        let input = Arc::new(TableWrapper::new(table));
        let err = TableScan::new(input, 0, ScanType::Equals, 1i64)
            .execute()
            .unwrap_err();
        assert_eq!(
            err,
            ScanError::LiteralTypeMismatch {
                column_type: DataType::Int,
                literal_type: DataType::Long,
            }
        );
    }

    #[test]
    fn test_unknown_column() {
        let table = int_table(&[1], 10);
        let input = Arc::new(TableWrapper::new(table));
        let err = TableScan::new(input, 7, ScanType::Equals, 1).execute().unwrap_err();
        assert!(matches!(
            err,
            ScanError::Storage(StorageError::IndexOutOfRange { what: "column", .. })
        ));
    }

    #[test]
    fn test_empty_table_scan() {
        let table = int_table(&[], 10);
        let result = scan(&table, 0, ScanType::NotEquals, 0);
        assert_eq!(result.row_count(), 0);
        assert!(result.get_chunk(0).unwrap().is_encoded_as(SegmentKind::Reference));
    }

    #[test]
    fn test_accessors() {
        let input = Arc::new(TableWrapper::new(int_table(&[], 1)));
        let scan = TableScan::new(input, 1, ScanType::LessThan, 3i64);
        assert_eq!(scan.name(), "TableScan");
        assert_eq!(scan.column_id(), 1);
        assert_eq!(scan.scan_type(), ScanType::LessThan);
        assert_eq!(scan.search_value(), &Value::Long(3));
    }

    #[rstest::rstest]
    // Dictionary [0, 2, 4, 6, 8, 10], the literal is below the minimum.
    #[case(ScanType::Equals, INVALID_VALUE_ID, INVALID_VALUE_ID, ValueIdFilter::Nothing)]
    #[case(ScanType::Equals, ValueId(0), ValueId(0), ValueIdFilter::Nothing)]
    #[case(ScanType::NotEquals, ValueId(0), ValueId(0), ValueIdFilter::Everything)]
    #[case(ScanType::LessThan, ValueId(0), ValueId(0), ValueIdFilter::Nothing)]
    #[case(ScanType::GreaterThanEquals, ValueId(0), ValueId(0), ValueIdFilter::Everything)]
    #[case(ScanType::GreaterThan, INVALID_VALUE_ID, INVALID_VALUE_ID, ValueIdFilter::Nothing)]
    #[case(ScanType::LessThanEquals, ValueId(5), INVALID_VALUE_ID, ValueIdFilter::Everything)]
    #[case(ScanType::Equals, ValueId(2), ValueId(3), ValueIdFilter::EqualTo(2))]
    #[case(ScanType::NotEquals, ValueId(2), ValueId(3), ValueIdFilter::NotEqualTo(2))]
    #[case(ScanType::GreaterThan, ValueId(3), ValueId(3), ValueIdFilter::AtOrAbove(3))]
    #[case(ScanType::LessThanEquals, ValueId(2), ValueId(3), ValueIdFilter::Below(3))]
    fn test_value_id_filter(
        #[case] scan_type: ScanType,
        #[case] lower_bound: ValueId,
        #[case] upper_bound: ValueId,
        #[case] expected: ValueIdFilter,
    ) {
        let filter = ValueIdFilter::for_dictionary(scan_type, lower_bound, upper_bound, 6);
        assert_eq!(filter, expected);
    }

    #[test]
    fn test_equals_below_minimum_skips_chunk() {
        let table = int_table(&[0, 2, 4, 6, 8, 10], 10);
        compress_all(&table);

        let chunk = table.get_chunk(0).unwrap();
        let Segment::Dictionary(segment) = chunk.segment(0).unwrap() else {
            panic!("chunk was not compressed");
        };
        let segment = dictionary_segment::<i32>(segment).unwrap();
        let filter = ValueIdFilter::for_dictionary(
            ScanType::Equals,
            segment.lower_bound(&-1),
            segment.upper_bound(&-1),
            segment.unique_values_count(),
        );
        assert_eq!(filter, ValueIdFilter::Nothing);

        let result = scan(&table, 0, ScanType::Equals, -1);
        assert!(reference(&result, 0).pos_list().is_empty());
    }

    #[test]
    fn test_scan_while_adding_columns() {
        let values: Vec<i32> = (0..5_000).collect();
        let table = int_table(&values, 64);

        thread::scope(|scope| {
            let writer = scope.spawn(|| {
                for i in 0..100 {
                    table.add_column(format!("extra_{i}"), DataType::Int).unwrap();
                }
            });

            for _ in 0..50 {
                let result = scan(&table, 0, ScanType::NotEquals, 7);
                assert_eq!(result.row_count(), 4_999);
                assert!(result.column_count() >= 2);
            }

            writer.join().unwrap();
        });

        assert_eq!(table.column_count(), 102);
        let result = scan(&table, 0, ScanType::Equals, 7);
        assert_eq!(column_values(&result, 101), vec![Value::Int(0)]);
    }

    fn reference_chunk(table: &Arc<Table>, rows: Vec<RowId>) -> Arc<Chunk> {
        let segment = ReferenceSegment::new(table.clone(), 0, Arc::new(rows)).unwrap();
        Arc::new(Chunk::from_segments(vec![Segment::Reference(segment)]).unwrap())
    }

    #[test]
    fn test_reference_target_and_flatten() {
        let table = int_table(&[5, 6, 7], 10);
        let chunks = [
            reference_chunk(&table, vec![RowId::new(0, 2)]),
            reference_chunk(&table, vec![RowId::new(0, 0), RowId::new(0, 1)]),
        ];

        let target = reference_target(&chunks, 0).unwrap().unwrap();
        assert!(Arc::ptr_eq(&target.table, &table));
        assert_eq!(target.column_id, 0);
        assert_eq!(target.pos_lists.len(), 2);

        let positions = vec![RowId::new(1, 1), RowId::new(0, 0)];
        assert_eq!(
            flatten(&positions, &target.pos_lists).unwrap(),
            vec![RowId::new(0, 1), RowId::new(0, 2)]
        );
        assert!(matches!(
            flatten(&vec![RowId::new(2, 0)], &target.pos_lists),
            Err(StorageError::IndexOutOfRange { what: "chunk", .. })
        ));

        let base = [table.get_chunk(0).unwrap()];
        assert!(reference_target(&base, 0).unwrap().is_none());
    }

    #[test]
    fn test_reference_target_rejects_mixed_targets() {
        let first = int_table(&[1, 2], 10);
        let second = int_table(&[3, 4], 10);

        let two_tables = [
            reference_chunk(&first, vec![RowId::new(0, 0)]),
            reference_chunk(&second, vec![RowId::new(0, 0)]),
        ];
        assert!(matches!(
            reference_target(&two_tables, 0),
            Err(ScanError::MixedReferenceTargets(0))
        ));

        let direct_and_reference = [
            first.get_chunk(0).unwrap(),
            reference_chunk(&first, vec![RowId::new(0, 1)]),
        ];
        assert!(matches!(
            reference_target(&direct_and_reference, 0),
            Err(ScanError::MixedReferenceTargets(0))
        ));
    }
}
