//! Record sets and cell values.
//!
//! Core data structures for representing streamed query results. A
//! [`RecordSet`] pairs an ordered column-name list with an ordered list of
//! rows; duplicate column names are legal and positional.

/// A single row of query results
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Cell values in column order
    pub values: Vec<CellValue>,
}

impl Row {
    pub fn new(values: Vec<CellValue>) -> Self {
        Self { values }
    }
}

impl From<Vec<CellValue>> for Row {
    fn from(values: Vec<CellValue>) -> Self {
        Self { values }
    }
}

/// A cell value (single column value in a row)
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// NULL value
    Null,

    /// Integer value
    Integer(i64),

    /// Floating point value
    Float(f64),

    /// Text/string value
    Text(String),

    /// Boolean value
    Boolean(bool),

    /// Binary data
    Binary(Vec<u8>),
}

impl CellValue {
    /// Render the cell for display. NULL renders as the literal text `NULL`;
    /// binary blobs render as a hex byte view.
    pub fn display_string(&self) -> String {
        match self {
            CellValue::Null => "NULL".to_string(),
            CellValue::Integer(i) => i.to_string(),
            CellValue::Float(f) => f.to_string(),
            CellValue::Text(s) => s.clone(),
            CellValue::Boolean(b) => b.to_string(),
            CellValue::Binary(b) => format!("0x{}", hex::encode(b)),
        }
    }

    /// Check if this is a NULL value
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

/// An immutable pairing of column names and row tuples, produced once a
/// result set has been fully spooled and consumed by the table renderer.
#[derive(Debug, Clone)]
pub struct RecordSet {
    /// Ordered column names; uniqueness is not enforced
    pub columns: Vec<String>,
    /// Ordered rows, each with arity equal to the column count
    pub records: Vec<Row>,
}

impl RecordSet {
    pub fn new(columns: Vec<String>, records: Vec<Row>) -> Self {
        Self { columns, records }
    }

    pub fn row_count(&self) -> usize {
        self.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_displays_as_literal() {
        assert_eq!(CellValue::Null.display_string(), "NULL");
        assert!(CellValue::Null.is_null());
        assert!(!CellValue::Integer(0).is_null());
    }

    #[test]
    fn test_binary_displays_as_hex() {
        let cell = CellValue::Binary(vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(cell.display_string(), "0xdeadbeef");
    }

    #[test]
    fn test_scalar_display() {
        assert_eq!(CellValue::Integer(-7).display_string(), "-7");
        assert_eq!(CellValue::Boolean(true).display_string(), "true");
        assert_eq!(CellValue::Text("x".into()).display_string(), "x");
    }

    #[test]
    fn test_record_set_allows_duplicate_columns() {
        let rs = RecordSet::new(
            vec!["a".into(), "a".into()],
            vec![Row::new(vec![CellValue::Integer(1), CellValue::Integer(2)])],
        );
        assert_eq!(rs.columns.len(), 2);
        assert_eq!(rs.row_count(), 1);
    }
}
