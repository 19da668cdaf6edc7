//! Table rendering collaborators.
//!
//! `construct_table` is a pure function from a [`RecordSet`] to a display
//! string. Two implementations ship: a boxed-grid renderer built on
//! comfy-table, and a CSV renderer whose output can be re-parsed (used for
//! piping results out of the client).

use crate::record::{CellValue, RecordSet, Row};
use comfy_table::{Cell, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};

/// Pure rendering collaborator; must handle zero-row sets, NULL cells and
/// binary cells.
pub trait TableRenderer: Send + Sync {
    fn construct_table(&self, record_set: &RecordSet) -> String;
}

/// Boxed-grid renderer.
#[derive(Debug, Default)]
pub struct ComfyTableRenderer;

impl ComfyTableRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl TableRenderer for ComfyTableRenderer {
    fn construct_table(&self, record_set: &RecordSet) -> String {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(
            record_set
                .columns
                .iter()
                .map(|name| Cell::new(name))
                .collect::<Vec<_>>(),
        );

        for row in &record_set.records {
            table.add_row(
                row.values
                    .iter()
                    .map(|cell| Cell::new(cell.display_string()))
                    .collect::<Vec<_>>(),
            );
        }

        table.to_string()
    }
}

/// CSV renderer. Fields containing delimiters, quotes or newlines are quoted
/// with embedded quotes doubled; NULL cells render as the bare literal
/// `NULL`, which [`CsvRenderer::parse`] recovers as a NULL cell.
#[derive(Debug, Default)]
pub struct CsvRenderer;

impl CsvRenderer {
    pub fn new() -> Self {
        Self
    }

    fn render_field(value: &CellValue) -> String {
        if value.is_null() {
            return "NULL".to_string();
        }
        let text = value.display_string();
        if text.contains(',') || text.contains('"') || text.contains('\n') {
            format!("\"{}\"", text.replace('"', "\"\""))
        } else {
            text
        }
    }

    /// Re-parse CSV text produced by this renderer. All non-NULL cells come
    /// back as text cells; the bare literal `NULL` comes back as a NULL cell.
    pub fn parse(text: &str) -> RecordSet {
        let mut lines = Vec::new();
        let mut fields = Vec::new();
        let mut field = String::new();
        let mut in_quotes = false;
        let mut chars = text.chars().peekable();

        while let Some(ch) = chars.next() {
            if in_quotes {
                match ch {
                    '"' if chars.peek() == Some(&'"') => {
                        field.push('"');
                        chars.next();
                    }
                    '"' => in_quotes = false,
                    _ => field.push(ch),
                }
            } else {
                match ch {
                    '"' => in_quotes = true,
                    ',' => fields.push(std::mem::take(&mut field)),
                    '\n' => {
                        fields.push(std::mem::take(&mut field));
                        lines.push(std::mem::take(&mut fields));
                    }
                    _ => field.push(ch),
                }
            }
        }
        if !field.is_empty() || !fields.is_empty() {
            fields.push(field);
            lines.push(fields);
        }

        let mut lines = lines.into_iter();
        let columns = lines.next().unwrap_or_default();
        let records = lines
            .map(|fields| {
                Row::new(
                    fields
                        .into_iter()
                        .map(|f| {
                            if f == "NULL" {
                                CellValue::Null
                            } else {
                                CellValue::Text(f)
                            }
                        })
                        .collect(),
                )
            })
            .collect();

        RecordSet::new(columns, records)
    }
}

impl TableRenderer for CsvRenderer {
    fn construct_table(&self, record_set: &RecordSet) -> String {
        let mut out = String::new();
        out.push_str(&record_set.columns.join(","));
        out.push('\n');
        for row in &record_set.records {
            let line: Vec<String> = row.values.iter().map(Self::render_field).collect();
            out.push_str(&line.join(","));
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RecordSet {
        RecordSet::new(
            vec!["a".into(), "b".into()],
            vec![
                Row::new(vec![CellValue::Integer(1), CellValue::Text("x".into())]),
                Row::new(vec![CellValue::Null, CellValue::Text("y".into())]),
            ],
        )
    }

    #[test]
    fn test_comfy_table_contains_headers_and_null() {
        let rendered = ComfyTableRenderer::new().construct_table(&sample());
        assert!(rendered.contains('a'));
        assert!(rendered.contains('b'));
        assert!(rendered.contains("NULL"));
        assert!(rendered.contains('x'));
    }

    #[test]
    fn test_comfy_table_zero_rows() {
        let rs = RecordSet::new(vec!["only".into()], vec![]);
        let rendered = ComfyTableRenderer::new().construct_table(&rs);
        assert!(rendered.contains("only"));
    }

    #[test]
    fn test_csv_round_trip() {
        let rendered = CsvRenderer::new().construct_table(&sample());
        let parsed = CsvRenderer::parse(&rendered);

        assert_eq!(parsed.columns, vec!["a", "b"]);
        assert_eq!(parsed.row_count(), 2);
        assert_eq!(parsed.records[0].values[0], CellValue::Text("1".into()));
        assert_eq!(parsed.records[0].values[1], CellValue::Text("x".into()));
        assert_eq!(parsed.records[1].values[0], CellValue::Null);
        assert_eq!(parsed.records[1].values[1], CellValue::Text("y".into()));
    }

    #[test]
    fn test_csv_quote_doubling() {
        let rs = RecordSet::new(
            vec!["c".into()],
            vec![Row::new(vec![CellValue::Text("he said \"hi\", twice".into())])],
        );
        let rendered = CsvRenderer::new().construct_table(&rs);
        assert!(rendered.contains("\"he said \"\"hi\"\", twice\""));

        let parsed = CsvRenderer::parse(&rendered);
        assert_eq!(
            parsed.records[0].values[0],
            CellValue::Text("he said \"hi\", twice".into())
        );
    }

    #[test]
    fn test_csv_binary_cell() {
        let rs = RecordSet::new(
            vec!["blob".into()],
            vec![Row::new(vec![CellValue::Binary(vec![1, 2])])],
        );
        let rendered = CsvRenderer::new().construct_table(&rs);
        assert!(rendered.contains("0x0102"));
    }
}
