//! Fallback inspector: an information_schema walk that works on any engine
//! exposing the ANSI catalog views.

use super::{cell_text, keywords};
use crate::connection::NativeConnection;
use crate::dialect::Dialect;
use crate::error::SqlResult;
use crate::structure::{SqlObject, SqlObjectType, SqlStructure};
use std::collections::BTreeMap;

const SCHEMATA: &str = "SELECT CATALOG_NAME, SCHEMA_NAME FROM INFORMATION_SCHEMA.SCHEMATA";

const TABLES: &str = "SELECT TABLE_CATALOG, TABLE_SCHEMA, TABLE_NAME \
     FROM INFORMATION_SCHEMA.TABLES WHERE TABLE_TYPE = 'BASE TABLE'";

const VIEWS: &str =
    "SELECT TABLE_CATALOG, TABLE_SCHEMA, TABLE_NAME FROM INFORMATION_SCHEMA.VIEWS";

const COLUMNS: &str = "SELECT TABLE_CATALOG, TABLE_SCHEMA, TABLE_NAME, COLUMN_NAME \
     FROM INFORMATION_SCHEMA.COLUMNS";

const ROUTINES: &str = "SELECT ROUTINE_CATALOG, ROUTINE_SCHEMA, ROUTINE_NAME, ROUTINE_TYPE \
     FROM INFORMATION_SCHEMA.ROUTINES";

pub(crate) async fn refresh(
    conn: &mut NativeConnection,
    dialect: Dialect,
) -> SqlResult<SqlStructure> {
    // column names per (catalog, schema, table), preloaded in one query
    let mut column_map: BTreeMap<(String, String, String), Vec<SqlObject>> = BTreeMap::new();
    let (_, rows) = conn.execute_buffered(COLUMNS).await?;
    for row in &rows {
        column_map
            .entry((cell_text(row, 0), cell_text(row, 1), cell_text(row, 2)))
            .or_default()
            .push(SqlObject::new(cell_text(row, 3), SqlObjectType::Column));
    }

    let mut schemas: BTreeMap<(String, String), Vec<SqlObject>> = BTreeMap::new();
    let (_, rows) = conn.execute_buffered(SCHEMATA).await?;
    for row in &rows {
        schemas.entry((cell_text(row, 0), cell_text(row, 1))).or_default();
    }

    let (_, rows) = conn.execute_buffered(TABLES).await?;
    for row in &rows {
        let key = (cell_text(row, 0), cell_text(row, 1));
        let columns = column_map
            .remove(&(key.0.clone(), key.1.clone(), cell_text(row, 2)))
            .unwrap_or_default();
        schemas.entry(key).or_default().push(
            SqlObject::new(cell_text(row, 2), SqlObjectType::Table).with_children(columns),
        );
    }

    let (_, rows) = conn.execute_buffered(VIEWS).await?;
    for row in &rows {
        let key = (cell_text(row, 0), cell_text(row, 1));
        let columns = column_map
            .remove(&(key.0.clone(), key.1.clone(), cell_text(row, 2)))
            .unwrap_or_default();
        schemas.entry(key).or_default().push(
            SqlObject::new(cell_text(row, 2), SqlObjectType::View).with_children(columns),
        );
    }

    let (_, rows) = conn.execute_buffered(ROUTINES).await?;
    for row in &rows {
        let object_type = match cell_text(row, 3).as_str() {
            "PROCEDURE" => SqlObjectType::Procedure,
            "FUNCTION" => SqlObjectType::Function,
            _ => continue,
        };
        schemas
            .entry((cell_text(row, 0), cell_text(row, 1)))
            .or_default()
            .push(SqlObject::new(cell_text(row, 2), object_type));
    }

    // regroup schemas under their catalogs
    let mut catalogs: BTreeMap<String, Vec<SqlObject>> = BTreeMap::new();
    for ((catalog, schema), children) in schemas {
        catalogs
            .entry(catalog)
            .or_default()
            .push(SqlObject::new(schema, SqlObjectType::Schema).with_children(children));
    }

    let mut structure = SqlStructure::empty(dialect);
    structure.objects = catalogs
        .into_iter()
        .map(|(catalog, children)| {
            SqlObject::new(catalog, SqlObjectType::Catalog).with_children(children)
        })
        .collect();
    structure.keywords = keywords::keyword_objects(keywords::ANSI_KEYWORDS);
    Ok(structure)
}
