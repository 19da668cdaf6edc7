//! SQL Server inspector: sys catalog views, plus the server's database list.

use super::{cell_text, keywords};
use crate::connection::NativeConnection;
use crate::dialect::Dialect;
use crate::error::SqlResult;
use crate::structure::{SqlObject, SqlObjectType, SqlStructure};
use std::collections::BTreeMap;

const DATABASES: &str = "SELECT name FROM sys.databases ORDER BY name";

// one row per column for tables and views; one row (NULL column) per routine
const OBJECTS: &str = "SELECT s.name, o.name, RTRIM(o.type), c.name \
     FROM sys.objects o \
     JOIN sys.schemas s ON s.schema_id = o.schema_id \
     LEFT JOIN sys.columns c ON c.object_id = o.object_id \
     WHERE o.type IN ('U', 'V', 'P', 'FN', 'IF', 'TF') \
     ORDER BY s.name, o.name, c.column_id";

fn object_type_for(type_code: &str) -> SqlObjectType {
    match type_code {
        "U" => SqlObjectType::Table,
        "V" => SqlObjectType::View,
        "P" => SqlObjectType::Procedure,
        _ => SqlObjectType::Function,
    }
}

pub(crate) async fn refresh(conn: &mut NativeConnection) -> SqlResult<SqlStructure> {
    let mut schemas: BTreeMap<String, Vec<SqlObject>> = BTreeMap::new();

    let (_, rows) = conn.execute_buffered(OBJECTS).await?;
    let mut open: Option<(String, SqlObject)> = None;
    for row in &rows {
        let schema = cell_text(row, 0);
        let name = cell_text(row, 1);
        let object_type = object_type_for(&cell_text(row, 2));

        let same = open
            .as_ref()
            .is_some_and(|(s, o)| *s == schema && o.name == name);
        if !same {
            if let Some((schema, object)) = open.take() {
                schemas.entry(schema).or_default().push(object);
            }
            open = Some((schema, SqlObject::new(name, object_type)));
        }
        if let (Some((_, object)), Some(column)) = (open.as_mut(), row.values.get(3)) {
            if !column.is_null() {
                object
                    .children
                    .push(SqlObject::new(column.display_string(), SqlObjectType::Column));
            }
        }
    }
    if let Some((schema, object)) = open.take() {
        schemas.entry(schema).or_default().push(object);
    }

    let mut structure = SqlStructure::empty(Dialect::MsSql);
    structure.objects = schemas
        .into_iter()
        .map(|(schema, children)| {
            SqlObject::new(schema, SqlObjectType::Schema).with_children(children)
        })
        .collect();

    let (_, rows) = conn.execute_buffered(DATABASES).await?;
    for row in &rows {
        structure
            .objects
            .push(SqlObject::new(cell_text(row, 0), SqlObjectType::Database));
    }

    structure.keywords = keywords::keyword_objects(keywords::ANSI_KEYWORDS);
    structure.builtin_types = keywords::type_objects(keywords::MSSQL_TYPES);
    Ok(structure)
}
