//! SQLite inspector: pragma table-valued functions provide the catalog.

use super::{cell_text, keywords};
use crate::connection::NativeConnection;
use crate::dialect::Dialect;
use crate::error::SqlResult;
use crate::structure::{SqlObject, SqlObjectType, SqlStructure};
use std::collections::BTreeMap;

pub(crate) async fn refresh(conn: &mut NativeConnection) -> SqlResult<SqlStructure> {
    let mut structure = SqlStructure::empty(Dialect::Sqlite);
    structure.keywords = keywords::keyword_objects(keywords::ANSI_KEYWORDS);
    structure
        .keywords
        .extend(keywords::keyword_objects(keywords::SQLITE_KEYWORDS));
    structure.builtin_types = keywords::type_objects(keywords::SQLITE_TYPES);

    // tables and views, grouped by attached schema
    let mut schemas: BTreeMap<String, Vec<SqlObject>> = BTreeMap::new();
    let (_, rows) = conn
        .execute_buffered("SELECT schema, name, type FROM pragma_table_list()")
        .await?;
    for row in &rows {
        let name = cell_text(row, 1);
        let object_type = if cell_text(row, 2) == "view" {
            SqlObjectType::View
        } else {
            SqlObjectType::Table
        };

        let columns_sql = format!(
            "SELECT name FROM pragma_table_info('{}')",
            name.replace('\'', "''")
        );
        let (_, column_rows) = conn.execute_buffered(&columns_sql).await?;
        let columns = column_rows
            .iter()
            .map(|row| SqlObject::new(cell_text(row, 0), SqlObjectType::Column))
            .collect();

        schemas
            .entry(cell_text(row, 0))
            .or_default()
            .push(SqlObject::new(name, object_type).with_children(columns));
    }
    for (schema, children) in schemas {
        // alias the tables at the top level too; unqualified names dominate
        // in sqlite sessions
        structure.objects.extend(children.iter().cloned());
        structure
            .objects
            .push(SqlObject::new(schema, SqlObjectType::Schema).with_children(children));
    }

    let (_, rows) = conn
        .execute_buffered("SELECT name FROM pragma_pragma_list()")
        .await?;
    for row in &rows {
        structure
            .objects
            .push(SqlObject::new(cell_text(row, 0), SqlObjectType::Pragma).builtin());
    }

    let (_, rows) = conn
        .execute_buffered("SELECT DISTINCT name FROM pragma_function_list()")
        .await?;
    for row in &rows {
        structure.objects.push(
            SqlObject::new(cell_text(row, 0).to_uppercase(), SqlObjectType::Function).builtin(),
        );
    }

    Ok(structure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::url::ConnectionUrl;

    #[tokio::test]
    async fn test_discovers_tables_and_columns() {
        let url = ConnectionUrl::parse("sqlite://").unwrap();
        let mut conn = NativeConnection::connect(&url).await.unwrap();
        conn.execute_buffered("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)")
            .await
            .unwrap();

        let structure = refresh(&mut conn).await.unwrap();

        let names: Vec<&str> = structure.flatten().iter().map(|o| o.name.as_str()).collect();
        assert!(names.contains(&"users"));
        assert!(names.contains(&"id"));
        assert!(names.contains(&"name"));
        assert!(names.contains(&"SELECT"));
        assert!(names.contains(&"INTEGER"));
    }
}
