//! PostgreSQL inspector: walks pg_catalog directly rather than
//! information_schema, which is much faster on databases with many relations.

use super::{cell_text, keywords};
use crate::connection::NativeConnection;
use crate::dialect::Dialect;
use crate::error::SqlResult;
use crate::structure::{SqlObject, SqlObjectType, SqlStructure};
use std::collections::BTreeMap;

const SCHEMAS: &str = "SELECT nspname FROM pg_namespace \
     WHERE nspname NOT LIKE 'pg_%' AND nspname != 'information_schema' \
     ORDER BY nspname";

// relkind: r=table, v=view, m=materialized view
const RELATIONS: &str = "SELECT n.nspname, c.relname, c.relkind::text, a.attname \
     FROM pg_class c \
     JOIN pg_namespace n ON n.oid = c.relnamespace \
     JOIN pg_attribute a ON a.attrelid = c.oid \
     WHERE c.relkind IN ('r','v','m') \
       AND n.nspname NOT LIKE 'pg_%' \
       AND n.nspname != 'information_schema' \
       AND a.attnum > 0 AND NOT a.attisdropped \
     ORDER BY n.nspname, c.relname, a.attnum";

// prokind: f=function, p=procedure
const ROUTINES: &str = "SELECT n.nspname, p.proname, p.prokind::text \
     FROM pg_proc p \
     JOIN pg_namespace n ON n.oid = p.pronamespace \
     WHERE n.nspname NOT LIKE 'pg_%' \
       AND n.nspname != 'information_schema' \
       AND p.prokind IN ('f', 'p') \
     ORDER BY n.nspname, p.proname";

pub(crate) async fn refresh(conn: &mut NativeConnection) -> SqlResult<SqlStructure> {
    let mut schemas: BTreeMap<String, Vec<SqlObject>> = BTreeMap::new();
    let (_, rows) = conn.execute_buffered(SCHEMAS).await?;
    for row in &rows {
        schemas.entry(cell_text(row, 0)).or_default();
    }

    // one row per column, ordered, so relations can be assembled in a single
    // pass
    let (_, rows) = conn.execute_buffered(RELATIONS).await?;
    let mut open: Option<(String, SqlObject)> = None;
    for row in &rows {
        let schema = cell_text(row, 0);
        let relation = cell_text(row, 1);
        let object_type = match cell_text(row, 2).as_str() {
            "v" | "m" => SqlObjectType::View,
            _ => SqlObjectType::Table,
        };

        let same = open
            .as_ref()
            .is_some_and(|(s, o)| *s == schema && o.name == relation);
        if !same {
            if let Some((schema, object)) = open.take() {
                schemas.entry(schema).or_default().push(object);
            }
            open = Some((schema, SqlObject::new(relation, object_type)));
        }
        if let Some((_, object)) = open.as_mut() {
            object
                .children
                .push(SqlObject::new(cell_text(row, 3), SqlObjectType::Column));
        }
    }
    if let Some((schema, object)) = open.take() {
        schemas.entry(schema).or_default().push(object);
    }

    let (_, rows) = conn.execute_buffered(ROUTINES).await?;
    for row in &rows {
        let object_type = if cell_text(row, 2) == "p" {
            SqlObjectType::Procedure
        } else {
            SqlObjectType::Function
        };
        schemas
            .entry(cell_text(row, 0))
            .or_default()
            .push(SqlObject::new(cell_text(row, 1), object_type));
    }

    let mut structure = SqlStructure::empty(Dialect::Postgres);
    structure.objects = schemas
        .into_iter()
        .map(|(schema, children)| {
            SqlObject::new(schema, SqlObjectType::Schema).with_children(children)
        })
        .collect();
    structure.keywords = keywords::keyword_objects(keywords::ANSI_KEYWORDS);
    structure.builtin_types = keywords::type_objects(keywords::POSTGRES_TYPES);
    Ok(structure)
}
