//! Keyword and builtin-type seeds for the completion cache.

use crate::structure::{SqlObject, SqlObjectType};

/// ANSI SQL keywords seeded for every dialect without its own keyword list.
pub const ANSI_KEYWORDS: &[&str] = &[
    "ALL",
    "ALTER",
    "AND",
    "ANY",
    "AS",
    "ASC",
    "BEGIN",
    "BETWEEN",
    "BY",
    "CASE",
    "CAST",
    "CHECK",
    "COLUMN",
    "COMMIT",
    "CONSTRAINT",
    "CREATE",
    "CROSS",
    "CURRENT_DATE",
    "CURRENT_TIME",
    "CURRENT_TIMESTAMP",
    "DEFAULT",
    "DELETE",
    "DESC",
    "DISTINCT",
    "DROP",
    "ELSE",
    "END",
    "EXCEPT",
    "EXISTS",
    "FOREIGN",
    "FROM",
    "FULL",
    "GRANT",
    "GROUP",
    "HAVING",
    "IN",
    "INNER",
    "INSERT",
    "INTERSECT",
    "INTO",
    "IS",
    "JOIN",
    "KEY",
    "LEFT",
    "LIKE",
    "LIMIT",
    "NOT",
    "NULL",
    "ON",
    "OR",
    "ORDER",
    "OUTER",
    "PRIMARY",
    "REFERENCES",
    "REVOKE",
    "RIGHT",
    "ROLLBACK",
    "SELECT",
    "SET",
    "TABLE",
    "THEN",
    "UNION",
    "UNIQUE",
    "UPDATE",
    "VALUES",
    "VIEW",
    "WHEN",
    "WHERE",
    "WITH",
];

/// SQLite reserved words beyond the ANSI set.
pub const SQLITE_KEYWORDS: &[&str] = &[
    "ABORT",
    "ANALYZE",
    "ATTACH",
    "AUTOINCREMENT",
    "CASCADE",
    "COLLATE",
    "CONFLICT",
    "DEFERRED",
    "DETACH",
    "EXCLUSIVE",
    "EXPLAIN",
    "FAIL",
    "GLOB",
    "IGNORE",
    "INDEXED",
    "INSTEAD",
    "ISNULL",
    "MATERIALIZED",
    "NOTNULL",
    "OFFSET",
    "PLAN",
    "PRAGMA",
    "QUERY",
    "RAISE",
    "RECURSIVE",
    "REGEXP",
    "REINDEX",
    "RELEASE",
    "RENAME",
    "REPLACE",
    "RETURNING",
    "SAVEPOINT",
    "TEMPORARY",
    "TRANSACTION",
    "TRIGGER",
    "VACUUM",
    "VIRTUAL",
    "WITHOUT",
];

pub const SQLITE_TYPES: &[&str] = &["BLOB", "INTEGER", "NUMERIC", "REAL", "TEXT"];

pub const POSTGRES_TYPES: &[&str] = &[
    "BIGINT",
    "BOOLEAN",
    "BYTEA",
    "DATE",
    "DOUBLE PRECISION",
    "INTEGER",
    "INTERVAL",
    "JSON",
    "JSONB",
    "NUMERIC",
    "REAL",
    "SMALLINT",
    "TEXT",
    "TIME",
    "TIMESTAMP",
    "TIMESTAMPTZ",
    "UUID",
    "VARCHAR",
];

pub const MSSQL_TYPES: &[&str] = &[
    "BIGINT",
    "BIT",
    "DATE",
    "DATETIME",
    "DATETIME2",
    "DATETIMEOFFSET",
    "DECIMAL",
    "FLOAT",
    "INT",
    "MONEY",
    "NVARCHAR",
    "REAL",
    "SMALLINT",
    "TIME",
    "TINYINT",
    "UNIQUEIDENTIFIER",
    "VARBINARY",
    "VARCHAR",
];

/// Wrap raw keyword text as builtin keyword objects.
pub fn keyword_objects(words: &[&str]) -> Vec<SqlObject> {
    words
        .iter()
        .map(|word| SqlObject::new(*word, SqlObjectType::Keyword).builtin())
        .collect()
}

/// Wrap raw type names as builtin type objects.
pub fn type_objects(names: &[&str]) -> Vec<SqlObject> {
    names
        .iter()
        .map(|name| SqlObject::new(*name, SqlObjectType::BuiltinType).builtin())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_objects_are_builtin() {
        let objects = keyword_objects(&["SELECT"]);
        assert_eq!(objects.len(), 1);
        assert!(objects[0].builtin);
        assert_eq!(objects[0].object_type, SqlObjectType::Keyword);
    }
}
