//! The discovered-structure model backing the object browser and
//! autocomplete cache.

use crate::dialect::Dialect;

/// Kind of a discovered SQL object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlObjectType {
    Catalog,
    Column,
    Database,
    BuiltinType,
    Function,
    Keyword,
    Pragma,
    Procedure,
    Schema,
    Table,
    View,
}

/// A named object in the structure tree (schema, table, column, routine...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlObject {
    pub name: String,
    pub object_type: SqlObjectType,
    pub children: Vec<SqlObject>,
    pub builtin: bool,
}

impl SqlObject {
    pub fn new(name: impl Into<String>, object_type: SqlObjectType) -> Self {
        Self {
            name: name.into(),
            object_type,
            children: Vec::new(),
            builtin: false,
        }
    }

    pub fn with_children(mut self, children: Vec<SqlObject>) -> Self {
        self.children = children;
        self
    }

    pub fn builtin(mut self) -> Self {
        self.builtin = true;
        self
    }

    fn collect<'a>(&'a self, out: &mut Vec<&'a SqlObject>) {
        for child in &self.children {
            out.push(child);
            child.collect(out);
        }
    }
}

/// The full structure discovered for one connection: object tree plus the
/// dialect's keywords and builtin type names.
#[derive(Debug, Clone)]
pub struct SqlStructure {
    pub dialect: Dialect,
    pub objects: Vec<SqlObject>,
    pub keywords: Vec<SqlObject>,
    pub builtin_types: Vec<SqlObject>,
}

impl SqlStructure {
    pub fn empty(dialect: Dialect) -> Self {
        Self {
            dialect,
            objects: Vec::new(),
            keywords: Vec::new(),
            builtin_types: Vec::new(),
        }
    }

    /// Every object in the structure, flattened for completion matching.
    pub fn flatten(&self) -> Vec<&SqlObject> {
        let mut out = Vec::new();
        for object in &self.objects {
            out.push(object);
            object.collect(&mut out);
        }
        out.extend(self.keywords.iter());
        out.extend(self.builtin_types.iter());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_walks_children_and_keywords() {
        let table = SqlObject::new("users", SqlObjectType::Table).with_children(vec![
            SqlObject::new("id", SqlObjectType::Column),
            SqlObject::new("name", SqlObjectType::Column),
        ]);
        let schema =
            SqlObject::new("public", SqlObjectType::Schema).with_children(vec![table]);

        let mut structure = SqlStructure::empty(Dialect::Postgres);
        structure.objects.push(schema);
        structure
            .keywords
            .push(SqlObject::new("SELECT", SqlObjectType::Keyword).builtin());

        let names: Vec<&str> = structure.flatten().iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["public", "users", "id", "name", "SELECT"]);
    }
}
