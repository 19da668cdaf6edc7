//! SQL dialects and the static dialect registries.
//!
//! The runtime type-to-class maps of the original design are expressed here
//! as a closed enum plus static lookup tables. A dialect missing from the
//! manager registry falls back to the buffered default manager; this is an
//! intentional, tested degradation path, not an omission.

use crate::error::{SqlError, SqlResult};

/// The SQL dialects the client understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// Generic ANSI SQL, used when the scheme maps to no known engine
    Generic,
    MsSql,
    MySql,
    Oracle,
    Postgres,
    Sqlite,
}

/// Which query manager services a dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerKind {
    /// Buffered, single result set
    Default,
    MsSql,
    MySql,
    Oracle,
    Postgres,
    Sqlite,
}

/// Which inspector populates the completion cache for a dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InspectorKind {
    /// information_schema walk; works on any ANSI-ish engine that exposes it
    Default,
    MsSql,
    Postgres,
    Sqlite,
}

impl Dialect {
    /// Map a URL scheme to a dialect. Driver suffixes (`mysql+foo`) are
    /// tolerated; only the part before `+` matters.
    pub fn from_scheme(scheme: &str) -> Self {
        let name = scheme.split('+').next().unwrap_or(scheme);
        match name.to_ascii_lowercase().as_str() {
            "mssql" | "sqlserver" => Dialect::MsSql,
            "mysql" | "mariadb" => Dialect::MySql,
            "oracle" => Dialect::Oracle,
            "postgres" | "postgresql" => Dialect::Postgres,
            "sqlite" => Dialect::Sqlite,
            _ => Dialect::Generic,
        }
    }

    /// Canonical lowercase name, also used in status output.
    pub fn name(&self) -> &'static str {
        match self {
            Dialect::Generic => "generic",
            Dialect::MsSql => "mssql",
            Dialect::MySql => "mysql",
            Dialect::Oracle => "oracle",
            Dialect::Postgres => "postgres",
            Dialect::Sqlite => "sqlite",
        }
    }

    /// The specialized query manager for this dialect, if one exists.
    /// `None` selects the default buffered manager.
    pub fn manager_kind(&self) -> Option<ManagerKind> {
        match self {
            Dialect::MsSql => Some(ManagerKind::MsSql),
            Dialect::MySql => Some(ManagerKind::MySql),
            Dialect::Oracle => Some(ManagerKind::Oracle),
            Dialect::Postgres => Some(ManagerKind::Postgres),
            Dialect::Sqlite => Some(ManagerKind::Sqlite),
            Dialect::Generic => None,
        }
    }

    /// The specialized inspector for this dialect, if one exists.
    /// `None` selects the information_schema default inspector.
    pub fn inspector_kind(&self) -> Option<InspectorKind> {
        match self {
            Dialect::MsSql => Some(InspectorKind::MsSql),
            Dialect::Postgres => Some(InspectorKind::Postgres),
            Dialect::Sqlite => Some(InspectorKind::Sqlite),
            Dialect::Generic | Dialect::MySql | Dialect::Oracle => None,
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Static lookup of the driver packages a dialect needs.
///
/// This is a fixed table, not dynamic resolution; the identifiers are the
/// crates this build links (or would need to link) for the dialect.
pub fn required_packages_for_dialect(dialect: &str) -> SqlResult<&'static [&'static str]> {
    match Dialect::from_scheme(dialect) {
        Dialect::MsSql => Ok(&["tiberius"]),
        Dialect::MySql => Ok(&["sqlx"]),
        Dialect::Oracle => Ok(&["oracle"]),
        Dialect::Postgres => Ok(&["tokio-postgres"]),
        Dialect::Sqlite => Ok(&["rusqlite"]),
        Dialect::Generic => Err(SqlError::Dialect(format!(
            "Required packages for dialect '{dialect}' are unknown"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_mapping() {
        assert_eq!(Dialect::from_scheme("postgresql"), Dialect::Postgres);
        assert_eq!(Dialect::from_scheme("postgres"), Dialect::Postgres);
        assert_eq!(Dialect::from_scheme("mysql+async"), Dialect::MySql);
        assert_eq!(Dialect::from_scheme("MSSQL"), Dialect::MsSql);
        assert_eq!(Dialect::from_scheme("weird"), Dialect::Generic);
    }

    #[test]
    fn test_manager_registry_fallback() {
        assert_eq!(Dialect::Postgres.manager_kind(), Some(ManagerKind::Postgres));
        assert_eq!(Dialect::Oracle.manager_kind(), Some(ManagerKind::Oracle));
        assert_eq!(Dialect::Generic.manager_kind(), None);
    }

    #[test]
    fn test_required_packages() {
        assert_eq!(
            required_packages_for_dialect("postgres").unwrap(),
            &["tokio-postgres"]
        );
        assert_eq!(required_packages_for_dialect("oracle").unwrap(), &["oracle"]);
        assert!(required_packages_for_dialect("nosuchthing").is_err());
    }
}
