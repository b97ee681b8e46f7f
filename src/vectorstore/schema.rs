//! Vector store schema and migrations.
//!
//! One scalar table per [`crate::chunking::Chunk`], indexed on the scalar
//! fields the filtered-ANN contract searches over, plus a small version
//! table. No FTS5/BM25 machinery — the retriever's filtered-ANN contract
//! never needs it.

/// Current schema version. Bump and add a [`Migration`] entry when the
/// table shape changes.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Schema DDL applied to a freshly created database.
pub const SCHEMA_SQL: &str = r"
CREATE TABLE IF NOT EXISTS chunks (
    chunk_id      TEXT PRIMARY KEY,
    report_id     TEXT NOT NULL,
    company_name  TEXT NOT NULL,
    company_code  TEXT NOT NULL,
    report_period TEXT NOT NULL,
    title         TEXT NOT NULL,
    title_level   INTEGER NOT NULL,
    chunk_text    TEXT NOT NULL,
    chunk_type    TEXT NOT NULL,
    chunk_index   INTEGER NOT NULL,
    page_number   INTEGER NOT NULL,
    file_path     TEXT NOT NULL,
    created_at    INTEGER NOT NULL,
    embedding     BLOB NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_chunks_report_id ON chunks(report_id);
CREATE INDEX IF NOT EXISTS idx_chunks_company_code ON chunks(company_code);
CREATE INDEX IF NOT EXISTS idx_chunks_report_period ON chunks(report_period);
CREATE INDEX IF NOT EXISTS idx_chunks_chunk_type ON chunks(chunk_type);

CREATE TABLE IF NOT EXISTS schema_meta (
    version INTEGER NOT NULL
);
";

/// Query returning a nonzero count once the `chunks` table exists.
pub const CHECK_SCHEMA_SQL: &str =
    "SELECT count(*) FROM sqlite_master WHERE type = 'table' AND name = 'chunks'";

/// Query to read the current schema version; absent rows mean an
/// unversioned (pre-migration) database.
pub const GET_VERSION_SQL: &str = "SELECT version FROM schema_meta LIMIT 1";

/// Query to set the schema version, used after a fresh create or a
/// successful migration.
pub const SET_VERSION_SQL: &str = "INSERT INTO schema_meta (version) VALUES (?1)";

const UPDATE_VERSION_SQL: &str = "UPDATE schema_meta SET version = ?1";

/// One versioned schema change.
pub struct Migration {
    /// Version this migration applies from.
    pub from_version: u32,
    /// Version this migration leaves the database at.
    pub to_version: u32,
    /// DDL/DML to run.
    pub sql: &'static str,
}

/// No migrations yet; the table added one here the day `CURRENT_SCHEMA_VERSION`
/// moves past 1.
pub const MIGRATIONS: &[Migration] = &[];

/// Returns the migrations needed to bring a database at `current_version`
/// up to [`CURRENT_SCHEMA_VERSION`], in order.
#[must_use]
pub fn get_migrations_from(current_version: u32) -> Vec<&'static Migration> {
    let mut version = current_version;
    let mut applicable = Vec::new();
    loop {
        let Some(next) = MIGRATIONS.iter().find(|m| m.from_version == version) else {
            break;
        };
        applicable.push(next);
        version = next.to_version;
        if version >= CURRENT_SCHEMA_VERSION {
            break;
        }
    }
    applicable
}

/// SQL used to bump `schema_meta.version` after applying migrations.
#[must_use]
pub const fn update_version_sql() -> &'static str {
    UPDATE_VERSION_SQL
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_migrations_needed_at_current_version() {
        assert!(get_migrations_from(CURRENT_SCHEMA_VERSION).is_empty());
    }

    #[test]
    fn test_schema_sql_creates_chunks_table() {
        assert!(SCHEMA_SQL.contains("CREATE TABLE IF NOT EXISTS chunks"));
        assert!(SCHEMA_SQL.contains("idx_chunks_report_id"));
    }
}
