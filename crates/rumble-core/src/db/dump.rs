//! Portable SQL text dump of the history store.
//!
//! The output loads into a fresh SQLite database with `sqlite3 new.db < dump.sql`
//! (or `execute_batch`), reproducing tables, rows, autoincrement counters,
//! indexes, and the schema version.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, types::ValueRef};

use crate::db::{migrations, store::Store};

/// Banner line written into every dump header.
pub const DUMP_BANNER: &str = "DO NOT EDIT. This was autogenerated by a tool.";

/// Summary returned after writing a dump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpReport {
    /// User tables written (internal `sqlite_*` tables excluded).
    pub table_count: usize,
    /// Rows written across all user tables.
    pub row_count: usize,
    /// Latest game or round timestamp in the store at dump time.
    pub latest_activity: Option<DateTime<Utc>>,
}

/// Write the whole store as SQL statements to `out`.
///
/// # Errors
///
/// Returns an error if reading the store or writing to `out` fails.
pub fn write_dump<W: Write>(conn: &Connection, out: &mut W) -> Result<DumpReport> {
    let latest_activity = Store::new(conn)
        .latest_activity()
        .context("query latest activity")?;
    let schema_version =
        migrations::current_schema_version(conn).context("read schema version")?;

    write_header(out, latest_activity)?;
    writeln!(out, "PRAGMA foreign_keys=OFF;")?;
    writeln!(out, "BEGIN TRANSACTION;")?;

    let tables = user_tables(conn)?;
    let mut row_count = 0;
    for (name, ddl) in &tables {
        writeln!(out, "{ddl};")?;
        row_count += write_rows(conn, name, out)?;
    }

    write_sequences(conn, out)?;

    for ddl in index_ddl(conn)? {
        writeln!(out, "{ddl};")?;
    }

    writeln!(out, "PRAGMA user_version = {schema_version};")?;
    writeln!(out, "COMMIT;")?;
    out.flush().context("flush dump output")?;

    Ok(DumpReport {
        table_count: tables.len(),
        row_count,
        latest_activity,
    })
}

/// Write only the schema (tables, then indexes) as SQL statements.
///
/// # Errors
///
/// Returns an error if reading the schema or writing to `out` fails.
pub fn write_schema<W: Write>(conn: &Connection, out: &mut W) -> Result<()> {
    for (_, ddl) in user_tables(conn)? {
        writeln!(out, "{ddl};")?;
    }
    for ddl in index_ddl(conn)? {
        writeln!(out, "{ddl};")?;
    }
    out.flush().context("flush schema output")?;
    Ok(())
}

fn write_header<W: Write>(out: &mut W, latest: Option<DateTime<Utc>>) -> Result<()> {
    let latest = latest.map_or_else(
        || "none".to_string(),
        |at| at.to_rfc3339_opts(SecondsFormat::Secs, true),
    );
    writeln!(out, "-- Rumble Royale statistics dump")?;
    writeln!(out, "-- The statements below are compatible with SQLite.")?;
    writeln!(out, "-- Latest game time considered in this dump: {latest}")?;
    writeln!(out, "-- {DUMP_BANNER}")?;
    writeln!(out)?;
    Ok(())
}

fn user_tables(conn: &Connection) -> Result<Vec<(String, String)>> {
    let mut stmt = conn
        .prepare(
            "SELECT name, sql FROM sqlite_master
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
             ORDER BY rowid",
        )
        .context("list tables")?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .context("list tables")?;
    rows.collect::<rusqlite::Result<_>>()
        .context("read table list")
}

fn index_ddl(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare(
            "SELECT sql FROM sqlite_master
             WHERE type = 'index' AND sql IS NOT NULL
             ORDER BY rowid",
        )
        .context("list indexes")?;
    let rows = stmt.query_map([], |row| row.get(0)).context("list indexes")?;
    rows.collect::<rusqlite::Result<_>>()
        .context("read index list")
}

fn write_rows<W: Write>(conn: &Connection, table: &str, out: &mut W) -> Result<usize> {
    let quoted = quote_ident(table);
    let mut stmt = conn
        .prepare(&format!("SELECT * FROM {quoted} ORDER BY rowid"))
        .with_context(|| format!("select rows from {table}"))?;
    let columns = stmt.column_count();
    let mut rows = stmt.query([])?;

    let mut written = 0;
    let mut values = Vec::with_capacity(columns);
    while let Some(row) = rows.next()? {
        values.clear();
        for i in 0..columns {
            values.push(sql_literal(row.get_ref(i)?));
        }
        writeln!(out, "INSERT INTO {quoted} VALUES({});", values.join(","))?;
        written += 1;
    }
    Ok(written)
}

/// `sqlite_sequence` holds the AUTOINCREMENT high-water marks; carry them
/// over so reloaded stores keep allocating past existing IDs.
fn write_sequences<W: Write>(conn: &Connection, out: &mut W) -> Result<()> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'sqlite_sequence')",
        [],
        |row| row.get(0),
    )?;
    if !exists {
        return Ok(());
    }

    let mut stmt = conn.prepare("SELECT name, seq FROM sqlite_sequence ORDER BY name")?;
    let sequences = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    if sequences.is_empty() {
        return Ok(());
    }

    writeln!(out, "DELETE FROM sqlite_sequence;")?;
    for (name, seq) in sequences {
        writeln!(
            out,
            "INSERT INTO sqlite_sequence VALUES({},{seq});",
            sql_literal(ValueRef::Text(name.as_bytes()))
        )?;
    }
    Ok(())
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn sql_literal(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => "NULL".to_string(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) if f.is_infinite() => {
            if f.is_sign_positive() {
                "1e999".to_string()
            } else {
                "-1e999".to_string()
            }
        }
        ValueRef::Real(f) => format!("{f:?}"),
        ValueRef::Text(bytes) => {
            format!("'{}'", String::from_utf8_lossy(bytes).replace('\'', "''"))
        }
        ValueRef::Blob(bytes) => {
            let hex: String = bytes.iter().map(|b| format!("{b:02X}")).collect();
            format!("X'{hex}'")
        }
    }
}
