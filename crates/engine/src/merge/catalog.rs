// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The embedded tgis catalog (and vector attribute databases).

use crate::error::MergeError;
use rusqlite::{params, Connection, Transaction};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Catalog table that is replaced wholesale on merge.
pub const METADATA_TABLE: &str = "tgis_metadata";

fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn table_names(conn: &Connection, schema: &str) -> rusqlite::Result<BTreeSet<String>> {
    let sql = format!(
        "SELECT name FROM {}.sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
        schema
    );
    let mut stmt = conn.prepare(&sql)?;
    let names = stmt.query_map([], |row| row.get(0))?.collect();
    names
}

/// `(name, sql)` of every object of `kind`, optionally limited to one table.
fn schema_objects(
    conn: &Connection,
    schema: &str,
    kind: &str,
    table: Option<&str>,
) -> rusqlite::Result<Vec<(String, String)>> {
    let sql = format!(
        "SELECT name, sql FROM {}.sqlite_master WHERE type = ?1 AND sql IS NOT NULL \
         AND (?2 IS NULL OR tbl_name = ?2) ORDER BY name",
        schema
    );
    let mut stmt = conn.prepare(&sql)?;
    let objects = stmt.query_map(params![kind, table], |row| Ok((row.get(0)?, row.get(1)?)))?.collect();
    objects
}

/// `(name, declared type)` of every column, in table order.
fn columns(conn: &Connection, schema: &str, table: &str) -> rusqlite::Result<Vec<(String, String)>> {
    let mut stmt = conn.prepare(&format!("PRAGMA {}.table_info({})", schema, quote(table)))?;
    let cols = stmt.query_map([], |row| Ok((row.get(1)?, row.get(2)?)))?.collect();
    cols
}

fn is_text(declared: &str) -> bool {
    let upper = declared.to_ascii_uppercase();
    upper.is_empty() || ["CHAR", "TEXT", "CLOB"].iter().any(|t| upper.contains(t))
}

/// New name for a table whose name embeds `from` as a `_`-delimited part.
fn renamed(table: &str, from: &str, to: &str) -> Option<String> {
    if table == from {
        return Some(to.to_string());
    }
    if let Some(rest) = table.strip_prefix(&format!("{}_", from)) {
        return Some(format!("{}_{}", to, rest));
    }
    if let Some(head) = table.strip_suffix(&format!("_{}", from)) {
        return Some(format!("{}_{}", head, to));
    }
    let infix = format!("_{}_", from);
    table.find(&infix).map(|at| {
        format!("{}_{}_{}", &table[..at], to, &table[at + infix.len()..])
    })
}

/// Replace every text value equal to `from` and every `@from` suffix.
fn rewrite_values(tx: &Transaction<'_>, from: &str, to: &str) -> rusqlite::Result<()> {
    let suffix_from = format!("@{}", from);
    let suffix_to = format!("@{}", to);
    for table in table_names(tx, "main")? {
        for (col, declared) in columns(tx, "main", &table)? {
            if !is_text(&declared) {
                continue;
            }
            let (t, c) = (quote(&table), quote(&col));
            tx.execute(&format!("UPDATE {t} SET {c} = ?1 WHERE {c} = ?2"), params![to, from])?;
            tx.execute(
                &format!("UPDATE {t} SET {c} = REPLACE({c}, ?1, ?2) WHERE instr({c}, ?1) > 0"),
                params![suffix_from, suffix_to],
            )?;
        }
    }
    Ok(())
}

/// Rewrite every reference to mapset `from` in the catalog at `db` to `to`.
pub(super) fn rewrite_mapset(db: &Path, from: &str, to: &str) -> Result<(), MergeError> {
    let run = || -> rusqlite::Result<()> {
        let mut conn = Connection::open(db)?;
        let tx = conn.transaction()?;
        rewrite_values(&tx, from, to)?;
        for table in table_names(&tx, "main")? {
            if let Some(new_name) = renamed(&table, from, to) {
                tx.execute(&format!("ALTER TABLE {} RENAME TO {}", quote(&table), quote(&new_name)), [])?;
                rewrite_values(&tx, &table, &new_name)?;
            }
        }
        tx.commit()
    };
    run().map_err(MergeError::catalog(db))?;
    tracing::debug!(db = %db.display(), from, to, "catalog references rewritten");
    Ok(())
}

fn recreate_from_source(tx: &Transaction<'_>, table: &str) -> rusqlite::Result<()> {
    for (_, sql) in schema_objects(tx, "src", "table", Some(table))? {
        tx.execute(&sql, [])?;
    }
    let t = quote(table);
    tx.execute(&format!("INSERT INTO main.{t} SELECT * FROM src.{t}"), [])?;
    for (_, sql) in schema_objects(tx, "src", "index", Some(table))? {
        tx.execute(&sql, [])?;
    }
    Ok(())
}

fn merge_catalog_tx(tx: &Transaction<'_>) -> rusqlite::Result<()> {
    let views = schema_objects(tx, "main", "view", None)?;
    let src_views = schema_objects(tx, "src", "view", None)?;
    for (name, _) in &views {
        tx.execute(&format!("DROP VIEW main.{}", quote(name)), [])?;
    }

    let existing = table_names(tx, "main")?;
    for table in table_names(tx, "src")? {
        let t = quote(&table);
        if table == METADATA_TABLE {
            tx.execute(&format!("DROP TABLE IF EXISTS main.{t}"), [])?;
            recreate_from_source(tx, &table)?;
        } else if !existing.contains(&table) {
            recreate_from_source(tx, &table)?;
        } else {
            let src_cols: BTreeSet<String> = columns(tx, "src", &table)?.into_iter().map(|c| c.0).collect();
            let shared: Vec<String> = columns(tx, "main", &table)?
                .into_iter()
                .filter(|(name, _)| src_cols.contains(name))
                .map(|(name, _)| quote(&name))
                .collect();
            if shared.is_empty() {
                continue;
            }
            let cols = shared.join(", ");
            tx.execute(
                &format!(
                    "INSERT OR IGNORE INTO main.{t} ({cols}) \
                     SELECT {cols} FROM src.{t} EXCEPT SELECT {cols} FROM main.{t}"
                ),
                [],
            )?;
        }
    }

    let kept: BTreeSet<&str> = views.iter().map(|(name, _)| name.as_str()).collect();
    for (_, sql) in views.iter().chain(src_views.iter().filter(|(name, _)| !kept.contains(name.as_str()))) {
        tx.execute(sql, [])?;
    }
    Ok(())
}

fn replace_tables_tx(tx: &Transaction<'_>) -> rusqlite::Result<()> {
    for table in table_names(tx, "src")? {
        tx.execute(&format!("DROP TABLE IF EXISTS main.{}", quote(&table)), [])?;
        recreate_from_source(tx, &table)?;
    }
    Ok(())
}

/// Apply `merge` to a staging copy of `target` with `source` attached as
/// `src`, then move the staging copy over `target`.
fn staged(
    source: &Path,
    target: &Path,
    merge: fn(&Transaction<'_>) -> rusqlite::Result<()>,
) -> Result<(), MergeError> {
    let staging = PathBuf::from(format!("{}.merge", target.display()));
    fs::copy(target, &staging).map_err(MergeError::io("stage", target))?;

    let run = || -> rusqlite::Result<()> {
        let mut conn = Connection::open(&staging)?;
        conn.execute("ATTACH DATABASE ?1 AS src", [source.display().to_string()])?;
        let tx = conn.transaction()?;
        merge(&tx)?;
        tx.commit()?;
        conn.execute("DETACH DATABASE src", [])?;
        Ok(())
    };
    if let Err(e) = run() {
        let _ = fs::remove_file(&staging);
        return Err(MergeError::Catalog { path: target.to_path_buf(), source: e });
    }
    fs::rename(&staging, target).map_err(MergeError::io("replace", target))
}

/// Merge the source catalog into the target catalog.
///
/// The metadata table is replaced by the source's, tables only in the source
/// are copied, shared tables receive the source rows they do not already
/// hold. Views are dropped and recreated around the merge.
pub(super) fn merge_catalog(source: &Path, target: &Path) -> Result<(), MergeError> {
    staged(source, target, merge_catalog_tx)?;
    tracing::debug!(source = %source.display(), target = %target.display(), "catalog merged");
    Ok(())
}

/// Replace target tables with the source's same-named tables.
pub(super) fn replace_tables(source: &Path, target: &Path) -> Result<(), MergeError> {
    staged(source, target, replace_tables_tx)
}

#[cfg(test)]
#[path = "catalog_tests.rs"]
mod tests;
