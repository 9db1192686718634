//! Dotted-path access to individual TOML fields.
//!
//! Light node and sequencer configs are owned by other binaries and may be
//! edited by operators, so roller only touches the keys it needs and keeps
//! the rest of the document (comments included) as it was.

use crate::ConfigError;
use std::path::Path;
use toml_edit::{Document, Item, Table, TableLike, Value};

fn parse_document(path: &Path, content: &str) -> Result<Document, ConfigError> {
    content.parse::<Document>().map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn split_key(key: &str) -> Vec<&str> {
    key.split('.').filter(|p| !p.is_empty()).collect()
}

fn lookup<'a>(table: &'a dyn TableLike, path: &[&str]) -> Option<&'a Item> {
    match path {
        [] => None,
        [leaf] => table.get(leaf),
        [head, rest @ ..] => table
            .get(head)
            .and_then(Item::as_table_like)
            .and_then(|child| lookup(child, rest)),
    }
}

fn assign(table: &mut dyn TableLike, path: &[&str], value: Value) -> Result<(), String> {
    match path {
        [] => Err(String::new()),
        [leaf] => {
            table.insert(leaf, Item::Value(value));
            Ok(())
        }
        [head, rest @ ..] => {
            if !table.contains_key(head) {
                table.insert(head, Item::Table(Table::new()));
            }
            let child = table
                .get_mut(head)
                .and_then(Item::as_table_like_mut)
                .ok_or_else(|| head.to_string())?;
            assign(child, rest, value)
        }
    }
}

/// Read the value at dotted `key` (e.g. `RPC.Port`) as a string.
///
/// Integers and other scalars are rendered in their TOML form.
pub fn get_key_from_toml(path: &Path, key: &str) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
    let doc = parse_document(path, &content)?;

    let not_found = || ConfigError::KeyNotFound {
        path: path.to_path_buf(),
        key: key.to_string(),
    };
    let item = lookup(doc.as_table(), &split_key(key)).ok_or_else(not_found)?;
    let value = item.as_value().ok_or_else(not_found)?;

    Ok(match value.as_str() {
        Some(s) => s.to_string(),
        None => value.to_string().trim().to_string(),
    })
}

/// Set the value at dotted `key`, creating intermediate tables and the file
/// itself when missing.
pub fn update_field_in_toml(
    path: &Path,
    key: &str,
    value: impl Into<Value>,
) -> Result<(), ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(ConfigError::io(path, e)),
    };
    let mut doc = parse_document(path, &content)?;

    assign(doc.as_table_mut(), &split_key(key), value.into()).map_err(|table| {
        if table.is_empty() {
            ConfigError::KeyNotFound {
                path: path.to_path_buf(),
                key: key.to_string(),
            }
        } else {
            ConfigError::NotATable {
                path: path.to_path_buf(),
                key: table,
            }
        }
    })?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::io(parent, e))?;
    }
    std::fs::write(path, doc.to_string()).map_err(|e| ConfigError::io(path, e))
}
