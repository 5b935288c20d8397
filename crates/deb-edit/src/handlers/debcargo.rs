//! debcargo.toml handler using toml_edit

use toml_edit::{DocumentMut, Item, Table, Value};

use crate::error::{Error, Result};
use crate::format::{Format, FormatHandler};

/// Handler for `debian/debcargo.toml`, preserving formatting with toml_edit
#[derive(Debug, Default, Clone, Copy)]
pub struct DebcargoHandler;

impl DebcargoHandler {
    pub fn new() -> Self {
        Self
    }
}

fn table_to_json(table: &Table) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    let mut keys: Vec<_> = table.iter().map(|(k, _)| k.to_string()).collect();
    keys.sort();

    for key in keys {
        if let Some(item) = table.get(&key) {
            map.insert(key, item_to_json(item));
        }
    }
    serde_json::Value::Object(map)
}

fn item_to_json(item: &Item) -> serde_json::Value {
    match item {
        Item::Value(v) => value_to_json(v),
        Item::Table(t) => table_to_json(t),
        Item::ArrayOfTables(arr) => {
            let items: Vec<_> = arr.iter().map(table_to_json).collect();
            serde_json::Value::Array(items)
        }
        Item::None => serde_json::Value::Null,
    }
}

fn value_to_json(v: &Value) -> serde_json::Value {
    match v {
        Value::String(s) => serde_json::Value::String(s.value().to_string()),
        Value::Integer(i) => serde_json::Value::Number((*i.value()).into()),
        Value::Float(f) => serde_json::Number::from_f64(*f.value())
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Boolean(b) => serde_json::Value::Bool(*b.value()),
        Value::Datetime(d) => serde_json::Value::String(d.to_string()),
        Value::Array(arr) => {
            let items: Vec<_> = arr.iter().map(value_to_json).collect();
            serde_json::Value::Array(items)
        }
        Value::InlineTable(t) => {
            let mut map = serde_json::Map::new();
            let mut keys: Vec<_> = t.iter().map(|(k, _)| k.to_string()).collect();
            keys.sort();
            for key in keys {
                if let Some(v) = t.get(&key) {
                    map.insert(key, value_to_json(v));
                }
            }
            serde_json::Value::Object(map)
        }
    }
}

impl FormatHandler for DebcargoHandler {
    type Document = DocumentMut;

    fn format(&self) -> Format {
        Format::Debcargo
    }

    fn parse(&self, source: &str) -> Result<DocumentMut> {
        source.parse::<DocumentMut>().map_err(|e| {
            let line = e
                .span()
                .map(|span| source[..span.start.min(source.len())].matches('\n').count() + 1)
                .unwrap_or(1);
            Error::parse(line, e.message().to_string())
        })
    }

    fn empty(&self) -> DocumentMut {
        DocumentMut::new()
    }

    fn render(&self, doc: &DocumentMut) -> String {
        doc.to_string()
    }

    fn normalize(&self, doc: &DocumentMut) -> serde_json::Value {
        table_to_json(doc.as_table())
    }
}

/// Access to values by dotted key (`source.section`, `packages.lib.summary`)
pub trait DottedKeys {
    fn get_dotted(&self, key: &str) -> Option<&Item>;

    /// Set a value, creating intermediate tables as needed.
    fn set_dotted(&mut self, key: &str, value: impl Into<Value>) -> Result<()>;

    fn remove_dotted(&mut self, key: &str) -> Option<Item>;
}

impl DottedKeys for DocumentMut {
    fn get_dotted(&self, key: &str) -> Option<&Item> {
        let mut item = self.as_item();
        for part in key.split('.') {
            item = item.get(part)?;
        }
        Some(item)
    }

    fn set_dotted(&mut self, key: &str, value: impl Into<Value>) -> Result<()> {
        let (parents, last) = match key.rsplit_once('.') {
            Some((parents, last)) => (Some(parents), last),
            None => (None, key),
        };
        let mut table = self.as_table_mut();
        for part in parents.into_iter().flat_map(|p| p.split('.')) {
            let entry = table.entry(part).or_insert(Item::Table(Table::new()));
            table = entry.as_table_mut().ok_or_else(|| Error::Unsupported {
                path: "debcargo.toml".into(),
                reason: format!("{part} in {key} is not a table"),
            })?;
        }
        let mut value = value.into();
        match table.get_mut(last).and_then(Item::as_value_mut) {
            Some(existing) => {
                *value.decor_mut() = existing.decor().clone();
                *existing = value;
            }
            None => {
                table.insert(last, Item::Value(value));
            }
        }
        Ok(())
    }

    fn remove_dotted(&mut self, key: &str) -> Option<Item> {
        let (parents, last) = match key.rsplit_once('.') {
            Some((parents, last)) => (Some(parents), last),
            None => (None, key),
        };
        let mut table = self.as_table_mut();
        for part in parents.into_iter().flat_map(|p| p.split('.')) {
            table = table.get_mut(part)?.as_table_mut()?;
        }
        table.remove(last)
    }
}
