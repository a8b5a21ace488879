use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Result, TreemapError};
use crate::model::Item;

#[derive(Debug, Deserialize)]
struct CsvRow {
    name: String,
    value: f64,
}

/// Reads items from a `.json` or `.csv` file, picked by extension.
pub fn load_items(path: &Path) -> Result<Vec<Item>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let file = std::fs::File::open(path)?;
    let items = match ext.as_str() {
        "json" => from_json_reader(file)?,
        "csv" => from_csv_reader(file)?,
        _ => return Err(TreemapError::UnsupportedFormat(path.display().to_string())),
    };
    tracing::debug!(path = %path.display(), items = items.len(), "loaded items");
    Ok(items)
}

/// A JSON array of `{ "name", "value", "children"? }` objects.
pub fn from_json_reader(r: impl Read) -> Result<Vec<Item>> {
    Ok(serde_json::from_reader(r)?)
}

/// CSV with a `name,value` header; extra columns are ignored.
pub fn from_csv_reader(r: impl Read) -> Result<Vec<Item>> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(r);
    let mut items = Vec::new();
    for row in reader.deserialize() {
        let row: CsvRow = row?;
        items.push(Item::new(row.name, row.value));
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_with_nested_children() {
        let items = from_json_reader(
            r#"[
                { "name": "A", "value": 50 },
                { "name": "G", "children": [ { "name": "x", "value": 1.5 } ] }
            ]"#
            .as_bytes(),
        )
        .unwrap();
        assert_eq!(items[0], Item::new("A", 50.0));
        assert!(items[1].is_group());
        assert_eq!(items[1].children[0].value, 1.5);
    }

    #[test]
    fn csv_rows() {
        let items = from_csv_reader("name, value, note\nA, 50, x\nB,30,\n".as_bytes()).unwrap();
        assert_eq!(items, vec![Item::new("A", 50.0), Item::new("B", 30.0)]);
    }

    #[test]
    fn bad_csv_value_is_an_error() {
        let err = from_csv_reader("name,value\nA,lots\n".as_bytes()).unwrap_err();
        assert!(matches!(err, TreemapError::Csv(_)));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let dir = std::env::temp_dir().join("treezoom-input-test.txt");
        std::fs::write(&dir, "A,1").unwrap();
        let err = load_items(&dir).unwrap_err();
        assert!(matches!(err, TreemapError::UnsupportedFormat(_)));
        let _ = std::fs::remove_file(dir);
    }
}
