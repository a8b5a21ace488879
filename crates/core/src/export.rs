use serde::Serialize;

use crate::error::Result;
use crate::render::RenderCell;

/// One exported cell: what is drawn and where.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellRecord {
    pub name: String,
    pub ordinal: u32,
    pub value: f64,
    pub depth: u32,
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
    pub color: String,
}

impl From<&RenderCell> for CellRecord {
    fn from(c: &RenderCell) -> Self {
        Self {
            name: c.name.clone(),
            ordinal: c.key.ordinal,
            value: c.value,
            depth: c.depth,
            x0: c.rect.x0,
            y0: c.rect.y0,
            x1: c.rect.x1,
            y1: c.rect.y1,
            color: c.color.to_hex_string(),
        }
    }
}

pub fn to_csv<'a>(
    cells: impl IntoIterator<Item = &'a RenderCell>,
    mut w: impl std::io::Write,
) -> Result<()> {
    let mut writer = csv::Writer::from_writer(&mut w);
    for cell in cells {
        writer.serialize(CellRecord::from(cell))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn to_json<'a>(
    cells: impl IntoIterator<Item = &'a RenderCell>,
    width: f64,
    height: f64,
) -> serde_json::Value {
    let cells: Vec<CellRecord> = cells.into_iter().map(CellRecord::from).collect();
    serde_json::json!({
        "generated_at": chrono::Local::now().to_rfc3339(),
        "canvas": { "width": width, "height": height },
        "cells": cells,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::engine::TreemapEngine;
    use crate::model::{Item, Size};

    fn engine() -> TreemapEngine {
        let mut e = TreemapEngine::with_panel(EngineConfig::default());
        e.set_container_size(Size::new(200.0, 100.0));
        e.set_items(vec![Item::new("A", 50.0), Item::new("B", 30.0), Item::new("C", 20.0)]);
        e
    }

    #[test]
    fn csv_has_header_and_one_row_per_cell() {
        let e = engine();
        let mut buf = Vec::new();
        to_csv(e.cells(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("name,ordinal,value,depth,x0,y0,x1,y1,color")
        );
        assert_eq!(lines.next(), Some("A,0,50.0,1,0.0,0.0,100.0,100.0,#1f77b4"));
        assert_eq!(lines.count(), 2);
    }

    #[test]
    fn json_lists_cells_with_timestamp() {
        let e = engine();
        let v = to_json(e.cells(), 200.0, 100.0);
        assert!(v["generated_at"].is_string());
        assert_eq!(v["cells"].as_array().unwrap().len(), 3);
        assert_eq!(v["cells"][1]["name"], "B");
        assert_eq!(v["cells"][1]["x0"], 100.0);
    }
}
