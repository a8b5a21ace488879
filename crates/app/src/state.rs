use anyhow::Context as _;
use chrono::{DateTime, Local};
use crossbeam_channel::{unbounded, Receiver};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use treezoom_core::human::format_value;
use treezoom_core::input::load_items;
use treezoom_core::{export, EngineConfig, EngineEvent, TreemapEngine, ValueRange};

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

/// What survives a restart.
#[derive(Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Persisted {
    pub last_file: Option<PathBuf>,
    pub search: String,
}

pub struct AppState {
    pub engine: TreemapEngine,
    pub events: Receiver<EngineEvent>,
    pub source: Option<PathBuf>,
    pub loaded_at: Option<DateTime<Local>>,
    pub search: String,
    /// Slider positions; applied to the engine when they change.
    pub range: Option<ValueRange>,
    pub status: String,
    pub measure_installed: bool,
}

impl AppState {
    pub fn new(config: EngineConfig) -> Self {
        let (tx, rx) = unbounded();
        Self {
            engine: TreemapEngine::with_panel(config).with_events(tx),
            events: rx,
            source: None,
            loaded_at: None,
            search: String::new(),
            range: None,
            status: "Open a JSON or CSV file to start".to_string(),
            measure_installed: false,
        }
    }

    pub fn open(&mut self, path: PathBuf) -> anyhow::Result<()> {
        let items = load_items(&path).with_context(|| format!("loading {}", path.display()))?;
        tracing::info!(path = %path.display(), items = items.len(), "opened data file");
        self.engine.set_items(items);
        self.engine.set_name_query(&self.search);
        self.range = self.engine.filter_state().value_range;
        self.source = Some(path);
        self.loaded_at = Some(Local::now());
        Ok(())
    }

    pub fn open_or_report(&mut self, path: PathBuf) {
        if let Err(e) = self.open(path) {
            tracing::error!(error = %e, "open failed");
            self.status = format!("{e:#}");
        }
    }

    pub fn export(&self, path: &Path, format: ExportFormat) -> anyhow::Result<()> {
        let file = std::fs::File::create(path)?;
        let mut w = std::io::BufWriter::new(file);
        match format {
            ExportFormat::Json => {
                let size = self.engine.canvas();
                let json = export::to_json(self.engine.cells(), size.width, size.height);
                serde_json::to_writer_pretty(&mut w, &json)?;
            }
            ExportFormat::Csv => export::to_csv(self.engine.cells(), &mut w)?,
        }
        Ok(())
    }

    pub fn apply_range(&mut self) {
        if let Some(range) = self.range {
            self.engine.set_value_range(range);
        }
    }

    pub fn clear_range(&mut self) {
        self.engine.clear_range();
        self.range = self.engine.filter_state().value_range;
    }

    pub fn persisted(&self) -> Persisted {
        Persisted {
            last_file: self.source.clone(),
            search: self.search.clone(),
        }
    }

    /// Drains engine events into the status line. Returns whether any
    /// arrived.
    pub fn poll_events(&mut self) -> bool {
        let mut any = false;
        while let Ok(event) = self.events.try_recv() {
            any = true;
            match event {
                EngineEvent::CellClick(cell) => {
                    let format = self.engine.config().value_format;
                    self.status = format!("{}: {}", cell.name, format_value(cell.value, format));
                }
                EngineEvent::CellHover(_) => {}
                EngineEvent::ZoomChange(state) => {
                    self.status = if state.is_root() {
                        "Showing everything".to_string()
                    } else {
                        format!("Zoom depth {}", state.previous.len() + 1)
                    };
                }
                EngineEvent::FilterChange(state) => {
                    self.range = state.value_range;
                    let shown = treezoom_core::leaf_count(&state.filtered);
                    let total = treezoom_core::leaf_count(&state.original);
                    self.status = format!("{shown} of {total} items shown");
                }
                EngineEvent::Empty => self.status = "No items to show".to_string(),
            }
        }
        any
    }

    /// Leaf values of the unfiltered data, bucketed for the histogram.
    pub fn histogram(&self, bins: usize) -> Vec<(f64, f64, usize)> {
        let Some(full) = self.engine.full_range() else {
            return Vec::new();
        };
        let width = ((full.max - full.min) / bins as f64).max(f64::EPSILON);
        let mut counts = vec![0usize; bins];
        for item in &self.engine.filter_state().original {
            item.for_each_leaf_value(&mut |v| {
                let i = (((v - full.min) / width) as usize).min(bins - 1);
                counts[i] += 1;
            });
        }
        counts
            .into_iter()
            .enumerate()
            .map(|(i, n)| (full.min + (i as f64 + 0.5) * width, width, n))
            .collect()
    }
}
