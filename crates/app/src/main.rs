mod state;
mod ui;

use std::path::PathBuf;

use eframe::egui;
use state::{AppState, Persisted};
use tracing_subscriber::EnvFilter;
use treezoom_core::EngineConfig;

struct MyApp {
    state: AppState,
}

impl MyApp {
    fn new(cc: &eframe::CreationContext<'_>, config: EngineConfig, items: Option<PathBuf>) -> Self {
        let persisted: Persisted = cc
            .storage
            .and_then(|s| eframe::get_value(s, eframe::APP_KEY))
            .unwrap_or_default();
        let mut state = AppState::new(config);
        state.search = persisted.search;
        if let Some(path) = items.or(persisted.last_file) {
            state.open_or_report(path);
        }
        Self { state }
    }
}

impl eframe::App for MyApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ui::draw(&mut self.state, ctx);
    }

    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        eframe::set_value(storage, eframe::APP_KEY, &self.state.persisted());
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // treezoom-app [items.json|items.csv] [config.json]
    let mut args = std::env::args_os().skip(1).map(PathBuf::from);
    let items = args.next();
    let config = match args.next() {
        Some(path) => EngineConfig::load(&path)?,
        None => EngineConfig::default(),
    };

    let options = eframe::NativeOptions::default();
    eframe::run_native(
        "TreeZoom",
        options,
        Box::new(move |cc| Ok(Box::new(MyApp::new(cc, config, items)))),
    )
    .map_err(|e| anyhow::anyhow!("failed to start the UI: {e}"))
}
