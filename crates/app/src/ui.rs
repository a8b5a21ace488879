use std::time::Duration;

use eframe::egui::{
    self, Align2, Color32, FontId, Id, LayerId, Order, Pos2, Rect, Rounding, Sense, Stroke, Ui,
    Vec2,
};
use egui_extras::{Column, TableBuilder};
use egui_plot::{Bar, BarChart, Plot, VLine};
use treezoom_core::color::Rgba;
use treezoom_core::human::format_value;
use treezoom_core::{Point, Size, ValueRange};

use crate::state::{AppState, ExportFormat};

const LABEL_FONT: f32 = 12.0;
const VALUE_FONT: f32 = 10.0;

pub fn draw(app: &mut AppState, ctx: &egui::Context) {
    if !app.measure_installed {
        let fonts = ctx.clone();
        app.engine.set_text_measure(move |text: &str| -> f64 {
            fonts.fonts(|f| {
                f.layout_no_wrap(text.to_owned(), FontId::proportional(LABEL_FONT), Color32::WHITE)
                    .size()
                    .x as f64
            })
        });
        app.measure_installed = true;
    }

    let now = Duration::from_secs_f64(ctx.input(|i| i.time));
    app.engine.advance(now);
    if app.poll_events() {
        ctx.request_repaint();
    }

    egui::TopBottomPanel::top("top").show(ctx, |ui| {
        top_bar(ui, app);
        ui.separator();
        breadcrumbs(ui, app);
    });

    egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
        ui.horizontal(|ui| {
            ui.label(&app.status);
            if let (Some(path), Some(at)) = (&app.source, &app.loaded_at) {
                ui.separator();
                ui.label(format!("{} (loaded {})", path.display(), at.format("%H:%M:%S")));
            }
        });
    });

    egui::SidePanel::left("sidebar").resizable(true).default_width(300.0).show(ctx, |ui| {
        ui.heading("Value range");
        range_filter(ui, app);
        ui.separator();
        histogram(ui, app);
        ui.separator();
        ui.heading("Cells");
        cell_table(ui, app);
    });

    egui::CentralPanel::default().show(ctx, |ui| {
        canvas(ui, app, ctx);
    });

    let fading = app.engine.tooltip().is_fading(app.engine.now());
    if app.engine.is_animating() || fading {
        ctx.request_repaint();
    }
}

fn top_bar(ui: &mut Ui, app: &mut AppState) {
    ui.horizontal(|ui| {
        if ui.button("Open…").clicked() {
            if let Some(path) = rfd::FileDialog::new()
                .add_filter("items", &["json", "csv"])
                .pick_file()
            {
                app.open_or_report(path);
            }
        }
        ui.menu_button("Export", |ui| {
            for (label, format, ext) in [
                ("JSON…", ExportFormat::Json, "json"),
                ("CSV…", ExportFormat::Csv, "csv"),
            ] {
                if ui.button(label).clicked() {
                    ui.close_menu();
                    if let Some(path) = rfd::FileDialog::new()
                        .add_filter(ext, &[ext])
                        .set_file_name(format!("treemap.{ext}"))
                        .save_file()
                    {
                        match app.export(&path, format) {
                            Ok(()) => app.status = format!("Exported {}", path.display()),
                            Err(e) => {
                                tracing::error!(error = %e, "export failed");
                                app.status = format!("Export failed: {e:#}");
                            }
                        }
                    }
                }
            }
        });
        ui.separator();
        let zoomed = !app.engine.zoom_state().is_root();
        if ui.add_enabled(zoomed, egui::Button::new("Zoom out")).clicked() {
            app.engine.zoom_out();
        }
        if ui.add_enabled(zoomed, egui::Button::new("Reset")).clicked() {
            app.engine.zoom_reset();
        }
        ui.separator();
        ui.label("Search:");
        if ui.text_edit_singleline(&mut app.search).changed() {
            app.engine.set_name_query(&app.search);
        }
    });
}

fn breadcrumbs(ui: &mut Ui, app: &mut AppState) {
    let crumbs = app.engine.breadcrumbs();
    let mut jump = None;
    ui.horizontal(|ui| {
        for (i, crumb) in crumbs.iter().enumerate() {
            if i > 0 {
                ui.label("›");
            }
            if crumb.is_current {
                ui.strong(&crumb.name);
            } else if ui.link(&crumb.name).clicked() {
                jump = Some(crumb.index);
            }
        }
    });
    if let Some(index) = jump {
        app.engine.jump_to_breadcrumb(index);
    }
}

fn range_filter(ui: &mut Ui, app: &mut AppState) {
    let (Some(full), Some(mut range)) = (app.engine.full_range(), app.range) else {
        ui.label("No data");
        return;
    };
    let mut changed = false;
    changed |= ui
        .add(egui::Slider::new(&mut range.min, full.min..=full.max).text("min"))
        .changed();
    changed |= ui
        .add(egui::Slider::new(&mut range.max, full.min..=full.max).text("max"))
        .changed();
    if changed {
        app.range = Some(ValueRange::new(range.min, range.max));
        app.apply_range();
    }
    ui.horizontal(|ui| {
        if app.engine.filter_state().is_filtered() {
            ui.label("filtered");
        }
        if ui.button("Clear").clicked() {
            app.clear_range();
        }
    });
}

fn histogram(ui: &mut Ui, app: &AppState) {
    let bars: Vec<Bar> = app
        .histogram(20)
        .into_iter()
        .map(|(center, width, n)| Bar::new(center, n as f64).width(width * 0.9))
        .collect();
    if bars.is_empty() {
        return;
    }
    Plot::new("value_histogram")
        .height(120.0)
        .allow_zoom(false)
        .allow_drag(false)
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).color(Color32::from_rgb(0x1f, 0x77, 0xb4)));
            if let Some(range) = app.range {
                plot_ui.vline(VLine::new(range.min));
                plot_ui.vline(VLine::new(range.max));
            }
        });
}

fn cell_table(ui: &mut Ui, app: &mut AppState) {
    let format = app.engine.config().value_format;
    let mut activated = None;
    TableBuilder::new(ui)
        .striped(true)
        .column(Column::remainder())
        .column(Column::auto())
        .header(20.0, |mut header| {
            header.col(|ui| {
                ui.strong("Name");
            });
            header.col(|ui| {
                ui.strong("Value");
            });
        })
        .body(|mut body| {
            for cell in app.engine.cells() {
                body.row(18.0, |mut row| {
                    row.col(|ui| {
                        let text = if cell.matched {
                            egui::RichText::new(&cell.name).strong()
                        } else {
                            egui::RichText::new(&cell.name)
                        };
                        if ui.link(text).clicked() {
                            activated = Some(cell.node);
                        }
                    });
                    row.col(|ui| {
                        ui.label(format_value(cell.value, format));
                    });
                });
            }
        });
    if let Some(node) = activated {
        app.engine.activate(node);
    }
}

fn canvas(ui: &mut Ui, app: &mut AppState, ctx: &egui::Context) {
    let (response, painter) = ui.allocate_painter(ui.available_size(), Sense::click());
    let area = response.rect;
    app.engine.request_resize(Size::new(area.width() as f64, area.height() as f64));

    let to_canvas = |p: Pos2| Point::new((p.x - area.min.x) as f64, (p.y - area.min.y) as f64);
    match response.hover_pos() {
        Some(pos) => app
            .engine
            .hover(Some(to_canvas(pos)), Some(Point::new(pos.x as f64, pos.y as f64))),
        None => app.engine.hover(None, None),
    }
    if response.clicked() {
        if let Some(pos) = response.interact_pointer_pos() {
            app.engine.click(to_canvas(pos));
        }
    }

    let to_screen = |r: treezoom_core::Rect| {
        Rect::from_min_max(
            Pos2::new(area.min.x + r.x0 as f32, area.min.y + r.y0 as f32),
            Pos2::new(area.min.x + r.x1 as f32, area.min.y + r.y1 as f32),
        )
    };
    let padding = app.engine.config().labels.padding as f32;
    for frame in app.engine.frames() {
        let style = app.engine.style(&frame);
        let rect = to_screen(frame.rect);
        painter.rect_filled(rect, Rounding::ZERO, color32(style.fill));
        painter.rect_stroke(
            rect,
            Rounding::ZERO,
            Stroke::new(style.stroke_width as f32, color32(style.stroke)),
        );
        let mut y = rect.min.y + padding;
        if let Some(name) = &frame.cell.labels.name {
            painter.text(
                Pos2::new(rect.min.x + padding, y),
                Align2::LEFT_TOP,
                name,
                FontId::proportional(LABEL_FONT),
                color32(style.text),
            );
            y += LABEL_FONT + 2.0;
        }
        if let Some(value) = &frame.cell.labels.value {
            painter.text(
                Pos2::new(rect.min.x + padding, y),
                Align2::LEFT_TOP,
                value,
                FontId::proportional(VALUE_FONT),
                color32(style.text),
            );
        }
    }

    if app.engine.is_empty() {
        painter.text(
            area.center(),
            Align2::CENTER_CENTER,
            "Nothing to show",
            FontId::proportional(16.0),
            ui.visuals().weak_text_color(),
        );
    }

    tooltip(app, ctx, area);
}

fn tooltip(app: &AppState, ctx: &egui::Context, area: Rect) {
    let panel = app.engine.tooltip();
    let Some(content) = panel.content() else {
        return;
    };
    let now = app.engine.now();
    let opacity = panel.opacity(now) as f32;
    let text = format!("{}\n{}", content.name, content.value);
    let galley = ctx.fonts(|f| f.layout_no_wrap(text, FontId::proportional(LABEL_FONT), Color32::WHITE));
    let margin = Vec2::splat(6.0);
    let size = galley.size() + margin * 2.0;
    let screen = ctx.screen_rect();
    let placement = panel.placement(
        app.engine.config().tooltip.mode,
        core_rect(area),
        core_rect(screen),
        Size::new(size.x as f64, size.y as f64),
        now,
    );
    let Some(at) = placement else {
        return;
    };
    let painter = ctx.layer_painter(LayerId::new(Order::Tooltip, Id::new("treemap_tooltip")));
    let rect = Rect::from_min_size(Pos2::new(at.x as f32, at.y as f32), size);
    painter.rect_filled(rect, Rounding::same(4.0), Color32::from_black_alpha((220.0 * opacity) as u8));
    painter.galley_with_override_text_color(rect.min + margin, galley, Color32::WHITE.gamma_multiply(opacity));
}

fn core_rect(r: Rect) -> treezoom_core::Rect {
    treezoom_core::Rect::new(r.min.x as f64, r.min.y as f64, r.max.x as f64, r.max.y as f64)
}

fn color32(c: Rgba) -> Color32 {
    Color32::from_rgba_unmultiplied(c.r, c.g, c.b, c.a)
}
