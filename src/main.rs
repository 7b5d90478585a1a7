//! Desktop shell: machine list, detail panel with progress chart, input forms.

use chrono::{Local, NaiveDate};
use eframe::{App, Frame, NativeOptions, egui};
use egui_extras::DatePickerButton;
use egui_plot::{Legend, Plot};
use rfd::FileDialog;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

mod chart;
mod controller;
use controller::{NoticeLevel, Selection, ViewController};
mod entry_log;
use entry_log::EntryInput;
mod errors;
mod export;
mod image_data;
mod registry;
mod settings;
use settings::Settings;
mod store;
use store::LocalStore;

const NOTICE_TTL: Duration = Duration::from_secs(3);
const DETAIL_IMAGE_SIDE: u32 = 512;
const IMAGE_EXTENSIONS: [&str; 7] = ["png", "jpg", "jpeg", "gif", "webp", "bmp", "avif"];

/// Pending add-machine form. Closing it without saving discards everything.
#[derive(Default)]
struct MachineForm {
    label: String,
    image_path: Option<PathBuf>,
}

struct EntryForm {
    date: String,
    picker_date: NaiveDate,
    weight: String,
    reps: String,
    sets: String,
}

impl EntryForm {
    fn new(today: NaiveDate) -> Self {
        Self {
            date: today.format("%Y-%m-%d").to_string(),
            picker_date: today,
            weight: String::new(),
            reps: String::new(),
            sets: String::new(),
        }
    }

    fn input(&self) -> EntryInput {
        EntryInput::new(&self.date, &self.weight, &self.reps, &self.sets)
    }
}

enum FormOutcome {
    Open,
    Save,
    Cancel,
}

struct GymApp {
    controller: Option<ViewController>,
    startup_error: Option<String>,
    settings: Settings,
    settings_dirty: bool,
    show_settings: bool,
    machine_form: Option<MachineForm>,
    entry_form: Option<EntryForm>,
    thumbnails: HashMap<i64, Option<egui::TextureHandle>>,
    photos: HashMap<i64, Option<egui::TextureHandle>>,
}

impl GymApp {
    fn new() -> Self {
        let settings = Settings::load();
        let (controller, startup_error) = match open_store(&settings) {
            Ok(store) => (Some(ViewController::new(store)), None),
            Err(msg) => {
                log::error!("{msg}");
                (None, Some(msg))
            }
        };
        Self {
            controller,
            startup_error,
            settings,
            settings_dirty: false,
            show_settings: false,
            machine_form: None,
            entry_form: None,
            thumbnails: HashMap::new(),
            photos: HashMap::new(),
        }
    }

    fn machine_list_ui(&mut self, ui: &mut egui::Ui) {
        if ui.button("+ Add Machine").clicked() {
            self.machine_form = Some(MachineForm::default());
        }
        ui.separator();

        let Some(controller) = self.controller.as_ref() else {
            return;
        };
        let selected = match controller.selection() {
            Selection::Selected(id) => Some(id),
            Selection::NoSelection => None,
        };
        let side = self.settings.thumbnail_size;
        let mut clicked = None;
        egui::ScrollArea::vertical().show(ui, |ui| {
            if controller.machines().is_empty() {
                ui.weak("No machines yet");
            }
            for summary in controller.machines() {
                let m = &summary.machine;
                ui.horizontal(|ui| {
                    let tex = cached_texture(&mut self.thumbnails, ui.ctx(), m.id, &m.image, side as u32);
                    show_image(ui, tex.as_ref(), side);
                    let text = format!("{}  ({})", m.label, summary.entry_count);
                    if ui.selectable_label(selected == Some(m.id), text).clicked() {
                        clicked = Some(m.id);
                    }
                });
            }
        });

        if let (Some(id), Some(controller)) = (clicked, self.controller.as_mut()) {
            retain_only(&mut self.photos, id);
            controller.select_machine(id);
        }
    }

    fn detail_ui(&mut self, ui: &mut egui::Ui) {
        if let Some(err) = &self.startup_error {
            ui.colored_label(egui::Color32::RED, format!("Storage unavailable: {err}"));
            return;
        }
        let Some(controller) = self.controller.as_ref() else {
            return;
        };
        let Some(detail) = controller.detail() else {
            match controller.selection() {
                Selection::NoSelection => ui.weak("Select a machine to see its progress"),
                Selection::Selected(_) => ui.weak("Nothing to show for this machine"),
            };
            return;
        };

        let mut open_entry_form = false;
        let mut export_entries = None;
        let mut export_chart = None;

        egui::ScrollArea::vertical().show(ui, |ui| {
            ui.heading(&detail.machine.label);
            let tex = cached_texture(
                &mut self.photos,
                ui.ctx(),
                detail.machine.id,
                &detail.machine.image,
                DETAIL_IMAGE_SIDE,
            );
            let width = ui.available_width().min(DETAIL_IMAGE_SIDE as f32);
            show_image(ui, tex.as_ref(), width);
            ui.add_space(8.0);

            ui.horizontal(|ui| {
                if ui.button("+ Add Entry").clicked() {
                    open_entry_form = true;
                }
                ui.menu_button("Export", |ui| {
                    let stem = file_stem(&detail.machine.label);
                    if ui.button("Entries (CSV/JSON)").clicked() {
                        export_entries = save_dialog(&self.settings)
                            .add_filter("CSV", &["csv"])
                            .add_filter("JSON", &["json"])
                            .set_file_name(format!("{stem}.csv"))
                            .save_file();
                        ui.close_menu();
                    }
                    if ui.button("Chart (PNG)").clicked() {
                        export_chart = save_dialog(&self.settings)
                            .add_filter("PNG", &["png"])
                            .set_file_name(format!("{stem}.png"))
                            .save_file();
                        ui.close_menu();
                    }
                });
            });

            let chart = detail.chart.clone();
            Plot::new("progress_chart")
                .height(self.settings.plot_height)
                .legend(Legend::default())
                .x_axis_label("Date")
                .x_axis_formatter(move |mark, _chars, _| chart.date_label(mark.value))
                .show(ui, |plot_ui| {
                    for line in detail.chart.lines() {
                        plot_ui.line(line);
                    }
                });

            if self.settings.show_entry_table && !detail.entries.is_empty() {
                ui.add_space(8.0);
                egui::Grid::new("entry_table").striped(true).show(ui, |ui| {
                    ui.strong("Date");
                    ui.strong("Weight");
                    ui.strong("Reps");
                    ui.strong("Sets");
                    ui.end_row();
                    for e in detail.entries.iter().rev() {
                        ui.label(&e.date);
                        ui.label(format_measurement(e.weight));
                        ui.label(format_measurement(e.reps));
                        ui.label(format_measurement(e.sets));
                        ui.end_row();
                    }
                });
            }
        });

        if open_entry_form {
            self.entry_form = Some(EntryForm::new(Local::now().date_naive()));
        }
        let exported = export_entries.as_ref().or(export_chart.as_ref());
        if let Some(dir) = exported.and_then(|p| p.parent()) {
            self.settings.last_export_dir = Some(dir.display().to_string());
            self.settings_dirty = true;
        }
        if let Some(controller) = self.controller.as_mut() {
            if let Some(path) = export_entries {
                controller.export_entries(&path);
            }
            if let Some(path) = export_chart {
                controller.export_chart(&path);
            }
        }
    }

    fn machine_form_ui(&mut self, ctx: &egui::Context) {
        let Some(form) = self.machine_form.as_mut() else {
            return;
        };
        let mut outcome = FormOutcome::Open;
        egui::Window::new("Add Machine")
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label("Machine name:");
                    ui.text_edit_singleline(&mut form.label);
                });
                ui.horizontal(|ui| {
                    if ui.button("Choose photo…").clicked() {
                        form.image_path = FileDialog::new()
                            .add_filter("Images", &IMAGE_EXTENSIONS)
                            .pick_file();
                    }
                    match &form.image_path {
                        Some(p) => ui.label(
                            p.file_name()
                                .map(|f| f.to_string_lossy().to_string())
                                .unwrap_or_default(),
                        ),
                        None => ui.weak("No photo chosen"),
                    };
                });
                ui.horizontal(|ui| {
                    if ui.button("Save").clicked() {
                        outcome = FormOutcome::Save;
                    }
                    if ui.button("Cancel").clicked() {
                        outcome = FormOutcome::Cancel;
                    }
                });
            });

        match outcome {
            FormOutcome::Open => {}
            FormOutcome::Cancel => self.machine_form = None,
            FormOutcome::Save => {
                if let (Some(form), Some(controller)) =
                    (self.machine_form.take(), self.controller.as_mut())
                {
                    controller.add_machine(Some(&form.label), form.image_path.as_deref());
                }
            }
        }
    }

    fn entry_form_ui(&mut self, ctx: &egui::Context) {
        let Some(form) = self.entry_form.as_mut() else {
            return;
        };
        let mut outcome = FormOutcome::Open;
        egui::Window::new("Add Entry")
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                egui::Grid::new("entry_form").num_columns(2).show(ui, |ui| {
                    ui.label("Date (YYYY-MM-DD):");
                    ui.horizontal(|ui| {
                        ui.text_edit_singleline(&mut form.date);
                        if ui
                            .add(DatePickerButton::new(&mut form.picker_date).id_source("entry_date"))
                            .changed()
                        {
                            form.date = form.picker_date.format("%Y-%m-%d").to_string();
                        }
                    });
                    ui.end_row();
                    ui.label("Weight:");
                    ui.text_edit_singleline(&mut form.weight);
                    ui.end_row();
                    ui.label("Reps:");
                    ui.text_edit_singleline(&mut form.reps);
                    ui.end_row();
                    ui.label("Sets:");
                    ui.text_edit_singleline(&mut form.sets);
                    ui.end_row();
                });
                ui.horizontal(|ui| {
                    if ui.button("Save").clicked() {
                        outcome = FormOutcome::Save;
                    }
                    if ui.button("Cancel").clicked() {
                        outcome = FormOutcome::Cancel;
                    }
                });
            });

        match outcome {
            FormOutcome::Open => {}
            FormOutcome::Cancel => self.entry_form = None,
            FormOutcome::Save => {
                let Some(controller) = self.controller.as_mut() else {
                    return;
                };
                let started = Instant::now();
                let input = form.input();
                let saved = controller.add_entry(&input, self.settings.number_policy());
                // Keep the form open when the input was rejected so it can be fixed.
                let rejected = saved.is_none()
                    && controller
                        .notice()
                        .is_some_and(|n| n.level != NoticeLevel::Info && n.shown_at >= started);
                if !rejected {
                    self.entry_form = None;
                }
            }
        }
    }

    fn settings_ui(&mut self, ctx: &egui::Context) {
        let mut open = self.show_settings;
        egui::Window::new("Settings").open(&mut open).show(ctx, |ui| {
            let s = &mut self.settings;
            let mut changed = false;
            changed |= ui
                .checkbox(&mut s.strict_numbers, "Reject non-numeric weight/reps/sets")
                .changed();
            changed |= ui
                .checkbox(&mut s.show_entry_table, "Show entry table")
                .changed();
            changed |= ui
                .add(egui::Slider::new(&mut s.plot_height, 120.0..=600.0).text("Chart height"))
                .changed();
            changed |= ui
                .add(egui::Slider::new(&mut s.thumbnail_size, 24.0..=96.0).text("Thumbnail size"))
                .changed();
            ui.separator();
            ui.label("Database file (applies on next start):");
            let mut db = s.database_path.clone().unwrap_or_default();
            if ui.text_edit_singleline(&mut db).changed() {
                s.database_path = if db.trim().is_empty() { None } else { Some(db) };
                changed = true;
            }
            if let Some(path) = s.resolved_database_path() {
                ui.weak(path.display().to_string());
            }
            if changed {
                self.settings_dirty = true;
            }
        });
        if !open {
            // Thumbnails are sized when decoded.
            self.thumbnails.clear();
        }
        self.show_settings = open;
    }

    fn notice_ui(&mut self, ctx: &egui::Context) {
        let Some(controller) = self.controller.as_mut() else {
            return;
        };
        controller.expire_notice(NOTICE_TTL);
        let Some(notice) = controller.notice() else {
            return;
        };
        let color = match notice.level {
            NoticeLevel::Info => egui::Color32::LIGHT_GREEN,
            NoticeLevel::Warning => egui::Color32::YELLOW,
            NoticeLevel::Error => egui::Color32::RED,
        };
        let message = notice.message.clone();
        let dismissable = notice.level != NoticeLevel::Info;
        let mut dismiss = false;
        egui::Area::new(egui::Id::new("notice"))
            .anchor(egui::Align2::RIGHT_TOP, [-10.0, 30.0])
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.horizontal(|ui| {
                        ui.colored_label(color, message);
                        if dismissable && ui.small_button("✕").clicked() {
                            dismiss = true;
                        }
                    });
                });
            });
        if dismiss {
            controller.dismiss_notice();
        } else if !dismissable {
            ctx.request_repaint_after(NOTICE_TTL);
        }
    }
}

impl App for GymApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Settings").clicked() {
                        self.show_settings = true;
                        ui.close_menu();
                    }
                });
            });
        });

        egui::SidePanel::left("machine_list")
            .resizable(true)
            .default_width(240.0)
            .show(ctx, |ui| self.machine_list_ui(ui));

        egui::CentralPanel::default().show(ctx, |ui| self.detail_ui(ui));

        self.machine_form_ui(ctx);
        self.entry_form_ui(ctx);
        if self.show_settings {
            self.settings_ui(ctx);
        }
        self.notice_ui(ctx);

        if self.settings_dirty {
            self.settings.save();
            self.settings_dirty = false;
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.settings.save();
    }
}

fn save_dialog(settings: &Settings) -> FileDialog {
    match &settings.last_export_dir {
        Some(dir) => FileDialog::new().set_directory(dir),
        None => FileDialog::new(),
    }
}

fn open_store(settings: &Settings) -> Result<LocalStore, String> {
    let path = settings
        .resolved_database_path()
        .ok_or_else(|| "no data directory available for the database".to_string())?;
    LocalStore::open(&path).map_err(|e| format!("{}: {e}", path.display()))
}

/// Decode a stored image once per machine and keep the texture (or the fact
/// that it could not be decoded).
fn cached_texture(
    cache: &mut HashMap<i64, Option<egui::TextureHandle>>,
    ctx: &egui::Context,
    id: i64,
    data_url: &str,
    max_side: u32,
) -> Option<egui::TextureHandle> {
    cache
        .entry(id)
        .or_insert_with(|| {
            image_data::to_color_image(data_url, max_side)
                .map(|img| ctx.load_texture(format!("machine-{id}-{max_side}"), img, Default::default()))
        })
        .clone()
}

fn show_image(ui: &mut egui::Ui, tex: Option<&egui::TextureHandle>, max_side: f32) {
    match tex {
        Some(tex) => {
            let size = fit_size(tex.size_vec2(), max_side);
            ui.add(egui::Image::new((tex.id(), size)));
        }
        None => {
            ui.allocate_ui(egui::vec2(max_side, max_side.min(48.0)), |ui| {
                ui.weak("no photo");
            });
        }
    }
}

/// Drop cached entries for every machine except `id`.
fn retain_only<V>(cache: &mut HashMap<i64, V>, id: i64) {
    cache.retain(|k, _| *k == id);
}

/// Scale `size` so its longest side is at most `max_side`, keeping the aspect.
fn fit_size(size: egui::Vec2, max_side: f32) -> egui::Vec2 {
    let longest = size.x.max(size.y);
    if longest <= 0.0 {
        return egui::vec2(max_side, max_side);
    }
    size * (max_side / longest)
}

fn format_measurement(value: f64) -> String {
    if value.is_nan() {
        "–".to_string()
    } else {
        format!("{value}")
    }
}

fn file_stem(label: &str) -> String {
    let stem: String = label
        .chars()
        .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    if stem.trim_matches('_').is_empty() {
        "machine".to_string()
    } else {
        stem
    }
}

fn main() -> eframe::Result<()> {
    env_logger::init();
    let options = NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1000.0, 700.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Gym Machine Tracker",
        options,
        Box::new(|_cc| Box::new(GymApp::new())),
    )
}
