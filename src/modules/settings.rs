use super::{Module, View};
use crate::worker::{Reply, Worker};
use craftdeck_core::{Backend, SettingsDraft};
use eframe::egui;
use log::{debug, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};

const SAVED_BANNER: Duration = Duration::from_secs(3);

const OK_COLOR: egui::Color32 = egui::Color32::from_rgb(52, 211, 153);
const BAD_COLOR: egui::Color32 = egui::Color32::from_rgb(248, 113, 113);

pub struct Settings {
    worker: Worker,
    draft: Option<SettingsDraft>,
    load_error: Option<String>,
    saving: bool,
    saved_at: Option<Instant>,
    save_error: Option<String>,
    navigation: Option<View>,
}

impl Settings {
    pub fn new(backend: Arc<dyn Backend>, ctx: &egui::Context) -> Self {
        let worker = Worker::new(backend, ctx.clone());
        worker.read_config();
        Self {
            worker,
            draft: None,
            load_error: None,
            saving: false,
            saved_at: None,
            save_error: None,
            navigation: None,
        }
    }

    fn pump(&mut self) {
        for reply in self.worker.drain() {
            match reply {
                Reply::Config(Ok(config)) => {
                    self.worker.check_dir(config.working_dir.clone());
                    self.draft = Some(SettingsDraft::from(&config));
                }
                Reply::Config(Err(e)) => {
                    warn!("Settings: could not read settings: {}", e);
                    self.load_error = Some(e.to_string());
                }
                Reply::DirExists { path, exists } => {
                    if let Some(draft) = self.draft.as_mut() {
                        if !draft.record_dir_check(&path, exists) {
                            debug!("Settings: dropping directory check for {}", path);
                        }
                    }
                }
                Reply::Saved(result) => {
                    self.saving = false;
                    match result {
                        Ok(config) => {
                            debug!("Settings: saved {}", config.ping_target());
                            self.saved_at = Some(Instant::now());
                            self.save_error = None;
                        }
                        Err(e) => {
                            warn!("Settings: save failed: {}", e);
                            self.save_error = Some(e.to_string());
                        }
                    }
                }
                Reply::Servers(..) | Reply::Storage(..) | Reply::Probe(..) => {}
            }
        }
    }

    fn browse(&mut self) {
        let Some(draft) = self.draft.as_mut() else {
            return;
        };
        let picked = rfd::FileDialog::new()
            .set_title("Select servers directory")
            .set_directory(&draft.working_dir)
            .pick_folder();
        if let Some(path) = picked {
            draft.working_dir = path.to_string_lossy().into_owned();
            self.worker.check_dir(draft.working_dir.clone());
        }
    }

    fn save(&mut self) {
        let Some(config) = self.draft.as_ref().and_then(SettingsDraft::to_config) else {
            return;
        };
        self.saving = true;
        self.worker.save_config(config);
    }

    fn show_form(&mut self, ui: &mut egui::Ui) {
        let Some(draft) = self.draft.as_mut() else {
            return;
        };
        let mut dir_changed = false;
        let mut browse = false;

        ui.group(|ui| {
            ui.set_min_width(ui.available_width());
            ui.label(egui::RichText::new("Servers Directory").size(18.0).strong());
            ui.label("Location where your servers are stored");
            ui.add_space(8.0);
            ui.horizontal(|ui| {
                let field = ui.add(
                    egui::TextEdit::singleline(&mut draft.working_dir)
                        .hint_text("/path/to/servers")
                        .desired_width(ui.available_width() - 140.0),
                );
                dir_changed = field.changed();
                match draft.dir_status() {
                    Some(true) => {
                        ui.colored_label(OK_COLOR, "✔");
                    }
                    Some(false) => {
                        ui.colored_label(BAD_COLOR, "✖").on_hover_text("Directory does not exist");
                    }
                    None => {
                        ui.spinner().on_hover_text("Checking directory...");
                    }
                }
                browse = ui.button("Browse").clicked();
            });
            ui.label(
                egui::RichText::new(
                    "Changing the working directory will not move existing servers. \
                     Move server folders to the new location yourself.",
                )
                .small()
                .color(ui.visuals().weak_text_color()),
            );
        });

        ui.add_space(12.0);

        let validation = draft.validate();
        ui.group(|ui| {
            ui.set_min_width(ui.available_width());
            ui.label(egui::RichText::new("Server status check").size(18.0).strong());
            ui.label("Address and port used to check the status of your server");
            ui.add_space(8.0);
            ui.horizontal(|ui| {
                ui.add(
                    egui::TextEdit::singleline(&mut draft.ping_address)
                        .hint_text("your_server.net")
                        .desired_width(ui.available_width() - 120.0),
                );
                ui.add(
                    egui::TextEdit::singleline(&mut draft.port_input)
                        .hint_text("25565")
                        .desired_width(100.0),
                );
            });
            if !validation.address_ok {
                ui.colored_label(BAD_COLOR, "Address cannot be empty");
            }
            if !validation.port_ok {
                ui.colored_label(BAD_COLOR, "Port must be a number between 0 and 65535");
            }
            ui.label(
                egui::RichText::new("The address doesn't have to lead to your server")
                    .small()
                    .color(ui.visuals().weak_text_color()),
            );
        });

        if dir_changed {
            self.worker.check_dir(draft.working_dir.clone());
        }
        if browse {
            self.browse();
        }
    }
}

impl Module for Settings {
    fn name(&self) -> &str {
        "Settings"
    }

    fn show(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        self.pump();

        ui.horizontal(|ui| {
            if ui.button("< Back").clicked() {
                self.navigation = Some(View::Servers);
            }
            ui.heading(egui::RichText::new("Settings").size(28.0).strong());
        });
        ui.label(
            egui::RichText::new("Configure your server manager").color(ui.visuals().weak_text_color()),
        );
        ui.add_space(12.0);

        if let Some(saved_at) = self.saved_at {
            let shown = saved_at.elapsed();
            if shown < SAVED_BANNER {
                ui.colored_label(OK_COLOR, "Settings saved. Your changes have been applied successfully.");
                ctx.request_repaint_after(SAVED_BANNER - shown);
            } else {
                self.saved_at = None;
            }
        }
        if let Some(e) = &self.save_error {
            ui.colored_label(BAD_COLOR, format!("Could not save settings: {}", e));
        }

        if self.draft.is_none() {
            match &self.load_error {
                Some(e) => {
                    ui.colored_label(BAD_COLOR, format!("Could not read settings: {}", e));
                }
                None => {
                    ui.spinner();
                }
            }
            return;
        }

        egui::ScrollArea::vertical()
            .id_source("settings_scroll")
            .show(ui, |ui| {
                self.show_form(ui);
                ui.add_space(16.0);

                let can_save = self
                    .draft
                    .as_ref()
                    .map_or(false, |d| d.validate().can_save());
                ui.horizontal(|ui| {
                    let label = if self.saving { "Saving..." } else { "Save" };
                    if ui
                        .add_enabled(can_save && !self.saving, egui::Button::new(label))
                        .clicked()
                    {
                        self.save();
                    }
                    if self.saving {
                        ui.spinner();
                    }
                });
            });
    }

    fn take_navigation(&mut self) -> Option<View> {
        self.navigation.take()
    }
}
