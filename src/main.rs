#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod modules;
mod worker;

use craftdeck_core::{Backend, LocalBackend};
use eframe::egui;
use egui::IconData;
use log::{debug, error, info, warn};
use modules::{Module, ServerList, Settings, View};
use std::sync::Arc;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const ABOUT: &str = "Craftdeck lists the game servers in your working directory \
and checks whether your server answers.";

fn create_default_icon() -> IconData {
    let size: u32 = 256;
    let size_usize = size as usize;
    let mut rgba = Vec::with_capacity(size_usize * size_usize * 4);
    for y in 0..size {
        for x in 0..size {
            // Grass block: green top quarter over a dirt gradient.
            let (r, g, b) = if y < size / 4 {
                (52, 160 + ((x * 60) / size) as u8, 83)
            } else {
                let shade = ((y * 60) / size) as u8;
                (134 - shade, 96 - shade / 2, 67 - shade / 2)
            };
            rgba.extend_from_slice(&[r, g, b, 255]);
        }
    }
    IconData {
        rgba,
        width: size,
        height: size,
    }
}

fn open_backend() -> Option<Arc<dyn Backend>> {
    match LocalBackend::open_default() {
        Ok(backend) => {
            info!("Settings file: {}", backend.config_path().display());
            return Some(Arc::new(backend));
        }
        Err(e) => warn!("No per-user config directory ({}), using ./app_data.json", e),
    }
    match LocalBackend::new("app_data.json".into()) {
        Ok(backend) => Some(Arc::new(backend)),
        Err(e) => {
            error!("Could not start backend: {}", e);
            None
        }
    }
}

fn main() -> Result<(), eframe::Error> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));
    info!("Craftdeck v{} starting...", VERSION);

    let Some(backend) = open_backend() else {
        std::process::exit(1);
    };

    let viewport_builder = egui::ViewportBuilder::default()
        .with_inner_size([1000.0, 700.0])
        .with_min_inner_size([640.0, 480.0])
        .with_title("Craftdeck")
        .with_icon(Arc::new(create_default_icon()));

    let options = eframe::NativeOptions {
        viewport: viewport_builder,
        ..Default::default()
    };

    debug!("Initializing eframe application...");
    eframe::run_native(
        "Craftdeck",
        options,
        Box::new(move |cc| Box::new(CraftdeckApp::new(cc, backend))),
    )
}

struct CraftdeckApp {
    backend: Arc<dyn Backend>,
    current_module: Box<dyn Module>,
    show_about: bool,
}

impl CraftdeckApp {
    fn new(cc: &eframe::CreationContext<'_>, backend: Arc<dyn Backend>) -> Self {
        cc.egui_ctx.set_visuals(egui::Visuals::dark());
        let current_module = Box::new(ServerList::new(Arc::clone(&backend), &cc.egui_ctx));
        Self {
            backend,
            current_module,
            show_about: false,
        }
    }

    /// Replaces the current view. The old one is dropped, which tears down its polling and
    /// discards replies still in flight.
    fn switch_to(&mut self, ctx: &egui::Context, view: View) {
        let backend = Arc::clone(&self.backend);
        let from = self.current_module.name().to_string();
        self.current_module = match view {
            View::Servers => Box::new(ServerList::new(backend, ctx)),
            View::Settings => Box::new(Settings::new(backend, ctx)),
        };
        debug!("Module switched: {} -> {}", from, self.current_module.name());
    }
}

impl eframe::App for CraftdeckApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let mut navigate = None;

        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                if ui.button("Servers").clicked() {
                    navigate = Some(View::Servers);
                }
                if ui.button("Settings").clicked() {
                    navigate = Some(View::Settings);
                }
                if ui.button("About").clicked() {
                    self.show_about = true;
                }
            });
        });

        if self.show_about {
            egui::Window::new("About")
                .collapsible(false)
                .resizable(false)
                .show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.heading("Craftdeck");
                        ui.add_space(10.0);
                        ui.label(format!("Version: {}", VERSION));
                        ui.add_space(10.0);
                        ui.separator();
                        ui.add_space(10.0);
                        ui.label(ABOUT);
                        ui.add_space(20.0);
                        if ui.button("Close").clicked() {
                            self.show_about = false;
                        }
                    });
                });
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            self.current_module.show(ctx, ui);
        });

        if let Some(view) = navigate.or_else(|| self.current_module.take_navigation()) {
            self.switch_to(ctx, view);
        }
    }
}
