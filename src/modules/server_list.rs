use super::{Module, View};
use crate::worker::{Reply, Worker};
use craftdeck_core::{Backend, DisplayRecord, Loadable, ServerConsole, Source};
use eframe::egui;
use log::{debug, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};

const SCROLL_TOP_THRESHOLD: f32 = 400.0;
const MAX_IDLE_REPAINT: Duration = Duration::from_secs(1);

const ACCENT: egui::Color32 = egui::Color32::from_rgb(52, 211, 153);
const OFFLINE: egui::Color32 = egui::Color32::from_rgb(248, 113, 113);

pub struct ServerList {
    console: ServerConsole,
    worker: Worker,
    working_dir: Loadable<String>,
    search: String,
    show_scroll_top: bool,
    scroll_to_top: bool,
    navigation: Option<View>,
}

impl ServerList {
    pub fn new(backend: Arc<dyn Backend>, ctx: &egui::Context) -> Self {
        let mut list = Self {
            console: ServerConsole::new(),
            worker: Worker::new(backend, ctx.clone()),
            working_dir: Loadable::Loading,
            search: String::new(),
            show_scroll_top: false,
            scroll_to_top: false,
            navigation: None,
        };
        list.worker.read_config();
        list.refresh();
        list
    }

    fn refresh(&mut self) {
        debug!("ServerList: refreshing server list and storage");
        self.worker.fetch_servers(self.console.begin_fetch(Source::Servers));
        self.worker.fetch_storage(self.console.begin_fetch(Source::Storage));
    }

    fn reprobe(&mut self) {
        if let Some(ticket) = self.console.reprobe() {
            self.worker.probe(ticket);
        }
    }

    /// Applies replies from the worker and fires the poll timer.
    fn pump(&mut self, now: Instant) {
        for reply in self.worker.drain() {
            match reply {
                Reply::Servers(ticket, result) => {
                    self.console.apply_servers(ticket, result);
                }
                Reply::Storage(ticket, result) => {
                    self.console.apply_storage(ticket, result);
                }
                Reply::Probe(ticket, result) => {
                    self.console.apply_probe(ticket, result);
                }
                Reply::Config(result) => {
                    self.working_dir = match result {
                        Ok(config) => Loadable::Ready(config.working_dir),
                        Err(e) => {
                            warn!("ServerList: could not read settings: {}", e);
                            Loadable::Failed(e.to_string())
                        }
                    };
                }
                Reply::DirExists { .. } | Reply::Saved(_) => {}
            }
        }
        if let Some(ticket) = self.console.tick(now) {
            self.worker.probe(ticket);
        }
    }

    fn show_header(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.vertical(|ui| {
                ui.heading(egui::RichText::new("Craftdeck").size(28.0).strong());
                let dir = match &self.working_dir {
                    Loadable::Loading => "Loading...".to_string(),
                    Loadable::Failed(e) => format!("unavailable ({})", e),
                    Loadable::Ready(dir) => dir.clone(),
                };
                ui.label(
                    egui::RichText::new(format!("Working Dir {}", dir))
                        .color(ui.visuals().weak_text_color()),
                );
            });
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("Settings").clicked() {
                    self.navigation = Some(View::Settings);
                }
                if ui.button("Refresh").clicked() {
                    self.refresh();
                }
            });
        });
    }

    fn show_stats(&mut self, ui: &mut egui::Ui) {
        let mut reprobe = false;
        ui.columns(3, |cols| {
            stat_card(&mut cols[0], "Servers", |ui| match self.console.server_count() {
                None => {
                    ui.spinner();
                }
                Some(count) => {
                    ui.label(egui::RichText::new(count.to_string()).size(22.0).strong());
                }
            });

            let status = stat_card(&mut cols[1], "Status", |ui| {
                if self.console.is_probing() {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label("Checking...");
                    });
                    return;
                }
                match self.console.probe_result() {
                    Some(result) if result.online => {
                        ui.label(
                            egui::RichText::new(format!("{} ms", result.latency_ms))
                                .size(22.0)
                                .strong()
                                .color(ACCENT),
                        );
                    }
                    Some(_) => {
                        ui.label(egui::RichText::new("Offline").size(22.0).strong().color(OFFLINE));
                    }
                    None => {
                        ui.spinner();
                    }
                }
            });
            let status = status.interact(egui::Sense::click());
            let status = match self.console.probe_error() {
                Some(e) => status.on_hover_text(format!("Click to check again\n{}", e)),
                None => status.on_hover_text("Click to check again"),
            };
            if status.clicked() {
                reprobe = true;
            }

            stat_card(&mut cols[2], "Storage", |ui| match self.console.total_storage_gb() {
                None => {
                    ui.spinner();
                }
                Some(total) => {
                    ui.label(egui::RichText::new(format!("{:.2} GB", total)).size(22.0).strong());
                }
            });
        });
        if reprobe {
            self.reprobe();
        }
    }

    fn show_list(&mut self, ui: &mut egui::Ui) {
        let mut scroll = egui::ScrollArea::vertical()
            .id_source("server_list_scroll")
            .auto_shrink([false, false]);
        if std::mem::take(&mut self.scroll_to_top) {
            scroll = scroll.vertical_scroll_offset(0.0);
        }

        let output = scroll.show(ui, |ui| {
            if self.console.servers().is_loading() {
                ui.vertical_centered(|ui| {
                    ui.add_space(40.0);
                    ui.spinner();
                });
                return;
            }

            let displayed = self.console.displayed().len();
            for record in self.console.displayed() {
                server_card(ui, record);
                ui.add_space(8.0);
            }
            self.console.settle(displayed);

            if let Some(session) = self.console.sync_sentinel() {
                let sentinel = ui
                    .vertical_centered(|ui| {
                        ui.add_space(8.0);
                        ui.horizontal(|ui| {
                            ui.spinner();
                            ui.label("Loading more servers...");
                        });
                    })
                    .response;
                // Seen again after the grown page settled: counts as a new sighting.
                if ui.is_rect_visible(sentinel.rect) {
                    self.console.on_sentinel_visible(session);
                }
            }

            if self.console.filtered().is_empty() {
                ui.vertical_centered(|ui| {
                    ui.add_space(40.0);
                    if self.console.has_no_servers() {
                        ui.label(egui::RichText::new("No servers yet").size(18.0).strong());
                        ui.label("Put server folders into the working directory, or pick another one in Settings.");
                    } else {
                        ui.label(egui::RichText::new("No servers found").size(18.0).strong());
                        ui.label("Try adjusting your search");
                    }
                });
            }
        });

        self.show_scroll_top = output.state.offset.y > SCROLL_TOP_THRESHOLD;
    }
}

fn stat_card(
    ui: &mut egui::Ui,
    title: &str,
    content: impl FnOnce(&mut egui::Ui),
) -> egui::Response {
    egui::Frame::group(ui.style())
        .inner_margin(egui::Margin::same(12.0))
        .show(ui, |ui| {
            ui.set_min_width(ui.available_width());
            ui.label(egui::RichText::new(title).color(ui.visuals().weak_text_color()));
            content(ui);
        })
        .response
}

fn server_card(ui: &mut egui::Ui, record: &DisplayRecord) {
    let meta = &record.meta;
    egui::Frame::group(ui.style())
        .inner_margin(egui::Margin::same(12.0))
        .show(ui, |ui| {
            ui.set_min_width(ui.available_width());
            ui.horizontal(|ui| {
                ui.label(egui::RichText::new(&meta.name).size(18.0).strong());
                ui.label(egui::RichText::new(&meta.engine).monospace());
                ui.label(egui::RichText::new(&meta.version).monospace().color(ACCENT));
            });
            ui.horizontal(|ui| {
                ui.label(format!("Players: {}", meta.players));
                ui.separator();
                ui.label(format!("Storage: {:.2} GB", record.storage_gb()));
                ui.separator();
                ui.label(format!(
                    "Last played: {}",
                    meta.last_played
                        .with_timezone(&chrono::Local)
                        .format("%b %d, %Y %H:%M")
                ));
            });
            ui.label(
                egui::RichText::new(&meta.location)
                    .small()
                    .color(ui.visuals().weak_text_color()),
            );
        });
}

impl Module for ServerList {
    fn name(&self) -> &str {
        "Servers"
    }

    fn show(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        let now = Instant::now();
        self.pump(now);

        self.show_header(ui);
        ui.add_space(12.0);
        self.show_stats(ui);
        ui.add_space(12.0);

        let search = ui.add(
            egui::TextEdit::singleline(&mut self.search)
                .hint_text("Search servers by name, engine, or version...")
                .desired_width(f32::INFINITY),
        );
        if search.changed() {
            self.console.set_query(&self.search);
        }
        ui.add_space(8.0);

        self.show_list(ui);

        if self.show_scroll_top {
            egui::Area::new(egui::Id::new("scroll_to_top"))
                .anchor(egui::Align2::RIGHT_BOTTOM, egui::vec2(-24.0, -24.0))
                .show(ctx, |ui| {
                    if ui.button("Top").clicked() {
                        self.scroll_to_top = true;
                    }
                });
        }

        ctx.request_repaint_after(self.console.time_until_poll(now).min(MAX_IDLE_REPAINT));
    }

    fn take_navigation(&mut self) -> Option<View> {
        self.navigation.take()
    }
}
