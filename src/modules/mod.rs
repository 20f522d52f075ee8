pub mod server_list;
pub mod settings;

pub use server_list::ServerList;
pub use settings::Settings;

use eframe::egui;

/// Which view the central panel shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Servers,
    Settings,
}

pub trait Module {
    fn name(&self) -> &str;
    fn show(&mut self, ctx: &egui::Context, ui: &mut egui::Ui);

    /// A view the module wants to switch to, picked up once per frame.
    fn take_navigation(&mut self) -> Option<View> {
        None
    }
}
