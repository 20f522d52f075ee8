use craftdeck_core::{AppConfig, Backend, FetchTicket, ProbeResult, ProbeTicket, ServerMetadata, StorageSample};
use eframe::egui;
use log::debug;
use std::sync::mpsc;
use std::sync::Arc;

/// Result of one background call, handed back to the UI thread.
pub enum Reply {
    Servers(FetchTicket, craftdeck_core::Result<Vec<ServerMetadata>>),
    Storage(FetchTicket, craftdeck_core::Result<Vec<StorageSample>>),
    Probe(ProbeTicket, craftdeck_core::Result<ProbeResult>),
    Config(craftdeck_core::Result<AppConfig>),
    DirExists { path: String, exists: bool },
    Saved(craftdeck_core::Result<AppConfig>),
}

/// Runs backend calls off the UI thread. Replies arrive on a channel owned by the view; once the
/// view is dropped, replies still in flight have nowhere to go and are discarded.
pub struct Worker {
    backend: Arc<dyn Backend>,
    ctx: egui::Context,
    tx: mpsc::Sender<Reply>,
    rx: mpsc::Receiver<Reply>,
}

impl Worker {
    pub fn new(backend: Arc<dyn Backend>, ctx: egui::Context) -> Self {
        let (tx, rx) = mpsc::channel();
        Self { backend, ctx, tx, rx }
    }

    fn spawn<F>(&self, what: &'static str, job: F)
    where
        F: FnOnce(&dyn Backend) -> Reply + Send + 'static,
    {
        let backend = Arc::clone(&self.backend);
        let tx = self.tx.clone();
        let ctx = self.ctx.clone();
        std::thread::spawn(move || {
            let reply = job(backend.as_ref());
            if tx.send(reply).is_err() {
                debug!("Worker: {} finished after its view closed", what);
                return;
            }
            ctx.request_repaint();
        });
    }

    pub fn fetch_servers(&self, ticket: FetchTicket) {
        self.spawn("server list", move |b| Reply::Servers(ticket, b.fetch_servers()));
    }

    pub fn fetch_storage(&self, ticket: FetchTicket) {
        self.spawn("storage sizes", move |b| Reply::Storage(ticket, b.fetch_storage_sizes()));
    }

    pub fn probe(&self, ticket: ProbeTicket) {
        self.spawn("probe", move |b| Reply::Probe(ticket, b.probe_server()));
    }

    pub fn read_config(&self) {
        self.spawn("config read", |b| Reply::Config(b.read_app_config()));
    }

    pub fn check_dir(&self, path: String) {
        self.spawn("directory check", move |b| {
            let exists = b.directory_exists(&path);
            Reply::DirExists { path, exists }
        });
    }

    pub fn save_config(&self, config: AppConfig) {
        self.spawn("config save", move |b| {
            let result = b.save_app_config(&config).map(|()| config);
            Reply::Saved(result)
        });
    }

    /// Replies that arrived since the last frame.
    pub fn drain(&self) -> Vec<Reply> {
        self.rx.try_iter().collect()
    }
}
