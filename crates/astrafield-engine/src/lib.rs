pub mod config;
pub mod controller;
pub mod generated;
pub mod transport;

#[cfg(test)]
mod testing;

pub use config::PanelConfig;
pub use controller::{BusyFlag, GenerateOutcome, Notifier, PanelController, StderrNotifier};
pub use generated::{GeneratedImage, PreviewInfo, DOWNLOAD_FILE_NAME};
pub use transport::{ApiClient, HttpStatusError, HttpTransport, ReqwestTransport};
