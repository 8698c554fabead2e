pub mod config;
pub mod id_card_scanner;
pub mod models;
pub mod processing;
pub mod utils;

pub use config::{LanguageSet, OcrOptions, PageSegmentation, PreprocessOptions, ScannerConfig};
pub use id_card_scanner::IdCardScanner;
pub use models::{ErrorResponse, IdentityRecord, ScanResponse, Side};
pub use utils::ScanError;
