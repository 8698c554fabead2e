// Command line front-end: reads the two card photographs, runs the scanner and
// prints the JSON response.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use image::ImageFormat;
use log::{error, info};

use idscan::config::{DEFAULT_MAX_IMAGE_BYTES, DEFAULT_OCR_TIMEOUT};
use idscan::{
    ErrorResponse, IdCardScanner, LanguageSet, OcrOptions, PageSegmentation, PreprocessOptions,
    ScanError, ScanResponse, ScannerConfig, Side,
};

const ACCEPTED_FORMATS: &[ImageFormat] = &[
    ImageFormat::Png,
    ImageFormat::Jpeg,
    ImageFormat::Gif,
    ImageFormat::Bmp,
    ImageFormat::Tiff,
    ImageFormat::WebP,
];

/// Extract identity fields from the front and back photographs of a national ID card.
#[derive(Debug, Parser)]
#[clap(version, about)]
struct Opts {
    /// Photograph of the card front.
    #[clap(long = "front", value_name = "PATH")]
    front_image: PathBuf,

    /// Photograph of the card back.
    #[clap(long = "back", value_name = "PATH")]
    back_image: PathBuf,

    /// OCR languages, `+`-separated.
    #[clap(long, default_value = "ara+eng")]
    languages: LanguageSet,

    /// Per-side OCR timeout in seconds.
    #[clap(long, default_value_t = DEFAULT_OCR_TIMEOUT.as_secs())]
    timeout_secs: u64,

    /// Largest accepted image, in bytes.
    #[clap(long, default_value_t = DEFAULT_MAX_IMAGE_BYTES)]
    max_image_bytes: usize,

    /// Leave the raw OCR text out of the response.
    #[clap(long)]
    no_raw_text: bool,

    /// Send images to OCR without preprocessing.
    #[clap(long)]
    no_preprocess: bool,

    /// Tesseract data directory.
    #[clap(long, env = "TESSDATA_PREFIX")]
    tessdata_dir: Option<PathBuf>,

    /// Restrict OCR to these characters, e.g. `ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789`.
    #[clap(long)]
    whitelist: Option<String>,

    /// Tesseract page segmentation: auto, block, line or sparse.
    #[clap(long = "psm", default_value = "auto")]
    page_segmentation: PageSegmentation,

    /// Pretty-print the JSON output.
    #[clap(long)]
    pretty: bool,
}

impl Opts {
    fn scanner_config(&self) -> ScannerConfig {
        ScannerConfig {
            languages: self.languages.clone(),
            ocr_timeout: Duration::from_secs(self.timeout_secs),
            include_raw_text: !self.no_raw_text,
            max_image_bytes: self.max_image_bytes,
            preprocess: PreprocessOptions {
                enabled: !self.no_preprocess,
                ..Default::default()
            },
        }
    }

    fn ocr_options(&self) -> OcrOptions {
        OcrOptions {
            tessdata_dir: self.tessdata_dir.clone(),
            char_whitelist: self.whitelist.clone(),
            page_segmentation: self.page_segmentation,
        }
    }
}

/// Reject payloads that are empty, too large, or not a common image format.
fn validate_image(bytes: &[u8], side: Side, max_bytes: usize) -> Result<(), ScanError> {
    if bytes.is_empty() {
        return Err(ScanError::InvalidInput(format!("{} image is empty", side)));
    }
    if bytes.len() > max_bytes {
        return Err(ScanError::InvalidInput(format!(
            "{} image is {} bytes, limit is {}",
            side,
            bytes.len(),
            max_bytes
        )));
    }
    match image::guess_format(bytes) {
        Ok(format) if ACCEPTED_FORMATS.contains(&format) => Ok(()),
        Ok(format) => Err(ScanError::InvalidInput(format!(
            "{} image has unsupported format {:?}",
            side, format
        ))),
        Err(_) => Err(ScanError::InvalidInput(format!(
            "{} image is not a recognized image file",
            side
        ))),
    }
}

async fn read_image(path: &Path, side: Side, max_bytes: usize) -> Result<Vec<u8>, ScanError> {
    // Reject oversized files before buffering them.
    let size = tokio::fs::metadata(path).await?.len();
    if size > max_bytes as u64 {
        return Err(ScanError::InvalidInput(format!(
            "{} image is {} bytes, limit is {}",
            side, size, max_bytes
        )));
    }

    let bytes = tokio::fs::read(path).await?;
    validate_image(&bytes, side, max_bytes)?;
    Ok(bytes)
}

async fn run(opts: &Opts) -> Result<ScanResponse, ScanError> {
    let config = opts.scanner_config();
    let front = read_image(&opts.front_image, Side::Front, config.max_image_bytes).await?;
    let back = read_image(&opts.back_image, Side::Back, config.max_image_bytes).await?;

    info!(
        "Scanning {:?} / {:?} with languages {}",
        opts.front_image, opts.back_image, config.languages
    );
    let scanner = IdCardScanner::with_tesseract(config, opts.ocr_options());
    scanner.extract_identity(front, back).await
}

fn to_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<String, ScanError> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(json)
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let opts = Opts::parse();
    match run(&opts).await.and_then(|response| to_json(&response, opts.pretty)) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("Failed to process ID card: {}", err);
            let body = match &err {
                ScanError::InvalidInput(reason) => ErrorResponse {
                    error: reason.clone(),
                },
                _ => ErrorResponse::generic(),
            };
            if let Ok(json) = to_json(&body, opts.pretty) {
                println!("{}", json);
            }
            ExitCode::from(err.exit_code() as u8)
        }
    }
}
