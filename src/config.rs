//! Explicit configuration handed to the scanner and OCR engine at
//! construction time.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Upload size bound for each side.
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Default per-side OCR bound.
pub const DEFAULT_OCR_TIMEOUT: Duration = Duration::from_secs(60);

/// Tesseract language codes to load, e.g. `ara+eng`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageSet(Vec<String>);

impl LanguageSet {
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        LanguageSet(codes.into_iter().map(Into::into).collect())
    }

    pub fn codes(&self) -> &[String] {
        &self.0
    }

    /// The `+`-joined form Tesseract expects.
    pub fn to_tesseract_arg(&self) -> String {
        self.0.join("+")
    }
}

impl Default for LanguageSet {
    fn default() -> Self {
        LanguageSet::new(["ara", "eng"])
    }
}

impl fmt::Display for LanguageSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_tesseract_arg())
    }
}

impl FromStr for LanguageSet {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let codes: Vec<String> = s
            .split(|c: char| c == '+' || c == ',')
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .map(str::to_string)
            .collect();

        if codes.is_empty() {
            return Err(format!("no language codes in {:?}", s));
        }
        if let Some(bad) = codes
            .iter()
            .find(|code| !code.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'))
        {
            return Err(format!("invalid language code {:?}", bad));
        }
        Ok(LanguageSet(codes))
    }
}

/// Tuning for the image pipeline. Defaults follow what works for phone
/// photographs of the card.
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessOptions {
    pub enabled: bool,
    pub contrast_gain: f32,
    pub contrast_bias: f32,
    pub sharpen_sigma: f32,
    pub sharpen_threshold: i32,
    pub max_width: u32,
    pub max_height: u32,
    pub median_radius: u32,
    pub normalize_low_percentile: u8,
    pub normalize_high_percentile: u8,
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        PreprocessOptions {
            enabled: true,
            contrast_gain: 1.5,
            contrast_bias: -0.2,
            sharpen_sigma: 2.0,
            sharpen_threshold: 1,
            max_width: 2000,
            max_height: 2000,
            median_radius: 1,
            normalize_low_percentile: 1,
            normalize_high_percentile: 99,
        }
    }
}

/// How Tesseract splits the page into text regions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PageSegmentation {
    /// Full automatic layout analysis.
    #[default]
    Auto,
    /// One uniform block of text.
    SingleBlock,
    SingleLine,
    /// As much text as possible, in no particular order.
    Sparse,
}

impl fmt::Display for PageSegmentation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            PageSegmentation::Auto => "auto",
            PageSegmentation::SingleBlock => "block",
            PageSegmentation::SingleLine => "line",
            PageSegmentation::Sparse => "sparse",
        };
        f.write_str(name)
    }
}

impl FromStr for PageSegmentation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" | "3" => Ok(PageSegmentation::Auto),
            "block" | "6" => Ok(PageSegmentation::SingleBlock),
            "line" | "7" => Ok(PageSegmentation::SingleLine),
            "sparse" | "11" => Ok(PageSegmentation::Sparse),
            other => Err(format!("unknown page segmentation mode {:?}", other)),
        }
    }
}

/// Settings for the Tesseract adapter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OcrOptions {
    /// Directory holding `*.traineddata`. Falls back to Tesseract's own lookup.
    pub tessdata_dir: Option<PathBuf>,
    /// Restrict recognition to these characters.
    pub char_whitelist: Option<String>,
    pub page_segmentation: PageSegmentation,
}

/// Everything the scanner needs for one deployment.
#[derive(Debug, Clone, PartialEq)]
pub struct ScannerConfig {
    pub languages: LanguageSet,
    pub ocr_timeout: Duration,
    pub include_raw_text: bool,
    pub max_image_bytes: usize,
    pub preprocess: PreprocessOptions,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        ScannerConfig {
            languages: LanguageSet::default(),
            ocr_timeout: DEFAULT_OCR_TIMEOUT,
            include_raw_text: true,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            preprocess: PreprocessOptions::default(),
        }
    }
}
