use std::io::Write;
use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use tempfile::NamedTempFile;
use tesseract::{PageSegMode, Tesseract};

use crate::config::{LanguageSet, OcrOptions, PageSegmentation};
use crate::utils::OcrError;

/// Text returned by an engine for one image.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrOutput {
    pub text: String,
    /// Mean word confidence in `0.0..=1.0`.
    pub mean_confidence: Option<f32>,
}

/// Anything that turns an image into text. Implementations must tolerate
/// concurrent calls.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(
        &self,
        image: &[u8],
        languages: &LanguageSet,
    ) -> Result<OcrOutput, OcrError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OcrStage {
    Initializing,
    Recognizing,
    Completed,
}

/// A progress report from inside an engine call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OcrProgress {
    pub stage: OcrStage,
    /// Fraction of the call completed, `0.0..=1.0`.
    pub progress: f32,
}

/// Receives progress reports. Closures taking `&OcrProgress` qualify.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, event: &OcrProgress);
}

impl<F> ProgressObserver for F
where
    F: Fn(&OcrProgress) + Send + Sync,
{
    fn on_progress(&self, event: &OcrProgress) {
        self(event)
    }
}

/// Sends progress to the `log` facade at debug level.
pub struct LogProgress;

impl ProgressObserver for LogProgress {
    fn on_progress(&self, event: &OcrProgress) {
        debug!("OCR {:?}: {:.0}%", event.stage, event.progress * 100.0);
    }
}

/// Discards progress.
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_progress(&self, _event: &OcrProgress) {}
}

/// Engine backed by libtesseract. Each call gets its own Tesseract handle on
/// a blocking worker thread.
///
/// Recognition cannot be interrupted. A call abandoned by a caller's timeout
/// keeps its blocking thread until Tesseract finishes, so the runtime's
/// blocking pool must leave room for those stragglers.
pub struct TesseractEngine {
    options: OcrOptions,
    progress: Arc<dyn ProgressObserver>,
}

impl TesseractEngine {
    pub fn new(options: OcrOptions) -> Self {
        TesseractEngine {
            options,
            progress: Arc::new(LogProgress),
        }
    }

    pub fn with_progress(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.progress = observer;
        self
    }

    fn recognize_blocking(
        image_data: &[u8],
        languages: &str,
        options: &OcrOptions,
        progress: &dyn ProgressObserver,
    ) -> Result<OcrOutput, OcrError> {
        progress.on_progress(&OcrProgress {
            stage: OcrStage::Initializing,
            progress: 0.0,
        });

        // Tesseract reads from a path.
        let mut temp_file = NamedTempFile::new()
            .map_err(|e| OcrError::TempFile(format!("Failed to create temp file: {}", e)))?;
        temp_file
            .write_all(image_data)
            .map_err(|e| OcrError::TempFile(format!("Failed to write to temp file: {}", e)))?;
        let image_path = temp_file
            .path()
            .to_str()
            .ok_or_else(|| OcrError::TempFile("Failed to convert path to string".to_string()))?;

        let datapath = options.tessdata_dir.as_ref().and_then(|dir| dir.to_str());
        let mut tess = Tesseract::new(datapath, Some(languages))
            .map_err(|e| OcrError::Init(e.to_string()))?;
        if let Some(whitelist) = &options.char_whitelist {
            tess = tess
                .set_variable("tessedit_char_whitelist", whitelist)
                .map_err(|e| OcrError::Init(format!("Failed to set whitelist: {}", e)))?;
        }
        tess.set_page_seg_mode(page_seg_mode(options.page_segmentation));

        let mut tess = tess
            .set_image(image_path)
            .map_err(|e| OcrError::Image(e.to_string()))?;

        progress.on_progress(&OcrProgress {
            stage: OcrStage::Recognizing,
            progress: 0.5,
        });

        let text = tess
            .get_text()
            .map_err(|e| OcrError::Recognition(e.to_string()))?;
        let mean_confidence = confidence_fraction(tess.mean_text_conf());

        progress.on_progress(&OcrProgress {
            stage: OcrStage::Completed,
            progress: 1.0,
        });

        Ok(OcrOutput {
            text,
            mean_confidence,
        })
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    async fn recognize(
        &self,
        image: &[u8],
        languages: &LanguageSet,
    ) -> Result<OcrOutput, OcrError> {
        let image = image.to_vec();
        let languages = languages.to_tesseract_arg();
        let options = self.options.clone();
        let progress = Arc::clone(&self.progress);

        tokio::task::spawn_blocking(move || {
            Self::recognize_blocking(&image, &languages, &options, progress.as_ref())
        })
        .await
        .map_err(|e| OcrError::Recognition(format!("OCR worker failed: {}", e)))?
    }
}

fn page_seg_mode(mode: PageSegmentation) -> PageSegMode {
    match mode {
        PageSegmentation::Auto => PageSegMode::PsmAuto,
        PageSegmentation::SingleBlock => PageSegMode::PsmSingleBlock,
        PageSegmentation::SingleLine => PageSegMode::PsmSingleLine,
        PageSegmentation::Sparse => PageSegMode::PsmSparseText,
    }
}

/// Tesseract reports 0..=100, or a negative value when nothing was recognized.
fn confidence_fraction(raw: i32) -> Option<f32> {
    if raw < 0 {
        None
    } else {
        Some(raw.min(100) as f32 / 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_confidence_fraction() {
        assert_eq!(confidence_fraction(-1), None);
        assert_eq!(confidence_fraction(0), Some(0.0));
        assert_eq!(confidence_fraction(87), Some(0.87));
        assert_eq!(confidence_fraction(250), Some(1.0));
    }

    #[test]
    fn test_page_seg_mode_mapping() {
        assert!(matches!(page_seg_mode(PageSegmentation::Auto), PageSegMode::PsmAuto));
        assert!(matches!(
            page_seg_mode(PageSegmentation::Sparse),
            PageSegMode::PsmSparseText
        ));
        assert!(matches!(
            page_seg_mode(PageSegmentation::SingleLine),
            PageSegMode::PsmSingleLine
        ));
    }

    #[test]
    fn test_closure_observer() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let observer: Arc<dyn ProgressObserver> = Arc::new(move |event: &OcrProgress| {
            sink.lock().unwrap().push(event.stage);
        });

        observer.on_progress(&OcrProgress {
            stage: OcrStage::Recognizing,
            progress: 0.5,
        });
        NoProgress.on_progress(&OcrProgress {
            stage: OcrStage::Completed,
            progress: 1.0,
        });

        assert_eq!(*seen.lock().unwrap(), vec![OcrStage::Recognizing]);
    }

    #[tokio::test]
    async fn test_missing_tessdata_is_an_error() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let engine = TesseractEngine::new(OcrOptions {
            tessdata_dir: Some("/nonexistent/tessdata".into()),
            char_whitelist: None,
            page_segmentation: PageSegmentation::Sparse,
        })
        .with_progress(Arc::new(move |event: &OcrProgress| {
            sink.lock().unwrap().push(event.stage);
        }));

        let result = engine
            .recognize(b"not an image", &LanguageSet::new(["eng"]))
            .await;

        assert!(result.is_err());
        let stages = seen.lock().unwrap();
        assert_eq!(stages.first(), Some(&OcrStage::Initializing));
        assert!(!stages.contains(&OcrStage::Completed));
    }
}
