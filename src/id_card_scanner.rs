use std::sync::Arc;

use log::{info, warn};

use crate::config::{OcrOptions, ScannerConfig};
use crate::models::*;
use crate::processing::{
    FieldExtractor, ImageProcessor, OcrEngine, TesseractEngine, TextNormalizer,
};
use crate::utils::ScanError;

/// Runs both card sides through preprocessing and OCR, then reads the fields.
///
/// Holds no per-request state, so one scanner can serve concurrent requests.
pub struct IdCardScanner {
    engine: Arc<dyn OcrEngine>,
    config: ScannerConfig,
}

impl IdCardScanner {
    pub fn new(engine: Arc<dyn OcrEngine>, config: ScannerConfig) -> Self {
        IdCardScanner { engine, config }
    }

    /// Scanner backed by the Tesseract engine.
    pub fn with_tesseract(config: ScannerConfig, ocr_options: OcrOptions) -> Self {
        Self::new(Arc::new(TesseractEngine::new(ocr_options)), config)
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    pub async fn extract_identity(
        &self,
        raw_front: Vec<u8>,
        raw_back: Vec<u8>,
    ) -> Result<ScanResponse, ScanError> {
        self.extract(
            RawPage::new(Side::Front, raw_front),
            RawPage::new(Side::Back, raw_back),
        )
        .await
    }

    // Main extraction function that orchestrates the entire process
    pub async fn extract(&self, front: RawPage, back: RawPage) -> Result<ScanResponse, ScanError> {
        // Step 1: Preprocess + OCR both sides concurrently. Either side failing
        // fails the request.
        let (front_text, back_text) =
            tokio::try_join!(self.recognize_page(front), self.recognize_page(back))?;

        // Step 2: Normalize
        let front_canonical = TextNormalizer::canonicalize(&front_text);
        let back_canonical = TextNormalizer::canonicalize(&back_text);

        // Step 3: Field extraction
        let record = FieldExtractor::extract(&front_canonical, &back_canonical);
        info!(
            "Extracted {}/{} fields",
            record.found_count(),
            IdentityField::ALL.len()
        );

        let raw_text = self.config.include_raw_text.then(|| RawText {
            front: front_text.text,
            back: back_text.text,
        });

        Ok(ScanResponse {
            success: true,
            data: record,
            raw_text,
        })
    }

    async fn recognize_page(&self, page: RawPage) -> Result<RecognizedText, ScanError> {
        let side = page.side;
        let preprocessed = self.preprocess_page(page).await?;

        // Dropping the future on timeout does not stop blocking OCR work
        // already handed to a worker thread.
        let output = tokio::time::timeout(
            self.config.ocr_timeout,
            self.engine.recognize(&preprocessed.bytes, &self.config.languages),
        )
        .await
        .map_err(|_| ScanError::OcrTimeout {
            side,
            timeout: self.config.ocr_timeout,
        })?
        .map_err(|source| ScanError::Ocr { side, source })?;

        match output.mean_confidence {
            Some(confidence) => info!(
                "OCR {} side: {} chars, confidence {:.2}",
                side,
                output.text.len(),
                confidence
            ),
            None => info!("OCR {} side: {} chars", side, output.text.len()),
        }

        Ok(RecognizedText {
            side,
            text: output.text,
            mean_confidence: output.mean_confidence,
        })
    }

    /// CPU-bound, so it runs on the blocking pool. A panic in the image
    /// pipeline still falls back to the original bytes.
    async fn preprocess_page(&self, page: RawPage) -> Result<PreprocessedPage, ScanError> {
        let side = page.side;
        let original = page.bytes.clone();
        let options = self.config.preprocess.clone();

        match tokio::task::spawn_blocking(move || ImageProcessor::preprocess_page(&page, &options))
            .await
        {
            Ok(preprocessed) => Ok(preprocessed),
            Err(e) if e.is_panic() => {
                warn!("Preprocessing panicked on {} side, using original image", side);
                Ok(PreprocessedPage {
                    side,
                    bytes: original,
                })
            }
            Err(e) => Err(ScanError::Worker(format!(
                "preprocessing {} side: {}",
                side, e
            ))),
        }
    }
}
