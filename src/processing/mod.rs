pub mod extractors;
pub mod image;
pub mod normalize;
pub mod ocr;

pub use extractors::FieldExtractor;
pub use self::image::ImageProcessor;
pub use normalize::TextNormalizer;
pub use ocr::{
    LogProgress, NoProgress, OcrEngine, OcrOutput, OcrProgress, OcrStage, ProgressObserver,
    TesseractEngine,
};
