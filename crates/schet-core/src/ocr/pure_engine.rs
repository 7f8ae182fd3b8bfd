//! In-process recognition with `pure-onnx-ocr`.

use std::path::Path;
use std::time::Instant;

use image::{DynamicImage, GenericImageView};
use tracing::{debug, info};

use super::ImageRecognizer;
use crate::error::OcrError;

/// Detection + recognition ONNX models loaded from a directory.
///
/// The models are trained for one script, so the language and page
/// segmentation arguments are ignored.
pub struct OnnxRecognizer {
    engine: pure_onnx_ocr::engine::OcrEngine,
}

impl OnnxRecognizer {
    /// Load `det.onnx`, `rec.onnx` and `dict.txt` from `model_dir`.
    pub fn from_dir(model_dir: &Path) -> Result<Self, OcrError> {
        let det_path = model_dir.join("det.onnx");
        let rec_path = model_dir.join("rec.onnx");
        let dict_path = model_dir.join("dict.txt");

        for path in [&det_path, &rec_path, &dict_path] {
            if !path.exists() {
                return Err(OcrError::ModelLoad(format!("missing {}", path.display())));
            }
        }

        let engine = pure_onnx_ocr::engine::OcrEngineBuilder::new()
            .det_model_path(&det_path)
            .rec_model_path(&rec_path)
            .dictionary_path(&dict_path)
            .build()
            .map_err(|e| OcrError::ModelLoad(format!("pure-onnx-ocr: {}", e)))?;

        info!("Loaded pure-onnx-ocr engine from {}", model_dir.display());
        Ok(Self { engine })
    }
}

impl ImageRecognizer for OnnxRecognizer {
    fn name(&self) -> &str {
        "pure-onnx-ocr"
    }

    fn image_to_text(&self, image: &DynamicImage, _language: &str, _psm: u32) -> Result<String, OcrError> {
        let start = Instant::now();
        let (width, height) = image.dimensions();

        let results = self
            .engine
            .run_from_image(image)
            .map_err(|e| OcrError::Recognition(format!("pure-onnx-ocr: {}", e)))?;

        let mut lines: Vec<Line> = results
            .iter()
            .map(|r| Line {
                top_left: top_left(&r.bounding_box),
                text: r.text.replace("[UNK]", " "),
            })
            .collect();
        sort_reading_order(&mut lines);

        debug!(
            "{}x{} image: {} text regions in {}ms",
            width,
            height,
            lines.len(),
            start.elapsed().as_millis()
        );

        Ok(lines
            .into_iter()
            .map(|l| l.text)
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

struct Line {
    top_left: (f32, f32),
    text: String,
}

/// Top-to-bottom in 20px bands, then left-to-right.
fn sort_reading_order(lines: &mut [Line]) {
    lines.sort_by(|a, b| {
        let row_a = (a.top_left.1 / 20.0) as i32;
        let row_b = (b.top_left.1 / 20.0) as i32;
        row_a.cmp(&row_b).then_with(|| {
            a.top_left
                .0
                .partial_cmp(&b.top_left.0)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
    });
}

fn top_left(polygon: &pure_onnx_ocr::Polygon<f64>) -> (f32, f32) {
    polygon
        .exterior()
        .coords()
        .fold((f32::INFINITY, f32::INFINITY), |(x, y), c| {
            (x.min(c.x as f32), y.min(c.y as f32))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn line(x: f32, y: f32, text: &str) -> Line {
        Line {
            top_left: (x, y),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_reading_order() {
        let mut lines = vec![
            line(300.0, 45.0, "ИНН"),
            line(10.0, 5.0, "Счет"),
            line(10.0, 42.0, "Плательщик:"),
            line(120.0, 8.0, "№ 42"),
        ];
        sort_reading_order(&mut lines);
        let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["Счет", "№ 42", "Плательщик:", "ИНН"]);
    }

    #[test]
    fn test_missing_models() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            OnnxRecognizer::from_dir(dir.path()),
            Err(OcrError::ModelLoad(_))
        ));
    }
}
