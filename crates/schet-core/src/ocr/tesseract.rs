//! Recognition through the external `tesseract` binary.

use std::process::Command;

use image::DynamicImage;
use tracing::trace;

use super::ImageRecognizer;
use crate::error::OcrError;

/// Runs `tesseract <image> stdout -l <lang> --psm <n>` per page.
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    binary: String,
}

impl TesseractRecognizer {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// First line of `tesseract --version`; fails when the binary cannot run.
    pub fn version(&self) -> Result<String, OcrError> {
        let output = Command::new(&self.binary)
            .arg("--version")
            .output()
            .map_err(|e| OcrError::Unavailable(format!("{}: {}", self.binary, e)))?;

        if !output.status.success() {
            return Err(OcrError::Unavailable(format!(
                "{} --version exited with {}",
                self.binary,
                output.status.code().unwrap_or(-1)
            )));
        }

        // Older releases print the version banner on stderr
        let banner = if output.stdout.is_empty() {
            output.stderr
        } else {
            output.stdout
        };
        Ok(String::from_utf8_lossy(&banner)
            .lines()
            .next()
            .unwrap_or("tesseract")
            .trim()
            .to_string())
    }
}

impl ImageRecognizer for TesseractRecognizer {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn image_to_text(&self, image: &DynamicImage, language: &str, psm: u32) -> Result<String, OcrError> {
        let temp_dir = tempfile::tempdir()
            .map_err(|e| OcrError::Recognition(format!("failed to create temp dir: {}", e)))?;
        let input = temp_dir.path().join("page.png");

        image
            .save_with_format(&input, image::ImageFormat::Png)
            .map_err(|e| OcrError::InvalidImage(e.to_string()))?;

        let output = Command::new(&self.binary)
            .arg(&input)
            .arg("stdout")
            .arg("-l")
            .arg(language)
            .arg("--psm")
            .arg(psm.to_string())
            .output()
            .map_err(|e| OcrError::Unavailable(format!("{}: {}", self.binary, e)))?;

        if !output.status.success() {
            return Err(OcrError::Recognition(format!(
                "tesseract exited with {}: {}",
                output.status.code().unwrap_or(-1),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        trace!("tesseract returned {} chars", text.len());
        Ok(text)
    }
}
