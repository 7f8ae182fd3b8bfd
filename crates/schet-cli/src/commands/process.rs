//! Process command - extract payment fields from a single invoice PDF.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressFinish, ProgressStyle};
use serde_json::{json, Value};
use tracing::{debug, info};

use schet_core::{ExtractionOutcome, ExtractionPipeline, NormalizedFields};

use super::{load_config, read_document};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input PDF
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Skip the text layer and go straight to OCR
    #[arg(long)]
    ocr: bool,

    /// Print pipeline metrics after processing
    #[arg(long)]
    show_metrics: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Text => "txt",
        }
    }
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = load_config(config_path)?;
    let data = read_document(&args.input)?;

    info!("Processing file: {}", args.input.display());

    let pb = ProgressBar::new_spinner().with_finish(ProgressFinish::AndClear);
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.set_message("Preparing pipeline...");
    pb.enable_steady_tick(Duration::from_millis(100));

    let pipeline = Arc::new(ExtractionPipeline::from_config(&config)?);
    if args.ocr && !pipeline.has_ocr() {
        eprintln!(
            "{} No OCR backend available, using the text layer",
            style("ℹ").blue()
        );
    }

    pb.set_message("Extracting fields...");
    let worker = pipeline.clone();
    let force_ocr = args.ocr;
    let outcome = tokio::task::spawn_blocking(move || worker.process(&data, force_ocr)).await??;
    pb.finish_and_clear();

    let fields = match outcome {
        ExtractionOutcome::Extracted(fields) => fields,
        ExtractionOutcome::NoTextExtracted => {
            anyhow::bail!("Could not read document: {}", args.input.display())
        }
    };

    let output = format_fields(&fields, args.format)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    if args.show_metrics {
        let metrics = pipeline.metrics().snapshot();
        eprintln!();
        eprintln!(
            "{} Processing time: {}ms",
            style("ℹ").blue(),
            metrics.total_processing_ms
        );
        eprintln!("{}", serde_json::to_string_pretty(&metrics)?);
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

pub fn format_fields(fields: &NormalizedFields, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&json!({
            "status": "success",
            "data": fields,
        }))?),
        OutputFormat::Csv => format_csv(fields),
        OutputFormat::Text => Ok(format_text(fields)),
    }
}

/// Flatten nested sections into `section.key` columns.
pub fn flatten(fields: &NormalizedFields) -> Vec<(String, String)> {
    let mut columns = Vec::new();
    for (key, value) in fields.as_map() {
        match value {
            Value::Object(inner) => {
                for (sub, value) in inner {
                    columns.push((format!("{}.{}", key, sub), scalar(value)));
                }
            }
            other => columns.push((key.clone(), scalar(other))),
        }
    }
    columns
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn format_csv(fields: &NormalizedFields) -> anyhow::Result<String> {
    let columns = flatten(fields);
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record(columns.iter().map(|(key, _)| key.as_str()))?;
    wtr.write_record(columns.iter().map(|(_, value)| value.as_str()))?;

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(fields: &NormalizedFields) -> String {
    let mut output = String::new();

    for (key, value) in fields.as_map() {
        match value {
            Value::Object(inner) => {
                output.push_str(&format!("{}:\n", key));
                for (sub, value) in inner {
                    output.push_str(&format!("  {}: {}\n", sub, scalar(value)));
                }
            }
            other => output.push_str(&format!("{}: {}\n", key, scalar(other))),
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use schet_core::models::fields::{InvoiceFields, Party};

    fn sample() -> NormalizedFields {
        let fields = InvoiceFields {
            account_number: Some("42".to_string()),
            payer: Some(Party {
                name: Some("ООО Ромашка".to_string()),
                inn: Some("7701234567".to_string()),
                kpp: None,
            }),
            ..Default::default()
        };
        NormalizedFields::from_fields(&fields, "?").unwrap()
    }

    #[test]
    fn test_json_envelope() {
        let output = format_fields(&sample(), OutputFormat::Json).unwrap();
        let value: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["status"], "success");
        assert_eq!(value["data"]["номер_счета"], "42");
        assert_eq!(value["data"]["плательщик"]["КПП"], "?");
    }

    #[test]
    fn test_flatten_nested_sections() {
        let columns = flatten(&sample());
        assert!(columns.contains(&("номер_счета".to_string(), "42".to_string())));
        assert!(columns.contains(&("плательщик.ИНН".to_string(), "7701234567".to_string())));
        assert!(columns.contains(&("получатель".to_string(), "?".to_string())));
    }

    #[test]
    fn test_csv_has_header_and_row() {
        let output = format_fields(&sample(), OutputFormat::Csv).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("плательщик.наименование"));
        assert!(lines[1].contains("ООО Ромашка"));
    }

    #[test]
    fn test_text_indents_sections() {
        let output = format_fields(&sample(), OutputFormat::Text).unwrap();
        assert!(output.contains("плательщик:\n"));
        assert!(output.contains("  ИНН: 7701234567\n"));
        assert!(output.contains("номер_счета: 42\n"));
    }
}
