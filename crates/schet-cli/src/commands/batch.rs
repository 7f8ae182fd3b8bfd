//! Batch processing command for multiple invoice PDFs.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;
use tracing::{debug, error, warn};

use schet_core::{ExtractionOutcome, ExtractionPipeline, NormalizedFields};

use super::process::{format_fields, OutputFormat};
use super::{load_config, read_document};

/// Columns copied into the summary CSV.
const SUMMARY_FIELDS: &[&str] = &["номер_счета", "дата", "сумма"];

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern matching input PDFs
    #[arg(required = true)]
    input: String,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Skip the text layer and go straight to OCR
    #[arg(long)]
    ocr: bool,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Number of parallel workers
    #[arg(short = 'j', long, default_value = "4")]
    jobs: usize,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,
}

/// Result of processing a single file.
struct ProcessResult {
    path: PathBuf,
    fields: Option<NormalizedFields>,
    error: Option<String>,
    processing_time_ms: u64,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = load_config(config_path)?;

    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| {
            let ext = p.extension().and_then(|e| e.to_str()).unwrap_or("");
            ext.eq_ignore_ascii_case("pdf")
        })
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let pipeline = Arc::new(ExtractionPipeline::from_config(&config)?);

    let overall_pb = ProgressBar::new(files.len() as u64);
    overall_pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let permits = Arc::new(Semaphore::new(args.jobs.max(1)));
    let mut handles = Vec::with_capacity(files.len());
    for path in files {
        let permit = permits.clone().acquire_owned().await?;
        let pipeline = pipeline.clone();
        let force_ocr = args.ocr;
        handles.push(tokio::task::spawn_blocking(move || {
            let file_start = Instant::now();
            let result = process_single_file(&path, &pipeline, force_ocr);
            drop(permit);
            (path, result, file_start.elapsed().as_millis() as u64)
        }));
    }

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        let (path, result, processing_time_ms) = handle.await?;

        match result {
            Ok(fields) => results.push(ProcessResult {
                path,
                fields: Some(fields),
                error: None,
                processing_time_ms,
            }),
            Err(e) => {
                let error_msg = e.to_string();
                if args.continue_on_error {
                    warn!("Failed to process {}: {}", path.display(), error_msg);
                    results.push(ProcessResult {
                        path,
                        fields: None,
                        error: Some(error_msg),
                        processing_time_ms,
                    });
                } else {
                    error!("Failed to process {}: {}", path.display(), error_msg);
                    anyhow::bail!("Processing failed: {}", error_msg);
                }
            }
        }

        overall_pb.inc(1);
    }

    overall_pb.finish_and_clear();

    let successful: Vec<_> = results.iter().filter(|r| r.fields.is_some()).collect();
    let failed: Vec<_> = results.iter().filter(|r| r.error.is_some()).collect();

    if let Some(output_dir) = &args.output_dir {
        for result in &successful {
            let Some(fields) = &result.fields else { continue };
            let output_name = result
                .path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("invoice");
            let output_path =
                output_dir.join(format!("{}.{}", output_name, args.format.extension()));

            fs::write(&output_path, format_fields(fields, args.format)?)?;
            debug!("Wrote output to {}", output_path.display());
        }
    }

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &results)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    let metrics = pipeline.metrics().snapshot();
    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed",
        style(successful.len()).green(),
        style(failed.len()).red()
    );
    println!(
        "   cache: {} hits, {} misses ({:.1}%), avg {:.1}ms per document",
        metrics.cache_hits,
        metrics.cache_misses,
        metrics.cache_hit_rate_percent,
        metrics.average_processing_ms
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for result in &failed {
            println!(
                "  - {}: {}",
                result.path.display(),
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

fn process_single_file(
    path: &Path,
    pipeline: &ExtractionPipeline,
    force_ocr: bool,
) -> anyhow::Result<NormalizedFields> {
    let data = read_document(path)?;
    match pipeline.process(&data, force_ocr)? {
        ExtractionOutcome::Extracted(fields) => Ok(fields),
        ExtractionOutcome::NoTextExtracted => anyhow::bail!("Could not read document"),
    }
}

fn write_summary(path: &Path, results: &[ProcessResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    let mut header = vec!["filename", "status"];
    header.extend_from_slice(SUMMARY_FIELDS);
    header.extend_from_slice(&["processing_time_ms", "error"]);
    wtr.write_record(&header)?;

    for result in results {
        let filename = result
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("");

        let mut record = vec![filename.to_string()];
        match &result.fields {
            Some(fields) => {
                record.push("success".to_string());
                for key in SUMMARY_FIELDS {
                    record.push(
                        fields
                            .get(key)
                            .and_then(|v| v.as_str())
                            .unwrap_or_default()
                            .to_string(),
                    );
                }
            }
            None => {
                record.push("error".to_string());
                record.extend(SUMMARY_FIELDS.iter().map(|_| String::new()));
            }
        }
        record.push(result.processing_time_ms.to_string());
        record.push(result.error.clone().unwrap_or_default());
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use schet_core::models::fields::InvoiceFields;

    #[test]
    fn test_summary_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.csv");

        let fields = InvoiceFields {
            account_number: Some("42".to_string()),
            amount: Some("1500.00".to_string()),
            ..Default::default()
        };
        let results = vec![
            ProcessResult {
                path: PathBuf::from("a.pdf"),
                fields: Some(NormalizedFields::from_fields(&fields, "-").unwrap()),
                error: None,
                processing_time_ms: 12,
            },
            ProcessResult {
                path: PathBuf::from("b.pdf"),
                fields: None,
                error: Some("Could not read document".to_string()),
                processing_time_ms: 3,
            },
        ];
        write_summary(&path, &results).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines[0],
            "filename,status,номер_счета,дата,сумма,processing_time_ms,error"
        );
        assert_eq!(lines[1], "a.pdf,success,42,-,1500.00,12,");
        assert_eq!(lines[2], "b.pdf,error,,,,3,Could not read document");
    }
}
