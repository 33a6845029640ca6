use clap::Parser;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::Duration;

use txtab::{OutputFormat, ParseOutput, PipelineConfig, TransactionPipeline};

#[derive(Parser)]
#[command(name = "txtab")]
#[command(about = "Normalize legacy transaction logs into a typed tabular dataset")]
#[command(version)]
struct Args {
    /// Input log file
    #[arg(short = 'i', long = "input")]
    input_file: Option<PathBuf>,

    /// Raw log text passed directly on the command line
    #[arg(short = 't', long = "text")]
    text: Option<String>,

    /// Output file (default: stdout)
    #[arg(short = 'o', long = "output")]
    output_file: Option<PathBuf>,

    /// Dataset output format
    #[arg(long, value_enum, default_value = "csv")]
    format: OutputFormat,

    /// Write the diagnostics report as JSON to this file
    #[arg(long = "report", value_name = "FILE")]
    report_file: Option<PathBuf>,

    /// Resolve candidate lines across worker threads
    #[arg(long)]
    parallel: bool,

    /// Suppress the batch summary on stderr
    #[arg(short = 'q', long)]
    quiet: bool,
}

impl Args {
    fn validate(&self) -> Result<(), String> {
        if self.input_file.is_none() && self.text.is_none() {
            return Err("Must provide either --input or --text".to_string());
        }
        Ok(())
    }
}

fn main() {
    let args = Args::parse();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(io::stderr)
        .init();

    let config = PipelineConfig {
        parallel: args.parallel,
        ..PipelineConfig::default()
    };
    let pipeline = TransactionPipeline::new(config);

    let output = pipeline.parse_from_source(args.input_file.as_deref(), args.text.as_deref())?;

    let mut writer: Box<dyn Write> = match &args.output_file {
        Some(path) => {
            let file = File::create(path).map_err(|e| {
                format!("Failed to create output file '{}': {}", path.display(), e)
            })?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(io::stdout()),
    };
    txtab::write_dataset(&output.dataset, args.format, &mut writer)?;
    writer.flush()?;

    if let Some(report_path) = &args.report_file {
        let file = File::create(report_path).map_err(|e| {
            format!("Failed to create report file '{}': {}", report_path.display(), e)
        })?;
        txtab::write_diagnostics(&output.diagnostics, BufWriter::new(file))?;
    }

    if !args.quiet {
        print_summary(&output);
    }

    Ok(())
}

fn print_summary(output: &ParseOutput) {
    let diagnostics = &output.diagnostics;
    let elapsed = Duration::from_millis(diagnostics.elapsed.as_millis() as u64);
    eprintln!(
        "txtab: {} records from {} candidate lines ({} dropped) in {}",
        diagnostics.records_parsed,
        diagnostics.lines_seen,
        diagnostics.dropped_count(),
        humantime::format_duration(elapsed)
    );
    if output.dataset.is_empty() {
        tracing::warn!("batch produced an empty dataset");
    }
}
