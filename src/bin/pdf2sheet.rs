use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use pdf_data_extractor::batch::{BatchJob, OcrTools, OutcomeStatus, extract_report, process_folder};
use pdf_data_extractor::cluster::TokenClusterer;
use pdf_data_extractor::files::timestamp_now;
use pdf_data_extractor::ocr::TesseractOcr;
use pdf_data_extractor::render::PdftoppmRenderer;
use pdf_data_extractor::search::search_text;
use pdf_data_extractor::sheet::rows_to_string;
use pdf_data_extractor::text_cache::{TextCache, join_page_texts};
use pdf_data_extractor::text_layer::{PdfSource, read_pdf_pages};
use pdf_data_extractor::token::parse_tokens_json;
use pdf_data_extractor::{
    ExtractOptions, ExtractionReport, HeaderMode, PageSelection, PdfKind, QualityMode,
    SheetLayout, ToolConfig, extract_ocr_text, write_tables,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "pdf2sheet",
    version,
    about = "Extract tables and text from digital and scanned PDFs into CSV sheets"
)]
struct Cli {
    /// Log progress at info level.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Extract the tables of one PDF.
    Tables(TablesArgs),
    /// Extract the tables of every PDF in a folder and write a summary.
    Batch(BatchArgs),
    /// Dump the full text of a PDF.
    Text(TextArgs),
    /// Find lines containing terms in one or more PDFs.
    Search(SearchArgs),
    /// Rebuild table rows from a JSON dump of positioned OCR tokens.
    Cluster(ClusterArgs),
}

#[derive(Debug, Args)]
struct ToolArgs {
    /// tesseract executable; defaults to $TESSERACT_CMD or `tesseract`.
    #[arg(long)]
    tesseract: Option<PathBuf>,

    /// pdftoppm executable; defaults to $PDFTOPPM_CMD or `pdftoppm`.
    #[arg(long)]
    pdftoppm: Option<PathBuf>,

    /// OCR language; defaults to $OCR_LANG or `eng`.
    #[arg(long)]
    lang: Option<String>,

    /// Render resolution for scanned pages.
    #[arg(long)]
    dpi: Option<u32>,
}

#[derive(Debug, Args)]
struct ExtractArgs {
    /// `text` for digital PDFs, `scanned` to render and OCR each page.
    #[arg(long, default_value = "text")]
    kind: String,

    /// Page selection like 1-3,5.
    #[arg(long)]
    pages: Option<String>,

    /// Output delimiter character.
    #[arg(long, default_value = ",")]
    delimiter: char,

    /// Treat the first row of each table as its header.
    #[arg(long, conflicts_with = "no_header")]
    has_header: bool,

    /// Keep the first row of each table as data.
    #[arg(long, conflicts_with = "has_header")]
    no_header: bool,

    /// Minimum cells required per candidate table row.
    #[arg(long, default_value_t = 2)]
    min_cols: usize,

    /// Fail on low-confidence tables instead of exporting them.
    #[arg(long, conflicts_with = "skip_ambiguous")]
    strict: bool,

    /// Drop low-confidence tables.
    #[arg(long, conflicts_with = "strict")]
    skip_ambiguous: bool,

    /// Row grouping tolerance for OCR tokens, in rendered pixels.
    #[arg(long)]
    bucket_size: Option<f64>,

    /// Write every table into one CSV with page and table_id columns.
    #[arg(long)]
    merged: bool,

    #[command(flatten)]
    tools: ToolArgs,
}

#[derive(Debug, Args)]
struct TablesArgs {
    /// Input PDF path.
    #[arg(short, long)]
    input: PathBuf,

    /// Output directory, or CSV path with --merged.
    #[arg(short, long)]
    output: PathBuf,

    #[command(flatten)]
    extract: ExtractArgs,
}

#[derive(Debug, Args)]
struct BatchArgs {
    /// Folder containing the PDFs.
    #[arg(short, long)]
    input: PathBuf,

    /// Folder receiving sheets and the summary CSV.
    #[arg(short, long)]
    output: PathBuf,

    /// Move successfully processed PDFs into this folder.
    #[arg(long)]
    processed: Option<PathBuf>,

    #[command(flatten)]
    extract: ExtractArgs,
}

#[derive(Debug, Args)]
struct TextArgs {
    /// Input PDF path.
    #[arg(short, long)]
    input: PathBuf,

    /// Output text file; stdout when omitted.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// OCR the rendered pages instead of reading the text layer.
    #[arg(long)]
    ocr: bool,

    /// Page selection like 1-3,5.
    #[arg(long)]
    pages: Option<String>,

    #[command(flatten)]
    tools: ToolArgs,
}

#[derive(Debug, Args)]
struct SearchArgs {
    /// Input PDF path. Repeatable.
    #[arg(short, long = "input", required = true)]
    inputs: Vec<PathBuf>,

    /// Case-insensitive term to look for. Repeatable.
    #[arg(short, long = "term", required = true)]
    terms: Vec<String>,
}

#[derive(Debug, Args)]
struct ClusterArgs {
    /// JSON array of {text,left,top,width,height} tokens.
    #[arg(short, long)]
    input: PathBuf,

    /// Output CSV path; stdout when omitted.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Row grouping tolerance in token coordinate units.
    #[arg(long, default_value_t = pdf_data_extractor::cluster::DEFAULT_BUCKET_SIZE)]
    bucket_size: f64,

    /// Output delimiter character.
    #[arg(long, default_value = ",")]
    delimiter: char,
}

fn parse_delimiter(delimiter: char) -> Result<u8> {
    if !delimiter.is_ascii() {
        anyhow::bail!("delimiter must be a single ASCII character");
    }
    Ok(delimiter as u8)
}

fn parse_pages(pages: Option<&str>) -> Result<Option<PageSelection>> {
    pages
        .map(PageSelection::from_str)
        .transpose()
        .map_err(|error| anyhow!("invalid page selection: {error}"))
        .context("failed to parse --pages")
}

fn parse_kind(kind: &str) -> Result<PdfKind> {
    PdfKind::from_str(kind)
        .map_err(|error| anyhow!("{error}"))
        .with_context(|| format!("failed to parse --kind '{kind}'"))
}

fn parse_options(args: &ExtractArgs) -> Result<ExtractOptions> {
    let header_mode = if args.has_header {
        HeaderMode::HasHeader
    } else if args.no_header {
        HeaderMode::NoHeader
    } else {
        HeaderMode::AutoDetect
    };

    let quality_mode = if args.strict {
        QualityMode::Strict
    } else if args.skip_ambiguous {
        QualityMode::SkipAmbiguous
    } else {
        QualityMode::BestEffort
    };

    Ok(ExtractOptions {
        pages: parse_pages(args.pages.as_deref())?,
        delimiter: parse_delimiter(args.delimiter)?,
        header_mode,
        quality_mode,
        min_cols: args.min_cols,
        bucket_size: args.bucket_size,
        layout: if args.merged {
            SheetLayout::Merged
        } else {
            SheetLayout::PerTable
        },
    })
}

fn tool_config(args: &ToolArgs) -> ToolConfig {
    let mut config = ToolConfig::from_env();
    if let Some(tesseract) = &args.tesseract {
        config.tesseract_path.clone_from(tesseract);
    }
    if let Some(pdftoppm) = &args.pdftoppm {
        config.pdftoppm_path.clone_from(pdftoppm);
    }
    if let Some(lang) = &args.lang {
        config.language.clone_from(lang);
    }
    if let Some(dpi) = args.dpi {
        config.dpi = dpi;
    }
    config
}

struct ExternalTools {
    renderer: PdftoppmRenderer,
    ocr: TesseractOcr,
}

impl ExternalTools {
    fn new(config: &ToolConfig) -> Self {
        Self {
            renderer: PdftoppmRenderer::new(&config.pdftoppm_path, config.dpi),
            ocr: TesseractOcr::new(&config.tesseract_path, config.language.clone()),
        }
    }

    fn as_ocr_tools(&self) -> OcrTools<'_> {
        OcrTools {
            renderer: &self.renderer,
            ocr: &self.ocr,
        }
    }
}

fn write_output(output: Option<&Path>, content: &str) -> Result<()> {
    match output {
        Some(path) => fs::write(path, content)
            .with_context(|| format!("failed to write '{}'", path.display())),
        None => {
            print!("{content}");
            Ok(())
        }
    }
}

fn exit_for_rows(rows: usize) -> ExitCode {
    if rows > 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    }
}

fn log_report(report: &ExtractionReport, verbose: bool) {
    if report.warnings.is_empty() {
        return;
    }

    eprintln!("warning: {} issue(s) detected", report.warnings.len());
    if verbose {
        for warning in &report.warnings {
            eprintln!("  - {warning}");
        }
    }
}

fn run_tables(args: &TablesArgs, verbose: bool) -> Result<ExitCode> {
    let options = parse_options(&args.extract)?;
    let kind = parse_kind(&args.extract.kind)?;
    let tools = ExternalTools::new(&tool_config(&args.extract.tools));

    let report = extract_report(&args.input, kind, &options, tools.as_ocr_tools())
        .with_context(|| format!("failed to extract tables from '{}'", args.input.display()))?;
    log_report(&report, verbose);

    if report.table_count > 0 {
        let written = write_tables(&report, &args.output, &options)
            .with_context(|| format!("failed to write sheets to '{}'", args.output.display()))?;
        for path in written {
            println!("{}", path.display());
        }
    }
    Ok(exit_for_rows(report.row_count))
}

fn run_batch(args: &BatchArgs) -> Result<ExitCode> {
    let tools = ExternalTools::new(&tool_config(&args.extract.tools));
    let job = BatchJob {
        input_dir: args.input.clone(),
        output_dir: args.output.clone(),
        processed_dir: args.processed.clone(),
        kind: parse_kind(&args.extract.kind)?,
        options: parse_options(&args.extract)?,
        timestamp: timestamp_now(),
    };

    let summary = process_folder(&job, tools.as_ocr_tools())
        .with_context(|| format!("failed to process folder '{}'", args.input.display()))?;

    let succeeded = summary.count(OutcomeStatus::Success);
    println!(
        "processed {} file(s): {succeeded} with tables, {} empty, {} failed",
        summary.outcomes.len(),
        summary.count(OutcomeStatus::Empty),
        summary.count(OutcomeStatus::Failed),
    );
    if let Some(path) = &summary.summary_path {
        println!("summary: {}", path.display());
    }
    Ok(exit_for_rows(succeeded))
}

fn run_text(args: &TextArgs) -> Result<ExitCode> {
    let pages = parse_pages(args.pages.as_deref())?;
    let text = if args.ocr {
        let tools = ExternalTools::new(&tool_config(&args.tools));
        extract_ocr_text(&args.input, pages.as_ref(), &tools.renderer, &tools.ocr)
            .with_context(|| format!("failed to OCR '{}'", args.input.display()))?
    } else {
        let pages = read_pdf_pages(PdfSource::Path(&args.input), pages.as_ref())
            .with_context(|| format!("failed to read text from '{}'", args.input.display()))?;
        join_page_texts(&pages)
    };

    write_output(args.output.as_deref(), &text)?;
    Ok(exit_for_rows(usize::from(!text.trim().is_empty())))
}

fn run_search(args: &SearchArgs) -> Result<ExitCode> {
    let mut cache = TextCache::new();
    let mut found = 0;

    for term in &args.terms {
        for input in &args.inputs {
            let text = cache
                .full_text(input)
                .with_context(|| format!("failed to read text from '{}'", input.display()))?;
            let matches = search_text(text, term)?;
            for hit in &matches {
                println!("{}:{}: {}", input.display(), hit.line_number, hit.line);
            }
            found += matches.len();
        }
    }
    Ok(exit_for_rows(found))
}

fn run_cluster(args: &ClusterArgs) -> Result<ExitCode> {
    let delimiter = parse_delimiter(args.delimiter)?;
    let json = fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read '{}'", args.input.display()))?;
    let tokens = parse_tokens_json(&json)
        .with_context(|| format!("failed to parse tokens from '{}'", args.input.display()))?;
    let clusterer = TokenClusterer::new(args.bucket_size).context("invalid --bucket-size")?;

    let rows = clusterer.cluster(&tokens);
    write_output(args.output.as_deref(), &rows_to_string(&rows, delimiter)?)?;
    Ok(exit_for_rows(rows.len()))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "pdf_data_extractor=info"
    } else {
        "pdf_data_extractor=warn"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    let result = match &cli.command {
        Commands::Tables(args) => run_tables(args, cli.verbose),
        Commands::Batch(args) => run_batch(args),
        Commands::Text(args) => run_text(args),
        Commands::Search(args) => run_search(args),
        Commands::Cluster(args) => run_cluster(args),
    };

    match result {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::from(1)
        }
    }
}
