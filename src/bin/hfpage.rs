//! Binary entry point for the heap-page inspection CLI.
#![forbid(unsafe_code)]

use std::error::Error;
use std::fs::{self, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use heap_page::types::page::MAX_SPACE;
use heap_page::{HeapPage, PageDump, PageId, PageOptions, Rid};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "hfpage",
    version,
    about = "Inspect and edit slotted heap-file pages",
    disable_help_subcommand = true
)]
struct Cli {
    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Output format for structured responses"
    )]
    format: OutputFormat,

    #[arg(
        long,
        global = true,
        env = "HFPAGE_LOG",
        default_value = "warn",
        help = "Log filter in tracing EnvFilter syntax"
    )]
    log_level: String,

    #[arg(long, global = true, help = "Zero bytes reclaimed by deletes")]
    scrub: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct PageArgs {
    #[arg(value_name = "FILE")]
    file: PathBuf,

    #[arg(long, default_value_t = 0, help = "Page index within the file")]
    page: u32,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct RecordData {
    #[arg(long, help = "Record contents as UTF-8 text")]
    text: Option<String>,

    #[arg(long, help = "Record contents as hex")]
    hex: Option<String>,
}

impl RecordData {
    fn to_bytes(&self) -> Result<Vec<u8>, Box<dyn Error>> {
        match (&self.text, &self.hex) {
            (Some(text), _) => Ok(text.as_bytes().to_vec()),
            (None, Some(encoded)) => Ok(hex::decode(encoded)?),
            (None, None) => Err("either --text or --hex is required".into()),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(about = "Write an empty page at the given index")]
    Init {
        #[command(flatten)]
        target: PageArgs,

        #[arg(long, help = "Previous page in the chain")]
        prev: Option<u32>,

        #[arg(long, help = "Next page in the chain")]
        next: Option<u32>,
    },

    #[command(about = "Insert a record and print its RID")]
    Insert {
        #[command(flatten)]
        target: PageArgs,

        #[command(flatten)]
        data: RecordData,
    },

    #[command(about = "Print the record stored in a slot")]
    Get {
        #[command(flatten)]
        target: PageArgs,

        #[arg(long)]
        slot: u16,
    },

    #[command(about = "Delete the record stored in a slot")]
    Delete {
        #[command(flatten)]
        target: PageArgs,

        #[arg(long)]
        slot: u16,
    },

    #[command(about = "Print the page header and slot directory")]
    Dump {
        #[command(flatten)]
        target: PageArgs,
    },

    #[command(about = "Check the layout of every page in a file")]
    Verify {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Serialize)]
struct InitReport {
    page: u32,
    prev_page: Option<u32>,
    next_page: Option<u32>,
    available_space: usize,
}

#[derive(Debug, Serialize)]
struct InsertReport {
    page: u32,
    slot: u16,
    len: usize,
    available_space: usize,
}

#[derive(Debug, Serialize)]
struct RecordReport {
    page: u32,
    slot: u16,
    len: usize,
    hex: String,
    text: Option<String>,
}

#[derive(Debug, Serialize)]
struct DeleteReport {
    page: u32,
    slot: u16,
    slot_count: u16,
    available_space: usize,
}

#[derive(Debug, Serialize)]
struct VerifyFinding {
    page_index: usize,
    message: String,
}

#[derive(Debug, Serialize)]
struct VerifyReport {
    pages: usize,
    success: bool,
    findings: Vec<VerifyFinding>,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    install_tracing(&cli.log_level)?;
    let options = PageOptions::new().scrub_freed(cli.scrub);

    match cli.command {
        Command::Init { target, prev, next } => {
            let mut page = HeapPage::init_with(PageId(target.page), options);
            page.set_prev_page(prev.map(PageId));
            page.set_next_page(next.map(PageId));
            write_page(&target.file, target.page, &page)?;
            let report = InitReport {
                page: target.page,
                prev_page: prev,
                next_page: next,
                available_space: page.available_space(),
            };
            emit(&cli.format, &report, |_| print_init_text(&report))?;
        }
        Command::Insert { target, data } => {
            let mut page = read_page(&target.file, target.page, options)?;
            let bytes = data.to_bytes()?;
            let rid = page.insert_record(&bytes)?;
            write_page(&target.file, target.page, &page)?;
            let report = InsertReport {
                page: rid.page_no.0,
                slot: rid.slot_no,
                len: bytes.len(),
                available_space: page.available_space(),
            };
            emit(&cli.format, &report, |_| print_insert_text(&report))?;
        }
        Command::Get { target, slot } => {
            let page = read_page(&target.file, target.page, options)?;
            let mut out = Vec::new();
            let len = page.get_record(Rid::new(page.page_no(), slot), &mut out)?;
            let report = RecordReport {
                page: page.page_no().0,
                slot,
                len,
                hex: hex::encode(&out),
                text: String::from_utf8(out).ok(),
            };
            emit(&cli.format, &report, |_| print_record_text(&report))?;
        }
        Command::Delete { target, slot } => {
            let mut page = read_page(&target.file, target.page, options)?;
            page.delete_record(Rid::new(page.page_no(), slot))?;
            write_page(&target.file, target.page, &page)?;
            let report = DeleteReport {
                page: page.page_no().0,
                slot,
                slot_count: page.slot_count(),
                available_space: page.available_space(),
            };
            emit(&cli.format, &report, |_| print_delete_text(&report))?;
        }
        Command::Dump { target } => {
            let page = read_page(&target.file, target.page, options)?;
            let dump = page.dump();
            emit(&cli.format, &dump, |_| print_dump_text(&dump))?;
        }
        Command::Verify { file } => {
            let report = verify_file(&file)?;
            emit(&cli.format, &report, |_| print_verify_text(&report))?;
            if !report.success {
                std::process::exit(2);
            }
        }
    }
    Ok(())
}

fn install_tracing(filter: &str) -> Result<(), Box<dyn Error>> {
    let filter = EnvFilter::try_new(filter)?;
    if let Err(err) = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init()
    {
        return Err(format!("failed to install logging: {err}").into());
    }
    Ok(())
}

fn read_page(path: &Path, index: u32, options: PageOptions) -> Result<HeapPage, Box<dyn Error>> {
    let mut file = fs::File::open(path)?;
    file.seek(SeekFrom::Start(index as u64 * MAX_SPACE as u64))?;
    let mut buf = vec![0u8; MAX_SPACE];
    file.read_exact(&mut buf)?;
    debug!(file = %path.display(), page = index, "hfpage.page.read");
    Ok(HeapPage::from_bytes_with(&buf, options)?)
}

fn write_page(path: &Path, index: u32, page: &HeapPage) -> Result<(), Box<dyn Error>> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?;
    file.seek(SeekFrom::Start(index as u64 * MAX_SPACE as u64))?;
    file.write_all(page.as_bytes())?;
    file.sync_data()?;
    info!(
        file = %path.display(),
        page = index,
        slot_count = page.slot_count(),
        free_space = page.free_space(),
        "hfpage.page.write"
    );
    Ok(())
}

fn verify_file(path: &Path) -> Result<VerifyReport, Box<dyn Error>> {
    let bytes = fs::read(path)?;
    let mut findings = Vec::new();
    if bytes.len() % MAX_SPACE != 0 {
        findings.push(VerifyFinding {
            page_index: bytes.len() / MAX_SPACE,
            message: format!(
                "trailing {} bytes do not form a whole page",
                bytes.len() % MAX_SPACE
            ),
        });
    }
    let mut pages = 0;
    for (page_index, image) in bytes.chunks_exact(MAX_SPACE).enumerate() {
        pages += 1;
        if let Err(err) = HeapPage::from_bytes(image) {
            findings.push(VerifyFinding {
                page_index,
                message: err.to_string(),
            });
        }
    }
    Ok(VerifyReport {
        pages,
        success: findings.is_empty(),
        findings,
    })
}

fn emit<T, F>(format: &OutputFormat, value: &T, printer: F) -> Result<(), Box<dyn Error>>
where
    T: Serialize,
    F: Fn(OutputFormat),
{
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)?;
            println!("{json}");
        }
        OutputFormat::Text => printer(OutputFormat::Text),
    }
    Ok(())
}

fn link(page: Option<u32>) -> String {
    page.map(|p| p.to_string()).unwrap_or_else(|| "-".into())
}

fn print_init_text(report: &InitReport) {
    println!(
        "Initialised page {} (prev={} next={}) available_space={}",
        report.page,
        link(report.prev_page),
        link(report.next_page),
        report.available_space
    );
}

fn print_insert_text(report: &InsertReport) {
    println!(
        "Inserted {} bytes as RID ({}, {}) available_space={}",
        report.len, report.page, report.slot, report.available_space
    );
}

fn print_record_text(report: &RecordReport) {
    match &report.text {
        Some(text) => println!(
            "RID ({}, {}) length={} text={:?}",
            report.page, report.slot, report.len, text
        ),
        None => println!(
            "RID ({}, {}) length={} hex={}",
            report.page, report.slot, report.len, report.hex
        ),
    }
}

fn print_delete_text(report: &DeleteReport) {
    println!(
        "Deleted RID ({}, {}) slot_count={} available_space={}",
        report.page, report.slot, report.slot_count, report.available_space
    );
}

fn print_dump_text(dump: &PageDump) {
    print!("{dump}");
}

fn print_verify_text(report: &VerifyReport) {
    println!("Verify => success={} pages={}", report.success, report.pages);
    for finding in &report.findings {
        println!("- page {}: {}", finding.page_index, finding.message);
    }
}
