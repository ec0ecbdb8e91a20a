use anyhow::{Context, Result};
use clap::Parser;
use ebay_orders::{FileFormat, LoadOptions};
use std::{fs, path::PathBuf};
use tracing::warn;

#[derive(Parser, Debug)]
#[command(
    name = "profit-summary",
    about = "Merge a filled-in cost sheet into an eBay order export and write the profit reports."
)]
struct Args {
    /// Order export the cost sheet was prepared from (.csv or .xlsx)
    #[arg(short, long)]
    input: PathBuf,

    /// Filled-in cost sheet (.xlsx or .csv)
    #[arg(short, long)]
    costs: PathBuf,

    /// Directory for the generated reports
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,

    /// Settings JSON; falls back to ./settings.json, then built-in defaults
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Skip the spreadsheet export
    #[arg(long)]
    no_xlsx: bool,

    /// Skip the PDF summary
    #[arg(long)]
    no_pdf: bool,

    /// Also write the summary as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    logger::init();
    let args = Args::parse();

    let settings = settings_loader::load_settings_with_fallback(args.settings.as_ref())?;
    let options = LoadOptions::from_settings(&settings);

    println!("📖 Reading {}", args.input.display());
    let table = ebay_orders::load_table_from_path(&args.input, &options)
        .with_context(|| format!("Cannot load {}", args.input.display()))?;

    println!("📖 Reading costs from {}", args.costs.display());
    let format = FileFormat::from_path(&args.costs)?;
    let bytes =
        fs::read(&args.costs).with_context(|| format!("Cannot open {}", args.costs.display()))?;
    let edited = ebay_orders::read_cost_sheet(&bytes, format)
        .with_context(|| format!("Cannot read cost sheet {}", args.costs.display()))?;

    profit_report::check_alignment(&table, &edited).context(
        "Cost sheet no longer matches the export; regenerate it with prepare-costs",
    )?;

    let report = profit_report::compute_summary(&table, &edited);
    if report.summary.date_range.is_none() {
        warn!("no readable order creation dates; using placeholder label");
    }

    let document = report.document(&settings);
    println!("\n📊 {}", document);

    fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("Cannot create {}", args.out_dir.display()))?;

    if !args.no_xlsx {
        let path = args.out_dir.join(report.orders_filename(&settings));
        profit_report::write_orders_xlsx(&report.merged, &path)?;
        println!("✓ Spreadsheet: {}", path.display());
    }

    if !args.no_pdf {
        let path = args.out_dir.join(report.summary_filename(&settings));
        profit_report::write_summary_pdf(&document, &path)?;
        println!("✓ PDF summary: {}", path.display());
    }

    if args.json {
        let path = args.out_dir.join(report.summary_json_filename(&settings));
        profit_report::write_summary_json(&report, &settings, &path)?;
        println!("✓ JSON summary: {}", path.display());
    }

    Ok(())
}
