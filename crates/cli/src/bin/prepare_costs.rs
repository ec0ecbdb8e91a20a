use anyhow::{Context, Result};
use clap::Parser;
use ebay_orders::{ColumnSelection, LoadOptions};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "prepare-costs",
    about = "Load an eBay order export and write a cost sheet to fill in item and shipping material costs."
)]
struct Args {
    /// Order export (.csv or .xlsx)
    #[arg(short, long)]
    input: PathBuf,

    /// Cost sheet to write; defaults to <input>_costs.xlsx next to the input
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Columns to show instead of the default preview set, comma separated
    #[arg(long, value_delimiter = ',')]
    columns: Vec<String>,

    /// Settings JSON; falls back to ./settings.json, then built-in defaults
    #[arg(long)]
    settings: Option<PathBuf>,
}

fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("orders");
    input.with_file_name(format!("{}_costs.xlsx", stem))
}

fn main() -> Result<()> {
    logger::init();
    let args = Args::parse();

    let settings = settings_loader::load_settings_with_fallback(args.settings.as_ref())?;
    let options = LoadOptions::from_settings(&settings);

    println!("📖 Reading {}", args.input.display());
    let table = ebay_orders::load_table_from_path(&args.input, &options)
        .with_context(|| format!("Cannot load {}", args.input.display()))?;
    println!("  ✓ Found {} orders across {} columns", table.len(), table.columns.len());

    let selection = if args.columns.is_empty() {
        ColumnSelection::Default(settings.preview_columns.clone())
    } else {
        ColumnSelection::Explicit(
            args.columns
                .iter()
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect(),
        )
    };
    let preview = ebay_orders::build_preview(&table, &selection)
        .context("Pick at least one existing column with --columns")?;

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&args.input));
    ebay_orders::write_cost_sheet(&preview, &output)?;

    println!("\n✅ Cost sheet written to: {}", output.display());
    println!(
        "   Fill in '{}' and '{}', keep the '{}' column and row order, then run:",
        models::COL_ITEM_COST,
        models::COL_SHIPPING_MATERIAL_COST,
        models::COL_ROW
    );
    println!(
        "   profit-summary --input {} --costs {}",
        args.input.display(),
        output.display()
    );
    Ok(())
}
