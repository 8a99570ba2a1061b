use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tilestitch_core::coords::CoordinateCache;

#[derive(Args)]
pub struct NormalizeArgs {
    /// Acquisition folder (holds `0/coordinates.csv`)
    #[arg(short, long)]
    pub input_folder: PathBuf,

    /// Number of canonical rows to print
    #[arg(long, default_value = "5")]
    pub rows: usize,
}

pub fn run(args: &NormalizeArgs) -> Result<()> {
    let cache = CoordinateCache::user_default()?;
    let processed = cache
        .process_coordinates(&args.input_folder)
        .with_context(|| format!("Failed to normalize {}", args.input_folder.display()))?;
    let table = &processed.table;

    println!("Processed coordinates saved to {}", processed.path.display());
    println!();
    println!(
        "{:<10} {:>6} {:>8} {:>12} {:>12} {:>12}",
        "region", "fov", "z_level", "x (mm)", "y (mm)", "z (um)"
    );
    for record in table.records.iter().take(args.rows) {
        println!(
            "{:<10} {:>6} {:>8} {:>12.4} {:>12.4} {:>12.4}",
            record.region, record.fov, record.z_level, record.x_mm, record.y_mm, record.z_um
        );
    }
    println!();
    println!(
        "{} rows, {} regions, {} unique FOVs (grid columns: {})",
        table.len(),
        table.regions().len(),
        table.unique_fovs(),
        table.grid_columns
    );
    Ok(())
}
