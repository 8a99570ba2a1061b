use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use super::args::ParameterArgs;

#[derive(Args)]
pub struct ParamsArgs {
    #[command(flatten)]
    pub params: ParameterArgs,

    /// Write the document here (TOML for `.toml`, JSON otherwise) instead of printing it
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print TOML instead of JSON
    #[arg(long)]
    pub toml: bool,
}

pub fn run(args: &ParamsArgs) -> Result<()> {
    let params = args.params.to_parameters()?;

    match &args.output {
        Some(path) => {
            params
                .write_document(path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Parameters written to {}", path.display());
        }
        None if args.toml => print!("{}", params.to_toml_string()?),
        None => println!("{}", params.to_json_string()?),
    }
    Ok(())
}
