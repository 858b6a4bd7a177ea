use anyhow::Result;
use thinkspace_core::AppConfig;

/// Prints the store location without opening or creating it.
pub fn run(config: &AppConfig) -> Result<()> {
    println!("{}", config.db_path().display());
    Ok(())
}
