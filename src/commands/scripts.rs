//! Scripts command implementation

use anyhow::Result;
use marker_scripts::scripts::available_scripts;

pub fn run() -> Result<()> {
    println!("Available scripts:");
    for name in available_scripts() {
        println!("  {}", name);
    }
    Ok(())
}
