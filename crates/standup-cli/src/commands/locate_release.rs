//! Locate release command - show which release a diff adds

use console::style;
use std::io::Read;
use std::path::Path;

use standup_core::locate_release_in_diff;

use crate::error::Result;

/// Run the locate-release command; `-` reads the diff from stdin
pub fn run(diff_file: &Path) -> Result<()> {
    let diff = if diff_file == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(diff_file)?
    };

    let found = locate_release_in_diff(&diff)?;

    println!("{} {}", style("Path:").bold(), found.path);
    println!("{} {}", style("Provider:").bold(), style(&found.provider).cyan());
    println!("{} {}", style("Release:").bold(), style(&found.release_dir).yellow());
    Ok(())
}
