use anyhow::Result;
use console::style;
use dialoguer::Confirm;

/// Asks before source files are rewritten. Skipped with `--no-confirm`.
pub fn confirm_archiving(source_root: &str, no_confirm: bool) -> Result<bool> {
    if no_confirm {
        return Ok(true);
    }

    let confirmed = Confirm::new()
        .with_prompt(format!(
            "Archive commented-out code under {}? Matching source files will be rewritten",
            style(source_root).cyan()
        ))
        .default(false)
        .interact()?;

    if !confirmed {
        println!("Aborted by user.");
    }

    Ok(confirmed)
}
