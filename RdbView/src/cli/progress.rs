//! Terminal output for `rdbview extract`

use std::time::Duration;

use console::{Emoji, style};
use indicatif::{HumanDuration, ProgressBar, ProgressStyle};

/// Step marker while the archive is indexed
pub static READING: Emoji<'_, '_> = Emoji("🔍 ", "");
/// Step marker while entries are written out
pub static WRITING: Emoji<'_, '_> = Emoji("📦 ", "");
pub static SPARKLE: Emoji<'_, '_> = Emoji("✨ ", "");
pub static STOP: Emoji<'_, '_> = Emoji("🛑 ", "");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "x ");

/// Print one of the export steps, e.g. `[2/2] 📦 Extracting 40 entries to out/`.
pub fn print_step(current: usize, total: usize, emoji: Emoji<'_, '_>, msg: &str) {
    println!(
        "{} {emoji}{msg}",
        style(format!("[{current}/{total}]")).bold().dim()
    );
}

/// Print the summary of a successful export, e.g. `✨ Exported 40 entries in 2s`.
pub fn print_exported(entries: usize, elapsed: Duration) {
    let noun = if entries == 1 { "entry" } else { "entries" };
    println!(
        "{SPARKLE}Exported {} {noun} in {}",
        style(entries).bold(),
        HumanDuration(elapsed)
    );
}

/// `Extracting [████████░░░░░░░░] 20/40 (3s)`
///
/// # Panics
/// Panics if the template string is invalid (this is a compile-time constant).
#[must_use]
pub fn export_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("Extracting [{bar:40.cyan/blue}] {pos}/{len} ({elapsed})")
        .expect("valid template")
        .progress_chars("█▓░")
}

/// Bar fed from `JobDispatcher::current_progress` while an export runs.
#[must_use]
pub fn export_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(export_style());
    pb
}
