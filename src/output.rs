//! User-facing console output.
//! Colored prefixes when stdout is a TTY, plain text otherwise, so summaries
//! stay script-friendly when piped.

use owo_colors::OwoColorize;

use crate::report::TransferReport;

fn is_tty() -> bool {
    atty::is(atty::Stream::Stdout)
}

pub fn print_info(msg: &str) {
    if is_tty() {
        println!("{} {}", "info:".cyan().bold(), msg);
    } else {
        println!("info: {}", msg);
    }
}

pub fn print_warn(msg: &str) {
    if is_tty() {
        eprintln!("{} {}", "warn:".yellow().bold(), msg);
    } else {
        eprintln!("warn: {}", msg);
    }
}

pub fn print_error(msg: &str) {
    if is_tty() {
        eprintln!("{} {}", "error:".red().bold(), msg);
    } else {
        eprintln!("error: {}", msg);
    }
}

pub fn print_success(msg: &str) {
    if is_tty() {
        println!("{} {}", "ok:".green().bold(), msg);
    } else {
        println!("ok: {}", msg);
    }
}

/// One-line counts, e.g. `3 attempted, 2 succeeded, 1 skipped, 0 failed, 0 cancelled`.
pub fn summary_line(report: &TransferReport) -> String {
    format!(
        "{} attempted, {} succeeded, {} skipped, {} failed, {} cancelled",
        report.attempted(),
        report.succeeded(),
        report.skipped(),
        report.failed(),
        report.cancelled()
    )
}

/// Print the counts followed by one line per failed item.
pub fn print_report(report: &TransferReport) {
    let line = summary_line(report);
    if report.is_success() {
        print_success(&line);
    } else {
        print_error(&line);
    }
    for outcome in report.failures() {
        let reason = outcome
            .error
            .as_ref()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "failed".into());
        print_error(&format!("{}: {}", outcome.candidate.relative_path, reason));
    }
}
