use std::io::IsTerminal;
use std::time::{Duration, Instant};

use anstyle::{AnsiColor, Effects, Style};
use debsetup_installer::{InstallOutcome, InstallReporter, InstallStep, ServiceState};
use indicatif::{ProgressBar, ProgressStyle};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum OutputStyle {
    Plain,
    Rich,
}

pub(crate) fn resolve_output_style(
    stdout_is_tty: bool,
    no_color: bool,
    force_plain: bool,
) -> OutputStyle {
    if force_plain || no_color || !stdout_is_tty {
        OutputStyle::Plain
    } else {
        OutputStyle::Rich
    }
}

pub(crate) fn current_output_style(force_plain: bool) -> OutputStyle {
    let no_color = std::env::var_os("NO_COLOR").is_some_and(|value| !value.is_empty());
    resolve_output_style(std::io::stdout().is_terminal(), no_color, force_plain)
}

fn status_badge(status: &str) -> &'static str {
    match status {
        "ok" => "[OK]",
        "warn" => "[WARN]",
        "error" => "[ERR]",
        _ => "[..]",
    }
}

fn plain_prefix(status: &str) -> &'static str {
    match status {
        "warn" => "warning: ",
        "error" => "error: ",
        _ => "",
    }
}

fn badge_style(status: &str) -> Style {
    let color = match status {
        "ok" => AnsiColor::BrightGreen,
        "warn" => AnsiColor::BrightYellow,
        "error" => AnsiColor::BrightRed,
        _ => AnsiColor::BrightCyan,
    };
    Style::new()
        .fg_color(Some(color.into()))
        .effects(Effects::BOLD)
}

fn colorize(style: Style, text: &str) -> String {
    format!("{}{}{}", style.render(), text, style.render_reset())
}

/// Uncolored status line; rich output adds an ASCII badge.
pub(crate) fn render_status_line(style: OutputStyle, status: &str, message: &str) -> String {
    match style {
        OutputStyle::Plain => format!("{}{message}", plain_prefix(status)),
        OutputStyle::Rich => format!("{} {message}", status_badge(status)),
    }
}

fn paint_status_line(style: OutputStyle, status: &str, message: &str) -> String {
    match style {
        OutputStyle::Plain => render_status_line(style, status, message),
        OutputStyle::Rich => format!(
            "{} {message}",
            colorize(badge_style(status), status_badge(status))
        ),
    }
}

pub(crate) fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let millis = elapsed.subsec_millis();
    format!("{secs}.{millis:03}s")
}

fn step_uses_spinner(step: InstallStep) -> bool {
    matches!(
        step,
        InstallStep::Download
            | InstallStep::Install
            | InstallStep::ServiceConfig
            | InstallStep::ServiceStart
    )
}

fn spinner_tick_chars(step: InstallStep) -> &'static str {
    match step {
        InstallStep::Download => "<^>v ",
        InstallStep::Install => ".oO@* ",
        _ => "|/-\\ ",
    }
}

pub(crate) struct TerminalReporter {
    style: OutputStyle,
    spinner: Option<ProgressBar>,
    started_at: Instant,
}

impl TerminalReporter {
    pub(crate) fn new(style: OutputStyle) -> Self {
        Self {
            style,
            spinner: None,
            started_at: Instant::now(),
        }
    }

    pub(crate) fn print_status(&self, status: &str, message: &str) {
        let line = paint_status_line(self.style, status, message);
        match &self.spinner {
            Some(spinner) => spinner.suspend(|| println!("{line}")),
            None => println!("{line}"),
        }
    }

    pub(crate) fn print_error(&mut self, message: &str) {
        self.clear_spinner();
        println!("{}", paint_status_line(self.style, "error", message));
    }

    pub(crate) fn print_outcome(&mut self, outcome: &InstallOutcome) {
        self.clear_spinner();
        for (status, line) in format_outcome_lines(outcome) {
            self.print_status(status, &line);
        }
        if self.style == OutputStyle::Rich {
            self.print_status(
                "ok",
                &format!("complete in {}", format_elapsed(self.started_at.elapsed())),
            );
        }
    }

    fn start_spinner(&mut self, step: InstallStep, message: &str) {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan.bold} {msg} {elapsed}") {
            spinner.set_style(style.tick_chars(spinner_tick_chars(step)));
        }
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(80));
        self.spinner = Some(spinner);
    }

    fn clear_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }
}

impl InstallReporter for TerminalReporter {
    fn step_started(&mut self, step: InstallStep, message: &str) {
        self.clear_spinner();
        if self.style == OutputStyle::Rich && step_uses_spinner(step) {
            self.start_spinner(step, message);
        } else {
            self.print_status("step", message);
        }
    }

    fn step_finished(&mut self, _step: InstallStep, message: &str) {
        self.clear_spinner();
        self.print_status("ok", message);
    }

    fn warn(&mut self, message: &str) {
        self.print_status("warn", message);
    }
}

pub(crate) fn format_outcome_lines(outcome: &InstallOutcome) -> Vec<(&'static str, String)> {
    let mut lines = vec![(
        "ok",
        format!("installed {} from {}", outcome.package_name, outcome.archive_url),
    )];
    if let Some(sha256) = &outcome.archive_sha256 {
        lines.push(("ok", format!("archive sha256: {sha256}")));
    }
    for entry in &outcome.desktop_entries {
        lines.push(("ok", format!("desktop entry: {}", entry.display())));
    }
    let service = match outcome.service {
        ServiceState::Missing => ("warn", "service: not installed".to_string()),
        ServiceState::EnabledNotRegistered => {
            ("warn", "service: enabled, not registered".to_string())
        }
        ServiceState::Started => ("ok", "service: started".to_string()),
    };
    lines.push(service);
    lines
}
