use crate::ui::Icons;
use owo_colors::{OwoColorize, Style};
use std::sync::OnceLock;

static QUIET: OnceLock<bool> = OnceLock::new();
static COLORS: OnceLock<bool> = OnceLock::new();

/// `STOCKROOM_QUIET=1` silences the human-mode chatter (tables still print)
pub fn is_quiet() -> bool {
    *QUIET.get_or_init(|| {
        std::env::var("STOCKROOM_QUIET")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    })
}

fn colors_enabled() -> bool {
    *COLORS.get_or_init(|| std::env::var_os("NO_COLOR").is_none() && console::colors_enabled())
}

/// What a piece of terminal text is for; each tone maps to one style
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Header,
    Success,
    Error,
    Warn,
    Accent,
    Dim,
}

impl Tone {
    fn style(self) -> Style {
        match self {
            Tone::Header => Style::new().cyan().bold(),
            Tone::Success => Style::new().green().bold(),
            Tone::Error => Style::new().red().bold(),
            Tone::Warn => Style::new().yellow().bold(),
            Tone::Accent => Style::new().magenta(),
            Tone::Dim => Style::new().white().dimmed(),
        }
    }
}

/// Style `text` for the terminal, or return it unchanged when colours are off
pub fn paint(text: &str, tone: Tone) -> String {
    if colors_enabled() {
        text.style(tone.style()).to_string()
    } else {
        text.to_string()
    }
}

pub fn header(text: &str) {
    if is_quiet() {
        return;
    }
    println!("{} {}", Icons::BOX, paint(text, Tone::Header));
}

pub fn success(label: &str) {
    if is_quiet() {
        return;
    }
    println!("{} {}", Icons::CHECK, paint(label, Tone::Success));
}

pub fn error(label: &str) {
    eprintln!("{} {}", Icons::CROSS, paint(label, Tone::Error));
}

pub fn warn(label: &str) {
    eprintln!("{} {}", Icons::WARN, paint(label, Tone::Warn));
}

pub fn info(label: &str, value: &str) {
    if is_quiet() {
        return;
    }
    println!("{} {}: {}", paint(Icons::INFO, Tone::Accent), paint(label, Tone::Dim), value);
}

pub fn section(title: &str) {
    if is_quiet() {
        return;
    }
    println!();
    println!("━{}━", paint(title, Tone::Header));
}

pub fn summary_row(label: &str, value: &str) {
    if is_quiet() {
        return;
    }
    println!("  {} {}", paint(label, Tone::Dim), value);
}
