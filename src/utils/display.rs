//! Terminal display utilities for CLI output.
//!
//! Renders papers and per-source health as `comfy-table` tables sized to the
//! terminal, with Unicode-aware truncation.

use comfy_table::{presets, Attribute, Cell, Color, Table};
use std::io::{self, IsTerminal};
use std::sync::OnceLock;
use terminal_size::terminal_size;
use unicode_width::UnicodeWidthChar;

use crate::models::{Paper, ResultEnvelope, SourceHealth, SourceStatus};

/// Terminal information with cached size and capabilities.
#[derive(Debug, Clone)]
pub struct Terminal {
    width: usize,
    is_tty: bool,
}

static TERMINAL_INFO: OnceLock<Terminal> = OnceLock::new();

/// Get the global terminal information, initialized on first call.
pub fn terminal_info() -> &'static Terminal {
    TERMINAL_INFO.get_or_init(|| {
        let width = terminal_size()
            .map(|(w, _)| w.0 as usize)
            .unwrap_or(DEFAULT_WIDTH);

        Terminal {
            width,
            is_tty: io::stdout().is_terminal(),
        }
    })
}

/// Default width when terminal size cannot be determined.
pub const DEFAULT_WIDTH: usize = 100;

/// Get the current terminal width in characters.
#[inline]
pub fn terminal_width() -> usize {
    terminal_info().width
}

/// Check if stdout is a terminal.
#[inline]
pub fn is_terminal() -> bool {
    terminal_info().is_tty
}

fn char_width(c: char) -> usize {
    UnicodeWidthChar::width(c).unwrap_or(1)
}

/// Truncate text to fit within the specified display width.
///
/// Wide characters count double. An ellipsis is appended when anything was
/// cut.
///
/// ```
/// use paper_fanout::utils::truncate_with_ellipsis;
///
/// assert_eq!(truncate_with_ellipsis("Hello World", 8), "Hello...");
/// assert_eq!(truncate_with_ellipsis("Hi", 8), "Hi");
/// ```
pub fn truncate_with_ellipsis(text: &str, max_width: usize) -> String {
    if max_width == 0 {
        return String::new();
    }

    let total_width: usize = text.chars().map(char_width).sum();
    if total_width <= max_width {
        return text.to_string();
    }

    let budget = max_width.saturating_sub(3);
    let mut used = 0;
    let truncated: String = text
        .chars()
        .take_while(|c| {
            used += char_width(*c);
            used <= budget
        })
        .collect();

    format!("{}...", truncated)
}

/// Truncate text, preferring to cut at the last word boundary that fits.
pub fn truncate_at_word(text: &str, max_width: usize) -> String {
    let cut = truncate_with_ellipsis(text, max_width);
    let Some(kept) = cut.strip_suffix("...").filter(|_| cut != text) else {
        return cut;
    };

    if text[kept.len()..].starts_with(char::is_whitespace) {
        return format!("{}...", kept.trim_end());
    }

    match kept.rfind(' ') {
        Some(space) if space > 0 => format!("{}...", kept[..space].trim_end()),
        _ => cut,
    }
}

/// Column width configuration for table display.
#[derive(Debug, Clone, Copy)]
pub struct ColumnConfig {
    pub min_width: usize,
    pub max_width: usize,
    pub weight: usize,
}

impl ColumnConfig {
    /// Create a new column config with minimum width.
    pub fn new(min_width: usize) -> Self {
        ColumnConfig {
            min_width,
            max_width: usize::MAX,
            weight: 1,
        }
    }

    /// Set the maximum width.
    pub fn max(mut self, max_width: usize) -> Self {
        self.max_width = max_width;
        self
    }

    /// Set the weight for space distribution.
    pub fn weight(mut self, weight: usize) -> Self {
        self.weight = weight;
        self
    }
}

/// Share `terminal_width` between columns.
///
/// Every column gets its minimum; what is left goes out by weight, capped at
/// each column's maximum.
pub fn calculate_column_widths(terminal_width: usize, configs: &[ColumnConfig]) -> Vec<usize> {
    let mut widths: Vec<usize> = configs.iter().map(|c| c.min_width).collect();

    // one separator column between cells
    let available = terminal_width.saturating_sub(configs.len().saturating_sub(1));
    let min_sum: usize = widths.iter().sum();
    let total_weight: usize = configs.iter().map(|c| c.weight).sum();
    if min_sum >= available || total_weight == 0 {
        return widths;
    }

    let extra = available - min_sum;
    for (width, config) in widths.iter_mut().zip(configs) {
        let share = extra * config.weight / total_weight;
        *width = (*width + share).min(config.max_width);
    }

    widths
}

/// Column widths for the paper table: (title, authors, venue)
pub fn paper_table_columns(terminal_width: usize) -> (usize, usize, usize) {
    // year, citations and source are narrow and fixed
    let fixed = 4 + 9 + 16 + 3 * 4;
    let configs = [
        ColumnConfig::new(24).max(90).weight(3),
        ColumnConfig::new(16).max(40).weight(1),
        ColumnConfig::new(10).max(30).weight(1),
    ];

    let widths = calculate_column_widths(terminal_width.saturating_sub(fixed), &configs);
    (widths[0], widths[1], widths[2])
}

/// Render papers as a table sized for `width` columns
pub fn papers_table(papers: &[Paper], width: usize) -> Table {
    let (title_width, authors_width, venue_width) = paper_table_columns(width);

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL);
    table.set_header(vec!["Title", "Authors", "Year", "Citations", "Venue", "Source"]);

    for paper in papers {
        let year = paper.year.map(|y| y.to_string()).unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            Cell::new(truncate_at_word(&paper.title, title_width)).add_attribute(Attribute::Bold),
            Cell::new(truncate_with_ellipsis(&paper.authors_display(), authors_width)),
            Cell::new(year),
            Cell::new(paper.citation_count),
            Cell::new(truncate_with_ellipsis(&paper.venue, venue_width)),
            Cell::new(paper.source.name()),
        ]);
    }

    table
}

/// Render per-source health as a table
pub fn health_table(health: &SourceHealth) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL);
    table.set_header(vec!["Source", "Status"]);

    for (source, status) in health.iter() {
        let color = match status {
            SourceStatus::Ok => Color::Green,
            SourceStatus::Unconfigured => Color::Yellow,
            SourceStatus::Failed => Color::Red,
        };
        table.add_row(vec![Cell::new(source.name()), Cell::new(status).fg(color)]);
    }

    table
}

/// Render an envelope: the page of papers, a paging line and source health
pub fn render_envelope(envelope: &ResultEnvelope, width: usize) -> String {
    let mut out = String::new();

    if envelope.papers.is_empty() {
        out.push_str("No papers found.\n");
    } else {
        out.push_str(&papers_table(&envelope.papers, width).to_string());
        out.push('\n');
    }

    out.push_str(&format!(
        "Page {} of {} ({} results)\n",
        envelope.current_page, envelope.total_pages, envelope.total_results
    ));
    out.push_str(&health_table(&envelope.source_status).to_string());
    out.push('\n');
    out
}
