//! SVG renderer.
//!
//! Produces a single self-contained SVG document: a rounded window with a
//! title bar and traffic-light buttons, and the cell grid as coalesced text
//! spans. Runs of default-styled whitespace produce no markup at all, which
//! keeps real-world screens (mostly empty) small.

use crate::terminal::{Cell, CellStyle, Color};
use crate::theme::Theme;

/// Cell box in SVG user units.
const CELL_WIDTH: f64 = 8.4;
const CELL_HEIGHT: f64 = 17.0;
const FONT_SIZE: f64 = 14.0;
/// Baseline offset from the cell top.
const BASELINE: f64 = 13.0;

const PADDING: f64 = 10.0;
const TITLE_BAR: f64 = 28.0;
const CORNER_RADIUS: f64 = 8.0;

const BUTTON_COLORS: [&str; 3] = ["#ff5f57", "#febc2e", "#28c840"];

/// Escape text for XML content and attribute values.
fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\'' => out.push_str("&apos;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Natural pixel dimensions of the rendered document.
pub fn svg_size(cols: usize, rows: usize) -> (f64, f64) {
    (
        cols as f64 * CELL_WIDTH + PADDING * 2.0,
        rows as f64 * CELL_HEIGHT + TITLE_BAR + PADDING * 2.0,
    )
}

/// Render a grid to a full-size SVG document.
pub fn render_svg(rows: &[Vec<Cell>], cols: usize, theme: &Theme, title: Option<&str>) -> String {
    let (width, height) = svg_size(cols, rows.len());
    render_document(rows, cols, theme, title, width, height)
}

/// Render a thumbnail scaled to explicit output pixel dimensions.
///
/// The grid keeps its natural coordinate system; the viewBox maps it onto
/// the requested output size.
pub fn render_thumbnail(
    rows: &[Vec<Cell>],
    cols: usize,
    theme: &Theme,
    out_width: u32,
    out_height: u32,
) -> String {
    render_document(rows, cols, theme, None, out_width as f64, out_height as f64)
}

fn render_document(
    rows: &[Vec<Cell>],
    cols: usize,
    theme: &Theme,
    title: Option<&str>,
    out_width: f64,
    out_height: f64,
) -> String {
    let (natural_width, natural_height) = svg_size(cols, rows.len());
    let mut svg = String::new();

    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{}\" height=\"{}\" \
         viewBox=\"0 0 {} {}\" font-family=\"Consolas, Menlo, monospace\" \
         font-size=\"{}\" xml:space=\"preserve\">\n",
        out_width, out_height, natural_width, natural_height, FONT_SIZE
    ));

    // Window chrome.
    svg.push_str(&format!(
        "  <rect width=\"{}\" height=\"{}\" rx=\"{}\" fill=\"{}\"/>\n",
        natural_width,
        natural_height,
        CORNER_RADIUS,
        theme.background.hex()
    ));
    for (i, color) in BUTTON_COLORS.iter().enumerate() {
        svg.push_str(&format!(
            "  <circle cx=\"{}\" cy=\"{}\" r=\"5.5\" fill=\"{}\"/>\n",
            PADDING + 8.0 + i as f64 * 20.0,
            TITLE_BAR / 2.0,
            color
        ));
    }
    if let Some(title) = title {
        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" fill=\"{}\" text-anchor=\"middle\">{}</text>\n",
            natural_width / 2.0,
            TITLE_BAR / 2.0 + FONT_SIZE / 3.0,
            theme.foreground.hex(),
            xml_escape(title)
        ));
    }

    // Cell grid.
    let origin_y = TITLE_BAR + PADDING;
    for (row_idx, row) in rows.iter().enumerate() {
        let top = origin_y + row_idx as f64 * CELL_HEIGHT;
        for (start, text, style) in coalesce(row, cols) {
            let x = PADDING + start as f64 * CELL_WIDTH;

            let bg = theme.resolve(style.bg, false);
            if style.bg != Color::Default && bg != theme.background {
                svg.push_str(&format!(
                    "  <rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"{}\"/>\n",
                    x,
                    top,
                    text.chars().count() as f64 * CELL_WIDTH,
                    CELL_HEIGHT,
                    bg.hex()
                ));
            }

            if text.trim().is_empty() && !style.underline && !style.strikethrough {
                // A colored background needs no invisible text on top.
                continue;
            }

            let mut attrs = format!(" fill=\"{}\"", theme.resolve(style.fg, true).hex());
            if style.bold {
                attrs.push_str(" font-weight=\"bold\"");
            }
            if style.italic {
                attrs.push_str(" font-style=\"italic\"");
            }
            match (style.underline, style.strikethrough) {
                (true, true) => attrs.push_str(" text-decoration=\"underline line-through\""),
                (true, false) => attrs.push_str(" text-decoration=\"underline\""),
                (false, true) => attrs.push_str(" text-decoration=\"line-through\""),
                (false, false) => {}
            }

            svg.push_str(&format!(
                "  <text x=\"{}\" y=\"{}\"{}>{}</text>\n",
                x,
                top + BASELINE,
                attrs,
                xml_escape(&text)
            ));
        }
    }

    svg.push_str("</svg>\n");
    svg
}

/// Split a row into runs of identically-styled cells, dropping runs of
/// default-styled whitespace.
fn coalesce(row: &[Cell], cols: usize) -> Vec<(usize, String, CellStyle)> {
    let mut runs = Vec::new();
    let mut start = 0usize;
    let mut text = String::new();
    let mut style = CellStyle::default();

    let flush = |runs: &mut Vec<(usize, String, CellStyle)>,
                 start: usize,
                 text: &str,
                 style: CellStyle| {
        if text.is_empty() {
            return;
        }
        if style.is_default() && text.trim().is_empty() {
            return;
        }
        runs.push((start, text.to_string(), style));
    };

    for (i, cell) in row.iter().enumerate().take(cols) {
        if text.is_empty() || cell.style != style {
            flush(&mut runs, start, &text, style);
            start = i;
            text = String::new();
            style = cell.style;
        }
        text.push(cell.glyph);
    }
    flush(&mut runs, start, &text, style);
    runs
}
