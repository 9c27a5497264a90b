//! Template rendering of a `TableModel` for the terminal using outstanding

use console::{measure_text_width, pad_str, Alignment, Style};
use outstanding::Theme;
use serde::Serialize;
use tableonelib::{HeaderCell, HeaderKind, TableModel};

/// Include template at compile time
pub const TABLE_TEMPLATE: &str = include_str!("../templates/table.jinja");

/// Space between columns
const GAP: &str = "  ";

/// Indentation of statistic rows under their variable
const INDENT: &str = "  ";

/// One pre-formatted line of the table body
#[derive(Debug, Serialize)]
struct TemplateRow {
    text: String,
    /// Variable label row
    is_label: bool,
    /// Caption of a row group that is not itself a row
    is_group: bool,
}

/// Data context for the table template
#[derive(Debug, Serialize)]
pub struct TableContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    caption: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    footnote: Option<String>,
    /// Spanning column captions, pre-padded
    #[serde(skip_serializing_if = "Option::is_none")]
    groups: Option<String>,
    header: String,
    /// "(N=..)" line under the header
    #[serde(skip_serializing_if = "Option::is_none")]
    counts: Option<String>,
    separator: String,
    rows: Vec<TemplateRow>,
}

/// Create the theme with styles
pub fn create_theme() -> Theme {
    Theme::new()
        .add("caption", Style::new().bold())
        .add("header", Style::new().bold())
        .add("group", Style::new().bold().underlined())
        .add("variable", Style::new().bold())
        .add("footnote", Style::new().dim())
}

fn row_label(row: &HeaderCell) -> String {
    let label = match row.n {
        Some(n) => format!("{} (N={})", row.label, n),
        None => row.label.clone(),
    };
    if row.is_indented() {
        format!("{}{}", INDENT, label)
    } else {
        label
    }
}

fn count_label(cell: &HeaderCell) -> String {
    cell.n.map(|n| format!("(N={})", n)).unwrap_or_default()
}

fn cell(table: &TableModel, row: usize, column: usize) -> &str {
    table.cell(row, column).unwrap_or("")
}

/// Column widths, widened so every group caption fits over its span.
fn column_widths(table: &TableModel) -> Vec<usize> {
    let mut widths: Vec<usize> = table
        .columns
        .iter()
        .enumerate()
        .map(|(c, column)| {
            let cells = (0..table.n_rows()).map(|r| measure_text_width(cell(table, r, c)));
            cells
                .chain([
                    measure_text_width(&column.label),
                    measure_text_width(&count_label(column)),
                ])
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut start = 0;
    for group in &table.column_groups {
        let end = (start + group.span).min(widths.len());
        if let (Some(label), true) = (&group.label, end > start) {
            let covered = span_width(&widths[start..end]);
            let needed = measure_text_width(label);
            if needed > covered {
                widths[end - 1] += needed - covered;
            }
        }
        start = end;
    }
    widths
}

fn span_width(widths: &[usize]) -> usize {
    widths.iter().sum::<usize>() + GAP.len() * widths.len().saturating_sub(1)
}

fn line(stub: &str, stub_width: usize, cells: impl Iterator<Item = String>) -> String {
    let mut out = pad_str(stub, stub_width, Alignment::Left, None).into_owned();
    for cell in cells {
        out.push_str(GAP);
        out.push_str(&cell);
    }
    out.trim_end().to_string()
}

/// Build the template context for a table.
pub fn table_context(table: &TableModel) -> TableContext {
    let widths = column_widths(table);
    let stub_width = table
        .rows
        .iter()
        .map(|r| measure_text_width(&row_label(r)))
        .chain(table.row_groups.iter().filter_map(|g| g.label.as_deref()).map(measure_text_width))
        .max()
        .unwrap_or(0);
    let centered =
        |text: &str, width: usize| pad_str(text, width, Alignment::Center, None).into_owned();

    let groups = (!table.column_groups.is_empty()).then(|| {
        let mut start = 0;
        let cells = table.column_groups.iter().map(|g| {
            let end = (start + g.span).min(widths.len());
            let width = span_width(&widths[start.min(end)..end]);
            start = end;
            centered(g.label.as_deref().unwrap_or(""), width)
        });
        line("", stub_width, cells)
    });

    let header = line(
        "",
        stub_width,
        table
            .columns
            .iter()
            .zip(&widths)
            .map(|(c, &w)| centered(&c.label, w)),
    );
    let counts = table.columns.iter().any(|c| c.n.is_some()).then(|| {
        line(
            "",
            stub_width,
            table
                .columns
                .iter()
                .zip(&widths)
                .map(|(c, &w)| centered(&count_label(c), w)),
        )
    });

    TableContext {
        caption: table.caption.clone(),
        footnote: table.footnote.clone(),
        groups,
        header,
        counts,
        separator: "-".repeat(stub_width + widths.iter().map(|w| w + GAP.len()).sum::<usize>()),
        rows: body_rows(table, &widths, stub_width),
    }
}

fn body_rows(table: &TableModel, widths: &[usize], stub_width: usize) -> Vec<TemplateRow> {
    let mut captions = vec![None; table.n_rows()];
    let mut start = 0;
    for group in &table.row_groups {
        if let (Some(label), Some(slot)) = (group.label.as_deref(), captions.get_mut(start)) {
            let first = table.rows.get(start).map(|r| r.label.as_str());
            if !label.is_empty() && first != Some(label) {
                *slot = Some(label.to_string());
            }
        }
        start += group.span;
    }

    let mut rows = Vec::with_capacity(table.n_rows());
    for (r, (header, caption)) in table.rows.iter().zip(captions).enumerate() {
        if let Some(caption) = caption {
            rows.push(TemplateRow {
                text: caption,
                is_label: false,
                is_group: true,
            });
        }
        let cells = widths
            .iter()
            .enumerate()
            .map(|(c, &w)| pad_str(cell(table, r, c), w, Alignment::Center, None).into_owned());
        rows.push(TemplateRow {
            text: line(&row_label(header), stub_width, cells),
            is_label: header.kind == HeaderKind::Variable,
            is_group: false,
        });
    }
    rows
}
