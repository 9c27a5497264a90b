//! Swapping the row and column roles of a table.

use super::table::TableModel;

/// Swap rows and columns.
///
/// Column spans become row groups and vice versa, so transposing twice gives
/// back the original table. Variables with several statistic rows keep all
/// of them, one column each.
pub fn transpose(table: TableModel) -> TableModel {
    let TableModel {
        caption,
        footnote,
        topclass,
        columns,
        column_groups,
        rows,
        row_groups,
        cells,
        transposed,
    } = table;

    let cells: Vec<Vec<String>> = (0..columns.len())
        .map(|c| {
            cells
                .iter()
                .map(|row| row.get(c).cloned().unwrap_or_default())
                .collect()
        })
        .collect();

    TableModel {
        caption,
        footnote,
        topclass,
        columns: rows,
        column_groups: row_groups,
        rows: columns,
        row_groups: column_groups,
        cells,
        transposed: !transposed,
    }
}

impl TableModel {
    /// Swap rows and columns. See [`transpose`].
    pub fn transpose(self) -> Self {
        transpose(self)
    }
}
