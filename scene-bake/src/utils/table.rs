//! Table formatting utilities

use prettytable::{Cell, Row, Table};

/// Create a table with bold headers
pub fn create_table(headers: Vec<&str>) -> Table {
    let mut table = Table::new();
    table.set_format(*prettytable::format::consts::FORMAT_NO_LINESEP_WITH_TITLE);

    let header_cells: Vec<Cell> = headers
        .into_iter()
        .map(|h| Cell::new(h).style_spec("b"))
        .collect();
    table.set_titles(Row::new(header_cells));

    table
}

/// Add a row of right-aligned numbers after a left-aligned label
pub fn add_count_row(table: &mut Table, label: &str, counts: &[usize]) {
    let mut cells = vec![Cell::new(label)];
    cells.extend(counts.iter().map(|count| Cell::new(&count.to_string()).style_spec("r")));
    table.add_row(Row::new(cells));
}
