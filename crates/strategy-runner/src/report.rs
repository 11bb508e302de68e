use std::path::Path;

use backtest_engine::ReturnTable;

/// Write the combined return table as CSV: a date column plus one column
/// per curve, cells empty where a ticker has no session on the date.
pub fn write_csv(table: &ReturnTable, path: &Path) -> anyhow::Result<()> {
    std::fs::write(path, render_csv(table))?;
    Ok(())
}

fn render_csv(table: &ReturnTable) -> String {
    let mut out = String::from("date");
    for column in &table.columns {
        out.push(',');
        out.push_str(&column.name);
    }
    out.push('\n');

    for (i, date) in table.dates.iter().enumerate() {
        out.push_str(&date.format("%Y-%m-%d").to_string());
        for column in &table.columns {
            out.push(',');
            if let Some(value) = column.values[i] {
                out.push_str(&format!("{value:.6}"));
            }
        }
        out.push('\n');
    }
    out
}
