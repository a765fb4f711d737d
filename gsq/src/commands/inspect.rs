// gsq/src/commands/inspect.rs
//
// USE CASE: Print an emitted table (schema + first rows).

use std::path::Path;

use comfy_table::Table as Grid;
use gsq_core::infrastructure::adapters::DuckDbStore;
use gsq_core::ports::dataset::DatasetSource;

pub async fn execute(file: &Path, limit: usize) -> anyhow::Result<()> {
    if !file.exists() {
        anyhow::bail!(
            "❌ File not found at: {}\n👉 Have you run 'gsq run'?",
            file.display()
        );
    }

    let store = DuckDbStore::in_memory()?;
    let table = store.load(&file.to_string_lossy()).await?;

    println!("\n🔍 Inspecting: '{}'", file.display());
    println!("   Columns: [{}]", table.columns.join(", "));
    println!("   --- Rows ({} of {}) ---", limit.min(table.len()), table.len());

    let mut grid = Grid::new();
    grid.set_header(table.columns.clone());
    for row in table.head(limit).rows {
        grid.add_row(
            row.iter()
                .map(|cell| cell.to_opt_string().unwrap_or_else(|| "NULL".to_string()))
                .collect::<Vec<_>>(),
        );
    }
    println!("{grid}");

    Ok(())
}
