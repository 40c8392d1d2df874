//! Status command - summarize a ledger store.

use std::path::PathBuf;

use colored::Colorize;
use serde_json::json;
use sluice::Ledger;

pub fn run(store: PathBuf, as_json: bool, _verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    if !store.exists() {
        return Err(format!("store not found: {}", store.display()).into());
    }
    let ledger = Ledger::load(&store)?;
    let rows = ledger.height();

    let mut columns = Vec::new();
    for (name, dtype) in ledger.schema().iter() {
        let nulls = ledger.frame().column(name)?.null_count();
        columns.push((name.to_string(), dtype, nulls));
    }

    if as_json {
        let body = json!({
            "store": store.display().to_string(),
            "rows": rows,
            "columns": columns
                .iter()
                .map(|(name, dtype, nulls)| {
                    json!({
                        "name": name,
                        "type": dtype.to_string(),
                        "missing": nulls,
                    })
                })
                .collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    println!(
        "{} {} ({} rows)",
        "Ledger".cyan().bold(),
        store.display().to_string().white(),
        rows.to_string().white().bold()
    );
    println!();
    for (name, dtype, nulls) in columns {
        let missing = if nulls == 0 {
            "complete".green().to_string()
        } else {
            format!("{} missing", nulls).yellow().to_string()
        };
        println!("  {:20} {:10} {}", name, dtype.to_string(), missing);
    }
    Ok(())
}
