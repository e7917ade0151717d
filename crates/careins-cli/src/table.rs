//! `careins table`: print which operations each progressing status accepts.

use anyhow::Result;

use careins_state::{transition_table, Operation};

pub fn run_table() -> Result<u8> {
    print!("{}", render_table());
    Ok(0)
}

/// One row per status, one column per operation; `x` marks an accepted
/// operation.
pub fn render_table() -> String {
    let rows = transition_table();
    let status_width = rows
        .iter()
        .map(|(status, _)| status.as_str().len())
        .max()
        .unwrap_or(0);

    let mut out = format!("{:status_width$}", "STATUS");
    for op in Operation::ALL {
        out.push_str(&format!("  {}", op.as_str()));
    }
    out.push('\n');

    for (status, accepted) in &rows {
        out.push_str(&format!("{:status_width$}", status.as_str()));
        for op in Operation::ALL {
            let mark = if accepted.contains(&op) { "x" } else { "-" };
            out.push_str(&format!("  {:width$}", mark, width = op.as_str().len()));
        }
        out.push('\n');
    }
    out
}
