//! `cosim check` — render the Godley table and resolved equations for
//! manual inspection, without emitting anything.

use std::path::Path;

use anyhow::{Context, Result};

use cosim_codegen::{compile, flow_accounts};
use cosim_model::{GodleyRow, ModelSpec};

pub fn run(models_dir: &Path, model: &str) -> Result<()> {
    let spec = ModelSpec::load(models_dir, model)
        .with_context(|| format!("loading model '{model}'"))?;
    let compiled = compile(&spec).with_context(|| format!("compiling model '{model}'"))?;

    if spec.godley.is_empty() {
        println!("Model '{model}' has no godley table.");
    } else {
        let accounts = flow_accounts(&spec);
        println!(
            "Godley table for '{model}': {} transactions, {} accounts",
            spec.godley.len(),
            accounts.len()
        );
        println!();
        print_table(&spec.godley, &accounts);
    }

    println!();
    println!("Resolved equations:");
    for variable in &spec.variables {
        let key = ModelSpec::derivative_key(variable);
        let origin = if spec.ode_equations.contains_key(&key) {
            "explicit"
        } else {
            "godley"
        };
        println!("  {key} = {}   [{origin}]", compiled.equations[&key]);
    }
    Ok(())
}

fn print_table(rows: &[GodleyRow], accounts: &[String]) {
    let mut header = vec!["Description".to_string()];
    header.extend(accounts.iter().cloned());

    let mut body: Vec<Vec<String>> = Vec::with_capacity(rows.len());
    for row in rows {
        let mut cells = vec![row.description.clone()];
        for account in accounts {
            cells.push(cell_for(row, account));
        }
        body.push(cells);
    }

    let widths: Vec<usize> = header
        .iter()
        .enumerate()
        .map(|(i, h)| {
            body.iter()
                .map(|r| r[i].len())
                .chain(std::iter::once(h.len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    print_row(&header, &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    print_row(&rule, &widths);
    for cells in &body {
        print_row(cells, &widths);
    }
}

fn cell_for(row: &GodleyRow, account: &str) -> String {
    let is_source = row.source == account;
    let is_target = row.target == account;
    match (is_source, is_target) {
        (true, true) => format!("-{} +{}", row.amount, row.amount),
        (true, false) => format!("-{}", row.amount),
        (false, true) => row.amount.clone(),
        (false, false) => "-".to_string(),
    }
}

fn print_row(cells: &[String], widths: &[usize]) {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(c, &w)| format!("{c:<w$}"))
        .collect();
    println!("| {} |", padded.join(" | "));
}
