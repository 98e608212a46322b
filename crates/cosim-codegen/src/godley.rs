//! Godley flow resolution.
//!
//! Each flow-table row `(source, target, amount, _)` is a double-entry
//! transaction: it contributes `-(amount)` to the source account's
//! derivative and `+(amount)` to the target's. Summed over all accounts a
//! single row therefore nets to zero — conservation holds by
//! construction, not by checking.

use indexmap::IndexMap;

use cosim_model::ModelSpec;

/// Accumulate per-account signed contribution sums, in row order.
///
/// The textual form is `-(a1) + (a2) - (a3)`: the first term keeps its
/// sign glyph with no leading space, later terms are joined with a spaced
/// operator. Amounts are parenthesized verbatim; nothing is simplified.
pub fn resolve_flows(spec: &ModelSpec) -> IndexMap<String, String> {
    let mut sums: IndexMap<String, String> = IndexMap::new();
    for row in &spec.godley {
        append_term(&mut sums, &row.source, '-', &row.amount);
        append_term(&mut sums, &row.target, '+', &row.amount);
    }
    sums
}

/// All accounts touched by the flow table, sorted for table output.
pub fn flow_accounts(spec: &ModelSpec) -> Vec<String> {
    let mut accounts: Vec<String> = Vec::new();
    for row in &spec.godley {
        for account in [&row.source, &row.target] {
            if !accounts.contains(account) {
                accounts.push(account.clone());
            }
        }
    }
    accounts.sort();
    accounts
}

fn append_term(sums: &mut IndexMap<String, String>, account: &str, sign: char, amount: &str) {
    let entry = sums.entry(account.to_string()).or_default();
    if entry.is_empty() {
        entry.push(sign);
        entry.push('(');
        entry.push_str(amount);
        entry.push(')');
    } else {
        entry.push(' ');
        entry.push(sign);
        entry.push_str(" (");
        entry.push_str(amount);
        entry.push(')');
    }
}
