use crate::controller::{Outcome, Snapshot};
use crossterm::style::Stylize;
use itertools::Itertools;
use serde_json::Value;

/// Human readable rendering of an operation outcome.
pub fn render_outcome(outcome: &Outcome) -> String {
    let mut out = vec![];

    if let Some(error) = &outcome.error {
        out.push(format!("{} {error}", "error:".red().bold()));
    }
    if let Some(snapshot) = &outcome.snapshot {
        out.push(render_snapshot(snapshot));
    }
    if let Some(payload) = &outcome.payload {
        if let Some(line) = render_payload(payload) {
            out.push(line);
        }
    }
    if outcome.target_complete {
        out.push("targeted range complete".green().to_string());
    }
    if let Some(range) = &outcome.range {
        out.push(format!("range [{}, {}] active", range.start, range.end).dim().to_string());
    }

    out.join("\n")
}

pub fn render_snapshot(snapshot: &Snapshot) -> String {
    let mut out = vec![format!(
        "{}:{} in {}",
        snapshot.file().display().to_string().green(),
        snapshot.line(),
        snapshot.location.function.as_str().cyan()
    )];
    if let Some(excerpt) = &snapshot.excerpt {
        out.push(excerpt.to_string().trim_end().to_string());
    }
    if !snapshot.variables.is_empty() {
        out.push(
            snapshot
                .variables
                .iter()
                .map(|var| match &var.type_label {
                    Some(ty) => format!("{} = {} ({ty})", var.name.as_str().bold(), var.value),
                    None => format!("{} = {}", var.name.as_str().bold(), var.value),
                })
                .join("\n"),
        );
    }
    out.join("\n")
}

fn render_payload(payload: &Value) -> Option<String> {
    if let Some(status) = payload.get("status").and_then(Value::as_str) {
        return Some(match status {
            "ended" => "program finished".yellow().to_string(),
            _ => payload
                .get("reason")
                .and_then(Value::as_str)
                .unwrap_or(status)
                .yellow()
                .to_string(),
        });
    }
    if let Some(result) = payload.get("result") {
        let result = result.as_str().map(str::to_string).unwrap_or_else(|| result.to_string());
        return Some(match payload.get("type").and_then(Value::as_str) {
            Some(ty) => format!("{result} ({ty})"),
            None => result,
        });
    }
    if let Some(length) = payload.get("historyLength") {
        return Some(format!("history: {length} snapshot(s)").dim().to_string());
    }
    if let Some(breakpoints) = payload.get("breakpoints").and_then(Value::as_array) {
        let lines = breakpoints
            .iter()
            .filter_map(|bp| bp.get("line").and_then(Value::as_u64))
            .join(", ");
        let pending = payload.get("pending").and_then(Value::as_bool) == Some(true);
        return Some(if pending {
            format!("breakpoints at lines [{lines}] (pending until start)")
        } else {
            format!("breakpoints at lines [{lines}]")
        });
    }
    None
}
