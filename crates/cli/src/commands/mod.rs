// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
pub mod append;
pub mod range;
pub mod tail;

use std::path::Path;

use anyhow::Context;
use chrono::SecondsFormat;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use echo_log::config::{parse_var, ENV_DECODE_POLICY};
use echo_log::{Attributes, DecodePolicy, Entry, LineBatch, LineRange, LogStore, StoreConfig};

/// Read raw lines from an existing log file and stop the store again.
pub(crate) async fn read_batch(path: &Path, range: LineRange) -> anyhow::Result<LineBatch> {
    anyhow::ensure!(path.exists(), "Log file {} does not exist", path.display());

    let store = LogStore::open(StoreConfig::new(path));
    let batch = store.read_raw(range).await;
    store.shutdown().await?;

    batch.with_context(|| format!("Failed to read {}", path.display()))
}

/// `--skip-invalid` wins; otherwise `ECHO_LOG_DECODE_POLICY`, then strict.
pub fn decode_policy(skip_invalid: bool) -> anyhow::Result<DecodePolicy> {
    if skip_invalid {
        return Ok(DecodePolicy::Skip);
    }
    match std::env::var(ENV_DECODE_POLICY) {
        Ok(value) => Ok(parse_var(ENV_DECODE_POLICY, value)?),
        Err(_) => Ok(DecodePolicy::default()),
    }
}

/// Render stored lines verbatim (`raw`) or decoded into a table. Lines that
/// do not decode fail the render under [`DecodePolicy::Strict`] and are left
/// out of the table under [`DecodePolicy::Skip`].
pub fn render(batch: &LineBatch, raw: bool, policy: DecodePolicy) -> anyhow::Result<String> {
    if raw {
        return Ok(batch.lines.iter().map(|line| format!("{line}\n")).collect());
    }

    if batch.lines.is_empty() {
        return Ok("No entries\n".to_string());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Line", "Date", "Headers", "Params", "Body"]);

    let mut skipped = 0usize;
    for (offset, line) in batch.lines.iter().enumerate() {
        let index = batch.first_line + offset as u64;
        let entry = match Entry::decode(line, index) {
            Ok(entry) => entry,
            Err(e) if policy == DecodePolicy::Skip => {
                eprintln!("Warning: {e}");
                skipped += 1;
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        table.add_row(vec![
            index.to_string(),
            entry.date().to_rfc3339_opts(SecondsFormat::Millis, true),
            cell(entry.headers())?,
            cell(entry.params())?,
            cell(entry.body())?,
        ]);
    }

    let mut output = format!("{table}\n");
    if skipped > 0 {
        output.push_str(&format!("Skipped {skipped} undecodable line(s)\n"));
    }
    Ok(output)
}

fn cell(attrs: Option<&Attributes>) -> anyhow::Result<String> {
    match attrs {
        Some(attrs) => Ok(serde_json::to_string_pretty(attrs)?),
        None => Ok("-".to_string()),
    }
}
