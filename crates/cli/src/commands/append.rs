// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::path::Path;

use anyhow::Context;
use echo_log::{Attributes, Entry, LogStore, StoreConfig};

/// Append one hand-built entry. Each part is a JSON object or omitted.
pub async fn run(
    path: &Path,
    headers: Option<&str>,
    params: Option<&str>,
    body: Option<&str>,
) -> anyhow::Result<()> {
    let entry = Entry::new(
        parse_attributes("headers", headers)?,
        parse_attributes("params", params)?,
        parse_attributes("body", body)?,
    );

    let store = LogStore::open(StoreConfig::new(path));
    let appended = store.append(&entry).await;
    store.shutdown().await?;
    appended.with_context(|| format!("Failed to append to {}", path.display()))?;

    println!("logged");
    Ok(())
}

fn parse_attributes(name: &str, raw: Option<&str>) -> anyhow::Result<Option<Attributes>> {
    raw.map(|raw| {
        serde_json::from_str::<Attributes>(raw)
            .with_context(|| format!("--{name} must be a JSON object"))
    })
    .transpose()
}
