// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::path::Path;

use echo_log::{DecodePolicy, LineRange};

use super::{read_batch, render};

pub async fn run(path: &Path, start: u64, end: u64, raw: bool, policy: DecodePolicy) -> anyhow::Result<()> {
    let output = collect(path, start, end, raw, policy).await?;
    if !raw {
        println!("\nLines {start}..{end} of {}\n", path.display());
    }
    print!("{output}");
    Ok(())
}

pub async fn collect(path: &Path, start: u64, end: u64, raw: bool, policy: DecodePolicy) -> anyhow::Result<String> {
    let batch = read_batch(path, LineRange::Bounded { start, end }).await?;
    render(&batch, raw, policy)
}
