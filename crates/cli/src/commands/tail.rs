// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::path::Path;

use echo_log::{DecodePolicy, LineRange};

use super::{read_batch, render};

pub async fn run(path: &Path, count: usize, raw: bool, policy: DecodePolicy) -> anyhow::Result<()> {
    let output = collect(path, count, raw, policy).await?;
    if !raw {
        println!("\nLast {count} lines of {}\n", path.display());
    }
    print!("{output}");
    Ok(())
}

pub async fn collect(path: &Path, count: usize, raw: bool, policy: DecodePolicy) -> anyhow::Result<String> {
    let batch = read_batch(path, LineRange::Tail(count)).await?;
    render(&batch, raw, policy)
}
