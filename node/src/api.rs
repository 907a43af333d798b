// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use serde::Deserialize;

/// `GET /log/range?start=S&end=E`, zero-based and end-exclusive.
#[derive(Deserialize, Debug)]
pub struct RangeParams {
    pub start: u64,
    pub end: u64,
}

/// Body of `POST /log`.
pub const LOGGED: &str = "logged";
