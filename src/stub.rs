//! Shared parsing for `stub://` device strings.
//!
//! Synthetic backends accept an optional scripted failure window so tests can
//! simulate flaky hardware: `stub://name?fail=5..8` makes operations 5, 6 and
//! 7 (0-based) fail.

use anyhow::{anyhow, Result};
use std::ops::Range;

/// Split a `stub://` device string into its name and optional failure window.
pub(crate) fn parse_stub_device(device: &str) -> Result<(String, Option<Range<u64>>)> {
    let spec = device
        .strip_prefix("stub://")
        .ok_or_else(|| anyhow!("not a stub device: {}", device))?;
    match spec.split_once('?') {
        Some((name, query)) => Ok((name.to_string(), Some(parse_fail_window(query)?))),
        None => Ok((spec.to_string(), None)),
    }
}

fn parse_fail_window(query: &str) -> Result<Range<u64>> {
    let spec = query
        .strip_prefix("fail=")
        .ok_or_else(|| anyhow!("unsupported stub query '{}'", query))?;
    let (start, end) = spec
        .split_once("..")
        .ok_or_else(|| anyhow!("fail window must look like fail=START..END, got '{}'", spec))?;
    let start: u64 = start
        .parse()
        .map_err(|_| anyhow!("invalid fail window start '{}'", start))?;
    let end: u64 = end
        .parse()
        .map_err(|_| anyhow!("invalid fail window end '{}'", end))?;
    Ok(start..end)
}
