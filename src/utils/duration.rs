// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Duration strings in the `10s` / `500ms` / `1m30s` style

use std::time::Duration;

/// Parse a duration such as `250ms`, `10s`, `1m30s`, `2h`, or bare seconds (`5`)
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let input = input.trim();
    if input.is_empty() {
        return Err("empty duration".to_string());
    }

    if let Ok(secs) = input.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    let mut total = Duration::ZERO;
    let mut rest = input;

    while !rest.is_empty() {
        let digits = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(|| format!("missing unit in duration: {}", input))?;
        if digits == 0 {
            return Err(format!("invalid duration: {}", input));
        }
        let value: f64 = rest[..digits]
            .parse()
            .map_err(|_| format!("invalid number in duration: {}", input))?;
        rest = &rest[digits..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let unit_secs = match &rest[..unit_len] {
            "ns" => 1e-9,
            "us" | "µs" => 1e-6,
            "ms" => 1e-3,
            "s" => 1.0,
            "m" => 60.0,
            "h" => 3600.0,
            other => return Err(format!("unknown unit '{}' in duration: {}", other, input)),
        };
        rest = &rest[unit_len..];

        total = Duration::try_from_secs_f64(value * unit_secs)
            .ok()
            .and_then(|part| total.checked_add(part))
            .ok_or_else(|| format!("duration out of range: {}", input))?;
    }

    Ok(total)
}
