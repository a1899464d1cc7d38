//! Human-readable size strings (`512`, `4k`, `64MB`, `1g`)

use crate::error::ConfigError;

/// Parse a size string into bytes
///
/// Accepts a decimal integer followed by an optional, case-insensitive
/// binary unit (`b`, `k`, `m`, `g`, `t`, `p`, `e`), which may itself be
/// followed by `b`.
pub fn parse_size(input: &str) -> Result<u64, ConfigError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::invalid_size(input, "size string is empty"));
    }

    let lower = trimmed.to_ascii_lowercase();
    let without_b = lower.strip_suffix('b').unwrap_or(&lower);

    let (digits, shift) = match without_b.chars().last() {
        Some('k') => (&without_b[..without_b.len() - 1], 10),
        Some('m') => (&without_b[..without_b.len() - 1], 20),
        Some('g') => (&without_b[..without_b.len() - 1], 30),
        Some('t') => (&without_b[..without_b.len() - 1], 40),
        Some('p') => (&without_b[..without_b.len() - 1], 50),
        Some('e') => (&without_b[..without_b.len() - 1], 60),
        _ => (without_b, 0),
    };

    if digits.is_empty() {
        return Err(ConfigError::invalid_size(input, "missing number"));
    }
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ConfigError::invalid_size(
            input,
            format!("'{}' is not an integer", digits),
        ));
    }

    let value: u64 = digits
        .parse()
        .map_err(|e| ConfigError::invalid_size(input, format!("{}", e)))?;

    value
        .checked_mul(1u64 << shift)
        .ok_or_else(|| ConfigError::invalid_size(input, "size overflows 64 bits"))
}
