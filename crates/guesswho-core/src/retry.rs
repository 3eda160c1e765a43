//! Backoff calculation.
//!
//! Sync-only math for reconnect loops. Callers supply the randomness, which
//! keeps the formula deterministic under test.

/// Calculate an exponential backoff delay with symmetric jitter.
///
/// Formula: `min(max_delay, base_delay * 2^attempt) * (1 + (random * 2 - 1) * jitter)`
///
/// * `attempt` - zero-based attempt index (0 for the first retry)
/// * `jitter_factor` - jitter range, clamped to `0.0..=1.0`
/// * `random` - a value in `[0.0, 1.0)` from a PRNG
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn backoff_delay_ms(
    attempt: u32,
    base_delay_ms: u64,
    max_delay_ms: u64,
    jitter_factor: f64,
    random: f64,
) -> u64 {
    let exponential = base_delay_ms.saturating_mul(1u64 << attempt.min(31));
    let capped = exponential.min(max_delay_ms);

    let jitter = jitter_factor.clamp(0.0, 1.0);
    let scale = 1.0 + (random.clamp(0.0, 1.0) * 2.0 - 1.0) * jitter;
    ((capped as f64) * scale).round().max(0.0) as u64
}
