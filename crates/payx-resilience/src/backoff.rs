use std::time::Duration;

use rand::Rng;

/// Exponential backoff with symmetric jitter.
///
/// For attempt `k` (1-based): `raw = min(cap, base * 2^(k-1))`, and the
/// returned delay is drawn uniformly from `[raw - raw*jitter, raw + raw*jitter]`,
/// floored at zero. So `exp_backoff(k) ∈ [0, min(cap, base*2^(k-1)) * (1 + jitter)]`.
pub fn exp_backoff(attempt: u32, base: Duration, cap: Duration, jitter: f64) -> Duration {
    let exponent = attempt.saturating_sub(1).min(63);
    let raw = (base.as_secs_f64() * 2f64.powi(exponent as i32)).min(cap.as_secs_f64());
    let spread = raw * jitter;
    let jittered = raw + rand::thread_rng().gen_range(-spread..=spread);
    Duration::from_secs_f64(jittered.max(0.0))
}
