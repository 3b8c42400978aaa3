/// Sensor millimetres to the centimetres the approach logic works in.
#[inline]
pub fn mm_to_cm(mm: f64) -> f64 {
    mm / 10.0
}

/// Saturating `Duration` to whole milliseconds.
#[inline]
pub fn duration_ms(d: std::time::Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
