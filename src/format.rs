/// Compact rendering of large scores: `999`, `1.50K`, `2.00M`, `3.25B`.
pub fn format_number(value: u64) -> String {
    const THOUSAND: u64 = 1_000;
    const MILLION: u64 = 1_000_000;
    const BILLION: u64 = 1_000_000_000;

    match value {
        v if v >= BILLION => format!("{:.2}B", v as f64 / BILLION as f64),
        v if v >= MILLION => format!("{:.2}M", v as f64 / MILLION as f64),
        v if v >= THOUSAND => format!("{:.2}K", v as f64 / THOUSAND as f64),
        v => v.to_string(),
    }
}

pub fn format_delay(seconds: f64) -> String {
    format!("{seconds:.1}s auto")
}

pub fn format_target_count(count: usize) -> String {
    let plural = if count > 1 { "s" } else { "" };
    format!("{count} target{plural}")
}
