//! Units formatting and conversion utilities
//!
//! Human-readable rendering of sizes, trial durations and write speeds
//! for the per-trial report.

use std::time::Duration;

const MIB: f64 = 1_048_576.0;

/// Binary units, largest first
const SIZE_UNITS: [(&str, u64); 4] = [
    ("TiB", 1 << 40),
    ("GiB", 1 << 30),
    ("MiB", 1 << 20),
    ("KiB", 1 << 10),
];

/// Size in the largest binary unit it reaches, one decimal place
///
/// # Examples
/// ```
/// use storagemeter::util::units::format_bytes;
///
/// assert_eq!(format_bytes(1024), "1.0 KiB");
/// assert_eq!(format_bytes(104857600), "100.0 MiB");
/// ```
pub fn format_bytes(bytes: u64) -> String {
    match SIZE_UNITS.iter().find(|(_, scale)| bytes >= *scale) {
        Some((unit, scale)) => format!("{:.1} {}", bytes as f64 / *scale as f64, unit),
        None => format!("{} B", bytes),
    }
}

/// Block size given on the command line: a whole number with an optional
/// binary suffix (`K`/`KiB`, `M`/`MiB`, `G`/`GiB`, `B`), case-insensitive.
///
/// # Examples
/// ```
/// use storagemeter::util::units::parse_bytes;
///
/// assert_eq!(parse_bytes("64KiB").unwrap(), 65536);
/// assert_eq!(parse_bytes("100 M").unwrap(), 104857600);
/// ```
pub fn parse_bytes(input: &str) -> Result<u64, String> {
    const SUFFIXES: [(&str, u64); 7] = [
        ("KIB", 1 << 10),
        ("MIB", 1 << 20),
        ("GIB", 1 << 30),
        ("K", 1 << 10),
        ("M", 1 << 20),
        ("G", 1 << 30),
        ("B", 1),
    ];

    let text = input.trim().to_ascii_uppercase();
    let (count, multiplier) = SUFFIXES
        .iter()
        .find_map(|(suffix, multiplier)| {
            text.strip_suffix(suffix)
                .map(|rest| (rest.trim_end(), *multiplier))
        })
        .unwrap_or((text.as_str(), 1));

    let count: u64 = count
        .parse()
        .map_err(|_| format!("Invalid size: {}", input.trim()))?;
    count
        .checked_mul(multiplier)
        .ok_or_else(|| format!("Size too large: {}", input.trim()))
}

/// Whole milliseconds, the resolution the trial report is printed at
pub fn format_millis(duration: Duration) -> String {
    format!("{} ms", duration.as_millis())
}

/// Bytes per second for `bytes` written in `duration`; 0.0 for a zero duration
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use storagemeter::util::units::calculate_throughput;
///
/// let throughput = calculate_throughput(1048576, Duration::from_secs(2));
/// assert!((throughput - 524288.0).abs() < 0.01);
/// ```
pub fn calculate_throughput(bytes: u64, duration: Duration) -> f64 {
    if duration.is_zero() {
        return 0.0;
    }

    bytes as f64 / duration.as_secs_f64()
}

/// Format a bytes-per-second speed as MB/s, switching to GB/s above 1024 MB/s
///
/// # Examples
/// ```
/// use storagemeter::util::units::format_throughput;
///
/// assert_eq!(format_throughput(1_572_864.0), "1.50 MB/s");
/// assert_eq!(format_throughput(2.0 * 1024.0 * 1_048_576.0), "2.00 GB/s");
/// ```
pub fn format_throughput(bytes_per_sec: f64) -> String {
    let mbps = bytes_per_sec / MIB;
    if mbps > 1024.0 {
        format!("{:.2} GB/s", mbps / 1024.0)
    } else {
        format!("{:.2} MB/s", mbps)
    }
}
