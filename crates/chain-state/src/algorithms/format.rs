//! Display helpers for derived values.

/// Hashrate units, 1024 apart.
const HASHRATE_UNITS: [&str; 6] = ["H", "KH", "MH", "GH", "TH", "PH"];

/// Format a hashrate with a 1024-based unit, two decimals.
pub fn format_hashrate(hashrate: f64) -> String {
    let mut value = if hashrate.is_finite() { hashrate } else { 0.0 };
    let mut unit = 0;
    while value >= 1024.0 && unit < HASHRATE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", value, HASHRATE_UNITS[unit])
}

/// Decode block extra-data as printable ASCII.
///
/// Printable bytes (32..=126) are kept, others become `.`; runs of two or
/// more dots are removed and the result is trimmed.
pub fn extra_data_ascii(bytes: &[u8]) -> String {
    let mapped: String = bytes
        .iter()
        .map(|&b| if (32..=126).contains(&b) { b as char } else { '.' })
        .collect();

    let mut out = String::with_capacity(mapped.len());
    let mut dots = 0usize;
    for c in mapped.chars() {
        if c == '.' {
            dots += 1;
            continue;
        }
        if dots == 1 {
            out.push('.');
        }
        dots = 0;
        out.push(c);
    }
    if dots == 1 {
        out.push('.');
    }

    out.trim().to_string()
}

/// Format wei as gwei with two decimals.
pub fn format_gwei(wei: f64) -> String {
    format!("{:.2} gwei", wei / 1_000_000_000.0)
}

/// Upper-case the first character and lower-case the rest.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_hashrate_units() {
        assert_eq!(format_hashrate(100.0), "100.00 H");
        assert_eq!(format_hashrate(2048.0), "2.00 KH");
        assert_eq!(format_hashrate(1024.0 * 1024.0 * 1.5), "1.50 MH");
        assert_eq!(format_hashrate(f64::NAN), "0.00 H");
    }

    #[test]
    fn test_format_hashrate_caps_at_peta() {
        let huge = 1024f64.powi(7);
        assert_eq!(format_hashrate(huge), "1024.00 PH");
    }

    #[test]
    fn test_extra_data_ascii() {
        assert_eq!(extra_data_ascii(b"geth go1.21.3 linux"), "geth go1.21.3 linux");
        assert_eq!(extra_data_ascii(&[0xd8, 0x83, b'g', b'e', b't', b'h', 0x00]), "geth.");
        assert_eq!(extra_data_ascii(&[0xd8, 0x83, b'g', b'e', b't', b'h', 0x00, 0x00]), "geth");
        assert_eq!(extra_data_ascii(b"  pool.\x01x  "), "poolx");
        assert_eq!(extra_data_ascii(&[]), "");
    }

    #[test]
    fn test_single_dot_kept() {
        assert_eq!(extra_data_ascii(b"a\x01b"), "a.b");
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("linux-amd64"), "Linux-amd64");
        assert_eq!(capitalize("GETH/v1.13.5"), "Geth/v1.13.5");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_format_gwei() {
        assert_eq!(format_gwei(1_500_000_000.0), "1.50 gwei");
    }
}
