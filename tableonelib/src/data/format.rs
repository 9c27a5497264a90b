//! Number formatting with significant-digit rounding.

/// Round `x` to `digits` significant digits.
pub fn round_signif(x: f64, digits: usize) -> f64 {
    if x == 0.0 || !x.is_finite() {
        return x;
    }
    let digits = digits.max(1) as i32;
    let magnitude = x.abs().log10().floor() as i32;
    let exponent = digits - 1 - magnitude;
    if exponent >= 0 {
        let scale = 10f64.powi(exponent);
        (x * scale).round() / scale
    } else {
        let scale = 10f64.powi(-exponent);
        (x / scale).round() * scale
    }
}

/// Format `x` with `digits` significant digits, padding with trailing zeros.
///
/// `signif_pad(4.1, 3)` is `"4.10"`, `signif_pad(27.5, 3)` is `"27.5"`,
/// `signif_pad(1234.0, 3)` is `"1230"`. Non-finite input formats as "".
pub fn signif_pad(x: f64, digits: usize) -> String {
    if !x.is_finite() {
        return String::new();
    }
    let digits = digits.max(1);
    let rounded = round_signif(x, digits);
    let magnitude = if rounded == 0.0 {
        0
    } else {
        rounded.abs().log10().floor() as i64
    };
    let decimals = (digits as i64 - 1 - magnitude).max(0) as usize;
    format_decimals(rounded, decimals)
}

/// Format with a fixed number of decimal places.
pub fn format_decimals(x: f64, decimals: usize) -> String {
    if !x.is_finite() {
        return String::new();
    }
    let s = format!("{:.*}", decimals, x);
    // "-0.0" reads as noise in a table
    if s.starts_with('-') && s[1..].chars().all(|c| c == '0' || c == '.') {
        s[1..].to_string()
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signif_pad() {
        assert_eq!(signif_pad(4.1, 3), "4.10");
        assert_eq!(signif_pad(27.5, 3), "27.5");
        assert_eq!(signif_pad(20.0, 3), "20.0");
        assert_eq!(signif_pad(1234.0, 3), "1230");
        assert_eq!(signif_pad(0.012345, 2), "0.012");
        assert_eq!(signif_pad(0.0, 3), "0.00");
        assert_eq!(signif_pad(-3.14159, 3), "-3.14");
    }

    #[test]
    fn test_signif_pad_carry() {
        // rounding up changes the magnitude
        assert_eq!(signif_pad(9.996, 3), "10.0");
        assert_eq!(signif_pad(99.96, 3), "100");
    }

    #[test]
    fn test_signif_pad_non_finite() {
        assert_eq!(signif_pad(f64::NAN, 3), "");
        assert_eq!(signif_pad(f64::INFINITY, 3), "");
    }

    #[test]
    fn test_format_decimals() {
        assert_eq!(format_decimals(50.0, 1), "50.0");
        assert_eq!(format_decimals(33.3333, 0), "33");
        assert_eq!(format_decimals(-0.001, 1), "0.0");
    }

    #[test]
    fn test_round_signif() {
        assert_eq!(round_signif(123.456, 2), 120.0);
        assert_eq!(round_signif(0.0, 3), 0.0);
    }
}
