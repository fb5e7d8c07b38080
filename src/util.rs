// Utility helpers for parsing, basic statistics and display formatting.
//
// Everything that has to care about blank cells, NaN or division by zero
// lives here so the engine modules can stay declarative.
use num_format::{Locale, ToFormattedString};
use std::cmp::Ordering;

/// Parse a spreadsheet cell into `f64`, forgiving the usual export noise.
///
/// - Trims whitespace and strips thousands separators and a leading `¥`.
/// - Rejects values that contain alphabetic characters.
/// - Returns `None` for blanks and anything non-finite.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let s = s.trim_start_matches('¥').replace(',', "");
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Trimmed, non-empty text cell.
pub fn clean_text(s: Option<String>) -> Option<String> {
    let s = s?.trim().to_string();
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

pub fn average(v: &[f64]) -> f64 {
    // Returns 0 for an empty slice so callers never see NaN.
    if v.is_empty() {
        return 0.0;
    }
    let sum: f64 = v.iter().copied().sum();
    sum / v.len() as f64
}

pub fn median(mut v: Vec<f64>) -> f64 {
    if v.is_empty() {
        return 0.0;
    }
    v.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let mid = v.len() / 2;
    if v.len() % 2 == 1 {
        v[mid]
    } else {
        (v[mid - 1] + v[mid]) / 2.0
    }
}

/// Sample standard deviation (N-1 divisor). Undefined below two values.
pub fn sample_std(v: &[f64]) -> Option<f64> {
    if v.len() < 2 {
        return None;
    }
    let mean = average(v);
    let ss: f64 = v.iter().map(|x| (x - mean).powi(2)).sum();
    Some((ss / (v.len() - 1) as f64).sqrt())
}

/// Quantile with linear interpolation between closest ranks.
pub fn quantile(mut v: Vec<f64>, q: f64) -> Option<f64> {
    if v.is_empty() {
        return None;
    }
    v.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let pos = q.clamp(0.0, 1.0) * (v.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(v[lo] + (v[hi] - v[lo]) * frac)
}

/// `numerator / denominator * 100`, resolved to 0 whenever the result would
/// not be a finite number (zero denominator, NaN input).
///
/// Every percentage the engine reports goes through this function.
pub fn guarded_pct(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 || !numerator.is_finite() || !denominator.is_finite() {
        return 0.0;
    }
    let pct = numerator / denominator * 100.0;
    if pct.is_finite() {
        pct
    } else {
        0.0
    }
}

/// Relative change of `value` against `base`, in percent.
pub fn pct_change(value: f64, base: f64) -> f64 {
    guarded_pct(value - base, base)
}

/// NaN and infinities collapse to 0 for display.
pub fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimals plus `1,234,567` style grouping of the integer part.
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    // Past u64 the digits are printed ungrouped.
    let mut res = match int_part.parse::<u64>() {
        Ok(v) => v.to_formatted_string(&Locale::en),
        Err(_) => int_part.to_string(),
    };
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    }
    // Avoid rendering "-0" for values that round to zero.
    if n.is_sign_negative() && res.chars().any(|c| c.is_ascii_digit() && c != '0') {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_money(n: f64) -> String {
    format!("¥{}", format_number(n, 0))
}

pub fn format_pct(n: f64) -> String {
    let s = format_number(n, 1);
    if s.starts_with('-') || s == "0.0" {
        format!("{}%", s)
    } else {
        format!("+{}%", s)
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_handles_separators_and_junk() {
        assert_eq!(parse_f64_safe(Some(" 12,345.5 ")), Some(12345.5));
        assert_eq!(parse_f64_safe(Some("¥800")), Some(800.0));
        assert_eq!(parse_f64_safe(Some("n/a")), None);
        assert_eq!(parse_f64_safe(Some("")), None);
        assert_eq!(parse_f64_safe(None), None);
    }

    #[test]
    fn sample_std_uses_n_minus_one() {
        let sd = sample_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((sd - 2.138_089_935).abs() < 1e-6);
        assert_eq!(sample_std(&[1.0]), None);
    }

    #[test]
    fn quantile_interpolates() {
        let q = quantile(vec![5.0, 1.0, 3.0, 2.0, 4.0], 0.8).unwrap();
        assert!((q - 4.2).abs() < 1e-9);
        assert_eq!(quantile(vec![], 0.5), None);
    }

    #[test]
    fn guarded_pct_never_leaks_nan() {
        assert_eq!(guarded_pct(5.0, 0.0), 0.0);
        assert_eq!(guarded_pct(f64::NAN, 10.0), 0.0);
        assert!((pct_change(8000.0, 10000.0) + 20.0).abs() < 1e-9);
    }

    #[test]
    fn formatting() {
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(-0.2, 0), "0");
        assert_eq!(format_money(-15000.0), "¥-15,000");
        assert_eq!(format_pct(12.34), "+12.3%");
        assert_eq!(format_pct(-20.0), "-20.0%");
        assert_eq!(format_pct(0.0), "0.0%");
    }

    #[test]
    fn huge_values_keep_their_digits() {
        assert_eq!(format_number(1e20, 0), "100000000000000000000");
        assert_eq!(format_money(-1e20), "¥-100000000000000000000");
        assert_eq!(format_number(18_000_000_000_000_000_000.0, 0), "18,000,000,000,000,000,000");
    }
}
