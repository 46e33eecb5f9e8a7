//! Number, date and label formatting for chat output.
//!
//! Monetary values use `,` for thousands and `.` for decimals, prefixed
//! with `R$` (e.g. `R$ 1,234.56`).

use chrono::NaiveDate;

/// Display width for product names in rankings.
pub const MAX_LABEL_CHARS: usize = 50;

/// Format a value with `decimals` places and `,` thousands separators.
pub fn format_grouped(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (formatted.as_str(), None),
    };

    let mut out = String::with_capacity(formatted.len() + int_part.len() / 3 + 1);
    if value.is_sign_negative() && value != 0.0 {
        out.push('-');
    }
    let len = int_part.len();
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}

/// Format a monetary value, e.g. `R$ 2,500.00`.
pub fn format_currency(value: f64) -> String {
    format!("R$ {}", format_grouped(value, 2))
}

/// Format a quantity without decimals, e.g. `1,235`.
pub fn format_quantity(value: f64) -> String {
    format_grouped(value, 0)
}

/// Format a date as `DD/MM/YYYY`.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Cut a label to [`MAX_LABEL_CHARS`] characters, appending `...` when cut.
pub fn truncate_label(label: &str) -> String {
    if label.chars().count() > MAX_LABEL_CHARS {
        let head: String = label.chars().take(MAX_LABEL_CHARS).collect();
        format!("{}...", head)
    } else {
        label.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(2500.0), "R$ 2,500.00");
        assert_eq!(format_currency(1234.5), "R$ 1,234.50");
        assert_eq!(format_currency(0.0), "R$ 0.00");
        assert_eq!(format_currency(999.5), "R$ 999.50");
        assert_eq!(format_currency(1234567.0), "R$ 1,234,567.00");
        assert_eq!(format_currency(-1500.0), "R$ -1,500.00");
    }

    #[test]
    fn test_format_quantity() {
        assert_eq!(format_quantity(17.0), "17");
        assert_eq!(format_quantity(12345.0), "12,345");
    }

    #[test]
    fn test_format_date() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert_eq!(format_date(date), "05/01/2024");
    }

    #[test]
    fn test_truncate_label() {
        assert_eq!(truncate_label("Parafuso"), "Parafuso");

        let long = "x".repeat(60);
        let cut = truncate_label(&long);
        assert_eq!(cut.len(), 53);
        assert!(cut.ends_with("..."));

        let exact = "é".repeat(50);
        assert_eq!(truncate_label(&exact), exact);
    }
}
