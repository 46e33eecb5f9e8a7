//! Dataset-wide statistics.

use crate::analysis::aggregator::{distinct_invoice_count, total_value};
use crate::analysis::numeric::to_number;
use crate::dataset::Dataset;
use crate::models::Field;
use crate::report::{format_currency, format_date, format_quantity};
use chrono::NaiveDate;

/// Accepted `DATA_EMISSAO` formats, tried in order.
pub const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"];

/// Parse an issue date with the first matching format.
///
/// Years must be written with exactly four digits.
pub fn parse_issue_date(raw: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .filter(|fmt| has_four_digit_year(raw, fmt))
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

// chrono's %Y also takes 1-3 digit years
fn has_four_digit_year(raw: &str, fmt: &str) -> bool {
    let year = if fmt.starts_with("%Y") {
        raw.split(['-', '/']).next()
    } else {
        raw.rsplit(['-', '/']).next()
    };
    year.is_some_and(|y| y.len() == 4 && y.bytes().all(|b| b.is_ascii_digit()))
}

/// Earliest and latest parseable issue dates.
pub fn date_range(dataset: &Dataset) -> Option<(NaiveDate, NaiveDate)> {
    dataset
        .records()
        .filter_map(|r| r.field(Field::IssueDate))
        .filter(|raw| !raw.is_empty())
        .filter_map(parse_issue_date)
        .fold(None, |range, date| match range {
            None => Some((date, date)),
            Some((min, max)) => Some((min.min(date), max.max(date))),
        })
}

/// Sum of `QUANTIDADE` over all records.
pub fn total_quantity(dataset: &Dataset) -> f64 {
    dataset
        .records()
        .map(|r| to_number(r.field(Field::Quantity)))
        .sum()
}

/// General statistics, one finding per line.
pub fn summarize(dataset: &Dataset) -> String {
    let mut stats = Vec::new();

    stats.push(format!(
        "💰 Valor total: {}",
        format_currency(total_value(dataset))
    ));
    stats.push(format!(
        "📄 Total de notas únicas: {}",
        distinct_invoice_count(dataset)
    ));
    stats.push(format!("📋 Total de registros: {}", dataset.len()));

    let quantity = total_quantity(dataset);
    if quantity != 0.0 {
        stats.push(format!("📦 Total de itens: {}", format_quantity(quantity)));
    }

    if let Some((first, last)) = date_range(dataset) {
        stats.push(format!(
            "📅 Período: {} até {}",
            format_date(first),
            format_date(last)
        ));
    }

    stats.join("\n")
}
