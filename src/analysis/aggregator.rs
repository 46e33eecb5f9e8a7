//! Grouping, ranking and trigger-driven analysis over the dataset.
//!
//! The query text is scanned again after classification: several triggers
//! can fire for one query and their findings are concatenated in trigger
//! order. When none fires the general summary is returned instead.

use crate::analysis::numeric::to_number;
use crate::analysis::summary::summarize;
use crate::dataset::{Dataset, RecordView};
use crate::models::{AggregationResult, AnalysisCategory, Classification, Field, GroupValue, Operation};
use crate::report::{format_currency, truncate_label};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::debug;

/// Number of entries shown in rankings.
pub const TOP_N: usize = 5;

/// Placeholder key for records without a group value.
pub const MISSING_GROUP_KEY: &str = "N/A";

/// Reasons a grouping could not be computed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregationError {
    #[error("column not found in dataset: {0}")]
    MissingColumn(String),
}

/// Value of a record for totals: `VALOR_TOTAL`, or `VALOR_NOTA_FISCAL` when
/// the line total is zero or absent.
pub fn record_value(record: &RecordView<'_>) -> f64 {
    let value = to_number(record.field(Field::LineTotal));
    if value == 0.0 {
        to_number(record.field(Field::InvoiceValue))
    } else {
        value
    }
}

/// Total value over all records.
pub fn total_value(dataset: &Dataset) -> f64 {
    dataset.records().map(|r| record_value(&r)).sum()
}

/// Number of distinct, non-empty invoice numbers.
pub fn distinct_invoice_count(dataset: &Dataset) -> usize {
    dataset
        .records()
        .filter_map(|r| r.field(Field::Number))
        .filter(|n| !n.is_empty())
        .collect::<HashSet<_>>()
        .len()
}

#[derive(Default)]
struct Accumulator {
    sum: f64,
    count: usize,
}

impl Accumulator {
    fn finish(&self, operation: Operation) -> f64 {
        match operation {
            Operation::Sum => self.sum,
            Operation::Count => self.count as f64,
            Operation::Avg if self.count == 0 => 0.0,
            Operation::Avg => self.sum / self.count as f64,
        }
    }
}

/// Group records by `group_field`, aggregate `value_field` and keep the
/// top `limit` groups by value.
///
/// Ties keep the order in which the groups first appear in the dataset.
pub fn try_group_and_rank(
    dataset: &Dataset,
    group_field: &str,
    value_field: &str,
    operation: Operation,
    limit: usize,
) -> Result<AggregationResult, AggregationError> {
    for column in [group_field, value_field] {
        if !dataset.has_column(column) {
            return Err(AggregationError::MissingColumn(column.to_string()));
        }
    }

    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Accumulator> = HashMap::new();

    for record in dataset.records() {
        let key = record.get(group_field).unwrap_or(MISSING_GROUP_KEY);
        let value = to_number(record.get(value_field));

        let acc = groups.entry(key).or_insert_with(|| {
            order.push(key);
            Accumulator::default()
        });
        acc.sum += value;
        acc.count += 1;
    }

    let mut entries: Vec<GroupValue> = order
        .into_iter()
        .map(|key| GroupValue {
            key: key.to_string(),
            value: groups.get(key).map(|a| a.finish(operation)).unwrap_or(0.0),
        })
        .collect();

    // stable: equal values keep first-seen order
    entries.sort_by(|a, b| {
        b.value
            .partial_cmp(&a.value)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    entries.truncate(limit);

    Ok(AggregationResult { entries })
}

/// Like [`try_group_and_rank`], but a missing column yields an empty result.
pub fn group_and_rank(
    dataset: &Dataset,
    group_field: &str,
    value_field: &str,
    operation: Operation,
    limit: usize,
) -> AggregationResult {
    try_group_and_rank(dataset, group_field, value_field, operation, limit).unwrap_or_else(|e| {
        debug!("Grouping skipped: {}", e);
        AggregationResult::default()
    })
}

/// Query-driven analysis rules, in the order their findings are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    TotalValue,
    InvoiceCount,
    TopCustomers,
    TopSuppliers,
    TopProducts,
}

impl Trigger {
    pub const ALL: [Trigger; 5] = [
        Trigger::TotalValue,
        Trigger::InvoiceCount,
        Trigger::TopCustomers,
        Trigger::TopSuppliers,
        Trigger::TopProducts,
    ];

    /// Whether this trigger fires for the lower-cased query.
    pub fn fires(&self, query_lower: &str, category: AnalysisCategory) -> bool {
        let has = |word: &str| query_lower.contains(word);
        let ranking = has("top") || has("maior");

        match self {
            Trigger::TotalValue => has("total") && has("valor"),
            Trigger::InvoiceCount => has("quantidade") && (has("notas") || has("fiscal")),
            Trigger::TopCustomers => category == AnalysisCategory::Customer && ranking,
            Trigger::TopSuppliers => category == AnalysisCategory::Supplier && ranking,
            Trigger::TopProducts => has("produto") && ranking,
        }
    }

    /// Compute the finding lines. Empty when there is nothing to report.
    pub fn evaluate(&self, dataset: &Dataset) -> Vec<String> {
        match self {
            Trigger::TotalValue => vec![format!(
                "💰 Valor total das notas fiscais: {}",
                format_currency(total_value(dataset))
            )],
            Trigger::InvoiceCount => vec![format!(
                "📄 Total de notas fiscais únicas: {}",
                distinct_invoice_count(dataset)
            )],
            // recipient column 1 holds the name; issuer column 0 the company
            Trigger::TopCustomers => match dataset.recipient_columns().get(1) {
                Some(column) => ranking_lines(dataset, column, "🏆 Top 5 clientes por valor:", false),
                None => Vec::new(),
            },
            Trigger::TopSuppliers => match dataset.issuer_columns().first() {
                Some(column) => {
                    ranking_lines(dataset, column, "🏆 Top 5 fornecedores por valor:", false)
                }
                None => Vec::new(),
            },
            Trigger::TopProducts => ranking_lines(
                dataset,
                Field::ProductDescription.column(),
                "🏆 Top 5 produtos por valor:",
                true,
            ),
        }
    }
}

fn ranking_lines(dataset: &Dataset, group_field: &str, title: &str, truncate: bool) -> Vec<String> {
    let ranked = group_and_rank(
        dataset,
        group_field,
        dataset.ranking_value_column(),
        Operation::Sum,
        TOP_N,
    );
    if ranked.is_empty() {
        return Vec::new();
    }

    let mut lines = vec![title.to_string()];
    for entry in &ranked.entries {
        let label = if truncate {
            truncate_label(&entry.key)
        } else {
            entry.key.clone()
        };
        lines.push(format!("   • {}: {}", label, format_currency(entry.value)));
    }
    lines
}

/// Run every trigger that fires for `query` and join the findings.
///
/// Falls back to the general summary when no trigger produced output.
pub fn perform_analysis(query: &str, classification: &Classification, dataset: &Dataset) -> String {
    let query_lower = query.to_lowercase();

    let findings: Vec<String> = Trigger::ALL
        .iter()
        .filter(|t| t.fires(&query_lower, classification.category))
        .flat_map(|t| {
            debug!("Trigger fired: {:?}", t);
            t.evaluate(dataset)
        })
        .collect();

    if findings.is_empty() {
        debug!("No trigger produced findings, using general summary");
        return summarize(dataset);
    }

    findings.join("\n")
}
