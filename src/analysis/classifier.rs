//! Keyword-driven query classifier.
//!
//! Rules are evaluated in table order and the first match wins, so a query
//! mentioning both customers and suppliers is a customer query.

use crate::dataset::Dataset;
use crate::models::{AnalysisCategory, Classification, Field};

/// Which columns a rule points the engine at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSelector {
    /// Columns ending in `DESTINATARIO`.
    Recipient,
    /// Columns ending in `EMITENTE`.
    Issuer,
    /// The fixed invoice field list.
    Invoice,
}

impl FieldSelector {
    pub fn select(&self, dataset: &Dataset) -> Vec<String> {
        match self {
            FieldSelector::Recipient => dataset.recipient_columns().to_vec(),
            FieldSelector::Issuer => dataset.issuer_columns().to_vec(),
            FieldSelector::Invoice => Field::invoice_columns(),
        }
    }
}

/// One row of the classification table.
#[derive(Debug, Clone, Copy)]
pub struct ClassifierRule {
    pub category: AnalysisCategory,
    pub keywords: &'static [&'static str],
    pub fields: FieldSelector,
}

impl ClassifierRule {
    /// Whether the lower-cased query contains any of the rule's keywords.
    pub fn matches(&self, query_lower: &str) -> bool {
        self.keywords.iter().any(|k| query_lower.contains(k))
    }
}

/// Classification rules in priority order.
pub const RULES: [ClassifierRule; 3] = [
    ClassifierRule {
        category: AnalysisCategory::Customer,
        keywords: &["cliente", "destinatário", "comprador", "destinatario"],
        fields: FieldSelector::Recipient,
    },
    ClassifierRule {
        category: AnalysisCategory::Supplier,
        keywords: &["fornecedor", "emitente", "vendedor"],
        fields: FieldSelector::Issuer,
    },
    ClassifierRule {
        category: AnalysisCategory::Invoice,
        keywords: &["nota", "fiscal", "produto", "valor", "quantidade"],
        fields: FieldSelector::Invoice,
    },
];

/// Classify a free-text query. Falls back to [`AnalysisCategory::General`].
pub fn classify(query: &str, dataset: &Dataset) -> Classification {
    let query_lower = query.to_lowercase();

    RULES
        .iter()
        .find(|rule| rule.matches(&query_lower))
        .map(|rule| Classification {
            category: rule.category,
            target_fields: rule.fields.select(dataset),
        })
        .unwrap_or(Classification {
            category: AnalysisCategory::General,
            target_fields: Vec::new(),
        })
}
