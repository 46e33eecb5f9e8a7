//! Data models for the invoice chat engine.
//!
//! This module contains the core data structures shared by the
//! classifier, the aggregation engine and the response composer.

use serde::Serialize;
use std::fmt;

/// Well-known columns of the merged invoice dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// Access key shared by header and item rows (join key).
    AccessKey,
    /// Invoice number.
    Number,
    /// Issue date.
    IssueDate,
    /// Invoice value (header level).
    InvoiceValue,
    /// Product or service description.
    ProductDescription,
    /// Tariff code (NCM/SH).
    TariffCode,
    /// Tariff code product type.
    TariffCodeType,
    /// Fiscal operation code (CFOP).
    FiscalOperationCode,
    /// Item quantity.
    Quantity,
    /// Item unit.
    Unit,
    /// Item unit value.
    UnitValue,
    /// Item line total.
    LineTotal,
}

impl Field {
    /// Fields describing an invoice, in the order they are presented to the model.
    pub const INVOICE_FIELDS: [Field; 11] = [
        Field::Number,
        Field::IssueDate,
        Field::InvoiceValue,
        Field::ProductDescription,
        Field::TariffCode,
        Field::TariffCodeType,
        Field::FiscalOperationCode,
        Field::Quantity,
        Field::Unit,
        Field::UnitValue,
        Field::LineTotal,
    ];

    /// Column name of this field in the source CSV files.
    pub fn column(&self) -> &'static str {
        match self {
            Field::AccessKey => "CHAVE_ACESSO",
            Field::Number => "NUMERO",
            Field::IssueDate => "DATA_EMISSAO",
            Field::InvoiceValue => "VALOR_NOTA_FISCAL",
            Field::ProductDescription => "DESCRICAO_PRODUTO_SERVICO",
            Field::TariffCode => "CODIGO_NCM_SH",
            Field::TariffCodeType => "NCM_SH_TIPO_PRODUTO",
            Field::FiscalOperationCode => "CFOP",
            Field::Quantity => "QUANTIDADE",
            Field::Unit => "UNIDADE",
            Field::UnitValue => "VALOR_UNITARIO",
            Field::LineTotal => "VALOR_TOTAL",
        }
    }

    /// Column names of the fixed invoice field list.
    pub fn invoice_columns() -> Vec<String> {
        Self::INVOICE_FIELDS
            .iter()
            .map(|f| f.column().to_string())
            .collect()
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.column())
    }
}

/// Analysis category produced by the query classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalysisCategory {
    /// No specific subject recognised.
    General,
    /// Questions about recipients (buyers).
    Customer,
    /// Questions about issuers (sellers).
    Supplier,
    /// Questions about invoices and their items.
    Invoice,
}

impl fmt::Display for AnalysisCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisCategory::General => write!(f, "general"),
            AnalysisCategory::Customer => write!(f, "customer"),
            AnalysisCategory::Supplier => write!(f, "supplier"),
            AnalysisCategory::Invoice => write!(f, "invoice"),
        }
    }
}

/// Output of the classifier: a category and the columns it relates to.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub category: AnalysisCategory,
    pub target_fields: Vec<String>,
}

/// Aggregate operation applied per group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(dead_code)] // Rankings use Sum; Count and Avg are part of the grouping API
pub enum Operation {
    /// Total of the values.
    #[default]
    Sum,
    /// Number of contributing records.
    Count,
    /// Arithmetic mean (zero for an empty group).
    Avg,
}

/// One ranked group.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupValue {
    pub key: String,
    pub value: f64,
}

/// Ranked groups, sorted by value descending and truncated to a limit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregationResult {
    pub entries: Vec<GroupValue>,
}

impl AggregationResult {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns the entries as `(key, value)` pairs.
    #[allow(dead_code)]
    pub fn pairs(&self) -> Vec<(&str, f64)> {
        self.entries
            .iter()
            .map(|e| (e.key.as_str(), e.value))
            .collect()
    }
}

/// Shape of the dataset as presented to the language model.
#[derive(Debug, Clone, Serialize)]
pub struct DataSummary {
    pub total_registros: usize,
    pub campos_nota_fiscal: Vec<String>,
    pub campos_cliente: Vec<String>,
    pub campos_fornecedor: Vec<String>,
}
