//! The merged invoice dataset.
//!
//! Records share a single [`Schema`]. Column lookups go through the schema,
//! so a column that does not exist is reported as `None` rather than as an
//! empty value.

pub mod loader;

pub use loader::load_dataset;

use crate::models::{DataSummary, Field};
use std::collections::HashMap;

/// Suffix identifying recipient (customer) columns.
pub const RECIPIENT_SUFFIX: &str = "DESTINATARIO";
/// Suffix identifying issuer (supplier) columns.
pub const ISSUER_SUFFIX: &str = "EMITENTE";

/// Ordered column list with a name index.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    columns: Vec<String>,
    index: HashMap<String, usize>,
}

impl Schema {
    pub fn new(columns: Vec<String>) -> Self {
        let mut index = HashMap::with_capacity(columns.len());
        for (i, name) in columns.iter().enumerate() {
            // first occurrence wins on duplicated headers
            index.entry(name.clone()).or_insert(i);
        }
        Self { columns, index }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.index.get(column).copied()
    }

    pub fn contains(&self, column: &str) -> bool {
        self.index.contains_key(column)
    }
}

/// Raw values of one merged row, laid out in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    values: Vec<String>,
}

/// A record paired with the schema needed to read it by column name.
#[derive(Debug, Clone, Copy)]
pub struct RecordView<'a> {
    schema: &'a Schema,
    record: &'a Record,
}

impl<'a> RecordView<'a> {
    /// Raw value of `column`, or `None` if the column is not part of the schema.
    pub fn get(&self, column: &str) -> Option<&'a str> {
        self.schema
            .position(column)
            .and_then(|i| self.record.values.get(i))
            .map(String::as_str)
    }

    /// Raw value of a well-known field.
    pub fn field(&self, field: Field) -> Option<&'a str> {
        self.get(field.column())
    }
}

/// Joined invoice records plus the derived party column lists.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    schema: Schema,
    records: Vec<Record>,
    recipient_columns: Vec<String>,
    issuer_columns: Vec<String>,
}

impl Dataset {
    /// Build a dataset from a column list and rows in column order.
    ///
    /// Rows are padded or cut to the column count so every record exposes the
    /// same keys.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = columns.len();
        let records = rows
            .into_iter()
            .map(|mut values| {
                values.resize(width, String::new());
                Record { values }
            })
            .collect();

        let recipient_columns = columns
            .iter()
            .filter(|c| c.ends_with(RECIPIENT_SUFFIX))
            .cloned()
            .collect();
        let issuer_columns = columns
            .iter()
            .filter(|c| c.ends_with(ISSUER_SUFFIX))
            .cloned()
            .collect();

        Self {
            schema: Schema::new(columns),
            records,
            recipient_columns,
            issuer_columns,
        }
    }

    /// Build a dataset from records given as `(column, value)` lists.
    ///
    /// The schema is taken from the first record; values of later records
    /// are matched by column name.
    #[cfg(test)]
    pub fn from_pairs<K, V>(rows: &[Vec<(K, V)>]) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let columns: Vec<String> = rows
            .first()
            .map(|r| r.iter().map(|(k, _)| k.as_ref().to_string()).collect())
            .unwrap_or_default();

        let values = rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|col| {
                        row.iter()
                            .find(|(k, _)| k.as_ref() == col)
                            .map(|(_, v)| v.as_ref().to_string())
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .collect();

        Self::from_rows(columns, values)
    }

    pub fn columns(&self) -> &[String] {
        self.schema.columns()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.schema.contains(column)
    }

    pub fn recipient_columns(&self) -> &[String] {
        &self.recipient_columns
    }

    pub fn issuer_columns(&self) -> &[String] {
        &self.issuer_columns
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate over the records in load order.
    pub fn records(&self) -> impl Iterator<Item = RecordView<'_>> + '_ {
        self.records.iter().map(move |record| RecordView {
            schema: &self.schema,
            record,
        })
    }

    /// Column holding the value used for rankings: `VALOR_TOTAL` when the
    /// schema has it, `VALOR_NOTA_FISCAL` otherwise.
    pub fn ranking_value_column(&self) -> &'static str {
        if self.has_column(Field::LineTotal.column()) {
            Field::LineTotal.column()
        } else {
            Field::InvoiceValue.column()
        }
    }

    /// Dataset shape handed to the language model.
    pub fn summary(&self) -> DataSummary {
        DataSummary {
            total_registros: self.len(),
            campos_nota_fiscal: Field::invoice_columns(),
            campos_cliente: self.recipient_columns.clone(),
            campos_fornecedor: self.issuer_columns.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        Dataset::from_pairs(&[
            vec![
                ("NUMERO", "1"),
                ("CNPJ_DESTINATARIO", "111"),
                ("NOME_DESTINATARIO", "Loja A"),
                ("RAZAO_SOCIAL_EMITENTE", "Fab X"),
                ("VALOR_NOTA_FISCAL", "10,00"),
            ],
            vec![
                ("NUMERO", "2"),
                ("CNPJ_DESTINATARIO", "222"),
                ("NOME_DESTINATARIO", "Loja B"),
                ("RAZAO_SOCIAL_EMITENTE", "Fab Y"),
                ("VALOR_NOTA_FISCAL", "5"),
            ],
        ])
    }

    #[test]
    fn test_party_columns_by_suffix() {
        let ds = sample();
        assert_eq!(
            ds.recipient_columns(),
            &["CNPJ_DESTINATARIO".to_string(), "NOME_DESTINATARIO".to_string()]
        );
        assert_eq!(ds.issuer_columns(), &["RAZAO_SOCIAL_EMITENTE".to_string()]);
    }

    #[test]
    fn test_absent_column_is_none() {
        let ds = sample();
        let first = ds.records().next().unwrap();
        assert_eq!(first.get("NOME_DESTINATARIO"), Some("Loja A"));
        assert_eq!(first.field(Field::LineTotal), None);
    }

    #[test]
    fn test_ranking_value_column_fallback() {
        let ds = sample();
        assert_eq!(ds.ranking_value_column(), "VALOR_NOTA_FISCAL");

        let with_total = Dataset::from_pairs(&[vec![("VALOR_TOTAL", "1")]]);
        assert_eq!(with_total.ranking_value_column(), "VALOR_TOTAL");
    }

    #[test]
    fn test_from_rows_pads_short_rows() {
        let ds = Dataset::from_rows(
            vec!["A".to_string(), "B".to_string()],
            vec![vec!["x".to_string()]],
        );
        let rec = ds.records().next().unwrap();
        assert_eq!(rec.get("B"), Some(""));
    }

    #[test]
    fn test_summary_shape() {
        let summary = sample().summary();
        assert_eq!(summary.total_registros, 2);
        assert_eq!(summary.campos_nota_fiscal.len(), 11);
        assert_eq!(summary.campos_cliente.len(), 2);
    }
}
