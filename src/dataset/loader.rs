//! CSV ingestion and the header/items inner join.
//!
//! The header file holds one row per invoice, the items file one row per
//! invoice line. Both carry `CHAVE_ACESSO`; only items whose key exists in
//! the header file survive the join.

use super::Dataset;
use crate::models::Field;
use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Load and join the header and items CSV files.
pub fn load_dataset(header_path: &Path, items_path: &Path, delimiter: u8) -> Result<Dataset> {
    info!("Loading invoice data...");

    let header_file = std::fs::File::open(header_path)
        .with_context(|| format!("Failed to open header CSV: {}", header_path.display()))?;
    let items_file = std::fs::File::open(items_path)
        .with_context(|| format!("Failed to open items CSV: {}", items_path.display()))?;

    join_readers(header_file, items_file, delimiter)
}

/// Join two CSV streams on the access key.
pub fn join_readers<H: Read, I: Read>(header: H, items: I, delimiter: u8) -> Result<Dataset> {
    let key_column = Field::AccessKey.column();

    let mut header_reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(header);
    let header_columns = read_headers(&mut header_reader).context("Failed to read header CSV")?;

    let mut invoices: HashMap<String, StringRecord> = HashMap::new();
    if let Some(key_idx) = header_columns.iter().position(|c| c == key_column) {
        for (row, result) in header_reader.records().enumerate() {
            let record =
                result.with_context(|| format!("Failed to parse header CSV row {}", row + 1))?;
            match record.get(key_idx) {
                Some(key) if !key.is_empty() => {
                    invoices.insert(key.to_string(), record);
                }
                _ => debug!("Header row {} has no access key, skipped", row + 1),
            }
        }
    }
    info!("Header: {} records", invoices.len());

    let mut items_reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(items);
    let item_columns = read_headers(&mut items_reader).context("Failed to read items CSV")?;

    // header columns first, then item-only columns
    let mut columns = header_columns.clone();
    for col in &item_columns {
        if !columns.contains(col) {
            columns.push(col.clone());
        }
    }

    let mut rows = Vec::new();
    if let Some(key_idx) = item_columns.iter().position(|c| c == key_column) {
        for (row, result) in items_reader.records().enumerate() {
            let item =
                result.with_context(|| format!("Failed to parse items CSV row {}", row + 1))?;
            let Some(header_row) = item
                .get(key_idx)
                .filter(|k| !k.is_empty())
                .and_then(|k| invoices.get(k))
            else {
                continue;
            };
            rows.push(merge_row(
                &columns,
                &header_columns,
                header_row,
                &item_columns,
                &item,
            ));
        }
    }
    info!("Merged data: {} records", rows.len());

    if rows.is_empty() {
        return Ok(Dataset::default());
    }

    let dataset = Dataset::from_rows(columns, rows);
    info!("Recipient columns: {:?}", dataset.recipient_columns());
    info!("Issuer columns: {:?}", dataset.issuer_columns());
    info!("Total columns: {}", dataset.columns().len());

    Ok(dataset)
}

fn read_headers<R: Read>(reader: &mut csv::Reader<R>) -> Result<Vec<String>> {
    Ok(reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect())
}

/// Item values override header values on shared column names.
fn merge_row(
    columns: &[String],
    header_columns: &[String],
    header_row: &StringRecord,
    item_columns: &[String],
    item_row: &StringRecord,
) -> Vec<String> {
    columns
        .iter()
        .map(|col| {
            let from_item = item_columns
                .iter()
                .rposition(|c| c == col)
                .and_then(|i| item_row.get(i));
            let from_header = header_columns
                .iter()
                .rposition(|c| c == col)
                .and_then(|i| header_row.get(i));
            from_item.or(from_header).unwrap_or("").to_string()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const HEADER: &str = "CHAVE_ACESSO,NUMERO,DATA_EMISSAO,NOME_DESTINATARIO,RAZAO_SOCIAL_EMITENTE,VALOR_NOTA_FISCAL\n\
k1,100,2024-01-05,Loja A,Fab X,150.00\n\
k2,101,31/01/2024,Loja B,Fab Y,80.00\n\
,102,2024-01-10,Loja C,Fab Z,1.00\n";

    const ITEMS: &str = "CHAVE_ACESSO,NUMERO,DESCRICAO_PRODUTO_SERVICO,QUANTIDADE,VALOR_TOTAL\n\
k1,100,Parafuso,10,100.00\n\
k1,100,Porca,5,50.00\n\
k3,999,Orfao,1,1.00\n\
k2,101-B,Arruela,2,80.00\n";

    #[test]
    fn test_inner_join_keeps_matching_items() {
        let ds = join_readers(HEADER.as_bytes(), ITEMS.as_bytes(), b',').unwrap();
        assert_eq!(ds.len(), 3);

        let descriptions: Vec<_> = ds
            .records()
            .map(|r| r.get("DESCRICAO_PRODUTO_SERVICO").unwrap().to_string())
            .collect();
        assert_eq!(descriptions, vec!["Parafuso", "Porca", "Arruela"]);
    }

    #[test]
    fn test_column_order_header_then_items() {
        let ds = join_readers(HEADER.as_bytes(), ITEMS.as_bytes(), b',').unwrap();
        assert_eq!(
            ds.columns(),
            &[
                "CHAVE_ACESSO",
                "NUMERO",
                "DATA_EMISSAO",
                "NOME_DESTINATARIO",
                "RAZAO_SOCIAL_EMITENTE",
                "VALOR_NOTA_FISCAL",
                "DESCRICAO_PRODUTO_SERVICO",
                "QUANTIDADE",
                "VALOR_TOTAL",
            ]
        );
        assert_eq!(ds.recipient_columns(), &["NOME_DESTINATARIO".to_string()]);
        assert_eq!(ds.issuer_columns(), &["RAZAO_SOCIAL_EMITENTE".to_string()]);
    }

    #[test]
    fn test_item_values_override_header() {
        let ds = join_readers(HEADER.as_bytes(), ITEMS.as_bytes(), b',').unwrap();
        let last = ds.records().last().unwrap();
        assert_eq!(last.get("NUMERO"), Some("101-B"));
        assert_eq!(last.get("NOME_DESTINATARIO"), Some("Loja B"));
    }

    #[test]
    fn test_empty_join_gives_empty_dataset() {
        let items = "CHAVE_ACESSO,VALOR_TOTAL\nzz,1\n";
        let ds = join_readers(HEADER.as_bytes(), items.as_bytes(), b',').unwrap();
        assert!(ds.is_empty());
        assert!(ds.columns().is_empty());
    }

    #[test]
    fn test_semicolon_delimiter() {
        let header = "CHAVE_ACESSO;VALOR_NOTA_FISCAL\nk1;10,50\n";
        let items = "CHAVE_ACESSO;QUANTIDADE\nk1;3\n";
        let ds = join_readers(header.as_bytes(), items.as_bytes(), b';').unwrap();
        let rec = ds.records().next().unwrap();
        assert_eq!(rec.get("VALOR_NOTA_FISCAL"), Some("10,50"));
        assert_eq!(rec.get("QUANTIDADE"), Some("3"));
    }

    #[test]
    fn test_load_dataset_from_files() {
        let temp_dir = TempDir::new().unwrap();
        let header_path = temp_dir.path().join("header.csv");
        let items_path = temp_dir.path().join("items.csv");
        std::fs::write(&header_path, HEADER).unwrap();
        std::fs::write(&items_path, ITEMS).unwrap();

        let ds = load_dataset(&header_path, &items_path, b',').unwrap();
        assert_eq!(ds.len(), 3);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope.csv");
        let err = load_dataset(&missing, &missing, b',').unwrap_err();
        assert!(err.to_string().contains("header CSV"));
    }
}
