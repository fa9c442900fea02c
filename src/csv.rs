use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;
use thiserror::Error;

use crate::Amount;
use crate::amount::ParseAmountError;
use crate::model::{Product, ProductDraft, ProductId, ProductKind};

/// Errors that can occur when reading or writing catalog csv
#[derive(Debug, Error)]
pub enum CsvError {
    #[error("failed to open {path}: {source}")]
    Open { path: String, source: csv::Error },

    #[error("line {line}: failed to parse row: {source}")]
    Parse { line: usize, source: csv::Error },

    #[error("line {line}: unrecognized product type '{product_type}'")]
    UnrecognizedType { line: usize, product_type: String },

    #[error("line {line}: price {source}")]
    InvalidPrice {
        line: usize,
        source: ParseAmountError,
    },

    #[error("line {line}: {product_type} missing {field}")]
    MissingField {
        line: usize,
        product_type: String,
        field: &'static str,
    },

    #[error("failed to write csv: {0}")]
    Write(#[from] csv::Error),

    #[error("failed to flush csv: {0}")]
    Flush(#[from] io::Error),
}

#[derive(Debug, Deserialize)]
struct InputRow {
    r#type: String,
    name: String,
    price: f64,
    quantity: i64,
    warranty_years: Option<i64>,
    expiry_date: Option<String>,
}

#[derive(Debug, Serialize)]
struct OutputRow<'a> {
    r#type: &'static str,
    id: ProductId,
    name: &'a str,
    price: String,
    quantity: u32,
    warranty_years: Option<u32>,
    expiry_date: Option<&'a str>,
}

/// Read product drafts from a csv file.
///
/// Rows are validated later, when the ledger assigns ids; this only checks
/// that each row has the fields its product type needs.
pub fn read_products(
    path: impl AsRef<Path>,
) -> Result<impl Iterator<Item = Result<ProductDraft, CsvError>>, CsvError> {
    let path = path.as_ref();
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| CsvError::Open {
            path: path.display().to_string(),
            source,
        })?;

    Ok(reader
        .into_deserialize::<InputRow>()
        .enumerate()
        .map(|(idx, result)| {
            let line = idx + 2; // 1-indexed, skip header
            let row = result.map_err(|source| CsvError::Parse { line, source })?;
            let price = Amount::try_from(row.price)
                .map_err(|source| CsvError::InvalidPrice { line, source })?;
            match row.r#type.as_str() {
                "Electronic" | "electronic" => {
                    let warranty_years =
                        row.warranty_years.ok_or_else(|| CsvError::MissingField {
                            line,
                            product_type: row.r#type.clone(),
                            field: "warranty_years",
                        })?;
                    Ok(ProductDraft::electronic(
                        row.name,
                        price,
                        row.quantity,
                        warranty_years,
                    ))
                }
                "Food" | "food" => {
                    let expiry_date = row
                        .expiry_date
                        .filter(|d| !d.is_empty())
                        .ok_or_else(|| CsvError::MissingField {
                            line,
                            product_type: row.r#type.clone(),
                            field: "expiry_date",
                        })?;
                    Ok(ProductDraft::food(row.name, price, row.quantity, expiry_date))
                }
                other => Err(CsvError::UnrecognizedType {
                    line,
                    product_type: other.to_string(),
                }),
            }
        }))
}

/// Write the catalog in csv format
pub fn write_products<'a>(
    products: impl IntoIterator<Item = &'a Product>,
    writer: impl io::Write,
) -> Result<(), CsvError> {
    let mut writer = csv::Writer::from_writer(writer);

    for product in products {
        let (warranty_years, expiry_date) = match product.kind() {
            ProductKind::Electronic { warranty_years } => (Some(*warranty_years), None),
            ProductKind::Food { expiry_date } => (None, Some(expiry_date.as_str())),
        };
        writer.serialize(OutputRow {
            r#type: product.kind().label(),
            id: product.id(),
            name: product.name(),
            price: product.price().to_string(),
            quantity: product.quantity(),
            warranty_years,
            expiry_date,
        })?;
    }

    writer.flush()?;
    Ok(())
}

/// Write the catalog to stdout
pub fn write_products_stdout<'a>(
    products: impl IntoIterator<Item = &'a Product>,
) -> Result<(), CsvError> {
    let stdout = io::stdout();
    write_products(products, stdout.lock())
}
