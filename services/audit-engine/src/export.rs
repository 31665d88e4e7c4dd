//! Spreadsheet export of whole tables, one worksheet per table.

use lazy_static::lazy_static;
use regex::Regex;
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::database::Database;

/// Excel's limit on worksheet name length.
pub const SHEET_NAME_LIMIT: usize = 31;

pub const EXPORT_FILENAME: &str = "datos_auditoria.xlsx";

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

lazy_static! {
    static ref TABLE_NAME: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex");
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("No tables selected")]
    NoTablesSelected,

    #[error("Unknown table: {0}")]
    UnknownTable(String),

    #[error("Table {table} does not fit in a worksheet")]
    TooLarge { table: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Spreadsheet error: {0}")]
    Xlsx(#[from] XlsxError),
}

/// Column names plus rows keyed by column name.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSheet {
    pub table: String,
    pub columns: Vec<String>,
    pub rows: Vec<Map<String, Value>>,
}

pub fn sheet_name(table: &str) -> String {
    table.chars().take(SHEET_NAME_LIMIT).collect()
}

/// Read every requested table and render them into an xlsx workbook.
pub async fn export_tables(db: &Database, tables: &[String]) -> Result<Vec<u8>, ExportError> {
    if tables.is_empty() {
        return Err(ExportError::NoTablesSelected);
    }

    let mut sheets = Vec::with_capacity(tables.len());
    for table in dedup_preserving_order(tables) {
        sheets.push(load_sheet(db, table).await?);
    }

    build_workbook(&sheets)
}

async fn load_sheet(db: &Database, table: &str) -> Result<TableSheet, ExportError> {
    if !TABLE_NAME.is_match(table) {
        return Err(ExportError::UnknownTable(table.to_string()));
    }

    let mut conn = db.pool().acquire().await?;

    let columns = sqlx::query_scalar::<_, String>(
        "SELECT column_name::TEXT
         FROM information_schema.columns
         WHERE table_schema::TEXT = current_schema() AND table_name::TEXT = $1
         ORDER BY ordinal_position",
    )
    .bind(table)
    .fetch_all(&mut *conn)
    .await?;

    if columns.is_empty() {
        return Err(ExportError::UnknownTable(table.to_string()));
    }

    // Safe to quote: the name matched TABLE_NAME and exists in the schema.
    let sql = format!("SELECT to_jsonb(t) FROM \"{}\" t", table);
    let rows = sqlx::query_scalar::<_, Value>(&sql)
        .fetch_all(&mut *conn)
        .await?
        .into_iter()
        .map(|row| match row {
            Value::Object(map) => map,
            _ => Map::new(),
        })
        .collect();

    Ok(TableSheet {
        table: table.to_string(),
        columns,
        rows,
    })
}

pub fn build_workbook(sheets: &[TableSheet]) -> Result<Vec<u8>, ExportError> {
    if sheets.is_empty() {
        return Err(ExportError::NoTablesSelected);
    }

    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    for sheet in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet_name(&sheet.table))?;
        write_sheet(worksheet, sheet, &header_format)?;
    }

    Ok(workbook.save_to_buffer()?)
}

fn write_sheet(
    worksheet: &mut Worksheet,
    sheet: &TableSheet,
    header: &Format,
) -> Result<(), ExportError> {
    let too_large = || ExportError::TooLarge {
        table: sheet.table.clone(),
    };

    for (col, name) in sheet.columns.iter().enumerate() {
        let col = u16::try_from(col).map_err(|_| too_large())?;
        worksheet.write_string_with_format(0, col, name, header)?;
    }

    for (idx, row) in sheet.rows.iter().enumerate() {
        let row_num = u32::try_from(idx + 1).map_err(|_| too_large())?;

        for (col, name) in sheet.columns.iter().enumerate() {
            let col = u16::try_from(col).map_err(|_| too_large())?;

            match row.get(name) {
                None | Some(Value::Null) => {}
                Some(Value::Bool(b)) => {
                    worksheet.write_boolean(row_num, col, *b)?;
                }
                Some(Value::Number(n)) => match n.as_f64() {
                    Some(f) => {
                        worksheet.write_number(row_num, col, f)?;
                    }
                    None => {
                        worksheet.write_string(row_num, col, n.to_string())?;
                    }
                },
                Some(Value::String(s)) => {
                    worksheet.write_string(row_num, col, s)?;
                }
                Some(other) => {
                    worksheet.write_string(row_num, col, other.to_string())?;
                }
            }
        }
    }

    Ok(())
}

fn dedup_preserving_order(tables: &[String]) -> Vec<&str> {
    let mut seen = std::collections::HashSet::new();
    tables
        .iter()
        .map(|t| t.trim())
        .filter(|t| seen.insert(*t))
        .collect()
}
