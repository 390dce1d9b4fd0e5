use std::path::{Path, PathBuf};

use billing_core::{BillingRecord, ExportFormat, COLUMN_COUNT, HEADERS};
use billing_logging::billing_info;
use csv::{QuoteStyle, Terminator, WriterBuilder};
use rust_xlsxwriter::{Format, Workbook, XlsxError};

use crate::persist::{write_atomically, PersistError};

pub const SHEET_NAME: &str = "Billing Data";

const FILE_PREFIX: &str = "d-tools-billing";
const UTF8_BOM: &str = "\u{FEFF}";
const COLUMN_WIDTHS_PX: [u16; COLUMN_COUNT] = [120, 150, 200, 120, 100, 100, 120, 100, 100, 100];
/// Total Amount, Requested, Paid.
const AMOUNT_COLUMNS: [usize; 3] = [6, 7, 8];

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("csv buffer error: {0}")]
    CsvBuffer(String),
    #[error("spreadsheet error: {0}")]
    Spreadsheet(#[from] XlsxError),
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
}

/// `d-tools-billing-{date}.{extension}`
pub fn export_filename(date: &str, extension: &str) -> String {
    format!("{FILE_PREFIX}-{date}.{extension}")
}

/// CSV text with a UTF-8 BOM so spreadsheet apps pick the right encoding.
/// Fields are quoted only when they hold a comma, quote or line break.
pub fn build_csv(records: &[BillingRecord]) -> Result<Vec<u8>, ExportError> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(UTF8_BOM.as_bytes().to_vec());
    writer.write_record(HEADERS)?;
    for record in records {
        writer.write_record(record.fields())?;
    }
    writer
        .into_inner()
        .map_err(|err| ExportError::CsvBuffer(err.to_string()))
}

pub fn build_xlsx(records: &[BillingRecord]) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let amount_format = Format::new().set_num_format("0.00");

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    for (col, (title, width)) in HEADERS.iter().zip(COLUMN_WIDTHS_PX).enumerate() {
        let col = col as u16;
        worksheet.set_column_width_pixels(col, width)?;
        worksheet.write_string_with_format(0, col, *title, &header_format)?;
    }

    for (index, record) in records.iter().enumerate() {
        let row = index as u32 + 1;
        for (col, value) in record.fields().into_iter().enumerate() {
            let amount = AMOUNT_COLUMNS
                .contains(&col)
                .then(|| value.parse::<f64>().ok())
                .flatten();
            let col = col as u16;
            match amount {
                Some(number) => {
                    worksheet.write_number_with_format(row, col, number, &amount_format)?;
                }
                None => {
                    worksheet.write_string(row, col, value)?;
                }
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

/// Writes the requested formats into `output_dir`, returning the paths written.
pub fn write_exports(
    output_dir: &Path,
    records: &[BillingRecord],
    format: ExportFormat,
    date: &str,
) -> Result<Vec<PathBuf>, ExportError> {
    let mut written = Vec::new();

    if format.includes_csv() {
        let path = write_atomically(
            output_dir,
            &export_filename(date, "csv"),
            &build_csv(records)?,
        )?;
        billing_info!("Wrote {} records to {:?}", records.len(), path);
        written.push(path);
    }
    if format.includes_xlsx() {
        let path = write_atomically(
            output_dir,
            &export_filename(date, "xlsx"),
            &build_xlsx(records)?,
        )?;
        billing_info!("Wrote {} records to {:?}", records.len(), path);
        written.push(path);
    }

    Ok(written)
}
