//! CSV report parsing.
//!
//! Columns are located by header name, never by position, so upstream column
//! reshuffles don't break the parser. Rows that cannot yield a download URL
//! are dropped and counted; missing auxiliary fields get placeholders.

use thiserror::Error;

/// Column names as the export endpoint emits them.
const COL_ORDER_NO: &str = "Order No.";
const COL_SALE_AMOUNT: &str = "Sale Amount(USD)";
const COL_SUBID: &str = "Customize1 ID";
const COL_CREATE_TIME: &str = "Create Time";

/// One order row with a downloadable file URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRecord {
    pub order_no: String,
    /// Conversion link for this order (the file to download).
    pub file_url: String,
    /// Placeholder "0" when the column is absent or empty.
    pub sale_amount: String,
    pub subid: String,
    /// Placeholder "" when absent.
    pub create_time: String,
}

/// Parse output: records plus the count of rows dropped for having no
/// derivable download URL.
#[derive(Debug, Clone, Default)]
pub struct ParsedReport {
    pub records: Vec<OrderRecord>,
    pub dropped: usize,
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("report has no '{0}' column")]
    MissingColumn(&'static str),
}

fn find_column(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(name))
}

fn field(record: &csv::StringRecord, idx: Option<usize>) -> String {
    idx.and_then(|i| record.get(i))
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

/// Parse report CSV text into order records.
///
/// Deterministic: identical text always yields the identical sequence
/// (records come out sorted by order number, newest first, matching the
/// upstream portal's listing).
pub fn parse_report(csv_text: &str, conversion_base_url: &str) -> Result<ParsedReport, ParseError> {
    if csv_text.trim().is_empty() {
        return Ok(ParsedReport::default());
    }

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(csv_text.as_bytes());

    let headers = reader.headers()?.clone();
    let col_order_no =
        find_column(&headers, COL_ORDER_NO).ok_or(ParseError::MissingColumn(COL_ORDER_NO))?;
    let col_amount = find_column(&headers, COL_SALE_AMOUNT);
    let col_subid = find_column(&headers, COL_SUBID);
    let col_create_time = find_column(&headers, COL_CREATE_TIME);

    let mut out = ParsedReport::default();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }

        let order_no = field(&record, Some(col_order_no));
        let subid = field(&record, col_subid);
        if order_no.is_empty() || subid.is_empty() {
            // No identifier or no subid means no conversion link to fetch.
            out.dropped += 1;
            continue;
        }

        let mut sale_amount = field(&record, col_amount);
        if sale_amount.is_empty() {
            sale_amount = "0".to_string();
        }

        let file_url = format!(
            "{}?subid={}&tid={}&amount={}",
            conversion_base_url, subid, order_no, sale_amount
        );
        out.records.push(OrderRecord {
            order_no,
            file_url,
            sale_amount,
            subid,
            create_time: field(&record, col_create_time),
        });
    }

    out.records.sort_by(|a, b| b.order_no.cmp(&a.order_no));
    if out.dropped > 0 {
        tracing::warn!("dropped {} report rows without a download URL", out.dropped);
    }
    Ok(out)
}
