/// Number of cells a billing table row must have to be exported.
pub const COLUMN_COUNT: usize = 10;

/// Export header, in column order.
pub const HEADERS: [&str; COLUMN_COUNT] = [
    "Type",
    "Client",
    "Project/CO/Contract/Call",
    "Payment Term",
    "Billing Date",
    "Due Date",
    "Total Amount",
    "Requested",
    "Paid",
    "Status",
];

/// One rendered table row: cell texts in column order plus the status badge text.
///
/// Rows are kept as rendered; arity is only checked when mapping to a
/// [`BillingRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Row {
    pub cells: Vec<String>,
    pub status: Option<String>,
}

impl Row {
    pub fn new(cells: Vec<String>) -> Self {
        Self {
            cells,
            status: None,
        }
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingRecord {
    pub kind: String,
    pub client: String,
    pub project: String,
    pub payment_term: String,
    pub billing_date: String,
    pub due_date: String,
    pub total_amount: String,
    pub requested: String,
    pub paid: String,
    pub status: String,
}

impl BillingRecord {
    /// Map a rendered row to a record. Returns `None` unless the row has exactly
    /// [`COLUMN_COUNT`] cells.
    pub fn from_row(row: &Row) -> Option<Self> {
        let cells: &[String; COLUMN_COUNT] = row.cells.as_slice().try_into().ok()?;
        Some(Self {
            kind: clean_text(&cells[0]),
            client: clean_text(&cells[1]),
            project: clean_text(&cells[2]),
            payment_term: clean_text(&cells[3]),
            billing_date: clean_text(&cells[4]),
            due_date: clean_text(&cells[5]),
            total_amount: format_currency(&cells[6]),
            requested: format_currency(&cells[7]),
            paid: format_currency(&cells[8]),
            status: row.status.as_deref().map(clean_text).unwrap_or_default(),
        })
    }

    /// Field values in [`HEADERS`] order.
    pub fn fields(&self) -> [&str; COLUMN_COUNT] {
        [
            &self.kind,
            &self.client,
            &self.project,
            &self.payment_term,
            &self.billing_date,
            &self.due_date,
            &self.total_amount,
            &self.requested,
            &self.paid,
            &self.status,
        ]
    }
}

/// Map rows to records in order, silently dropping rows with the wrong arity.
pub fn records_from_rows(rows: &[Row]) -> Vec<BillingRecord> {
    rows.iter().filter_map(BillingRecord::from_row).collect()
}

/// Collapse every whitespace run to a single space and trim the ends.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strip the leading currency sign and thousands separators; empty becomes `0.00`.
pub fn format_currency(text: &str) -> String {
    let cleaned = clean_text(text).replacen('$', "", 1).replace(',', "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        "0.00".to_string()
    } else {
        cleaned.to_string()
    }
}
