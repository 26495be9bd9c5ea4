//! Paginated table model behind every list view.
//!
//! Columns read a field by key or run a render closure. Badge tones are fixed
//! when the column is built: a `status` column uses the status palette and a
//! `role` column the role palette.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::error::TableError;
use crate::models::{AgentTrader, Challenge, Commission, KycSubmission, Payment, User};
use crate::status::{classify_role, classify_status, Tone};

pub const DEFAULT_EMPTY_MESSAGE: &str = "No data available";

/// Row that can be shown in a [`DataTable`].
pub trait TableRow {
    /// Display text of the field named `key`, if the row has it.
    fn field(&self, key: &str) -> Option<String>;

    /// Stable identity used for selection.
    fn row_id(&self) -> Option<String> {
        self.field("id")
    }
}

impl TableRow for Value {
    fn field(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Number(n) => Some(n.to_string()),
            other => Some(other.to_string()),
        }
    }
}

fn opt<T: ToString>(value: &Option<T>) -> Option<String> {
    value.as_ref().map(ToString::to_string)
}

fn date(value: &Option<DateTime<Utc>>) -> Option<String> {
    value.map(|d| d.format("%Y-%m-%d").to_string())
}

impl TableRow for User {
    fn field(&self, key: &str) -> Option<String> {
        match key {
            "id" => Some(self.id.to_string()),
            "name" => Some(self.full_name()),
            "email" => Some(self.email.clone()),
            "role" => Some(self.role.as_str().to_string()),
            "status" => Some(if self.is_active { "active" } else { "inactive" }.to_string()),
            "kyc_status" => Some(self.kyc_status.as_str().to_string()),
            "phone" => self.phone.clone(),
            "created_at" => date(&self.created_at),
            "last_login_at" => date(&self.last_login_at),
            _ => None,
        }
    }
}

impl TableRow for Challenge {
    fn field(&self, key: &str) -> Option<String> {
        match key {
            "id" => Some(self.id.to_string()),
            "program" => self.program.as_ref().map(|p| p.name.clone()),
            "status" => Some(self.status.as_str().to_string()),
            "account_number" => self.account_number.clone(),
            "current_balance" => opt(&self.current_balance),
            "progress" => Some(format!("{:.0}%", self.progress)),
            "total_profit" => Some(self.total_profit.unwrap_or(0.0).to_string()),
            "phase" => match (self.current_phase, self.total_phases) {
                (Some(current), Some(total)) => Some(format!("{}/{}", current, total)),
                _ => None,
            },
            "payment_status" => self.payment_status.clone(),
            "created_at" => date(&self.created_at),
            _ => None,
        }
    }
}

impl TableRow for Payment {
    fn field(&self, key: &str) -> Option<String> {
        match key {
            "id" => Some(self.id.to_string()),
            "transaction_id" => self.transaction_id.clone(),
            "user_id" => opt(&self.user_id),
            "amount" => Some(self.amount.to_string()),
            "currency" => self.currency.clone(),
            "status" => Some(self.status.as_str().to_string()),
            "payment_method" => self.payment_method.clone(),
            "created_at" => date(&self.created_at),
            _ => None,
        }
    }
}

impl TableRow for Commission {
    fn field(&self, key: &str) -> Option<String> {
        match key {
            "id" => opt(&self.id),
            "date" => date(&self.date),
            "trader" => Some(self.trader.name.clone()),
            "type" => Some(self.kind.as_str().to_string()),
            "program" => self.program.clone(),
            "rate" => Some(format!("{}%", self.rate)),
            "amount" => Some(self.amount.to_string()),
            "status" => Some(self.status.as_str().to_string()),
            "payout_date" => date(&self.payout_date),
            _ => None,
        }
    }
}

impl TableRow for KycSubmission {
    fn field(&self, key: &str) -> Option<String> {
        match key {
            "id" => Some(self.id.to_string()),
            "name" => Some(self.full_name()),
            "email" => Some(self.email.clone()),
            "document_type" => self.document_type.clone(),
            "submitted_at" => date(&self.submitted_at),
            "status" => Some(self.status.as_str().to_string()),
            "documents" => Some(self.documents().len().to_string()),
            _ => None,
        }
    }
}

impl TableRow for AgentTrader {
    fn field(&self, key: &str) -> Option<String> {
        match key {
            "id" => Some(self.id.to_string()),
            "name" => Some(self.name.clone()),
            "email" => Some(self.email.clone()),
            "status" => Some(self.status.as_str().to_string()),
            "current_balance" => Some(self.current_balance.to_string()),
            "profit_loss" => Some(self.profit_loss.to_string()),
            "total_trades" => Some(self.total_trades.to_string()),
            "win_rate" => Some(format!("{}%", self.win_rate)),
            _ => None,
        }
    }
}

type RenderFn<T> = Box<dyn Fn(&T) -> String + Send + Sync>;

pub enum CellSource<T> {
    Field,
    Render(RenderFn<T>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Badge {
    Plain,
    Status,
    Role,
}

impl Badge {
    fn for_key(key: &str) -> Self {
        match key {
            "status" => Badge::Status,
            "role" => Badge::Role,
            _ => Badge::Plain,
        }
    }

    fn tone(&self, text: &str) -> Option<Tone> {
        match self {
            Badge::Plain => None,
            Badge::Status => Some(classify_status(text)),
            Badge::Role => Some(classify_role(text)),
        }
    }
}

pub struct Column<T> {
    key: String,
    label: String,
    source: CellSource<T>,
    badge: Badge,
}

impl<T> fmt::Debug for Column<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column")
            .field("key", &self.key)
            .field("label", &self.label)
            .field("badge", &self.badge)
            .finish()
    }
}

impl<T: TableRow> Column<T> {
    /// Column showing the row's `key` field.
    pub fn field(key: impl Into<String>, label: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            badge: Badge::for_key(&key),
            key,
            label: label.into(),
            source: CellSource::Field,
        }
    }

    /// Column computed from the whole row. Custom renders carry no badge.
    pub fn render<F>(key: impl Into<String>, label: impl Into<String>, render: F) -> Self
    where
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        Self {
            key: key.into(),
            label: label.into(),
            source: CellSource::Render(Box::new(render)),
            badge: Badge::Plain,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn badge(&self) -> Badge {
        self.badge
    }

    pub fn cell(&self, row: &T) -> Cell {
        match &self.source {
            CellSource::Render(render) => Cell::plain(render(row)),
            CellSource::Field => {
                let text = row.field(&self.key).unwrap_or_default();
                let tone = self.badge.tone(&text);
                Cell { text, tone }
            }
        }
    }
}

/// Column descriptor as written in configuration: either `{key, label}` or
/// the older `{field, headerName}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ColumnSpec {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default, rename = "headerName")]
    pub header_name: Option<String>,
}

impl ColumnSpec {
    /// `None` when the descriptor names no key at all.
    pub fn into_column<T: TableRow>(self) -> Option<Column<T>> {
        let key = self.key.or(self.field)?;
        let label = self.label.or(self.header_name).unwrap_or_else(|| key.clone());
        Some(Column::field(key, label))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub text: String,
    pub tone: Option<Tone>,
}

impl Cell {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tone: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
    /// Zero-based.
    pub page: usize,
    pub page_count: usize,
    /// `(first, last, total)`, 1-based and inclusive.
    pub showing: (usize, usize, usize),
    pub paginated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableView {
    Loading,
    Empty(String),
    Page(RenderedPage),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectAll {
    None,
    Indeterminate,
    All,
}

pub struct DataTable<T> {
    columns: Vec<Column<T>>,
    rows: Vec<T>,
    page: usize,
    page_size: usize,
    loading: bool,
    empty_message: String,
    selected: BTreeSet<String>,
}

impl<T: TableRow> DataTable<T> {
    pub fn new(columns: Vec<Column<T>>, page_size: usize) -> Result<Self, TableError> {
        if page_size == 0 {
            return Err(TableError::ZeroPageSize);
        }
        Ok(Self {
            columns,
            rows: Vec::new(),
            page: 0,
            page_size,
            loading: false,
            empty_message: DEFAULT_EMPTY_MESSAGE.to_string(),
            selected: BTreeSet::new(),
        })
    }

    pub fn with_empty_message(mut self, message: impl Into<String>) -> Self {
        self.empty_message = message.into();
        self
    }

    pub fn with_rows(mut self, rows: Vec<T>) -> Self {
        self.set_rows(rows);
        self
    }

    /// Replace the rows, keeping the page when it still exists and dropping
    /// selections of rows that are gone.
    pub fn set_rows(&mut self, rows: Vec<T>) {
        self.rows = rows;
        self.loading = false;
        self.page = self.page.min(self.page_count().saturating_sub(1));
        let ids: BTreeSet<String> = self.rows.iter().filter_map(TableRow::row_id).collect();
        self.selected.retain(|id| ids.contains(id));
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    pub fn columns(&self) -> &[Column<T>] {
        &self.columns
    }

    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn page_count(&self) -> usize {
        self.rows.len().div_ceil(self.page_size)
    }

    pub fn set_page_size(&mut self, page_size: usize) -> Result<(), TableError> {
        if page_size == 0 {
            return Err(TableError::ZeroPageSize);
        }
        self.page_size = page_size;
        self.page = 0;
        Ok(())
    }

    pub fn next_page(&mut self) {
        self.page = (self.page + 1).min(self.page_count().saturating_sub(1));
    }

    pub fn previous_page(&mut self) {
        self.page = self.page.saturating_sub(1);
    }

    pub fn has_next(&self) -> bool {
        self.page + 1 < self.page_count()
    }

    pub fn has_previous(&self) -> bool {
        self.page > 0
    }

    fn bounds(&self) -> (usize, usize) {
        let start = (self.page * self.page_size).min(self.rows.len());
        let end = (start + self.page_size).min(self.rows.len());
        (start, end)
    }

    pub fn page_rows(&self) -> &[T] {
        let (start, end) = self.bounds();
        &self.rows[start..end]
    }

    /// "Showing a to b of n".
    pub fn showing(&self) -> (usize, usize, usize) {
        let (start, end) = self.bounds();
        if self.rows.is_empty() {
            (0, 0, 0)
        } else {
            (start + 1, end, self.rows.len())
        }
    }

    /// Controls are only shown when the rows do not fit on one page.
    pub fn needs_pagination(&self) -> bool {
        self.rows.len() > self.page_size
    }

    pub fn view(&self) -> TableView {
        if self.loading {
            return TableView::Loading;
        }
        if self.rows.is_empty() {
            return TableView::Empty(self.empty_message.clone());
        }

        let rows = self
            .page_rows()
            .iter()
            .map(|row| self.columns.iter().map(|c| c.cell(row)).collect())
            .collect();

        TableView::Page(RenderedPage {
            headers: self.columns.iter().map(|c| c.label.clone()).collect(),
            rows,
            page: self.page,
            page_count: self.page_count(),
            showing: self.showing(),
            paginated: self.needs_pagination(),
        })
    }

    pub fn toggle_selected(&mut self, id: &str) {
        if !self.selected.remove(id) {
            self.selected.insert(id.to_string());
        }
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.contains(id)
    }

    pub fn selected_ids(&self) -> impl Iterator<Item = &str> {
        self.selected.iter().map(String::as_str)
    }

    /// Select every row, or clear the selection when everything is already selected.
    pub fn toggle_all(&mut self) {
        if self.select_all_state() == SelectAll::All {
            self.selected.clear();
        } else {
            self.selected = self.rows.iter().filter_map(TableRow::row_id).collect();
        }
    }

    pub fn select_all_state(&self) -> SelectAll {
        let selectable = self.rows.iter().filter_map(TableRow::row_id).count();
        match self.selected.len() {
            0 => SelectAll::None,
            n if n >= selectable => SelectAll::All,
            _ => SelectAll::Indeterminate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq)]
    struct Numbered(usize);

    impl TableRow for Numbered {
        fn field(&self, key: &str) -> Option<String> {
            match key {
                "id" => Some(self.0.to_string()),
                _ => None,
            }
        }
    }

    fn numbered(n: usize) -> Vec<Numbered> {
        (0..n).map(Numbered).collect()
    }

    fn user_rows() -> Vec<Value> {
        vec![
            json!({"id": 1, "email": "a@x.io", "role": "admin", "status": "Active"}),
            json!({"id": 2, "email": "b@x.io", "role": "trader", "status": "pending"}),
            json!({"id": 3, "email": "c@x.io", "role": "agent", "status": null}),
        ]
    }

    #[test]
    fn zero_page_size_is_rejected() {
        assert_eq!(
            DataTable::<Value>::new(vec![], 0).err(),
            Some(TableError::ZeroPageSize)
        );
        let mut table = DataTable::<Value>::new(vec![], 5).unwrap();
        assert_eq!(table.set_page_size(0), Err(TableError::ZeroPageSize));
    }

    #[test]
    fn twenty_five_rows_in_pages_of_ten() {
        let mut table = DataTable::new(vec![Column::field("id", "ID")], 10)
            .unwrap()
            .with_rows(numbered(25));

        assert_eq!(table.page_count(), 3);
        assert!(table.needs_pagination());
        assert_eq!(table.showing(), (1, 10, 25));

        table.next_page();
        table.next_page();
        assert_eq!(table.page_rows().len(), 5);
        assert_eq!(table.showing(), (21, 25, 25));

        table.next_page();
        assert_eq!(table.page(), 2);

        table.set_page_size(20).unwrap();
        assert_eq!(table.page(), 0);
        table.previous_page();
        assert_eq!(table.page(), 0);
    }

    #[test]
    fn badges_follow_column_key() {
        let table = DataTable::new(
            vec![
                Column::field("email", "Email"),
                Column::field("role", "Role"),
                Column::field("status", "Status"),
                Column::render("actions", "Actions", |row: &Value| {
                    format!("edit #{}", row.field("id").unwrap_or_default())
                }),
            ],
            10,
        )
        .unwrap()
        .with_rows(user_rows());

        let TableView::Page(page) = table.view() else {
            panic!("expected a page");
        };
        assert_eq!(page.headers, vec!["Email", "Role", "Status", "Actions"]);
        assert!(!page.paginated);
        assert_eq!(page.rows[0][0], Cell::plain("a@x.io"));
        assert_eq!(page.rows[0][1].tone, Some(Tone::Purple));
        assert_eq!(page.rows[0][2].tone, Some(Tone::Success));
        assert_eq!(page.rows[1][2].tone, Some(Tone::Warning));
        assert_eq!(page.rows[2][2], Cell { text: String::new(), tone: Some(Tone::Neutral) });
        assert_eq!(page.rows[1][3], Cell::plain("edit #2"));
    }

    #[test]
    fn loading_and_empty_views() {
        let mut table = DataTable::<Value>::new(vec![Column::field("id", "ID")], 10).unwrap();
        assert_eq!(table.view(), TableView::Empty("No data available".into()));
        assert_eq!(table.showing(), (0, 0, 0));

        table.set_loading(true);
        assert_eq!(table.view(), TableView::Loading);

        let custom = DataTable::<Value>::new(vec![], 10)
            .unwrap()
            .with_empty_message("No users found");
        assert_eq!(custom.view(), TableView::Empty("No users found".into()));
    }

    #[test]
    fn legacy_column_shapes() {
        let specs: Vec<ColumnSpec> = serde_json::from_value(json!([
            {"field": "email", "headerName": "Email"},
            {"key": "status", "label": "Status"},
            {"key": "role"},
            {"headerName": "Orphan"}
        ]))
        .unwrap();
        let columns: Vec<Column<Value>> =
            specs.into_iter().filter_map(ColumnSpec::into_column).collect();

        assert_eq!(columns.len(), 3);
        assert_eq!((columns[0].key(), columns[0].label()), ("email", "Email"));
        assert_eq!(columns[1].badge(), Badge::Status);
        assert_eq!((columns[2].key(), columns[2].label()), ("role", "role"));
    }

    #[test]
    fn selection_tracks_partial_and_full() {
        let mut table = DataTable::new(vec![Column::field("id", "ID")], 2)
            .unwrap()
            .with_rows(user_rows());
        assert_eq!(table.select_all_state(), SelectAll::None);

        table.toggle_selected("2");
        assert!(table.is_selected("2"));
        assert_eq!(table.select_all_state(), SelectAll::Indeterminate);

        table.toggle_all();
        assert_eq!(table.select_all_state(), SelectAll::All);
        assert_eq!(table.selected_ids().collect::<Vec<_>>(), vec!["1", "2", "3"]);

        table.set_rows(user_rows().into_iter().take(1).collect());
        assert_eq!(table.selected_ids().collect::<Vec<_>>(), vec!["1"]);

        table.toggle_all();
        assert_eq!(table.select_all_state(), SelectAll::None);
    }

    proptest! {
        #[test]
        fn pages_partition_rows(len in 0usize..200, size in 1usize..40) {
            let mut table = DataTable::new(vec![Column::field("id", "ID")], size)
                .unwrap()
                .with_rows(numbered(len));

            prop_assert_eq!(table.page_count(), (len + size - 1) / size);
            prop_assert_eq!(table.needs_pagination(), len > size);

            let mut seen = Vec::new();
            for _ in 0..table.page_count() {
                let page = table.page_rows();
                prop_assert!(page.len() <= size);
                prop_assert!(!page.is_empty());
                seen.extend_from_slice(page);
                table.next_page();
            }
            prop_assert_eq!(seen, numbered(len));
            prop_assert_eq!(table.page(), table.page_count().saturating_sub(1));
        }

        #[test]
        fn navigation_stays_in_range(
            len in 0usize..100,
            size in 1usize..20,
            moves in proptest::collection::vec(any::<bool>(), 0..50)
        ) {
            let mut table = DataTable::new(vec![], size).unwrap().with_rows(numbered(len));
            for forward in moves {
                if forward { table.next_page() } else { table.previous_page() }
                prop_assert!(table.page() < table.page_count().max(1));
                let (first, last, total) = table.showing();
                prop_assert!(first <= last && last <= total);
            }
        }
    }
}
