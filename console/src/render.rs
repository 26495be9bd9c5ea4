use shared::table::{Cell, RenderedPage};
use shared::{DataTable, TableRow, TableView};

const RESET: &str = "\x1b[0m";

/// The table currently on screen, kept so /next and /prev can page through it.
pub trait Pager: Send {
    fn next(&mut self);
    fn previous(&mut self);
    fn render(&self, color: bool) -> String;
}

impl<T: TableRow + Send> Pager for DataTable<T> {
    fn next(&mut self) {
        self.next_page();
    }

    fn previous(&mut self) {
        self.previous_page();
    }

    fn render(&self, color: bool) -> String {
        render_view(&self.view(), color)
    }
}

pub fn render_view(view: &TableView, color: bool) -> String {
    match view {
        TableView::Loading => "Loading...".to_string(),
        TableView::Empty(message) => message.clone(),
        TableView::Page(page) => render_page(page, color),
    }
}

fn render_page(page: &RenderedPage, color: bool) -> String {
    let mut widths: Vec<usize> = page.headers.iter().map(|h| h.chars().count()).collect();
    for row in &page.rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(i) {
                *width = (*width).max(cell.text.chars().count());
            }
        }
    }

    let mut out = String::new();
    let header: Vec<String> = page
        .headers
        .iter()
        .zip(&widths)
        .map(|(h, w)| format!("{:<w$}", h.to_uppercase(), w = *w))
        .collect();
    out.push_str(header.join("  ").trim_end());
    out.push('\n');
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&rule.join("  "));
    out.push('\n');

    for row in &page.rows {
        let cells: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, w)| paint(cell, *w, color))
            .collect();
        out.push_str(cells.join("  ").trim_end());
        out.push('\n');
    }

    if page.paginated {
        let (first, last, total) = page.showing;
        out.push_str(&format!(
            "Showing {} to {} of {} results | Page {} of {} (/prev, /next)\n",
            first,
            last,
            total,
            page.page + 1,
            page.page_count.max(1)
        ));
    }
    out
}

/// Pad first so escape codes do not count towards the column width.
fn paint(cell: &Cell, width: usize, color: bool) -> String {
    let padded = format!("{:<width$}", cell.text, width = width);
    match (cell.tone, color) {
        (Some(tone), true) => {
            let trimmed = padded.trim_end();
            let pad = padded.len() - trimmed.len();
            format!("{}{}{}{}", tone.ansi(), trimmed, RESET, " ".repeat(pad))
        }
        _ => padded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shared::Column;

    fn table(rows: usize) -> DataTable<serde_json::Value> {
        let rows = (1..=rows)
            .map(|i| json!({"id": i, "status": if i % 2 == 0 { "active" } else { "pending" }}))
            .collect();
        DataTable::new(
            vec![Column::field("id", "ID"), Column::field("status", "Status")],
            2,
        )
        .unwrap()
        .with_rows(rows)
    }

    #[test]
    fn plain_render_has_header_rule_and_footer() {
        let out = table(3).render(false);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "ID  STATUS");
        assert_eq!(lines[1], "--  -------");
        assert_eq!(lines[2], "1   pending");
        assert_eq!(lines[4], "Showing 1 to 2 of 3 results | Page 1 of 2 (/prev, /next)");
    }

    #[test]
    fn pager_moves_between_pages() {
        let mut pager: Box<dyn Pager> = Box::new(table(3));
        pager.next();
        assert!(pager.render(false).contains("Showing 3 to 3 of 3"));
        pager.previous();
        assert!(pager.render(false).contains("Showing 1 to 2 of 3"));
    }

    #[test]
    fn colored_badges_keep_alignment() {
        let out = table(2).render(true);
        assert!(out.contains("\x1b[33mpending\x1b[0m"));
        assert!(out.contains("\x1b[32mactive\x1b[0m"));
        assert!(!out.contains("Showing"));
    }

    #[test]
    fn empty_and_loading() {
        let mut empty = DataTable::<serde_json::Value>::new(vec![], 10).unwrap();
        assert_eq!(empty.render(false), "No data available");
        empty.set_loading(true);
        assert_eq!(empty.render(false), "Loading...");
    }
}
