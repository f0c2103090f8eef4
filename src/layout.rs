//! Report layout: turns a filtered transaction set and its summary into
//! positioned pages. Drawing is left to a [`PageSink`] (PDF or plain text),
//! so pagination can be checked without a document backend.
//!
//! All positions are millimetres measured from the top of the page.

use crate::aggregator::{summarize, Summary};
use crate::error::{Result, TallyError};
use crate::fmt::{date, money};
use crate::models::Transaction;
use crate::query::QuerySpec;

const TITLE_ADVANCE: f32 = 7.0;
const LINE_ADVANCE: f32 = 5.0;
const RULE_GAP: f32 = 2.0;
const FOOTER_OFFSET: f32 = 10.0;
const EPS: f32 = 1e-3;

// ---------------------------------------------------------------------------
// Geometry and columns
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin_top: f32,
    pub margin_bottom: f32,
    pub margin_left: f32,
    pub margin_right: f32,
    pub row_height: f32,
}

impl Default for PageGeometry {
    /// US Letter.
    fn default() -> Self {
        Self {
            width: 215.9,
            height: 279.4,
            margin_top: 25.4,
            margin_bottom: 25.4,
            margin_left: 19.05,
            margin_right: 19.05,
            row_height: 5.0,
        }
    }
}

impl PageGeometry {
    pub fn usable_bottom(&self) -> f32 {
        self.height - self.margin_bottom
    }

    fn fits(&self, cursor: f32, needed: f32) -> bool {
        cursor + needed <= self.usable_bottom() + EPS
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub title: &'static str,
    /// Width on the page, in mm.
    pub width: f32,
    /// Character capacity, used for truncation and the text rendering.
    pub chars: usize,
    pub align: Align,
}

pub const COLUMNS: [Column; 5] = [
    Column { title: "Date", width: 25.0, chars: 12, align: Align::Left },
    Column { title: "Description", width: 72.0, chars: 36, align: Align::Left },
    Column { title: "Kind", width: 35.0, chars: 18, align: Align::Left },
    Column { title: "Amount", width: 28.8, chars: 14, align: Align::Right },
    Column { title: "Status", width: 17.0, chars: 9, align: Align::Left },
];

/// Left edge of column `index`, relative to the left margin.
#[cfg_attr(not(feature = "pdf"), allow(dead_code))]
pub fn column_offset(index: usize) -> f32 {
    COLUMNS.iter().take(index).map(|c| c.width).sum()
}

fn table_width() -> f32 {
    COLUMNS.iter().map(|c| c.width).sum()
}

// ---------------------------------------------------------------------------
// Document model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextStyle {
    Title,
    Subtitle,
    Label,
    Footer,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeaderLine {
    pub y: f32,
    pub text: String,
    /// Right-aligned value next to a label (summary band).
    pub value: Option<String>,
    #[cfg_attr(not(feature = "pdf"), allow(dead_code))]
    pub style: TextStyle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub y: f32,
    pub cells: [String; 5],
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub number: usize,
    /// Title, filter and summary bands. Empty on continuation pages.
    pub lines: Vec<HeaderLine>,
    pub rules: Vec<f32>,
    pub column_header: TableRow,
    pub rows: Vec<TableRow>,
    pub footer: HeaderLine,
}

impl Page {
    fn open(number: usize, geometry: &PageGeometry) -> Self {
        Self {
            number,
            lines: Vec::new(),
            rules: Vec::new(),
            column_header: TableRow {
                y: 0.0,
                cells: Default::default(),
            },
            rows: Vec::new(),
            footer: HeaderLine {
                y: geometry.usable_bottom() + FOOTER_OFFSET,
                text: format!("Page {number}"),
                value: None,
                style: TextStyle::Footer,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportDocument {
    pub pages: Vec<Page>,
}

impl ReportDocument {
    pub fn row_count(&self) -> usize {
        self.pages.iter().map(|p| p.rows.len()).sum()
    }
}

#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub title: String,
    pub geometry: PageGeometry,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            title: "Financial Report".to_string(),
            geometry: PageGeometry::default(),
        }
    }
}

/// Receives pages in order as they are laid out.
#[cfg_attr(not(feature = "pdf"), allow(dead_code))]
pub trait PageSink {
    fn page(&mut self, page: &Page) -> Result<()>;
}

impl PageSink for Vec<Page> {
    fn page(&mut self, page: &Page) -> Result<()> {
        self.push(page.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Cells
// ---------------------------------------------------------------------------

/// Cut `text` to `max` characters, marking the cut with "...".
pub fn fit_text(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    if max <= 3 {
        return text.chars().take(max).collect();
    }
    let lines = textwrap::wrap(text, max - 3);
    match lines.first() {
        Some(first) => format!("{}...", first.trim_end()),
        None => String::new(),
    }
}

fn row_cells(tx: &Transaction) -> [String; 5] {
    [
        date(tx.date),
        fit_text(&tx.description, COLUMNS[1].chars),
        tx.kind.label().to_string(),
        money(tx.amount),
        tx.status.label().to_string(),
    ]
}

fn header_cells() -> [String; 5] {
    COLUMNS.map(|c| c.title.to_string())
}

fn summary_lines(s: &Summary) -> Vec<(&'static str, String)> {
    vec![
        ("Total income", money(s.total_income)),
        ("Total expense", money(s.total_expense)),
        ("Fixed expenses", money(s.fixed_expense_total)),
        ("Variable expenses", money(s.variable_expense_total)),
        ("Balance", money(s.balance())),
    ]
}

// ---------------------------------------------------------------------------
// Paginator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    TableHeader,
    RowEmission,
    PageBreak,
    End,
}

/// Lays out a report one page at a time.
///
/// Every page carries the column headers; a row that would cross the bottom
/// margin starts the next page instead, so each transaction lands on exactly
/// one page.
pub struct Paginator<'a> {
    rows: &'a [Transaction],
    summary: &'a Summary,
    spec: &'a QuerySpec,
    options: &'a RenderOptions,
    state: State,
    next_row: usize,
    page_number: usize,
    cursor: f32,
}

impl<'a> Paginator<'a> {
    pub fn new(
        rows: &'a [Transaction],
        summary: &'a Summary,
        spec: &'a QuerySpec,
        options: &'a RenderOptions,
    ) -> Result<Self> {
        let computed = summarize(rows)?;
        if &computed != summary {
            tracing::error!(
                expected = ?computed,
                supplied = ?summary,
                "summary does not reconcile with filtered transactions"
            );
            return Err(TallyError::Render(
                "summary does not reconcile with the filtered transactions".to_string(),
            ));
        }
        let paginator = Self {
            rows,
            summary,
            spec,
            options,
            state: State::Start,
            next_row: 0,
            page_number: 0,
            cursor: 0.0,
        };
        paginator.check_geometry()?;
        Ok(paginator)
    }

    fn geometry(&self) -> &'a PageGeometry {
        &self.options.geometry
    }

    fn check_geometry(&self) -> Result<()> {
        let g = self.geometry();
        if g.row_height <= 0.0 {
            return Err(TallyError::Render("row height must be positive".to_string()));
        }
        if table_width() > g.width - g.margin_left - g.margin_right + EPS {
            return Err(TallyError::Render(format!(
                "table is {:.1} mm wide but the page only has {:.1} mm between margins",
                table_width(),
                g.width - g.margin_left - g.margin_right
            )));
        }
        let header = g.row_height + RULE_GAP;
        if !g.fits(g.margin_top + header, g.row_height) {
            return Err(TallyError::Render(
                "page is too short to hold a single table row".to_string(),
            ));
        }
        let bands = TITLE_ADVANCE
            + LINE_ADVANCE * (self.spec.describe().len() as f32 + 1.0)
            + LINE_ADVANCE * (summary_lines(self.summary).len() as f32 + 1.0);
        if !g.fits(g.margin_top + bands, g.row_height) {
            return Err(TallyError::Render(
                "page is too short for the report header".to_string(),
            ));
        }
        Ok(())
    }

    fn first_page(&mut self) -> Page {
        let g = self.geometry();
        self.page_number += 1;
        let mut page = Page::open(self.page_number, g);
        self.cursor = g.margin_top;

        page.lines.push(HeaderLine {
            y: self.cursor,
            text: self.options.title.clone(),
            value: None,
            style: TextStyle::Title,
        });
        self.cursor += TITLE_ADVANCE;

        for text in self.spec.describe() {
            page.lines.push(HeaderLine {
                y: self.cursor,
                text,
                value: None,
                style: TextStyle::Subtitle,
            });
            self.cursor += LINE_ADVANCE;
        }
        page.rules.push(self.cursor);
        self.cursor += LINE_ADVANCE;

        for (label, value) in summary_lines(self.summary) {
            page.lines.push(HeaderLine {
                y: self.cursor,
                text: label.to_string(),
                value: Some(value),
                style: TextStyle::Label,
            });
            self.cursor += LINE_ADVANCE;
        }
        self.cursor += LINE_ADVANCE;
        page
    }

    fn continuation_page(&mut self) -> Page {
        let g = self.geometry();
        self.page_number += 1;
        self.cursor = g.margin_top;
        Page::open(self.page_number, g)
    }

    fn table_header(&mut self, page: &mut Page) {
        let g = self.geometry();
        page.column_header = TableRow {
            y: self.cursor,
            cells: header_cells(),
        };
        self.cursor += g.row_height;
        page.rules.push(self.cursor);
        self.cursor += RULE_GAP;
    }
}

impl Iterator for Paginator<'_> {
    type Item = Page;

    fn next(&mut self) -> Option<Page> {
        let mut page: Option<Page> = None;
        loop {
            match self.state {
                State::Start => {
                    page = Some(self.first_page());
                    self.state = State::TableHeader;
                }
                State::PageBreak => {
                    page = Some(self.continuation_page());
                    self.state = State::TableHeader;
                }
                State::TableHeader => {
                    if let Some(p) = page.as_mut() {
                        self.table_header(p);
                    }
                    self.state = State::RowEmission;
                }
                State::RowEmission => {
                    let rows = self.rows;
                    let Some(tx) = rows.get(self.next_row) else {
                        self.state = State::End;
                        return page;
                    };
                    let g = self.geometry();
                    if !g.fits(self.cursor, g.row_height) {
                        tracing::debug!(page = self.page_number, row = self.next_row, "page break");
                        self.state = State::PageBreak;
                        return page;
                    }
                    if let Some(p) = page.as_mut() {
                        p.rows.push(TableRow {
                            y: self.cursor,
                            cells: row_cells(tx),
                        });
                    }
                    self.cursor += g.row_height;
                    self.next_row += 1;
                }
                State::End => return page,
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

pub fn render(
    filtered: &[Transaction],
    summary: &Summary,
    spec: &QuerySpec,
    options: &RenderOptions,
) -> Result<ReportDocument> {
    let pages: Vec<Page> = Paginator::new(filtered, summary, spec, options)?.collect();
    Ok(ReportDocument { pages })
}

/// Stream pages into `sink` as they are laid out. Returns the page count.
#[cfg_attr(not(feature = "pdf"), allow(dead_code))]
pub fn render_to<S: PageSink>(
    filtered: &[Transaction],
    summary: &Summary,
    spec: &QuerySpec,
    options: &RenderOptions,
    sink: &mut S,
) -> Result<usize> {
    let mut count = 0;
    for page in Paginator::new(filtered, summary, spec, options)? {
        sink.page(&page)?;
        count += 1;
    }
    Ok(count)
}

// ---------------------------------------------------------------------------
// Plain-text rendering
// ---------------------------------------------------------------------------

const LABEL_WIDTH: usize = 20;
const VALUE_WIDTH: usize = 16;

fn text_row(cells: &[String; 5]) -> String {
    let parts: Vec<String> = COLUMNS
        .iter()
        .zip(cells.iter())
        .map(|(col, cell)| match col.align {
            Align::Left => format!("{:<width$}", cell, width = col.chars),
            Align::Right => format!("{:>width$}", cell, width = col.chars),
        })
        .collect();
    parts.join(" ").trim_end().to_string()
}

fn text_rule() -> String {
    let width: usize = COLUMNS.iter().map(|c| c.chars).sum::<usize>() + COLUMNS.len() - 1;
    "-".repeat(width)
}

/// Render one page as fixed-width text, top to bottom.
pub fn page_text(page: &Page) -> String {
    let mut items: Vec<(f32, String)> = Vec::new();
    for line in &page.lines {
        let text = match &line.value {
            Some(v) => format!(
                "{:<lw$}{:>vw$}",
                line.text,
                v,
                lw = LABEL_WIDTH,
                vw = VALUE_WIDTH
            ),
            None => line.text.clone(),
        };
        items.push((line.y, text));
    }
    for y in &page.rules {
        items.push((*y, text_rule()));
    }
    items.push((page.column_header.y, text_row(&page.column_header.cells)));
    for row in &page.rows {
        items.push((row.y, text_row(&row.cells)));
    }
    items.push((page.footer.y, page.footer.text.clone()));
    items.sort_by(|a, b| a.0.total_cmp(&b.0));
    items
        .into_iter()
        .map(|(_, text)| text)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_text(doc: &ReportDocument) -> String {
    let pages: Vec<String> = doc.pages.iter().map(page_text).collect();
    let mut out = pages.join("\n\n");
    out.push('\n');
    out
}
