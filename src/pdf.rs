use std::io::BufWriter;

use printpdf::*;

use crate::aggregator::Summary;
use crate::error::{Result, TallyError};
use crate::layout::{
    column_offset, render_to, Align, HeaderLine, Page, PageGeometry, PageSink, RenderOptions,
    TableRow, TextStyle, COLUMNS,
};
use crate::models::Transaction;
use crate::query::QuerySpec;

const FONT_SIZE: f32 = 10.0;
const TITLE_SIZE: f32 = 16.0;
const SUBTITLE_SIZE: f32 = 10.0;
const FOOTER_SIZE: f32 = 8.0;

/// Right edge of summary values, relative to the left margin.
const SUMMARY_VALUE_RIGHT: f32 = 80.0;
/// Gap kept between a right-aligned cell and the next column.
const CELL_PAD: f32 = 3.0;

/// Approximate Helvetica advance per character at `size` points, in mm.
fn approx_text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * 0.18
}

/// Draws laid-out pages with printpdf, one PDF page per layout page.
pub struct PdfWriter {
    doc: PdfDocumentReference,
    font: IndirectFontRef,
    font_bold: IndirectFontRef,
    geometry: PageGeometry,
    current_page: PdfPageIndex,
    current_layer: PdfLayerIndex,
    pages_written: usize,
}

impl PdfWriter {
    pub fn new(title: &str, geometry: PageGeometry) -> Result<Self> {
        let (doc, page, layer) = PdfDocument::new(
            title,
            Mm(geometry.width),
            Mm(geometry.height),
            "Layer 1",
        );
        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| TallyError::Pdf(format!("{e:?}")))?;
        let font_bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| TallyError::Pdf(format!("{e:?}")))?;
        Ok(Self {
            doc,
            font,
            font_bold,
            geometry,
            current_page: page,
            current_layer: layer,
            pages_written: 0,
        })
    }

    fn pdf_y(&self, y: f32) -> f32 {
        self.geometry.height - y
    }

    fn layer(&self) -> PdfLayerReference {
        self.doc
            .get_page(self.current_page)
            .get_layer(self.current_layer)
    }

    fn text(&self, s: &str, x: f32, y: f32, size: f32, bold: bool) {
        let font = if bold { &self.font_bold } else { &self.font };
        self.layer()
            .use_text(s, size, Mm(x), Mm(self.pdf_y(y)), font);
    }

    fn text_right(&self, s: &str, right: f32, y: f32, size: f32, bold: bool) {
        let tw = approx_text_width(s, size);
        self.text(s, right - tw, y, size, bold);
    }

    fn hline(&self, y: f32) {
        let g = &self.geometry;
        let layer = self.layer();
        layer.set_outline_thickness(0.5);
        let line = Line {
            points: vec![
                (Point::new(Mm(g.margin_left), Mm(self.pdf_y(y))), false),
                (Point::new(Mm(g.width - g.margin_right), Mm(self.pdf_y(y))), false),
            ],
            is_closed: false,
        };
        layer.add_line(line);
    }

    fn header_line(&self, line: &HeaderLine) {
        let left = self.geometry.margin_left;
        match line.style {
            TextStyle::Title => self.text(&line.text, left, line.y, TITLE_SIZE, true),
            TextStyle::Subtitle => self.text(&line.text, left, line.y, SUBTITLE_SIZE, false),
            TextStyle::Label => {
                self.text(&line.text, left, line.y, FONT_SIZE, false);
                if let Some(value) = &line.value {
                    self.text_right(value, left + SUMMARY_VALUE_RIGHT, line.y, FONT_SIZE, true);
                }
            }
            TextStyle::Footer => {
                let right = self.geometry.width - self.geometry.margin_right;
                self.text_right(&line.text, right, line.y, FOOTER_SIZE, false);
            }
        }
    }

    fn table_row(&self, row: &TableRow, bold: bool) {
        let left = self.geometry.margin_left;
        for (i, (col, value)) in COLUMNS.iter().zip(row.cells.iter()).enumerate() {
            let x = left + column_offset(i);
            match col.align {
                Align::Left => self.text(value, x, row.y, FONT_SIZE, bold),
                Align::Right => {
                    self.text_right(value, x + col.width - CELL_PAD, row.y, FONT_SIZE, bold)
                }
            }
        }
    }

    pub fn finish(self) -> Result<Vec<u8>> {
        let mut buf = BufWriter::new(Vec::new());
        self.doc
            .save(&mut buf)
            .map_err(|e| TallyError::Pdf(format!("{e:?}")))?;
        buf.into_inner().map_err(|e| TallyError::Pdf(e.to_string()))
    }
}

impl PageSink for PdfWriter {
    fn page(&mut self, page: &Page) -> Result<()> {
        if self.pages_written > 0 {
            let (p, l) = self.doc.add_page(
                Mm(self.geometry.width),
                Mm(self.geometry.height),
                format!("Page {}", page.number),
            );
            self.current_page = p;
            self.current_layer = l;
        }
        for line in &page.lines {
            self.header_line(line);
        }
        for y in &page.rules {
            self.hline(*y);
        }
        self.table_row(&page.column_header, true);
        for row in &page.rows {
            self.table_row(row, false);
        }
        self.header_line(&page.footer);
        self.pages_written += 1;
        Ok(())
    }
}

/// Lay out the report and stream it straight into a PDF.
pub fn render_report(
    filtered: &[Transaction],
    summary: &Summary,
    spec: &QuerySpec,
    options: &RenderOptions,
) -> Result<Vec<u8>> {
    let mut pdf = PdfWriter::new(&options.title, options.geometry)?;
    let pages = render_to(filtered, summary, spec, options, &mut pdf)?;
    tracing::debug!(pages, rows = filtered.len(), "rendered PDF report");
    pdf.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::aggregate;
    use crate::models::{Status, TransactionKind};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    #[test]
    fn test_text_width_scales_with_size_and_length() {
        assert_eq!(approx_text_width("", TITLE_SIZE), 0.0);
        assert!(approx_text_width("Balance", TITLE_SIZE) > approx_text_width("Balance", FONT_SIZE));
        assert!(approx_text_width("Page 10", FOOTER_SIZE) > approx_text_width("Page 1", FOOTER_SIZE));
    }

    fn sample(n: usize) -> Vec<Transaction> {
        let date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        (0..n)
            .map(|i| {
                Transaction::new(
                    TransactionKind::FixedExpense,
                    &format!("Bill {i}"),
                    dec!(12.50),
                    date,
                    Status::Paid,
                )
                .unwrap()
            })
            .collect()
    }

    #[test]
    fn test_render_report_produces_pdf() {
        let rows = sample(3);
        let spec = QuerySpec::default();
        let agg = aggregate(&rows, Some(&spec)).unwrap();
        let bytes =
            render_report(&agg.filtered, &agg.summary, &spec, &RenderOptions::default()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_render_empty_report_produces_pdf() {
        let spec = QuerySpec::default();
        let bytes =
            render_report(&[], &Summary::default(), &spec, &RenderOptions::default()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_multi_page_report_produces_pdf() {
        let rows = sample(150);
        let spec = QuerySpec::default();
        let agg = aggregate(&rows, Some(&spec)).unwrap();
        let options = RenderOptions::default();
        let mut pdf = PdfWriter::new(&options.title, options.geometry).unwrap();
        let pages = render_to(&agg.filtered, &agg.summary, &spec, &options, &mut pdf).unwrap();
        assert!(pages > 1);
        assert_eq!(pdf.pages_written, pages);
        assert!(pdf.finish().unwrap().starts_with(b"%PDF"));
    }

    #[test]
    fn test_unreconciled_summary_is_rejected() {
        let rows = sample(2);
        let result = render_report(
            &rows,
            &Summary::default(),
            &QuerySpec::default(),
            &RenderOptions::default(),
        );
        assert!(matches!(result, Err(TallyError::Render(_))));
    }
}
