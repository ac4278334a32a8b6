//! Draws a [Report] onto A4 pages.

use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Point, Rgb,
};

use crate::{
    Error,
    ledger::EntryKind,
    report::layout::{Report, ReportRow, ReportTable},
};

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN_X: f32 = 15.0;
const MARGIN_TOP: f32 = 20.0;
const MARGIN_BOTTOM: f32 = 25.0;

const ROW_HEIGHT: f32 = 7.0;
const CELL_PADDING: f32 = 2.0;
const TEXT_BASELINE: f32 = 2.2;
/// Date, description and money column widths.
const COLUMN_WIDTHS: [f32; 3] = [30.0, 115.0, 35.0];

const TITLE_SIZE: f32 = 18.0;
const HEADING_SIZE: f32 = 12.0;
const BODY_SIZE: f32 = 10.0;
const FOOTER_SIZE: f32 = 9.0;

/// Roughly how many Helvetica characters at [BODY_SIZE] fit in the description column.
const MAX_DESCRIPTION_CHARS: usize = 60;

pub const FOOTER_TEXT: &str = "Ledger - personal finance statement";

/// Render `report` as a PDF document.
///
/// # Errors
/// Returns [Error::PdfError] if the fonts cannot be loaded or the document
/// cannot be written.
pub fn render_pdf(report: &Report) -> Result<Vec<u8>, Error> {
    let (document, _) = draw_report(report)?;

    document
        .save_to_bytes()
        .map_err(|error| Error::PdfError(error.to_string()))
}

/// Draw `report` and return the document along with its number of pages.
fn draw_report(report: &Report) -> Result<(PdfDocumentReference, usize), Error> {
    let (document, page, layer) = PdfDocument::new(
        &report.title,
        Mm(PAGE_WIDTH),
        Mm(PAGE_HEIGHT),
        "Layer 1",
    );

    let regular = document
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|error| Error::PdfError(error.to_string()))?;
    let bold = document
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|error| Error::PdfError(error.to_string()))?;
    let oblique = document
        .add_builtin_font(BuiltinFont::HelveticaOblique)
        .map_err(|error| Error::PdfError(error.to_string()))?;

    let page_count = {
        let layer = document.get_page(page).get_layer(layer);
        let mut writer = PageWriter {
            document: &document,
            layer,
            fonts: Fonts {
                regular,
                bold,
                oblique,
            },
            cursor: PAGE_HEIGHT - MARGIN_TOP,
            page_count: 1,
        };
        writer.draw_footer();

        writer.draw_text(&report.title, TITLE_SIZE, true, MARGIN_X);
        writer.advance(ROW_HEIGHT * 2.0);

        writer.draw_table(&report.credits);
        writer.advance(ROW_HEIGHT);
        writer.draw_table(&report.debits);
        writer.advance(ROW_HEIGHT);
        writer.draw_summary(&report.summary);

        writer.page_count
    };

    Ok((document, page_count))
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    oblique: IndirectFontRef,
}

/// Tracks the current page and how far down it has been filled.
struct PageWriter<'a> {
    document: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    fonts: Fonts,
    /// Distance of the next line from the bottom of the page in millimetres.
    cursor: f32,
    page_count: usize,
}

impl PageWriter<'_> {
    fn new_page(&mut self) {
        self.page_count += 1;
        let layer_name = format!("Page {}, Layer 1", self.page_count);
        let (page, layer) = self
            .document
            .add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), layer_name);

        self.layer = self.document.get_page(page).get_layer(layer);
        self.cursor = PAGE_HEIGHT - MARGIN_TOP;
        self.draw_footer();
    }

    /// Start a new page unless `height` millimetres still fit on this one.
    fn reserve(&mut self, height: f32) {
        if self.cursor - height < MARGIN_BOTTOM {
            self.new_page();
        }
    }

    fn advance(&mut self, height: f32) {
        self.cursor -= height;
    }

    fn draw_footer(&self) {
        let gold = Color::Rgb(Rgb::new(0.97, 0.75, 0.09, None));
        let black = Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None));

        self.layer.set_fill_color(gold);
        self.layer.use_text(
            FOOTER_TEXT,
            FOOTER_SIZE,
            Mm(MARGIN_X),
            Mm(MARGIN_BOTTOM / 2.0),
            &self.fonts.oblique,
        );
        self.layer.set_fill_color(black);
        self.layer.use_text(
            format!("Page {}", self.page_count),
            FOOTER_SIZE,
            Mm(PAGE_WIDTH - MARGIN_X - 15.0),
            Mm(MARGIN_BOTTOM / 2.0),
            &self.fonts.regular,
        );
    }

    fn draw_text(&self, text: &str, size: f32, bold: bool, x: f32) {
        let font = if bold {
            &self.fonts.bold
        } else {
            &self.fonts.regular
        };

        self.layer
            .use_text(text, size, Mm(x), Mm(self.cursor - TEXT_BASELINE), font);
    }

    fn draw_horizontal_rule(&self) {
        let table_width: f32 = COLUMN_WIDTHS.iter().sum();
        let line = Line {
            points: vec![
                (Point::new(Mm(MARGIN_X), Mm(self.cursor)), false),
                (Point::new(Mm(MARGIN_X + table_width), Mm(self.cursor)), false),
            ],
            is_closed: false,
        };

        self.layer.add_line(line);
    }

    fn draw_cells(&self, cells: [&str; 3], bold: bool) {
        let mut x = MARGIN_X;

        for (cell, width) in cells.into_iter().zip(COLUMN_WIDTHS) {
            self.draw_text(cell, BODY_SIZE, bold, x + CELL_PADDING);
            x += width;
        }
    }

    fn draw_table_header(&mut self, table: &ReportTable) {
        let accent = match table.kind {
            EntryKind::Credit => Rgb::new(0.2, 0.6, 0.2, None),
            EntryKind::Debit => Rgb::new(0.8, 0.3, 0.4, None),
        };

        self.layer.set_outline_color(Color::Rgb(accent));
        self.layer.set_outline_thickness(1.5);
        self.draw_horizontal_rule();
        self.advance(ROW_HEIGHT);
        self.draw_cells(["Date", "Description", "Money"], true);
        self.draw_horizontal_rule();
        self.layer
            .set_outline_color(Color::Rgb(Rgb::new(0.7, 0.7, 0.7, None)));
        self.layer.set_outline_thickness(0.5);
    }

    /// Draw a table, repeating its header on every page it spans.
    fn draw_table(&mut self, table: &ReportTable) {
        self.reserve(ROW_HEIGHT * 4.0);
        self.advance(ROW_HEIGHT);
        self.draw_text(table.heading, HEADING_SIZE, true, MARGIN_X);
        self.advance(ROW_HEIGHT / 2.0);
        self.draw_table_header(table);

        for row in &table.rows {
            if self.cursor - ROW_HEIGHT < MARGIN_BOTTOM {
                self.new_page();
                self.draw_table_header(table);
            }

            self.draw_row(row);
        }
    }

    fn draw_row(&mut self, row: &ReportRow) {
        let description = truncate(&row.description, MAX_DESCRIPTION_CHARS);

        self.advance(ROW_HEIGHT);
        self.draw_cells([&row.date, &description, &row.money], false);
        self.draw_horizontal_rule();
    }

    fn draw_summary(&mut self, summary: &[(&str, String)]) {
        self.reserve(ROW_HEIGHT * (summary.len() as f32 + 2.0));
        self.advance(ROW_HEIGHT);
        self.draw_text("Summary", HEADING_SIZE, true, MARGIN_X);
        self.advance(ROW_HEIGHT / 2.0);

        for (label, value) in summary {
            self.advance(ROW_HEIGHT);
            self.draw_text(label, BODY_SIZE, true, MARGIN_X + CELL_PADDING);
            self.draw_text(value, BODY_SIZE, false, MARGIN_X + 50.0);
        }
    }
}

/// Shorten `text` to at most `max_chars` characters, marking the cut with "...".
fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_owned();
    }

    let mut truncated: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    truncated.push_str("...");
    truncated
}
