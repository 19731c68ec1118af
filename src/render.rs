//! Paginated text rendering: lay analysis blocks out onto US-Letter pages.
//!
//! Each block gets its own page, headed `Document {n}`, followed by the
//! block's lines at a fixed pitch. When the cursor falls below the bottom
//! margin the page is broken and the cursor restarts near the top. A page
//! break is always forced after a block's last line, so the next block never
//! shares a page with the previous one.
//!
//! Lines are never wrapped; a line wider than the page overflows the right
//! edge.
//!
//! The layout is written against [`PageSurface`] so it can be exercised
//! without producing a PDF. [`LopdfSurface`] is the PDF-producing surface used
//! by [`create_pdf_from_text`].
//!
//! ```text
//!  y = 720  Document 1          ← header, 72 pt below the top edge
//!  y = 692  first line          ← content starts 100 pt below the top edge
//!  y = 680  second line
//!   …
//!  y ≥  72  last line that fits ← bottom margin
//! ```

use crate::error::RenderError;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::io::Cursor;
use tracing::debug;

/// US-Letter width in points.
pub const PAGE_WIDTH: f32 = 612.0;
/// US-Letter height in points.
pub const PAGE_HEIGHT: f32 = 792.0;
/// Left edge of every drawn line.
pub const LEFT_MARGIN: f32 = 72.0;
/// Distance from the top edge to the block header, and to the first line on
/// a continuation page.
pub const TOP_MARGIN: f32 = 72.0;
/// Distance from the top edge to the first content line of a block.
pub const CONTENT_TOP_OFFSET: f32 = 100.0;
/// A line is never drawn below this height.
pub const BOTTOM_MARGIN: f32 = 72.0;
/// Vertical distance between consecutive lines.
pub const LINE_PITCH: f32 = 12.0;
/// Helvetica size used for every line.
pub const FONT_SIZE: f32 = 12.0;

/// Filename offered when the summary is downloaded.
pub const DOWNLOAD_FILENAME: &str = "analysis_results.pdf";
/// Content type of the summary.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// A 2-D drawing target that receives text and page breaks.
///
/// Coordinates follow PDF conventions: origin at the bottom-left corner,
/// y growing upwards, units in points.
pub trait PageSurface {
    /// `(width, height)` of every page.
    fn page_size(&self) -> (f32, f32);

    /// Draw `text` with its baseline starting at `(x, y)` on the current page.
    fn draw_text(&mut self, x: f32, y: f32, text: &str);

    /// Close the current page and start a new one.
    fn show_page(&mut self);
}

/// Lay `blocks` out onto `surface`, one block per page run.
///
/// Block `i` starts a fresh page with the header `Document {i+1}`. The cursor
/// is owned by the block: it starts at `height - CONTENT_TOP_OFFSET`, drops by
/// [`LINE_PITCH`] after each line and restarts at `height - TOP_MARGIN` on a
/// break.
pub fn render_blocks<S, T>(surface: &mut S, blocks: &[T])
where
    S: PageSurface + ?Sized,
    T: AsRef<str>,
{
    let (_, height) = surface.page_size();

    for (i, block) in blocks.iter().enumerate() {
        surface.draw_text(LEFT_MARGIN, height - TOP_MARGIN, &format!("Document {}", i + 1));

        let mut cursor = height - CONTENT_TOP_OFFSET;
        for line in block.as_ref().split('\n') {
            if cursor < BOTTOM_MARGIN {
                surface.show_page();
                cursor = height - TOP_MARGIN;
            }
            surface.draw_text(LEFT_MARGIN, cursor, line);
            cursor -= LINE_PITCH;
        }

        surface.show_page();
    }
}

/// Render `blocks` into a finished PDF, positioned at its start.
///
/// An empty `blocks` slice yields a valid document with zero pages.
///
/// # Errors
/// Only resource-class failures: a content stream or the document itself
/// could not be serialised.
pub fn create_pdf_from_text<T: AsRef<str>>(blocks: &[T]) -> Result<Cursor<Vec<u8>>, RenderError> {
    let mut surface = LopdfSurface::letter();
    render_blocks(&mut surface, blocks);
    let bytes = surface.finish()?;
    debug!("Rendered {} blocks into {} bytes", blocks.len(), bytes.len());
    Ok(Cursor::new(bytes))
}

/// [`PageSurface`] that accumulates Helvetica text operations per page and
/// serialises them with `lopdf`.
///
/// The output carries no timestamps or document IDs, so identical drawing
/// produces byte-identical PDFs.
pub struct LopdfSurface {
    width: f32,
    height: f32,
    current: Vec<Operation>,
    pages: Vec<Vec<Operation>>,
}

impl LopdfSurface {
    /// A surface with US-Letter pages.
    pub fn letter() -> Self {
        Self::new(PAGE_WIDTH, PAGE_HEIGHT)
    }

    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            current: Vec::new(),
            pages: Vec::new(),
        }
    }

    /// Number of pages closed so far by [`PageSurface::show_page`].
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Close any page still holding drawing and serialise the document.
    pub fn finish(mut self) -> Result<Vec<u8>, RenderError> {
        if !self.current.is_empty() {
            self.show_page();
        }

        // lopdf writes a cross-reference stream, which needs PDF 1.5.
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        });

        let mut kids = Vec::with_capacity(self.pages.len());
        for (idx, operations) in self.pages.into_iter().enumerate() {
            let content = Content { operations };
            let encoded = content.encode().map_err(|e| RenderError::Encode {
                page: idx + 1,
                detail: e.to_string(),
            })?;
            let content_id = doc.add_object(Stream::new(lopdf::Dictionary::new(), encoded));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.0_f32.into(), 0.0_f32.into(), self.width.into(), self.height.into()],
                "Contents" => content_id,
                "Resources" => resources_id,
            });
            kids.push(Object::Reference(page_id));
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf)
            .map_err(|e| RenderError::Write(e.to_string()))?;
        Ok(buf)
    }
}

impl PageSurface for LopdfSurface {
    fn page_size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    fn draw_text(&mut self, x: f32, y: f32, text: &str) {
        self.current.extend([
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), FONT_SIZE.into()]),
            Operation::new("Td", vec![x.into(), y.into()]),
            Operation::new("Tj", vec![Object::string_literal(to_win_ansi(text))]),
            Operation::new("ET", vec![]),
        ]);
    }

    fn show_page(&mut self) {
        self.pages.push(std::mem::take(&mut self.current));
    }
}

/// Map text onto the WinAnsi code page used by the standard Helvetica font.
///
/// Latin-1 characters pass through, the common typographic punctuation gets
/// its Windows-1252 slot, control characters become spaces and anything else
/// becomes `?`.
fn to_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\t' => b' ',
            c if (c as u32) < 0x20 || c == '\u{7f}' => b' ',
            c if (c as u32) < 0x80 => c as u8,
            '€' => 0x80,
            '‚' => 0x82,
            '„' => 0x84,
            '…' => 0x85,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            '™' => 0x99,
            c if (0xA0..=0xFF).contains(&(c as u32)) => c as u32 as u8,
            _ => b'?',
        })
        .collect()
}
