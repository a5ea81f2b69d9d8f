//! Final report export.
//!
//! [`ReportDocument`] is the deterministic, font-independent line list built from a session;
//! [`layout`] places it onto A4 pages of fixed-size cells; [`PdfRenderer`] draws the placed text.

use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::models::IntakeData;

pub const REPORT_FILENAME: &str = "final_report.pdf";
pub const PDF_MEDIA_TYPE: &str = "application/pdf";

const REPORT_TITLE: &str = "최종 보고서";
const CHAT_HEADING: &str = "GPT 상담 내용";

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 10.0;
const CELL_WIDTH_MM: f32 = PAGE_WIDTH_MM - 2.0 * MARGIN_MM;
const CELL_HEIGHT_MM: f32 = 10.0;
const FONT_SIZE_PT: f32 = 12.0;
const FONT_SIZE_MM: f32 = FONT_SIZE_PT * 25.4 / 72.0;
// Distance from the top of a cell to the text baseline
const BASELINE_MM: f32 = 7.0;

const TITLE_GAP_MM: f32 = 10.0;
const SECTION_GAP_MM: f32 = 5.0;
const CHAT_GAP_MM: f32 = 10.0;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to load report font: {0}")]
    Font(String),

    #[error("Failed to render PDF: {0}")]
    Pdf(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
}

/// One logical report line, drawn after `gap_before_mm` of vertical space.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportLine {
    pub text: String,
    pub align: Align,
    pub gap_before_mm: f32,
}

impl ReportLine {
    fn left(text: impl Into<String>, gap_before_mm: f32) -> Self {
        Self {
            text: text.into(),
            align: Align::Left,
            gap_before_mm,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportDocument {
    pub lines: Vec<ReportLine>,
}

impl ReportDocument {
    /// Title, one block per selected category, then the advisory transcript.
    pub fn from_data(data: &IntakeData) -> Self {
        let mut lines = vec![ReportLine {
            text: REPORT_TITLE.to_string(),
            align: Align::Center,
            gap_before_mm: 0.0,
        }];

        let mut gap = TITLE_GAP_MM;
        for record in data.report_sections() {
            lines.push(ReportLine::left(record.category().label(), gap));
            for (label, value) in record.fields() {
                lines.push(ReportLine::left(format!("{label}: {value}"), 0.0));
            }
            gap = SECTION_GAP_MM;
        }

        lines.push(ReportLine::left(CHAT_HEADING, gap + CHAT_GAP_MM));
        for turn in &data.chat_history {
            lines.push(ReportLine::left(
                format!("{}: {}", turn.role.label(), turn.content),
                0.0,
            ));
        }

        Self { lines }
    }

    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Text placed on a page. `x` is from the left edge, `baseline` from the top edge, both in mm.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedText {
    pub text: String,
    pub x: f32,
    pub baseline: f32,
}

/// Replace what the font cannot show. Control characters always become spaces; without an
/// embedded Unicode font everything outside printable ASCII becomes `?`.
pub fn substitute_unrepresentable(text: &str, unicode: bool) -> String {
    text.chars()
        .map(|ch| {
            if ch.is_control() {
                ' '
            } else if unicode || ch == ' ' || ch.is_ascii_graphic() {
                ch
            } else {
                '?'
            }
        })
        .collect()
}

// Advance width in ems, rounded up from Helvetica's metrics so rows never overrun the margin.
// Anything outside ASCII (Hangul, CJK) takes a full em.
fn em_width(ch: char) -> f32 {
    match ch {
        'M' | 'W' | 'm' | 'w' | '@' | '%' => 0.95,
        'A'..='Z' | '&' => 0.8,
        _ if ch.is_ascii() => 0.6,
        _ => 1.0,
    }
}

fn text_width_mm(text: &str) -> f32 {
    text.chars().map(em_width).sum::<f32>() * FONT_SIZE_MM
}

/// Split `text` into rows that fit the cell width. Always yields at least one row.
fn wrap_rows(text: &str) -> Vec<String> {
    let mut rows = Vec::new();
    let mut current = String::new();
    let mut width = 0.0;
    for ch in text.chars() {
        let advance = em_width(ch) * FONT_SIZE_MM;
        if width + advance > CELL_WIDTH_MM && !current.is_empty() {
            rows.push(std::mem::take(&mut current));
            width = 0.0;
        }
        current.push(ch);
        width += advance;
    }
    rows.push(current);
    rows
}

/// Place every line of `document` onto pages, breaking at the bottom margin.
pub fn layout(document: &ReportDocument, unicode: bool) -> Vec<Vec<PlacedText>> {
    let mut pages = vec![Vec::new()];
    let mut y = MARGIN_MM;

    for line in &document.lines {
        y += line.gap_before_mm;
        let text = substitute_unrepresentable(&line.text, unicode);
        for row in wrap_rows(&text) {
            if y + CELL_HEIGHT_MM > PAGE_HEIGHT_MM - MARGIN_MM {
                pages.push(Vec::new());
                y = MARGIN_MM;
            }
            let x = match line.align {
                Align::Left => MARGIN_MM,
                Align::Center => MARGIN_MM + ((CELL_WIDTH_MM - text_width_mm(&row)) / 2.0).max(0.0),
            };
            if let Some(page) = pages.last_mut() {
                page.push(PlacedText {
                    text: row,
                    x,
                    baseline: y + BASELINE_MM,
                });
            }
            y += CELL_HEIGHT_MM;
        }
    }

    pages
}

/// Korean-capable fonts tried when no report font is configured.
pub const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/nanum/NanumGothic.ttf",
    "/usr/share/fonts/truetype/noto/NotoSansKR-Regular.ttf",
    "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/noto-cjk/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/google-noto-cjk/NotoSansCJK-Regular.ttc",
    "/System/Library/Fonts/AppleSDGothicNeo.ttc",
    "C:\\Windows\\Fonts\\malgun.ttf",
];

#[derive(Clone)]
pub enum ReportFont {
    /// Helvetica; limited to ASCII
    Builtin,
    /// A TrueType font embedded into every report
    TrueType(Arc<Vec<u8>>),
}

impl ReportFont {
    /// Read the font at `path` and check that printpdf can embed it.
    pub fn from_path(path: &Path) -> Result<Self, ExportError> {
        let bytes = std::fs::read(path).map_err(|e| ExportError::Font(e.to_string()))?;
        let font = Self::TrueType(Arc::new(bytes));
        PdfRenderer::new(font.clone()).render(&ReportDocument {
            lines: vec![ReportLine::left("보고서 Report 0123", 0.0)],
        })?;
        Ok(font)
    }
}

pub struct PdfRenderer {
    font: ReportFont,
}

impl PdfRenderer {
    pub fn new(font: ReportFont) -> Self {
        Self { font }
    }

    /// Use the configured font, else the first installed system font that embeds cleanly, else
    /// the builtin font.
    pub fn load(path: Option<&Path>) -> Self {
        Self::load_from(path, SYSTEM_FONT_CANDIDATES.iter().map(Path::new))
    }

    fn load_from<'a>(
        configured: Option<&Path>,
        candidates: impl IntoIterator<Item = &'a Path>,
    ) -> Self {
        if let Some(path) = configured {
            match ReportFont::from_path(path) {
                Ok(font) => {
                    info!(path = %path.display(), "Loaded report font");
                    return Self::new(font);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Configured report font is unusable");
                }
            }
        }

        for path in candidates {
            if !path.is_file() {
                continue;
            }
            match ReportFont::from_path(path) {
                Ok(font) => {
                    info!(path = %path.display(), "Loaded system report font");
                    return Self::new(font);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping system report font");
                }
            }
        }

        warn!("No Unicode report font available, using Helvetica; non-ASCII text will be exported as '?'");
        Self::new(ReportFont::Builtin)
    }

    pub fn embeds_unicode(&self) -> bool {
        matches!(self.font, ReportFont::TrueType(_))
    }

    pub fn render(&self, document: &ReportDocument) -> Result<Vec<u8>, ExportError> {
        let pages = layout(document, self.embeds_unicode());

        let (doc, first_page, first_layer) = PdfDocument::new(
            REPORT_TITLE,
            Mm(PAGE_WIDTH_MM),
            Mm(PAGE_HEIGHT_MM),
            "Layer 1",
        );

        let font: IndirectFontRef = match &self.font {
            ReportFont::Builtin => doc.add_builtin_font(BuiltinFont::Helvetica),
            ReportFont::TrueType(bytes) => doc.add_external_font(bytes.as_slice()),
        }
        .map_err(|e| ExportError::Font(format!("{e:?}")))?;

        for (index, placed) in pages.iter().enumerate() {
            let (page, layer) = if index == 0 {
                (first_page, first_layer)
            } else {
                doc.add_page(
                    Mm(PAGE_WIDTH_MM),
                    Mm(PAGE_HEIGHT_MM),
                    format!("Layer {}", index + 1),
                )
            };
            let layer = doc.get_page(page).get_layer(layer);
            for text in placed {
                layer.use_text(
                    text.text.clone(),
                    FONT_SIZE_PT,
                    Mm(text.x),
                    Mm(PAGE_HEIGHT_MM - text.baseline),
                    &font,
                );
            }
        }

        let bytes = doc
            .save_to_bytes()
            .map_err(|e| ExportError::Pdf(format!("{e:?}")))?;
        info!(pages = pages.len(), bytes = bytes.len(), "Rendered report");
        Ok(bytes)
    }
}
