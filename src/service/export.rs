//! Progress export rows and their CSV and PDF renderings.

use crate::domain::{assessment_name, Curriculum, MaterialProgress};
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfLayerReference};
use thiserror::Error;

pub const CSV_HEADER: [&str; 4] = ["Areas", "Subjects", "Materials", "Assessments"];

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("pdf: {0}")]
    Pdf(String),
}

/// One exported line: a curriculum material and the student's assessment of it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProgressRow {
    pub area: String,
    pub subject: String,
    pub material: String,
    /// Blank when the student has no progress on the material.
    pub assessment: &'static str,
}

/// One row per material in curriculum order, whatever progress exists.
pub fn progress_rows(curriculum: &Curriculum, progress: &[MaterialProgress]) -> Vec<ProgressRow> {
    let mut rows = Vec::new();
    for area in &curriculum.areas {
        for subject in &area.subjects {
            for material in &subject.materials {
                let assessment = progress
                    .iter()
                    .find(|p| p.material_id == material.id)
                    .map(|p| assessment_name(p.stage))
                    .unwrap_or("");
                rows.push(ProgressRow {
                    area: area.name.clone(),
                    subject: subject.name.clone(),
                    material: material.name.clone(),
                    assessment,
                });
            }
        }
    }
    rows
}

/// CSV with the header row always present, even for an empty curriculum.
pub fn write_csv(rows: &[ProgressRow]) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;
    for row in rows {
        writer.write_record([row.area.as_str(), row.subject.as_str(), row.material.as_str(), row.assessment])?;
    }
    writer
        .into_inner()
        .map_err(|e| ExportError::Csv(csv::Error::from(e.into_error())))
}

fn pdf_err(e: impl std::fmt::Display) -> ExportError {
    ExportError::Pdf(e.to_string())
}

const PAGE_WIDTH: Mm = Mm(210.0);
const PAGE_HEIGHT: Mm = Mm(297.0);
const MARGIN: f32 = 20.0;
const LINE: f32 = 7.0;

/// Cursor over the current page; starts a new A4 page when the bottom margin is reached.
struct PageWriter<'a> {
    doc: &'a printpdf::PdfDocumentReference,
    layer: PdfLayerReference,
    y: f32,
}

impl PageWriter<'_> {
    fn line(&mut self, text: &str, size: f32, x: f32, font: &IndirectFontRef) {
        if self.y < MARGIN {
            let (page, layer) = self.doc.add_page(PAGE_WIDTH, PAGE_HEIGHT, "Layer 1");
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = PAGE_HEIGHT.0 - MARGIN;
        }
        self.layer.use_text(text, size, Mm(x), Mm(self.y), font);
        self.y -= LINE;
    }
}

/// Rows grouped under area and subject headings, one material per line with its assessment.
pub fn render_pdf(title: &str, rows: &[ProgressRow]) -> Result<Vec<u8>, ExportError> {
    let (doc, page, layer) = PdfDocument::new(title, PAGE_WIDTH, PAGE_HEIGHT, "Layer 1");
    let regular = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_err)?;
    let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(pdf_err)?;

    {
        let mut writer = PageWriter {
            doc: &doc,
            layer: doc.get_page(page).get_layer(layer),
            y: PAGE_HEIGHT.0 - MARGIN,
        };
        writer.line(title, 18.0, MARGIN, &bold);
        writer.y -= LINE;

        let mut current_area: Option<&str> = None;
        let mut current_subject: Option<&str> = None;
        for row in rows {
            if current_area != Some(row.area.as_str()) {
                writer.y -= LINE / 2.0;
                writer.line(&row.area, 14.0, MARGIN, &bold);
                current_area = Some(&row.area);
                current_subject = None;
            }
            if current_subject != Some(row.subject.as_str()) {
                writer.line(&row.subject, 12.0, MARGIN + 5.0, &bold);
                current_subject = Some(&row.subject);
            }
            writer.line(&row.material, 10.0, MARGIN + 10.0, &regular);
            if !row.assessment.is_empty() {
                writer.y += LINE;
                writer.line(row.assessment, 10.0, 150.0, &regular);
            }
        }
    }

    doc.save_to_bytes().map_err(pdf_err)
}
