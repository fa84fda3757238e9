// Paginated table document (PDF 1.4, landscape A4)
use crate::domain::device::DeviceInfo;
use crate::domain::export::{EXPORT_HEADER, ExportRow, iso_time};
use crate::domain::time_range::TimeRange;
use std::fmt::Write as _;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

const PAGE_WIDTH: i32 = 842;
const PAGE_HEIGHT: i32 = 595;
const MARGIN: i32 = 40;
const ROW_HEIGHT: i32 = 16;
const TABLE_BOTTOM: i32 = 60;
const FIRST_TABLE_TOP: i32 = 450;
const NEXT_TABLE_TOP: i32 = PAGE_HEIGHT - MARGIN;

/// (x offset, max characters) per column; the last one runs to the right margin
const COLUMNS: [(i32, usize); 3] = [(0, 38), (200, 48), (450, 60)];

const FIRST_PAGE_FONT_OBJ: usize = 3;
const FIRST_PAGE_OBJ: usize = 6;

pub struct PdfReport<'a> {
    pub device: &'a DeviceInfo,
    pub range: &'a TimeRange,
    pub rows: &'a [ExportRow],
}

/// Rows that fit under a header row starting at `top`.
fn rows_per_page(top: i32) -> usize {
    ((top - TABLE_BOTTOM) / ROW_HEIGHT - 1) as usize
}

fn paginate(rows: &[ExportRow]) -> Vec<&[ExportRow]> {
    let first = rows_per_page(FIRST_TABLE_TOP).min(rows.len());
    let mut pages = vec![&rows[..first]];
    pages.extend(rows[first..].chunks(rows_per_page(NEXT_TABLE_TOP)));
    pages
}

pub fn render_pdf(report: &PdfReport<'_>) -> Vec<u8> {
    let pages = paginate(report.rows);
    let page_count = pages.len();

    let mut doc = PdfWriter::new();

    let kids: Vec<String> = (0..page_count)
        .map(|i| format!("{} 0 R", FIRST_PAGE_OBJ + 2 * i))
        .collect();
    doc.object("<< /Type /Catalog /Pages 2 0 R >>");
    doc.object(&format!(
        "<< /Type /Pages /Kids [{}] /Count {} >>",
        kids.join(" "),
        page_count
    ));
    doc.object("<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>");
    doc.object("<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold /Encoding /WinAnsiEncoding >>");
    doc.object(&format!(
        "<< /Title ({}) /Producer (device-telemetry) >>",
        pdf_text(&title(report.device), 120)
    ));

    for (index, rows) in pages.iter().enumerate() {
        let content = page_content(report, rows, index, page_count);
        doc.object(&format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] \
             /Resources << /Font << /F1 {} 0 R /F2 {} 0 R >> >> /Contents {} 0 R >>",
            PAGE_WIDTH,
            PAGE_HEIGHT,
            FIRST_PAGE_FONT_OBJ,
            FIRST_PAGE_FONT_OBJ + 1,
            FIRST_PAGE_OBJ + 2 * index + 1
        ));
        doc.stream(&content);
    }

    doc.finish(1, 5)
}

fn title(device: &DeviceInfo) -> String {
    format!("Telemetry Report - {}", device.name)
}

fn page_content(report: &PdfReport<'_>, rows: &[ExportRow], index: usize, page_count: usize) -> String {
    let mut out = String::new();
    let device = report.device;

    let top = if index == 0 {
        text(&mut out, "F2", 16, MARGIN, PAGE_HEIGHT - MARGIN, &title(device), 90);
        let block = [
            format!("Device: {}", device.name),
            format!("Device ID: {}", device.id),
            format!("Type: {}", device.device_type.as_deref().unwrap_or("-")),
            format!("Range: {} to {}", iso_time(report.range.start), iso_time(report.range.end)),
            format!("Rows: {}", report.rows.len()),
        ];
        for (line, value) in block.iter().enumerate() {
            text(&mut out, "F1", 10, MARGIN, PAGE_HEIGHT - MARGIN - 28 - 14 * line as i32, value, 140);
        }
        FIRST_TABLE_TOP
    } else {
        NEXT_TABLE_TOP
    };

    let right = PAGE_WIDTH - MARGIN;
    let _ = writeln!(out, "0.85 g {} {} {} {} re f 0 g", MARGIN, top - 4, right - MARGIN, ROW_HEIGHT);
    row(&mut out, "F2", top, EXPORT_HEADER);

    let mut y = top;
    for r in rows {
        y -= ROW_HEIGHT;
        row(&mut out, "F1", y, [r.time.as_str(), r.key.as_str(), r.value.as_str()]);
        let _ = writeln!(out, "0.5 w {} {} m {} {} l S", MARGIN, y - 4, right, y - 4);
    }

    let rules = COLUMNS.iter().map(|(x, _)| MARGIN + x).chain([right]);
    for x in rules {
        let _ = writeln!(out, "0.5 w {} {} m {} {} l S", x, top + 12, x, y - 4);
    }

    let footer = format!("Page {} of {}", index + 1, page_count);
    text(&mut out, "F1", 8, right - 60, 24, &footer, 30);
    out
}

fn row(out: &mut String, font: &str, y: i32, cells: [&str; 3]) {
    for ((x, max_chars), cell) in COLUMNS.iter().zip(cells) {
        text(out, font, 9, MARGIN + x + 4, y, cell, *max_chars);
    }
}

fn text(out: &mut String, font: &str, size: i32, x: i32, y: i32, value: &str, max_chars: usize) {
    let _ = writeln!(
        out,
        "BT /{} {} Tf {} {} Td ({}) Tj ET",
        font,
        size,
        x,
        y,
        pdf_text(value, max_chars)
    );
}

/// Escapes a string for a PDF literal in WinAnsi encoding, truncating long
/// values with "...". Characters outside Latin-1 become '?'.
fn pdf_text(value: &str, max_chars: usize) -> String {
    let chars: Vec<char> = value.chars().collect();
    let truncated = chars.len() > max_chars;
    let keep = if truncated {
        max_chars.saturating_sub(3)
    } else {
        chars.len()
    };

    let mut out = String::with_capacity(keep + 8);
    for &c in &chars[..keep] {
        match c {
            '(' | ')' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_ascii_control() => out.push(' '),
            c if c.is_ascii() => out.push(c),
            c if (c as u32) <= 0xFF => {
                let _ = write!(out, "\\{:03o}", c as u32);
            }
            _ => out.push('?'),
        }
    }
    if truncated {
        out.push_str("...");
    }
    out
}

/// Sequential object writer that tracks byte offsets for the xref table.
struct PdfWriter {
    buf: Vec<u8>,
    offsets: Vec<usize>,
}

impl PdfWriter {
    fn new() -> Self {
        let mut buf = b"%PDF-1.4\n".to_vec();
        buf.extend_from_slice(b"%\xE2\xE3\xCF\xD3\n");
        Self {
            buf,
            offsets: Vec::new(),
        }
    }

    fn begin(&mut self) -> usize {
        self.offsets.push(self.buf.len());
        self.offsets.len()
    }

    fn object(&mut self, body: &str) {
        let id = self.begin();
        self.buf
            .extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", id, body).as_bytes());
    }

    fn stream(&mut self, content: &str) {
        let id = self.begin();
        self.buf.extend_from_slice(
            format!(
                "{} 0 obj\n<< /Length {} >>\nstream\n{}\nendstream\nendobj\n",
                id,
                content.len(),
                content
            )
            .as_bytes(),
        );
    }

    fn finish(mut self, root: usize, info: usize) -> Vec<u8> {
        let xref_offset = self.buf.len();
        let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", self.offsets.len() + 1);
        for offset in &self.offsets {
            let _ = write!(xref, "{:010} 00000 n \n", offset);
        }
        let _ = write!(
            xref,
            "trailer\n<< /Size {} /Root {} 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF\n",
            self.offsets.len() + 1,
            root,
            info,
            xref_offset
        );
        self.buf.extend_from_slice(xref.as_bytes());
        self.buf
    }
}
