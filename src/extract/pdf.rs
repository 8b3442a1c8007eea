//! PDF backend for span extraction, built on lopdf content streams.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use lopdf::{Document as LopdfDocument, Object, ObjectId, Stream};
use unicode_normalization::UnicodeNormalization;

use super::{
    document_name, DocumentSource, ExtractedDocument, PageLayout, TextBlock, TextLine, TextSpan,
};
use crate::error::{Error, Result};

/// PDF magic bytes: %PDF-
const PDF_MAGIC: &[u8] = b"%PDF-";
const VERSION_LEN: usize = 3;

/// Extracts styled text blocks from PDF files.
#[derive(Debug, Clone, Default)]
pub struct PdfSource;

impl PdfSource {
    pub fn new() -> Self {
        Self
    }

    /// Extract a document already loaded into memory.
    pub fn extract_bytes(
        &self,
        name: impl Into<String>,
        data: &[u8],
    ) -> Result<ExtractedDocument> {
        check_header(data)?;
        let doc = LopdfDocument::load_mem(data)?;
        extract_document(name.into(), &doc)
    }
}

impl DocumentSource for PdfSource {
    fn name(&self) -> &str {
        "lopdf"
    }

    fn extract(&self, path: &Path) -> Result<ExtractedDocument> {
        let mut header = [0u8; 16];
        BufReader::new(File::open(path)?)
            .read_exact(&mut header)
            .map_err(|_| Error::UnknownFormat)?;
        check_header(&header)?;

        let doc = LopdfDocument::load(path)?;
        extract_document(document_name(path), &doc)
    }
}

/// Verify the `%PDF-x.y` header.
fn check_header(data: &[u8]) -> Result<()> {
    if data.len() < PDF_MAGIC.len() + VERSION_LEN || !data.starts_with(PDF_MAGIC) {
        return Err(Error::UnknownFormat);
    }

    let version = &data[PDF_MAGIC.len()..PDF_MAGIC.len() + VERSION_LEN];
    let valid = matches!(version, [b'1' | b'2', b'.', b'0'..=b'9']);
    if !valid {
        return Err(Error::UnsupportedVersion(
            String::from_utf8_lossy(version).to_string(),
        ));
    }
    Ok(())
}

fn extract_document(name: String, doc: &LopdfDocument) -> Result<ExtractedDocument> {
    if doc.is_encrypted() {
        return Err(Error::Encrypted);
    }

    let analyzer = LayoutAnalyzer::new(doc);
    let mut document = ExtractedDocument::new(name);

    for (page_num, page_id) in doc.get_pages() {
        let spans = analyzer.extract_page_spans(page_num, page_id)?;
        let lines = group_spans_into_lines(spans);
        let blocks = group_lines_into_blocks(lines);
        log::debug!(
            "{}: page {} -> {} blocks",
            document.name,
            page_num,
            blocks.len()
        );
        document.add_page(PageLayout::new(page_num, blocks));
    }

    Ok(document)
}

/// Walks page content streams and emits positioned spans.
struct LayoutAnalyzer<'a> {
    doc: &'a LopdfDocument,
}

impl<'a> LayoutAnalyzer<'a> {
    fn new(doc: &'a LopdfDocument) -> Self {
        Self { doc }
    }

    /// Extract text spans from a page with position and font information.
    fn extract_page_spans(&self, page_num: u32, page_id: ObjectId) -> Result<Vec<TextSpan>> {
        let lopdf_fonts = self
            .doc
            .get_page_fonts(page_id)
            .map_err(|e| Error::PdfParse(format!("page {}: {}", page_num, e)))?;

        let mut fonts = HashMap::new();
        for (name, font) in &lopdf_fonts {
            let base_font = font
                .get(b"BaseFont")
                .ok()
                .and_then(|o| o.as_name().ok())
                .map(|n| String::from_utf8_lossy(n).to_string())
                .unwrap_or_else(|| "Unknown".to_string());
            fonts.insert(name.clone(), base_font);
        }

        let Some(content) = self.page_content(page_id)? else {
            return Ok(Vec::new());
        };
        self.parse_content_stream(&content, &fonts, &lopdf_fonts)
            .map_err(|e| Error::TextExtract(format!("page {}: {}", page_num, e)))
    }

    /// Concatenated page content, or `None` for a page without contents.
    fn page_content(&self, page_id: ObjectId) -> Result<Option<Vec<u8>>> {
        let page_dict = self.doc.get_dictionary(page_id)?;

        let Ok(contents) = page_dict.get(b"Contents") else {
            return Ok(None);
        };

        match contents {
            Object::Reference(r) => match self.doc.get_object(*r)? {
                Object::Stream(s) => Ok(Some(stream_content(s)?)),
                Object::Array(arr) => Ok(Some(self.concat_streams(arr))),
                _ => Err(Error::Corrupted("invalid content stream".to_string())),
            },
            Object::Array(arr) => Ok(Some(self.concat_streams(arr))),
            _ => Err(Error::Corrupted("invalid content stream".to_string())),
        }
    }

    fn concat_streams(&self, refs: &[Object]) -> Vec<u8> {
        let mut content = Vec::new();
        for obj in refs {
            if let Object::Reference(r) = obj {
                if let Ok(Object::Stream(s)) = self.doc.get_object(*r) {
                    match stream_content(s) {
                        Ok(data) => {
                            content.extend_from_slice(&data);
                            content.push(b' ');
                        }
                        Err(e) => log::warn!("skipping content stream {:?}: {}", r, e),
                    }
                }
            }
        }
        content
    }

    fn parse_content_stream(
        &self,
        content: &[u8],
        fonts: &HashMap<Vec<u8>, String>,
        lopdf_fonts: &BTreeMap<Vec<u8>, &lopdf::Dictionary>,
    ) -> Result<Vec<TextSpan>> {
        let content = lopdf::content::Content::decode(content)?;

        let mut spans = Vec::new();
        let mut current_font = String::new();
        let mut current_font_key: Vec<u8> = Vec::new();
        let mut current_font_size: f32 = 12.0;
        let mut leading: f32 = 0.0;
        let mut matrix = TextMatrix::default();
        let mut in_text = false;

        for op in content.operations {
            match op.operator.as_str() {
                "BT" => {
                    in_text = true;
                    matrix = TextMatrix::default();
                }
                "ET" => in_text = false,
                "Tf" if op.operands.len() >= 2 => {
                    if let Object::Name(key) = &op.operands[0] {
                        current_font_key = key.clone();
                        current_font = fonts
                            .get(key.as_slice())
                            .cloned()
                            .unwrap_or_else(|| String::from_utf8_lossy(key).to_string());
                    }
                    current_font_size = get_number(&op.operands[1]).unwrap_or(12.0);
                }
                "TL" => {
                    leading = op.operands.first().and_then(get_number).unwrap_or(0.0);
                }
                "Td" | "TD" if op.operands.len() >= 2 => {
                    let tx = get_number(&op.operands[0]).unwrap_or(0.0);
                    let ty = get_number(&op.operands[1]).unwrap_or(0.0);
                    if op.operator == "TD" {
                        leading = -ty;
                    }
                    matrix.translate(tx, ty);
                }
                "Tm" if op.operands.len() >= 6 => {
                    let n: Vec<f32> = op
                        .operands
                        .iter()
                        .map(|o| get_number(o).unwrap_or(0.0))
                        .collect();
                    matrix.set(n[0], n[1], n[2], n[3], n[4], n[5]);
                }
                "T*" => matrix.next_line(leading),
                "Tj" | "TJ" | "'" | "\"" => {
                    if matches!(op.operator.as_str(), "'" | "\"") {
                        matrix.next_line(leading);
                    }
                    if !in_text {
                        continue;
                    }

                    let encoding = lopdf_fonts
                        .get(&current_font_key)
                        .and_then(|f| f.get_font_encoding(self.doc).ok());
                    let decode = |bytes: &[u8]| match encoding {
                        Some(ref enc) => LopdfDocument::decode_text(enc, bytes).unwrap_or_default(),
                        None => decode_text_simple(bytes),
                    };

                    let text = match op.operator.as_str() {
                        "TJ" => match op.operands.first() {
                            Some(Object::Array(arr)) => decode_tj_array(arr, decode),
                            _ => String::new(),
                        },
                        "\"" => match op.operands.get(2) {
                            Some(Object::String(bytes, _)) => decode(bytes.as_slice()),
                            _ => String::new(),
                        },
                        _ => match op.operands.first() {
                            Some(Object::String(bytes, _)) => decode(bytes.as_slice()),
                            _ => String::new(),
                        },
                    };

                    if !text.trim().is_empty() {
                        let text: String = text.nfc().collect();
                        let (x, y) = matrix.position();
                        spans.push(TextSpan::new(
                            text.trim(),
                            x,
                            y,
                            current_font_size * matrix.scale(),
                            current_font.clone(),
                        ));
                    }
                }
                _ => {}
            }
        }

        Ok(spans)
    }
}

/// Stream bytes, decoded only when the stream declares a `/Filter`.
fn stream_content(stream: &Stream) -> Result<Vec<u8>> {
    if stream.dict.has(b"Filter") {
        Ok(stream.decompressed_content()?)
    } else {
        Ok(stream.content.clone())
    }
}

/// Decode a TJ array, inserting a space on large negative kerning.
fn decode_tj_array(items: &[Object], decode: impl Fn(&[u8]) -> String) -> String {
    // 1/1000 text space units; ~0.2em usually marks a word gap
    const SPACE_THRESHOLD: f32 = 200.0;

    let mut combined = String::new();
    for item in items {
        match item {
            Object::String(bytes, _) => combined.push_str(&decode(bytes.as_slice())),
            other => {
                let Some(n) = get_number(other) else {
                    continue;
                };
                if -n > SPACE_THRESHOLD && !combined.is_empty() && !combined.ends_with(' ') {
                    combined.push(' ');
                }
            }
        }
    }
    combined
}

/// Group spans into lines by baseline, top to bottom, left to right.
fn group_spans_into_lines(mut spans: Vec<TextSpan>) -> Vec<TextLine> {
    // PDF Y grows upwards
    spans.sort_by(|a, b| {
        b.y.partial_cmp(&a.y)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal))
    });

    let mut lines: Vec<TextLine> = Vec::new();
    let mut current: Vec<TextSpan> = Vec::new();
    let mut current_y: Option<f32> = None;

    for span in spans {
        let tolerance = span.font_size * 0.3;
        match current_y {
            Some(y) if (span.y - y).abs() <= tolerance => current.push(span),
            _ => {
                if !current.is_empty() {
                    lines.push(finish_line(std::mem::take(&mut current)));
                }
                current_y = Some(span.y);
                current.push(span);
            }
        }
    }

    if !current.is_empty() {
        lines.push(finish_line(current));
    }

    lines
}

fn finish_line(mut spans: Vec<TextSpan>) -> TextLine {
    spans.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal));
    TextLine::new(spans)
}

/// Group lines into blocks on spacing, size, weight, or indentation changes.
fn group_lines_into_blocks(lines: Vec<TextLine>) -> Vec<TextBlock> {
    let avg_spacing = average_line_spacing(&lines);
    let mut blocks: Vec<TextBlock> = Vec::new();
    let mut current: Vec<TextLine> = Vec::new();

    for line in lines {
        if let Some(prev) = current.last() {
            if should_break_block(prev, &line, avg_spacing) {
                blocks.push(TextBlock::new(std::mem::take(&mut current)));
            }
        }
        current.push(line);
    }

    if !current.is_empty() {
        blocks.push(TextBlock::new(current));
    }

    blocks
}

fn average_line_spacing(lines: &[TextLine]) -> f32 {
    let spacings: Vec<f32> = lines
        .windows(2)
        .map(|w| (w[0].y() - w[1].y()).abs())
        .filter(|s| *s > 0.1)
        .collect();

    if spacings.is_empty() {
        return 12.0;
    }
    spacings.iter().sum::<f32>() / spacings.len() as f32
}

fn should_break_block(prev: &TextLine, curr: &TextLine, avg_spacing: f32) -> bool {
    if (prev.y() - curr.y()).abs() > avg_spacing * 1.5 {
        return true;
    }
    if (line_font_size(prev) - line_font_size(curr)).abs() > 1.0 {
        return true;
    }
    if line_is_bold(prev) != line_is_bold(curr) {
        return true;
    }
    (prev.x() - curr.x()).abs() > 20.0
}

/// Font size weighted by text length.
fn line_font_size(line: &TextLine) -> f32 {
    let total: usize = line.spans.iter().map(|s| s.text.len()).sum();
    if total == 0 {
        return line.spans.first().map(|s| s.font_size).unwrap_or(0.0);
    }
    let weighted: f32 = line
        .spans
        .iter()
        .map(|s| s.font_size * s.text.len() as f32)
        .sum();
    weighted / total as f32
}

fn line_is_bold(line: &TextLine) -> bool {
    let bold: usize = line
        .spans
        .iter()
        .filter(|s| s.is_bold)
        .map(|s| s.text.len())
        .sum();
    let total: usize = line.spans.iter().map(|s| s.text.len()).sum();
    total > 0 && bold * 2 > total
}

/// Text matrix for tracking position in a content stream.
#[derive(Debug, Clone)]
struct TextMatrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Default for TextMatrix {
    fn default() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: 0.0,
            f: 0.0,
        }
    }
}

impl TextMatrix {
    fn set(&mut self, a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) {
        *self = Self { a, b, c, d, e, f };
    }

    fn translate(&mut self, tx: f32, ty: f32) {
        self.e += tx * self.a + ty * self.c;
        self.f += tx * self.b + ty * self.d;
    }

    fn next_line(&mut self, leading: f32) {
        let leading = if leading > 0.0 { leading } else { 12.0 };
        self.translate(0.0, -leading);
    }

    fn position(&self) -> (f32, f32) {
        (self.e, self.f)
    }

    fn scale(&self) -> f32 {
        (self.a * self.a + self.c * self.c).sqrt()
    }
}

fn get_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Text decoding fallback when the font has no usable encoding.
fn decode_text_simple(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16(&utf16).unwrap_or_default();
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    // Latin-1
    bytes.iter().map(|&b| b as char).collect()
}
