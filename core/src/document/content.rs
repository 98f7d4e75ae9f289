use super::layout::{BoundingBox, TextRun};
use lopdf::content::{Content, Operation};
use lopdf::Object;

/// Average glyph advance as a fraction of the font size
///
/// Widths are estimated; exact metrics would need the font programs and
/// the locator only relies on left-to-right order.
const AVG_GLYPH_WIDTH: f32 = 0.5;

/// TJ adjustment (thousandths of an em) wide enough to read as a space
const TJ_SPACE_THRESHOLD: f32 = -200.0;

type Matrix = [f32; 6];

const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

fn multiply(m: &Matrix, n: &Matrix) -> Matrix {
    [
        m[0] * n[0] + m[1] * n[2],
        m[0] * n[1] + m[1] * n[3],
        m[2] * n[0] + m[3] * n[2],
        m[2] * n[1] + m[3] * n[3],
        m[4] * n[0] + m[5] * n[2] + n[4],
        m[4] * n[1] + m[5] * n[3] + n[5],
    ]
}

fn translation(tx: f32, ty: f32) -> Matrix {
    [1.0, 0.0, 0.0, 1.0, tx, ty]
}

/// Text state carried between operators of one content stream
struct TextState {
    font_size: f32,
    leading: f32,
    tm: Matrix,
    tlm: Matrix,
    ctm: Matrix,
    ctm_stack: Vec<Matrix>,
    page_height: f32,
    runs: Vec<TextRun>,
}

impl TextState {
    fn new(page_height: f32) -> Self {
        Self {
            font_size: 12.0,
            leading: 0.0,
            tm: IDENTITY,
            tlm: IDENTITY,
            ctm: IDENTITY,
            ctm_stack: Vec::new(),
            page_height,
            runs: Vec::new(),
        }
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.tlm = multiply(&translation(tx, ty), &self.tlm);
        self.tm = self.tlm;
    }

    fn next_line(&mut self) {
        self.move_line(0.0, -self.leading);
    }

    fn show(&mut self, text: String) {
        let glyphs = text.chars().count() as f32;
        let m = multiply(&self.tm, &self.ctm);
        let scale = (m[2] * m[2] + m[3] * m[3]).sqrt();
        let size = if scale > 0.0 {
            self.font_size * scale
        } else {
            self.font_size
        };

        let baseline = self.page_height - m[5];
        let width = glyphs * size * AVG_GLYPH_WIDTH;
        self.runs.push(TextRun::new(
            text,
            BoundingBox::new(m[4], baseline - size, m[4] + width, baseline),
        ));

        let advance = glyphs * self.font_size * AVG_GLYPH_WIDTH;
        self.tm = multiply(&translation(advance, 0.0), &self.tm);
    }

    fn apply(&mut self, op: &Operation) {
        let operands = &op.operands;
        match op.operator.as_str() {
            "q" => self.ctm_stack.push(self.ctm),
            "Q" => {
                if let Some(ctm) = self.ctm_stack.pop() {
                    self.ctm = ctm;
                }
            }
            "cm" => {
                if let Some(m) = matrix(operands) {
                    self.ctm = multiply(&m, &self.ctm);
                }
            }
            "BT" => {
                self.tm = IDENTITY;
                self.tlm = IDENTITY;
            }
            "Tf" => {
                if let Some(size) = operands.get(1).and_then(number) {
                    self.font_size = size;
                }
            }
            "TL" => {
                if let Some(leading) = operands.first().and_then(number) {
                    self.leading = leading;
                }
            }
            "Td" | "TD" => {
                let tx = operands.first().and_then(number).unwrap_or(0.0);
                let ty = operands.get(1).and_then(number).unwrap_or(0.0);
                if op.operator == "TD" {
                    self.leading = -ty;
                }
                self.move_line(tx, ty);
            }
            "Tm" => {
                if let Some(m) = matrix(operands) {
                    self.tm = m;
                    self.tlm = m;
                }
            }
            "T*" => self.next_line(),
            "Tj" => {
                if let Some(text) = operands.first().and_then(string) {
                    self.show(text);
                }
            }
            "'" => {
                self.next_line();
                if let Some(text) = operands.first().and_then(string) {
                    self.show(text);
                }
            }
            "\"" => {
                self.next_line();
                if let Some(text) = operands.get(2).and_then(string) {
                    self.show(text);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = operands.first() {
                    let mut text = String::new();
                    for item in items {
                        if let Some(piece) = string(item) {
                            text.push_str(&piece);
                        } else if number(item).is_some_and(|n| n < TJ_SPACE_THRESHOLD) {
                            text.push(' ');
                        }
                    }
                    self.show(text);
                }
            }
            _ => {}
        }
    }
}

/// Decodes a page content stream into positioned text runs
///
/// Coordinates are flipped so that the origin is the top-left corner of a
/// page `page_height` points tall.
///
/// # Errors
///
/// Returns the parser error when the stream is not a valid content stream
pub fn decode_runs(content: &[u8], page_height: f32) -> lopdf::Result<Vec<TextRun>> {
    let content = Content::decode(content)?;
    Ok(interpret(&content.operations, page_height))
}

/// Runs the text operators of an already decoded stream
pub fn interpret(operations: &[Operation], page_height: f32) -> Vec<TextRun> {
    let mut state = TextState::new(page_height);
    for op in operations {
        state.apply(op);
    }
    state.runs
}

/// Decodes a PDF string object
///
/// Strings with a UTF-16BE byte order mark are decoded as such; anything
/// else is read as Latin-1, which matches the WinAnsi encoding of the
/// standard fonts for the accented letters used in Portuguese.
pub fn decode_text(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks(2)
            .map(|pair| u16::from_be_bytes([pair[0], *pair.get(1).unwrap_or(&0)]))
            .collect();
        return char::decode_utf16(units)
            .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect();
    }
    bytes.iter().map(|&b| b as char).collect()
}

/// Heuristic check that decoded text is human-readable
///
/// Fonts with custom encodings (Identity-H and friends) decode to control
/// characters and stray symbols; such pages are re-read with the library
/// text extractor.
pub fn is_readable(text: &str) -> bool {
    let mut total = 0usize;
    let mut plain = 0usize;
    let mut alphanumeric = 0usize;
    for c in text.chars().filter(|c| !c.is_whitespace()) {
        total += 1;
        if c.is_alphanumeric() {
            alphanumeric += 1;
            plain += 1;
        } else if c.is_ascii_punctuation() || "ºª°".contains(c) {
            plain += 1;
        }
    }
    alphanumeric > 0 && plain as f32 / total as f32 >= 0.85
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

fn string(obj: &Object) -> Option<String> {
    match obj {
        Object::String(bytes, _) => Some(decode_text(bytes)),
        _ => None,
    }
}

fn matrix(operands: &[Object]) -> Option<Matrix> {
    if operands.len() != 6 {
        return None;
    }
    let mut m = IDENTITY;
    for (slot, obj) in m.iter_mut().zip(operands) {
        *slot = number(obj)?;
    }
    Some(m)
}
