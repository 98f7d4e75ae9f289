use std::fmt;

/// Axis-aligned box in page space, origin at the top-left corner
///
/// `bottom` is the text baseline.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct BoundingBox {
    pub x0: f32,
    pub top: f32,
    pub x1: f32,
    pub bottom: f32,
}

impl BoundingBox {
    pub fn new(x0: f32, top: f32, x1: f32, bottom: f32) -> Self {
        Self {
            x0,
            top,
            x1: x1.max(x0),
            bottom: bottom.max(top),
        }
    }

    /// Smallest box containing both
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            x0: self.x0.min(other.x0),
            top: self.top.min(other.top),
            x1: self.x1.max(other.x1),
            bottom: self.bottom.max(other.bottom),
        }
    }
}

/// One string painted by a single text-showing operator
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct TextRun {
    pub text: String,
    pub bbox: BoundingBox,
}

impl TextRun {
    pub fn new(text: impl Into<String>, bbox: BoundingBox) -> Self {
        Self {
            text: text.into(),
            bbox,
        }
    }
}

/// Runs sharing a baseline, ordered left to right
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct TextLine {
    pub runs: Vec<TextRun>,
}

impl TextLine {
    /// Joined text of the line with runs separated by a single space
    pub fn text(&self) -> String {
        let mut out = String::new();
        for run in &self.runs {
            let piece = run.text.trim();
            if piece.is_empty() {
                continue;
            }
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(piece);
        }
        out
    }

    /// Baseline of the first run, measured from the top of the page
    pub fn baseline(&self) -> f32 {
        self.runs.first().map(|r| r.bbox.bottom).unwrap_or(0.0)
    }

    pub fn bbox(&self) -> Option<BoundingBox> {
        let mut runs = self.runs.iter();
        let first = runs.next()?.bbox;
        Some(runs.fold(first, |acc, r| acc.union(&r.bbox)))
    }

    pub fn is_blank(&self) -> bool {
        self.runs.iter().all(|r| r.text.trim().is_empty())
    }
}

impl fmt::Display for TextLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text())
    }
}

/// Groups runs into lines by vertical proximity
///
/// # Algorithm
///
/// 1. Sort runs top to bottom, then left to right
/// 2. A run joins the current line when its baseline lies within
///    `tolerance` of the line's first run; otherwise it opens a new line
/// 3. Runs inside each line are re-sorted left to right
///
/// Blank lines are dropped.
pub fn group_lines(mut runs: Vec<TextRun>, tolerance: f32) -> Vec<TextLine> {
    runs.sort_by(|a, b| {
        a.bbox
            .bottom
            .total_cmp(&b.bbox.bottom)
            .then(a.bbox.x0.total_cmp(&b.bbox.x0))
    });

    let mut lines: Vec<TextLine> = Vec::new();
    let mut current: Vec<TextRun> = Vec::new();
    let mut current_baseline = f32::NAN;

    for run in runs {
        if !current.is_empty() && (run.bbox.bottom - current_baseline).abs() <= tolerance {
            current.push(run);
            continue;
        }
        if !current.is_empty() {
            lines.push(finish_line(std::mem::take(&mut current)));
        }
        current_baseline = run.bbox.bottom;
        current.push(run);
    }
    if !current.is_empty() {
        lines.push(finish_line(current));
    }

    lines.retain(|l| !l.is_blank());
    lines
}

fn finish_line(mut runs: Vec<TextRun>) -> TextLine {
    runs.sort_by(|a, b| a.bbox.x0.total_cmp(&b.bbox.x0));
    TextLine { runs }
}
