/// Labels shorter than this (after folding) must match exactly
pub const MIN_FUZZY_LABEL_LEN: usize = 4;

/// Folds a character to lowercase ASCII where a Portuguese accent is involved
pub fn fold_char(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' | 'Á' | 'À' | 'Â' | 'Ã' | 'Ä' | 'ª' => 'a',
        'é' | 'è' | 'ê' | 'ë' | 'É' | 'È' | 'Ê' | 'Ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' | 'Í' | 'Ì' | 'Î' | 'Ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' | 'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' | 'º' => 'o',
        'ú' | 'ù' | 'û' | 'ü' | 'Ú' | 'Ù' | 'Û' | 'Ü' => 'u',
        'ç' | 'Ç' => 'c',
        'ñ' | 'Ñ' => 'n',
        other => other.to_lowercase().next().unwrap_or(other),
    }
}

/// Case- and accent-insensitive form of `s` with whitespace collapsed
///
/// # Example
///
/// ```
/// use mamoscan_core::extraction::text::fold;
///
/// assert_eq!(fold("  Nome da  Mãe: "), "nome da mae:");
/// ```
pub fn fold(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for word in s.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.extend(word.chars().map(fold_char));
    }
    out
}

/// Whitespace-delimited token with its byte span in the source line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub text: &'a str,
    pub start: usize,
    pub end: usize,
}

/// Splits a line into tokens
///
/// A colon glued to the following word (`Nome:MARIA`) also splits, so the
/// label and its value become separate tokens. Colons between digits
/// (`10:30`) are left alone.
pub fn tokenize(line: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;
    let mut prev: Option<char> = None;

    let mut iter = line.char_indices().peekable();
    while let Some((i, c)) = iter.next() {
        if c.is_whitespace() {
            if let Some(s) = start.take() {
                tokens.push(Token {
                    text: &line[s..i],
                    start: s,
                    end: i,
                });
            }
            prev = Some(c);
            continue;
        }
        if start.is_none() {
            start = Some(i);
        }
        if c == ':' && prev.is_some_and(char::is_alphabetic) {
            if let Some(&(next_i, next_c)) = iter.peek() {
                if !next_c.is_whitespace() {
                    let s = start.take().unwrap_or(i);
                    tokens.push(Token {
                        text: &line[s..next_i],
                        start: s,
                        end: next_i,
                    });
                }
            }
        }
        prev = Some(c);
    }
    if let Some(s) = start {
        tokens.push(Token {
            text: &line[s..],
            start: s,
            end: line.len(),
        });
    }
    tokens
}

/// Compares a folded candidate with a folded label
///
/// Short labels only match exactly: a single edit on a two-letter label
/// like `UF` would accept almost anything.
pub fn folded_label_matches(candidate: &str, label: &str, max_edits: usize) -> bool {
    if candidate == label {
        return true;
    }
    if label.chars().count() < MIN_FUZZY_LABEL_LEN {
        return false;
    }
    strsim::levenshtein(candidate, label) <= max_edits
}

/// True when a whole line is the given heading
///
/// A trailing colon on the line is ignored.
pub fn heading_matches(line: &str, heading: &str, max_edits: usize) -> bool {
    let folded = fold(line);
    let folded = folded.trim_end_matches(':').trim_end();
    folded_label_matches(folded, &fold(heading), max_edits)
}
