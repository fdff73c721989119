//! Splits a prompt template into literal text and field references.
//!
//! Parsing never fails: anything that is not a well-formed field is returned
//! as literal text.

/// One piece of a parsed template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Piece<'a> {
    /// Text copied to the output as-is
    Literal(&'a str),
    /// A field reference
    Field {
        /// Field name, including a leading `$` for environment lookups
        name: &'a str,
        /// Text after the first `:`, if any
        spec: Option<&'a str>,
        /// The exact source text of the reference
        raw: &'a str,
    },
}

/// Parse `template` into pieces.
///
/// - `{name}` and `{name:spec}` are fields; the format spec may contain balanced
///   braces.
/// - `{{name` is also a field named `name`; a directly following `}}` or `}`
///   is consumed with it.
/// - `{{` not followed by a name is a literal `{`, and `}}` is a literal `}`.
/// - A `{` without a matching `}`, a lone `}`, and a braced span whose name is
///   empty or invalid are literal text.
pub(crate) fn parse(template: &str) -> Vec<Piece<'_>> {
    let bytes = template.as_bytes();
    let len = bytes.len();
    let mut pieces = Vec::new();
    let mut lit_start = 0;
    let mut i = 0;

    while i < len {
        match bytes[i] {
            b'{' if bytes.get(i + 1) == Some(&b'{') => {
                let name_end = scan_name(bytes, i + 2);
                flush(&mut pieces, template, lit_start, i);
                if name_end > i + 2 {
                    let mut end = name_end;
                    if template[end..].starts_with("}}") {
                        end += 2;
                    } else if bytes.get(end) == Some(&b'}') {
                        end += 1;
                    }
                    pieces.push(Piece::Field {
                        name: &template[i + 2..name_end],
                        spec: None,
                        raw: &template[i..end],
                    });
                    i = end;
                } else {
                    pieces.push(Piece::Literal(&template[i..i + 1]));
                    i += 2;
                }
                lit_start = i;
            }
            b'{' => match find_close(bytes, i) {
                Some(close) => {
                    let inner = &template[i + 1..close];
                    let (name, spec) = match inner.split_once(':') {
                        Some((name, spec)) => (name, Some(spec)),
                        None => (inner, None),
                    };
                    if is_valid_name(name) {
                        flush(&mut pieces, template, lit_start, i);
                        pieces.push(Piece::Field {
                            name,
                            spec,
                            raw: &template[i..=close],
                        });
                        lit_start = close + 1;
                    }
                    i = close + 1;
                }
                None => i = len,
            },
            b'}' if bytes.get(i + 1) == Some(&b'}') => {
                flush(&mut pieces, template, lit_start, i);
                pieces.push(Piece::Literal(&template[i..i + 1]));
                i += 2;
                lit_start = i;
            }
            _ => i += 1,
        }
    }
    flush(&mut pieces, template, lit_start, len);
    pieces
}

fn flush<'a>(pieces: &mut Vec<Piece<'a>>, template: &'a str, start: usize, end: usize) {
    if start < end {
        pieces.push(Piece::Literal(&template[start..end]));
    }
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// End of the field name starting at `start`, or `start` if there is none.
fn scan_name(bytes: &[u8], start: usize) -> usize {
    let mut end = start;
    if bytes.get(end) == Some(&b'$') {
        end += 1;
    }
    let body = end;
    while bytes.get(end).is_some_and(|b| is_name_byte(*b)) {
        end += 1;
    }
    if end == body { start } else { end }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && scan_name(name.as_bytes(), 0) == name.len()
}

/// Index of the `}` closing the `{` at `open`, counting nested braces.
fn find_close(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (offset, b) in bytes[open..].iter().enumerate() {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + offset);
                }
            }
            _ => {}
        }
    }
    None
}
