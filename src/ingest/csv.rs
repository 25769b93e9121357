//! Delimited-text reading: quote-aware splitting and delimiter sniffing

// ============================================================================
// Quote-Aware Splitting
// ============================================================================

/// Split a line on `delimiter`, respecting quoted fields (delimiters inside
/// quotes, `""` escapes). Returns owned strings because quoted fields need
/// unquoting.
pub fn split_line(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                if in_quotes {
                    // Check for escaped quote ("")
                    if chars.peek() == Some(&'"') {
                        current.push('"');
                        chars.next();
                    } else {
                        in_quotes = false;
                    }
                } else {
                    in_quotes = true;
                }
            }
            c if c == delimiter && !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }
    fields.push(current);
    fields
}

// ============================================================================
// Delimiter Detection
// ============================================================================

const CANDIDATE_DELIMITERS: [char; 3] = [',', ';', '\t'];

/// Pick the delimiter that splits the header into the most fields, preferring
/// one that gives the same field count on the following sample lines.
///
/// European exports use `;` with `,` as the decimal mark, so a plain count on
/// the header alone is not enough.
pub fn sniff_delimiter<'a>(lines: impl IntoIterator<Item = &'a str>) -> char {
    let sample: Vec<&str> = lines.into_iter().take(6).collect();
    let Some(header) = sample.first() else {
        return ',';
    };

    let mut best = (',', 0usize, false);
    for delim in CANDIDATE_DELIMITERS {
        let width = split_line(header, delim).len();
        if width < 2 {
            continue;
        }
        let consistent = sample[1..]
            .iter()
            .filter(|l| !l.trim().is_empty())
            .all(|l| split_line(l, delim).len() == width);
        let (_, best_width, best_consistent) = best;
        if (consistent && !best_consistent) || (consistent == best_consistent && width > best_width) {
            best = (delim, width, consistent);
        }
    }
    best.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_plain() {
        assert_eq!(split_line("a,b,c", ','), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_split_quoted_delimiter() {
        assert_eq!(
            split_line(r#""Crack 1, north wall",0.5"#, ','),
            vec!["Crack 1, north wall", "0.5"]
        );
    }

    #[test]
    fn test_split_escaped_quote() {
        assert_eq!(split_line(r#""say ""hi""",x"#, ','), vec![r#"say "hi""#, "x"]);
    }

    #[test]
    fn test_split_trailing_empty() {
        assert_eq!(split_line("a,,", ','), vec!["a", "", ""]);
    }

    #[test]
    fn test_sniff_semicolon_with_decimal_commas() {
        let lines = ["Date;Crack A;Crack B", "01/01/2024;0,12;0,30", "02/01/2024;0,13;0,31"];
        assert_eq!(sniff_delimiter(lines), ';');
    }

    #[test]
    fn test_sniff_tab() {
        let lines = ["Date\tCrack A", "01/01/2024\t0.1"];
        assert_eq!(sniff_delimiter(lines), '\t');
    }

    #[test]
    fn test_sniff_defaults_to_comma() {
        assert_eq!(sniff_delimiter(["single"]), ',');
        assert_eq!(sniff_delimiter(Vec::<&str>::new()), ',');
    }
}
