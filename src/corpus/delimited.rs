//! Comma- and tab-separated corpus files.

use std::path::Path;

use encoding_rs::{Encoding, UTF_8};

use crate::error::LoadError;

pub fn read_delimited_rows(path: &Path, delimiter: char) -> Result<Vec<Vec<String>>, LoadError> {
    let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let text = decode_text(&bytes)?;
    parse_delimited(&text, delimiter)
}

/// Decodes UTF-8 (with or without BOM) or a BOM-marked UTF-16 file.
pub fn decode_text(bytes: &[u8]) -> Result<String, LoadError> {
    let (encoding, bom_len) = Encoding::for_bom(bytes).unwrap_or((UTF_8, 0));
    let (text, had_errors) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
    if had_errors {
        return Err(LoadError::Malformed(format!(
            "corpus is not valid {}",
            encoding.name()
        )));
    }
    Ok(text.into_owned())
}

/// Splits `text` into records. Fields may be wrapped in double quotes, in which case they can
/// contain the delimiter, line breaks and doubled quotes (`""`).
pub fn parse_delimited(text: &str, delimiter: char) -> Result<Vec<Vec<String>>, LoadError> {
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut quote_line = 0usize;
    let mut line = 1usize;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            match ch {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(ch);
                }
                _ => field.push(ch),
            }
            continue;
        }
        match ch {
            '"' if field.is_empty() => {
                in_quotes = true;
                quote_line = line;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\r' | '\n' => {
                line += 1;
                row.push(std::mem::take(&mut field));
                rows.push(std::mem::take(&mut row));
            }
            c if c == delimiter => row.push(std::mem::take(&mut field)),
            _ => field.push(ch),
        }
    }
    if in_quotes {
        return Err(LoadError::Malformed(format!(
            "unterminated quoted field starting on line {quote_line}"
        )));
    }
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::{decode_text, parse_delimited};
    use crate::error::LoadError;

    #[test]
    fn quoted_fields_keep_delimiters_and_quotes() {
        let text = "華語,族語\r\n\"你好，朋友\",\"Kia su hug, \"\"bsuyan\"\"\"\n早安,\"Embiyax\nsu\"\n";
        let rows = parse_delimited(text, ',').expect("parse");
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], vec!["華語", "族語"]);
        assert_eq!(rows[1], vec!["你好，朋友", "Kia su hug, \"bsuyan\""]);
        assert_eq!(rows[2], vec!["早安", "Embiyax\nsu"]);
    }

    #[test]
    fn tab_separated_without_trailing_newline() {
        let rows = parse_delimited("一\tkingal\n二\tdha", '\t').expect("parse");
        assert_eq!(rows, vec![vec!["一", "kingal"], vec!["二", "dha"]]);
    }

    #[test]
    fn blank_lines_become_single_empty_field() {
        let rows = parse_delimited("a,b\n\nc,d\n", ',').expect("parse");
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1], vec![""]);
    }

    #[test]
    fn unterminated_quote_is_malformed() {
        let err = parse_delimited("a,\"b\nc,d\n", ',').unwrap_err();
        assert!(matches!(err, LoadError::Malformed(_)));
    }

    #[test]
    fn decode_strips_utf8_bom_and_reads_utf16() {
        let mut utf8 = vec![0xEF, 0xBB, 0xBF];
        utf8.extend_from_slice("你好,Kia".as_bytes());
        assert_eq!(decode_text(&utf8).expect("utf8"), "你好,Kia");

        let mut utf16 = vec![0xFF, 0xFE];
        for unit in "好".encode_utf16() {
            utf16.extend_from_slice(&unit.to_le_bytes());
        }
        assert_eq!(decode_text(&utf16).expect("utf16"), "好");

        assert!(decode_text(&[0xFF, 0x41, 0x42]).is_err());
    }
}
