/// One source line without its terminator; `number` is 1-based.
#[derive(Debug, Clone)]
pub struct LineRecord {
    pub text: String,
    pub number: usize,
}

/// Split `input` on `\n`, dropping a trailing `\r`. A final newline does not
/// produce an empty last line.
pub fn lines_from_str(input: &str) -> Vec<LineRecord> {
    input
        .split_inclusive('\n')
        .enumerate()
        .map(|(index, raw)| {
            let text = raw
                .strip_suffix('\n')
                .map(|text| text.strip_suffix('\r').unwrap_or(text))
                .unwrap_or(raw);
            LineRecord {
                text: text.to_string(),
                number: index + 1,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_lines_and_strips_crlf() {
        let lines = lines_from_str("first\r\nsecond\n\nlast");
        let texts: Vec<_> = lines.iter().map(|line| line.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "", "last"]);
        assert_eq!(lines[3].number, 4);
    }

    #[test]
    fn trailing_newline_adds_no_line() {
        assert_eq!(lines_from_str("only\n").len(), 1);
        assert!(lines_from_str("").is_empty());
    }
}
