/// Incremental parser for the chat token stream.
///
/// The stream is line oriented: every line starting with `data:` carries one
/// token in the rest of the line, with leading whitespace trimmed. Other lines
/// are ignored. Lines end at `\n`, `\r\n` or a bare `\r`. Bytes are buffered
/// until a full line is available, so the tokens produced never depend on how
/// the transport split the body.
#[derive(Debug, Default)]
pub struct DataLineParser {
    buffer: Vec<u8>,
    // A `\r` closed the previous line; a `\n` right after it belongs to it.
    after_cr: bool,
}

impl DataLineParser {
    /// Feed arbitrary bytes into the parser and drain complete tokens.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut tokens = Vec::new();

        for &byte in bytes {
            if std::mem::take(&mut self.after_cr) && byte == b'\n' {
                continue;
            }
            match byte {
                b'\n' | b'\r' => {
                    self.after_cr = byte == b'\r';
                    let line = std::mem::take(&mut self.buffer);
                    tokens.extend(extract_token(&line));
                }
                _ => self.buffer.push(byte),
            }
        }

        tokens
    }

    /// Flush a trailing line that was not terminated by a line break.
    pub fn finish(&mut self) -> Option<String> {
        self.after_cr = false;
        let rest = std::mem::take(&mut self.buffer);
        if rest.is_empty() {
            return None;
        }
        extract_token(&rest)
    }

    /// Parse a complete body in one shot.
    pub fn parse_lines(input: &str) -> Vec<String> {
        let mut parser = Self::default();
        let mut tokens = parser.feed(input.as_bytes());
        tokens.extend(parser.finish());
        tokens
    }

    pub fn is_empty_buffer(&self) -> bool {
        self.buffer.is_empty()
    }
}

fn extract_token(line: &[u8]) -> Option<String> {
    let line = String::from_utf8_lossy(line);
    line.strip_prefix("data:")
        .map(|rest| rest.trim_start().to_string())
}

#[cfg(test)]
mod tests {
    use super::DataLineParser;

    #[test]
    fn parse_data_lines_incrementally() {
        let mut parser = DataLineParser::default();
        let mut tokens = Vec::new();

        tokens.extend(parser.feed(b"data: Hello\n"));
        assert_eq!(tokens, vec!["Hello".to_string()]);

        tokens.extend(parser.feed(b"data: wor"));
        assert_eq!(tokens.len(), 1);
        assert!(!parser.is_empty_buffer());

        tokens.extend(parser.feed(b"ld\n"));
        assert_eq!(tokens, vec!["Hello".to_string(), "world".to_string()]);
        assert!(parser.is_empty_buffer());
    }

    #[test]
    fn multibyte_characters_survive_any_split() {
        let body = "data: ¿Dónde está el lateral? ⚽\n".as_bytes();
        for split in 0..body.len() {
            let mut parser = DataLineParser::default();
            let mut tokens = parser.feed(&body[..split]);
            tokens.extend(parser.feed(&body[split..]));
            assert_eq!(tokens, vec!["¿Dónde está el lateral? ⚽".to_string()]);
        }
    }
}
