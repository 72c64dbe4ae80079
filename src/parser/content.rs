//! Content stream parsing.
//!
//! Lexemes are recognized with `nom` combinators and grouped into operations
//! (operands followed by an operator). Parsing never stops early: bytes that
//! start no valid lexeme come back as [`ContentItem::Invalid`] and the parser
//! resumes right after them, so one bad token costs only that token.
//!
//! The image walker and the text layer both read pages through
//! [`ContentParser`].

use nom::{
    branch::alt,
    bytes::complete::{tag, take_till, take_while, take_while1},
    character::complete::{char, digit0, digit1, one_of, satisfy},
    combinator::{map, opt, recognize, value},
    multi::many0,
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};

/// An operand of a content stream operator.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Integer or real
    Number(f64),
    /// Name, without the slash and with `#xx` escapes decoded
    Name(String),
    /// Literal or hex string, escapes decoded
    Str(Vec<u8>),
    /// Array of operands
    Array(Vec<Operand>),
    /// Dictionary, boolean or null
    Other,
}

impl Operand {
    /// The value when this is a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Operand::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The name when this is a name.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Operand::Name(n) => Some(n),
            _ => None,
        }
    }

    /// The bytes when this is a string.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Operand::Str(b) => Some(b),
            _ => None,
        }
    }
}

/// A single operation from a PDF content stream.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentOp {
    pub operator: String,
    pub operands: Vec<Operand>,
    /// Byte offset of the operator keyword
    pub offset: usize,
}

impl ContentOp {
    /// An operation at offset zero.
    pub fn new(operator: impl Into<String>, operands: Vec<Operand>) -> Self {
        Self {
            operator: operator.into(),
            operands,
            offset: 0,
        }
    }
}

/// One item produced by [`ContentParser`].
#[derive(Debug, Clone, PartialEq)]
pub enum ContentItem {
    /// A complete operation
    Op(ContentOp),
    /// Bytes that were skipped
    Invalid { text: String, offset: usize },
}

fn is_whitespace(b: u8) -> bool {
    matches!(b, b'\0' | b'\t' | b'\n' | b'\x0C' | b'\r' | b' ')
}

fn is_delimiter(b: u8) -> bool {
    matches!(
        b,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

fn is_regular(b: u8) -> bool {
    !is_whitespace(b) && !is_delimiter(b)
}

/// Operators start with a letter or one of the quote operators.
fn is_operator_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '\'' || c == '"'
}

/// A lexical unit of a content stream.
#[derive(Debug, Clone, PartialEq)]
enum Lexeme<'a> {
    Number(f64),
    Name(String),
    Str(Vec<u8>),
    ArrayStart,
    ArrayEnd,
    DictStart,
    DictEnd,
    Keyword(&'a [u8]),
}

fn whitespace(input: &[u8]) -> IResult<&[u8], ()> {
    value((), take_while1(is_whitespace))(input)
}

/// `%` to end of line.
fn comment(input: &[u8]) -> IResult<&[u8], ()> {
    value((), preceded(char('%'), take_till(|c| c == b'\r' || c == b'\n')))(input)
}

fn skip_ws(input: &[u8]) -> IResult<&[u8], ()> {
    value((), many0(alt((whitespace, comment))))(input)
}

fn lex_error(input: &[u8], kind: nom::error::ErrorKind) -> nom::Err<nom::error::Error<&[u8]>> {
    nom::Err::Error(nom::error::Error::new(input, kind))
}

/// Integers and reals: `42`, `-2.5`, `.5`, `5.`. A number must end at a
/// delimiter or whitespace, so `1.2.3` is not a number.
fn parse_number(input: &[u8]) -> IResult<&[u8], Lexeme<'_>> {
    let (rest, raw) = recognize(tuple((
        opt(one_of("+-")),
        alt((
            recognize(pair(digit1, opt(pair(char('.'), digit0)))),
            recognize(pair(char('.'), digit1)),
        )),
    )))(input)?;

    if rest.first().is_some_and(|b| is_regular(*b)) {
        return Err(lex_error(input, nom::error::ErrorKind::Digit));
    }

    let number = std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|n| n.is_finite())
        .ok_or_else(|| lex_error(input, nom::error::ErrorKind::Float))?;
    Ok((rest, Lexeme::Number(number)))
}

/// Decode `#xx` escapes in a name.
fn decode_name_escapes(raw: &[u8]) -> String {
    let mut bytes = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'#' && i + 2 < raw.len() {
            let escaped = std::str::from_utf8(&raw[i + 1..i + 3])
                .ok()
                .and_then(|hex| u8::from_str_radix(hex, 16).ok());
            if let Some(v) = escaped {
                bytes.push(v);
                i += 3;
                continue;
            }
        }
        bytes.push(raw[i]);
        i += 1;
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

fn parse_name(input: &[u8]) -> IResult<&[u8], Lexeme<'_>> {
    map(preceded(char('/'), take_while(is_regular)), |raw: &[u8]| {
        Lexeme::Name(decode_name_escapes(raw))
    })(input)
}

/// Resolve backslash escapes inside a literal string body.
fn unescape_literal(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        let b = raw[i];
        i += 1;
        if b != b'\\' {
            out.push(b);
            continue;
        }
        let Some(&next) = raw.get(i) else {
            break;
        };
        i += 1;
        match next {
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0C),
            b'0'..=b'7' => {
                let mut code = u32::from(next - b'0');
                for _ in 0..2 {
                    match raw.get(i) {
                        Some(d @ b'0'..=b'7') => {
                            code = code * 8 + u32::from(d - b'0');
                            i += 1;
                        }
                        _ => break,
                    }
                }
                // High-order overflow is ignored
                out.push(code as u8);
            }
            // Line continuation
            b'\r' => {
                if raw.get(i) == Some(&b'\n') {
                    i += 1;
                }
            }
            b'\n' => {}
            other => out.push(other),
        }
    }
    out
}

/// Literal string with balanced parentheses.
fn parse_literal_string(input: &[u8]) -> IResult<&[u8], Lexeme<'_>> {
    let (body, _) = char('(')(input)?;
    let mut depth = 1usize;
    let mut pos = 0;

    while pos < body.len() {
        match body[pos] {
            b'\\' => pos += 1,
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    let text = unescape_literal(&body[..pos]);
                    return Ok((&body[pos + 1..], Lexeme::Str(text)));
                }
            }
            _ => {}
        }
        pos += 1;
    }

    Err(lex_error(input, nom::error::ErrorKind::Char))
}

fn decode_hex(raw: &[u8]) -> Vec<u8> {
    let digits: Vec<u8> = raw
        .iter()
        .filter_map(|b| (*b as char).to_digit(16).map(|d| d as u8))
        .collect();
    // An odd final digit is padded with zero
    digits
        .chunks(2)
        .map(|pair| (pair[0] << 4) | pair.get(1).copied().unwrap_or(0))
        .collect()
}

fn parse_hex_string(input: &[u8]) -> IResult<&[u8], Lexeme<'_>> {
    map(
        delimited(
            char('<'),
            take_while(|c: u8| c.is_ascii_hexdigit() || is_whitespace(c)),
            char('>'),
        ),
        |raw: &[u8]| Lexeme::Str(decode_hex(raw)),
    )(input)
}

fn parse_keyword(input: &[u8]) -> IResult<&[u8], Lexeme<'_>> {
    map(
        recognize(pair(satisfy(is_operator_start), take_while(is_regular))),
        Lexeme::Keyword,
    )(input)
}

/// One lexeme at the start of `input`. `<<` and `>>` are tried before hex
/// strings.
fn lexeme(input: &[u8]) -> IResult<&[u8], Lexeme<'_>> {
    alt((
        value(Lexeme::DictStart, tag(b"<<")),
        value(Lexeme::DictEnd, tag(b">>")),
        value(Lexeme::ArrayStart, tag(b"[")),
        value(Lexeme::ArrayEnd, tag(b"]")),
        parse_name,
        parse_number,
        parse_literal_string,
        parse_hex_string,
        parse_keyword,
    ))(input)
}

/// Consume the bytes at the start of `input` that start no lexeme.
///
/// A run of regular characters is skipped as a unit. An unclosed literal
/// string swallows the rest of the stream.
fn skip_invalid(input: &[u8]) -> (&[u8], String) {
    match input.first() {
        Some(b'(') => (&input[input.len()..], "unterminated string".to_string()),
        Some(b) if is_regular(*b) => {
            let end = input.iter().position(|c| !is_regular(*c)).unwrap_or(input.len());
            (
                &input[end..],
                String::from_utf8_lossy(&input[..end]).into_owned(),
            )
        }
        Some(b) => (&input[1..], (*b as char).to_string()),
        None => (input, String::new()),
    }
}

/// Offset of the whitespace byte before an `EI` that ends inline image
/// data. `EI` must be followed by whitespace, a delimiter or the end.
fn find_ei_operator(data: &[u8]) -> Option<usize> {
    (0..data.len().saturating_sub(2)).find(|&i| {
        is_whitespace(data[i])
            && &data[i + 1..i + 3] == b"EI"
            && data
                .get(i + 3)
                .map_or(true, |b| is_whitespace(*b) || is_delimiter(*b))
    })
}

/// Skip the dictionary and data of an inline image that follows `BI`.
/// Returns the input after `EI`, or `None` when the image never ends.
fn skip_inline_image(input: &[u8]) -> Option<&[u8]> {
    let mut rest = input;
    loop {
        let (r, _) = skip_ws(rest).ok()?;
        if r.is_empty() {
            return None;
        }
        match lexeme(r) {
            Ok((after, Lexeme::Keyword(k))) if k == b"ID" => {
                rest = after;
                break;
            }
            Ok((after, _)) => rest = after,
            Err(_) => rest = skip_invalid(r).0,
        }
    }

    let ei = find_ei_operator(rest)?;
    Some(&rest[ei + 3..])
}

/// An array or dictionary still waiting for its closing delimiter.
enum Open {
    Array(Vec<Operand>),
    Dict,
}

/// Error-recovering parser over decoded content stream bytes.
///
/// Operands collect until an operator keyword closes them into a
/// [`ContentOp`]. Skipped bytes do not discard the operands gathered so far.
/// Inline images (`BI ... ID <data> EI`) surface as a single `BI`
/// operation without operands.
pub struct ContentParser<'a> {
    data: &'a [u8],
    rest: &'a [u8],
    operands: Vec<Operand>,
    open: Vec<Open>,
}

impl<'a> ContentParser<'a> {
    /// Create a parser.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            rest: data,
            operands: Vec::new(),
            open: Vec::new(),
        }
    }

    fn offset(&self) -> usize {
        self.data.len() - self.rest.len()
    }

    fn push_operand(&mut self, operand: Operand) {
        match self.open.last_mut() {
            Some(Open::Array(items)) => items.push(operand),
            // Dictionary contents are not needed by any operator we read
            Some(Open::Dict) => {}
            None => self.operands.push(operand),
        }
    }

    fn operation(&mut self, keyword: &[u8], offset: usize) -> ContentItem {
        if !self.open.is_empty() {
            log::debug!("Operator at byte {} closes an unterminated array or dictionary", offset);
            self.open.clear();
        }

        let operator = String::from_utf8_lossy(keyword).into_owned();
        if operator == "BI" {
            self.operands.clear();
            match skip_inline_image(self.rest) {
                Some(after) => self.rest = after,
                None => {
                    self.rest = &self.rest[self.rest.len()..];
                    return ContentItem::Invalid {
                        text: "unterminated inline image".to_string(),
                        offset,
                    };
                }
            }
        }

        ContentItem::Op(ContentOp {
            operator,
            operands: std::mem::take(&mut self.operands),
            offset,
        })
    }
}

impl Iterator for ContentParser<'_> {
    type Item = ContentItem;

    fn next(&mut self) -> Option<ContentItem> {
        loop {
            if let Ok((rest, _)) = skip_ws(self.rest) {
                self.rest = rest;
            }
            if self.rest.is_empty() {
                return None;
            }
            let offset = self.offset();

            let Ok((rest, lex)) = lexeme(self.rest) else {
                let (rest, text) = skip_invalid(self.rest);
                self.rest = rest;
                return Some(ContentItem::Invalid { text, offset });
            };
            self.rest = rest;

            match lex {
                Lexeme::Number(n) => self.push_operand(Operand::Number(n)),
                Lexeme::Name(name) => self.push_operand(Operand::Name(name)),
                Lexeme::Str(bytes) => self.push_operand(Operand::Str(bytes)),
                Lexeme::ArrayStart => self.open.push(Open::Array(Vec::new())),
                Lexeme::DictStart => self.open.push(Open::Dict),
                Lexeme::ArrayEnd => match self.open.pop() {
                    Some(Open::Array(items)) => self.push_operand(Operand::Array(items)),
                    unmatched => {
                        self.open.extend(unmatched);
                        return Some(ContentItem::Invalid {
                            text: "]".to_string(),
                            offset,
                        });
                    }
                },
                Lexeme::DictEnd => match self.open.pop() {
                    Some(Open::Dict) => self.push_operand(Operand::Other),
                    unmatched => {
                        self.open.extend(unmatched);
                        return Some(ContentItem::Invalid {
                            text: ">>".to_string(),
                            offset,
                        });
                    }
                },
                Lexeme::Keyword(b"true" | b"false" | b"null") => self.push_operand(Operand::Other),
                Lexeme::Keyword(keyword) => return Some(self.operation(keyword, offset)),
            }
        }
    }
}

/// Parse a content stream into operations and skipped spans.
pub fn parse_content(data: &[u8]) -> Vec<ContentItem> {
    ContentParser::new(data).collect()
}

/// Parse a content stream, keeping only the operations.
pub fn operations(data: &[u8]) -> Vec<ContentOp> {
    ContentParser::new(data)
        .filter_map(|item| match item {
            ContentItem::Op(op) => Some(op),
            ContentItem::Invalid { .. } => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ops(data: &[u8]) -> Vec<ContentOp> {
        operations(data)
    }

    fn invalid(data: &[u8]) -> Vec<(String, usize)> {
        parse_content(data)
            .into_iter()
            .filter_map(|item| match item {
                ContentItem::Invalid { text, offset } => Some((text, offset)),
                ContentItem::Op(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_parse_numbers_names_and_operators() {
        let parsed = ops(b"q 1 0 0 1 -2.5 .5 cm /Im#31 Do Q");
        assert_eq!(parsed.len(), 4);
        assert_eq!(parsed[0].operator, "q");
        assert_eq!(parsed[1].operator, "cm");
        assert_eq!(
            parsed[1].operands,
            vec![
                Operand::Number(1.0),
                Operand::Number(0.0),
                Operand::Number(0.0),
                Operand::Number(1.0),
                Operand::Number(-2.5),
                Operand::Number(0.5),
            ]
        );
        assert_eq!(parsed[1].offset, 18);
        assert_eq!(parsed[2].operands, vec![Operand::Name("Im1".into())]);
        assert_eq!(parsed[3].operator, "Q");
    }

    #[test]
    fn test_parse_strings_comments_and_dicts() {
        let parsed =
            ops(b"% comment q\n(a (nested) \\) str) Tj <48656C6C6F> Tj /Span <</MCID 0>> BDC [1 2] 0 d");
        let operators: Vec<&str> = parsed.iter().map(|op| op.operator.as_str()).collect();
        assert_eq!(operators, vec!["Tj", "Tj", "BDC", "d"]);

        assert_eq!(parsed[0].operands, vec![Operand::Str(b"a (nested) ) str".to_vec())]);
        assert_eq!(parsed[1].operands, vec![Operand::Str(b"Hello".to_vec())]);
        assert_eq!(
            parsed[2].operands,
            vec![Operand::Name("Span".into()), Operand::Other]
        );
        assert_eq!(
            parsed[3].operands,
            vec![
                Operand::Array(vec![Operand::Number(1.0), Operand::Number(2.0)]),
                Operand::Number(0.0)
            ]
        );
        assert!(invalid(b"(a) Tj <</MCID 0>> BDC").is_empty());
    }

    #[test]
    fn test_literal_escapes() {
        assert_eq!(unescape_literal(b"a\\nb\\101\\\\"), b"a\nbA\\".to_vec());
        assert_eq!(unescape_literal(b"line\\\ncontinued"), b"linecontinued".to_vec());
        assert_eq!(decode_hex(b"48 6"), vec![0x48, 0x60]);
    }

    #[test]
    fn test_quote_operators_and_star() {
        let parsed = ops(b"BT 2 0 (x) \" (y) ' T* ET");
        let operators: Vec<&str> = parsed.iter().map(|op| op.operator.as_str()).collect();
        assert_eq!(operators, vec!["BT", "\"", "'", "T*", "ET"]);
        assert_eq!(parsed[1].operands.len(), 3);
    }

    #[test]
    fn test_skips_inline_image_data() {
        let parsed = ops(b"BI /W 2 /H 2 /BPC 8 /CS /G ID \x00Do\xffcm EI q /Im1 Do Q");
        let operators: Vec<&str> = parsed.iter().map(|op| op.operator.as_str()).collect();
        assert_eq!(operators, vec!["BI", "q", "Do", "Q"]);
        assert!(parsed[0].operands.is_empty());
    }

    #[test]
    fn test_unterminated_inline_image() {
        let items = parse_content(b"q BI /W 2 ID \x00\x01 Q");
        assert!(matches!(
            items.last(),
            Some(ContentItem::Invalid { text, .. }) if text == "unterminated inline image"
        ));
    }

    #[test]
    fn test_recovers_after_each_bad_token() {
        let data = b") 1.2.3 } /Im1 Do";
        assert_eq!(
            invalid(data),
            vec![
                (")".to_string(), 0),
                ("1.2.3".to_string(), 2),
                ("}".to_string(), 8)
            ]
        );
        let parsed = ops(data);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].operands, vec![Operand::Name("Im1".into())]);
    }

    #[test]
    fn test_bad_token_keeps_pending_operands() {
        let parsed = ops(b"/F1 ) 12 Tf");
        assert_eq!(
            parsed[0].operands,
            vec![Operand::Name("F1".into()), Operand::Number(12.0)]
        );
    }

    #[test]
    fn test_unterminated_string_consumes_rest() {
        let items = parse_content(b"/Im1 Do (never closed /Im2 Do");
        assert_eq!(items.len(), 2);
        assert!(matches!(
            &items[1],
            ContentItem::Invalid { text, offset: 8 } if text == "unterminated string"
        ));
    }

    #[test]
    fn test_unmatched_closers_are_invalid() {
        assert_eq!(invalid(b"] 0 d"), vec![("]".to_string(), 0)]);
        assert_eq!(invalid(b"[1 >> 2] 0 d"), vec![(">>".to_string(), 3)]);
        let parsed = ops(b"[1 >> 2] 0 d");
        assert_eq!(
            parsed[0].operands[0],
            Operand::Array(vec![Operand::Number(1.0), Operand::Number(2.0)])
        );
    }
}
