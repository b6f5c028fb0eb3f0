use crate::language::{
    span::{Location, Position, Span},
    token::{Token, TokenKind},
};
use nom::{
    branch::alt,
    bytes::complete::tag_no_case,
    character::complete::{char, digit0, digit1, hex_digit1, one_of},
    combinator::{opt, recognize},
    sequence::{pair, preceded, tuple},
    IResult,
};
use std::rc::Rc;

#[derive(Debug)]
pub struct LexError {
    pub message: String,
    pub span: Span,
}

pub fn lex(source: &str, file: &str) -> Result<Vec<Token>, Vec<LexError>> {
    let lexer = Lexer::new(source, Rc::from(file));
    lexer.run()
}

struct Lexer<'a> {
    src: &'a str,
    file: Rc<str>,
    chars: std::str::Chars<'a>,
    current: Option<char>,
    offset: usize,
    line: usize,
    line_start: usize,
    tokens: Vec<Token>,
    errors: Vec<LexError>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str, file: Rc<str>) -> Self {
        let mut chars = src.chars();
        let current = chars.next();
        Self {
            src,
            file,
            chars,
            current,
            offset: 0,
            line: 1,
            line_start: 0,
            tokens: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Token>, Vec<LexError>> {
        while let Some(ch) = self.current {
            match ch {
                '\'' => self.eat_line_comment(),
                '\n' => {
                    let start = self.offset;
                    let position = self.position();
                    self.bump();
                    self.push_token_at(TokenKind::Newline, start, position);
                }
                ch if ch.is_whitespace() => {
                    self.bump();
                }
                ch if ch.is_ascii_alphabetic() || ch == '_' => self.lex_identifier(),
                ch if ch.is_ascii_digit() => self.lex_number(),
                '.' if self.peek().is_some_and(|next| next.is_ascii_digit()) => self.lex_number(),
                '&' if matches!(self.peek(), Some('h') | Some('H')) => self.lex_number(),
                '"' => self.lex_string(),
                _ => self.lex_symbol(),
            }
        }
        let position = self.position();
        self.push_token_at(TokenKind::Eof, self.offset, position);

        if self.errors.is_empty() {
            Ok(self.tokens)
        } else {
            Err(self.errors)
        }
    }

    fn bump(&mut self) -> Option<char> {
        if let Some(ch) = self.current {
            self.offset += ch.len_utf8();
            if ch == '\n' {
                self.line += 1;
                self.line_start = self.offset;
            }
        }
        self.current = self.chars.next();
        self.current
    }

    fn peek(&self) -> Option<char> {
        self.chars.clone().next()
    }

    fn position(&self) -> Position {
        Position::new(self.line, self.offset - self.line_start)
    }

    fn push_token_at(&mut self, kind: TokenKind, start: usize, start_pos: Position) {
        let span = Span::new(start, self.offset);
        let location = Location::new(self.file.clone(), start_pos, self.position(), span);
        self.tokens.push(Token {
            kind,
            span,
            location,
        });
    }

    fn error(&mut self, start: usize, end: usize, message: impl Into<String>) {
        self.errors.push(LexError {
            message: message.into(),
            span: Span::new(start, end),
        });
    }

    fn eat_line_comment(&mut self) {
        while let Some(ch) = self.current {
            if ch == '\n' {
                break;
            }
            self.bump();
        }
    }

    fn scan_word(&mut self) {
        while let Some(ch) = self.current {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                self.bump();
            } else {
                break;
            }
        }
    }

    fn lex_identifier(&mut self) {
        let start = self.offset;
        let start_pos = self.position();
        self.scan_word();

        let mut designated = false;
        if let Some(ch @ ('$' | '%' | '!' | '#' | '&')) = self.current {
            // `&h` after a name starts a hex literal, not a designator
            if !(ch == '&' && matches!(self.peek(), Some('h') | Some('H'))) {
                designated = true;
                self.bump();
            }
        }

        let slice = &self.src[start..self.offset];
        let lowered = slice.to_ascii_lowercase();
        if !designated && lowered == "rem" {
            self.eat_line_comment();
            return;
        }

        let kind = if designated {
            TokenKind::Identifier(slice.to_string())
        } else {
            TokenKind::keyword(&lowered).unwrap_or_else(|| TokenKind::Identifier(slice.to_string()))
        };
        let kind = if designated {
            kind
        } else {
            self.fold_compound(kind)
        };
        self.push_token_at(kind, start, start_pos);
    }

    /// Joins `end if`, `else if`, `for each`, `exit while` and friends into one token.
    fn fold_compound(&mut self, kind: TokenKind) -> TokenKind {
        let rest = &self.src[self.offset..];
        let gap = rest.len() - rest.trim_start_matches([' ', '\t']).len();
        if gap == 0 {
            return kind;
        }
        let word_len = rest[gap..]
            .find(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '_'))
            .unwrap_or(rest.len() - gap);
        if word_len == 0 {
            return kind;
        }
        let next_word = rest[gap..gap + word_len].to_ascii_lowercase();
        match kind.fold(&next_word) {
            Some(folded) => {
                for _ in 0..gap + word_len {
                    self.bump();
                }
                folded
            }
            None => kind,
        }
    }

    fn lex_number(&mut self) {
        let start = self.offset;
        let start_pos = self.position();
        match scan_number(&self.src[start..]) {
            Some((consumed, Ok(kind))) => {
                self.advance_bytes(consumed);
                self.push_token_at(kind, start, start_pos);
            }
            Some((consumed, Err(message))) => {
                self.advance_bytes(consumed);
                self.error(start, self.offset, message);
            }
            None => {
                self.bump();
                self.error(start, self.offset, "Invalid numeric literal");
            }
        }
    }

    fn advance_bytes(&mut self, count: usize) {
        let target = self.offset + count;
        while self.offset < target && self.current.is_some() {
            self.bump();
        }
    }

    fn lex_string(&mut self) {
        let start = self.offset;
        let start_pos = self.position();
        self.bump();
        let mut value = String::new();
        while let Some(ch) = self.current {
            match ch {
                '"' if self.peek() == Some('"') => {
                    value.push('"');
                    self.bump();
                    self.bump();
                }
                '"' => {
                    self.bump();
                    self.push_token_at(TokenKind::String(value), start, start_pos);
                    return;
                }
                '\n' => break,
                _ => {
                    value.push(ch);
                    self.bump();
                }
            }
        }
        self.error(start, self.offset, "String missing ending quote.");
    }

    fn lex_symbol(&mut self) {
        let start = self.offset;
        let start_pos = self.position();
        let ch = match self.current {
            Some(ch) => ch,
            None => return,
        };
        self.bump();
        let kind = match ch {
            '+' => match self.current {
                Some('=') => self.take(TokenKind::PlusEq),
                Some('+') => self.take(TokenKind::PlusPlus),
                _ => TokenKind::Plus,
            },
            '-' => match self.current {
                Some('=') => self.take(TokenKind::MinusEq),
                Some('-') => self.take(TokenKind::MinusMinus),
                _ => TokenKind::Minus,
            },
            '*' if self.current == Some('=') => self.take(TokenKind::StarEq),
            '*' => TokenKind::Star,
            '/' if self.current == Some('=') => self.take(TokenKind::SlashEq),
            '/' => TokenKind::Slash,
            '\\' if self.current == Some('=') => self.take(TokenKind::BackslashEq),
            '\\' => TokenKind::Backslash,
            '^' => TokenKind::Caret,
            '=' => TokenKind::Eq,
            '<' => match self.current {
                Some('>') => self.take(TokenKind::LtGt),
                Some('=') => self.take(TokenKind::LtEq),
                Some('<') => {
                    self.bump();
                    if self.current == Some('=') {
                        self.take(TokenKind::LtLtEq)
                    } else {
                        TokenKind::LtLt
                    }
                }
                _ => TokenKind::Lt,
            },
            '>' => match self.current {
                Some('=') => self.take(TokenKind::GtEq),
                Some('>') => {
                    self.bump();
                    if self.current == Some('=') {
                        self.take(TokenKind::GtGtEq)
                    } else {
                        TokenKind::GtGt
                    }
                }
                _ => TokenKind::Gt,
            },
            '?' => match self.current {
                Some('.') if !self.peek().is_some_and(|next| next.is_ascii_digit()) => {
                    self.take(TokenKind::QuestionDot)
                }
                Some('[') => self.take(TokenKind::QuestionLBracket),
                Some('(') => self.take(TokenKind::QuestionLParen),
                _ => TokenKind::Question,
            },
            '.' => TokenKind::Dot,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            ';' => TokenKind::Semi,
            '@' => TokenKind::At,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            other => {
                self.error(start, self.offset, format!("Unexpected character '{}'", other));
                return;
            }
        };
        self.push_token_at(kind, start, start_pos);
    }

    fn take(&mut self, kind: TokenKind) -> TokenKind {
        self.bump();
        kind
    }
}

fn hex_literal(input: &str) -> IResult<&str, (&str, Option<char>)> {
    pair(preceded(tag_no_case("&h"), hex_digit1), opt(char('&')))(input)
}

fn mantissa(input: &str) -> IResult<&str, &str> {
    alt((
        recognize(pair(digit1, opt(pair(char('.'), digit0)))),
        recognize(pair(char('.'), digit1)),
    ))(input)
}

fn exponent(input: &str) -> IResult<&str, (char, &str)> {
    pair(one_of("eEdD"), recognize(pair(opt(one_of("+-")), digit1)))(input)
}

fn decimal_literal(input: &str) -> IResult<&str, (&str, Option<(char, &str)>, Option<char>)> {
    tuple((mantissa, opt(exponent), opt(one_of("%!#&"))))(input)
}

/// Scans a numeric literal at the start of `input`, returning the bytes consumed.
fn scan_number(input: &str) -> Option<(usize, Result<TokenKind, String>)> {
    if let Ok((rest, (digits, long))) = hex_literal(input) {
        let consumed = input.len() - rest.len();
        let kind = match u64::from_str_radix(digits, 16) {
            Ok(value) if long.is_some() => Ok(TokenKind::LongInteger(value as i64)),
            Ok(value) if value <= u64::from(u32::MAX) => Ok(TokenKind::Integer(value as u32 as i32)),
            Ok(value) => Ok(TokenKind::LongInteger(value as i64)),
            Err(_) => Err(format!("Hex literal &h{} is out of range", digits)),
        };
        return Some((consumed, kind));
    }

    let (rest, (mantissa, exponent, suffix)) = decimal_literal(input).ok()?;
    let consumed = input.len() - rest.len();
    let integral = !mantissa.contains('.') && exponent.is_none();
    let mut text = mantissa.to_string();
    if let Some((_, power)) = exponent {
        text.push('e');
        text.push_str(power);
    }
    let float = match text.parse::<f64>() {
        Ok(value) => value,
        Err(_) => return Some((consumed, Err(format!("Invalid numeric literal {}", text)))),
    };
    let whole = if integral { mantissa.parse::<i64>().ok() } else { None };

    let kind = match suffix {
        Some('%') => TokenKind::Integer(whole.map(|v| v as i32).unwrap_or(float as i32)),
        Some('&') => TokenKind::LongInteger(whole.unwrap_or(float as i64)),
        Some('!') => TokenKind::Float(float as f32),
        Some('#') => TokenKind::Double(float),
        _ if matches!(exponent, Some(('d' | 'D', _))) => TokenKind::Double(float),
        _ if !integral => TokenKind::Float(float as f32),
        _ => match whole {
            Some(value) => match i32::try_from(value) {
                Ok(small) => TokenKind::Integer(small),
                Err(_) => TokenKind::LongInteger(value),
            },
            None => TokenKind::Double(float),
        },
    };
    Some((consumed, Ok(kind)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source, "test.brs")
            .expect("lex")
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn keywords_are_case_insensitive_and_fold() {
        let tokens = kinds("IF x THEN\nEnd If\nfor each item in list\nexit while");
        assert_eq!(tokens[0], TokenKind::If, "tokens: {tokens:?}");
        assert!(tokens.contains(&TokenKind::EndIf), "tokens: {tokens:?}");
        assert!(tokens.contains(&TokenKind::ForEach), "tokens: {tokens:?}");
        assert!(tokens.contains(&TokenKind::ExitWhile), "tokens: {tokens:?}");
        assert!(!tokens.iter().any(|kind| matches!(kind, TokenKind::Identifier(name) if name == "each")));
    }

    #[test]
    fn numeric_literals_pick_their_kind() {
        let tokens = kinds("1 2147483648 1.5 2.5# 3! 7& &hFF 1d2 10%");
        assert_eq!(tokens[0], TokenKind::Integer(1));
        assert_eq!(tokens[1], TokenKind::LongInteger(2147483648));
        assert_eq!(tokens[2], TokenKind::Float(1.5));
        assert_eq!(tokens[3], TokenKind::Double(2.5));
        assert_eq!(tokens[4], TokenKind::Float(3.0));
        assert_eq!(tokens[5], TokenKind::LongInteger(7));
        assert_eq!(tokens[6], TokenKind::Integer(255));
        assert_eq!(tokens[7], TokenKind::Double(100.0));
        assert_eq!(tokens[8], TokenKind::Integer(10));
    }

    #[test]
    fn identifiers_keep_designators() {
        let tokens = kinds("name$ = count%");
        assert_eq!(tokens[0], TokenKind::Identifier("name$".into()));
        assert_eq!(tokens[2], TokenKind::Identifier("count%".into()));
    }

    #[test]
    fn comments_are_skipped() {
        let tokens = kinds("x = 1 ' trailing\nREM whole line\ny = 2");
        let idents: Vec<_> = tokens
            .iter()
            .filter_map(|kind| match kind {
                TokenKind::Identifier(name) => Some(name.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(idents, vec!["x", "y"]);
    }

    #[test]
    fn doubled_quotes_escape_inside_strings() {
        let tokens = kinds(r#"print "say ""hi""""#);
        assert_eq!(tokens[1], TokenKind::String("say \"hi\"".into()));
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let errors = lex("x = \"open\ny = 1", "test.brs").expect_err("should fail");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("ending quote"), "{:?}", errors);
    }

    #[test]
    fn tokens_track_lines_and_columns() {
        let tokens = lex("a = 1\n  b = 2", "test.brs").expect("lex");
        let b = tokens
            .iter()
            .find(|token| token.kind == TokenKind::Identifier("b".into()))
            .expect("b token");
        assert_eq!(b.location.start, Position::new(2, 2));
        assert_eq!(b.location.end, Position::new(2, 3));
    }
}
