use crate::language::span::{Location, Span};

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub location: Location,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    Identifier(String),
    Integer(i32),
    LongInteger(i64),
    Float(f32),
    Double(f64),
    String(String),

    And,
    Or,
    Not,
    Mod,
    If,
    Then,
    Else,
    ElseIf,
    EndIf,
    For,
    ForEach,
    To,
    Step,
    In,
    Next,
    EndFor,
    While,
    EndWhile,
    ExitFor,
    ExitWhile,
    ContinueFor,
    ContinueWhile,
    Function,
    EndFunction,
    Sub,
    EndSub,
    Return,
    Print,
    Goto,
    Dim,
    End,
    Stop,
    Try,
    Catch,
    EndTry,
    Throw,
    Library,
    As,
    True,
    False,
    Invalid,

    Plus,
    Minus,
    Star,
    Slash,
    Backslash,
    Caret,
    Eq,
    LtGt,
    Lt,
    LtEq,
    Gt,
    GtEq,
    LtLt,
    GtGt,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,
    BackslashEq,
    LtLtEq,
    GtGtEq,
    PlusPlus,
    MinusMinus,

    Dot,
    Comma,
    Colon,
    Semi,
    Question,
    QuestionDot,
    QuestionLBracket,
    QuestionLParen,
    At,

    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,

    Newline,
    Eof,
}

impl TokenKind {
    /// Maps a lowercased word to its keyword, if any.
    pub fn keyword(word: &str) -> Option<TokenKind> {
        let kind = match word {
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            "mod" => TokenKind::Mod,
            "if" => TokenKind::If,
            "then" => TokenKind::Then,
            "else" => TokenKind::Else,
            "elseif" => TokenKind::ElseIf,
            "endif" => TokenKind::EndIf,
            "for" => TokenKind::For,
            "to" => TokenKind::To,
            "step" => TokenKind::Step,
            "in" => TokenKind::In,
            "next" => TokenKind::Next,
            "while" => TokenKind::While,
            "endwhile" => TokenKind::EndWhile,
            "exitfor" => TokenKind::ExitFor,
            "exitwhile" => TokenKind::ExitWhile,
            "function" => TokenKind::Function,
            "endfunction" => TokenKind::EndFunction,
            "sub" => TokenKind::Sub,
            "endsub" => TokenKind::EndSub,
            "return" => TokenKind::Return,
            "print" => TokenKind::Print,
            "goto" => TokenKind::Goto,
            "dim" => TokenKind::Dim,
            "end" => TokenKind::End,
            "stop" => TokenKind::Stop,
            "try" => TokenKind::Try,
            "catch" => TokenKind::Catch,
            "endtry" => TokenKind::EndTry,
            "throw" => TokenKind::Throw,
            "library" => TokenKind::Library,
            "as" => TokenKind::As,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "invalid" => TokenKind::Invalid,
            _ => return None,
        };
        Some(kind)
    }

    /// Second word that folds with `self` into a compound keyword, e.g. `end if`.
    pub fn fold(&self, next_word: &str) -> Option<TokenKind> {
        let kind = match (self, next_word) {
            (TokenKind::End, "if") => TokenKind::EndIf,
            (TokenKind::End, "for") => TokenKind::EndFor,
            (TokenKind::End, "while") => TokenKind::EndWhile,
            (TokenKind::End, "function") => TokenKind::EndFunction,
            (TokenKind::End, "sub") => TokenKind::EndSub,
            (TokenKind::End, "try") => TokenKind::EndTry,
            (TokenKind::Else, "if") => TokenKind::ElseIf,
            (TokenKind::For, "each") => TokenKind::ForEach,
            (TokenKind::Identifier(word), "for") if word.eq_ignore_ascii_case("exit") => {
                TokenKind::ExitFor
            }
            (TokenKind::Identifier(word), "while") if word.eq_ignore_ascii_case("exit") => {
                TokenKind::ExitWhile
            }
            (TokenKind::Identifier(word), "for") if word.eq_ignore_ascii_case("continue") => {
                TokenKind::ContinueFor
            }
            (TokenKind::Identifier(word), "while") if word.eq_ignore_ascii_case("continue") => {
                TokenKind::ContinueWhile
            }
            _ => return None,
        };
        Some(kind)
    }

    pub fn is_terminator(&self) -> bool {
        matches!(self, TokenKind::Newline | TokenKind::Colon | TokenKind::Eof)
    }

    /// Identifier-like tokens that may appear after `.` as a member name.
    pub fn member_name(&self) -> Option<String> {
        match self {
            TokenKind::Identifier(name) => Some(name.clone()),
            other => other.keyword_text().map(str::to_string),
        }
    }

    pub fn keyword_text(&self) -> Option<&'static str> {
        let text = match self {
            TokenKind::And => "and",
            TokenKind::Or => "or",
            TokenKind::Not => "not",
            TokenKind::Mod => "mod",
            TokenKind::If => "if",
            TokenKind::Then => "then",
            TokenKind::Else => "else",
            TokenKind::For => "for",
            TokenKind::To => "to",
            TokenKind::Step => "step",
            TokenKind::In => "in",
            TokenKind::Next => "next",
            TokenKind::While => "while",
            TokenKind::Function => "function",
            TokenKind::Sub => "sub",
            TokenKind::Return => "return",
            TokenKind::Print => "print",
            TokenKind::Goto => "goto",
            TokenKind::Dim => "dim",
            TokenKind::End => "end",
            TokenKind::Stop => "stop",
            TokenKind::Try => "try",
            TokenKind::Catch => "catch",
            TokenKind::Throw => "throw",
            TokenKind::Library => "library",
            TokenKind::As => "as",
            TokenKind::True => "true",
            TokenKind::False => "false",
            TokenKind::Invalid => "invalid",
            _ => return None,
        };
        Some(text)
    }
}
