/*!
# BSL Lexical Analyzer

Lexer for 1C:Enterprise BSL built on `logos`. Both Russian and English keyword
spellings are recognised case-insensitively. Comments and preprocessor lines
are trivia and never become tokens.
*/

use logos::Logos;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::position::{PackedSpan, Position};

/// BSL token types
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenType {
    // Keywords - Control Flow
    #[token("Если", ignore(case))]
    #[token("If", ignore(case))]
    If,
    #[token("Тогда", ignore(case))]
    #[token("Then", ignore(case))]
    Then,
    #[token("ИначеЕсли", ignore(case))]
    #[token("ElsIf", ignore(case))]
    ElsIf,
    #[token("Иначе", ignore(case))]
    #[token("Else", ignore(case))]
    Else,
    #[token("КонецЕсли", ignore(case))]
    #[token("EndIf", ignore(case))]
    EndIf,

    // Keywords - Loops
    #[token("Для", ignore(case))]
    #[token("For", ignore(case))]
    For,
    #[token("Каждого", ignore(case))]
    #[token("Each", ignore(case))]
    Each,
    #[token("Из", ignore(case))]
    #[token("In", ignore(case))]
    In,
    #[token("По", ignore(case))]
    #[token("To", ignore(case))]
    To,
    #[token("Цикл", ignore(case))]
    #[token("Do", ignore(case))]
    Do,
    #[token("КонецЦикла", ignore(case))]
    #[token("EndDo", ignore(case))]
    EndDo,
    #[token("Пока", ignore(case))]
    #[token("While", ignore(case))]
    While,
    #[token("Прервать", ignore(case))]
    #[token("Break", ignore(case))]
    Break,
    #[token("Продолжить", ignore(case))]
    #[token("Continue", ignore(case))]
    Continue,

    // Keywords - Procedures and Functions
    #[token("Процедура", ignore(case))]
    #[token("Procedure", ignore(case))]
    Procedure,
    #[token("КонецПроцедуры", ignore(case))]
    #[token("EndProcedure", ignore(case))]
    EndProcedure,
    #[token("Функция", ignore(case))]
    #[token("Function", ignore(case))]
    Function,
    #[token("КонецФункции", ignore(case))]
    #[token("EndFunction", ignore(case))]
    EndFunction,
    #[token("Возврат", ignore(case))]
    #[token("Return", ignore(case))]
    Return,
    #[token("Экспорт", ignore(case))]
    #[token("Export", ignore(case))]
    Export,

    // Keywords - Variables
    #[token("Перем", ignore(case))]
    #[token("Var", ignore(case))]
    Var,
    #[token("Знач", ignore(case))]
    #[token("Val", ignore(case))]
    Val,

    // Keywords - Exception Handling
    #[token("Попытка", ignore(case))]
    #[token("Try", ignore(case))]
    Try,
    #[token("Исключение", ignore(case))]
    #[token("Except", ignore(case))]
    Except,
    #[token("КонецПопытки", ignore(case))]
    #[token("EndTry", ignore(case))]
    EndTry,
    #[token("ВызватьИсключение", ignore(case))]
    #[token("Raise", ignore(case))]
    Raise,
    #[token("Перейти", ignore(case))]
    #[token("Goto", ignore(case))]
    Goto,

    // Keywords - Values
    #[token("Истина", ignore(case))]
    #[token("True", ignore(case))]
    True,
    #[token("Ложь", ignore(case))]
    #[token("False", ignore(case))]
    False,
    #[token("Неопределено", ignore(case))]
    #[token("Undefined", ignore(case))]
    Undefined,
    #[token("Null", ignore(case))]
    Null,

    // Keywords - Operators
    #[token("И", ignore(case))]
    #[token("And", ignore(case))]
    And,
    #[token("Или", ignore(case))]
    #[token("Or", ignore(case))]
    Or,
    #[token("Не", ignore(case))]
    #[token("Not", ignore(case))]
    Not,
    #[token("Новый", ignore(case))]
    #[token("New", ignore(case))]
    New,

    // Arithmetic operators
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Multiply,
    #[token("/")]
    Divide,
    #[token("%")]
    Modulo,

    // Comparison operators (`=` is also assignment, the parser decides)
    #[token("=")]
    Equal,
    #[token("<>")]
    NotEqual,
    #[token("<")]
    Less,
    #[token(">")]
    Greater,
    #[token("<=")]
    LessEqual,
    #[token(">=")]
    GreaterEqual,

    // Delimiters
    #[token("(")]
    LeftParen,
    #[token(")")]
    RightParen,
    #[token("[")]
    LeftBracket,
    #[token("]")]
    RightBracket,

    // Punctuation
    #[token(".")]
    Dot,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,
    #[token(":")]
    Colon,
    #[token("?")]
    Question,
    #[token("~")]
    Tilde,

    // Compiler directives / annotations (&НаСервере, &Перед("Метод"))
    #[regex(r"&[А-Яа-яЁёA-Za-z_][А-Яа-яЁёA-Za-z0-9_]*")]
    Annotation,

    // Literals
    #[regex(r#""([^"]|"")*""#)]
    StringLiteral,
    #[regex(r"'[^'\r\n]*'")]
    DateLiteral,
    #[regex(r"[0-9]+(\.[0-9]+)?")]
    NumberLiteral,

    // Identifiers (lower priority to avoid conflicts with keywords)
    #[regex(r"[А-Яа-яЁёA-Za-z_][А-Яа-яЁёA-Za-z0-9_]*", priority = 1)]
    Identifier,

    // Trivia
    #[regex(r"//[^\r\n]*", logos::skip)]
    LineComment,
    #[regex(r"#[^\r\n]*", logos::skip)]
    Preprocessor,
    #[regex(r"[ \t\f\r\n]+", logos::skip)]
    Whitespace,
}

impl TokenType {
    /// Числовой код типа токена (стабилен в пределах версии анализатора).
    pub fn code(self) -> u16 {
        self as u16
    }

    pub fn is_keyword(self) -> bool {
        use TokenType::*;
        matches!(
            self,
            If | Then | ElsIf | Else | EndIf | For | Each | In | To | Do | EndDo | While | Break
                | Continue | Procedure | EndProcedure | Function | EndFunction | Return | Export
                | Var | Val | Try | Except | EndTry | Raise | Goto | True | False | Undefined
                | Null | And | Or | Not | New
        )
    }

    /// Может ли токен служить именем свойства/метода после точки.
    /// После `.` ключевые слова допустимы как имена (`Запрос.Выполнить`, `Стр.Новый`).
    pub fn is_name_like(self) -> bool {
        self == TokenType::Identifier || self.is_keyword()
    }

    pub fn is_comparison(self) -> bool {
        use TokenType::*;
        matches!(self, Equal | NotEqual | Less | Greater | LessEqual | GreaterEqual)
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TokenType::If => "Если",
            TokenType::Then => "Тогда",
            TokenType::ElsIf => "ИначеЕсли",
            TokenType::Else => "Иначе",
            TokenType::EndIf => "КонецЕсли",
            TokenType::For => "Для",
            TokenType::Each => "Каждого",
            TokenType::In => "Из",
            TokenType::To => "По",
            TokenType::Do => "Цикл",
            TokenType::EndDo => "КонецЦикла",
            TokenType::While => "Пока",
            TokenType::Break => "Прервать",
            TokenType::Continue => "Продолжить",
            TokenType::Procedure => "Процедура",
            TokenType::EndProcedure => "КонецПроцедуры",
            TokenType::Function => "Функция",
            TokenType::EndFunction => "КонецФункции",
            TokenType::Return => "Возврат",
            TokenType::Export => "Экспорт",
            TokenType::Var => "Перем",
            TokenType::Val => "Знач",
            TokenType::Try => "Попытка",
            TokenType::Except => "Исключение",
            TokenType::EndTry => "КонецПопытки",
            TokenType::Raise => "ВызватьИсключение",
            TokenType::Goto => "Перейти",
            TokenType::True => "Истина",
            TokenType::False => "Ложь",
            TokenType::Undefined => "Неопределено",
            TokenType::Null => "Null",
            TokenType::And => "И",
            TokenType::Or => "Или",
            TokenType::Not => "Не",
            TokenType::New => "Новый",
            TokenType::Plus => "+",
            TokenType::Minus => "-",
            TokenType::Multiply => "*",
            TokenType::Divide => "/",
            TokenType::Modulo => "%",
            TokenType::Equal => "=",
            TokenType::NotEqual => "<>",
            TokenType::Less => "<",
            TokenType::Greater => ">",
            TokenType::LessEqual => "<=",
            TokenType::GreaterEqual => ">=",
            TokenType::LeftParen => "(",
            TokenType::RightParen => ")",
            TokenType::LeftBracket => "[",
            TokenType::RightBracket => "]",
            TokenType::Dot => ".",
            TokenType::Comma => ",",
            TokenType::Semicolon => ";",
            TokenType::Colon => ":",
            TokenType::Question => "?",
            TokenType::Tilde => "~",
            TokenType::Annotation => "ANNOTATION",
            TokenType::StringLiteral => "STRING",
            TokenType::DateLiteral => "DATE",
            TokenType::NumberLiteral => "NUMBER",
            TokenType::Identifier => "IDENTIFIER",
            TokenType::LineComment => "COMMENT",
            TokenType::Preprocessor => "PREPROCESSOR",
            TokenType::Whitespace => "WHITESPACE",
        };
        f.write_str(s)
    }
}

/// Token with position information. Text lives in the source, see [`Token::text`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub token_type: TokenType,
    pub span: PackedSpan,
    pub start: Position,
    pub end: Position,
}

impl Token {
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.span.as_range()]
    }
}

/// Нераспознанный фрагмент исходника.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub position: Position,
    pub text: String,
}

/// Результат лексического анализа: токены и ошибки (лексер не останавливается на ошибке).
#[derive(Debug, Default)]
pub struct LexOutput {
    pub tokens: Vec<Token>,
    pub errors: Vec<LexError>,
}

/// BSL Lexer with position tracking
#[derive(Debug, Default, Clone, Copy)]
pub struct BslLexer;

impl BslLexer {
    pub fn new() -> Self {
        Self
    }

    /// Tokenize BSL source code. Unknown characters are reported and skipped.
    pub fn tokenize(&self, input: &str) -> LexOutput {
        let mut out = LexOutput::default();
        let mut cursor = Position::start();
        let mut consumed = 0usize;

        for (result, range) in TokenType::lexer(input).spanned() {
            // догоняем позицию по пропущенным пробелам/комментариям
            cursor = cursor.advance(&input[consumed..range.start]);
            let slice = &input[range.clone()];
            let start = cursor;
            let end = start.advance(slice);
            cursor = end;
            consumed = range.end;

            match result {
                Ok(token_type) => out.tokens.push(Token {
                    token_type,
                    span: PackedSpan::new(range.start as u32, (range.end - range.start) as u32),
                    start,
                    end,
                }),
                Err(()) => out.errors.push(LexError { position: start, text: slice.to_string() }),
            }
        }

        out
    }
}
