/*!
# BSL Grammar

Recursive descent parser that turns the token stream into the arena CST.
Node shapes follow the BSLParser grammar rule names (`file`, `sub`, `codeBlock`,
`expression`, `member`, `complexIdentifier`, `modifier`, ...), so every rule has
a fixed `SyntaxKind`.

The parser never fails: unexpected input is wrapped into an `Error` node, a
syntax error is recorded and parsing resumes at the next `;` or block keyword.
*/

use crate::ast_core::{SyntaxKind, SyntaxTree, TreeBuilder};
use crate::core::position::{Position, Span};
use crate::parser::lexer::{Token, TokenType};

use SyntaxKind as K;
use TokenType as T;

/// Ключевые слова, закрывающие вложенный блок кода
const BLOCK_END: &[TokenType] = &[
    T::EndIf,
    T::ElsIf,
    T::Else,
    T::EndDo,
    T::EndProcedure,
    T::EndFunction,
    T::Except,
    T::EndTry,
];

/// Точки синхронизации при восстановлении после ошибки
const SYNC: &[TokenType] = &[
    T::If,
    T::While,
    T::For,
    T::Try,
    T::Return,
    T::Procedure,
    T::Function,
    T::Var,
    T::Annotation,
    T::EndIf,
    T::ElsIf,
    T::Else,
    T::EndDo,
    T::EndProcedure,
    T::EndFunction,
    T::Except,
    T::EndTry,
];

/// Ключевые слова, допустимые внутри выражения
const EXPRESSION_KEYWORDS: &[TokenType] =
    &[T::And, T::Or, T::Not, T::True, T::False, T::Undefined, T::Null, T::New];

/// Recursive descent parser over a token slice
pub(crate) struct Parser<'t> {
    tokens: &'t [Token],
    current_index: usize,
    builder: TreeBuilder,
}

impl<'t> Parser<'t> {
    pub(crate) fn new(source: &str, tokens: &'t [Token]) -> Self {
        Self { tokens, current_index: 0, builder: TreeBuilder::new(source) }
    }

    /// Ошибка, найденная до разбора (лексическая)
    pub(crate) fn report(&mut self, message: impl Into<String>, at: Position) {
        self.builder.error(message, Span::point(at));
    }

    /// Parses a whole module: `file → moduleVars? (subs | fileCodeBlock)* fileCodeBlock`
    pub(crate) fn parse_file(mut self) -> SyntaxTree {
        self.builder.start_node(K::File);

        if self.at_module_var_start() {
            self.node(K::ModuleVars, |p| {
                while p.at_module_var_start() {
                    p.parse_module_var();
                }
            });
        }

        let mut ended_with_code = false;
        while !self.at_end() {
            if self.at_sub_start() {
                self.node(K::Subs, |p| {
                    while p.at_sub_start() {
                        p.parse_sub();
                    }
                });
                ended_with_code = false;
            } else {
                self.node(K::FileCodeBlock, |p| p.parse_code_block(true));
                ended_with_code = true;
            }
        }

        if !ended_with_code {
            self.node(K::FileCodeBlock, |p| p.node(K::CodeBlock, |_| {}));
        }

        self.builder.finish_node();
        self.builder.build()
    }

    // ---- token helpers -------------------------------------------------

    fn node(&mut self, kind: SyntaxKind, f: impl FnOnce(&mut Self)) {
        self.builder.start_node(kind);
        f(self);
        self.builder.finish_node();
    }

    fn nth(&self, n: usize) -> Option<TokenType> {
        self.tokens.get(self.current_index + n).map(|t| t.token_type)
    }

    fn peek(&self) -> Option<TokenType> {
        self.nth(0)
    }

    fn at(&self, token_type: TokenType) -> bool {
        self.peek() == Some(token_type)
    }

    fn at_any(&self, set: &[TokenType]) -> bool {
        self.peek().map(|t| set.contains(&t)).unwrap_or(false)
    }

    fn at_end(&self) -> bool {
        self.current_index >= self.tokens.len()
    }

    fn bump(&mut self) {
        if let Some(token) = self.tokens.get(self.current_index) {
            self.builder.token(*token);
            self.current_index += 1;
        }
    }

    fn eat(&mut self, token_type: TokenType) -> bool {
        if self.at(token_type) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token_type: TokenType, what: &str) {
        if !self.eat(token_type) {
            self.error_here(format!("Expected '{}'", what));
        }
    }

    fn expect_identifier(&mut self, what: &str) {
        if !self.eat(T::Identifier) {
            self.error_here(format!("Expected {}", what));
        }
    }

    fn error_here(&mut self, message: impl Into<String>) {
        let span = match self.tokens.get(self.current_index) {
            Some(token) => Span::new(token.start, token.end),
            None => Span::point(self.tokens.last().map(|t| t.end).unwrap_or_default()),
        };
        let message = match self.tokens.get(self.current_index) {
            Some(token) => format!("{}, found '{}'", message.into(), token.token_type),
            None => format!("{}, found end of file", message.into()),
        };
        self.builder.error(message, span);
    }

    /// Пропускает аннотации (`&НаСервере`, `&Перед("Метод")`), начиная с индекса `i`
    fn skip_annotations(&self, mut i: usize) -> usize {
        while self.tokens.get(i).map(|t| t.token_type) == Some(T::Annotation) {
            i += 1;
            if self.tokens.get(i).map(|t| t.token_type) == Some(T::LeftParen) {
                let mut depth = 0usize;
                while let Some(token) = self.tokens.get(i) {
                    match token.token_type {
                        T::LeftParen => depth += 1,
                        T::RightParen => {
                            depth = depth.saturating_sub(1);
                            if depth == 0 {
                                i += 1;
                                break;
                            }
                        }
                        _ => {}
                    }
                    i += 1;
                }
            }
        }
        i
    }

    fn at_sub_start(&self) -> bool {
        let i = self.skip_annotations(self.current_index);
        matches!(self.tokens.get(i).map(|t| t.token_type), Some(T::Procedure) | Some(T::Function))
    }

    fn at_module_var_start(&self) -> bool {
        let i = self.skip_annotations(self.current_index);
        self.tokens.get(i).map(|t| t.token_type) == Some(T::Var)
    }

    /// Конец инструкции без `;` допустим только перед закрывающим ключевым словом
    fn at_statement_boundary(&self) -> bool {
        self.at_end()
            || self.at_any(BLOCK_END)
            || self.at_any(&[T::Procedure, T::Function, T::Annotation])
    }

    fn at_statement_end(&self) -> bool {
        self.at(T::Semicolon) || self.at_statement_boundary()
    }

    /// Wraps tokens up to the next `;` (inclusive) or sync keyword into an `Error` node.
    /// Always consumes at least one token.
    fn recover(&mut self, message: &str) {
        self.node(K::Error, |p| {
            p.error_here(message);
            p.bump();
            while !p.at_end() {
                if p.at(T::Semicolon) {
                    p.bump();
                    break;
                }
                if p.at_any(SYNC) {
                    break;
                }
                p.bump();
            }
        });
    }

    // ---- module level --------------------------------------------------

    fn parse_compiler_directives(&mut self) {
        while self.at(T::Annotation) {
            self.node(K::CompilerDirective, |p| {
                p.bump();
                if p.at(T::LeftParen) {
                    p.parse_do_call();
                }
            });
        }
    }

    fn parse_module_var(&mut self) {
        self.node(K::ModuleVar, |p| {
            p.parse_compiler_directives();
            p.bump(); // Перем
            p.node(K::ModuleVarsList, |p| loop {
                p.node(K::ModuleVarDeclaration, |p| {
                    p.expect_identifier("variable name");
                    p.eat(T::Export);
                });
                if !p.eat(T::Comma) {
                    break;
                }
            });
            p.expect(T::Semicolon, ";");
        });
    }

    fn parse_sub(&mut self) {
        let i = self.skip_annotations(self.current_index);
        let is_function = self.tokens.get(i).map(|t| t.token_type) == Some(T::Function);
        let (kind, declaration, end, end_text) = if is_function {
            (K::Function, K::FuncDeclaration, T::EndFunction, "КонецФункции")
        } else {
            (K::Procedure, K::ProcDeclaration, T::EndProcedure, "КонецПроцедуры")
        };

        self.node(K::Sub, |p| {
            p.node(kind, |p| {
                p.node(declaration, |p| {
                    p.parse_compiler_directives();
                    p.bump(); // Процедура / Функция
                    if p.at(T::Identifier) {
                        p.node(K::SubName, |p| p.bump());
                    } else {
                        p.error_here("Expected procedure or function name");
                    }
                    p.parse_param_list();
                    p.eat(T::Export);
                });

                p.node(K::SubCodeBlock, |p| {
                    if p.at(T::Var) {
                        p.node(K::SubVars, |p| {
                            while p.at(T::Var) {
                                p.parse_sub_var();
                            }
                        });
                    }
                    p.parse_code_block(false);
                });

                p.expect(end, end_text);
            });
        });
    }

    fn parse_param_list(&mut self) {
        self.node(K::ParamList, |p| {
            if !p.eat(T::LeftParen) {
                p.error_here("Expected '('");
                return;
            }
            if !p.at(T::RightParen) {
                loop {
                    p.node(K::Param, |p| {
                        p.eat(T::Val);
                        p.expect_identifier("parameter name");
                        if p.at(T::Equal) {
                            p.node(K::DefaultValue, |p| {
                                p.bump();
                                p.parse_const_value(true);
                            });
                        }
                    });
                    if !p.eat(T::Comma) {
                        break;
                    }
                }
            }
            p.expect(T::RightParen, ")");
        });
    }

    fn parse_sub_var(&mut self) {
        self.node(K::SubVar, |p| {
            p.bump(); // Перем
            p.node(K::SubVarsList, |p| loop {
                p.node(K::SubVarDeclaration, |p| p.expect_identifier("variable name"));
                if !p.eat(T::Comma) {
                    break;
                }
            });
            p.expect(T::Semicolon, ";");
        });
    }

    // ---- statements ----------------------------------------------------

    fn parse_code_block(&mut self, top_level: bool) {
        self.node(K::CodeBlock, |p| loop {
            if p.at_end() {
                break;
            }
            if top_level {
                if p.at_sub_start() {
                    break;
                }
            } else if p.at_statement_boundary() {
                break;
            }
            p.parse_statement();
        });
    }

    fn parse_statement(&mut self) {
        self.node(K::Statement, |p| {
            if p.at(T::Tilde) && p.nth(2) == Some(T::Colon) {
                p.parse_label(true);
                if p.at_statement_end() {
                    p.eat(T::Semicolon);
                    return;
                }
            }

            match p.peek() {
                Some(T::If) => p.parse_if(),
                Some(T::While) => p.parse_while(),
                Some(T::For) if p.nth(1) == Some(T::Each) => p.parse_for_each(),
                Some(T::For) => p.parse_for(),
                Some(T::Try) => p.parse_try(),
                Some(T::Return) => p.node(K::ReturnStatement, |p| {
                    p.bump();
                    if !p.at_statement_end() {
                        p.parse_expression();
                    }
                }),
                Some(T::Break) => p.node(K::BreakStatement, |p| p.bump()),
                Some(T::Continue) => p.node(K::ContinueStatement, |p| p.bump()),
                Some(T::Raise) => p.parse_raise(),
                Some(T::Goto) => p.node(K::GotoStatement, |p| {
                    p.bump();
                    if p.at(T::Tilde) {
                        p.parse_label(false);
                    } else {
                        p.error_here("Expected label");
                    }
                }),
                Some(T::Identifier) => {
                    if p.is_assignment_ahead() {
                        p.parse_assignment();
                    } else {
                        p.parse_call_statement();
                    }
                }
                Some(T::Semicolon) => {} // пустая инструкция
                _ => {
                    p.recover("Unexpected token");
                    return;
                }
            }

            if !p.eat(T::Semicolon) && !p.at_statement_boundary() {
                p.error_here("Expected ';'");
            }
        });
    }

    fn parse_label(&mut self, with_colon: bool) {
        self.node(K::Label, |p| {
            p.bump(); // ~
            p.expect_identifier("label name");
            if with_colon {
                p.expect(T::Colon, ":");
            }
        });
    }

    /// `=` на нулевой глубине скобок до конца инструкции означает присваивание
    fn is_assignment_ahead(&self) -> bool {
        let mut depth = 0usize;
        for token in &self.tokens[self.current_index..] {
            match token.token_type {
                T::LeftParen | T::LeftBracket => depth += 1,
                T::RightParen | T::RightBracket => depth = depth.saturating_sub(1),
                T::Equal if depth == 0 => return true,
                T::Semicolon if depth == 0 => return false,
                t if depth == 0 && t.is_keyword() && !EXPRESSION_KEYWORDS.contains(&t) => return false,
                _ => {}
            }
        }
        false
    }

    fn parse_identifier_head(&mut self) {
        if self.nth(1) == Some(T::LeftParen) {
            self.parse_global_method_call();
        } else {
            self.bump();
        }
    }

    fn parse_assignment(&mut self) {
        self.node(K::Assignment, |p| {
            p.node(K::LValue, |p| {
                p.parse_identifier_head();
                p.parse_modifiers();
            });
            p.expect(T::Equal, "=");
            p.parse_expression();
        });
    }

    fn parse_call_statement(&mut self) {
        self.node(K::CallStatement, |p| {
            p.parse_identifier_head();
            p.parse_modifiers();
        });
    }

    fn parse_if(&mut self) {
        self.node(K::IfStatement, |p| {
            p.node(K::IfBranch, |p| {
                p.bump(); // Если
                p.parse_expression();
                p.expect(T::Then, "Тогда");
                p.parse_code_block(false);
            });
            while p.at(T::ElsIf) {
                p.node(K::ElsifBranch, |p| {
                    p.bump();
                    p.parse_expression();
                    p.expect(T::Then, "Тогда");
                    p.parse_code_block(false);
                });
            }
            if p.at(T::Else) {
                p.node(K::ElseBranch, |p| {
                    p.bump();
                    p.parse_code_block(false);
                });
            }
            p.expect(T::EndIf, "КонецЕсли");
        });
    }

    fn parse_while(&mut self) {
        self.node(K::WhileStatement, |p| {
            p.bump(); // Пока
            p.parse_expression();
            p.expect(T::Do, "Цикл");
            p.parse_code_block(false);
            p.expect(T::EndDo, "КонецЦикла");
        });
    }

    fn parse_for(&mut self) {
        self.node(K::ForStatement, |p| {
            p.bump(); // Для
            p.expect_identifier("loop variable");
            p.expect(T::Equal, "=");
            p.parse_expression();
            p.expect(T::To, "По");
            p.parse_expression();
            p.expect(T::Do, "Цикл");
            p.parse_code_block(false);
            p.expect(T::EndDo, "КонецЦикла");
        });
    }

    fn parse_for_each(&mut self) {
        self.node(K::ForEachStatement, |p| {
            p.bump(); // Для
            p.bump(); // Каждого
            p.expect_identifier("loop variable");
            p.expect(T::In, "Из");
            p.parse_expression();
            p.expect(T::Do, "Цикл");
            p.parse_code_block(false);
            p.expect(T::EndDo, "КонецЦикла");
        });
    }

    fn parse_try(&mut self) {
        self.node(K::TryStatement, |p| {
            p.bump(); // Попытка
            p.node(K::TryCodeBlock, |p| p.parse_code_block(false));
            p.expect(T::Except, "Исключение");
            p.node(K::ExceptCodeBlock, |p| p.parse_code_block(false));
            p.expect(T::EndTry, "КонецПопытки");
        });
    }

    fn parse_raise(&mut self) {
        self.node(K::RaiseStatement, |p| {
            p.bump();
            if p.at_statement_end() {
                return;
            }
            // ВызватьИсключение(Текст, Категория) - форма с параметрами
            if p.at(T::LeftParen) && p.has_top_level_comma_in_parens() {
                p.parse_do_call();
            } else {
                p.parse_expression();
            }
        });
    }

    fn has_top_level_comma_in_parens(&self) -> bool {
        let mut depth = 0usize;
        for token in &self.tokens[self.current_index..] {
            match token.token_type {
                T::LeftParen | T::LeftBracket => depth += 1,
                T::RightParen | T::RightBracket => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return false;
                    }
                }
                T::Comma if depth == 1 => return true,
                T::Semicolon => return false,
                _ => {}
            }
        }
        false
    }

    // ---- expressions ---------------------------------------------------

    fn parse_expression(&mut self) {
        self.node(K::Expression, |p| {
            p.parse_member();
            while let Some(token_type) = p.peek() {
                if !is_binary_operator(token_type) {
                    break;
                }
                p.node(K::Operation, |p| {
                    if token_type.is_comparison() {
                        p.node(K::CompareOperation, |p| p.bump());
                    } else if matches!(token_type, T::And | T::Or) {
                        p.node(K::BoolOperation, |p| p.bump());
                    } else {
                        p.bump();
                    }
                });
                p.parse_member();
            }
        });
    }

    fn parse_member(&mut self) {
        self.node(K::Member, |p| {
            while p.at_any(&[T::Not, T::Minus, T::Plus]) {
                p.node(K::UnaryModifier, |p| p.bump());
            }
            match p.peek() {
                Some(T::NumberLiteral)
                | Some(T::StringLiteral)
                | Some(T::DateLiteral)
                | Some(T::True)
                | Some(T::False)
                | Some(T::Undefined)
                | Some(T::Null) => p.parse_const_value(false),
                Some(T::LeftParen) => {
                    p.bump();
                    p.parse_expression();
                    p.expect(T::RightParen, ")");
                    p.parse_modifiers();
                }
                Some(T::Identifier) | Some(T::New) | Some(T::Question) => p.parse_complex_identifier(),
                _ => p.node(K::Error, |p| p.error_here("Expected expression")),
            }
        });
    }

    fn parse_const_value(&mut self, allow_sign: bool) {
        self.node(K::ConstValue, |p| {
            if allow_sign && p.at_any(&[T::Minus, T::Plus]) {
                p.bump();
            }
            match p.peek() {
                // соседние строки склеиваются в одно значение
                Some(T::StringLiteral) => {
                    while p.at(T::StringLiteral) {
                        p.bump();
                    }
                }
                Some(T::NumberLiteral)
                | Some(T::DateLiteral)
                | Some(T::True)
                | Some(T::False)
                | Some(T::Undefined)
                | Some(T::Null) => p.bump(),
                _ => p.error_here("Expected constant"),
            }
        });
    }

    fn parse_complex_identifier(&mut self) {
        self.node(K::ComplexIdentifier, |p| {
            match p.peek() {
                Some(T::New) => p.parse_new_expression(),
                Some(T::Question) => p.parse_ternary(),
                _ => p.parse_identifier_head(),
            }
            p.parse_modifiers();
        });
    }

    fn parse_global_method_call(&mut self) {
        self.node(K::GlobalMethodCall, |p| {
            p.node(K::MethodName, |p| p.bump());
            p.parse_do_call();
        });
    }

    fn parse_do_call(&mut self) {
        self.node(K::DoCall, |p| {
            p.expect(T::LeftParen, "(");
            p.node(K::CallParamList, |p| loop {
                p.node(K::CallParam, |p| {
                    if !p.at(T::Comma) && !p.at(T::RightParen) {
                        p.parse_expression();
                    }
                });
                if !p.eat(T::Comma) {
                    break;
                }
            });
            p.expect(T::RightParen, ")");
        });
    }

    fn parse_new_expression(&mut self) {
        self.node(K::NewExpression, |p| {
            p.bump(); // Новый
            if p.at(T::Identifier) {
                p.node(K::TypeName, |p| p.bump());
            }
            if p.at(T::LeftParen) {
                p.parse_do_call();
            }
        });
    }

    fn parse_ternary(&mut self) {
        self.node(K::TernaryOperator, |p| {
            p.bump(); // ?
            p.expect(T::LeftParen, "(");
            p.parse_expression();
            p.expect(T::Comma, ",");
            p.parse_expression();
            p.expect(T::Comma, ",");
            p.parse_expression();
            p.expect(T::RightParen, ")");
        });
    }

    fn parse_modifiers(&mut self) {
        loop {
            match self.peek() {
                Some(T::Dot) => {
                    let name_like = self.nth(1).map(|t| t.is_name_like()).unwrap_or(false);
                    if name_like && self.nth(2) == Some(T::LeftParen) {
                        self.node(K::Modifier, |p| {
                            p.node(K::AccessCall, |p| {
                                p.bump(); // .
                                p.node(K::MethodCall, |p| {
                                    p.node(K::MethodName, |p| p.bump());
                                    p.parse_do_call();
                                });
                            });
                        });
                    } else {
                        self.node(K::Modifier, |p| {
                            p.node(K::AccessProperty, |p| {
                                p.bump(); // .
                                if name_like {
                                    p.bump();
                                } else {
                                    p.error_here("Expected property name");
                                }
                            });
                        });
                    }
                }
                Some(T::LeftBracket) => {
                    self.node(K::Modifier, |p| {
                        p.node(K::AccessIndex, |p| {
                            p.bump(); // [
                            p.parse_expression();
                            p.expect(T::RightBracket, "]");
                        });
                    });
                }
                _ => break,
            }
        }
    }
}

fn is_binary_operator(token_type: TokenType) -> bool {
    token_type.is_comparison()
        || matches!(
            token_type,
            T::Plus | T::Minus | T::Multiply | T::Divide | T::Modulo | T::And | T::Or
        )
}
