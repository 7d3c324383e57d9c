/*!
# Expression Tree

Semantic expression tree built from the grammar-shaped `expression` subtree.
Precedence and grouping are already resolved here: parentheses and wrapper
rules (`member`, `complexIdentifier`, `modifier`, ...) are gone, only five node
kinds remain.

Every node keeps a non-owning link (`NodeId` + token range) back into the
`SyntaxTree` it came from; text and positions are read through that link.
*/

pub mod comparer;
pub mod rewriter;

pub use comparer::{
    DefaultNodeEqualityComparer, NodeEqualityComparer, TransitiveOperationsIgnoringComparer,
};
pub use rewriter::ExpressionTreeBuilder;

use serde::Serialize;
use std::fmt;

use crate::ast_core::{NodeId, SyntaxTree, TokenRange};
use crate::parser::lexer::TokenType;

/// Операторы семантического дерева
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BslOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    And,
    Or,
    Not,
    UnaryPlus,
    UnaryMinus,
    Dereference,
    IndexAccess,
}

impl BslOperator {
    /// Бинарный оператор по токену операции
    pub fn binary(token_type: TokenType) -> Option<Self> {
        Some(match token_type {
            TokenType::Plus => Self::Add,
            TokenType::Minus => Self::Subtract,
            TokenType::Multiply => Self::Multiply,
            TokenType::Divide => Self::Divide,
            TokenType::Modulo => Self::Modulo,
            TokenType::Equal => Self::Equal,
            TokenType::NotEqual => Self::NotEqual,
            TokenType::Less => Self::Less,
            TokenType::LessEqual => Self::LessOrEqual,
            TokenType::Greater => Self::Greater,
            TokenType::GreaterEqual => Self::GreaterOrEqual,
            TokenType::And => Self::And,
            TokenType::Or => Self::Or,
            _ => return None,
        })
    }

    /// Унарный оператор по токену модификатора
    pub fn unary(token_type: TokenType) -> Option<Self> {
        Some(match token_type {
            TokenType::Not => Self::Not,
            TokenType::Plus => Self::UnaryPlus,
            TokenType::Minus => Self::UnaryMinus,
            _ => return None,
        })
    }

    /// Приоритет: чем больше, тем сильнее связывает
    pub fn priority(self) -> u8 {
        match self {
            Self::Or => 1,
            Self::And => 2,
            Self::Not => 3,
            Self::Equal
            | Self::NotEqual
            | Self::Less
            | Self::LessOrEqual
            | Self::Greater
            | Self::GreaterOrEqual => 4,
            Self::Add | Self::Subtract => 5,
            Self::Multiply | Self::Divide | Self::Modulo => 6,
            Self::UnaryPlus | Self::UnaryMinus => 7,
            Self::Dereference | Self::IndexAccess => 8,
        }
    }

    /// Логические связки собираются в правые цепочки: `a ИЛИ b ИЛИ c` = `a ИЛИ (b ИЛИ c)`
    pub fn is_right_associative(self) -> bool {
        matches!(self, Self::And | Self::Or)
    }

    pub fn is_unary(self) -> bool {
        matches!(self, Self::Not | Self::UnaryPlus | Self::UnaryMinus)
    }

    pub fn is_logical(self) -> bool {
        matches!(self, Self::And | Self::Or)
    }

    /// Каноническое написание в BSL
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add | Self::UnaryPlus => "+",
            Self::Subtract | Self::UnaryMinus => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Modulo => "%",
            Self::Equal => "=",
            Self::NotEqual => "<>",
            Self::Less => "<",
            Self::LessOrEqual => "<=",
            Self::Greater => ">",
            Self::GreaterOrEqual => ">=",
            Self::And => "И",
            Self::Or => "Или",
            Self::Not => "Не",
            Self::Dereference => ".",
            Self::IndexAccess => "[]",
        }
    }
}

impl fmt::Display for BslOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Вид узла семантического дерева
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ExpressionNodeType {
    Terminal,
    UnaryOp,
    BinaryOp,
    TernaryOp,
    Call,
}

/// Что именно представляет лист
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerminalSymbol {
    Literal,
    Identifier,
    /// Пропущенный параметр вызова: `Ф(, 2)`
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    Method,
    Constructor,
}

/// Литерал или идентификатор
#[derive(Debug, Clone)]
pub struct TerminalNode {
    pub symbol: TerminalSymbol,
    pub node: NodeId,
    pub range: TokenRange,
}

/// Унарная операция
#[derive(Debug, Clone)]
pub struct UnaryOperationNode {
    pub operator: BslOperator,
    pub operand: Box<BslExpression>,
    pub node: NodeId,
    pub range: TokenRange,
}

/// Бинарная операция. `node` указывает на узел `operation` (или `modifier` для
/// разыменования и индекса).
#[derive(Debug, Clone)]
pub struct BinaryOperationNode {
    pub operator: BslOperator,
    pub left: Box<BslExpression>,
    pub right: Box<BslExpression>,
    pub node: NodeId,
    pub range: TokenRange,
}

/// Тернарный оператор `?(условие, да, нет)`
#[derive(Debug, Clone)]
pub struct TernaryOperatorNode {
    pub condition: Box<BslExpression>,
    pub true_part: Box<BslExpression>,
    pub false_part: Box<BslExpression>,
    pub node: NodeId,
    pub range: TokenRange,
}

/// Вызов метода или конструктора
#[derive(Debug, Clone)]
pub struct CallNode {
    pub kind: CallKind,
    pub callee: Box<BslExpression>,
    pub arguments: Vec<BslExpression>,
    pub node: NodeId,
    pub range: TokenRange,
}

/// Узел семантического дерева выражения
#[derive(Debug, Clone)]
pub enum BslExpression {
    Terminal(TerminalNode),
    Unary(UnaryOperationNode),
    Binary(BinaryOperationNode),
    Ternary(TernaryOperatorNode),
    Call(CallNode),
}

impl BslExpression {
    pub fn node_type(&self) -> ExpressionNodeType {
        match self {
            Self::Terminal(_) => ExpressionNodeType::Terminal,
            Self::Unary(_) => ExpressionNodeType::UnaryOp,
            Self::Binary(_) => ExpressionNodeType::BinaryOp,
            Self::Ternary(_) => ExpressionNodeType::TernaryOp,
            Self::Call(_) => ExpressionNodeType::Call,
        }
    }

    /// Узел синтаксического дерева, из которого получен этот узел
    pub fn representing_node(&self) -> NodeId {
        match self {
            Self::Terminal(n) => n.node,
            Self::Unary(n) => n.node,
            Self::Binary(n) => n.node,
            Self::Ternary(n) => n.node,
            Self::Call(n) => n.node,
        }
    }

    /// Токены исходника, покрываемые узлом
    pub fn range(&self) -> TokenRange {
        match self {
            Self::Terminal(n) => n.range,
            Self::Unary(n) => n.range,
            Self::Binary(n) => n.range,
            Self::Ternary(n) => n.range,
            Self::Call(n) => n.range,
        }
    }

    pub fn as_binary(&self) -> Option<&BinaryOperationNode> {
        match self {
            Self::Binary(n) => Some(n),
            _ => None,
        }
    }

    /// Текст исходника под узлом
    pub fn source_text<'t>(&self, tree: &'t SyntaxTree) -> &'t str {
        tree.range_text(self.range())
    }

    /// Печать в BSL с явными скобками вокруг каждой операции.
    /// Повторный разбор результата даёт то же дерево.
    pub fn to_source(&self, tree: &SyntaxTree) -> String {
        let mut out = String::new();
        write_source(self, tree, &mut out);
        out
    }
}

fn write_source(expr: &BslExpression, tree: &SyntaxTree, out: &mut String) {
    match expr {
        BslExpression::Terminal(t) => out.push_str(tree.range_text(t.range)),
        BslExpression::Unary(u) => {
            out.push('(');
            out.push_str(u.operator.symbol());
            if u.operator == BslOperator::Not {
                out.push(' ');
            }
            write_source(&u.operand, tree, out);
            out.push(')');
        }
        BslExpression::Binary(b) => match b.operator {
            BslOperator::Dereference => {
                write_source(&b.left, tree, out);
                out.push('.');
                write_source(&b.right, tree, out);
            }
            BslOperator::IndexAccess => {
                write_source(&b.left, tree, out);
                out.push('[');
                write_source(&b.right, tree, out);
                out.push(']');
            }
            operator => {
                out.push('(');
                write_source(&b.left, tree, out);
                out.push(' ');
                out.push_str(operator.symbol());
                out.push(' ');
                write_source(&b.right, tree, out);
                out.push(')');
            }
        },
        BslExpression::Ternary(t) => {
            out.push_str("?(");
            write_source(&t.condition, tree, out);
            out.push_str(", ");
            write_source(&t.true_part, tree, out);
            out.push_str(", ");
            write_source(&t.false_part, tree, out);
            out.push(')');
        }
        BslExpression::Call(c) => {
            if c.kind == CallKind::Constructor {
                out.push_str("Новый");
                // `Новый("Тип", ...)`: имени типа нет, вызываемым служит сам `Новый`
                if tree.token_type(c.callee.representing_node()) != Some(TokenType::New) {
                    out.push(' ');
                    write_source(&c.callee, tree, out);
                }
            } else {
                write_source(&c.callee, tree, out);
            }
            out.push('(');
            for (i, arg) in c.arguments.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_source(arg, tree, out);
            }
            out.push(')');
        }
    }
}
