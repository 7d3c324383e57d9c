//! Построение семантического дерева из узла `expression`.
//!
//! `expression → member (operation member)*` сворачивается алгоритмом
//! сортировочной станции; префиксные модификаторы кладутся на стек операторов,
//! постфиксные (`.Свойство`, `[i]`, `.Метод()`) применяются к операнду сразу.

use crate::ast_core::{NodeId, SyntaxKind, SyntaxTree, TokenRange};
use crate::parser::lexer::TokenType;

use super::{
    BinaryOperationNode, BslExpression, BslOperator, CallKind, CallNode, TerminalNode,
    TerminalSymbol, TernaryOperatorNode, UnaryOperationNode,
};

/// Оператор, ожидающий операндов
struct PendingOperator {
    operator: BslOperator,
    node: NodeId,
    range: TokenRange,
}

/// Normalizer over one immutable syntax tree
pub struct ExpressionTreeBuilder<'t> {
    tree: &'t SyntaxTree,
}

impl<'t> ExpressionTreeBuilder<'t> {
    pub fn new(tree: &'t SyntaxTree) -> Self {
        Self { tree }
    }

    /// Семантическое дерево для узла `expression`.
    /// `None`, если поддерево неполное (узлы `Error`, потерянные операнды).
    pub fn build(&self, expression: NodeId) -> Option<BslExpression> {
        if self.tree.kind(expression) != SyntaxKind::Expression {
            return None;
        }

        let mut operands: Vec<BslExpression> = Vec::new();
        let mut operators: Vec<PendingOperator> = Vec::new();

        for child in self.tree.children(expression) {
            match self.tree.kind(child) {
                SyntaxKind::Member => {
                    for modifier in self.tree.children_of_kind(child, SyntaxKind::UnaryModifier) {
                        let token = self.tree.children(modifier).next()?;
                        let operator = BslOperator::unary(self.tree.token_type(token)?)?;
                        operators.push(PendingOperator {
                            operator,
                            node: modifier,
                            range: self.tree.node(modifier).tokens,
                        });
                    }
                    operands.push(self.member(child)?);
                }
                SyntaxKind::Operation => {
                    let (operator, node) = self.operation(child)?;
                    while let Some(top) = operators.last() {
                        let pop = top.operator.priority() > operator.priority()
                            || (top.operator.priority() == operator.priority()
                                && !operator.is_right_associative());
                        if !pop {
                            break;
                        }
                        let top = operators.pop()?;
                        apply(&mut operands, top)?;
                    }
                    operators.push(PendingOperator {
                        operator,
                        node,
                        range: self.tree.node(node).tokens,
                    });
                }
                _ => return None,
            }
        }

        while let Some(top) = operators.pop() {
            apply(&mut operands, top)?;
        }

        if operands.len() == 1 {
            operands.pop()
        } else {
            None
        }
    }

    fn operation(&self, operation: NodeId) -> Option<(BslOperator, NodeId)> {
        let first = self.tree.children(operation).next()?;
        let token = match self.tree.kind(first) {
            SyntaxKind::CompareOperation | SyntaxKind::BoolOperation => {
                self.tree.children(first).next()?
            }
            _ => first,
        };
        Some((BslOperator::binary(self.tree.token_type(token)?)?, operation))
    }

    /// Значение `member` без унарных модификаторов
    fn member(&self, member: NodeId) -> Option<BslExpression> {
        let mut children = self
            .tree
            .children(member)
            .filter(|c| self.tree.kind(*c) != SyntaxKind::UnaryModifier);
        let first = children.next()?;

        match self.tree.kind(first) {
            SyntaxKind::ConstValue => Some(self.terminal(TerminalSymbol::Literal, first)),
            SyntaxKind::ComplexIdentifier => self.complex_identifier(first),
            SyntaxKind::Token if self.tree.token_type(first) == Some(TokenType::LeftParen) => {
                // ( expression ) modifier*
                let inner = self.tree.first_child_of_kind(member, SyntaxKind::Expression)?;
                let base = self.build(inner)?;
                self.apply_modifiers(base, member)
            }
            _ => None,
        }
    }

    fn complex_identifier(&self, identifier: NodeId) -> Option<BslExpression> {
        let first = self.tree.children(identifier).next()?;
        let base = match self.tree.kind(first) {
            SyntaxKind::Token => self.terminal(TerminalSymbol::Identifier, first),
            SyntaxKind::GlobalMethodCall => self.method_call(first)?,
            SyntaxKind::NewExpression => self.new_expression(first)?,
            SyntaxKind::TernaryOperator => self.ternary(first)?,
            _ => return None,
        };
        self.apply_modifiers(base, identifier)
    }

    /// Применяет дочерние `modifier` узла `owner` слева направо
    fn apply_modifiers(&self, mut base: BslExpression, owner: NodeId) -> Option<BslExpression> {
        for modifier in self.tree.children_of_kind(owner, SyntaxKind::Modifier) {
            let access = self.tree.children(modifier).next()?;
            let (operator, right) = match self.tree.kind(access) {
                SyntaxKind::AccessProperty => {
                    let name = self.tree.children(access).nth(1)?;
                    (BslOperator::Dereference, self.terminal(TerminalSymbol::Identifier, name))
                }
                SyntaxKind::AccessIndex => {
                    let index = self.tree.first_child_of_kind(access, SyntaxKind::Expression)?;
                    (BslOperator::IndexAccess, self.build(index)?)
                }
                SyntaxKind::AccessCall => {
                    let call = self.tree.first_child_of_kind(access, SyntaxKind::MethodCall)?;
                    (BslOperator::Dereference, self.method_call(call)?)
                }
                _ => return None,
            };
            let range = base.range().cover(self.tree.node(modifier).tokens);
            base = BslExpression::Binary(BinaryOperationNode {
                operator,
                left: Box::new(base),
                right: Box::new(right),
                node: modifier,
                range,
            });
        }
        Some(base)
    }

    /// `methodName doCall` (глобальный или через точку)
    fn method_call(&self, call: NodeId) -> Option<BslExpression> {
        let name = self.tree.first_child_of_kind(call, SyntaxKind::MethodName)?;
        let name_token = self.tree.children(name).next()?;
        let do_call = self.tree.first_child_of_kind(call, SyntaxKind::DoCall)?;
        Some(BslExpression::Call(CallNode {
            kind: CallKind::Method,
            callee: Box::new(self.terminal(TerminalSymbol::Identifier, name_token)),
            arguments: self.arguments(do_call)?,
            node: call,
            range: self.tree.node(call).tokens,
        }))
    }

    fn new_expression(&self, new: NodeId) -> Option<BslExpression> {
        let callee = match self.tree.first_child_of_kind(new, SyntaxKind::TypeName) {
            Some(type_name) => type_name,
            None => self.tree.child_token(new, TokenType::New)?,
        };
        let arguments = match self.tree.first_child_of_kind(new, SyntaxKind::DoCall) {
            Some(do_call) => self.arguments(do_call)?,
            None => Vec::new(),
        };
        Some(BslExpression::Call(CallNode {
            kind: CallKind::Constructor,
            callee: Box::new(self.terminal(TerminalSymbol::Identifier, callee)),
            arguments,
            node: new,
            range: self.tree.node(new).tokens,
        }))
    }

    fn ternary(&self, ternary: NodeId) -> Option<BslExpression> {
        let mut parts = self.tree.children_of_kind(ternary, SyntaxKind::Expression);
        let condition = self.build(parts.next()?)?;
        let true_part = self.build(parts.next()?)?;
        let false_part = self.build(parts.next()?)?;
        Some(BslExpression::Ternary(TernaryOperatorNode {
            condition: Box::new(condition),
            true_part: Box::new(true_part),
            false_part: Box::new(false_part),
            node: ternary,
            range: self.tree.node(ternary).tokens,
        }))
    }

    /// Аргументы `doCall`. Единственный пустой параметр в `()` означает вызов без аргументов.
    fn arguments(&self, do_call: NodeId) -> Option<Vec<BslExpression>> {
        let list = self.tree.first_child_of_kind(do_call, SyntaxKind::CallParamList)?;
        let params: Vec<NodeId> = self.tree.children_of_kind(list, SyntaxKind::CallParam).collect();

        let mut arguments = Vec::with_capacity(params.len());
        for param in &params {
            match self.tree.first_child_of_kind(*param, SyntaxKind::Expression) {
                Some(expression) => arguments.push(self.build(expression)?),
                None => arguments.push(BslExpression::Terminal(TerminalNode {
                    symbol: TerminalSymbol::Empty,
                    node: *param,
                    range: TokenRange::empty_at(self.tree.node(*param).tokens.start),
                })),
            }
        }

        if arguments.len() == 1 && matches!(&arguments[0], BslExpression::Terminal(t) if t.symbol == TerminalSymbol::Empty) {
            arguments.clear();
        }
        Some(arguments)
    }

    fn terminal(&self, symbol: TerminalSymbol, node: NodeId) -> BslExpression {
        BslExpression::Terminal(TerminalNode { symbol, node, range: self.tree.node(node).tokens })
    }
}

fn apply(operands: &mut Vec<BslExpression>, pending: PendingOperator) -> Option<()> {
    if pending.operator.is_unary() {
        let operand = operands.pop()?;
        let range = pending.range.cover(operand.range());
        operands.push(BslExpression::Unary(UnaryOperationNode {
            operator: pending.operator,
            operand: Box::new(operand),
            node: pending.node,
            range,
        }));
    } else {
        let right = operands.pop()?;
        let left = operands.pop()?;
        let range = left.range().cover(right.range());
        operands.push(BslExpression::Binary(BinaryOperationNode {
            operator: pending.operator,
            left: Box::new(left),
            right: Box::new(right),
            node: pending.node,
            range,
        }));
    }
    Some(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast_core::preorder;
    use crate::expression_tree::ExpressionNodeType;
    use crate::parser::BslParser;
    use pretty_assertions::assert_eq;

    /// Нормализует первое выражение правой части `Х = <expr>;` и печатает его
    fn normalized(expr: &str) -> String {
        let source = format!("Х = {};", expr);
        let result = BslParser::new().parse(&source);
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        let tree = &result.tree;
        let expression = preorder(tree, tree.root())
            .find(|id| tree.kind(*id) == SyntaxKind::Expression)
            .unwrap();
        ExpressionTreeBuilder::new(tree).build(expression).unwrap().to_source(tree)
    }

    #[test]
    fn arithmetic_precedence() {
        assert_eq!(normalized("а + б * в"), "(а + (б * в))");
        assert_eq!(normalized("а - б - в"), "((а - б) - в)");
        assert_eq!(normalized("а / б % в"), "((а / б) % в)");
    }

    #[test]
    fn logical_chains_lean_right() {
        assert_eq!(normalized("а ИЛИ б ИЛИ в"), "(а Или (б Или в))");
        assert_eq!(normalized("а И б ИЛИ в И г"), "((а И б) Или (в И г))");
    }

    #[test]
    fn comparison_binds_tighter_than_not() {
        assert_eq!(normalized("Не а = б"), "(Не (а = б))");
        assert_eq!(normalized("-а * б"), "((-а) * б)");
        assert_eq!(normalized("а > 0 И б < 1"), "((а > 0) И (б < 1))");
    }

    #[test]
    fn parentheses_are_dropped() {
        assert_eq!(normalized("(а + б) * в"), "((а + б) * в)");
        assert_eq!(normalized("((а))"), "а");
    }

    #[test]
    fn postfix_chains() {
        assert_eq!(normalized("Спр[к].Имя"), "Спр[к].Имя");
        assert_eq!(normalized("Объект.Метод(1, , 2).Поле"), "Объект.Метод(1, , 2).Поле");
        assert_eq!(normalized("Ф()"), "Ф()");
        assert_eq!(normalized("(а + б).Длина()"), "(а + б).Длина()");
    }

    #[test]
    fn constructors_and_ternary() {
        assert_eq!(normalized("Новый Структура(\"А\", 1)"), "Новый Структура(\"А\", 1)");
        assert_eq!(normalized("Новый(\"Массив\")"), "Новый(\"Массив\")");
        assert_eq!(normalized("?(а > 0, а, -а)"), "?((а > 0), а, (-а))");
    }

    #[test]
    fn representing_nodes() {
        let source = "Х = а.Б + 1;";
        let result = BslParser::new().parse(source);
        let tree = &result.tree;
        let expression = preorder(tree, tree.root())
            .find(|id| tree.kind(*id) == SyntaxKind::Expression)
            .unwrap();
        let expr = ExpressionTreeBuilder::new(tree).build(expression).unwrap();
        let add = expr.as_binary().unwrap();
        assert_eq!(add.operator, BslOperator::Add);
        assert_eq!(tree.kind(add.node), SyntaxKind::Operation);
        assert_eq!(tree.text(add.node), "+");
        assert_eq!(add.left.source_text(tree), "а.Б");
        assert_eq!(tree.kind(add.left.representing_node()), SyntaxKind::Modifier);
        assert_eq!(add.right.node_type(), ExpressionNodeType::Terminal);
        assert_eq!(expr.source_text(tree), "а.Б + 1");
    }

    #[test]
    fn broken_expression_yields_none() {
        let source = "Х = а + ;";
        let result = BslParser::new().parse(source);
        assert!(!result.errors.is_empty());
        let tree = &result.tree;
        let expression = preorder(tree, tree.root())
            .find(|id| tree.kind(*id) == SyntaxKind::Expression)
            .unwrap();
        assert!(ExpressionTreeBuilder::new(tree).build(expression).is_none());
    }

    #[test]
    fn idempotent_after_reprinting() {
        for expr in [
            "а ИЛИ б И Не в = г",
            "Ф(а, б + 1)[0].Свойство * -2",
            "?(а, Новый Массив, Неопределено) <> \"x\"",
            "а.Б(в).Г[д + е] = ж И з",
        ] {
            let once = normalized(expr);
            let twice = normalized(&once);
            assert_eq!(once, twice, "source: {}", expr);
        }
    }
}
