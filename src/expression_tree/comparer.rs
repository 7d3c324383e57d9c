//! Структурное сравнение узлов семантического дерева.
//!
//! `NodeEqualityComparer` задаёт базовое правило (тот же вид узла, тот же
//! оператор, попарно равные дети; листья равны по тексту токенов). Реализации
//! переопределяют отдельные шаги, как `TransitiveOperationsIgnoringComparer`
//! для цепочек `И`/`ИЛИ`.

use crate::ast_core::SyntaxTree;

use super::{
    BinaryOperationNode, BslExpression, BslOperator, CallNode, TerminalNode, TernaryOperatorNode,
    UnaryOperationNode,
};

/// Equality over semantic expression nodes of one syntax tree
pub trait NodeEqualityComparer {
    fn tree(&self) -> &SyntaxTree;

    fn are_equal(&self, first: &BslExpression, second: &BslExpression) -> bool {
        match (first, second) {
            (BslExpression::Terminal(a), BslExpression::Terminal(b)) => self.terminals_equal(a, b),
            (BslExpression::Unary(a), BslExpression::Unary(b)) => self.unary_operations_equal(a, b),
            (BslExpression::Binary(a), BslExpression::Binary(b)) => {
                self.binary_operations_equal(a, b)
            }
            (BslExpression::Ternary(a), BslExpression::Ternary(b)) => {
                self.ternary_operators_equal(a, b)
            }
            (BslExpression::Call(a), BslExpression::Call(b)) => self.calls_equal(a, b),
            _ => false,
        }
    }

    /// Листья равны, если совпадает вид и последовательность текстов токенов
    fn terminals_equal(&self, first: &TerminalNode, second: &TerminalNode) -> bool {
        if first.symbol != second.symbol {
            return false;
        }
        let tree = self.tree();
        let left = tree.tokens_in(first.range);
        let right = tree.tokens_in(second.range);
        left.len() == right.len()
            && left
                .iter()
                .zip(right)
                .all(|(a, b)| tree.token_text(a) == tree.token_text(b))
    }

    fn unary_operations_equal(&self, first: &UnaryOperationNode, second: &UnaryOperationNode) -> bool {
        first.operator == second.operator && self.are_equal(&first.operand, &second.operand)
    }

    fn binary_operations_equal(&self, first: &BinaryOperationNode, second: &BinaryOperationNode) -> bool {
        first.operator == second.operator
            && self.are_equal(&first.left, &second.left)
            && self.are_equal(&first.right, &second.right)
    }

    fn ternary_operators_equal(&self, first: &TernaryOperatorNode, second: &TernaryOperatorNode) -> bool {
        self.are_equal(&first.condition, &second.condition)
            && self.are_equal(&first.true_part, &second.true_part)
            && self.are_equal(&first.false_part, &second.false_part)
    }

    fn calls_equal(&self, first: &CallNode, second: &CallNode) -> bool {
        first.kind == second.kind
            && first.arguments.len() == second.arguments.len()
            && self.are_equal(&first.callee, &second.callee)
            && first
                .arguments
                .iter()
                .zip(&second.arguments)
                .all(|(a, b)| self.are_equal(a, b))
    }
}

/// Строгое сравнение по форме дерева
pub struct DefaultNodeEqualityComparer<'t> {
    tree: &'t SyntaxTree,
}

impl<'t> DefaultNodeEqualityComparer<'t> {
    pub fn new(tree: &'t SyntaxTree) -> Self {
        Self { tree }
    }
}

impl NodeEqualityComparer for DefaultNodeEqualityComparer<'_> {
    fn tree(&self) -> &SyntaxTree {
        self.tree
    }
}

/// Сравнение, в котором правая цепочка одной логической связки считается
/// неупорядоченным мультимножеством операндов: `а ИЛИ (б ИЛИ в)` равно `в ИЛИ (а ИЛИ б)`.
pub struct TransitiveOperationsIgnoringComparer<'t> {
    tree: &'t SyntaxTree,
    logical_operations_as_transitive: bool,
}

impl<'t> TransitiveOperationsIgnoringComparer<'t> {
    pub fn new(tree: &'t SyntaxTree) -> Self {
        Self { tree, logical_operations_as_transitive: false }
    }

    pub fn logical_operations_as_transitive(mut self, enabled: bool) -> Self {
        self.logical_operations_as_transitive = enabled;
        self
    }

    fn is_transitive(&self, operator: BslOperator) -> bool {
        self.logical_operations_as_transitive && operator.is_logical()
    }
}

/// Операнды правой цепочки `a op (b op (c ...))`
pub(crate) fn flatten_chain(node: &BinaryOperationNode) -> Vec<&BslExpression> {
    let mut operands = vec![node.left.as_ref()];
    let mut rest = node.right.as_ref();
    loop {
        match rest {
            BslExpression::Binary(next) if next.operator == node.operator => {
                operands.push(next.left.as_ref());
                rest = next.right.as_ref();
            }
            other => {
                operands.push(other);
                break;
            }
        }
    }
    operands
}

impl NodeEqualityComparer for TransitiveOperationsIgnoringComparer<'_> {
    fn tree(&self) -> &SyntaxTree {
        self.tree
    }

    fn binary_operations_equal(&self, first: &BinaryOperationNode, second: &BinaryOperationNode) -> bool {
        if first.operator != second.operator {
            return false;
        }
        if !self.is_transitive(first.operator) {
            return self.are_equal(&first.left, &second.left)
                && self.are_equal(&first.right, &second.right);
        }

        let left = flatten_chain(first);
        let right = flatten_chain(second);
        if left.len() != right.len() {
            return false;
        }

        // жадное сопоставление: каждому операнду слева ищем свободную пару справа
        let mut used = vec![false; right.len()];
        left.iter().all(|operand| {
            let found = right
                .iter()
                .enumerate()
                .find(|(i, candidate)| !used[*i] && self.are_equal(operand, candidate))
                .map(|(i, _)| i);
            match found {
                Some(i) => {
                    used[i] = true;
                    true
                }
                None => false,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast_core::{preorder, SyntaxKind};
    use crate::expression_tree::ExpressionTreeBuilder;
    use crate::parser::{BslParser, ParseResult};

    /// Разбирает `Х1 = <e1>; Х2 = <e2>; ...` и возвращает семантические деревья правых частей
    fn parse_all(exprs: &[&str]) -> (ParseResult, Vec<BslExpression>) {
        let source: String = exprs
            .iter()
            .enumerate()
            .map(|(i, e)| format!("Х{} = {};\n", i, e))
            .collect();
        let result = BslParser::new().parse(&source);
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        let tree = &result.tree;
        let builder = ExpressionTreeBuilder::new(tree);
        let roots: Vec<_> = preorder(tree, tree.root())
            .filter(|id| tree.kind(*id) == SyntaxKind::Assignment)
            .filter_map(|a| tree.first_child_of_kind(a, SyntaxKind::Expression))
            .map(|e| builder.build(e).unwrap())
            .collect();
        (result, roots)
    }

    #[test]
    fn equality_is_an_equivalence_relation() {
        let (result, e) = parse_all(&[
            "Ф(а, б.В) + 1",
            "Ф(а, б.В) + 1",
            "Ф(а,   б.В)+1",
            "Ф(а, б.Г) + 1",
            "?(а, б, в)",
            "Новый Массив",
        ]);
        let comparer = DefaultNodeEqualityComparer::new(&result.tree);

        // рефлексивность
        for x in &e {
            assert!(comparer.are_equal(x, x));
        }
        // симметричность
        for x in &e {
            for y in &e {
                assert_eq!(comparer.are_equal(x, y), comparer.are_equal(y, x));
            }
        }
        // транзитивность
        for x in &e {
            for y in &e {
                for z in &e {
                    if comparer.are_equal(x, y) && comparer.are_equal(y, z) {
                        assert!(comparer.are_equal(x, z));
                    }
                }
            }
        }

        assert!(comparer.are_equal(&e[0], &e[2]));
        assert!(!comparer.are_equal(&e[0], &e[3]));
        assert!(!comparer.are_equal(&e[4], &e[5]));
    }

    #[test]
    fn terminals_compare_by_text_and_kind() {
        let (result, e) = parse_all(&["а", "А", "\"а\"", "а"]);
        let comparer = DefaultNodeEqualityComparer::new(&result.tree);
        assert!(comparer.are_equal(&e[0], &e[3]));
        assert!(!comparer.are_equal(&e[0], &e[1]));
        assert!(!comparer.are_equal(&e[0], &e[2]));
    }

    #[test]
    fn default_comparer_is_shape_exact() {
        let (result, e) = parse_all(&["а ИЛИ б ИЛИ в", "в ИЛИ а ИЛИ б", "а + б", "б + а"]);
        let comparer = DefaultNodeEqualityComparer::new(&result.tree);
        assert!(!comparer.are_equal(&e[0], &e[1]));
        assert!(!comparer.are_equal(&e[2], &e[3]));
    }

    #[test]
    fn logical_chains_as_multisets() {
        let (result, e) = parse_all(&[
            "а ИЛИ б ИЛИ в",
            "в ИЛИ а ИЛИ б",
            "а ИЛИ б",
            "а И б И в",
            "а ИЛИ а ИЛИ б",
            "а ИЛИ б ИЛИ б",
            "а + б",
            "б + а",
        ]);
        let tree = &result.tree;

        let plain = TransitiveOperationsIgnoringComparer::new(tree);
        assert!(!plain.are_equal(&e[0], &e[1]));

        let comparer = TransitiveOperationsIgnoringComparer::new(tree).logical_operations_as_transitive(true);
        assert!(comparer.are_equal(&e[0], &e[1]));
        assert!(!comparer.are_equal(&e[0], &e[2]), "different chain length");
        assert!(!comparer.are_equal(&e[0], &e[3]), "different operator");
        assert!(!comparer.are_equal(&e[4], &e[5]), "multiset, not set");
        assert!(!comparer.are_equal(&e[6], &e[7]), "arithmetic stays ordered");
    }
}
