//! Конкретное синтаксическое дерево (CST) в арене.
//!
//! Узлы адресуются `NodeId`, дети связаны через first_child / next_sibling.
//! Каждый узел хранит диапазон своих токенов, поэтому текст и позиции любого
//! поддерева вычисляются за O(1). После `TreeBuilder::build` дерево неизменяемо.

use crate::core::position::{Position, Span};
use crate::parser::lexer::{Token, TokenType};

/// Устойчивый идентификатор узла внутри одной арены.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// Полуоткрытый диапазон индексов токенов `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TokenRange {
    pub start: u32,
    pub end: u32,
}

impl TokenRange {
    pub fn new(start: u32, end: u32) -> Self { Self { start, end } }
    pub fn empty_at(at: u32) -> Self { Self { start: at, end: at } }
    pub fn is_empty(&self) -> bool { self.end <= self.start }
    pub fn len(&self) -> usize { self.end.saturating_sub(self.start) as usize }
    /// Наименьший диапазон, покрывающий оба (пустые диапазоны игнорируются).
    pub fn cover(self, other: TokenRange) -> TokenRange {
        if self.is_empty() { return other; }
        if other.is_empty() { return self; }
        TokenRange::new(self.start.min(other.start), self.end.max(other.end))
    }
}

/// Вид узла: правила грамматики BSL + лист-токен + узел ошибки.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SyntaxKind {
    File,
    ModuleVars,
    ModuleVar,
    ModuleVarsList,
    ModuleVarDeclaration,
    Subs,
    Sub,
    Procedure,
    ProcDeclaration,
    Function,
    FuncDeclaration,
    SubName,
    ParamList,
    Param,
    DefaultValue,
    CompilerDirective,
    SubCodeBlock,
    SubVars,
    SubVar,
    SubVarsList,
    SubVarDeclaration,
    FileCodeBlock,
    CodeBlock,
    Statement,
    Label,
    Assignment,
    LValue,
    CallStatement,
    IfStatement,
    IfBranch,
    ElsifBranch,
    ElseBranch,
    WhileStatement,
    ForStatement,
    ForEachStatement,
    TryStatement,
    TryCodeBlock,
    ExceptCodeBlock,
    ReturnStatement,
    BreakStatement,
    ContinueStatement,
    RaiseStatement,
    GotoStatement,
    Expression,
    Operation,
    CompareOperation,
    BoolOperation,
    UnaryModifier,
    Member,
    ConstValue,
    ComplexIdentifier,
    Modifier,
    AccessProperty,
    AccessIndex,
    AccessCall,
    MethodCall,
    GlobalMethodCall,
    MethodName,
    DoCall,
    CallParamList,
    CallParam,
    NewExpression,
    TypeName,
    TernaryOperator,
    Token,
    Error,
}

impl SyntaxKind {
    /// Фиксированная каноническая метка (lowerCamel имя правила).
    /// Используется при вычислении отпечатков, поэтому значения менять нельзя.
    pub fn canonical_name(self) -> &'static str {
        use SyntaxKind::*;
        match self {
            File => "file",
            ModuleVars => "moduleVars",
            ModuleVar => "moduleVar",
            ModuleVarsList => "moduleVarsList",
            ModuleVarDeclaration => "moduleVarDeclaration",
            Subs => "subs",
            Sub => "sub",
            Procedure => "procedure",
            ProcDeclaration => "procDeclaration",
            Function => "function",
            FuncDeclaration => "funcDeclaration",
            SubName => "subName",
            ParamList => "paramList",
            Param => "param",
            DefaultValue => "defaultValue",
            CompilerDirective => "compilerDirective",
            SubCodeBlock => "subCodeBlock",
            SubVars => "subVars",
            SubVar => "subVar",
            SubVarsList => "subVarsList",
            SubVarDeclaration => "subVarDeclaration",
            FileCodeBlock => "fileCodeBlock",
            CodeBlock => "codeBlock",
            Statement => "statement",
            Label => "label",
            Assignment => "assignment",
            LValue => "lValue",
            CallStatement => "callStatement",
            IfStatement => "ifStatement",
            IfBranch => "ifBranch",
            ElsifBranch => "elsifBranch",
            ElseBranch => "elseBranch",
            WhileStatement => "whileStatement",
            ForStatement => "forStatement",
            ForEachStatement => "forEachStatement",
            TryStatement => "tryStatement",
            TryCodeBlock => "tryCodeBlock",
            ExceptCodeBlock => "exceptCodeBlock",
            ReturnStatement => "returnStatement",
            BreakStatement => "breakStatement",
            ContinueStatement => "continueStatement",
            RaiseStatement => "raiseStatement",
            GotoStatement => "gotoStatement",
            Expression => "expression",
            Operation => "operation",
            CompareOperation => "compareOperation",
            BoolOperation => "boolOperation",
            UnaryModifier => "unaryModifier",
            Member => "member",
            ConstValue => "constValue",
            ComplexIdentifier => "complexIdentifier",
            Modifier => "modifier",
            AccessProperty => "accessProperty",
            AccessIndex => "accessIndex",
            AccessCall => "accessCall",
            MethodCall => "methodCall",
            GlobalMethodCall => "globalMethodCall",
            MethodName => "methodName",
            DoCall => "doCall",
            CallParamList => "callParamList",
            CallParam => "callParam",
            NewExpression => "newExpression",
            TypeName => "typeName",
            TernaryOperator => "ternaryOperator",
            Token => "token",
            Error => "error",
        }
    }
}

/// Узел в арене.
#[derive(Debug, Clone)]
pub struct SyntaxNode {
    pub kind: SyntaxKind,
    pub first_child: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
    /// Токены, покрываемые узлом.
    pub tokens: TokenRange,
}

impl SyntaxNode {
    fn new(kind: SyntaxKind, tokens: TokenRange) -> Self {
        Self { kind, first_child: None, next_sibling: None, tokens }
    }

    pub fn is_token(&self) -> bool { self.kind == SyntaxKind::Token }
}

/// Синтаксическая ошибка, найденная лексером или парсером.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub message: String,
    pub range: Span,
}

/// Агрегатор всех узлов.
#[derive(Default, Debug, Clone)]
pub struct Arena {
    nodes: Vec<SyntaxNode>,
}

impl Arena {
    pub fn new() -> Self { Self { nodes: Vec::new() } }
    fn alloc(&mut self, node: SyntaxNode) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }
    pub fn node(&self, id: NodeId) -> &SyntaxNode { &self.nodes[id.0 as usize] }
    fn node_mut(&mut self, id: NodeId) -> &mut SyntaxNode { &mut self.nodes[id.0 as usize] }
    pub fn len(&self) -> usize { self.nodes.len() }
    pub fn is_empty(&self) -> bool { self.nodes.is_empty() }
    pub fn iter(&self) -> impl Iterator<Item=(NodeId, &SyntaxNode)> { self.nodes.iter().enumerate().map(|(i,n)|(NodeId(i as u32), n)) }
    pub fn children(&self, id: NodeId) -> NodeChildren<'_> {
        NodeChildren { arena: self, next: self.node(id).first_child }
    }
}

/// Итератор детей конкретного узла.
pub struct NodeChildren<'a> {
    arena: &'a Arena,
    next: Option<NodeId>,
}

impl<'a> Iterator for NodeChildren<'a> {
    type Item = NodeId;
    fn next(&mut self) -> Option<Self::Item> {
        let cur = self.next?;
        self.next = self.arena.node(cur).next_sibling;
        Some(cur)
    }
}

/// Построитель дерева (nested push/pop стеком).
pub struct TreeBuilder {
    arena: Arena,
    stack: Vec<NodeId>,
    /// Последний ребёнок каждого узла, чтобы присоединение было O(1).
    last_child: Vec<Option<NodeId>>,
    root: Option<NodeId>,
    source: String,
    tokens: Vec<Token>,
    errors: Vec<SyntaxError>,
}

impl TreeBuilder {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            arena: Arena::new(),
            stack: Vec::new(),
            last_child: Vec::new(),
            root: None,
            source: source.into(),
            tokens: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn next_token_index(&self) -> u32 { self.tokens.len() as u32 }

    pub fn start_node(&mut self, kind: SyntaxKind) {
        let at = self.next_token_index();
        let id = self.alloc(SyntaxNode::new(kind, TokenRange::empty_at(at)));
        self.attach(id);
        self.stack.push(id);
        if self.root.is_none() { self.root = Some(id); }
    }

    pub fn finish_node(&mut self) {
        let end = self.next_token_index();
        if let Some(id) = self.stack.pop() {
            self.arena.node_mut(id).tokens.end = end;
        }
    }

    /// Лист-токен.
    pub fn token(&mut self, token: Token) -> NodeId {
        let idx = self.next_token_index();
        self.tokens.push(token);
        let id = self.alloc(SyntaxNode::new(SyntaxKind::Token, TokenRange::new(idx, idx + 1)));
        self.attach(id);
        if self.root.is_none() { self.root = Some(id); }
        id
    }

    pub fn error(&mut self, message: impl Into<String>, range: Span) {
        self.errors.push(SyntaxError { message: message.into(), range });
    }

    /// Глубина открытых узлов (для диагностики незакрытых узлов в тестах).
    pub fn depth(&self) -> usize { self.stack.len() }

    fn alloc(&mut self, node: SyntaxNode) -> NodeId {
        self.last_child.push(None);
        self.arena.alloc(node)
    }

    fn attach(&mut self, id: NodeId) {
        if let Some(&parent) = self.stack.last() {
            match self.last_child[parent.0 as usize] {
                None => self.arena.node_mut(parent).first_child = Some(id),
                Some(prev) => self.arena.node_mut(prev).next_sibling = Some(id),
            }
            self.last_child[parent.0 as usize] = Some(id);
        }
    }

    pub fn build(mut self) -> SyntaxTree {
        while !self.stack.is_empty() { self.finish_node(); }
        self.errors.sort_by_key(|e| e.range.start);
        let root = match self.root {
            Some(r) => r,
            None => {
                // пустой ввод: корень File без детей
                self.arena.alloc(SyntaxNode::new(SyntaxKind::File, TokenRange::empty_at(0)))
            }
        };
        SyntaxTree { arena: self.arena, root, source: self.source, tokens: self.tokens, errors: self.errors }
    }
}

/// Неизменяемое синтаксическое дерево одного файла.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    arena: Arena,
    root: NodeId,
    source: String,
    tokens: Vec<Token>,
    errors: Vec<SyntaxError>,
}

impl SyntaxTree {
    pub fn root(&self) -> NodeId { self.root }
    pub fn arena(&self) -> &Arena { &self.arena }
    pub fn source(&self) -> &str { &self.source }
    pub fn tokens(&self) -> &[Token] { &self.tokens }
    pub fn errors(&self) -> &[SyntaxError] { &self.errors }
    pub fn has_errors(&self) -> bool { !self.errors.is_empty() }
    pub fn node(&self, id: NodeId) -> &SyntaxNode { self.arena.node(id) }
    pub fn kind(&self, id: NodeId) -> SyntaxKind { self.arena.node(id).kind }
    pub fn len(&self) -> usize { self.arena.len() }
    pub fn is_empty(&self) -> bool { self.tokens.is_empty() }

    pub fn children(&self, id: NodeId) -> NodeChildren<'_> { self.arena.children(id) }
    pub fn child_count(&self, id: NodeId) -> usize { self.children(id).count() }
    /// Дети заданного kind.
    pub fn children_of_kind(&self, id: NodeId, kind: SyntaxKind) -> impl Iterator<Item=NodeId> + '_ {
        self.children(id).filter(move |c| self.kind(*c) == kind)
    }
    /// Первый ребенок нужного kind.
    pub fn first_child_of_kind(&self, id: NodeId, kind: SyntaxKind) -> Option<NodeId> {
        self.children(id).find(|c| self.kind(*c) == kind)
    }
    /// Первый ребёнок-токен заданного типа.
    pub fn child_token(&self, id: NodeId, token_type: TokenType) -> Option<NodeId> {
        self.children(id).find(|c| self.token(*c).map(|t| t.token_type) == Some(token_type))
    }

    /// Токен листа (None для внутренних узлов).
    pub fn token(&self, id: NodeId) -> Option<&Token> {
        let node = self.node(id);
        if node.is_token() { self.tokens.get(node.tokens.start as usize) } else { None }
    }
    pub fn token_type(&self, id: NodeId) -> Option<TokenType> { self.token(id).map(|t| t.token_type) }
    pub fn token_text(&self, token: &Token) -> &str { token.text(&self.source) }
    pub fn tokens_in(&self, range: TokenRange) -> &[Token] {
        if range.is_empty() { return &[]; }
        &self.tokens[range.start as usize..range.end as usize]
    }

    /// Исходный текст, покрываемый диапазоном токенов (включая пробелы между ними).
    pub fn range_text(&self, range: TokenRange) -> &str {
        let toks = self.tokens_in(range);
        match (toks.first(), toks.last()) {
            (Some(first), Some(last)) => &self.source[first.span.start as usize..last.span.end() as usize],
            _ => "",
        }
    }
    pub fn text(&self, id: NodeId) -> &str { self.range_text(self.node(id).tokens) }

    pub fn start(&self, id: NodeId) -> Option<Position> { self.tokens_in(self.node(id).tokens).first().map(|t| t.start) }
    pub fn end(&self, id: NodeId) -> Option<Position> { self.tokens_in(self.node(id).tokens).last().map(|t| t.end) }
    pub fn range_span(&self, range: TokenRange) -> Option<Span> {
        let toks = self.tokens_in(range);
        Some(Span::new(toks.first()?.start, toks.last()?.end))
    }
    pub fn span(&self, id: NodeId) -> Option<Span> { self.range_span(self.node(id).tokens) }

    /// Подсчитать количество узлов указанного вида.
    pub fn count_kind(&self, kind: SyntaxKind) -> usize {
        self.arena.iter().filter(|(_, n)| n.kind == kind).count()
    }
}

/// Утилита обхода (предварительный проход).
pub fn preorder(tree: &SyntaxTree, root: NodeId) -> impl Iterator<Item=NodeId> + '_ {
    let mut stack = vec![root];
    std::iter::from_fn(move || {
        let id = stack.pop()?;
        // push children в обратном порядке для сохранения слева-направо
        let children: Vec<NodeId> = tree.children(id).collect();
        stack.extend(children.into_iter().rev());
        Some(id)
    })
}

/// Контроль обхода.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitControl { Continue, SkipChildren, Stop }

/// Visitor API (enter/leave). Возвращаем VisitControl из enter.
pub trait Visitor {
    fn enter(&mut self, _id: NodeId, _node: &SyntaxNode, _tree: &SyntaxTree) -> VisitControl { VisitControl::Continue }
    fn leave(&mut self, _id: NodeId, _node: &SyntaxNode, _tree: &SyntaxTree) {}
}

/// Обход дерева с visitor (preorder + post события). Возвращает true если не прерван.
pub fn walk<V: Visitor>(tree: &SyntaxTree, root: NodeId, visitor: &mut V) -> bool {
    // Нестрогая рекурсия (глубина BSL обычно умеренная).
    fn inner<V: Visitor>(tree: &SyntaxTree, id: NodeId, vis: &mut V) -> Option<()> {
        let node = tree.node(id);
        match vis.enter(id, node, tree) {
            VisitControl::Continue => {
                let mut child = node.first_child;
                while let Some(c) = child {
                    inner(tree, c, vis)?;
                    child = tree.node(c).next_sibling;
                }
            }
            VisitControl::SkipChildren => { /* пропуск */ }
            VisitControl::Stop => { return None; }
        }
        vis.leave(id, node, tree);
        Some(())
    }
    inner(tree, root, visitor).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::lexer::BslLexer;

    /// Дерево `expression(member(token a) operation(token =) member(token a))` без парсера.
    fn hand_built(src: &str) -> SyntaxTree {
        let toks = BslLexer::new().tokenize(src).tokens;
        let mut b = TreeBuilder::new(src);
        b.start_node(SyntaxKind::Expression);
        b.start_node(SyntaxKind::Member);
        b.token(toks[0]);
        b.finish_node();
        b.start_node(SyntaxKind::Operation);
        b.token(toks[1]);
        b.finish_node();
        b.start_node(SyntaxKind::Member);
        b.token(toks[2]);
        b.finish_node();
        b.finish_node();
        b.build()
    }

    #[test]
    fn build_and_navigate() {
        let tree = hand_built("а  =  б");
        let root = tree.root();
        assert_eq!(tree.kind(root), SyntaxKind::Expression);
        assert_eq!(tree.child_count(root), 3);
        assert_eq!(tree.text(root), "а  =  б");
        let op = tree.first_child_of_kind(root, SyntaxKind::Operation).unwrap();
        assert_eq!(tree.text(op), "=");
        assert_eq!(tree.children_of_kind(root, SyntaxKind::Member).count(), 2);
        let span = tree.span(root).unwrap();
        assert_eq!((span.start.column, span.end.column), (1, 8));
    }

    #[test]
    fn preorder_is_left_to_right() {
        let tree = hand_built("а = б");
        let kinds: Vec<_> = preorder(&tree, tree.root()).map(|id| tree.kind(id)).collect();
        assert_eq!(kinds, vec![
            SyntaxKind::Expression,
            SyntaxKind::Member, SyntaxKind::Token,
            SyntaxKind::Operation, SyntaxKind::Token,
            SyntaxKind::Member, SyntaxKind::Token,
        ]);
    }

    struct CountingVisitor { enter_seq: Vec<SyntaxKind>, leaves: usize, skip: SyntaxKind }
    impl Visitor for CountingVisitor {
        fn enter(&mut self, _id: NodeId, node: &SyntaxNode, _tree: &SyntaxTree) -> VisitControl {
            self.enter_seq.push(node.kind);
            if node.kind == self.skip { return VisitControl::SkipChildren; }
            VisitControl::Continue
        }
        fn leave(&mut self, _id: NodeId, _node: &SyntaxNode, _tree: &SyntaxTree) { self.leaves += 1; }
    }

    #[test]
    fn walk_respects_skip_children() {
        let tree = hand_built("а = б");
        let mut v = CountingVisitor { enter_seq: Vec::new(), leaves: 0, skip: SyntaxKind::Member };
        assert!(walk(&tree, tree.root(), &mut v));
        // токены внутри Member не посещаются
        assert_eq!(v.enter_seq.len(), 5);
        assert_eq!(v.leaves, 5);
    }

    #[test]
    fn empty_builder_yields_file_root() {
        let tree = TreeBuilder::new("").build();
        assert_eq!(tree.kind(tree.root()), SyntaxKind::File);
        assert_eq!(tree.text(tree.root()), "");
        assert!(tree.span(tree.root()).is_none());
    }

    #[test]
    fn token_range_cover() {
        let a = TokenRange::new(2, 4);
        let b = TokenRange::new(5, 7);
        assert_eq!(a.cover(b), TokenRange::new(2, 7));
        assert_eq!(TokenRange::empty_at(9).cover(a), a);
    }
}
