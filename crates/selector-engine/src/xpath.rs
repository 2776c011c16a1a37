//! XPath engine over the snapshot
//!
//! Supports location paths with the common axes, name/`*`/`node()` tests and
//! predicates built from attributes, `text()`, `.`, child names, string and
//! number literals, comparisons, `and`/`or` and the core string functions.
//! Only element results are returned.

use std::collections::{HashMap, HashSet};

use dom_snapshot::{Document, NodeId, NodeKind};

use crate::errors::EngineFailure;

#[derive(Clone, Debug, PartialEq)]
pub struct XPathExpr {
    /// Parenthesized head: `(//li)[2]`
    group: Option<Box<Group>>,
    steps: Vec<Step>,
}

#[derive(Clone, Debug, PartialEq)]
struct Group {
    inner: XPathExpr,
    predicates: Vec<Expr>,
}

#[derive(Clone, Debug, PartialEq)]
struct Step {
    /// Preceded by `//`
    deep: bool,
    axis: Axis,
    test: NodeTest,
    predicates: Vec<Expr>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    Parent,
    Ancestor,
    AncestorOrSelf,
    SelfNode,
    FollowingSibling,
    PrecedingSibling,
}

impl Axis {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "child" => Axis::Child,
            "descendant" => Axis::Descendant,
            "descendant-or-self" => Axis::DescendantOrSelf,
            "parent" => Axis::Parent,
            "ancestor" => Axis::Ancestor,
            "ancestor-or-self" => Axis::AncestorOrSelf,
            "self" => Axis::SelfNode,
            "following-sibling" => Axis::FollowingSibling,
            "preceding-sibling" => Axis::PrecedingSibling,
            _ => return None,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
enum NodeTest {
    Name(String),
    AnyElement,
    AnyNode,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Clone, Debug, PartialEq)]
enum Expr {
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Cmp(Box<Expr>, CmpOp, Box<Expr>),
    Number(f64),
    Literal(String),
    Attr(String),
    Text,
    ContextNode,
    ChildNamed(String),
    Call(String, Vec<Expr>),
}

#[derive(Clone, Debug)]
enum Value {
    Nodes(Vec<String>),
    Str(String),
    Num(f64),
    Bool(bool),
}

impl Value {
    fn to_bool(&self) -> bool {
        match self {
            Value::Nodes(nodes) => !nodes.is_empty(),
            Value::Str(s) => !s.is_empty(),
            Value::Num(n) => *n != 0.0 && !n.is_nan(),
            Value::Bool(b) => *b,
        }
    }

    fn to_string_value(&self) -> String {
        match self {
            Value::Nodes(nodes) => nodes.first().cloned().unwrap_or_default(),
            Value::Str(s) => s.clone(),
            Value::Num(n) => {
                if n.fract() == 0.0 && n.is_finite() {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
            Value::Bool(b) => b.to_string(),
        }
    }

    fn to_number(&self) -> f64 {
        match self {
            Value::Num(n) => *n,
            Value::Bool(b) => f64::from(u8::from(*b)),
            other => other.to_string_value().trim().parse().unwrap_or(f64::NAN),
        }
    }
}

pub fn parse_xpath(source: &str) -> Result<XPathExpr, EngineFailure> {
    let mut parser = XPathParser {
        chars: source.trim().chars().collect(),
        pos: 0,
    };
    let expr = parser.parse_path()?;
    parser.skip_ws();
    if let Some(ch) = parser.peek() {
        return Err(parser.error(format!("unexpected '{ch}'")));
    }
    Ok(expr)
}

struct XPathParser {
    chars: Vec<char>,
    pos: usize,
}

impl XPathParser {
    fn error(&self, reason: impl Into<String>) -> EngineFailure {
        EngineFailure::Malformed(format!("xpath {} at offset {}", reason.into(), self.pos))
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn starts_with(&self, text: &str) -> bool {
        text.chars()
            .enumerate()
            .all(|(offset, ch)| self.chars.get(self.pos + offset) == Some(&ch))
    }

    fn eat_str(&mut self, text: &str) -> bool {
        if self.starts_with(text) {
            self.pos += text.chars().count();
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn parse_path(&mut self) -> Result<XPathExpr, EngineFailure> {
        self.skip_ws();
        let mut group = None;
        let mut steps = Vec::new();
        if self.eat_str("(") {
            let inner = self.parse_path()?;
            self.skip_ws();
            if !self.eat_str(")") {
                return Err(self.error("expected ')'"));
            }
            let predicates = self.parse_predicates()?;
            group = Some(Box::new(Group { inner, predicates }));
        } else if self.starts_with("/") {
            steps.push(Step {
                deep: false,
                axis: Axis::SelfNode,
                test: NodeTest::AnyNode,
                predicates: Vec::new(),
            });
        } else {
            steps.push(self.parse_step(false)?);
        }
        loop {
            self.skip_ws();
            if self.eat_str("//") {
                steps.push(self.parse_step(true)?);
            } else if self.eat_str("/") {
                steps.push(self.parse_step(false)?);
            } else {
                break;
            }
        }
        Ok(XPathExpr { group, steps })
    }

    fn parse_name(&mut self) -> String {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'))
        {
            self.pos += 1;
        }
        // A trailing '.' is never part of a name here.
        while self.pos > start && self.chars[self.pos - 1] == '.' {
            self.pos -= 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn parse_step(&mut self, deep: bool) -> Result<Step, EngineFailure> {
        self.skip_ws();
        if self.eat_str("..") {
            return Ok(Step {
                deep,
                axis: Axis::Parent,
                test: NodeTest::AnyNode,
                predicates: Vec::new(),
            });
        }
        if self.peek() == Some('.') {
            self.pos += 1;
            return Ok(Step {
                deep,
                axis: Axis::SelfNode,
                test: NodeTest::AnyNode,
                predicates: Vec::new(),
            });
        }

        let mut axis = Axis::Child;
        let checkpoint = self.pos;
        let name = self.parse_name();
        if !name.is_empty() && self.eat_str("::") {
            axis = Axis::from_name(&name).ok_or_else(|| self.error(format!("unsupported axis {name}")))?;
        } else {
            self.pos = checkpoint;
        }

        let test = if self.eat_str("*") {
            NodeTest::AnyElement
        } else if self.eat_str("node()") {
            NodeTest::AnyNode
        } else {
            let name = self.parse_name();
            if name.is_empty() {
                return Err(self.error("expected node test"));
            }
            if self.peek() == Some('(') {
                return Err(self.error(format!("unsupported node test {name}()")));
            }
            NodeTest::Name(name.to_ascii_lowercase())
        };

        let predicates = self.parse_predicates()?;
        Ok(Step {
            deep,
            axis,
            test,
            predicates,
        })
    }

    fn parse_predicates(&mut self) -> Result<Vec<Expr>, EngineFailure> {
        let mut predicates = Vec::new();
        loop {
            self.skip_ws();
            if !self.eat_str("[") {
                return Ok(predicates);
            }
            predicates.push(self.parse_or()?);
            self.skip_ws();
            if !self.eat_str("]") {
                return Err(self.error("expected ']'"));
            }
        }
    }

    fn keyword(&mut self, word: &str) -> bool {
        self.skip_ws();
        let after = self.chars.get(self.pos + word.len()).copied();
        if self.starts_with(word) && !after.is_some_and(|c| c.is_alphanumeric() || c == '-') {
            self.pos += word.len();
            true
        } else {
            false
        }
    }

    fn parse_or(&mut self) -> Result<Expr, EngineFailure> {
        let mut left = self.parse_and()?;
        while self.keyword("or") {
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, EngineFailure> {
        let mut left = self.parse_cmp()?;
        while self.keyword("and") {
            let right = self.parse_cmp()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_cmp(&mut self) -> Result<Expr, EngineFailure> {
        let mut left = self.parse_primary()?;
        loop {
            self.skip_ws();
            let op = if self.eat_str("!=") {
                CmpOp::Ne
            } else if self.eat_str("<=") {
                CmpOp::Le
            } else if self.eat_str(">=") {
                CmpOp::Ge
            } else if self.eat_str("=") {
                CmpOp::Eq
            } else if self.eat_str("<") {
                CmpOp::Lt
            } else if self.eat_str(">") {
                CmpOp::Gt
            } else {
                break;
            };
            let right = self.parse_primary()?;
            left = Expr::Cmp(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn parse_primary(&mut self) -> Result<Expr, EngineFailure> {
        self.skip_ws();
        match self.peek() {
            Some('(') => {
                self.pos += 1;
                let inner = self.parse_or()?;
                self.skip_ws();
                if !self.eat_str(")") {
                    return Err(self.error("expected ')'"));
                }
                Ok(inner)
            }
            Some(quote @ ('"' | '\'')) => {
                self.pos += 1;
                let start = self.pos;
                while self.peek().is_some_and(|c| c != quote) {
                    self.pos += 1;
                }
                if self.peek().is_none() {
                    return Err(self.error("unterminated string literal"));
                }
                let literal: String = self.chars[start..self.pos].iter().collect();
                self.pos += 1;
                Ok(Expr::Literal(literal))
            }
            Some(c) if c.is_ascii_digit() || c == '-' => {
                let start = self.pos;
                self.pos += 1;
                while self.peek().is_some_and(|c| c.is_ascii_digit() || c == '.') {
                    self.pos += 1;
                }
                let raw: String = self.chars[start..self.pos].iter().collect();
                raw.parse()
                    .map(Expr::Number)
                    .map_err(|_| self.error(format!("invalid number {raw}")))
            }
            Some('@') => {
                self.pos += 1;
                let name = self.parse_name();
                if name.is_empty() {
                    return Err(self.error("expected attribute name"));
                }
                Ok(Expr::Attr(name.to_ascii_lowercase()))
            }
            Some('.') => {
                self.pos += 1;
                Ok(Expr::ContextNode)
            }
            Some(_) => {
                let name = self.parse_name();
                if name.is_empty() {
                    return Err(self.error("expected expression"));
                }
                self.skip_ws();
                if !self.eat_str("(") {
                    return Ok(Expr::ChildNamed(name.to_ascii_lowercase()));
                }
                let mut args = Vec::new();
                self.skip_ws();
                if !self.eat_str(")") {
                    loop {
                        args.push(self.parse_or()?);
                        self.skip_ws();
                        if self.eat_str(",") {
                            continue;
                        }
                        if self.eat_str(")") {
                            break;
                        }
                        return Err(self.error("expected ',' or ')'"));
                    }
                }
                if name == "text" {
                    return Ok(Expr::Text);
                }
                const FUNCTIONS: &[&str] = &[
                    "contains",
                    "starts-with",
                    "normalize-space",
                    "string",
                    "string-length",
                    "not",
                    "last",
                    "position",
                    "true",
                    "false",
                    "count",
                ];
                if !FUNCTIONS.contains(&name.as_str()) {
                    return Err(self.error(format!("unsupported function {name}()")));
                }
                Ok(Expr::Call(name, args))
            }
            None => Err(self.error("unexpected end of expression")),
        }
    }
}

struct Evaluator<'a> {
    doc: &'a Document,
    order: HashMap<NodeId, usize>,
}

impl<'a> Evaluator<'a> {
    fn new(doc: &'a Document) -> Self {
        let mut order = HashMap::new();
        let mut stack = vec![doc.root()];
        while let Some(node) = stack.pop() {
            order.insert(node, order.len());
            stack.extend(doc.children(node).iter().rev().copied());
        }
        Self { doc, order }
    }

    fn axis_nodes(&self, node: NodeId, axis: Axis) -> Vec<NodeId> {
        let doc = self.doc;
        match axis {
            Axis::Child => doc.children(node).to_vec(),
            Axis::Descendant => self.all_descendants(node),
            Axis::DescendantOrSelf => {
                let mut out = vec![node];
                out.extend(self.all_descendants(node));
                out
            }
            Axis::Parent => doc.parent(node).into_iter().collect(),
            Axis::Ancestor => doc.ancestors(node).collect(),
            Axis::AncestorOrSelf => std::iter::once(node).chain(doc.ancestors(node)).collect(),
            Axis::SelfNode => vec![node],
            Axis::FollowingSibling => match doc.parent(node) {
                Some(parent) => {
                    let siblings = doc.children(parent);
                    let index = siblings.iter().position(|n| *n == node).unwrap_or(siblings.len());
                    siblings.get(index + 1..).map(<[NodeId]>::to_vec).unwrap_or_default()
                }
                None => Vec::new(),
            },
            Axis::PrecedingSibling => match doc.parent(node) {
                Some(parent) => {
                    let siblings = doc.children(parent);
                    let index = siblings.iter().position(|n| *n == node).unwrap_or(0);
                    siblings[..index].iter().rev().copied().collect()
                }
                None => Vec::new(),
            },
        }
    }

    fn all_descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.doc.children(node).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.doc.children(current).iter().rev().copied());
        }
        out
    }

    fn passes_test(&self, node: NodeId, test: &NodeTest) -> bool {
        match test {
            NodeTest::AnyNode => true,
            NodeTest::AnyElement => self.doc.is_element(node),
            NodeTest::Name(name) => self.doc.tag_name(node) == Some(name.as_str()),
        }
    }

    fn evaluate(&self, root: NodeId, expr: &XPathExpr) -> Vec<NodeId> {
        let mut context = match &expr.group {
            Some(group) => {
                let mut nodes = self.evaluate(root, &group.inner);
                for predicate in &group.predicates {
                    let size = nodes.len();
                    nodes = nodes
                        .into_iter()
                        .enumerate()
                        .filter(|(index, node)| self.predicate_holds(*node, predicate, index + 1, size))
                        .map(|(_, node)| node)
                        .collect();
                }
                nodes
            }
            None => vec![root],
        };
        for step in &expr.steps {
            let sources: Vec<NodeId> = if step.deep {
                let mut expanded = Vec::new();
                let mut seen = HashSet::new();
                for node in &context {
                    for candidate in std::iter::once(*node).chain(self.all_descendants(*node)) {
                        if seen.insert(candidate) {
                            expanded.push(candidate);
                        }
                    }
                }
                expanded
            } else {
                context.clone()
            };

            let mut seen = HashSet::new();
            let mut next = Vec::new();
            for source in sources {
                let mut candidates: Vec<NodeId> = self
                    .axis_nodes(source, step.axis)
                    .into_iter()
                    .filter(|node| self.passes_test(*node, &step.test))
                    .collect();
                for predicate in &step.predicates {
                    let size = candidates.len();
                    candidates = candidates
                        .into_iter()
                        .enumerate()
                        .filter(|(index, node)| self.predicate_holds(*node, predicate, index + 1, size))
                        .map(|(_, node)| node)
                        .collect();
                }
                for node in candidates {
                    if seen.insert(node) {
                        next.push(node);
                    }
                }
            }
            next.sort_by_key(|node| self.order.get(node).copied().unwrap_or(usize::MAX));
            context = next;
        }
        context
            .into_iter()
            .filter(|node| self.doc.is_element(*node))
            .collect()
    }

    fn predicate_holds(&self, node: NodeId, predicate: &Expr, position: usize, size: usize) -> bool {
        match self.eval_expr(node, predicate, position, size) {
            Value::Num(n) => (n - position as f64).abs() < f64::EPSILON,
            other => other.to_bool(),
        }
    }

    fn immediate_text(&self, node: NodeId) -> Vec<String> {
        self.doc
            .children(node)
            .iter()
            .filter_map(|child| match self.doc.kind(*child) {
                Some(NodeKind::Text(text)) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    fn eval_expr(&self, node: NodeId, expr: &Expr, position: usize, size: usize) -> Value {
        let doc = self.doc;
        match expr {
            Expr::Or(a, b) => Value::Bool(
                self.eval_expr(node, a, position, size).to_bool()
                    || self.eval_expr(node, b, position, size).to_bool(),
            ),
            Expr::And(a, b) => Value::Bool(
                self.eval_expr(node, a, position, size).to_bool()
                    && self.eval_expr(node, b, position, size).to_bool(),
            ),
            Expr::Cmp(a, op, b) => {
                let left = self.eval_expr(node, a, position, size);
                let right = self.eval_expr(node, b, position, size);
                Value::Bool(compare(&left, *op, &right))
            }
            Expr::Number(n) => Value::Num(*n),
            Expr::Literal(s) => Value::Str(s.clone()),
            Expr::Attr(name) => Value::Nodes(doc.attr(node, name).map(str::to_string).into_iter().collect()),
            Expr::Text => Value::Nodes(self.immediate_text(node)),
            Expr::ContextNode => Value::Nodes(vec![doc.text_content(node)]),
            Expr::ChildNamed(name) => Value::Nodes(
                doc.element_children(node)
                    .filter(|child| doc.tag_name(*child) == Some(name.as_str()))
                    .map(|child| doc.text_content(child))
                    .collect(),
            ),
            Expr::Call(name, args) => {
                let arg = |index: usize| -> Value {
                    match args.get(index) {
                        Some(expr) => self.eval_expr(node, expr, position, size),
                        None => Value::Nodes(vec![doc.text_content(node)]),
                    }
                };
                match name.as_str() {
                    "contains" => Value::Bool(arg(0).to_string_value().contains(&arg(1).to_string_value())),
                    "starts-with" => {
                        Value::Bool(arg(0).to_string_value().starts_with(&arg(1).to_string_value()))
                    }
                    "normalize-space" => Value::Str(
                        arg(0)
                            .to_string_value()
                            .split_whitespace()
                            .collect::<Vec<_>>()
                            .join(" "),
                    ),
                    "string" => Value::Str(arg(0).to_string_value()),
                    "string-length" => Value::Num(arg(0).to_string_value().chars().count() as f64),
                    "not" => Value::Bool(!arg(0).to_bool()),
                    "last" => Value::Num(size as f64),
                    "position" => Value::Num(position as f64),
                    "true" => Value::Bool(true),
                    "false" => Value::Bool(false),
                    "count" => match arg(0) {
                        Value::Nodes(nodes) => Value::Num(nodes.len() as f64),
                        _ => Value::Num(f64::NAN),
                    },
                    _ => Value::Bool(false),
                }
            }
        }
    }
}

fn compare(left: &Value, op: CmpOp, right: &Value) -> bool {
    match (left, right) {
        (Value::Nodes(nodes), other) => nodes
            .iter()
            .any(|s| compare(&Value::Str(s.clone()), op, other)),
        (other, Value::Nodes(nodes)) => nodes
            .iter()
            .any(|s| compare(other, op, &Value::Str(s.clone()))),
        _ => match op {
            CmpOp::Eq | CmpOp::Ne => {
                let equal = match (left, right) {
                    (Value::Bool(_), _) | (_, Value::Bool(_)) => left.to_bool() == right.to_bool(),
                    (Value::Num(_), _) | (_, Value::Num(_)) => left.to_number() == right.to_number(),
                    _ => left.to_string_value() == right.to_string_value(),
                };
                (op == CmpOp::Eq) == equal
            }
            CmpOp::Lt => left.to_number() < right.to_number(),
            CmpOp::Le => left.to_number() <= right.to_number(),
            CmpOp::Gt => left.to_number() > right.to_number(),
            CmpOp::Ge => left.to_number() >= right.to_number(),
        },
    }
}

/// Elements selected by the expression relative to `root`.
pub fn query_all(doc: &Document, root: NodeId, expr: &XPathExpr) -> Vec<NodeId> {
    Evaluator::new(doc).evaluate(root, expr)
}
