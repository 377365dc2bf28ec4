//! XPath Expression Compiler
//!
//! Flattens the parsed AST into a postfix op list for the stack evaluator.

use super::parser::{Axis, BinaryOp, Expr, NodeTest, Step};
use crate::error::QueryError;

/// Compiled XPath expression
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledExpr {
    pub ops: Vec<Op>,
}

/// Compiled operation
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    /// Push the document node
    Root,
    /// Push the context node
    Context,
    /// Replace the node-set on top of the stack with the step result.
    /// Predicates are applied per context node with axis positions.
    Step(CompiledStep),
    /// Filter the node-set on top of the stack, positions in document order
    Predicate(Box<CompiledExpr>),
    Union,
    Number(f64),
    String(String),
    /// Function name and argument count
    Call(String, usize),
    Binary(BinaryOp),
    Negate,
    Variable(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledStep {
    pub axis: Axis,
    pub test: NodeTest,
    pub predicates: Vec<CompiledExpr>,
}

impl CompiledExpr {
    pub fn compile(expr: &Expr) -> Self {
        let mut ops = Vec::new();
        Self::compile_expr(expr, &mut ops);
        CompiledExpr { ops }
    }

    fn compile_expr(expr: &Expr, ops: &mut Vec<Op>) {
        match expr {
            Expr::Root => ops.push(Op::Root),
            Expr::Number(n) => ops.push(Op::Number(*n)),
            Expr::String(s) => ops.push(Op::String(s.clone())),
            Expr::Variable(name) => ops.push(Op::Variable(name.clone())),
            Expr::Negate(inner) => {
                Self::compile_expr(inner, ops);
                ops.push(Op::Negate);
            }
            Expr::Binary(left, op, right) => {
                Self::compile_expr(left, ops);
                Self::compile_expr(right, ops);
                ops.push(Op::Binary(*op));
            }
            Expr::Union(left, right) => {
                Self::compile_expr(left, ops);
                Self::compile_expr(right, ops);
                ops.push(Op::Union);
            }
            Expr::Path(base, step) => {
                Self::compile_expr(base, ops);
                ops.push(Op::Step(Self::compile_step(step)));
            }
            Expr::Filter(base, pred) => {
                Self::compile_expr(base, ops);
                ops.push(Op::Predicate(Box::new(CompiledExpr::compile(pred))));
            }
            Expr::Step(step) => {
                ops.push(Op::Context);
                ops.push(Op::Step(Self::compile_step(step)));
            }
            Expr::Function(name, args) => {
                for arg in args {
                    Self::compile_expr(arg, ops);
                }
                ops.push(Op::Call(name.clone(), args.len()));
            }
        }
    }

    fn compile_step(step: &Step) -> CompiledStep {
        CompiledStep {
            axis: step.axis,
            test: step.node_test.clone(),
            predicates: step.predicates.iter().map(CompiledExpr::compile).collect(),
        }
    }

    /// Namespace prefixes used by name tests anywhere in the expression,
    /// in order of first appearance
    pub fn prefixes(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_prefixes(&mut out);
        out
    }

    fn collect_prefixes<'a>(&'a self, out: &mut Vec<&'a str>) {
        for op in &self.ops {
            match op {
                Op::Step(step) => {
                    match &step.test {
                        NodeTest::QName(prefix, _) | NodeTest::NamespaceWildcard(prefix) => {
                            if !out.contains(&prefix.as_str()) {
                                out.push(prefix);
                            }
                        }
                        _ => {}
                    }
                    for pred in &step.predicates {
                        pred.collect_prefixes(out);
                    }
                }
                Op::Predicate(pred) => pred.collect_prefixes(out),
                _ => {}
            }
        }
    }

    /// The expression is a single number, as in `[3]`
    pub fn as_constant_position(&self) -> Option<f64> {
        match self.ops.as_slice() {
            [Op::Number(n)] => Some(*n),
            _ => None,
        }
    }
}

/// Compile an XPath expression string
pub fn compile(xpath: &str) -> Result<CompiledExpr, QueryError> {
    let expr = super::parser::parse(xpath)?;
    Ok(CompiledExpr::compile(&expr))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_simple() {
        let compiled = compile("/root").unwrap();
        assert_eq!(compiled.ops[0], Op::Root);
        assert!(matches!(&compiled.ops[1], Op::Step(s) if s.axis == Axis::Child));
    }

    #[test]
    fn test_relative_step_starts_from_context() {
        let compiled = compile("item").unwrap();
        assert_eq!(compiled.ops[0], Op::Context);
    }

    #[test]
    fn test_step_keeps_its_predicates() {
        let compiled = compile("//item[1][@a]").unwrap();
        match compiled.ops.last() {
            Some(Op::Step(step)) => {
                assert_eq!(step.predicates.len(), 2);
                assert_eq!(step.predicates[0].as_constant_position(), Some(1.0));
                assert_eq!(step.predicates[1].as_constant_position(), None);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_prefixes_collected_from_predicates() {
        let compiled = compile("/p:a[q:b/p:c]/r:*").unwrap();
        assert_eq!(compiled.prefixes(), vec!["p", "q", "r"]);
    }

    #[test]
    fn test_syntax_error_propagates() {
        assert!(matches!(compile("/a["), Err(QueryError::Syntax(_))));
    }
}
