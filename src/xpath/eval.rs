//! XPath Evaluation Engine
//!
//! Evaluates compiled XPath expressions against any `DocumentAccess`
//! document. Prefixes in name tests resolve through a caller-supplied list
//! of `(prefix, uri)` bindings; `xml` is always bound.

use super::axes::{matches_node_test, navigate};
use super::compiler::{CompiledExpr, CompiledStep, Op};
use super::functions;
use super::parser::BinaryOp;
use super::value::XPathValue;
use crate::dom::namespace::ns;
use crate::dom::{node_string_value, DocumentAccess, NodeId};
use crate::error::QueryError;

/// Evaluation context - generic over document type
pub struct EvalContext<'a, D: DocumentAccess> {
    pub doc: &'a D,
    pub bindings: &'a [(String, String)],
    pub context_node: NodeId,
    pub context_position: usize,
    pub context_size: usize,
}

impl<'a, D: DocumentAccess> EvalContext<'a, D> {
    /// Context positioned on the document node
    pub fn new(doc: &'a D, bindings: &'a [(String, String)]) -> Self {
        EvalContext {
            doc,
            bindings,
            context_node: doc.document_node_id(),
            context_position: 1,
            context_size: 1,
        }
    }

    fn at(&self, node: NodeId, position: usize, size: usize) -> Self {
        EvalContext {
            doc: self.doc,
            bindings: self.bindings,
            context_node: node,
            context_position: position,
            context_size: size,
        }
    }

    fn resolve(&self, prefix: &str) -> Option<String> {
        lookup_prefix(self.bindings, prefix).map(str::to_string)
    }
}

/// URI bound to `prefix`, with `xml` predefined
pub fn lookup_prefix<'b>(bindings: &'b [(String, String)], prefix: &str) -> Option<&'b str> {
    if prefix == "xml" {
        return Some(ns::XML);
    }
    bindings
        .iter()
        .find(|(p, _)| p == prefix)
        .map(|(_, uri)| uri.as_str())
}

/// Fail on the first prefix the bindings do not define
pub fn check_prefixes(expr: &CompiledExpr, bindings: &[(String, String)]) -> Result<(), QueryError> {
    match expr
        .prefixes()
        .into_iter()
        .find(|p| lookup_prefix(bindings, p).is_none())
    {
        Some(prefix) => Err(QueryError::UnknownPrefix(prefix.to_string())),
        None => Ok(()),
    }
}

/// Compile and evaluate an expression with the document node as context
#[must_use = "XPath evaluation result should be used"]
pub fn evaluate<D: DocumentAccess>(
    doc: &D,
    xpath: &str,
    bindings: &[(String, String)],
) -> Result<XPathValue, QueryError> {
    let compiled = super::compiler::compile(xpath)?;
    check_prefixes(&compiled, bindings)?;
    evaluate_compiled(&compiled, &EvalContext::new(doc, bindings))
}

/// Evaluate a compiled expression
pub fn evaluate_compiled<D: DocumentAccess>(
    expr: &CompiledExpr,
    ctx: &EvalContext<'_, D>,
) -> Result<XPathValue, QueryError> {
    let mut stack: Vec<XPathValue> = Vec::new();

    for op in &expr.ops {
        match op {
            Op::Root => stack.push(XPathValue::single_node(ctx.doc.document_node_id())),

            Op::Context => stack.push(XPathValue::single_node(ctx.context_node)),

            Op::Step(step) => {
                let nodes = pop_nodeset(&mut stack)?;
                stack.push(XPathValue::NodeSet(apply_step(ctx, step, &nodes)?));
            }

            Op::Predicate(pred) => {
                let nodes = pop_nodeset(&mut stack)?;
                stack.push(XPathValue::NodeSet(filter(ctx, pred, nodes)?));
            }

            Op::Union => {
                let right = pop_nodeset(&mut stack)?;
                let mut result = pop_nodeset(&mut stack)?;
                result.extend(right);
                result.sort_unstable();
                result.dedup();
                stack.push(XPathValue::NodeSet(result));
            }

            Op::Number(n) => stack.push(XPathValue::Number(*n)),

            Op::String(s) => stack.push(XPathValue::String(s.clone())),

            Op::Variable(name) => {
                return Err(QueryError::Unsupported(format!("variable reference ${}", name)))
            }

            Op::Negate => {
                let val = stack.pop().unwrap_or_default();
                stack.push(XPathValue::Number(-val.number_in(ctx.doc)));
            }

            Op::Binary(op) => {
                let right = stack.pop().unwrap_or_default();
                let left = stack.pop().unwrap_or_default();
                let doc = ctx.doc;

                let result = match op {
                    BinaryOp::Or => XPathValue::Boolean(left.to_boolean() || right.to_boolean()),
                    BinaryOp::And => XPathValue::Boolean(left.to_boolean() && right.to_boolean()),
                    BinaryOp::Eq
                    | BinaryOp::NotEq
                    | BinaryOp::Lt
                    | BinaryOp::LtEq
                    | BinaryOp::Gt
                    | BinaryOp::GtEq => XPathValue::Boolean(compare(doc, &left, &right, *op)),
                    BinaryOp::Add => XPathValue::Number(left.number_in(doc) + right.number_in(doc)),
                    BinaryOp::Sub => XPathValue::Number(left.number_in(doc) - right.number_in(doc)),
                    BinaryOp::Mul => XPathValue::Number(left.number_in(doc) * right.number_in(doc)),
                    BinaryOp::Div => XPathValue::Number(left.number_in(doc) / right.number_in(doc)),
                    BinaryOp::Mod => XPathValue::Number(left.number_in(doc) % right.number_in(doc)),
                };
                stack.push(result);
            }

            Op::Call(name, arg_count) => {
                let split = stack.len().saturating_sub(*arg_count);
                let args = stack.split_off(split);
                let result = functions::call(
                    name,
                    args,
                    ctx.doc,
                    ctx.context_node,
                    ctx.context_position,
                    ctx.context_size,
                )?;
                stack.push(result);
            }
        }
    }

    Ok(stack.pop().unwrap_or_default())
}

fn pop_nodeset(stack: &mut Vec<XPathValue>) -> Result<Vec<NodeId>, QueryError> {
    stack
        .pop()
        .unwrap_or_default()
        .into_nodeset()
        .ok_or(QueryError::NotANodeSet)
}

/// Run one location step from every node of `nodes`. Predicates see the
/// candidates of a single context node, numbered in axis order.
fn apply_step<D: DocumentAccess>(
    ctx: &EvalContext<'_, D>,
    step: &CompiledStep,
    nodes: &[NodeId],
) -> Result<Vec<NodeId>, QueryError> {
    let resolve = |prefix: &str| ctx.resolve(prefix);
    let mut result = Vec::with_capacity(nodes.len());

    for &node in nodes {
        let mut candidates: Vec<NodeId> = navigate(ctx.doc, node, step.axis)
            .into_iter()
            .filter(|&c| matches_node_test(ctx.doc, c, step.axis, &step.test, &resolve))
            .collect();
        for pred in &step.predicates {
            candidates = filter(ctx, pred, candidates)?;
        }
        result.extend(candidates);
    }

    // IDs are assigned in document order
    result.sort_unstable();
    result.dedup();
    Ok(result)
}

/// Keep the nodes for which the predicate holds. A number predicate is
/// true only at that position.
fn filter<D: DocumentAccess>(
    ctx: &EvalContext<'_, D>,
    pred: &CompiledExpr,
    nodes: Vec<NodeId>,
) -> Result<Vec<NodeId>, QueryError> {
    if let Some(n) = pred.as_constant_position() {
        let picked = (n >= 1.0 && n.fract() == 0.0)
            .then(|| nodes.get(n as usize - 1).copied())
            .flatten();
        return Ok(picked.into_iter().collect());
    }

    let size = nodes.len();
    let mut kept = Vec::new();
    for (i, &node) in nodes.iter().enumerate() {
        let include = match evaluate_compiled(pred, &ctx.at(node, i + 1, size))? {
            XPathValue::Number(n) => (i + 1) as f64 == n,
            other => other.to_boolean(),
        };
        if include {
            kept.push(node);
        }
    }
    Ok(kept)
}

/// XPath 1.0 comparison, including the existential rules for node-sets
fn compare<D: DocumentAccess>(doc: &D, left: &XPathValue, right: &XPathValue, op: BinaryOp) -> bool {
    let strings = |nodes: &[NodeId]| -> Vec<XPathValue> {
        nodes
            .iter()
            .map(|&n| XPathValue::String(node_string_value(doc, n)))
            .collect()
    };

    match (left, right) {
        (XPathValue::NodeSet(l), XPathValue::NodeSet(r)) => {
            let rs = strings(r);
            strings(l)
                .iter()
                .any(|a| rs.iter().any(|b| compare_atomic(a, b, op)))
        }
        (XPathValue::NodeSet(nodes), XPathValue::Boolean(_)) => {
            compare_atomic(&XPathValue::Boolean(!nodes.is_empty()), right, op)
        }
        (XPathValue::Boolean(_), XPathValue::NodeSet(nodes)) => {
            compare_atomic(left, &XPathValue::Boolean(!nodes.is_empty()), op)
        }
        (XPathValue::NodeSet(nodes), other) => {
            strings(nodes).iter().any(|a| compare_atomic(a, other, op))
        }
        (other, XPathValue::NodeSet(nodes)) => {
            strings(nodes).iter().any(|b| compare_atomic(other, b, op))
        }
        _ => compare_atomic(left, right, op),
    }
}

fn compare_atomic(left: &XPathValue, right: &XPathValue, op: BinaryOp) -> bool {
    match op {
        BinaryOp::Eq | BinaryOp::NotEq => {
            let equal = match (left, right) {
                (XPathValue::Boolean(_), _) | (_, XPathValue::Boolean(_)) => {
                    left.to_boolean() == right.to_boolean()
                }
                (XPathValue::Number(_), _) | (_, XPathValue::Number(_)) => {
                    left.to_number() == right.to_number()
                }
                _ => left.to_string_value() == right.to_string_value(),
            };
            equal == (op == BinaryOp::Eq)
        }
        _ => {
            let (a, b) = (left.to_number(), right.to_number());
            match op {
                BinaryOp::Lt => a < b,
                BinaryOp::LtEq => a <= b,
                BinaryOp::Gt => a > b,
                BinaryOp::GtEq => a >= b,
                _ => false,
            }
        }
    }
}
