//! XPath 1.0 Engine
//!
//! Full XPath 1.0 implementation with:
//! - All 13 axes, attribute and namespace nodes included
//! - The core function library
//! - Prefix resolution through caller-supplied bindings
//! - Compiled expression caching

pub mod axes;
pub mod compiler;
pub mod engine;
pub mod eval;
pub mod functions;
pub mod lexer;
pub mod parser;
pub mod value;

pub use engine::QueryEngine;
pub use eval::evaluate;
pub use value::XPathValue;
