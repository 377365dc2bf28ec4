//! Namespace prefixes available to XPath expressions
//!
//! - `table`: the editable prefix -> URI table
//! - `discovery`: populating a table from a parsed document

pub mod discovery;
pub mod table;

pub use discovery::{discover_namespaces, DISCOVERY_QUERY};
pub use table::{NamespaceTable, XmlnsInfo};
