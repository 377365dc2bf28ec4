//! Core XML parsing primitives
//!
//! This module contains the fundamental building blocks for XML parsing:
//! - Scanner: SIMD-accelerated delimiter detection using memchr
//! - Tokenizer: strict pull tokenizer that keeps source offsets
//! - Entities: reference decoding and markup escaping with Cow
//! - Attributes: attribute list parsing with per-attribute offsets

pub mod attributes;
pub mod entities;
pub mod scanner;
pub mod tokenizer;
