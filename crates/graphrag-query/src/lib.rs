//! Schema-aware NL-to-Cypher translation ([`translate`]), structural
//! validation ([`validate`]), and the cross-cutting guards ([`guards`]) that
//! every tool call passes through before reaching the store (spec §4.7,
//! §4.8, §4.10).

pub mod guards;
pub mod templates;
pub mod translate;
pub mod validate;

pub use translate::{Translator, DETERMINISTIC_TOOLS};
pub use validate::{validate as validate_query, ValidationResult};
