//! Emitters — render a flattened [`crate::core::flatten::Flattened`] table
//! to one of the two output modes (§4.4, §4.5): `data` for a JSON flat
//! table, `code` for a self-evaluating expression.

pub mod code;
pub mod data;
