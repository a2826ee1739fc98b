//! Core module containing the value model and the Flattener.
//!
//! This module provides:
//! - the value graph itself (`value`)
//! - the kind classifier (`classifier`)
//! - error types with traversal paths (`errors`, `path`)
//! - pluggable reducers/revivers (`reducers`)
//! - the Flattener that turns a graph into a flat [`flatten::Table`] (`flatten`)

pub mod classifier;
pub mod errors;
pub mod flatten;
pub mod path;
pub mod reducers;
pub mod value;
