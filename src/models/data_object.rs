//! Data Object
//!
//! A small payload type standing in for rows fetched from a backing store.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque data record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataObject {
    pub data: String,
}

impl DataObject {
    pub fn new(data: impl Into<String>) -> Self {
        Self { data: data.into() }
    }
}

impl fmt::Display for DataObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DataObject({})", self.data)
    }
}
