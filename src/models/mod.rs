//! Value types cached by the demo runner and tests.

pub mod data_object;

pub use data_object::DataObject;
