//! Small helpers shared across the crate.
//!
//! - [`textview`] - Zero-copy views over declaration text and the list splitters built on them

pub mod textview;

pub use textview::{argument_name, split_arguments, split_enumerators, TextView};
