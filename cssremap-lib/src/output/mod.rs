pub mod assemble;
pub mod format;

pub use assemble::{build_rules, post_process, render, RenderedRule};
