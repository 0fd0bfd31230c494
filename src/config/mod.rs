pub mod catalog;
pub mod global;
