pub mod aggregate;
pub mod document;
pub mod normalize;
pub mod resolve;
