pub mod accumulator;
pub mod decompose;
