pub mod grid;
pub mod periodogram;
