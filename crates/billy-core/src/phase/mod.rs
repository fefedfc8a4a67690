pub mod epoch;
pub mod fold;
