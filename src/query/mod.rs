pub mod bucket;
pub mod filter;
pub mod sort;
