//! Domain services

pub mod block_parser;
pub mod file_naming;

pub use block_parser::{parse_block, parse_records, split_blocks};
pub use file_naming::sheet_file_name;
