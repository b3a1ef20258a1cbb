/// winnow helpers shared by the record parsers
pub mod parser_utils;
