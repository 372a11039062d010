pub mod import;
pub mod points;
