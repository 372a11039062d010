pub mod import;
pub mod notification;
pub mod point;
pub mod stat;
