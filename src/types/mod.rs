pub mod commit;
pub mod message;
pub mod section;
