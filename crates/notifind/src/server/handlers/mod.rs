pub mod status;
pub mod tools;
