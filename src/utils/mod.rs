pub mod data;
pub mod odds;
pub mod plays;
