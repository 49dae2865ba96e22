pub mod local;
pub mod notion;
