mod workspace;

pub use workspace::{Client, Error, LocalWorkspace, PAGE_SIZE};
