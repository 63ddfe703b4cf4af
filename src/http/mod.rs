pub mod ext_proc;
pub mod healthz;

pub use ext_proc::{HttpBody, StreamProcessor};
