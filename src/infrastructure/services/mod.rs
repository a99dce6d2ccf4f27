mod broadcaster;
pub mod reaper;
mod session_manager;

pub use broadcaster::*;
pub use session_manager::*;
