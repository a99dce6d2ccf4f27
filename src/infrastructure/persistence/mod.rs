mod debounce;
mod snapshot;

pub use debounce::*;
pub use snapshot::*;
