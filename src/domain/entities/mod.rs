mod member;
mod party;

pub use member::*;
pub use party::*;
