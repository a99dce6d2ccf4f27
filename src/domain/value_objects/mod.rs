mod buffs;
mod job;
mod profile;

pub use buffs::*;
pub use job::*;
pub use profile::*;
