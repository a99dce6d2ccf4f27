mod party_store;
mod profile_store;

pub use party_store::*;
pub use profile_store::*;
