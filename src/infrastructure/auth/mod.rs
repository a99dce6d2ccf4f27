mod discord;

pub use discord::*;
