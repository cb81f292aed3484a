pub mod core;
pub mod gate;
pub mod roster;
pub mod session;
pub mod setup;
pub mod shell;
