pub mod admin;
pub mod intake;
pub mod invitation;
pub mod registry;
pub mod timestamp;
pub mod window;
