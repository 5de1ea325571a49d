pub mod auth;
pub mod events;
pub mod extract;
pub mod form;
pub mod orders;
pub mod system;
