pub mod layout;
pub mod pdf;
