pub mod email;
pub mod paper;
