pub mod media;
pub mod token;
