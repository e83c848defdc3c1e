pub mod cloud;
pub mod compression;
