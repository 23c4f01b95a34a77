pub mod export;
pub mod hydrate;
pub mod init;
pub mod render;
pub mod serve;
