pub mod common;
pub mod config;
pub mod estimate;
pub mod info;
pub mod run;
pub mod shift;
