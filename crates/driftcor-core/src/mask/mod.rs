pub mod components;
pub mod morphology;
