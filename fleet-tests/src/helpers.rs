pub mod component_builder;
pub mod processes;
pub mod supervisor_harness;
pub mod wait_utils;
