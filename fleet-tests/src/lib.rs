//! Test utilities for the fleet workspace
//!
//! Builders for component directories, an in-process supervisor harness
//! and helpers for waiting on processes and sockets.

pub mod helpers;

pub use helpers::component_builder::{TestComponent, TestComponentBuilder};
pub use helpers::processes::Sleeper;
pub use helpers::supervisor_harness::TestSupervisorHarness;
pub use helpers::wait_utils::{WaitError, wait_for_exit, wait_for_socket};
