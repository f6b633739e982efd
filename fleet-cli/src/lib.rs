//! Lifecycle control for fleet components.
//!
//! `stop` asks a component's supervisor what is running, runs the kind's
//! pre-stop hook (the load-balancer signals its proxy through a pid file)
//! and then has the supervisor stop everything.

pub mod component;
pub mod context;
pub mod controller;
pub mod dispatcher;
pub mod errors;
pub mod exit_codes;
pub mod hooks;
pub mod probe;

pub use component::{ComponentInstance, ComponentKind};
pub use context::StopContext;
pub use controller::{StopController, StopOutcome};
pub use dispatcher::{SignalDispatcher, SignalKind};
pub use hooks::{LoadBalancerAgentHook, PreStopHook, PreStopHooks};
pub use probe::{ComponentStatusProbe, SupervisorClient, SupervisorCommand};
