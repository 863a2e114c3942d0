//! Test suites for the gateway daemons.

mod dispatch_behaviour;
mod support;
