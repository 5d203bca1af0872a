//! Integration test driver for `tests/integration/` submodules.
//!
//! Each `mod` below maps to a file that exercises one path through the
//! node against mock adapters. All tests run on the host (x86_64) with no
//! real hardware or network.

mod light_node_tests;
mod lock_node_tests;
mod mock_hw;
mod router_tests;
mod service_loop_tests;
