//! Flood relay over the datagram transport.
//!
//! Nodes keep no topology. A command addressed to another node is wrapped
//! in a [`MeshEnvelope`](envelope::MeshEnvelope) carrying a hop budget; every
//! node that hears it either executes it (address match), re-emits it with
//! the budget decremented, or drops it once the budget is spent. Duplicate
//! delivery over multiple paths is tolerated.

pub mod envelope;
pub mod router;
