//! Internal implementation details.

pub(crate) mod circular;
pub(crate) mod wait_graph;

pub(crate) use circular::ResolutionFrame;
pub(crate) use wait_graph::WaitGraph;
