//! Flow graph ports

mod flow_graph_builder;

pub use flow_graph_builder::FlowGraphBuilder;
