use log::LevelFilter;

pub const DEFAULT_AGENT_LEVEL_FILTER: LevelFilter = LevelFilter::Info;

/// The crates whose logs are shown at the agent's log level when `RUST_LOG` is not set.
pub const AGENT_CRATES: &[&str] = &[
    "agent_common",
    "agent_utils",
    "machine_agent",
    "machine_model",
    "vsphere_agents",
    "vsphere_types",
];
