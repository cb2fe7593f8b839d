/*!

This module provides the clients that the agent and the drivers use to read their inputs and
report their results.

!*/

mod agent_client;
mod error;
mod secret_client;

pub use agent_client::{
    AgentClient, AgentReport, DefaultAgentClient, ReportStatus, ReportedError,
};
pub use error::{ClientError, ClientResult};
pub use secret_client::{DefaultSecretClient, SecretClient};
