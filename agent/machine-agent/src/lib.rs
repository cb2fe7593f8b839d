/*!

The `machine-agent` library allows you to write machine drivers for a cluster-machine-lifecycle
controller. You do this by implementing the [`Driver`] trait, then handing it to an [`Agent`]
object, which you then package as a binary that the controller invokes once per operation.

!*/

mod agent;
mod bootstrap;
pub mod clients;
pub mod error;
pub mod provider;

pub use agent::{Agent, Types};
pub use bootstrap::{BootstrapData, BootstrapError};
pub use machine_model::{Configuration, MachineAction};
