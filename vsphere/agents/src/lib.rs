/*!

Manages vSphere virtual machines for the machine-lifecycle controller. The
`vsphere-machine-driver` binary wraps these functions in a `machine_agent::provider::Driver`.

Machines are VMs in the folder of their machine class. They are found by inventory path or by
BIOS UUID, created by cloning a template, and tagged with custom values so that `list` can tell
which VMs belong to a machine class.

!*/

pub mod clone;
pub mod error;
pub mod find;
pub mod ignition;
pub mod lifecycle;
pub mod network;
pub mod userdata;
pub mod visit;
pub mod vmomi;
pub mod vsphere;

pub use error::{Error, Result};
