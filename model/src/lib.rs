/*!

This library provides the plain data types shared by the machine driver framework and its
provider implementations.

!*/

#![deny(
    clippy::expect_used,
    clippy::get_unwrap,
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::panicking_unwrap,
    clippy::unwrap_in_result,
    clippy::unwrap_used
)]

pub use action::MachineAction;
pub use configuration::Configuration;
pub use error::{Error, Result};
pub use secret::SecretName;

mod action;
mod configuration;
pub mod constants;
mod error;
mod secret;
