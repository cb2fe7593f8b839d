/*!

`agent-common` holds the pieces that every driver binary needs regardless of its provider, such as
reading the secrets that are mounted into the driver's container.

!*/

pub mod secrets;
