//! Dorbo Access Controller Serial Protocol
//!
//! This crate provides the host side of the RS-232 protocol spoken by the
//! Dorbo door access controller firmware. The controller stores Wiegand-26
//! credentials (facility code + user number) in a fixed-size table and exposes
//! a small text CLI for reading and writing that table.
//!
//! # Protocol Overview
//!
//! The protocol is half-duplex and strictly request/response:
//!
//! - **Commands** (host → firmware): one line of text terminated with `\n`
//! - **Responses** (firmware → host): zero or more data lines followed by a
//!   terminator line that is exactly `ok` or `err`
//!
//! There are no command IDs, length fields or checksums. After opening the
//! port the host sends empty commands until the firmware answers `ok`, which
//! flushes any half-typed command or stale output left from an earlier session.
//!
//! # Commands
//!
//! | Command | Meaning |
//! |---|---|
//! | `l w26` | list every stored credential, one `index facility user` line each |
//! | `r w26 <index>` | read one credential |
//! | `w w26 <index> <facility> <user>` | write one credential |
//! | `x w26` | reset every credential to `0 0` |
//! | `i` | storage capacity, `w26 <count>` |
//! | `o <door>` | pulse a door strike |
//!
//! # Example
//!
//! ```no_run
//! use dorbo_protocol::{Controller, ControllerConfig, Credential};
//!
//! let config = ControllerConfig::new("/dev/ttyACM0");
//! let mut controller = Controller::open(&config)?;
//!
//! controller.set_wiegand26(7, Credential::new(44, 12312))?;
//! let credential = controller.get_wiegand26(7)?;
//! let all = controller.list_wiegand26()?;
//! # let _ = (credential, all);
//! controller.close();
//! # Ok::<(), dorbo_protocol::ControllerError>(())
//! ```

mod codec;
mod commands;
mod config;
mod controller;
mod error;
pub mod mock;
mod operations;
mod responses;
mod transport;

pub use codec::*;
pub use commands::*;
pub use config::*;
pub use controller::*;
pub use error::*;
pub use responses::*;
pub use transport::*;
