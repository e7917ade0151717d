//! # careins-cli: Care Insurance Back Office Command-Line Interface
//!
//! Provides the `careins` command for operating caregiving rounds from a
//! terminal, without the API stack.
//!
//! ## Subcommands
//!
//! - `careins round ...`: round lifecycle through the round service, with
//!   rounds stored one JSON record per file.
//! - `careins table`: the progressing-status transition table.
//!
//! ```bash
//! careins round open
//! careins round assign --id round:<uuid> --name Kim --sex female --phone 01012345678
//! careins round start --id round:<uuid> --at 2026-03-01T09:00:00Z
//! careins round complete --id round:<uuid> --at 2026-03-10T18:00:00Z --reason FINISHED
//! ```
//!
//! Handlers return the process exit code; they never hold business rules
//! of their own.

pub mod config;
pub mod round;
pub mod store;
pub mod table;
