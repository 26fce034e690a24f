//! Command line front end for `idlkit-core`.
//!
//! Provides:
//! - IDL summaries with discriminators and type sizes
//! - JSON to Borsh encoding and Borsh to JSON decoding
//! - Account sizes and `memcmp` filters
//! - PDA derivation from seed specs or IDL seed declarations
//!
//! The `idlkit` binary is a thin clap layer over these modules.

pub mod cli;
pub mod commands;
pub mod error;
pub mod hex;
pub mod parse;
pub mod pda;
