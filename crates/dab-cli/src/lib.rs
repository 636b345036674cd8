//! # dab-cli
//!
//! Operator tooling for the DA bridge:
//!
//! - `dab migrate` copies historical validium batches from a DAC node into
//!   the fallback store ([`migrate`]).
//! - `dab inspect` decodes DA message envelopes and sequencing calldata
//!   ([`inspect`]).

pub mod dac;
pub mod inspect;
pub mod l1;
pub mod migrate;
pub mod turbo;
