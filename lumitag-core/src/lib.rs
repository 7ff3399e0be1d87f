//! Hardware-agnostic core of the Lumitag ESL updater
//!
//! This crate contains everything between the wire format and the physical
//! IR driver:
//!
//! - Hardware abstraction traits (frame transmitter, precision clock,
//!   cooperative yield)
//! - The multi-frame image update pipeline with retry and backoff
//! - Single-frame command dispatch
//!
//! Concrete signal generation lives in `lumitag-drivers`.

#![no_std]
#![deny(unsafe_code)]

pub mod pipeline;
pub mod traits;
