//! Hardware driver implementations
//!
//! This crate provides the concrete IR transmission engine behind the
//! traits defined in lumitag-core:
//!
//! - Carrier/pause signal generation on a GPIO line
//! - Bounded queue for asynchronous background transmission

#![no_std]
#![deny(unsafe_code)]

pub mod ir;
