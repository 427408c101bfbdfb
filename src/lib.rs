//! A small virtual machine for programs encoded as flat sequences of
//! integers, with three addressing modes and growable memory.
//!
//! [`memory`] holds the cell store and the image loader, [`processor`] the
//! decode/execute loop, [`channel`] the per-run I/O queues, and [`scan`] a
//! driver that runs one fresh program per grid coordinate and renders the
//! resulting membership grid.

pub mod channel;
pub mod memory;
pub mod processor;
pub mod scan;
