//! The AR7/Avalanche SoC peripheral complex.
//!
//! [`AvalancheSoc`] aggregates every on-chip peripheral behind the two MMIO
//! windows a MIPS guest sees, and is the single mutation point for the whole
//! fabric: MMIO dispatch, interrupt delivery, the network receive path and
//! checkpointing all funnel through it on the host emulator's main thread.

#![forbid(unsafe_code)]

pub mod io;
pub mod map;
pub mod soc;

mod snapshot;

pub use io::PortIo;
pub use soc::{AvalancheSoc, SocConfig};
