//! Device models for the TI AR7 ("Avalanche") on-chip peripheral complex.
//!
//! Each peripheral is an owned register file with `mmio_read`/`mmio_write`
//! entry points taking block-relative offsets; the host side (guest memory,
//! interrupt delivery, network backend, reset requests) is reached through
//! the narrow traits in [`dma`], [`irq`], [`net`] and [`reset_ctrl`].

#![forbid(unsafe_code)]

pub mod clock;
pub mod cpmac;
pub mod dma;
pub mod intc;
pub mod irq;
pub mod mdio;
pub mod net;
pub mod regs;
pub mod reset_ctrl;
pub mod vlynq;
pub mod wdog;

pub use dma::Dma;
pub use irq::{IrqLine, NoIrq};
pub use net::NetworkBackend;
pub use regs::RegWindow;
