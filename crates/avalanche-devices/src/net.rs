//! Host network backend seam.
//!
//! Intentionally minimal: the MAC only needs a way to hand finished Ethernet
//! frames to the outside world. Incoming frames are pushed by the host into
//! the MAC's receive path, gated by its `can_receive` state.

pub trait NetworkBackend {
    fn transmit(&mut self, frame: &[u8]);
}
