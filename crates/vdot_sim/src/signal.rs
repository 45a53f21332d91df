//! Signal storage and single-writer capability handles.
//!
//! Every signal lives in the [`SimContext`](crate::kernel::SimContext) and is
//! addressed by a flat [`SignalId`]. Creating a signal yields exactly one
//! [`Writer`] and a copyable [`Reader`]. `Writer` is neither `Clone` nor
//! `Copy`, so whoever holds it is the only party able to drive the signal.

use std::fmt;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

/// Opaque ID for a simulation signal.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub struct SignalId(u32);

impl SignalId {
    /// Creates a `SignalId` from a raw index.
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw index.
    pub fn as_raw(self) -> u32 {
        self.0
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// A Rust type that can be carried on a two-state signal.
///
/// Values are stored as raw bits (at most 64) and masked to [`WIDTH`](Self::WIDTH).
pub trait SignalType: Copy + PartialEq + fmt::Debug + 'static {
    /// Bit width of the signal.
    const WIDTH: u32;

    /// Converts the value to its bit pattern.
    fn to_bits(self) -> u64;

    /// Rebuilds the value from a bit pattern already masked to `WIDTH`.
    fn from_bits(bits: u64) -> Self;
}

impl SignalType for bool {
    const WIDTH: u32 = 1;

    fn to_bits(self) -> u64 {
        u64::from(self)
    }

    fn from_bits(bits: u64) -> Self {
        bits & 1 == 1
    }
}

impl SignalType for u32 {
    const WIDTH: u32 = 32;

    fn to_bits(self) -> u64 {
        u64::from(self)
    }

    fn from_bits(bits: u64) -> Self {
        bits as u32
    }
}

/// Returns a mask covering the low `width` bits.
pub fn width_mask(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

/// Exclusive write capability for one signal.
#[derive(Debug)]
pub struct Writer<T: SignalType> {
    id: SignalId,
    _ty: PhantomData<T>,
}

impl<T: SignalType> Writer<T> {
    pub(crate) fn new(id: SignalId) -> Self {
        Self {
            id,
            _ty: PhantomData,
        }
    }

    /// The signal this writer drives.
    pub fn id(&self) -> SignalId {
        self.id
    }

    /// Returns a read view of the same signal.
    pub fn reader(&self) -> Reader<T> {
        Reader::new(self.id)
    }
}

/// Read-only view of one signal.
#[derive(Debug)]
pub struct Reader<T: SignalType> {
    id: SignalId,
    _ty: PhantomData<T>,
}

impl<T: SignalType> Reader<T> {
    pub(crate) fn new(id: SignalId) -> Self {
        Self {
            id,
            _ty: PhantomData,
        }
    }

    /// The signal this reader observes.
    pub fn id(&self) -> SignalId {
        self.id
    }
}

// Manual impls: deriving would require `T: Clone`.
impl<T: SignalType> Clone for Reader<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: SignalType> Copy for Reader<T> {}

/// Runtime state of one signal.
#[derive(Clone, Debug)]
pub struct SignalState {
    /// Name the signal was created with.
    pub name: String,
    /// Bit width.
    pub width: u32,
    /// Current value.
    pub value: u64,
    /// Value before the most recent change (for edge detection).
    pub previous_value: u64,
}

impl SignalState {
    /// Creates a signal holding `init`, masked to `width`.
    pub fn new(name: String, width: u32, init: u64) -> Self {
        let value = init & width_mask(width);
        Self {
            name,
            width,
            value,
            previous_value: value,
        }
    }

    /// Stores `value`, returning whether the signal changed.
    pub fn apply(&mut self, value: u64) -> bool {
        let value = value & width_mask(self.width);
        if value == self.value {
            return false;
        }
        self.previous_value = self.value;
        self.value = value;
        true
    }
}

/// Edge qualifier for process sensitivity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Edge {
    /// 0 → 1 transition of bit 0.
    Posedge,
    /// 1 → 0 transition of bit 0.
    Negedge,
    /// Any value change.
    Any,
}

impl Edge {
    /// Whether a change from `prev` to `curr` satisfies this edge.
    pub fn matches(self, prev: u64, curr: u64) -> bool {
        let (p, c) = (prev & 1, curr & 1);
        match self {
            Edge::Posedge => p == 0 && c == 1,
            Edge::Negedge => p == 1 && c == 0,
            Edge::Any => prev != curr,
        }
    }
}

/// One entry of a process sensitivity list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Trigger {
    /// The watched signal.
    pub signal: SignalId,
    /// The qualifying transition.
    pub edge: Edge,
}

impl Trigger {
    /// Wakes on a rising edge of `reader`.
    pub fn posedge(reader: Reader<bool>) -> Self {
        Self {
            signal: reader.id(),
            edge: Edge::Posedge,
        }
    }

    /// Wakes on any change of `reader`.
    pub fn change<T: SignalType>(reader: Reader<T>) -> Self {
        Self {
            signal: reader.id(),
            edge: Edge::Any,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_masks() {
        assert_eq!(width_mask(1), 1);
        assert_eq!(width_mask(32), 0xFFFF_FFFF);
        assert_eq!(width_mask(64), u64::MAX);
    }

    #[test]
    fn bool_bits() {
        assert_eq!(true.to_bits(), 1);
        assert!(!bool::from_bits(0));
        assert!(bool::from_bits(1));
    }

    #[test]
    fn u32_bits_truncate() {
        assert_eq!(u32::from_bits(0x1_0000_0002), 2);
        assert_eq!(7u32.to_bits(), 7);
    }

    #[test]
    fn apply_reports_change_and_tracks_previous() {
        let mut s = SignalState::new("reset_n".into(), 1, 0);
        assert!(!s.apply(0));
        assert!(s.apply(1));
        assert_eq!(s.previous_value, 0);
        assert_eq!(s.value, 1);
    }

    #[test]
    fn apply_masks_to_width() {
        let mut s = SignalState::new("q".into(), 4, 0x1F);
        assert_eq!(s.value, 0xF);
        assert!(s.apply(0x30));
        assert_eq!(s.value, 0);
    }

    #[test]
    fn edge_matching() {
        assert!(Edge::Posedge.matches(0, 1));
        assert!(!Edge::Posedge.matches(1, 0));
        assert!(Edge::Negedge.matches(1, 0));
        assert!(Edge::Any.matches(20000, 19999));
        assert!(!Edge::Any.matches(5, 5));
    }

    #[test]
    fn reader_is_copy_and_matches_writer() {
        let w: Writer<u32> = Writer::new(SignalId::from_raw(7));
        let r = w.reader();
        let r2 = r;
        assert_eq!(r.id(), r2.id());
        assert_eq!(w.id(), r.id());
    }

    #[test]
    fn trigger_constructors() {
        let clk: Reader<bool> = Reader::new(SignalId::from_raw(0));
        assert_eq!(Trigger::posedge(clk).edge, Edge::Posedge);
        let a: Reader<u32> = Reader::new(SignalId::from_raw(3));
        let t = Trigger::change(a);
        assert_eq!(t.signal.as_raw(), 3);
        assert_eq!(t.edge, Edge::Any);
    }
}
