use crate::{DeviceBuffer, Result, SyncErr};

/// One buffer of the ring: a device mirror of the flat table and the host values the server
/// held the last time this slot was exchanged.
#[derive(Debug)]
pub struct Slot<B> {
    pub mirror: B,
    pub baseline: Vec<f32>,
}

impl<B: DeviceBuffer> Slot<B> {
    /// Allocates a slot holding `values` in both the mirror and the baseline.
    pub fn seeded(values: &[f32]) -> Result<Self> {
        let mut mirror = B::alloc(values.len())?;
        mirror.copy_from_host(0, values)?;

        Ok(Self {
            mirror,
            baseline: values.to_vec(),
        })
    }

    /// Allocates a copy of this slot, the mirror copied on the device.
    pub fn replicate(&self) -> Result<Self> {
        let mut mirror = B::alloc(self.mirror.len())?;
        mirror.copy_from_device(&self.mirror)?;
        mirror.synchronize()?;

        Ok(Self {
            mirror,
            baseline: self.baseline.clone(),
        })
    }
}

/// A fixed ring of slots with exactly one current slot.
///
/// A slot handed to a background exchange is taken out of the ring and must be put back
/// before it's touched again.
#[derive(Debug)]
pub struct SlotRing<B> {
    slots: Vec<Option<Slot<B>>>,
    current: usize,
}

impl<B> SlotRing<B> {
    /// Creates a new `SlotRing` whose current slot is the first one.
    pub fn new(slots: Vec<Slot<B>>) -> Self {
        Self {
            slots: slots.into_iter().map(Some).collect(),
            current: 0,
        }
    }

    pub fn current(&self) -> usize {
        self.current
    }

    /// Makes the next slot current.
    ///
    /// # Returns
    /// The index of the new current slot.
    pub fn rotate(&mut self) -> usize {
        self.current = (self.current + 1) % self.slots.len().max(1);
        self.current
    }

    pub fn get(&self, idx: usize) -> Result<&Slot<B>> {
        match self.slots.get(idx) {
            Some(Some(slot)) => Ok(slot),
            Some(None) => Err(in_flight("read slot")),
            None => Err(out_of_range(idx, self.slots.len())),
        }
    }

    /// Takes the slot out of the ring.
    pub fn take(&mut self, idx: usize) -> Result<Slot<B>> {
        let len = self.slots.len();

        match self.slots.get_mut(idx) {
            Some(entry) => entry.take().ok_or(in_flight("take slot")),
            None => Err(out_of_range(idx, len)),
        }
    }

    /// Puts a slot taken with `take` back into the ring.
    pub fn put(&mut self, idx: usize, slot: Slot<B>) -> Result<()> {
        let len = self.slots.len();

        match self.slots.get_mut(idx) {
            Some(entry) if entry.is_none() => {
                *entry = Some(slot);
                Ok(())
            }
            Some(_) => Err(SyncErr::State {
                op: "put slot",
                state: "the slot is occupied",
            }),
            None => Err(out_of_range(idx, len)),
        }
    }

    /// Whether every slot is back in the ring.
    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }
}

fn in_flight(op: &'static str) -> SyncErr {
    SyncErr::State {
        op,
        state: "the slot is being exchanged",
    }
}

fn out_of_range(idx: usize, len: usize) -> SyncErr {
    SyncErr::SizeMismatch {
        what: "slot index",
        got: idx,
        expected: len,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HostBuffer;

    fn ring(slots: usize) -> SlotRing<HostBuffer> {
        let slots = (0..slots)
            .map(|i| Slot::seeded(&[i as f32]).unwrap())
            .collect();

        SlotRing::new(slots)
    }

    #[test]
    fn rotation_wraps_around() {
        let mut ring = ring(2);

        assert_eq!(ring.current(), 0);
        assert_eq!(ring.rotate(), 1);
        assert_eq!(ring.rotate(), 0);
    }

    #[test]
    fn single_slot_ring_stays_put() {
        let mut ring = ring(1);
        assert_eq!(ring.rotate(), 0);
    }

    #[test]
    fn taken_slots_are_unreachable_until_put_back() {
        let mut ring = ring(2);

        let slot = ring.take(1).unwrap();
        assert!(!ring.is_complete());
        assert!(ring.get(1).is_err());
        assert!(ring.take(1).is_err());

        ring.put(1, slot).unwrap();
        assert!(ring.is_complete());
        assert_eq!(ring.get(1).unwrap().baseline, [1.]);
    }

    #[test]
    fn replicas_hold_the_same_values() {
        let slot = Slot::<HostBuffer>::seeded(&[1., 2., 3.]).unwrap();
        let copy = slot.replicate().unwrap();

        assert_eq!(copy.mirror.as_slice(), [1., 2., 3.]);
        assert_eq!(copy.baseline, slot.baseline);
    }

    #[test]
    fn out_of_range_indices_are_rejected() {
        let mut ring = ring(2);

        assert!(matches!(
            ring.get(2),
            Err(SyncErr::SizeMismatch { got: 2, .. })
        ));
        assert!(ring.take(5).is_err());
    }

    #[test]
    fn occupied_slots_cannot_be_overwritten() {
        let mut ring = ring(1);
        let extra = Slot::seeded(&[9.]).unwrap();

        assert!(ring.put(0, extra).is_err());
    }
}
