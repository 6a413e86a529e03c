#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Target acquisition shared by every tower and by area explosions.
//!
//! Candidates come from a capsule overlap query against a [`TargetField`],
//! written into one reusable fixed-capacity buffer. Acquisition picks one of
//! the buffered hits uniformly at random, so towers sharing a crowd spread
//! their fire instead of all locking onto the nearest enemy. Tracking keeps a
//! previously acquired target while it stays valid and within range.

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tile_defence_core::{EnemyId, LayerMask, TargetField, TargetPoint};

/// Maximum number of candidates a single overlap query can report.
pub const TARGET_BUFFER_CAPACITY: usize = 100;

/// Height of the vertical capsule swept above the query origin.
pub const CAPSULE_HEIGHT: f32 = 3.0;

/// Extra tracking range granted per unit of target scale.
pub const SCALE_ALLOWANCE: f32 = 0.125;

/// Overlap buffer plus the random source used to pick among its hits.
#[derive(Debug)]
pub struct TargetAcquisition {
    buffer: Vec<TargetPoint>,
    buffered: usize,
    rng: ChaCha8Rng,
}

impl TargetAcquisition {
    /// Creates an empty acquisition buffer with a seeded random source.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            buffer: vec![TargetPoint::new(EnemyId::new(0, 0)); TARGET_BUFFER_CAPACITY],
            buffered: 0,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Refills the buffer with every enemy overlapping the capsule above
    /// `position` and reports whether anything was found.
    pub fn fill_buffer<F>(&mut self, field: &F, position: Vec3, range: f32) -> bool
    where
        F: TargetField + ?Sized,
    {
        let top = position + Vec3::Y * CAPSULE_HEIGHT;
        let count = field.overlap_capsule(position, top, range, LayerMask::ENEMY, &mut self.buffer);
        self.buffered = count.min(self.buffer.len());
        self.buffered > 0
    }

    /// Hits captured by the most recent [`TargetAcquisition::fill_buffer`] call.
    #[must_use]
    pub fn buffered(&self) -> &[TargetPoint] {
        &self.buffer[..self.buffered]
    }

    fn random_buffered(&mut self) -> Option<TargetPoint> {
        if self.buffered == 0 {
            return None;
        }
        let index = self.rng.gen_range(0..self.buffered);
        Some(self.buffer[index])
    }

    /// Queries the field around `position` and returns a random candidate.
    pub fn acquire_target<F>(&mut self, field: &F, position: Vec3, range: f32) -> Option<TargetPoint>
    where
        F: TargetField + ?Sized,
    {
        if self.fill_buffer(field, position, range) {
            self.random_buffered()
        } else {
            None
        }
    }
}

/// Keeps `target` locked while it is valid and within the effective range.
///
/// The effective range grows with the target's scale so large enemies are not
/// dropped while their silhouette still overlaps the tower's reach. Distances
/// are measured in the horizontal plane only. Clears the lock and returns
/// `false` when the check fails.
pub fn track_target<F>(
    field: &F,
    position: Vec3,
    range: f32,
    target: &mut Option<TargetPoint>,
) -> bool
where
    F: TargetField + ?Sized,
{
    let Some(locked) = *target else {
        return false;
    };

    let Some(sample) = field.resolve(locked) else {
        *target = None;
        return false;
    };

    let x = position.x - sample.position.x;
    let z = position.z - sample.position.z;
    let reach = range + SCALE_ALLOWANCE * sample.scale;
    if x * x + z * z > reach * reach {
        *target = None;
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use tile_defence_core::TargetSample;

    #[derive(Default)]
    struct FixedField {
        entries: Vec<(TargetPoint, TargetSample)>,
    }

    impl FixedField {
        fn with(mut self, slot: u32, position: Vec3, scale: f32) -> Self {
            self.entries.push((
                TargetPoint::new(EnemyId::new(slot, 0)),
                TargetSample { position, scale },
            ));
            self
        }
    }

    impl TargetField for FixedField {
        fn overlap_capsule(
            &self,
            bottom: Vec3,
            _top: Vec3,
            radius: f32,
            layers: LayerMask,
            out: &mut [TargetPoint],
        ) -> usize {
            if !layers.intersects(LayerMask::ENEMY) {
                return 0;
            }
            let mut count = 0;
            for (point, sample) in &self.entries {
                let offset = sample.position - bottom;
                let horizontal = Vec3::new(offset.x, 0.0, offset.z);
                if horizontal.length() <= radius && count < out.len() {
                    out[count] = *point;
                    count += 1;
                }
            }
            count
        }

        fn resolve(&self, target: TargetPoint) -> Option<TargetSample> {
            self.entries
                .iter()
                .find(|(point, _)| *point == target)
                .map(|(_, sample)| *sample)
        }
    }

    #[test]
    fn empty_field_yields_no_target() {
        let mut acquisition = TargetAcquisition::new(1);
        let field = FixedField::default();

        assert!(acquisition
            .acquire_target(&field, Vec3::ZERO, 5.0)
            .is_none());
        assert!(acquisition.buffered().is_empty());
    }

    #[test]
    fn acquisition_only_returns_buffered_hits() {
        let mut acquisition = TargetAcquisition::new(2);
        let field = FixedField::default()
            .with(1, Vec3::new(1.0, 0.0, 0.0), 1.0)
            .with(2, Vec3::new(0.0, 0.0, 1.0), 1.0)
            .with(3, Vec3::new(9.0, 0.0, 0.0), 1.0);

        for _ in 0..32 {
            let target = acquisition
                .acquire_target(&field, Vec3::ZERO, 2.0)
                .expect("targets within range");
            assert_ne!(target.enemy().slot(), 3, "far enemy must never be picked");
        }
        assert_eq!(acquisition.buffered().len(), 2);
    }

    #[test]
    fn acquisition_spreads_over_candidates() {
        let mut acquisition = TargetAcquisition::new(3);
        let field = FixedField::default()
            .with(1, Vec3::new(0.5, 0.0, 0.0), 1.0)
            .with(2, Vec3::new(-0.5, 0.0, 0.0), 1.0);

        let mut seen = [false; 2];
        for _ in 0..64 {
            let target = acquisition
                .acquire_target(&field, Vec3::ZERO, 1.0)
                .expect("targets within range");
            seen[target.enemy().slot() as usize - 1] = true;
        }
        assert!(seen.iter().all(|flag| *flag), "random pick should reach every hit");
    }

    #[test]
    fn buffer_never_exceeds_capacity() {
        let mut acquisition = TargetAcquisition::new(4);
        let mut field = FixedField::default();
        for slot in 0..(TARGET_BUFFER_CAPACITY as u32 + 20) {
            field = field.with(slot, Vec3::ZERO, 1.0);
        }

        assert!(acquisition.fill_buffer(&field, Vec3::ZERO, 1.0));
        assert_eq!(acquisition.buffered().len(), TARGET_BUFFER_CAPACITY);
    }

    #[test]
    fn tracking_ignores_vertical_offset() {
        let field = FixedField::default().with(1, Vec3::new(1.0, 50.0, 0.0), 1.0);
        let mut target = Some(TargetPoint::new(EnemyId::new(1, 0)));

        assert!(track_target(&field, Vec3::ZERO, 1.0, &mut target));
        assert!(target.is_some());
    }

    #[test]
    fn tracking_drops_unresolvable_targets() {
        let field = FixedField::default();
        let mut target = Some(TargetPoint::new(EnemyId::new(8, 2)));

        assert!(!track_target(&field, Vec3::ZERO, 10.0, &mut target));
        assert!(target.is_none());
    }

    #[test]
    fn tracking_without_lock_fails() {
        let field = FixedField::default().with(1, Vec3::ZERO, 1.0);
        let mut target = None;

        assert!(!track_target(&field, Vec3::ZERO, 10.0, &mut target));
    }
}
