#![forbid(unsafe_code)]

//! A row of diagrams over one store.
//!
//! The session is the only place that talks to the [`VectorStore`]. Every
//! mutation goes the same way: issue the request, and on success re-read a
//! snapshot of each affected vector and hand it to its instance. A failed
//! request changes nothing on screen.
//!
//! Instances are identified by the [`VectorId`] they display and kept in
//! display order; a split mounts the new vector right after its origin.

use std::time::Duration;

use rrbvis_core::geometry::Point;
use rrbvis_core::hover::HoverEvent;
use web_time::Instant;

use crate::color::ColorTracker;
use crate::config::VisConfig;
use crate::error::{StoreError, VisError};
use crate::instance::{CellRef, Hit, VectorVis};
use crate::reconcile::RenderReport;
use crate::store::{VectorId, VectorStore};
use crate::surface::{Frame, Surface};

#[derive(Debug)]
pub struct Session<S> {
    store: S,
    config: VisConfig,
    colors: ColorTracker,
    instances: Vec<VectorVis>,
}

impl<S: VectorStore> Session<S> {
    pub fn new(store: S, config: VisConfig) -> Self {
        Self {
            colors: ColorTracker::new(config.palette.clone()),
            store,
            config,
            instances: Vec::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn config(&self) -> &VisConfig {
        &self.config
    }

    pub fn colors(&self) -> &ColorTracker {
        &self.colors
    }

    /// Mounted instances in display order.
    pub fn instances(&self) -> &[VectorVis] {
        &self.instances
    }

    pub fn instance(&self, id: VectorId) -> Option<&VectorVis> {
        self.instances.iter().find(|i| i.vector() == id)
    }

    pub fn instance_mut(&mut self, id: VectorId) -> Option<&mut VectorVis> {
        self.instances.iter_mut().find(|i| i.vector() == id)
    }

    fn parts(&mut self, id: VectorId) -> Result<(&mut VectorVis, &mut ColorTracker), VisError> {
        let instance = self
            .instances
            .iter_mut()
            .find(|i| i.vector() == id)
            .ok_or(VisError::UnknownInstance(id.0))?;
        Ok((instance, &mut self.colors))
    }

    fn position(&self, id: VectorId) -> Result<usize, VisError> {
        self.instances
            .iter()
            .position(|i| i.vector() == id)
            .ok_or(VisError::UnknownInstance(id.0))
    }

    /// Position of a store operand. An unmounted id is reported the way the
    /// store reports an unknown vector.
    fn operand(&self, id: VectorId) -> Result<usize, VisError> {
        self.position(id)
            .map_err(|_| StoreError::InvalidOperand(format!("unknown vector {id}")).into())
    }

    /// Create a vector and mount it at the end of the row.
    pub fn add_vector(&mut self, initial_size: Option<usize>) -> Result<VectorId, VisError> {
        let id = self.store.create_vector(initial_size)?;
        self.instances
            .push(VectorVis::new(id, self.config.clone()));
        self.refresh(id)?;
        tracing::debug!(vector = %id, size = initial_size.unwrap_or(0), "vector mounted");
        Ok(id)
    }

    /// Re-read `id` from the store and render it.
    pub fn refresh(&mut self, id: VectorId) -> Result<RenderReport, VisError> {
        self.position(id)?;
        let raw = self.store.snapshot(id)?;
        let (instance, colors) = self.parts(id)?;
        instance.set_tree_snapshot(&raw, colors)
    }

    /// Resize the vector behind `id` and show the result.
    pub fn set_size(&mut self, id: VectorId, size: usize) -> Result<RenderReport, VisError> {
        self.position(id)?;
        self.store.resize(id, size)?;
        self.refresh(id)
    }

    /// Split `id` at `index` and mount the new vector right after it.
    ///
    /// A rejected split dismisses the affordance and leaves both the store
    /// and the picture as they were.
    pub fn split_instance(&mut self, id: VectorId, index: usize) -> Result<VectorId, VisError> {
        let at = self.operand(id)?;
        let other = match self.store.split_at(id, index) {
            Ok(other) => other,
            Err(err) => {
                tracing::warn!(vector = %id, index, error = %err, "split rejected");
                self.instances[at].dismiss_affordance();
                return Err(err.into());
            }
        };
        self.instances[at].dismiss_affordance();
        self.refresh(id)?;
        self.instances
            .insert(at + 1, VectorVis::new(other, self.config.clone()));
        self.refresh(other)?;
        Ok(other)
    }

    /// Act on a click on `id`'s affordance. `None` when none was shown.
    pub fn click_affordance(&mut self, id: VectorId) -> Result<Option<VectorId>, VisError> {
        let (instance, _) = self.parts(id)?;
        match instance.click_affordance() {
            Some(request) => self.split_instance(request.vector, request.index).map(Some),
            None => Ok(None),
        }
    }

    /// Append `other` to `id` and unmount `other`.
    pub fn concatenate_pair(
        &mut self,
        id: VectorId,
        other: VectorId,
    ) -> Result<RenderReport, VisError> {
        self.operand(id)?;
        let other_at = self.operand(other)?;
        self.store.concatenate(id, other)?;
        self.instances.remove(other_at);
        self.refresh(id)
    }

    /// Fold every vector into the leftmost instance, in display order, and
    /// keep only that instance.
    ///
    /// Vectors the store holds but the row does not show follow in id
    /// order. The survivor's previous frame is discarded so the whole tree
    /// enters.
    pub fn concatenate_all(&mut self) -> Result<Option<VectorId>, VisError> {
        let mut order: Vec<VectorId> = self.instances.iter().map(VectorVis::vector).collect();
        for id in self.store.vector_ids() {
            if !order.contains(&id) {
                order.push(id);
            }
        }
        let Some((&survivor, rest)) = order.split_first() else {
            self.instances.clear();
            return Ok(None);
        };
        for &other in rest {
            self.store.concatenate(survivor, other)?;
        }
        self.instances.retain(|i| i.vector() == survivor);
        if self.instances.is_empty() {
            self.instances
                .push(VectorVis::new(survivor, self.config.clone()));
        }
        let (instance, _) = self.parts(survivor)?;
        instance.reset_frame();
        self.refresh(survivor)?;
        tracing::debug!(vector = %survivor, folded = rest.len(), "vectors concatenated");
        Ok(Some(survivor))
    }

    /// Click on a node of `id`. Stale keys are ignored.
    pub fn toggle(
        &mut self,
        id: VectorId,
        key: &str,
        slow_motion: bool,
    ) -> Result<Option<RenderReport>, VisError> {
        let (instance, colors) = self.parts(id)?;
        Ok(instance.toggle(key, slow_motion, colors))
    }

    pub fn hit_test(&self, id: VectorId, point: Point) -> Result<Option<Hit>, VisError> {
        self.instance(id)
            .map(|i| i.hit_test(point))
            .ok_or(VisError::UnknownInstance(id.0))
    }

    pub fn pointer_enter_cell(
        &mut self,
        id: VectorId,
        cell: CellRef,
        now: Instant,
    ) -> Result<Option<HoverEvent<CellRef>>, VisError> {
        let (instance, _) = self.parts(id)?;
        Ok(instance.pointer_enter_cell(cell, now))
    }

    pub fn pointer_leave_cell(
        &mut self,
        id: VectorId,
        cell: &CellRef,
        now: Instant,
    ) -> Result<(), VisError> {
        let (instance, _) = self.parts(id)?;
        instance.pointer_leave_cell(cell, now);
        Ok(())
    }

    pub fn affordance_enter(&mut self, id: VectorId) -> Result<(), VisError> {
        let (instance, _) = self.parts(id)?;
        instance.affordance_enter();
        Ok(())
    }

    pub fn affordance_leave(&mut self, id: VectorId, now: Instant) -> Result<(), VisError> {
        let (instance, _) = self.parts(id)?;
        instance.affordance_leave(now);
        Ok(())
    }

    /// Fire every due hover timer.
    pub fn poll(&mut self, now: Instant) -> Vec<(VectorId, HoverEvent<CellRef>)> {
        self.instances
            .iter_mut()
            .filter_map(|i| i.poll(now).map(|event| (i.vector(), event)))
            .collect()
    }

    /// Earliest pending hover deadline across all instances.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.instances.iter().filter_map(VectorVis::deadline).min()
    }

    pub fn tick(&mut self, dt: Duration) {
        for instance in &mut self.instances {
            instance.tick(dt);
        }
    }

    pub fn is_animating(&self) -> bool {
        self.instances.iter().any(VectorVis::is_animating)
    }

    /// Current frame of every instance, in display order.
    pub fn frames(&self) -> Vec<(VectorId, Frame)> {
        self.instances
            .iter()
            .map(|i| (i.vector(), i.frame()))
            .collect()
    }

    pub fn present(&self, id: VectorId, surface: &mut dyn Surface) -> Result<(), VisError> {
        let instance = self.instance(id).ok_or(VisError::UnknownInstance(id.0))?;
        surface.present(&instance.frame());
        Ok(())
    }

    /// Forget every colour and repaint all instances from a fresh palette.
    pub fn reset_colors(&mut self) {
        self.colors.reset();
        let Self {
            instances, colors, ..
        } = self;
        for instance in instances {
            instance.rerender(colors);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn session() -> Session<MemoryStore> {
        Session::new(MemoryStore::default(), VisConfig::default())
    }

    #[test]
    fn add_and_resize() {
        let mut s = session();
        let id = s.add_vector(Some(10)).unwrap();
        assert_eq!(s.instances().len(), 1);
        let report = s.set_size(id, 20).unwrap();
        assert!(!report.entered.is_empty());
        assert_eq!(s.store().len(id).unwrap(), 20);
    }

    #[test]
    fn split_mounts_after_origin() {
        let mut s = session();
        let a = s.add_vector(Some(40)).unwrap();
        let b = s.add_vector(Some(8)).unwrap();
        let c = s.split_instance(a, 20).unwrap();
        let order: Vec<VectorId> = s.instances().iter().map(VectorVis::vector).collect();
        assert_eq!(order, [a, c, b]);
    }

    #[test]
    fn rejected_split_is_recoverable() {
        let mut s = session();
        let a = s.add_vector(Some(8)).unwrap();
        let err = s.split_instance(a, 9).unwrap_err();
        assert!(matches!(err, VisError::Store(StoreError::InvalidOperand(_))));
        assert_eq!(s.instances().len(), 1);
        assert_eq!(s.store().vector_count(), 1);
    }

    #[test]
    fn unknown_instance() {
        let mut s = session();
        assert_eq!(
            s.refresh(VectorId(7)).unwrap_err(),
            VisError::UnknownInstance(7)
        );
        assert!(s.toggle(VectorId(7), "x", false).is_err());
    }

    #[test]
    fn store_operations_on_unmounted_ids_are_invalid_operands() {
        let mut s = session();
        let a = s.add_vector(Some(8)).unwrap();
        let split = s.split_instance(VectorId(9), 2).unwrap_err();
        assert!(matches!(split, VisError::Store(StoreError::InvalidOperand(_))));
        let concat = s.concatenate_pair(a, VectorId(9)).unwrap_err();
        assert!(matches!(concat, VisError::Store(StoreError::InvalidOperand(_))));
        assert_eq!(s.store().len(a).unwrap(), 8);
        assert_eq!(s.instances().len(), 1);
    }

    #[test]
    fn concatenate_all_follows_display_order() {
        let mut s = session();
        let a = s.add_vector(Some(40)).unwrap();
        s.add_vector(Some(10)).unwrap();
        s.split_instance(a, 20).unwrap();
        assert_eq!(s.concatenate_all().unwrap(), Some(a));
        let expected: Vec<u64> = (0..50).collect();
        assert_eq!(s.store().elements(a).unwrap(), expected);
        assert_eq!(s.instances().len(), 1);
    }

    #[test]
    fn concatenate_all_appends_unmounted_vectors_last() {
        let mut s = session();
        let a = s.add_vector(Some(4)).unwrap();
        let hidden = s.store_mut().create_vector(Some(3)).unwrap();
        let b = s.add_vector(Some(5)).unwrap();
        assert!(s.instance(hidden).is_none());

        assert_eq!(s.concatenate_all().unwrap(), Some(a));
        // Values are allocated in creation order: a 0..4, hidden 4..7, b 7..12.
        let expected: Vec<u64> = (0..4).chain(7..12).chain(4..7).collect();
        assert_eq!(s.store().elements(a).unwrap(), expected);
        assert!(s.instance(b).is_none());
        assert_eq!(s.store().vector_count(), 1);
    }

    #[test]
    fn concatenate_pair_unmounts_operand() {
        let mut s = session();
        let a = s.add_vector(Some(12)).unwrap();
        let b = s.add_vector(Some(12)).unwrap();
        s.concatenate_pair(a, b).unwrap();
        assert_eq!(s.instances().len(), 1);
        assert!(s.instance(b).is_none());
        assert_eq!(s.store().len(a).unwrap(), 24);
    }

    #[test]
    fn reset_colors_repaints() {
        let mut s = session();
        s.add_vector(Some(30)).unwrap();
        let before = s.colors().len();
        assert!(before > 0);
        s.reset_colors();
        assert_eq!(s.colors().len(), before);
    }
}
