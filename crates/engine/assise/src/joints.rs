//! Joint re-synchronization
//!
//! Joint elements are tracked in courses but never moved by course
//! repositioning. After a joint height change they are resized to
//! `reference height + current joint height` and moved so their top stays
//! flush with the masonry they belong to.

use crate::manager::AssiseManager;
use crate::{BaseType, Element, ElementKind, SceneProvider};

impl<S: SceneProvider> AssiseManager<S> {
    /// Resize and re-anchor every tracked joint (of one type, if given)
    ///
    /// Returns the number of joints updated.
    pub fn resync_joints(&mut self, only: Option<BaseType>) -> usize {
        let mut updated = 0;
        for id in self.scene.element_ids() {
            let Some(joint) = self.scene.element(&id).filter(|e| e.kind.is_joint()).cloned()
            else {
                continue;
            };
            let Some((base, index)) = self.registry.locate(&id) else {
                continue;
            };
            if only.is_some_and(|b| b != base) {
                continue;
            }

            let joint_height = self.calculator().joint_height(base, index);
            let previous = self
                .synced_joints
                .get(&(base, index))
                .copied()
                .unwrap_or_else(|| self.joints.type_default(&self.config, base));
            let reference = self.reference_height(&joint, base, previous);
            let height = reference + joint_height;

            let center_y = match joint.kind {
                ElementKind::JointVertical { .. } => {
                    let top = self
                        .anchor_top(&joint, base, index)
                        .unwrap_or_else(|| self.height(base, index) + reference);
                    top - height / 2.0
                }
                _ if index == 0 => height / 2.0,
                _ => self.height(base, index) - height / 2.0,
            };

            let mut position = joint.position;
            position.y = center_y;
            self.scene.set_element_height(&id, height);
            self.scene.set_element_position(&id, position);
            updated += 1;
        }

        let types: Vec<BaseType> = match only {
            Some(base) => vec![base],
            None => self.registry.types().collect(),
        };
        for base in types {
            for index in self.registry.indices(base) {
                let joint_height = self.calculator().joint_height(base, index);
                self.synced_joints.insert((base, index), joint_height);
            }
        }

        if updated > 0 {
            tracing::debug!("Re-synced {} joint(s)", updated);
        }
        updated
    }

    /// Masonry height a joint was cut for
    ///
    /// Uses the cached value when the joint has one. Otherwise the joint
    /// height it was last synced with is subtracted from its current height;
    /// a result close to a known element height snaps to it, a result outside
    /// the plausible range falls back to the type's element height.
    fn reference_height(&self, joint: &Element, base: BaseType, previous_joint: f64) -> f64 {
        if let Some(cached) = joint.kind.reference_height() {
            return cached;
        }
        let expected = self.calculator().element_height(base);
        let inferred = joint.height() - previous_joint;
        let tolerance = self.config.brick_detection_tolerance;

        if (inferred - expected).abs() <= tolerance {
            return expected;
        }
        let known = BaseType::ALL
            .iter()
            .filter_map(|b| b.table_height())
            .find(|h| (inferred - h).abs() <= tolerance);
        if let Some(h) = known {
            return h;
        }
        if (self.config.reference_height_min..=self.config.reference_height_max).contains(&inferred)
        {
            inferred
        } else {
            expected
        }
    }

    /// Top face of the nearest solid element of the same course
    fn anchor_top(&self, joint: &Element, base: BaseType, index: u32) -> Option<f64> {
        let course = self.registry.course(base, index)?;
        course
            .elements
            .iter()
            .filter_map(|id| self.scene.element(id))
            .filter(|e| !e.kind.is_joint() && !e.kind.is_beam())
            .map(|e| (joint.planar_distance(e), e.top()))
            .filter(|(distance, _)| *distance <= self.config.joint_search_radius)
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, top)| top)
    }
}
