//! Placement coordinator
//!
//! [`AssiseManager`] is the explicit context object the host constructs once
//! and passes around. It owns the course registry, the joint table and the
//! collaborators, resolves the effective type of each placed element, and
//! keeps element positions, joints, grids and snap markers consistent with
//! the course heights.

use crate::guard::RepositionGuard;
use crate::height::{HeightCalculator, JointTable};
use crate::overlay::{build_markers, GridExtents, GridHelper};
use crate::registry::{Course, CourseRegistry};
use crate::{
    AssiseConfig, AssiseEvent, BaseType, Catalogs, Element, ElementId, ElementKind, Error,
    MembershipChange, Result, SceneProvider, ToolSettingsProvider, TypeFamily, TypeKey,
};
use std::collections::{BTreeMap, BTreeSet};

/// Course bookkeeping and placement engine
pub struct AssiseManager<S: SceneProvider> {
    pub(crate) config: AssiseConfig,
    pub(crate) scene: S,
    pub(crate) catalogs: Catalogs,
    pub(crate) tools: Option<Box<dyn ToolSettingsProvider>>,
    pub(crate) registry: CourseRegistry,
    pub(crate) joints: JointTable,
    pub(crate) guard: RepositionGuard,
    pub(crate) current_type: TypeKey,
    /// Decorated type strings seen so far (cut and custom variants)
    pub(crate) dynamic_types: BTreeSet<String>,
    /// Joint height each course's joints were last re-synced with
    pub(crate) synced_joints: BTreeMap<(BaseType, u32), f64>,
    pub(crate) show_grids: bool,
    grids_auto_enabled: bool,
    pub(crate) grid_dirty: bool,
    grid_extents: GridExtents,
    events: Vec<AssiseEvent>,
}

impl<S: SceneProvider> AssiseManager<S> {
    /// Create a manager over a scene and a set of catalogs
    pub fn new(scene: S, catalogs: Catalogs, config: AssiseConfig) -> Self {
        let config = config.sanitized();
        let grid_extents = GridExtents::empty(config.grid_margin, config.grid_step);
        AssiseManager {
            config,
            scene,
            catalogs,
            tools: None,
            registry: CourseRegistry::new(),
            joints: JointTable::new(),
            guard: RepositionGuard::new(),
            current_type: TypeKey::new(BaseType::Brick),
            dynamic_types: BTreeSet::new(),
            synced_joints: BTreeMap::new(),
            show_grids: false,
            grids_auto_enabled: false,
            grid_dirty: false,
            grid_extents,
            events: Vec::new(),
        }
    }

    /// Attach the construction tool collaborator
    pub fn with_tools(mut self, tools: impl ToolSettingsProvider + 'static) -> Self {
        self.tools = Some(Box::new(tools));
        self
    }

    pub fn config(&self) -> &AssiseConfig {
        &self.config
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut S {
        &mut self.scene
    }

    pub fn catalogs_mut(&mut self) -> &mut Catalogs {
        &mut self.catalogs
    }

    pub fn registry(&self) -> &CourseRegistry {
        &self.registry
    }

    pub fn joints(&self) -> &JointTable {
        &self.joints
    }

    pub fn current_type(&self) -> &TypeKey {
        &self.current_type
    }

    pub fn dynamic_types(&self) -> &BTreeSet<String> {
        &self.dynamic_types
    }

    /// Handle on the repositioning flag, shared with collaborators
    pub fn reposition_guard(&self) -> RepositionGuard {
        self.guard.clone()
    }

    pub fn grids_visible(&self) -> bool {
        self.show_grids
    }

    pub fn grid_extents(&self) -> GridExtents {
        self.grid_extents
    }

    /// Whether a grid recompute is waiting for [`Self::flush_pending`]
    pub fn has_pending_work(&self) -> bool {
        self.grid_dirty
    }

    /// Take every queued notification
    pub fn drain_events(&mut self) -> Vec<AssiseEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn pending_events(&self) -> &[AssiseEvent] {
        &self.events
    }

    pub(crate) fn emit(&mut self, event: AssiseEvent) {
        self.events.push(event);
    }

    pub fn calculator(&self) -> HeightCalculator<'_> {
        HeightCalculator::new(&self.config, &self.catalogs, &self.joints)
    }

    pub(crate) fn height(&self, base: BaseType, index: u32) -> f64 {
        self.calculator().compute_height(base, index)
    }

    // ------------------------------------------------------------------
    // Type resolution
    // ------------------------------------------------------------------

    /// Parse a type string, logging unsupported ones
    pub fn resolve_type_name(&mut self, name: &str) -> Option<TypeKey> {
        match TypeKey::parse(name) {
            Ok(key) => {
                if key.is_decorated() {
                    self.dynamic_types.insert(key.to_string());
                }
                Some(key)
            }
            Err(e) => {
                tracing::warn!("{}", e);
                None
            }
        }
    }

    /// Allocate bookkeeping for a type; returns its course-stack key
    pub fn ensure_type(&mut self, key: &TypeKey) -> BaseType {
        if key.is_decorated() {
            self.dynamic_types.insert(key.to_string());
        }
        if self.registry.ensure_type(key.base) {
            tracing::debug!("Initialized course stack for {}", key.base);
        }
        key.base
    }

    /// Switch the globally current type
    ///
    /// Returns false if `key` already is the current type.
    pub fn set_current_type(&mut self, key: TypeKey) -> bool {
        if key == self.current_type {
            return false;
        }
        let previous = std::mem::replace(&mut self.current_type, key.clone());
        if self.registry.ensure_type(key.base) {
            let inherited = self.registry.active(previous.base);
            self.registry.set_active(key.base, inherited);
        }
        let height = self.ghost_height(&key);
        tracing::debug!("Current type {} -> {}", previous, key);
        self.emit(AssiseEvent::ActiveTypeChanged {
            previous_type: previous.to_string(),
            new_type: key.to_string(),
            height,
        });
        if let Some(tools) = self.tools.as_mut() {
            tools.on_type_switched(&key);
        }
        self.refresh_markers(key.base);
        true
    }

    /// Effective type of an element, and whether placing it switches tools
    pub fn resolve_element_type(&self, element: &Element) -> (TypeKey, bool) {
        match &element.kind {
            ElementKind::JointVertical { .. } | ElementKind::JointHorizontal { .. } => {
                (self.current_type.clone(), false)
            }
            ElementKind::Brick => (self.detect_brick(element), true),
            ElementKind::Block { .. } => (self.detect_block(element), true),
            ElementKind::Slab { variant } => (detect_slab(element, variant.as_deref()), true),
            ElementKind::Beam => (TypeKey::new(BaseType::Beam), false),
            ElementKind::Insulation | ElementKind::Lintel | ElementKind::Custom => {
                let direct = element
                    .type_name
                    .as_deref()
                    .and_then(|name| TypeKey::parse(name).ok());
                match (direct, &element.kind) {
                    (Some(key), _) => (key, false),
                    (None, ElementKind::Insulation) => (TypeKey::new(BaseType::Insulation), false),
                    (None, ElementKind::Lintel) => (TypeKey::new(BaseType::Lintel), false),
                    (None, _) => (self.current_type.clone(), false),
                }
            }
        }
    }

    fn detect_brick(&self, element: &Element) -> TypeKey {
        let decorated = element
            .type_name
            .as_deref()
            .and_then(|name| TypeKey::parse(name).ok())
            .filter(|key| key.base.family() == TypeFamily::Brick);

        let tolerance = self.config.brick_detection_tolerance;
        let by_height = BaseType::BRICK_SUBTYPES.iter().copied().find(|b| {
            b.table_height()
                .is_some_and(|h| (h - element.height()).abs() <= tolerance)
        });
        let by_catalog = || {
            let selected = self.catalogs.brick.as_ref()?.current_category()?;
            let key = TypeKey::parse(&selected.category).ok()?;
            (key.base.family() == TypeFamily::Brick).then_some(key.base)
        };

        let base = by_height.or_else(by_catalog).unwrap_or(BaseType::Brick);
        TypeKey {
            base,
            cut: decorated.as_ref().and_then(|k| k.cut),
            custom: decorated.and_then(|k| k.custom),
        }
    }

    fn detect_block(&self, element: &Element) -> TypeKey {
        let is_block = |key: &TypeKey| {
            matches!(
                key.base.family(),
                TypeFamily::Block | TypeFamily::CellularConcrete
            )
        };

        if let Some(selected) = self
            .catalogs
            .block
            .as_ref()
            .and_then(|c| c.current_category())
        {
            let specific = selected
                .specific_code
                .as_deref()
                .and_then(|code| TypeKey::parse(code).ok())
                .filter(is_block);
            if let Some(key) = specific {
                return key;
            }
            if let Some(base) = block_category_base(&selected.category) {
                return TypeKey::new(base);
            }
        }

        let named = element
            .type_name
            .as_deref()
            .and_then(|name| TypeKey::parse(name).ok())
            .filter(is_block);
        match named {
            Some(key) => key,
            None if element.is_cellular() => TypeKey::new(BaseType::Cellular),
            None => TypeKey::new(BaseType::Block),
        }
    }

    // ------------------------------------------------------------------
    // Course registry operations
    // ------------------------------------------------------------------

    /// Create a course (default: one past the highest) and make it active
    pub fn add_course(&mut self, key: &TypeKey, index: Option<u32>) -> Course {
        let base = self.ensure_type(key);
        let index = index.unwrap_or_else(|| self.registry.next_index(base));
        self.ensure_course(base, index);
        self.activate(base, index);
        self.registry
            .course(base, index)
            .cloned()
            .unwrap_or_else(|| Course::new(base, index, self.height(base, index)))
    }

    /// Course at `(type, index)`, created lazily if missing
    pub fn course_at(&mut self, key: &TypeKey, index: u32) -> Option<&Course> {
        let base = self.ensure_type(key);
        self.ensure_course(base, index);
        self.registry.course(base, index)
    }

    /// Y of the lower face of course `index`
    pub fn height_of(&self, key: &TypeKey, index: u32) -> f64 {
        self.height(key.base, index)
    }

    /// Joint height of a course (override or type default)
    pub fn joint_height(&self, key: &TypeKey, index: u32) -> f64 {
        self.calculator().joint_height(key.base, index)
    }

    /// Active course index of a type
    pub fn active_course(&self, key: &TypeKey) -> u32 {
        self.registry.active(key.base)
    }

    /// Base height of the active course, used for the placement preview
    pub fn ghost_height(&self, key: &TypeKey) -> f64 {
        self.height(key.base, self.registry.active(key.base))
    }

    /// Create the course if needed; returns true if it was created
    pub(crate) fn ensure_course(&mut self, base: BaseType, index: u32) -> bool {
        if self.registry.has_course(base, index) {
            return false;
        }
        let height = self.height(base, index);
        let joint_height = self.calculator().joint_height(base, index);
        self.registry.insert_course(base, index, height);
        self.synced_joints.insert((base, index), joint_height);
        tracing::debug!("Created course {} of {} at {:.3}", index, base, height);
        self.emit(AssiseEvent::membership(
            MembershipChange::CourseAdded,
            base.key(),
            index,
            None,
        ));
        self.grid_dirty = true;
        true
    }

    fn activate(&mut self, base: BaseType, index: u32) {
        self.registry.set_active(base, index);
        let height = self.height(base, index);
        self.emit(AssiseEvent::ActiveCourseChanged {
            type_key: base.key().to_string(),
            assise: index,
            height,
        });
        if base == self.current_type.base {
            self.refresh_markers(base);
        }
    }

    /// Make an existing course the active one
    pub fn set_active_course(&mut self, key: &TypeKey, index: u32) -> Result<()> {
        let base = key.base;
        if !self.registry.has_course(base, index) {
            tracing::warn!("Cannot activate course {} of {}: no such course", index, base);
            return Err(Error::CourseNotFound { base, index });
        }
        self.activate(base, index);
        Ok(())
    }

    /// Delete a course and every element inside it
    ///
    /// `confirm` is asked (with the number of non-joint elements) before a
    /// course holding real elements is removed; declining leaves everything
    /// in place.
    pub fn remove_course(
        &mut self,
        key: &TypeKey,
        index: u32,
        confirm: impl FnOnce(usize) -> bool,
    ) -> Result<()> {
        let base = key.base;
        let Some(course) = self.registry.course(base, index) else {
            tracing::warn!("Cannot remove course {} of {}: no such course", index, base);
            return Err(Error::CourseNotFound { base, index });
        };

        let members: Vec<ElementId> = course.elements.iter().cloned().collect();
        let solid = members
            .iter()
            .filter(|id| !self.scene.element(id).is_some_and(|e| e.kind.is_joint()))
            .count();
        if solid > 0 && !confirm(solid) {
            tracing::info!("Removal of course {} of {} declined", index, base);
            return Err(Error::RemovalDeclined {
                base,
                index,
                elements: solid,
            });
        }

        for id in &members {
            self.scene.remove_element(id);
        }
        let was_active = self.registry.active(base) == index;
        self.registry.remove_course(base, index);
        self.joints.clear_override(base, index);
        self.synced_joints.remove(&(base, index));
        self.refresh_heights(base);
        self.grid_dirty = true;

        self.emit(AssiseEvent::membership(
            MembershipChange::CourseRemoved,
            base.key(),
            index,
            None,
        ));
        if was_active {
            let fallback = self.registry.active(base);
            self.activate(base, fallback);
        }
        Ok(())
    }

    /// Recompute the cached height of every course of a type
    pub fn refresh_heights(&mut self, base: BaseType) {
        for index in self.registry.indices(base) {
            let height = self.height(base, index);
            self.registry.set_cached_height(base, index, height);
        }
    }

    /// Course indices worth displaying: empty bridge courses are hidden
    pub fn visible_courses(&self, key: &TypeKey) -> Vec<u32> {
        self.registry
            .stack(key.base)
            .map(|stack| {
                stack
                    .courses
                    .values()
                    .filter(|c| !(c.created_by_copy_intermediate && c.is_empty()))
                    .map(|c| c.index)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Tallest element of a course, beams and joints excluded
    pub fn max_element_height_in_course(&self, key: &TypeKey, index: u32) -> f64 {
        let Some(course) = self.registry.course(key.base, index) else {
            return 0.0;
        };
        course
            .elements
            .iter()
            .filter_map(|id| self.scene.element(id))
            .filter(|e| !e.kind.is_joint() && !e.kind.is_beam())
            .map(Element::height)
            .fold(0.0, f64::max)
    }

    /// Forget every course, override and pending notification
    pub fn clear(&mut self) {
        self.registry.clear();
        self.joints.clear();
        self.dynamic_types.clear();
        self.synced_joints.clear();
        self.events.clear();
        self.grid_dirty = true;
    }

    // ------------------------------------------------------------------
    // Element placement
    // ------------------------------------------------------------------

    /// Register an element in its course and move it to the course height
    ///
    /// Without `index`, the active course of the resolved type is used.
    /// Returns the resolved type and course index.
    pub fn add_element(&mut self, id: &str, index: Option<u32>) -> Option<(TypeKey, u32)> {
        let previous = self.current_type.clone();
        let (key, switches) = match self.scene.element(id) {
            Some(element) => self.resolve_element_type(element),
            None => {
                tracing::warn!(
                    "Element {} not found in scene, using current type {}",
                    id,
                    previous
                );
                (previous.clone(), false)
            }
        };

        let base = self.ensure_type(&key);
        if self.registry.stack(base).is_some_and(|s| s.courses.is_empty())
            && base != previous.base
        {
            let inherited = self.registry.active(previous.base);
            self.registry.set_active(base, inherited);
        }
        if switches {
            self.set_current_type(key.clone());
        }

        let index = index.unwrap_or_else(|| self.registry.active(base));
        self.add_element_to_course(&key, id, index)
            .then_some((key, index))
    }

    /// Put an element into a specific course and position it
    pub fn add_element_to_course(&mut self, key: &TypeKey, id: &str, index: u32) -> bool {
        let base = self.ensure_type(key);
        self.ensure_course(base, index);
        match self.registry.insert_element(base, index, id) {
            Ok(Some((old_base, old_index))) => {
                tracing::debug!(
                    "Element {} moves from course {} of {}",
                    id,
                    old_index,
                    old_base
                );
                self.element_left(old_base, old_index, id);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::error!("Failed to insert {}: {}", id, e);
                return false;
            }
        }
        self.emit(AssiseEvent::membership(
            MembershipChange::Added,
            base.key(),
            index,
            Some(id),
        ));

        let element = self.scene.element(id).cloned();
        let kind = element.as_ref().map(|e| e.kind.clone());
        match kind {
            Some(ElementKind::Beam) => {
                tracing::debug!("Beam {} tracked in course {} of {}", id, index, base);
                return true;
            }
            Some(k) if k.is_joint() => {}
            Some(_) => {
                self.place_element(base, index, id);
            }
            None => {}
        }

        if let Some(element) = element.as_ref() {
            self.sync_tool_joint(base, index, element);
        }

        if self.config.auto_show_grids && !self.grids_auto_enabled {
            self.grids_auto_enabled = true;
            if !self.show_grids {
                self.set_grids_visible(true);
            }
        }
        self.grid_dirty = true;

        if base == self.current_type.base && index < self.registry.active(base) {
            self.refresh_markers(base);
        }
        true
    }

    /// Move an element so its base sits on its course
    ///
    /// Returns false if the element is not in the scene.
    pub(crate) fn place_element(&mut self, base: BaseType, index: u32, id: &str) -> bool {
        let Some(element) = self.scene.element(id) else {
            return false;
        };
        let half = element.height() / 2.0;
        let mut position = element.position;

        let expected_bottom = if base.family() == TypeFamily::Slab && index == 0 {
            0.0
        } else {
            self.height(base, index)
        };
        position.y = expected_bottom + half;
        self.scene.set_element_position(id, position);

        if let Some(placed) = self.scene.element(id) {
            let bottom = placed.bottom();
            if (bottom - expected_bottom).abs() > self.config.height_epsilon {
                tracing::error!(
                    "Element {} base at {:.4} but course {} of {} is at {:.4}",
                    id,
                    bottom,
                    index,
                    base,
                    expected_bottom
                );
            }
        }
        true
    }

    /// Apply the tool's joint thickness to a cellular concrete course
    fn sync_tool_joint(&mut self, base: BaseType, index: u32, element: &Element) {
        if !element.is_cellular() && base.family() != TypeFamily::CellularConcrete {
            return;
        }
        let Some(settings) = self
            .tools
            .as_ref()
            .and_then(|t| t.joint_settings_for(element))
        else {
            return;
        };
        if !settings.create_joints {
            return;
        }
        let thickness = settings.thickness_cm();
        let current = self.calculator().joint_height(base, index);
        if (thickness - current).abs() > self.config.height_epsilon {
            self.set_joint_height_for_course(&TypeKey::new(base), index, thickness);
        }
    }

    /// Drop an element from its course
    ///
    /// Returns the course it was in, or `None` if it was not tracked.
    pub fn remove_element(&mut self, id: &str) -> Option<(BaseType, u32)> {
        let Some((base, index)) = self.registry.remove_element(id) else {
            tracing::debug!("Element {} is not tracked in any course", id);
            return None;
        };
        self.element_left(base, index, id);
        Some((base, index))
    }

    /// Notify that an element left a course and refresh what it supported
    fn element_left(&mut self, base: BaseType, index: u32, id: &str) {
        self.emit(AssiseEvent::membership(
            MembershipChange::Removed,
            base.key(),
            index,
            Some(id),
        ));
        self.grid_dirty = true;
        if base == self.current_type.base && index <= self.registry.active(base) {
            self.refresh_markers(base);
        }
    }

    /// Course of an element, if tracked
    pub fn course_of(&self, id: &str) -> Option<(BaseType, u32)> {
        self.registry.locate(id)
    }

    /// Only untracked elements and elements of the active course can be
    /// selected
    pub fn can_select(&self, id: &str) -> bool {
        match self.registry.locate(id) {
            None => true,
            Some((base, index)) => index == self.registry.active(base),
        }
    }

    /// Put a tracked element back onto its course height
    ///
    /// Used after the host moved or resized an element. Joints and beams
    /// keep their position.
    pub fn snap_to_course(&mut self, id: &str) -> Result<(BaseType, u32)> {
        let Some((base, index)) = self.registry.locate(id) else {
            return Err(Error::ElementNotFound(id.to_string()));
        };
        let movable = match self.scene.element(id) {
            Some(element) => !element.kind.is_joint() && !element.kind.is_beam(),
            None => return Err(Error::ElementNotFound(id.to_string())),
        };
        if movable {
            self.place_element(base, index, id);
            self.grid_dirty = true;
        }
        Ok((base, index))
    }

    /// Copy the solid elements of one course into another
    ///
    /// Missing courses between the two are created as bridge courses.
    /// Returns the IDs of the copies.
    pub fn copy_course(&mut self, key: &TypeKey, from: u32, to: u32) -> Option<Vec<ElementId>> {
        let base = key.base;
        if from == to {
            return None;
        }
        let Some(source) = self.registry.course(base, from) else {
            tracing::warn!("Cannot copy course {} of {}: no such course", from, base);
            return None;
        };
        let members: Vec<ElementId> = source.elements.iter().cloned().collect();

        for index in from.min(to) + 1..from.max(to) {
            if self.ensure_course(base, index) {
                if let Some(course) = self.registry.course_mut(base, index) {
                    course.created_by_copy_intermediate = true;
                }
            }
        }
        self.ensure_course(base, to);
        if let Some(course) = self.registry.course_mut(base, to) {
            course.created_by_copy_intermediate = false;
        }

        let target_height = self.height(base, to);
        let mut copies = Vec::new();
        for id in members {
            let Some(element) = self.scene.element(&id) else {
                continue;
            };
            if element.kind.is_joint() {
                continue;
            }
            let mut position = element.position;
            position.y = target_height + element.height() / 2.0;
            let Some(copy) = self.scene.duplicate_element(&id, position) else {
                tracing::warn!("Scene refused to duplicate {}", id);
                continue;
            };
            self.add_element_to_course(key, &copy, to);
            copies.push(copy);
        }

        self.emit(AssiseEvent::membership(
            MembershipChange::CourseCopied,
            base.key(),
            to,
            None,
        ));
        Some(copies)
    }

    // ------------------------------------------------------------------
    // Joint heights
    // ------------------------------------------------------------------

    /// Override the joint height of one course
    ///
    /// Refused while a repositioning pass is running and when the value is
    /// unchanged. On success every course of the type is recomputed and the
    /// solid elements of the changed course are moved.
    pub fn set_joint_height_for_course(&mut self, key: &TypeKey, index: u32, height: f64) -> bool {
        if self.guard.is_active() {
            tracing::debug!("Joint change on {} course {} skipped: repositioning", key, index);
            return false;
        }
        let base = key.base;
        let height = self.config.sanitize_joint(height);
        let current = self.calculator().joint_height(base, index);
        if (height - current).abs() < self.config.height_epsilon {
            return false;
        }
        let Some(_token) = self.guard.try_acquire() else {
            return false;
        };

        self.joints.set_override(base, index, height);
        tracing::debug!("Joint of {} course {} set to {:.3}", base, index, height);
        self.apply_joint_change(base, Some(index));
        true
    }

    /// Remove a per-course override, returning to the type default
    pub fn clear_joint_override(&mut self, key: &TypeKey, index: u32) -> bool {
        if self.guard.is_active() || self.joints.override_at(key.base, index).is_none() {
            return false;
        }
        let Some(_token) = self.guard.try_acquire() else {
            return false;
        };
        self.joints.clear_override(key.base, index);
        self.apply_joint_change(key.base, Some(index));
        true
    }

    /// Change the default joint height of a whole type
    pub fn set_type_joint_height(&mut self, key: &TypeKey, height: f64) -> bool {
        if self.guard.is_active() {
            return false;
        }
        let base = key.base;
        let height = self.config.sanitize_joint(height);
        let current = self.joints.type_default(&self.config, base);
        if (height - current).abs() < self.config.height_epsilon {
            return false;
        }
        let Some(_token) = self.guard.try_acquire() else {
            return false;
        };
        self.joints.set_type_default(base, height);
        self.apply_joint_change(base, None);
        true
    }

    /// Recompute heights, then move solid elements of the changed course
    /// (every course when `changed` is `None`) and re-sync joints
    ///
    /// Callers hold the reposition token.
    fn apply_joint_change(&mut self, base: BaseType, changed: Option<u32>) {
        self.refresh_heights(base);
        let courses = match changed {
            Some(index) => vec![index],
            None => self.registry.indices(base),
        };
        for index in courses {
            self.reposition_course(base, index);
        }
        self.resync_joints(Some(base));
        self.grid_dirty = true;
        if base == self.current_type.base {
            self.refresh_markers(base);
        }
    }

    /// Move every solid, non-beam element of a course onto its height
    pub(crate) fn reposition_course(&mut self, base: BaseType, index: u32) {
        let Some(course) = self.registry.course(base, index) else {
            return;
        };
        let members: Vec<ElementId> = course.elements.iter().cloned().collect();
        for id in members {
            let movable = self
                .scene
                .element(&id)
                .is_some_and(|e| !e.kind.is_joint() && !e.kind.is_beam());
            if movable {
                self.place_element(base, index, &id);
            }
        }
    }

    // ------------------------------------------------------------------
    // Grids and snap markers
    // ------------------------------------------------------------------

    /// Show or hide course grids
    pub fn set_grids_visible(&mut self, visible: bool) {
        if self.show_grids == visible {
            return;
        }
        self.show_grids = visible;
        self.grid_dirty = true;
        self.emit(AssiseEvent::GridVisibilityChanged { visible });
    }

    /// Run deferred work (grid extents); call once per tick
    ///
    /// Returns true if anything was recomputed.
    pub fn flush_pending(&mut self) -> bool {
        if !self.grid_dirty {
            return false;
        }
        self.grid_dirty = false;

        let elements: Vec<Element> = self
            .scene
            .element_ids()
            .iter()
            .filter_map(|id| self.scene.element(id).cloned())
            .collect();
        let extents =
            GridExtents::covering(&elements, self.config.grid_margin, self.config.grid_step);
        self.grid_extents = extents;

        let types: Vec<BaseType> = self.registry.types().collect();
        for base in types {
            let heights: Vec<(u32, f64)> = self
                .registry
                .indices(base)
                .into_iter()
                .map(|i| (i, self.height(base, i)))
                .collect();
            let Some(stack) = self.registry.stack_mut(base) else {
                continue;
            };
            stack.grids.clear();
            if self.show_grids {
                for (index, height) in heights {
                    stack.grids.insert(index, GridHelper { height, extents });
                }
            }
        }
        true
    }

    /// Rebuild the snap markers of a type's active course
    ///
    /// Markers sit on the elements of the course directly below.
    pub fn refresh_markers(&mut self, base: BaseType) {
        let active = self.registry.active(base);
        let below: Vec<Element> = match active.checked_sub(1) {
            Some(index) => self
                .registry
                .course(base, index)
                .map(|c| {
                    c.elements
                        .iter()
                        .filter_map(|id| self.scene.element(id))
                        .filter(|e| !e.kind.is_joint())
                        .cloned()
                        .collect()
                })
                .unwrap_or_default(),
            None => Vec::new(),
        };
        let markers = build_markers(&below, self.config.marker_merge_distance);
        let count = markers.len();

        let Some(stack) = self.registry.stack_mut(base) else {
            return;
        };
        stack.markers.clear();
        if count > 0 {
            stack.markers.insert(active, markers);
        }
        self.emit(AssiseEvent::MarkersRefreshed {
            type_key: base.key().to_string(),
            assise_index: active,
            count,
        });
    }
}

/// Base type named by a block catalog category
fn block_category_base(category: &str) -> Option<BaseType> {
    if let Ok(key) = TypeKey::parse(category) {
        if matches!(
            key.base.family(),
            TypeFamily::Block | TypeFamily::CellularConcrete
        ) {
            return Some(key.base);
        }
    }
    match category.to_ascii_lowercase().as_str() {
        "cellular" | "cellular_concrete" | "aerated" => Some(BaseType::Cellular),
        "hollow" | "concrete" | "block" | "terracotta" => Some(BaseType::Block),
        _ => None,
    }
}

/// Slab variant named by an element's type string, variant or metadata
fn detect_slab(element: &Element, variant: Option<&str>) -> TypeKey {
    let candidates = variant
        .into_iter()
        .chain(element.type_name.as_deref())
        .chain(element.metadata.values().map(String::as_str));

    for text in candidates {
        let upper = text.to_ascii_uppercase();
        if !upper.contains("SLAB") {
            continue;
        }
        if let Ok(key) = TypeKey::parse(&upper) {
            if key.base.family() == TypeFamily::Slab {
                return key;
            }
        }
        let digits: String = upper
            .chars()
            .skip_while(|c| !c.is_ascii_digit())
            .take_while(|c| c.is_ascii_digit())
            .collect();
        if let Some(base) = BaseType::from_key(&format!("SLAB_{digits}")) {
            return TypeKey::new(base);
        }
    }
    TypeKey::new(BaseType::BASELINE_SLAB)
}
