//! Course registry
//!
//! Per base type, an ordered map from course index to [`Course`], plus the
//! grid and snap-marker handles that belong to each course and the active
//! course pointer. Heights stored here are caches; the height calculator is
//! the source of truth.

use crate::overlay::{GridHelper, SnapMarker};
use crate::{BaseType, ElementId, Error, Result};
use std::collections::{BTreeMap, BTreeSet};

/// One horizontal course of a type stack
#[derive(Debug, Clone, PartialEq)]
pub struct Course {
    pub index: u32,
    pub base: BaseType,
    /// Cached Y of the course's lower face (cm)
    pub height: f64,
    pub elements: BTreeSet<ElementId>,
    /// Created only to bridge a gap when copying to a non-adjacent course
    pub created_by_copy_intermediate: bool,
}

impl Course {
    pub fn new(base: BaseType, index: u32, height: f64) -> Self {
        Course {
            index,
            base,
            height,
            elements: BTreeSet::new(),
            created_by_copy_intermediate: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.elements.contains(id)
    }
}

/// Bookkeeping for a single type
#[derive(Debug, Clone, Default)]
pub struct TypeStack {
    pub courses: BTreeMap<u32, Course>,
    pub grids: BTreeMap<u32, GridHelper>,
    pub markers: BTreeMap<u32, Vec<SnapMarker>>,
    pub active: u32,
}

impl TypeStack {
    pub fn max_index(&self) -> Option<u32> {
        self.courses.keys().next_back().copied()
    }

    pub fn min_index(&self) -> Option<u32> {
        self.courses.keys().next().copied()
    }
}

/// All course stacks, keyed by base type
#[derive(Debug, Clone, Default)]
pub struct CourseRegistry {
    stacks: BTreeMap<BaseType, TypeStack>,
}

impl CourseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the stack for a type; returns true if it was new
    pub fn ensure_type(&mut self, base: BaseType) -> bool {
        if self.stacks.contains_key(&base) {
            return false;
        }
        self.stacks.insert(base, TypeStack::default());
        true
    }

    pub fn contains_type(&self, base: BaseType) -> bool {
        self.stacks.contains_key(&base)
    }

    /// Types that have a stack, in key order
    pub fn types(&self) -> impl Iterator<Item = BaseType> + '_ {
        self.stacks.keys().copied()
    }

    pub fn stack(&self, base: BaseType) -> Option<&TypeStack> {
        self.stacks.get(&base)
    }

    pub fn stack_mut(&mut self, base: BaseType) -> Option<&mut TypeStack> {
        self.stacks.get_mut(&base)
    }

    pub fn course(&self, base: BaseType, index: u32) -> Option<&Course> {
        self.stacks.get(&base)?.courses.get(&index)
    }

    pub fn course_mut(&mut self, base: BaseType, index: u32) -> Option<&mut Course> {
        self.stacks.get_mut(&base)?.courses.get_mut(&index)
    }

    pub fn has_course(&self, base: BaseType, index: u32) -> bool {
        self.course(base, index).is_some()
    }

    /// Sorted course indices of a type
    pub fn indices(&self, base: BaseType) -> Vec<u32> {
        self.stacks
            .get(&base)
            .map(|s| s.courses.keys().copied().collect())
            .unwrap_or_default()
    }

    /// One past the highest existing index, or 0 for an empty stack
    pub fn next_index(&self, base: BaseType) -> u32 {
        self.stacks
            .get(&base)
            .and_then(TypeStack::max_index)
            .map_or(0, |max| max + 1)
    }

    /// Insert a course, or return the existing one untouched
    pub fn insert_course(&mut self, base: BaseType, index: u32, height: f64) -> &mut Course {
        self.stacks
            .entry(base)
            .or_default()
            .courses
            .entry(index)
            .or_insert_with(|| Course::new(base, index, height))
    }

    /// Delete a course with its grid and markers
    ///
    /// If it was the active course, the pointer falls back to the lowest
    /// remaining index (or 0).
    pub fn remove_course(&mut self, base: BaseType, index: u32) -> Option<Course> {
        let stack = self.stacks.get_mut(&base)?;
        let course = stack.courses.remove(&index)?;
        stack.grids.remove(&index);
        stack.markers.remove(&index);
        if stack.active == index {
            stack.active = stack.min_index().unwrap_or(0);
        }
        Some(course)
    }

    pub fn active(&self, base: BaseType) -> u32 {
        self.stacks.get(&base).map_or(0, |s| s.active)
    }

    pub fn set_active(&mut self, base: BaseType, index: u32) {
        self.stacks.entry(base).or_default().active = index;
    }

    /// Update a course's cached height
    pub fn set_cached_height(&mut self, base: BaseType, index: u32, height: f64) {
        if let Some(course) = self.course_mut(base, index) {
            course.height = height;
        }
    }

    /// Find the course holding an element (linear scan)
    pub fn locate(&self, id: &str) -> Option<(BaseType, u32)> {
        self.stacks.iter().find_map(|(base, stack)| {
            stack
                .courses
                .values()
                .find(|c| c.contains(id))
                .map(|c| (*base, c.index))
        })
    }

    /// Put an element into an existing course
    ///
    /// The element leaves any course it was in before; that course is
    /// returned when it differs from the target.
    pub fn insert_element(
        &mut self,
        base: BaseType,
        index: u32,
        id: &str,
    ) -> Result<Option<(BaseType, u32)>> {
        if !self.has_course(base, index) {
            return Err(Error::CourseNotFound { base, index });
        }
        let previous = match self.locate(id) {
            Some(location) if location == (base, index) => return Ok(None),
            Some(location) => {
                self.remove_element(id);
                Some(location)
            }
            None => None,
        };
        if let Some(course) = self.course_mut(base, index) {
            course.elements.insert(id.to_string());
        }
        Ok(previous)
    }

    /// Drop an element from whichever course holds it
    pub fn remove_element(&mut self, id: &str) -> Option<(BaseType, u32)> {
        let (base, index) = self.locate(id)?;
        self.course_mut(base, index)?.elements.remove(id);
        Some((base, index))
    }

    /// Forget every type and course
    pub fn clear(&mut self) {
        self.stacks.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_type_idempotent() {
        let mut registry = CourseRegistry::new();
        assert!(registry.ensure_type(BaseType::M65));
        assert!(!registry.ensure_type(BaseType::M65));
        assert_eq!(registry.active(BaseType::M65), 0);
        assert_eq!(registry.next_index(BaseType::M65), 0);
    }

    #[test]
    fn test_next_index_skips_gaps() {
        let mut registry = CourseRegistry::new();
        registry.insert_course(BaseType::B14, 0, 1.2);
        registry.insert_course(BaseType::B14, 4, 81.2);
        assert_eq!(registry.next_index(BaseType::B14), 5);
        assert_eq!(registry.indices(BaseType::B14), vec![0, 4]);
    }

    #[test]
    fn test_element_in_one_course_only() {
        let mut registry = CourseRegistry::new();
        registry.insert_course(BaseType::M65, 0, 1.2);
        registry.insert_course(BaseType::B14, 0, 1.2);

        assert_eq!(registry.insert_element(BaseType::M65, 0, "a").unwrap(), None);
        assert_eq!(registry.insert_element(BaseType::M65, 0, "a").unwrap(), None);
        assert_eq!(
            registry.insert_element(BaseType::B14, 0, "a").unwrap(),
            Some((BaseType::M65, 0))
        );
        assert_eq!(registry.locate("a"), Some((BaseType::B14, 0)));
        assert!(registry.course(BaseType::M65, 0).unwrap().is_empty());

        assert!(matches!(
            registry.insert_element(BaseType::M65, 3, "b"),
            Err(Error::CourseNotFound { index: 3, .. })
        ));
        assert_eq!(registry.locate("b"), None);
    }

    #[test]
    fn test_remove_active_course_falls_back() {
        let mut registry = CourseRegistry::new();
        for i in [1, 2, 3] {
            registry.insert_course(BaseType::M50, i, 0.0);
        }
        registry.set_active(BaseType::M50, 2);
        assert!(registry.remove_course(BaseType::M50, 2).is_some());
        assert_eq!(registry.active(BaseType::M50), 1);

        registry.remove_course(BaseType::M50, 1);
        registry.remove_course(BaseType::M50, 3);
        assert_eq!(registry.active(BaseType::M50), 0);
        assert!(registry.remove_course(BaseType::M50, 3).is_none());
    }

    #[test]
    fn test_remove_element() {
        let mut registry = CourseRegistry::new();
        registry.insert_course(BaseType::Beam, 2, 10.0);
        registry.insert_element(BaseType::Beam, 2, "beam-1");
        assert_eq!(registry.remove_element("beam-1"), Some((BaseType::Beam, 2)));
        assert_eq!(registry.remove_element("beam-1"), None);
    }
}
