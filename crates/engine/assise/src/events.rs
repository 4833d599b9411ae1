//! Change notifications for scene and UI collaborators
//!
//! Events are queued on the manager and drained by the host once per tick.

use crate::ElementId;
use serde::{Deserialize, Serialize};

/// What changed in course membership
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MembershipChange {
    Added,
    Removed,
    CourseAdded,
    CourseRemoved,
    CourseCopied,
}

/// Notification emitted by the course engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum AssiseEvent {
    #[serde(rename_all = "camelCase")]
    MembershipChanged {
        change: MembershipChange,
        #[serde(rename = "type")]
        type_key: String,
        assise_index: u32,
        element_id: Option<ElementId>,
    },
    ActiveCourseChanged {
        #[serde(rename = "type")]
        type_key: String,
        assise: u32,
        height: f64,
    },
    #[serde(rename_all = "camelCase")]
    ActiveTypeChanged {
        previous_type: String,
        new_type: String,
        height: f64,
    },
    /// Course grids were shown or hidden
    GridVisibilityChanged { visible: bool },
    /// Snap markers of a course were rebuilt
    #[serde(rename_all = "camelCase")]
    MarkersRefreshed {
        #[serde(rename = "type")]
        type_key: String,
        assise_index: u32,
        count: usize,
    },
}

impl AssiseEvent {
    pub fn membership(
        change: MembershipChange,
        type_key: impl Into<String>,
        assise_index: u32,
        element_id: Option<&str>,
    ) -> Self {
        AssiseEvent::MembershipChanged {
            change,
            type_key: type_key.into(),
            assise_index,
            element_id: element_id.map(String::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_shape() {
        let event = AssiseEvent::membership(MembershipChange::Added, "M65", 2, Some("b1"));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "membership-changed");
        assert_eq!(json["change"], "added");
        assert_eq!(json["type"], "M65");
        assert_eq!(json["assiseIndex"], 2);
        assert_eq!(json["elementId"], "b1");
    }

    #[test]
    fn test_active_type_json_shape() {
        let event = AssiseEvent::ActiveTypeChanged {
            previous_type: "brick".into(),
            new_type: "M65".into(),
            height: 1.2,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "active-type-changed");
        assert_eq!(json["previousType"], "brick");
        assert_eq!(json["newType"], "M65");
    }
}
