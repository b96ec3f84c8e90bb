//! Advisory shape of detection entries.
//!
//! The relay forwards detections untouched; these types exist for logging
//! and for clients that want a typed view. Every field is optional.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Fractional bounding box, each component in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width as a fraction of the frame.
    pub width: f64,
    /// Height as a fraction of the frame.
    pub height: f64,
}

/// Fractional point in the frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position.
    pub x: f64,
    /// Vertical position.
    pub y: f64,
}

/// One entry of a `detections` array.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Where the object sits in the frame.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BoundingBox>,
    /// Object class, for model-based detectors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    /// Colour name, for colour-tracking detectors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Score in `[0, 1]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Centre of the bounding box.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center: Option<Point>,
}

impl Detection {
    /// Lenient decode: entries that do not fit the shape yield `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        Self::deserialize(value).ok()
    }

    /// Color label if present, otherwise the class label.
    pub fn label(&self) -> &str {
        self.color
            .as_deref()
            .or(self.class.as_deref())
            .unwrap_or("unknown")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn full_entry() {
        let v = json!({
            "bbox": {"x": 0.1, "y": 0.2, "width": 0.3, "height": 0.4},
            "color": "red",
            "confidence": 0.92,
            "center": {"x": 0.25, "y": 0.4}
        });
        let d = Detection::from_value(&v).unwrap();
        assert_eq!(d.bbox.unwrap().width, 0.3);
        assert_eq!(d.label(), "red");
        assert_eq!(d.center.unwrap().y, 0.4);
    }

    #[test]
    fn empty_entry_is_accepted() {
        let d = Detection::from_value(&json!({})).unwrap();
        assert_eq!(d, Detection::default());
        assert_eq!(d.label(), "unknown");
    }

    #[test]
    fn class_label_fallback() {
        let d = Detection::from_value(&json!({"class": "bottle"})).unwrap();
        assert_eq!(d.label(), "bottle");
    }

    #[test]
    fn wrong_shape_is_none() {
        assert!(Detection::from_value(&json!({"bbox": "nope"})).is_none());
        assert!(Detection::from_value(&json!(42)).is_none());
    }
}
