//! Capturable territories and the fixed arena layout

use serde::Serialize;

use crate::ws::protocol::Vector3;

/// Upper bound of a territory's contested points
pub const MAX_POINTS: f64 = 100.0;

/// A fixed capturable zone
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Territory {
    pub id: String,
    pub position: Vector3,
    pub radius: f64,
    /// Always within `0..=MAX_POINTS`
    pub points: f64,
    /// `None` until some color captures it after a reset
    pub controlling_color: Option<String>,
}

impl Territory {
    pub fn new(id: impl Into<String>, position: Vector3, radius: f64) -> Self {
        Self {
            id: id.into(),
            position,
            radius,
            points: 0.0,
            controlling_color: None,
        }
    }

    /// Back to neutral for a new round
    pub fn reset(&mut self) {
        self.points = 0.0;
        self.controlling_color = None;
    }
}

/// The arena's territories in registration order.
///
/// Order matters: end-of-match ties go to the color encountered first.
pub fn default_layout() -> Vec<Territory> {
    vec![
        Territory::new("territory-0", Vector3::new(0.0, 0.0, 0.0), 4.0),
        Territory::new("territory-1", Vector3::new(12.0, 0.0, 12.0), 3.0),
        Territory::new("territory-2", Vector3::new(-12.0, 0.0, 12.0), 3.0),
        Territory::new("territory-3", Vector3::new(-12.0, 0.0, -12.0), 3.0),
        Territory::new("territory-4", Vector3::new(12.0, 0.0, -12.0), 3.0),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_starts_neutral_with_unique_ids() {
        let layout = default_layout();
        assert_eq!(layout.len(), 5);
        assert!(layout
            .iter()
            .all(|t| t.points == 0.0 && t.controlling_color.is_none()));

        let mut ids: Vec<_> = layout.iter().map(|t| t.id.as_str()).collect();
        ids.dedup();
        assert_eq!(ids.len(), layout.len());
    }

    #[test]
    fn serializes_camel_case() {
        let mut territory = Territory::new("t", Vector3::new(1.0, 2.0, 3.0), 2.5);
        territory.controlling_color = Some("#4dabff".to_string());
        let value = serde_json::to_value(&territory).unwrap();
        assert_eq!(value["controllingColor"], "#4dabff");
        assert_eq!(value["radius"], 2.5);
    }
}
