//! Map geometry derived from the event log
//!
//! Pure derivation, recomputed on every log change: per-device polylines
//! grouped by IMEI, one classified marker per event, and the mapping from
//! widget clicks to plane coordinates.

use crate::domain::{EventClass, Imei, MapSelection, SimulationEvent};
use chrono::Utc;
use rustc_hash::FxHashMap;

/// Side length of the logical map plane (a 0-400 unit square)
pub const PLANE_MAX: f64 = 400.0;

/// Ordered path of one device through the plane
#[derive(Debug, Clone)]
pub struct DevicePath {
    pub imei: Imei,
    pub points: Vec<(f64, f64)>,
}

/// One colored dot per event
#[derive(Debug, Clone, Copy)]
pub struct Marker {
    pub x: f64,
    pub y: f64,
    pub class: EventClass,
}

/// Derived map geometry
#[derive(Debug, Clone, Default)]
pub struct Projection {
    pub paths: Vec<DevicePath>,
    pub markers: Vec<Marker>,
}

/// Group events into per-device polylines and classified markers.
///
/// Devices appear in first-arrival order; points within a path keep arrival
/// order. A device with a single point yields a degenerate path (no line
/// segment is drawn for it).
pub fn project(events: &[SimulationEvent]) -> Projection {
    let mut index: FxHashMap<&str, usize> = FxHashMap::default();
    let mut paths: Vec<DevicePath> = Vec::new();
    let mut markers: Vec<Marker> = Vec::with_capacity(events.len());

    for event in events {
        let idx = *index.entry(event.imei.as_str()).or_insert_with(|| {
            paths.push(DevicePath { imei: event.imei.clone(), points: Vec::new() });
            paths.len() - 1
        });
        paths[idx].points.push((event.x, event.y));

        markers.push(Marker { x: event.x, y: event.y, class: event.class() });
    }

    Projection { paths, markers }
}

/// Map a pointer position inside the rendered map bounds to plane
/// coordinates.
///
/// `px`/`py` are measured from the top-left corner of the rendered area of
/// `width` x `height`. The position is linearly rescaled to the 0-400 plane
/// and rounded to the nearest integer, so the exact center maps to
/// (200, 200) at any rendered size.
pub fn plane_from_click(px: f64, py: f64, width: f64, height: f64) -> Option<MapSelection> {
    if width <= 0.0 || height <= 0.0 {
        return None;
    }
    if px < 0.0 || py < 0.0 || px > width || py > height {
        return None;
    }

    let x = (px * PLANE_MAX / width).round() as i32;
    let y = (py * PLANE_MAX / height).round() as i32;
    Some(MapSelection { x, y, ts: Utc::now().timestamp_millis() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ConnectOutcome;

    fn event(imei: &str, x: f64, y: f64, error: Option<&str>, detail: Option<&str>) -> SimulationEvent {
        SimulationEvent {
            timestamp: "2024-05-01 12:00:00".to_string(),
            imei: Imei(imei.to_string()),
            x,
            y,
            response: ConnectOutcome {
                detail: detail.map(str::to_string),
                error: error.map(str::to_string),
            },
        }
    }

    #[test]
    fn test_project_groups_by_imei_in_arrival_order() {
        let events = vec![
            event("b", 1.0, 1.0, None, None),
            event("a", 2.0, 2.0, None, None),
            event("b", 3.0, 3.0, None, None),
        ];
        let projection = project(&events);

        assert_eq!(projection.paths.len(), 2);
        assert_eq!(projection.paths[0].imei.as_str(), "b");
        assert_eq!(projection.paths[0].points, vec![(1.0, 1.0), (3.0, 3.0)]);
        assert_eq!(projection.paths[1].imei.as_str(), "a");
        assert_eq!(projection.paths[1].points, vec![(2.0, 2.0)]);
    }

    #[test]
    fn test_project_one_marker_per_event() {
        let events = vec![
            event("a", 1.0, 1.0, None, Some("Connected successfully to BTS_1")),
            event("a", 2.0, 2.0, None, Some("Handover to BTS_2")),
            event("a", 3.0, 3.0, Some("Connect timeout"), Some("handover pending")),
        ];
        let projection = project(&events);

        assert_eq!(projection.markers.len(), 3);
        assert_eq!(projection.markers[0].class, EventClass::Success);
        assert_eq!(projection.markers[1].class, EventClass::Handover);
        // Error takes precedence over a handover detail
        assert_eq!(projection.markers[2].class, EventClass::Error);
    }

    #[test]
    fn test_single_point_path_is_degenerate() {
        let projection = project(&[event("a", 5.0, 5.0, None, None)]);
        assert_eq!(projection.paths.len(), 1);
        assert_eq!(projection.paths[0].points.len(), 1);
        assert_eq!(projection.markers.len(), 1);
    }

    #[test]
    fn test_click_center_maps_to_plane_center() {
        for (w, h) in [(400.0, 400.0), (800.0, 600.0), (37.0, 11.0)] {
            let sel = plane_from_click(w / 2.0, h / 2.0, w, h).unwrap();
            assert_eq!((sel.x, sel.y), (200, 200), "size {}x{}", w, h);
        }
    }

    #[test]
    fn test_click_corners() {
        let sel = plane_from_click(0.0, 0.0, 120.0, 80.0).unwrap();
        assert_eq!((sel.x, sel.y), (0, 0));
        let sel = plane_from_click(120.0, 80.0, 120.0, 80.0).unwrap();
        assert_eq!((sel.x, sel.y), (400, 400));
    }

    #[test]
    fn test_click_rounds_to_nearest() {
        // 800-wide render: 1px -> plane 0.5, 3px -> plane 1.5
        let sel = plane_from_click(1.0, 1.0, 800.0, 800.0).unwrap();
        assert_eq!((sel.x, sel.y), (1, 1));
        let sel = plane_from_click(3.0, 3.0, 800.0, 800.0).unwrap();
        assert_eq!((sel.x, sel.y), (2, 2));
    }

    #[test]
    fn test_click_outside_bounds_rejected() {
        assert!(plane_from_click(-1.0, 5.0, 100.0, 100.0).is_none());
        assert!(plane_from_click(5.0, 101.0, 100.0, 100.0).is_none());
        assert!(plane_from_click(5.0, 5.0, 0.0, 100.0).is_none());
    }
}
