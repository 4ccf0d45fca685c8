//! Sensor-driven point-of-interest tracking.
//!
//! `PoiScene` is the pure state machine: it reacts to position and
//! orientation events by re-deriving the full render set, so the projection
//! and filtering logic stays independently testable. `PoiTracker` wraps a
//! scene in channels for callback-style sensor sources: events go in
//! through a `SensorHandle`, frames come out through a `watch` receiver,
//! and dropping every handle tears the tracker down.

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::geo::filter::{filter_visible, ProjectedPoint};
use crate::geo::poi::PointOfInterest;
use crate::geo::position::{GeoPosition, Orientation, PositionError, FALLBACK_ORIGIN};

/// Buffer size for the inbound sensor event channel.
const SENSOR_CHANNEL_CAPACITY: usize = 32;

/// Visibility window in meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeConfig {
    pub min_distance: f64,
    pub max_distance: f64,
}

impl Default for RangeConfig {
    fn default() -> Self {
        Self {
            min_distance: 10.0,
            max_distance: 1000.0,
        }
    }
}

/// One event from the sensor streams. Position and orientation arrive as
/// independent, unordered streams.
#[derive(Debug, Clone)]
pub enum SensorEvent {
    Position(GeoPosition),
    Orientation(Orientation),
    /// The positioning collaborator failed to deliver a fix.
    PositionLost(PositionError),
}

/// What the renderer consumes each frame.
#[derive(Debug, Clone)]
pub struct Frame {
    pub origin: GeoPosition,
    pub orientation: Option<Orientation>,
    pub points: Vec<ProjectedPoint>,
    /// True while no real fix has ever been obtained and the fallback
    /// origin is substituted.
    pub using_fallback: bool,
}

// ============================================================================
// Scene
// ============================================================================

pub struct PoiScene {
    points: Vec<PointOfInterest>,
    range: RangeConfig,
    /// Latest real fix; `None` until one arrives.
    origin: Option<GeoPosition>,
    orientation: Option<Orientation>,
    visible: Vec<ProjectedPoint>,
}

impl PoiScene {
    pub fn new(points: Vec<PointOfInterest>, range: RangeConfig) -> Self {
        let mut scene = Self {
            points,
            range,
            origin: None,
            orientation: None,
            visible: Vec::new(),
        };
        scene.recompute();
        scene
    }

    /// Apply one sensor event. Every event triggers a full synchronous
    /// recomputation of the render set; no partial state is carried over.
    pub fn on_event(&mut self, event: SensorEvent) {
        match event {
            SensorEvent::Position(fix) => {
                self.origin = Some(fix);
            }
            SensorEvent::Orientation(orientation) => {
                self.orientation = Some(orientation);
            }
            SensorEvent::PositionLost(err) => {
                // Degrade to the fallback origin only when no real fix was
                // ever obtained; an earlier good fix keeps serving.
                warn!(category = err.category(), "Position fix lost");
            }
        }
        self.recompute();
    }

    fn recompute(&mut self) {
        let origin = self.effective_origin();
        self.visible = filter_visible(
            &origin,
            &self.points,
            self.range.min_distance,
            self.range.max_distance,
        );
        debug!(
            visible = self.visible.len(),
            total = self.points.len(),
            fallback = self.origin.is_none(),
            "Render set recomputed"
        );
    }

    /// The origin points are currently projected from.
    pub fn effective_origin(&self) -> GeoPosition {
        self.origin.unwrap_or(FALLBACK_ORIGIN)
    }

    pub fn visible(&self) -> &[ProjectedPoint] {
        &self.visible
    }

    pub fn frame(&self) -> Frame {
        Frame {
            origin: self.effective_origin(),
            orientation: self.orientation,
            points: self.visible.clone(),
            using_fallback: self.origin.is_none(),
        }
    }
}

// ============================================================================
// Tracker
// ============================================================================

/// Sender half of the sensor feed. Clone freely for independent sources;
/// the tracker shuts down once every handle is dropped.
#[derive(Clone)]
pub struct SensorHandle {
    tx: mpsc::Sender<SensorEvent>,
}

impl SensorHandle {
    /// Push one event. Returns false when the tracker has shut down.
    pub async fn send(&self, event: SensorEvent) -> bool {
        self.tx.send(event).await.is_ok()
    }
}

pub struct PoiTracker {
    sensors: SensorHandle,
    frames: watch::Receiver<Frame>,
    task: JoinHandle<()>,
}

impl PoiTracker {
    /// Drive a scene from channel-fed sensor events.
    pub fn spawn(scene: PoiScene) -> Self {
        let (tx, mut rx) = mpsc::channel(SENSOR_CHANNEL_CAPACITY);
        let (frame_tx, frames) = watch::channel(scene.frame());

        let task = tokio::spawn(async move {
            let mut scene = scene;
            while let Some(event) = rx.recv().await {
                scene.on_event(event);
                if frame_tx.send(scene.frame()).is_err() {
                    // Every renderer unsubscribed.
                    break;
                }
            }
            debug!("Sensor feed closed, tracker stopped");
        });

        Self {
            sensors: SensorHandle { tx },
            frames,
            task,
        }
    }

    pub fn sensors(&self) -> SensorHandle {
        self.sensors.clone()
    }

    pub fn frames(&self) -> watch::Receiver<Frame> {
        self.frames.clone()
    }

    /// Drop the tracker's own sensor handle and wait for the drive task to
    /// finish. Outstanding handle clones keep the tracker alive until they
    /// are dropped too.
    pub async fn shutdown(self) {
        drop(self.sensors);
        drop(self.frames);
        let _ = self.task.await;
    }
}

// ============================================================================
// Tests
// ============================================================================
