//! Metric samples: one timestamped observation of one category from one slot.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// Which instance produced a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    Blue,
    Green,
    /// The live game instance reached over the streaming connection.
    Game,
}

impl Slot {
    pub const DEPLOYMENTS: [Slot; 2] = [Slot::Blue, Slot::Green];

    pub fn as_str(self) -> &'static str {
        match self {
            Slot::Blue => "blue",
            Slot::Green => "green",
            Slot::Game => "game",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named metric channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// 1 = healthy, 0 = unhealthy.
    Health,
    /// Health check round-trip time in milliseconds.
    Latency,
    Fps,
    /// Milliseconds per frame.
    FrameTime,
    EntityCount,
    /// Megabytes.
    MemoryUsage,
    /// Milliseconds per pathfinding request.
    PathfindingTime,
    /// Milliseconds per selection.
    SelectionTime,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Health,
        Category::Latency,
        Category::Fps,
        Category::FrameTime,
        Category::EntityCount,
        Category::MemoryUsage,
        Category::PathfindingTime,
        Category::SelectionTime,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Health => "health",
            Category::Latency => "latency",
            Category::Fps => "fps",
            Category::FrameTime => "frame_time",
            Category::EntityCount => "entity_count",
            Category::MemoryUsage => "memory_usage",
            Category::PathfindingTime => "pathfinding_time",
            Category::SelectionTime => "selection_time",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a sample was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleSource {
    Poll,
    Stream,
}

/// A single immutable observation.
///
/// Fields are private; once built, a sample can only be read. Diagnostic
/// details are attached with the `with_*` builders before the sample is
/// handed to the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    slot: Slot,
    category: Category,
    value: f64,
    timestamp: Timestamp,
    source: SampleSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl Sample {
    pub fn new(
        slot: Slot,
        category: Category,
        value: f64,
        timestamp: Timestamp,
        source: SampleSource,
    ) -> Self {
        Self {
            slot,
            category,
            value,
            timestamp,
            source,
            status_code: None,
            error: None,
        }
    }

    /// Boolean samples are stored as 0/1.
    pub fn flag(
        slot: Slot,
        category: Category,
        up: bool,
        timestamp: Timestamp,
        source: SampleSource,
    ) -> Self {
        Self::new(slot, category, if up { 1.0 } else { 0.0 }, timestamp, source)
    }

    pub fn with_status_code(mut self, status_code: Option<u16>) -> Self {
        self.status_code = status_code;
        self
    }

    pub fn with_error(mut self, error: Option<String>) -> Self {
        self.error = error;
        self
    }

    pub fn slot(&self) -> Slot {
        self.slot
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn source(&self) -> SampleSource {
        self.source
    }

    pub fn status_code(&self) -> Option<u16> {
        self.status_code
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Structured gameplay bundle carried by a `performance_update` frame.
///
/// Any field may be missing from a frame; missing fields produce no sample.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameplaySnapshot {
    pub fps: Option<f64>,
    pub frame_time_ms: Option<f64>,
    pub entity_count: Option<f64>,
    pub memory_usage_mb: Option<f64>,
    pub received_at: Option<Timestamp>,
}

impl GameplaySnapshot {
    /// Fan the bundle out into one stream sample per present field.
    pub fn samples(&self, timestamp: Timestamp) -> Vec<Sample> {
        [
            (Category::Fps, self.fps),
            (Category::FrameTime, self.frame_time_ms),
            (Category::EntityCount, self.entity_count),
            (Category::MemoryUsage, self.memory_usage_mb),
        ]
        .into_iter()
        .filter_map(|(category, value)| {
            value.map(|v| Sample::new(Slot::Game, category, v, timestamp, SampleSource::Stream))
        })
        .collect()
    }
}
