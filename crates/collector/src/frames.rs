//! Game WebSocket frames.
//!
//! Inbound frames are `{"type": "...", "data": {...}}`. Only the four
//! types below are understood; anything else (unknown type, invalid JSON,
//! missing fields) parses to `None` and is dropped by the ingestor.

use serde::{Deserialize, Serialize};
use slotwatch_core::metric_names::{
    MSG_TYPE_PATHFINDING_METRICS, MSG_TYPE_PERFORMANCE_UPDATE, MSG_TYPE_RESOURCE_METRICS,
    MSG_TYPE_SELECTION_METRICS, MSG_TYPE_SUBSCRIBE,
};
use slotwatch_core::sample::{Category, GameplaySnapshot, Sample, SampleSource, Slot};
use slotwatch_core::types::Timestamp;

/// Outbound subscription request sent right after connecting.
#[derive(Debug, Serialize)]
pub struct SubscribeFrame<'a> {
    r#type: &'static str,
    channels: &'a [String],
}

impl<'a> SubscribeFrame<'a> {
    pub fn new(channels: &'a [String]) -> Self {
        Self {
            r#type: MSG_TYPE_SUBSCRIBE,
            channels,
        }
    }
}

/// Envelope shared by every inbound frame.
#[derive(Debug, Deserialize)]
struct RawFrame {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PerformanceData {
    fps: Option<f64>,
    #[serde(alias = "frame_time", alias = "frameTimeMs")]
    frame_time: Option<f64>,
    #[serde(alias = "entity_count", alias = "entities")]
    entity_count: Option<f64>,
    #[serde(alias = "memory_usage", alias = "memoryUsageMb")]
    memory_usage: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimingData {
    #[serde(alias = "average_time", alias = "avgTime")]
    average_time: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceData {
    #[serde(alias = "memory_usage", alias = "memoryUsageMb")]
    memory_usage: f64,
}

/// A recognised inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum GameFrame {
    Performance(GameplaySnapshot),
    Pathfinding { average_time_ms: f64 },
    Selection { average_time_ms: f64 },
    Resources { memory_usage_mb: f64 },
}

impl GameFrame {
    /// Parse a text frame. Returns `None` for anything not understood.
    pub fn parse(text: &str) -> Option<Self> {
        let raw: RawFrame = serde_json::from_str(text).ok()?;
        match raw.kind.as_str() {
            MSG_TYPE_PERFORMANCE_UPDATE => {
                let data: PerformanceData = serde_json::from_value(raw.data).ok()?;
                Some(GameFrame::Performance(GameplaySnapshot {
                    fps: data.fps,
                    frame_time_ms: data.frame_time,
                    entity_count: data.entity_count,
                    memory_usage_mb: data.memory_usage,
                    received_at: None,
                }))
            }
            MSG_TYPE_PATHFINDING_METRICS => {
                let data: TimingData = serde_json::from_value(raw.data).ok()?;
                Some(GameFrame::Pathfinding {
                    average_time_ms: data.average_time,
                })
            }
            MSG_TYPE_SELECTION_METRICS => {
                let data: TimingData = serde_json::from_value(raw.data).ok()?;
                Some(GameFrame::Selection {
                    average_time_ms: data.average_time,
                })
            }
            MSG_TYPE_RESOURCE_METRICS => {
                let data: ResourceData = serde_json::from_value(raw.data).ok()?;
                Some(GameFrame::Resources {
                    memory_usage_mb: data.memory_usage,
                })
            }
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            GameFrame::Performance(_) => MSG_TYPE_PERFORMANCE_UPDATE,
            GameFrame::Pathfinding { .. } => MSG_TYPE_PATHFINDING_METRICS,
            GameFrame::Selection { .. } => MSG_TYPE_SELECTION_METRICS,
            GameFrame::Resources { .. } => MSG_TYPE_RESOURCE_METRICS,
        }
    }

    /// Only performance updates drive threshold evaluation.
    pub fn triggers_evaluation(&self) -> bool {
        matches!(self, GameFrame::Performance(_))
    }

    pub fn samples(&self, timestamp: Timestamp) -> Vec<Sample> {
        let single = |category, value| {
            vec![Sample::new(
                Slot::Game,
                category,
                value,
                timestamp,
                SampleSource::Stream,
            )]
        };
        match self {
            GameFrame::Performance(snapshot) => snapshot.samples(timestamp),
            GameFrame::Pathfinding { average_time_ms } => {
                single(Category::PathfindingTime, *average_time_ms)
            }
            GameFrame::Selection { average_time_ms } => {
                single(Category::SelectionTime, *average_time_ms)
            }
            GameFrame::Resources { memory_usage_mb } => {
                single(Category::MemoryUsage, *memory_usage_mb)
            }
        }
    }
}
