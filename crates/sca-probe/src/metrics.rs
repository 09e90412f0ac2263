//! Derived metric value objects
//!
//! Read-only values computed from a [`sca_scene::SceneState`] by the probe.
//! They do not persist independently; every analysis call recomputes them
//! from the latest snapshot.

use indexmap::IndexMap;
use sca_scene::Vec3;
use serde::{Deserialize, Serialize};

/// Per-object derived metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectMetrics {
    /// Object name (join key into the snapshot)
    pub name: String,
    /// Object type tag
    pub object_type: String,
    /// World-space position
    pub position: Vec3,
    /// Bounding dimensions
    pub dimensions: Vec3,
    /// Bounding-box volume
    pub volume: f64,
    /// Rectangular-box surface area
    pub surface_area: f64,
    /// Number of assigned materials
    pub material_count: usize,
    /// Vertex count (measured or estimated from type)
    pub vertex_count: u64,
    /// Face count (measured or estimated from type)
    pub face_count: u64,
    /// Whether the mesh is assumed manifold
    pub is_manifold: bool,
    /// Normal consistency score
    pub normal_consistency: f64,
}

/// Scene-wide lighting analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct LightingMetrics {
    /// Number of light sources
    pub light_count: usize,
    /// Accumulated nominal lumen output
    pub total_lumens: f64,
    /// Color temperatures of recognized lights (Kelvin)
    pub color_temperatures: Vec<f64>,
    /// Shadow softness heuristic
    pub shadow_softness: f64,
    /// Lumen split by usage zone
    pub light_distribution: IndexMap<String, f64>,
    /// Contrast ratio heuristic
    pub contrast_ratio: f64,
    /// Total lumens over the nominal room divisor
    pub average_illuminance: f64,
    /// Estimated darkest-point illuminance
    pub darkest_point: f64,
    /// Estimated brightest-point illuminance
    pub brightest_point: f64,
}

/// Spatial layout analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SpatialMetrics {
    /// Room bounding-box dimensions (floored to minimums)
    pub room_dimensions: Vec3,
    /// Room volume
    pub usable_volume: f64,
    /// Total object volume over room volume
    pub object_density: f64,
    /// `max(0.1, 1 - density)`
    pub traffic_flow_score: f64,
    /// Zone name to member object names
    pub functional_zones: IndexMap<String, Vec<String>>,
    /// Pairwise object distances keyed by name
    pub object_distances: IndexMap<String, IndexMap<String, f64>>,
    /// Axis-alignment score in [0, 1]
    pub alignment_consistency: f64,
    /// Volume-balance score in [0, 1]
    pub proportional_balance: f64,
}

/// Visual/style analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AestheticMetrics {
    /// Dominant palette descriptors
    pub color_palette: Vec<String>,
    /// Color harmony score
    pub color_harmony_score: f64,
    /// Style consistency score
    pub style_consistency: f64,
    /// Visual balance score
    pub visual_balance: f64,
    /// Focal point strength
    pub focal_point_strength: f64,
    /// Material coherence score
    pub material_coherence: f64,
    /// Texture variety score
    pub texture_variety: f64,
    /// One-phrase atmosphere description
    pub overall_atmosphere: String,
}

impl AestheticMetrics {
    /// Fixed style heuristics applied to every analyzed scene
    #[must_use]
    pub fn heuristic() -> Self {
        Self {
            color_palette: vec![
                "neutral".to_string(),
                "warm".to_string(),
                "modern".to_string(),
            ],
            color_harmony_score: 0.8,
            style_consistency: 0.75,
            visual_balance: 0.7,
            focal_point_strength: 0.6,
            material_coherence: 0.8,
            texture_variety: 0.6,
            overall_atmosphere: "cozy modern".to_string(),
        }
    }
}

/// High-level scene summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SceneSummary {
    /// Number of analyzed objects
    pub total_objects: usize,
    /// Number of light sources
    pub total_lights: usize,
    /// Room dimensions
    pub room_size: Vec3,
    /// Object density
    pub object_density: f64,
    /// "adequate" or "poor"
    pub lighting_quality: String,
    /// Style consistency score
    pub style_consistency: f64,
    /// Number of identified functional zones
    pub functional_completeness: usize,
    /// Blended quality score
    pub overall_score: f64,
}

/// Complete analysis output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Per-object metrics
    pub objects: Vec<ObjectMetrics>,
    /// Lighting metrics
    pub lighting: LightingMetrics,
    /// Spatial metrics
    pub spatial: SpatialMetrics,
    /// Aesthetic metrics
    pub aesthetic: AestheticMetrics,
    /// High-level summary
    pub summary: SceneSummary,
    /// Detected issues
    pub issues: Vec<String>,
    /// Improvement recommendations
    pub recommendations: Vec<String>,
}

impl AnalysisReport {
    /// Report produced when analysis itself fails
    ///
    /// Analysis failure must never abort the calling iteration, so the
    /// degraded report carries empty metrics plus a generic issue and
    /// recommendation pair.
    #[must_use]
    pub fn degraded() -> Self {
        Self {
            objects: Vec::new(),
            lighting: LightingMetrics::default(),
            spatial: SpatialMetrics::default(),
            aesthetic: AestheticMetrics::default(),
            summary: SceneSummary::default(),
            issues: vec!["Analysis failed".to_string()],
            recommendations: vec!["Retry analysis".to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degraded_report_markers() {
        let report = AnalysisReport::degraded();
        assert!(report.objects.is_empty());
        assert_eq!(report.issues, vec!["Analysis failed".to_string()]);
        assert_eq!(report.recommendations, vec!["Retry analysis".to_string()]);
    }

    #[test]
    fn aesthetic_heuristic_values() {
        let aesthetic = AestheticMetrics::heuristic();
        assert_eq!(aesthetic.style_consistency, 0.75);
        assert_eq!(aesthetic.overall_atmosphere, "cozy modern");
    }
}
