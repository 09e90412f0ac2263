//! Scene analysis engine
//!
//! Derives lighting, spatial, and aesthetic metrics from a scene snapshot and
//! emits threshold-based issues and recommendations. All derivations are
//! deterministic; the thresholds are part of the contract and covered by the
//! tests below.

use crate::error::ProbeError;
use crate::metrics::{
    AestheticMetrics, AnalysisReport, LightingMetrics, ObjectMetrics, SceneSummary, SpatialMetrics,
};
use indexmap::IndexMap;
use sca_scene::{SceneParser, SceneState};

/// Nominal room divisor used to turn total lumens into illuminance
const ROOM_ILLUMINANCE_DIVISOR: f64 = 20.0;

/// Minimum room extents, meters (x, y, ceiling)
const MIN_ROOM: [f64; 3] = [5.0, 5.0, 2.5];

/// Zone keyword sets, checked in declaration order; first match wins
const ZONE_KEYWORDS: &[(&str, &[&str])] = &[
    ("kitchen", &["table", "chair", "counter", "stove", "sink"]),
    ("living", &["sofa", "couch", "tv", "television", "coffee"]),
    ("bedroom", &["bed", "nightstand", "lamp"]),
];

/// Deep analysis engine over scene snapshots
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvironmentProbe {
    parser: SceneParser,
}

impl EnvironmentProbe {
    /// Create a new probe
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            parser: SceneParser::new(),
        }
    }

    /// Analyze a raw scene description
    ///
    /// Degrades gracefully: an internal failure yields
    /// [`AnalysisReport::degraded`] instead of an error, so analysis can never
    /// abort the calling iteration.
    #[must_use]
    pub fn analyze(&self, raw: &str) -> AnalysisReport {
        self.analyze_state(&self.parser.parse(raw))
    }

    /// Analyze an already-parsed snapshot
    #[must_use]
    pub fn analyze_state(&self, state: &SceneState) -> AnalysisReport {
        match analyze_inner(state) {
            Ok(report) => report,
            Err(err) => {
                tracing::warn!("scene analysis failed: {err}");
                AnalysisReport::degraded()
            }
        }
    }
}

fn analyze_inner(state: &SceneState) -> Result<AnalysisReport, ProbeError> {
    let objects = object_metrics(state);
    let lighting = lighting_metrics(state);
    let spatial = spatial_metrics(&objects)?;
    let aesthetic = AestheticMetrics::heuristic();

    let summary = summarize(&objects, &lighting, &spatial, &aesthetic);
    ensure_finite(summary.overall_score, "overall_score")?;

    let issues = identify_issues(&lighting, &spatial, &aesthetic);
    let recommendations = recommend(&lighting, &spatial, &aesthetic);

    Ok(AnalysisReport {
        objects,
        lighting,
        spatial,
        aesthetic,
        summary,
        issues,
        recommendations,
    })
}

fn object_metrics(state: &SceneState) -> Vec<ObjectMetrics> {
    state
        .objects
        .iter()
        .map(|obj| {
            let [dx, dy, dz] = obj.dimensions;
            let volume = dx * dy * dz;
            let surface_area = 2.0 * (dx * dy + dy * dz + dz * dx);

            let vertex_count = if obj.vertex_count > 0 {
                obj.vertex_count
            } else {
                estimate_vertex_count(&obj.object_type, obj.dimensions)
            };
            let face_count = if obj.face_count > 0 {
                obj.face_count
            } else {
                estimate_face_count(&obj.object_type, obj.dimensions)
            };

            ObjectMetrics {
                name: obj.name.clone(),
                object_type: obj.object_type.clone(),
                position: obj.location,
                dimensions: obj.dimensions,
                volume,
                surface_area,
                material_count: obj.materials.len(),
                vertex_count,
                face_count,
                is_manifold: true,
                normal_consistency: 1.0,
            }
        })
        .collect()
}

fn lighting_metrics(state: &SceneState) -> LightingMetrics {
    // Lights come from the light collection plus any object whose type tag
    // identifies it as a light source.
    let light_types = state
        .lights
        .iter()
        .map(|l| l.light_type.to_lowercase())
        .chain(
            state
                .objects
                .iter()
                .map(|o| o.object_type.to_lowercase())
                .filter(|t| t.contains("light")),
        )
        .collect::<Vec<_>>();

    let mut total_lumens = 0.0;
    let mut color_temperatures = Vec::new();
    for light_type in &light_types {
        // Nominal per-type contributions; unrecognized types add nothing.
        if light_type.contains("sun") {
            total_lumens += 100_000.0;
            color_temperatures.push(5500.0);
        } else if light_type.contains("point") {
            total_lumens += 800.0;
            color_temperatures.push(2700.0);
        } else if light_type.contains("area") {
            total_lumens += 2000.0;
            color_temperatures.push(4000.0);
        }
    }

    let average_illuminance = total_lumens / ROOM_ILLUMINANCE_DIVISOR;
    let mut light_distribution = IndexMap::new();
    light_distribution.insert("general".to_string(), total_lumens * 0.6);
    light_distribution.insert("task".to_string(), total_lumens * 0.3);
    light_distribution.insert("accent".to_string(), total_lumens * 0.1);

    LightingMetrics {
        light_count: light_types.len(),
        total_lumens,
        color_temperatures,
        shadow_softness: 0.7,
        light_distribution,
        contrast_ratio: 3.0,
        average_illuminance,
        darkest_point: average_illuminance * 0.1,
        brightest_point: average_illuminance * 3.0,
    }
}

fn spatial_metrics(objects: &[ObjectMetrics]) -> Result<SpatialMetrics, ProbeError> {
    let mut min = [f64::INFINITY; 3];
    let mut max = [f64::NEG_INFINITY; 3];
    for obj in objects {
        for axis in 0..3 {
            min[axis] = min[axis].min(obj.position[axis] - obj.dimensions[axis] / 2.0);
            max[axis] = max[axis].max(obj.position[axis] + obj.dimensions[axis] / 2.0);
        }
    }

    // Extents floored so 0-1 objects never produce a degenerate room.
    let room_dimensions = [
        (max[0] - min[0]).max(MIN_ROOM[0]),
        (max[1] - min[1]).max(MIN_ROOM[1]),
        (max[2] - min[2]).max(MIN_ROOM[2]),
    ];
    let usable_volume = room_dimensions[0] * room_dimensions[1] * room_dimensions[2];

    let total_object_volume: f64 = objects.iter().map(|o| o.volume).sum();
    let object_density = total_object_volume / usable_volume;
    ensure_finite(object_density, "object_density")?;

    Ok(SpatialMetrics {
        room_dimensions,
        usable_volume,
        object_density,
        traffic_flow_score: (1.0 - object_density).max(0.1),
        functional_zones: functional_zones(objects),
        object_distances: object_distances(objects),
        alignment_consistency: alignment_consistency(objects),
        proportional_balance: proportional_balance(objects),
    })
}

fn functional_zones(objects: &[ObjectMetrics]) -> IndexMap<String, Vec<String>> {
    let mut zones: IndexMap<String, Vec<String>> = IndexMap::new();
    for obj in objects {
        let lowered = obj.name.to_lowercase();
        for (zone, keywords) in ZONE_KEYWORDS {
            if keywords.iter().any(|kw| lowered.contains(kw)) {
                zones.entry((*zone).to_string()).or_default().push(obj.name.clone());
                break;
            }
        }
    }
    zones
}

fn object_distances(objects: &[ObjectMetrics]) -> IndexMap<String, IndexMap<String, f64>> {
    let mut distances = IndexMap::new();
    for a in objects {
        let mut row = IndexMap::new();
        for b in objects {
            if a.name == b.name {
                continue;
            }
            let d = (a.position[0] - b.position[0]).powi(2)
                + (a.position[1] - b.position[1]).powi(2)
                + (a.position[2] - b.position[2]).powi(2);
            row.insert(b.name.clone(), d.sqrt());
        }
        distances.insert(a.name.clone(), row);
    }
    distances
}

fn alignment_consistency(objects: &[ObjectMetrics]) -> f64 {
    if objects.len() < 2 {
        return 1.0;
    }

    let n = objects.len() as f64;
    let mut variance_sum = [0.0; 3];
    for axis in 0..3 {
        let mean: f64 = objects.iter().map(|o| o.position[axis]).sum::<f64>() / n;
        variance_sum[axis] = objects
            .iter()
            .map(|o| (o.position[axis] - mean).powi(2))
            .sum();
    }

    let max_variance = variance_sum
        .into_iter()
        .fold(f64::NEG_INFINITY, f64::max)
        + 1e-6;
    (1.0 - max_variance / (max_variance + 1.0)).clamp(0.0, 1.0)
}

fn proportional_balance(objects: &[ObjectMetrics]) -> f64 {
    if objects.len() < 2 {
        return 1.0;
    }

    let total_volume: f64 = objects.iter().map(|o| o.volume).sum();
    if total_volume == 0.0 {
        return 1.0;
    }

    let n = objects.len() as f64;
    let avg_volume = total_volume / n;
    let variance: f64 = objects
        .iter()
        .map(|o| (o.volume - avg_volume).powi(2))
        .sum::<f64>()
        / n;

    (1.0 - variance / (avg_volume.powi(2) + 1e-6)).clamp(0.0, 1.0)
}

fn summarize(
    objects: &[ObjectMetrics],
    lighting: &LightingMetrics,
    spatial: &SpatialMetrics,
    aesthetic: &AestheticMetrics,
) -> SceneSummary {
    let lighting_quality = if lighting.average_illuminance > 100.0 {
        "adequate"
    } else {
        "poor"
    };

    SceneSummary {
        total_objects: objects.len(),
        total_lights: lighting.light_count,
        room_size: spatial.room_dimensions,
        object_density: spatial.object_density,
        lighting_quality: lighting_quality.to_string(),
        style_consistency: aesthetic.style_consistency,
        functional_completeness: spatial.functional_zones.len(),
        overall_score: (aesthetic.style_consistency
            + spatial.proportional_balance
            + lighting.average_illuminance / 500.0)
            / 3.0,
    }
}

fn identify_issues(
    lighting: &LightingMetrics,
    spatial: &SpatialMetrics,
    aesthetic: &AestheticMetrics,
) -> Vec<String> {
    let mut issues = Vec::new();

    if lighting.average_illuminance < 100.0 {
        issues.push("Insufficient lighting".to_string());
    }
    if lighting.contrast_ratio > 10.0 {
        issues.push("Lighting contrast too high".to_string());
    }
    if spatial.object_density > 0.3 {
        issues.push("Scene too cluttered".to_string());
    }
    if spatial.traffic_flow_score < 0.5 {
        issues.push("Poor traffic flow".to_string());
    }
    if aesthetic.style_consistency < 0.6 {
        issues.push("Inconsistent style".to_string());
    }
    if aesthetic.visual_balance < 0.5 {
        issues.push("Poor visual balance".to_string());
    }

    issues
}

fn recommend(
    lighting: &LightingMetrics,
    spatial: &SpatialMetrics,
    aesthetic: &AestheticMetrics,
) -> Vec<String> {
    let mut recommendations = Vec::new();

    if lighting.average_illuminance < 100.0 {
        recommendations.push("Add ambient lighting".to_string());
    }
    if lighting.light_count < 2 {
        recommendations.push("Add task lighting".to_string());
    }
    if spatial.object_density > 0.3 {
        recommendations.push("Reduce object density".to_string());
    }
    if spatial.functional_zones.len() < 3 {
        recommendations.push("Define more functional zones".to_string());
    }
    if aesthetic.style_consistency < 0.6 {
        recommendations.push("Unify material styles".to_string());
    }

    recommendations
}

fn estimate_vertex_count(object_type: &str, dimensions: [f64; 3]) -> u64 {
    let base: f64 = match object_type.to_lowercase().as_str() {
        "cube" => 8.0,
        "sphere" => 32.0,
        "cylinder" => 24.0,
        "plane" => 4.0,
        "monkey" => 500.0,
        _ => 8.0,
    };
    let size_factor = dimensions.iter().sum::<f64>() / 3.0;
    (base * size_factor.max(1.0)) as u64
}

fn estimate_face_count(object_type: &str, dimensions: [f64; 3]) -> u64 {
    let base: f64 = match object_type.to_lowercase().as_str() {
        "cube" => 6.0,
        "sphere" => 32.0,
        "cylinder" => 12.0,
        "plane" => 1.0,
        "monkey" => 500.0,
        _ => 6.0,
    };
    let size_factor = dimensions.iter().sum::<f64>() / 3.0;
    (base * size_factor.max(1.0)) as u64
}

fn ensure_finite(value: f64, metric: &'static str) -> Result<(), ProbeError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ProbeError::NonFiniteMetric(metric))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sca_scene::{SceneLight, SceneObject};

    fn state_with_objects(objects: Vec<SceneObject>) -> SceneState {
        let mut state = SceneState::empty();
        state.objects = objects;
        state
    }

    fn object_at(name: &str, position: [f64; 3], dimensions: [f64; 3]) -> SceneObject {
        let mut obj = SceneObject::new(name);
        obj.location = position;
        obj.dimensions = dimensions;
        obj
    }

    #[test]
    fn sun_light_contributes_nominal_lumens() {
        let probe = EnvironmentProbe::new();

        let empty = probe.analyze_state(&SceneState::empty());
        assert_eq!(empty.lighting.total_lumens, 0.0);

        let mut state = SceneState::empty();
        let mut sun = SceneLight::new("Sun");
        sun.light_type = "SUN".to_string();
        state.lights.push(sun);

        let report = probe.analyze_state(&state);
        assert_eq!(report.lighting.total_lumens, 100_000.0);
        assert_eq!(report.lighting.color_temperatures, vec![5500.0]);
        assert_eq!(report.lighting.average_illuminance, 5000.0);
        assert_eq!(report.summary.lighting_quality, "adequate");
    }

    #[test]
    fn light_typed_object_counts_as_light() {
        let mut obj = SceneObject::new("Ceiling");
        obj.object_type = "area light".to_string();
        let report = EnvironmentProbe::new().analyze_state(&state_with_objects(vec![obj]));

        assert_eq!(report.lighting.light_count, 1);
        assert_eq!(report.lighting.total_lumens, 2000.0);
        assert_eq!(report.lighting.color_temperatures, vec![4000.0]);
    }

    #[test]
    fn unrecognized_light_type_contributes_nothing() {
        let mut state = SceneState::empty();
        let mut light = SceneLight::new("Strip");
        light.light_type = "NEON".to_string();
        state.lights.push(light);

        let report = EnvironmentProbe::new().analyze_state(&state);
        assert_eq!(report.lighting.light_count, 1);
        assert_eq!(report.lighting.total_lumens, 0.0);
    }

    #[test]
    fn alignment_and_balance_degenerate_to_one() {
        let probe = EnvironmentProbe::new();

        let empty = probe.analyze_state(&SceneState::empty());
        assert_eq!(empty.spatial.alignment_consistency, 1.0);
        assert_eq!(empty.spatial.proportional_balance, 1.0);

        let single = state_with_objects(vec![object_at("Solo", [3.0, 3.0, 0.0], [1.0, 1.0, 1.0])]);
        let report = probe.analyze_state(&single);
        assert_eq!(report.spatial.alignment_consistency, 1.0);
        assert_eq!(report.spatial.proportional_balance, 1.0);
    }

    #[test]
    fn room_floors_apply_to_sparse_scenes() {
        let report = EnvironmentProbe::new().analyze_state(&SceneState::empty());
        assert_eq!(report.spatial.room_dimensions, [5.0, 5.0, 2.5]);
        assert_eq!(report.spatial.usable_volume, 62.5);
        assert_eq!(report.spatial.object_density, 0.0);
        assert_eq!(report.spatial.traffic_flow_score, 1.0);
    }

    #[test]
    fn volume_and_surface_area() {
        let state = state_with_objects(vec![object_at("Box", [0.0; 3], [2.0, 3.0, 4.0])]);
        let report = EnvironmentProbe::new().analyze_state(&state);

        assert_eq!(report.objects[0].volume, 24.0);
        assert_eq!(report.objects[0].surface_area, 52.0);
    }

    #[test]
    fn dense_scene_flags_clutter_and_flow() {
        let state = state_with_objects(vec![object_at("Bulk", [0.0; 3], [4.0, 4.0, 2.0])]);
        let report = EnvironmentProbe::new().analyze_state(&state);

        // volume 32 over a floored 5x5x2.5 room
        assert_eq!(report.spatial.object_density, 32.0 / 62.5);
        assert!(report.issues.contains(&"Scene too cluttered".to_string()));
        assert!(report.issues.contains(&"Poor traffic flow".to_string()));
        assert!(report
            .recommendations
            .contains(&"Reduce object density".to_string()));
    }

    #[test]
    fn dark_scene_flags_lighting() {
        let report = EnvironmentProbe::new().analyze_state(&SceneState::empty());
        assert!(report.issues.contains(&"Insufficient lighting".to_string()));
        assert!(report
            .recommendations
            .contains(&"Add ambient lighting".to_string()));
        assert!(report
            .recommendations
            .contains(&"Add task lighting".to_string()));
    }

    #[test]
    fn zone_assignment_first_match_wins() {
        let state = state_with_objects(vec![
            object_at("kitchen_table", [0.0; 3], [1.0; 3]),
            object_at("sofa_main", [2.0, 0.0, 0.0], [1.0; 3]),
            object_at("bed", [4.0, 0.0, 0.0], [1.0; 3]),
            // "lamp" is a bedroom keyword, but "table" matches kitchen first
            object_at("table_lamp", [6.0, 0.0, 0.0], [1.0; 3]),
            object_at("tree", [8.0, 0.0, 0.0], [1.0; 3]),
        ]);
        let report = EnvironmentProbe::new().analyze_state(&state);

        let zones = &report.spatial.functional_zones;
        assert_eq!(
            zones["kitchen"],
            vec!["kitchen_table".to_string(), "table_lamp".to_string()]
        );
        assert_eq!(zones["living"], vec!["sofa_main".to_string()]);
        assert_eq!(zones["bedroom"], vec!["bed".to_string()]);
        assert_eq!(report.summary.functional_completeness, 3);
    }

    #[test]
    fn pairwise_distances() {
        let state = state_with_objects(vec![
            object_at("A", [0.0, 0.0, 0.0], [1.0; 3]),
            object_at("B", [3.0, 4.0, 0.0], [1.0; 3]),
        ]);
        let report = EnvironmentProbe::new().analyze_state(&state);

        assert_eq!(report.spatial.object_distances["A"]["B"], 5.0);
        assert_eq!(report.spatial.object_distances["B"]["A"], 5.0);
    }

    #[test]
    fn vertex_estimates_scale_with_size() {
        assert_eq!(estimate_vertex_count("sphere", [1.0, 1.0, 1.0]), 32);
        assert_eq!(estimate_vertex_count("cube", [3.0, 3.0, 3.0]), 24);
        assert_eq!(estimate_face_count("plane", [1.0, 1.0, 1.0]), 1);
        assert_eq!(estimate_face_count("unknown", [1.0, 1.0, 1.0]), 6);
    }

    #[test]
    fn measured_counts_preferred_over_estimates() {
        let mut obj = object_at("Mesh", [0.0; 3], [1.0; 3]);
        obj.vertex_count = 123;
        let report = EnvironmentProbe::new().analyze_state(&state_with_objects(vec![obj]));

        assert_eq!(report.objects[0].vertex_count, 123);
        assert_eq!(report.objects[0].face_count, 6);
    }

    #[test]
    fn non_finite_input_degrades_gracefully() {
        let report =
            EnvironmentProbe::new().analyze("Object: Broken\nDimensions: (nan, 1.0, 1.0)\n");
        assert_eq!(report.issues, vec!["Analysis failed".to_string()]);
        assert_eq!(report.recommendations, vec!["Retry analysis".to_string()]);
    }

    #[test]
    fn overall_score_blend() {
        let mut state = SceneState::empty();
        let mut sun = SceneLight::new("Sun");
        sun.light_type = "SUN".to_string();
        state.lights.push(sun);

        let report = EnvironmentProbe::new().analyze_state(&state);
        // (0.75 style + 1.0 balance + 5000/500 illuminance) / 3
        assert!((report.summary.overall_score - (0.75 + 1.0 + 10.0) / 3.0).abs() < 1e-12);
    }
}
