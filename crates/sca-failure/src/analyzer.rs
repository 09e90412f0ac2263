//! Failure analysis engine
//!
//! Classifies a failed command execution against the static pattern tables,
//! infers a root cause, proposes a fix with alternatives, and scores the
//! recovery. Pure: the same [`TaskContext`] always produces the same
//! [`FailureAnalysis`].

use crate::patterns::{
    strategy_for, FAILURE_PATTERNS, MATERIAL_IDENT, OBJECT_IDENT, QUOTED_MATERIAL, QUOTED_OBJECT,
};
use crate::types::{FailureAnalysis, FailureKind, FailureSummary, RootCause, SceneImpact, TaskContext};
use indexmap::IndexMap;

/// Intelligent failure analysis and recovery scoring
#[derive(Debug, Clone, Copy, Default)]
pub struct FailureAnalyzer;

impl FailureAnalyzer {
    /// Create a new analyzer
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Analyze one failed task execution
    #[must_use]
    pub fn analyze(&self, ctx: &TaskContext) -> FailureAnalysis {
        let kind = identify_kind(ctx);
        let root_cause = determine_root_cause(ctx, kind);
        let specific_issue = specific_issue(ctx, root_cause);
        let scene_impact = assess_scene_impact(ctx);
        let suggested_fix = suggested_fix(ctx, root_cause, kind);
        let alternative_approaches = alternative_approaches(ctx, kind);
        let recovery_complexity = recovery_complexity(kind, ctx.attempt_number);
        let likely_success_rate = estimate_success_rate(ctx, &suggested_fix);
        let prevention_strategy = prevention_strategy(ctx, kind);

        FailureAnalysis {
            failure_kind: kind,
            root_cause,
            specific_issue,
            scene_impact,
            suggested_fix,
            alternative_approaches,
            recovery_complexity,
            likely_success_rate,
            prevention_strategy,
        }
    }

    /// Aggregate a batch of failures by simple mode
    ///
    /// An empty batch yields count 0 with "none" markers.
    #[must_use]
    pub fn failure_summary(&self, failures: &[TaskContext]) -> FailureSummary {
        if failures.is_empty() {
            return FailureSummary {
                most_common_kind: "none".to_string(),
                most_common_cause: "none".to_string(),
                failure_count: 0,
                patterns: Vec::new(),
                recommendations: Vec::new(),
            };
        }

        let mut kinds: IndexMap<&'static str, usize> = IndexMap::new();
        let mut causes: IndexMap<&'static str, usize> = IndexMap::new();
        for failure in failures {
            let analysis = self.analyze(failure);
            *kinds.entry(analysis.failure_kind.as_str()).or_insert(0) += 1;
            *causes.entry(analysis.root_cause.as_str()).or_insert(0) += 1;
        }

        FailureSummary {
            most_common_kind: mode(&kinds),
            most_common_cause: mode(&causes),
            failure_count: failures.len(),
            patterns: kinds.keys().map(|k| (*k).to_string()).collect(),
            recommendations: vec![
                "Focus on common failure types".to_string(),
                "Implement preventive measures".to_string(),
            ],
        }
    }
}

/// First-seen entry wins ties, so the result is deterministic
fn mode(counts: &IndexMap<&'static str, usize>) -> String {
    let mut best: Option<(&'static str, usize)> = None;
    for (key, count) in counts {
        if best.map_or(true, |(_, best_count)| *count > best_count) {
            best = Some((key, *count));
        }
    }
    best.map(|(k, _)| k.to_string())
        .unwrap_or_else(|| "none".to_string())
}

fn identify_kind(ctx: &TaskContext) -> FailureKind {
    let error = ctx.error_message.to_lowercase();

    for (kind, keywords) in FAILURE_PATTERNS {
        if keywords.iter().any(|kw| error.contains(kw)) {
            return *kind;
        }
    }

    // Secondary heuristics over the generated command text itself.
    let command = ctx.command_text.to_lowercase();
    if command.contains("bpy.ops") && error.contains("poll") {
        FailureKind::Context
    } else if command.contains("mesh") && (error.contains("index") || error.contains("vertex")) {
        FailureKind::Geometry
    } else if command.contains("material") {
        FailureKind::Material
    } else if command.contains("object") && error.contains("not found") {
        FailureKind::Object
    } else {
        FailureKind::Unknown
    }
}

fn determine_root_cause(ctx: &TaskContext, kind: FailureKind) -> RootCause {
    let error = ctx.error_message.to_lowercase();

    match kind {
        FailureKind::Context => {
            if error.contains("object.mode") {
                RootCause::IncorrectObjectMode
            } else if error.contains("poll") {
                RootCause::InvalidContextForOperation
            } else {
                RootCause::ContextValidationFailure
            }
        }
        FailureKind::Geometry => {
            if error.contains("index") {
                RootCause::InvalidGeometryIndex
            } else if error.contains("vertex") && error.contains("group") {
                RootCause::MissingVertexGroup
            } else {
                RootCause::GeometryValidationFailure
            }
        }
        FailureKind::Material => {
            if error.contains("not found") {
                RootCause::MissingMaterial
            } else {
                RootCause::MaterialAssignmentFailure
            }
        }
        FailureKind::Object => {
            if error.contains("not found") {
                RootCause::ObjectDoesNotExist
            } else {
                RootCause::ObjectAccessFailure
            }
        }
        _ => RootCause::UnknownRootCause,
    }
}

fn specific_issue(ctx: &TaskContext, root_cause: RootCause) -> String {
    let specific_line = ctx
        .error_message
        .lines()
        .find(|line| {
            let lowered = line.to_lowercase();
            ["error", "exception", "failed"]
                .iter()
                .any(|kw| lowered.contains(kw))
        })
        .map(str::trim)
        .unwrap_or("");

    match root_cause {
        RootCause::IncorrectObjectMode => {
            "Operation requires Object Mode, current mode prevents execution".to_string()
        }
        RootCause::InvalidContextForOperation => {
            format!("Context validation failed for viewport operation: {specific_line}")
        }
        RootCause::MissingMaterial => {
            format!(
                "Material '{}' not found",
                extract_material_name(&ctx.command_text)
            )
        }
        RootCause::ObjectDoesNotExist => {
            format!(
                "Object '{}' does not exist",
                extract_object_name(&ctx.command_text)
            )
        }
        RootCause::InvalidGeometryIndex => {
            format!("Geometry index out of range: {specific_line}")
        }
        RootCause::GeometryValidationFailure => {
            format!("Mesh geometry validation failed: {specific_line}")
        }
        _ => format!("Unknown specific issue: {specific_line}"),
    }
}

fn assess_scene_impact(ctx: &TaskContext) -> SceneImpact {
    let task = ctx.task_name.to_lowercase();
    let instruction = ctx.instruction.to_lowercase();

    if task.contains("light") || instruction.contains("lighting") {
        SceneImpact {
            objects_affected: vec!["lighting_system".to_string()],
            scene_integrity: "partial".to_string(),
            user_requirement_impact: "moderate".to_string(),
            recovery_difficulty: "low".to_string(),
        }
    } else if task.contains("material") || instruction.contains("texture") {
        SceneImpact {
            objects_affected: vec!["material_system".to_string()],
            scene_integrity: "partial".to_string(),
            user_requirement_impact: "high".to_string(),
            recovery_difficulty: "medium".to_string(),
        }
    } else if task.contains("object") || instruction.contains("create") {
        SceneImpact {
            objects_affected: vec!["object_creation".to_string()],
            scene_integrity: "partial".to_string(),
            user_requirement_impact: "high".to_string(),
            recovery_difficulty: "medium".to_string(),
        }
    } else if task.contains("geometry") || instruction.contains("mesh") {
        SceneImpact {
            objects_affected: vec!["geometry_system".to_string()],
            scene_integrity: "at_risk".to_string(),
            user_requirement_impact: "high".to_string(),
            recovery_difficulty: "high".to_string(),
        }
    } else {
        SceneImpact::default()
    }
}

fn suggested_fix(ctx: &TaskContext, root_cause: RootCause, kind: FailureKind) -> String {
    match root_cause {
        RootCause::IncorrectObjectMode => "\
# Ensure correct object mode
if bpy.context.mode != 'OBJECT':
    bpy.ops.object.mode_set(mode='OBJECT')

# Safe object operation
bpy.ops.object.select_all(action='DESELECT')"
            .to_string(),
        RootCause::MissingMaterial => {
            let name = extract_material_name(&ctx.command_text);
            format!(
                "\
# Ensure material exists
material = bpy.data.materials.get('{name}')
if not material:
    material = bpy.data.materials.new(name='{name}')
    material.use_nodes = True"
            )
        }
        RootCause::ObjectDoesNotExist => {
            let name = extract_object_name(&ctx.command_text);
            format!(
                "\
# Safe object access
obj = bpy.data.objects.get('{name}')
if not obj:
    bpy.ops.mesh.primitive_cube_add()
    obj = bpy.context.active_object
    obj.name = '{name}'"
            )
        }
        _ => {
            let immediate = strategy_for(kind)
                .map(|s| s.immediate_fix)
                .unwrap_or("Retry with error handling");
            format!(
                "\
# {immediate}
try:
    {}
except Exception as e:
    print(f\"Error during operation: {{e}}\")
    # Fallback operation
    print(\"Applying fallback strategy...\")",
                ctx.command_text
            )
        }
    }
}

fn alternative_approaches(ctx: &TaskContext, kind: FailureKind) -> Vec<String> {
    let mut alternatives: Vec<String> = strategy_for(kind)
        .map(|s| s.alternatives.iter().map(|a| (*a).to_string()).collect())
        .unwrap_or_default();

    let task = ctx.task_name.to_lowercase();
    if task.contains("create") {
        alternatives.extend([
            "Use procedural generation instead of asset loading".to_string(),
            "Create simplified version of the object".to_string(),
            "Use primitive shapes as placeholders".to_string(),
        ]);
    } else if task.contains("light") {
        alternatives.extend([
            "Use environment lighting instead of specific lights".to_string(),
            "Create area lights instead of point lights".to_string(),
            "Adjust world lighting instead".to_string(),
        ]);
    } else if task.contains("material") {
        alternatives.extend([
            "Use procedural materials instead of texture-based".to_string(),
            "Apply basic color materials as fallback".to_string(),
            "Create materials programmatically".to_string(),
        ]);
    }

    alternatives.truncate(3);
    alternatives
}

fn recovery_complexity(kind: FailureKind, attempt_number: u32) -> u8 {
    let escalation = attempt_number.saturating_sub(1).min(2) as u8;
    (kind.base_complexity() + escalation).clamp(1, 5)
}

fn estimate_success_rate(ctx: &TaskContext, suggested_fix: &str) -> f64 {
    let mut rate = 0.8;

    rate -= f64::from(ctx.attempt_number.saturating_sub(1)) * 0.15;

    let fix = suggested_fix.to_lowercase();
    if fix.contains("try") || fix.contains("fallback") {
        rate += 0.1;
    }
    if ["bmesh", "complex", "multiple"].iter().any(|kw| fix.contains(kw)) {
        rate -= 0.1;
    }

    rate.clamp(0.3, 0.95)
}

fn prevention_strategy(ctx: &TaskContext, kind: FailureKind) -> String {
    let task = ctx.task_name.to_lowercase();

    if task.contains("create") {
        "Validate object existence before creation operations".to_string()
    } else if task.contains("light") {
        "Check lighting setup before illumination operations".to_string()
    } else if task.contains("material") {
        "Verify material availability before assignment".to_string()
    } else if task.contains("geometry") {
        "Validate mesh integrity before geometric operations".to_string()
    } else {
        strategy_for(kind)
            .map(|s| s.prevention.to_string())
            .unwrap_or_else(|| "Add comprehensive error handling".to_string())
    }
}

fn extract_material_name(command_text: &str) -> String {
    if let Some(caps) = QUOTED_MATERIAL.captures(command_text) {
        return caps[1].to_string();
    }
    if let Some(caps) = MATERIAL_IDENT.captures(command_text) {
        return caps[1].to_string();
    }
    "DefaultMaterial".to_string()
}

fn extract_object_name(command_text: &str) -> String {
    if let Some(caps) = QUOTED_OBJECT.captures(command_text) {
        return caps[1].to_string();
    }
    if let Some(caps) = OBJECT_IDENT.captures(command_text) {
        return caps[1].to_string();
    }
    "DefaultObject".to_string()
}
