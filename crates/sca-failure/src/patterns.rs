//! Static failure pattern and recovery strategy tables
//!
//! The pattern table is ordered; classification scans it top to bottom and
//! the first matching kind wins.

use crate::types::FailureKind;
use once_cell::sync::Lazy;
use regex::Regex;

/// Ordered keyword table for failure classification
pub(crate) const FAILURE_PATTERNS: &[(FailureKind, &[&str])] = &[
    (
        FailureKind::Context,
        &[
            "context is incorrect",
            "poll() failed",
            "context error",
            "invalid context",
            "not in object mode",
        ],
    ),
    (
        FailureKind::Geometry,
        &[
            "mesh operation failed",
            "vertex group",
            "face index",
            "edge loop",
            "geometry error",
        ],
    ),
    (
        FailureKind::Material,
        &[
            "material not found",
            "texture missing",
            "shader error",
            "material slot",
        ],
    ),
    (
        FailureKind::Object,
        &[
            "object not found",
            "object does not exist",
            "no active object",
            "object selection",
        ],
    ),
    (
        FailureKind::Constraint,
        &["constraint failed", "parenting error", "transform constraint"],
    ),
    (
        FailureKind::Render,
        &["render engine", "cycles error", "eevee error", "render settings"],
    ),
    (
        FailureKind::Memory,
        &["memory", "out of memory", "allocation failed"],
    ),
    (
        FailureKind::Syntax,
        &["syntax error", "indentation error", "name error", "attribute error"],
    ),
    (
        FailureKind::Runtime,
        &["runtime error", "value error", "type error", "index error"],
    ),
];

/// Fixed recovery guidance for a failure kind
#[derive(Debug, Clone, Copy)]
pub(crate) struct RecoveryStrategy {
    pub(crate) immediate_fix: &'static str,
    pub(crate) alternatives: &'static [&'static str],
    pub(crate) prevention: &'static str,
}

pub(crate) const RECOVERY_STRATEGIES: &[(FailureKind, RecoveryStrategy)] = &[
    (
        FailureKind::Context,
        RecoveryStrategy {
            immediate_fix: "Ensure proper context mode before operations",
            alternatives: &[
                "Use context override for viewport operations",
                "Switch to direct data-level manipulation",
                "Add explicit object selection before operations",
            ],
            prevention: "Always check context state before viewport operations",
        },
    ),
    (
        FailureKind::Geometry,
        RecoveryStrategy {
            immediate_fix: "Validate geometry before operations",
            alternatives: &[
                "Use mesh validation before operations",
                "Check for manifold geometry",
                "Validate vertex/face indices",
            ],
            prevention: "Validate mesh integrity before geometric operations",
        },
    ),
    (
        FailureKind::Material,
        RecoveryStrategy {
            immediate_fix: "Ensure material exists before assignment",
            alternatives: &[
                "Create default material if not found",
                "Use material slot validation",
                "Check material library availability",
            ],
            prevention: "Always verify material existence before assignment",
        },
    ),
    (
        FailureKind::Object,
        RecoveryStrategy {
            immediate_fix: "Use safe object access patterns",
            alternatives: &[
                "Look objects up by name instead of direct access",
                "Create object if not exists",
                "Use object naming conventions",
            ],
            prevention: "Always use safe object access patterns",
        },
    ),
    (
        FailureKind::Constraint,
        RecoveryStrategy {
            immediate_fix: "Validate constraint setup",
            alternatives: &[
                "Clear constraints before operations",
                "Apply transforms before constraints",
                "Use transform matrices instead",
            ],
            prevention: "Apply transforms before applying constraints",
        },
    ),
];

pub(crate) fn strategy_for(kind: FailureKind) -> Option<&'static RecoveryStrategy> {
    RECOVERY_STRATEGIES
        .iter()
        .find(|(k, _)| *k == kind)
        .map(|(_, s)| s)
}

/// Quoted string containing "material"
pub(crate) static QUOTED_MATERIAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)["']([^"']*material[^"']*)["']"#).expect("valid regex"));

/// Identifier containing "material"
pub(crate) static MATERIAL_IDENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\w*material\w*)").expect("valid regex"));

/// Quoted string containing "object"
pub(crate) static QUOTED_OBJECT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)["']([^"']*object[^"']*)["']"#).expect("valid regex"));

/// Identifier containing "obj"
pub(crate) static OBJECT_IDENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\w*obj\w*)").expect("valid regex"));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_table_order() {
        // Classification depends on scan order; context comes first and
        // runtime last.
        assert_eq!(FAILURE_PATTERNS.first().unwrap().0, FailureKind::Context);
        assert_eq!(FAILURE_PATTERNS.last().unwrap().0, FailureKind::Runtime);
    }

    #[test]
    fn strategies_cover_primary_kinds() {
        for kind in [
            FailureKind::Context,
            FailureKind::Geometry,
            FailureKind::Material,
            FailureKind::Object,
            FailureKind::Constraint,
        ] {
            assert!(strategy_for(kind).is_some());
        }
        assert!(strategy_for(FailureKind::Memory).is_none());
    }

    #[test]
    fn name_regexes_compile_and_match() {
        let caps = QUOTED_MATERIAL.captures("get('WoodMaterial')").unwrap();
        assert_eq!(&caps[1], "WoodMaterial");

        let caps = OBJECT_IDENT.captures("let obj_ref = lookup()").unwrap();
        assert_eq!(&caps[1], "obj_ref");
    }
}
