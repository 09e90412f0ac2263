//! Tolerant scene-description parser
//!
//! Turns the opaque description returned by the 3D tool into a [`SceneState`].
//! Two input shapes are accepted: a structured (JSON object) description and a
//! line-oriented textual description. Parsing is total: malformed or
//! unrecognized input yields a snapshot with empty collections and default
//! metadata, never an error.

use crate::types::{
    BoundingBox, Color, SceneCamera, SceneLight, SceneMaterial, SceneObject, SceneState, Vec3,
};
use indexmap::IndexMap;
use serde_json::Value;

/// Scene-description parser
///
/// Stateless; a single instance can parse any number of observations.
#[derive(Debug, Clone, Copy, Default)]
pub struct SceneParser;

impl SceneParser {
    /// Create a new parser
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Parse a raw scene description into a snapshot
    ///
    /// Never fails: structured input is taken field-by-field with explicit
    /// defaults, textual input is scanned line-by-line, and anything else
    /// falls back to a lenient scan that salvages object names.
    #[must_use]
    pub fn parse(&self, raw: &str) -> SceneState {
        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(raw) {
            return parse_structured(&map);
        }

        let state = parse_text(raw);
        if state.objects.is_empty() && state.lights.is_empty() && state.cameras.is_empty() {
            return parse_fallback(raw);
        }
        state
    }
}

fn parse_structured(data: &serde_json::Map<String, Value>) -> SceneState {
    let mut objects = Vec::new();
    for entry in array(data.get("objects")) {
        objects.push(SceneObject {
            name: str_or(entry, "name", "unknown"),
            object_type: str_or(entry, "type", "MESH"),
            location: vec3_or(entry, "location", [0.0, 0.0, 0.0]),
            rotation: vec3_or(entry, "rotation", [0.0, 0.0, 0.0]),
            scale: vec3_or(entry, "scale", [1.0, 1.0, 1.0]),
            dimensions: vec3_or(entry, "dimensions", [1.0, 1.0, 1.0]),
            bounding_box: bounding_box_or(entry.get("bounding_box")),
            vertex_count: u64_or(entry, "vertex_count", 0),
            face_count: u64_or(entry, "face_count", 0),
            edge_count: u64_or(entry, "edge_count", 0),
            materials: string_list(entry.get("materials")),
            parent: opt_string(entry.get("parent")),
            children: string_list(entry.get("children")),
            visibility: bool_or(entry, "visibility", true),
            selectability: bool_or(entry, "selectability", true),
            renderability: bool_or(entry, "renderability", true),
            custom_properties: value_map(entry.get("custom_properties")),
        });
    }

    let mut lights = Vec::new();
    for entry in array(data.get("lights")) {
        lights.push(SceneLight {
            name: str_or(entry, "name", "unknown"),
            light_type: str_or(entry, "type", "POINT"),
            location: vec3_or(entry, "location", [0.0, 0.0, 0.0]),
            rotation: vec3_or(entry, "rotation", [0.0, 0.0, 0.0]),
            energy: f64_or(entry, "energy", 1.0),
            color: color_or(entry, "color", [1.0, 1.0, 1.0, 1.0]),
            temperature: f64_or(entry, "temperature", 5500.0),
            size: f64_or(entry, "size", 0.1),
            spot_size: opt_f64(entry.get("spot_size")),
            spot_blend: opt_f64(entry.get("spot_blend")),
            shadows: bool_or(entry, "shadows", true),
            shadow_cascade: str_or(entry, "shadow_cascade", "NONE"),
            light_group: opt_string(entry.get("light_group")),
        });
    }

    let mut cameras = Vec::new();
    for entry in array(data.get("cameras")) {
        cameras.push(SceneCamera {
            name: str_or(entry, "name", "unknown"),
            location: vec3_or(entry, "location", [0.0, 0.0, 0.0]),
            rotation: vec3_or(entry, "rotation", [0.0, 0.0, 0.0]),
            focal_length: f64_or(entry, "focal_length", 50.0),
            sensor_width: f64_or(entry, "sensor_width", 36.0),
            sensor_height: f64_or(entry, "sensor_height", 24.0),
            clip_start: f64_or(entry, "clip_start", 0.1),
            clip_end: f64_or(entry, "clip_end", 1000.0),
            dof_distance: opt_f64(entry.get("dof_distance")),
            dof_fstop: opt_f64(entry.get("dof_fstop")),
            is_active: bool_or(entry, "is_active", true),
        });
    }

    let mut materials = Vec::new();
    for entry in array(data.get("materials")) {
        materials.push(SceneMaterial {
            name: str_or(entry, "name", "unknown"),
            base_color: color_or(entry, "base_color", [0.8, 0.8, 0.8, 1.0]),
            metallic: f64_or(entry, "metallic", 0.0),
            roughness: f64_or(entry, "roughness", 0.5),
            specular: f64_or(entry, "specular", 0.5),
            emission: color_or(entry, "emission", [0.0, 0.0, 0.0, 1.0]),
            alpha: f64_or(entry, "alpha", 1.0),
            normal_map: opt_string(entry.get("normal_map")),
            texture_paths: string_list(entry.get("texture_paths")),
            is_procedural: bool_or(entry, "is_procedural", false),
            node_count: u64_or(entry, "node_count", 0),
        });
    }

    let total_objects = objects.len();
    let entry = Value::Object(data.clone());
    SceneState {
        objects,
        lights,
        cameras,
        materials,
        world_settings: value_map(data.get("world_settings")),
        scene_dimensions: vec3_or(&entry, "scene_dimensions", [10.0, 10.0, 3.0]),
        total_vertices: u64_or(&entry, "total_vertices", 0),
        total_faces: u64_or(&entry, "total_faces", 0),
        total_objects,
        render_engine: str_or(&entry, "render_engine", "CYCLES"),
        unit_system: str_or(&entry, "unit_system", "METRIC"),
        frame_range: (
            i64_or(&entry, "frame_start", 1),
            i64_or(&entry, "frame_end", 250),
        ),
        fps: f64_or(&entry, "fps", 24.0),
    }
}

/// Entity currently being accumulated during the text scan
enum OpenEntity {
    Object(SceneObject),
    Light(SceneLight),
    Camera(SceneCamera),
}

fn parse_text(raw: &str) -> SceneState {
    let mut state = SceneState::empty();
    let mut current: Option<OpenEntity> = None;

    // A new entity header flushes whatever record was open; nested `Key:`
    // lines attach to the open record until then.
    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(name) = header_name(line, "Object:") {
            flush(&mut state, current.take());
            current = Some(OpenEntity::Object(SceneObject::new(name)));
        } else if let Some(name) = header_name(line, "Light:") {
            flush(&mut state, current.take());
            current = Some(OpenEntity::Light(SceneLight::new(name)));
        } else if let Some(name) = header_name(line, "Camera:") {
            flush(&mut state, current.take());
            current = Some(OpenEntity::Camera(SceneCamera::new(name)));
        } else {
            match current.as_mut() {
                Some(OpenEntity::Object(obj)) => {
                    if let Some(rest) = value_after(line, "Location:") {
                        obj.location = parse_vec3(rest);
                    } else if let Some(rest) = value_after(line, "Rotation:") {
                        obj.rotation = parse_vec3(rest);
                    } else if let Some(rest) = value_after(line, "Scale:") {
                        obj.scale = parse_vec3(rest);
                    } else if let Some(rest) = value_after(line, "Dimensions:") {
                        obj.dimensions = parse_vec3(rest);
                    } else if let Some(rest) = value_after(line, "Material:") {
                        obj.materials.push(rest.to_string());
                    } else if let Some(rest) = value_after(line, "Vertices:") {
                        obj.vertex_count = parse_count(rest);
                    } else if let Some(rest) = value_after(line, "Faces:") {
                        obj.face_count = parse_count(rest);
                    } else if let Some(rest) = value_after(line, "Type:") {
                        obj.object_type = rest.to_string();
                    }
                }
                Some(OpenEntity::Light(light)) => {
                    if let Some(rest) = value_after(line, "Energy:") {
                        light.energy = parse_number(rest, 1.0);
                    } else if let Some(rest) = value_after(line, "Color:") {
                        light.color = parse_color(rest);
                    } else if let Some(rest) = value_after(line, "Location:") {
                        light.location = parse_vec3(rest);
                    } else if let Some(rest) = value_after(line, "Type:") {
                        light.light_type = rest.to_string();
                    }
                }
                Some(OpenEntity::Camera(cam)) => {
                    if let Some(rest) = value_after(line, "Focal Length:") {
                        cam.focal_length = parse_number(rest, 50.0);
                    } else if let Some(rest) = value_after(line, "Location:") {
                        cam.location = parse_vec3(rest);
                    }
                }
                None => {}
            }
        }
    }
    flush(&mut state, current.take());

    state.recompute_totals();
    state
}

/// Lenient last resort: salvage object names from any line that mentions one
fn parse_fallback(raw: &str) -> SceneState {
    let mut state = SceneState::empty();

    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() || !line.to_lowercase().contains("object") {
            continue;
        }
        let name = match line.rfind(':') {
            Some(idx) => line[idx + 1..].trim(),
            None => line,
        };
        state.objects.push(SceneObject::new(name));
    }

    state.recompute_totals();
    state
}

fn flush(state: &mut SceneState, entity: Option<OpenEntity>) {
    match entity {
        Some(OpenEntity::Object(obj)) => state.objects.push(obj),
        Some(OpenEntity::Light(light)) => state.lights.push(light),
        Some(OpenEntity::Camera(cam)) => state.cameras.push(cam),
        None => {}
    }
}

/// Match `Prefix:` or `- Prefix:` headers, returning the trailing name
fn header_name<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = line
        .strip_prefix(prefix)
        .or_else(|| line.strip_prefix("- ").and_then(|l| l.strip_prefix(prefix)))?;
    Some(rest.trim())
}

fn value_after<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    line.find(key).map(|idx| line[idx + key.len()..].trim())
}

/// Parse a 3-vector, tolerating surrounding brackets and mixed whitespace
///
/// Any conversion failure yields the zero vector.
fn parse_vec3(raw: &str) -> Vec3 {
    let cleaned = raw
        .trim()
        .trim_matches(|c| matches!(c, '(' | ')' | '[' | ']'));
    let mut parts = Vec::new();
    for piece in cleaned.split(',') {
        match piece.trim().parse::<f64>() {
            Ok(v) => parts.push(v),
            Err(_) => return [0.0, 0.0, 0.0],
        }
    }
    if parts.len() >= 3 {
        [parts[0], parts[1], parts[2]]
    } else {
        [0.0, 0.0, 0.0]
    }
}

/// Parse an RGB(A) color; conversion failure yields opaque white
fn parse_color(raw: &str) -> Color {
    let cleaned = raw
        .trim()
        .trim_matches(|c| matches!(c, '(' | ')' | '[' | ']'));
    let mut parts = Vec::new();
    for piece in cleaned.split(',') {
        match piece.trim().parse::<f64>() {
            Ok(v) => parts.push(v),
            Err(_) => return [1.0, 1.0, 1.0, 1.0],
        }
    }
    match parts.len() {
        3 => [parts[0], parts[1], parts[2], 1.0],
        4 => [parts[0], parts[1], parts[2], parts[3]],
        _ => [1.0, 1.0, 1.0, 1.0],
    }
}

fn parse_number(raw: &str, default: f64) -> f64 {
    raw.trim().parse().unwrap_or(default)
}

fn parse_count(raw: &str) -> u64 {
    raw.trim().parse().unwrap_or(0)
}

fn array(value: Option<&Value>) -> impl Iterator<Item = &Value> {
    value.and_then(Value::as_array).into_iter().flatten()
}

fn str_or(value: &Value, key: &str, default: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or(default)
        .to_string()
}

fn f64_or(value: &Value, key: &str, default: f64) -> f64 {
    value.get(key).and_then(Value::as_f64).unwrap_or(default)
}

fn u64_or(value: &Value, key: &str, default: u64) -> u64 {
    value.get(key).and_then(Value::as_u64).unwrap_or(default)
}

fn i64_or(value: &Value, key: &str, default: i64) -> i64 {
    value.get(key).and_then(Value::as_i64).unwrap_or(default)
}

fn bool_or(value: &Value, key: &str, default: bool) -> bool {
    value.get(key).and_then(Value::as_bool).unwrap_or(default)
}

fn opt_f64(value: Option<&Value>) -> Option<f64> {
    value.and_then(Value::as_f64)
}

fn opt_string(value: Option<&Value>) -> Option<String> {
    value.and_then(Value::as_str).map(str::to_string)
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn value_map(value: Option<&Value>) -> IndexMap<String, Value> {
    value
        .and_then(Value::as_object)
        .map(|map| map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default()
}

fn vec3_or(value: &Value, key: &str, default: Vec3) -> Vec3 {
    let Some(items) = value.get(key).and_then(Value::as_array) else {
        return default;
    };
    let nums: Vec<f64> = items.iter().filter_map(Value::as_f64).collect();
    if nums.len() >= 3 && nums.len() == items.len() {
        [nums[0], nums[1], nums[2]]
    } else {
        default
    }
}

fn color_or(value: &Value, key: &str, default: Color) -> Color {
    let Some(items) = value.get(key).and_then(Value::as_array) else {
        return default;
    };
    let nums: Vec<f64> = items.iter().filter_map(Value::as_f64).collect();
    if nums.len() != items.len() {
        return default;
    }
    match nums.len() {
        3 => [nums[0], nums[1], nums[2], 1.0],
        4 => [nums[0], nums[1], nums[2], nums[3]],
        _ => default,
    }
}

fn bounding_box_or(value: Option<&Value>) -> BoundingBox {
    let default = ([0.0, 0.0, 0.0], [1.0, 1.0, 1.0]);
    let Some(value) = value else {
        return default;
    };

    let corner = |v: Option<&Value>, fallback: Vec3| -> Vec3 {
        let Some(items) = v.and_then(Value::as_array) else {
            return fallback;
        };
        let nums: Vec<f64> = items.iter().filter_map(Value::as_f64).collect();
        if nums.len() >= 3 {
            [nums[0], nums[1], nums[2]]
        } else {
            fallback
        }
    };

    match value {
        Value::Object(map) => (
            corner(map.get("min"), default.0),
            corner(map.get("max"), default.1),
        ),
        Value::Array(items) => (
            corner(items.first(), default.0),
            corner(items.get(1), default.1),
        ),
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_empty_input() {
        let state = SceneParser::new().parse("");
        assert_eq!(state, SceneState::empty());
    }

    #[test]
    fn parse_garbage_never_fails() {
        let parser = SceneParser::new();
        for raw in ["{broken json", "12345", "???\n###", "null"] {
            let state = parser.parse(raw);
            assert_eq!(state.total_objects, state.objects.len());
        }
    }

    #[test]
    fn parse_text_single_object() {
        let state = SceneParser::new().parse("Object: Chair\nLocation: (1.0, 2.0, 0.0)\n");

        assert_eq!(state.objects.len(), 1);
        let obj = &state.objects[0];
        assert_eq!(obj.name, "Chair");
        assert_eq!(obj.location, [1.0, 2.0, 0.0]);
        assert_eq!(obj.dimensions, [1.0, 1.0, 1.0]);
    }

    #[test]
    fn parse_text_header_flushes_previous() {
        let raw = "Object: Table\nDimensions: (2.0, 1.0, 0.8)\nObject: Chair\nLight: Sun\nType: SUN";
        let state = SceneParser::new().parse(raw);

        assert_eq!(state.objects.len(), 2);
        assert_eq!(state.objects[0].name, "Table");
        assert_eq!(state.objects[0].dimensions, [2.0, 1.0, 0.8]);
        assert_eq!(state.objects[1].name, "Chair");
        assert_eq!(state.lights.len(), 1);
        assert_eq!(state.lights[0].light_type, "SUN");
    }

    #[test]
    fn parse_text_dash_headers() {
        let state = SceneParser::new().parse("- Object: Lamp\n- Camera: Main");
        assert_eq!(state.objects.len(), 1);
        assert_eq!(state.cameras.len(), 1);
        assert_eq!(state.cameras[0].name, "Main");
    }

    #[test]
    fn parse_text_light_attributes() {
        let raw = "Light: Key\nEnergy: 2.5\nColor: (1.0, 0.5, 0.25)";
        let state = SceneParser::new().parse(raw);

        let light = &state.lights[0];
        assert_eq!(light.energy, 2.5);
        assert_eq!(light.color, [1.0, 0.5, 0.25, 1.0]);
    }

    #[test]
    fn parse_text_camera_attributes() {
        let raw = "Camera: Main\nFocal Length: 85.0\nLocation: [0, -5, 2]";
        let state = SceneParser::new().parse(raw);

        let cam = &state.cameras[0];
        assert_eq!(cam.focal_length, 85.0);
        assert_eq!(cam.location, [0.0, -5.0, 2.0]);
    }

    #[test]
    fn malformed_vector_yields_zero() {
        assert_eq!(parse_vec3("abc,1,2"), [0.0, 0.0, 0.0]);
        assert_eq!(parse_vec3("1.0"), [0.0, 0.0, 0.0]);
        assert_eq!(parse_vec3("(1.0, 2.0, 3.0, 4.0)"), [1.0, 2.0, 3.0]);
    }

    #[test]
    fn malformed_color_yields_white() {
        assert_eq!(parse_color("red,green,blue"), [1.0, 1.0, 1.0, 1.0]);
        assert_eq!(parse_color("(0.1, 0.2)"), [1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn malformed_counts_yield_zero() {
        let raw = "Object: Mesh\nVertices: lots\nFaces: 12";
        let state = SceneParser::new().parse(raw);
        assert_eq!(state.objects[0].vertex_count, 0);
        assert_eq!(state.objects[0].face_count, 12);
        assert_eq!(state.total_faces, 12);
    }

    #[test]
    fn parse_structured_scene() {
        let raw = r#"{
            "objects": [
                {"name": "Table", "type": "MESH", "location": [1, 2, 0],
                 "dimensions": [2.0, 1.0, 0.8], "vertex_count": 8, "face_count": 6,
                 "materials": ["Wood"]}
            ],
            "lights": [{"name": "Sun", "type": "SUN"}],
            "cameras": [{"name": "Main", "focal_length": 35.0}],
            "materials": [{"name": "Wood", "roughness": 0.7}],
            "total_vertices": 8,
            "total_faces": 6,
            "render_engine": "EEVEE",
            "frame_start": 10,
            "frame_end": 100
        }"#;
        let state = SceneParser::new().parse(raw);

        assert_eq!(state.objects.len(), 1);
        assert_eq!(state.objects[0].location, [1.0, 2.0, 0.0]);
        assert_eq!(state.objects[0].materials, vec!["Wood".to_string()]);
        // Unseen energy defaults to 1.0
        assert_eq!(state.lights[0].energy, 1.0);
        assert_eq!(state.cameras[0].focal_length, 35.0);
        assert_eq!(state.materials[0].roughness, 0.7);
        assert_eq!(state.render_engine, "EEVEE");
        assert_eq!(state.frame_range, (10, 100));
        assert_eq!(state.total_objects, 1);
    }

    #[test]
    fn parse_structured_bounding_box_shapes() {
        let raw = r#"{"objects": [
            {"name": "A", "bounding_box": {"min": [0, 0, 0], "max": [2, 2, 2]}},
            {"name": "B", "bounding_box": [[-1, -1, -1], [1, 1, 1]]},
            {"name": "C"}
        ]}"#;
        let state = SceneParser::new().parse(raw);

        assert_eq!(state.objects[0].bounding_box.1, [2.0, 2.0, 2.0]);
        assert_eq!(state.objects[1].bounding_box.0, [-1.0, -1.0, -1.0]);
        assert_eq!(
            state.objects[2].bounding_box,
            ([0.0, 0.0, 0.0], [1.0, 1.0, 1.0])
        );
    }

    #[test]
    fn fallback_salvages_object_lines() {
        let state = SceneParser::new().parse("the scene has one object: Crate\nnothing else");
        assert_eq!(state.objects.len(), 1);
        assert_eq!(state.objects[0].name, "Crate");
    }

    #[test]
    fn text_round_trip_object_count() {
        let mut text = String::new();
        for name in ["Table", "Chair", "Shelf"] {
            text.push_str(&format!("Object: {name}\nLocation: (0.0, 0.0, 0.0)\n"));
        }
        let state = SceneParser::new().parse(&text);
        assert_eq!(state.total_objects, 3);
    }
}
