//! Scene snapshot data model
//!
//! Strongly-typed representation of one observation of the 3D tool's scene:
//! - Objects, lights, cameras, materials
//! - World settings and scene-level aggregates
//!
//! A snapshot is constructed fresh on every observation and never mutated;
//! superseded snapshots stay in the session history so iterations can be
//! diffed against each other.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 3-component vector (location, rotation, scale, dimensions)
pub type Vec3 = [f64; 3];

/// RGBA color
pub type Color = [f64; 4];

/// Axis-aligned bounding box as (min corner, max corner)
pub type BoundingBox = (Vec3, Vec3);

/// A single object in the scene
///
/// `name` is the join key used everywhere else (distances, zone assignment,
/// progress tracking) and must be stable across snapshots of the same
/// underlying object for diffing to be meaningful.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    /// Unique name within a snapshot
    pub name: String,
    /// Type tag (MESH, CURVE, ...)
    pub object_type: String,
    /// World-space location
    pub location: Vec3,
    /// Euler rotation
    pub rotation: Vec3,
    /// Per-axis scale
    pub scale: Vec3,
    /// Bounding dimensions
    pub dimensions: Vec3,
    /// Axis-aligned bounding box
    pub bounding_box: BoundingBox,
    /// Mesh vertex count
    pub vertex_count: u64,
    /// Mesh face count
    pub face_count: u64,
    /// Mesh edge count
    pub edge_count: u64,
    /// Names of assigned materials
    pub materials: Vec<String>,
    /// Parent object name (weak reference, not ownership)
    pub parent: Option<String>,
    /// Child object names
    pub children: Vec<String>,
    /// Visible in viewport
    pub visibility: bool,
    /// Selectable in viewport
    pub selectability: bool,
    /// Included in renders
    pub renderability: bool,
    /// Open-ended property map
    pub custom_properties: IndexMap<String, Value>,
}

impl SceneObject {
    /// Create an object with default attributes
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            object_type: "MESH".to_string(),
            location: [0.0, 0.0, 0.0],
            rotation: [0.0, 0.0, 0.0],
            scale: [1.0, 1.0, 1.0],
            dimensions: [1.0, 1.0, 1.0],
            bounding_box: ([0.0, 0.0, 0.0], [1.0, 1.0, 1.0]),
            vertex_count: 0,
            face_count: 0,
            edge_count: 0,
            materials: Vec::new(),
            parent: None,
            children: Vec::new(),
            visibility: true,
            selectability: true,
            renderability: true,
            custom_properties: IndexMap::new(),
        }
    }
}

/// A light source in the scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneLight {
    /// Unique name within the light collection
    pub name: String,
    /// Light type (POINT, SUN, SPOT, AREA)
    pub light_type: String,
    /// World-space location
    pub location: Vec3,
    /// Euler rotation
    pub rotation: Vec3,
    /// Emission strength
    pub energy: f64,
    /// Light color
    pub color: Color,
    /// Color temperature in Kelvin
    pub temperature: f64,
    /// Emitter size
    pub size: f64,
    /// Spot cone angle, spot lights only
    pub spot_size: Option<f64>,
    /// Spot edge blend, spot lights only
    pub spot_blend: Option<f64>,
    /// Whether the light casts shadows
    pub shadows: bool,
    /// Shadow cascade setting
    pub shadow_cascade: String,
    /// Optional light-group membership
    pub light_group: Option<String>,
}

impl SceneLight {
    /// Create a light with default attributes
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            light_type: "POINT".to_string(),
            location: [0.0, 0.0, 0.0],
            rotation: [0.0, 0.0, 0.0],
            energy: 1.0,
            color: [1.0, 1.0, 1.0, 1.0],
            temperature: 5500.0,
            size: 0.1,
            spot_size: None,
            spot_blend: None,
            shadows: true,
            shadow_cascade: "NONE".to_string(),
            light_group: None,
        }
    }
}

/// A camera in the scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneCamera {
    /// Unique name within the camera collection
    pub name: String,
    /// World-space location
    pub location: Vec3,
    /// Euler rotation
    pub rotation: Vec3,
    /// Focal length in millimeters
    pub focal_length: f64,
    /// Sensor width in millimeters
    pub sensor_width: f64,
    /// Sensor height in millimeters
    pub sensor_height: f64,
    /// Near clip plane
    pub clip_start: f64,
    /// Far clip plane
    pub clip_end: f64,
    /// Depth-of-field focus distance
    pub dof_distance: Option<f64>,
    /// Depth-of-field f-stop
    pub dof_fstop: Option<f64>,
    /// Whether this is the active camera
    pub is_active: bool,
}

impl SceneCamera {
    /// Create a camera with default attributes
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: [0.0, 0.0, 0.0],
            rotation: [0.0, 0.0, 0.0],
            focal_length: 50.0,
            sensor_width: 36.0,
            sensor_height: 24.0,
            clip_start: 0.1,
            clip_end: 1000.0,
            dof_distance: None,
            dof_fstop: None,
            is_active: true,
        }
    }
}

/// A material definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneMaterial {
    /// Unique name within the material collection
    pub name: String,
    /// PBR base color
    pub base_color: Color,
    /// Metallic channel
    pub metallic: f64,
    /// Roughness channel
    pub roughness: f64,
    /// Specular channel
    pub specular: f64,
    /// Emission color
    pub emission: Color,
    /// Alpha channel
    pub alpha: f64,
    /// Normal map reference
    pub normal_map: Option<String>,
    /// Referenced texture files
    pub texture_paths: Vec<String>,
    /// Whether the material is node-procedural
    pub is_procedural: bool,
    /// Shader node count
    pub node_count: u64,
}

impl SceneMaterial {
    /// Create a material with default attributes
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_color: [0.8, 0.8, 0.8, 1.0],
            metallic: 0.0,
            roughness: 0.5,
            specular: 0.5,
            emission: [0.0, 0.0, 0.0, 1.0],
            alpha: 1.0,
            normal_map: None,
            texture_paths: Vec::new(),
            is_procedural: false,
            node_count: 0,
        }
    }
}

/// Immutable snapshot of the complete scene state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneState {
    /// Objects keyed by unique name
    pub objects: Vec<SceneObject>,
    /// Light sources
    pub lights: Vec<SceneLight>,
    /// Cameras
    pub cameras: Vec<SceneCamera>,
    /// Materials
    pub materials: Vec<SceneMaterial>,
    /// World/environment settings
    pub world_settings: IndexMap<String, Value>,
    /// Overall scene dimensions
    pub scene_dimensions: Vec3,
    /// Aggregate vertex count
    pub total_vertices: u64,
    /// Aggregate face count
    pub total_faces: u64,
    /// Number of objects in the snapshot
    pub total_objects: usize,
    /// Render engine name
    pub render_engine: String,
    /// Unit system name
    pub unit_system: String,
    /// Animation frame range (start, end)
    pub frame_range: (i64, i64),
    /// Frames per second
    pub fps: f64,
}

impl SceneState {
    /// Snapshot with empty collections and default scene metadata
    #[must_use]
    pub fn empty() -> Self {
        Self {
            objects: Vec::new(),
            lights: Vec::new(),
            cameras: Vec::new(),
            materials: Vec::new(),
            world_settings: IndexMap::new(),
            scene_dimensions: [10.0, 10.0, 3.0],
            total_vertices: 0,
            total_faces: 0,
            total_objects: 0,
            render_engine: "CYCLES".to_string(),
            unit_system: "METRIC".to_string(),
            frame_range: (1, 250),
            fps: 24.0,
        }
    }

    /// Look up an object by its name
    #[must_use]
    pub fn object(&self, name: &str) -> Option<&SceneObject> {
        self.objects.iter().find(|o| o.name == name)
    }

    /// Recompute aggregate counts from the object collection
    pub(crate) fn recompute_totals(&mut self) {
        self.total_vertices = self.objects.iter().map(|o| o.vertex_count).sum();
        self.total_faces = self.objects.iter().map(|o| o.face_count).sum();
        self.total_objects = self.objects.len();
    }
}

impl Default for SceneState {
    fn default() -> Self {
        Self::empty()
    }
}
