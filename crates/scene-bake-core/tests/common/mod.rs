//! Shared fixtures for the integration tests

#![allow(dead_code)]

use glam::DVec3;
use scene_bake_core::SceneDocument;

/// A two-bone character with a blend shape plus a static prop
///
/// - `Body` (node 1): quad split into two materials, per-corner UVs,
///   control points 0-1 bound to `Hip`, 2-3 bound to `Spine`, and a
///   `Bulge` channel pushing every control point +Z by 1 at full weight.
/// - `Spine` (node 3) moves from the origin to +Y 2 between t=0 and t=1.
/// - `Prop` (node 4): a triangle translated to +X 5.
pub const CHARACTER: &str = r#"{
  "root": 0,
  "nodes": [
    { "name": "Root", "children": [1, 2, 4] },
    { "name": "Body", "mesh": 0, "materials": [0, 1] },
    { "name": "Hip", "children": [3] },
    { "name": "Spine",
      "translation": {
        "value": [0, 0, 0],
        "curve": { "keys": [ { "time": 0, "value": [0, 0, 0] }, { "time": 1, "value": [0, 2, 0] } ] }
      } },
    { "name": "Prop", "mesh": 1, "materials": [1],
      "translation": { "value": [5, 0, 0] } }
  ],
  "meshes": [
    {
      "name": "BodyShape",
      "control_points": [[0, 0, 0], [1, 0, 0], [1, 1, 0], [0, 1, 0]],
      "polygons": [[0, 1, 2], [0, 2, 3]],
      "normals": { "mapping": "by_control_point", "direct": [[0, 0, 1], [0, 0, 1], [0, 0, 1], [0, 0, 1]] },
      "uvs": {
        "mapping": "by_polygon_vertex",
        "reference": "index_to_direct",
        "direct": [[0, 0], [1, 0], [1, 1], [0, 1]],
        "index": [0, 1, 2, 0, 2, 3]
      },
      "materials": { "mapping": "by_polygon", "indices": [0, 1] },
      "skins": [
        {
          "skinning_type": "linear",
          "link_mode": "normalize",
          "clusters": [
            { "link": 2, "indices": [0, 1], "weights": [1, 1] },
            { "link": 3, "indices": [2, 3], "weights": [1, 1] }
          ]
        }
      ],
      "blend_shapes": [
        {
          "name": "Morphs",
          "channels": [
            {
              "name": "Bulge",
              "weight": { "keys": [ { "time": 0, "value": 0 }, { "time": 1, "value": 100 } ] },
              "targets": [ { "name": "BulgeFull", "control_points": [[0, 0, 1], [1, 0, 1], [1, 1, 1], [0, 1, 1]] } ],
              "full_weights": [100]
            }
          ]
        }
      ]
    },
    {
      "name": "PropShape",
      "control_points": [[0, 0, 0], [1, 0, 0], [0, 1, 0]],
      "polygons": [[0, 1, 2]]
    }
  ],
  "materials": [
    { "name": "Cloth",
      "properties": {
        "Diffuse": { "value": [1, 0, 0], "textures": ["cloth.png"] },
        "DiffuseFactor": { "value": 0.5 }
      } },
    { "name": "Metal",
      "properties": {
        "Specular": { "value": [1, 1, 1] },
        "Shininess": { "value": 40 }
      } }
  ],
  "poses": [
    { "name": "Bind", "bind_pose": true,
      "entries": [ { "node": 3, "matrix": [1, 0, 0, 0, 0, 1, 0, 0, 0, 0, 1, 0, 0, 0, 0, 1] } ] }
  ]
}"#;

/// Route library logs through the test harness
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn character() -> SceneDocument {
    init_logging();
    SceneDocument::from_json_str(CHARACTER).expect("fixture parses")
}

/// Positions of a baked mesh, dropping the w component
pub fn positions(buffer: &[f32]) -> Vec<DVec3> {
    buffer
        .chunks(4)
        .map(|v| DVec3::new(v[0] as f64, v[1] as f64, v[2] as f64))
        .collect()
}

pub fn assert_close(actual: DVec3, expected: DVec3) {
    assert!(
        actual.abs_diff_eq(expected, 1e-5),
        "{actual:?} != {expected:?}"
    );
}
