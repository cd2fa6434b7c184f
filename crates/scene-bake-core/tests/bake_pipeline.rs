//! End-to-end bake passes over a JSON scene document

mod common;

use common::{assert_close, character, positions};
use glam::{DVec2, DVec3};
use pretty_assertions::assert_eq;
use scene_bake_core::{
    BakeError, BakeOptions, ExportOptions, MaterialId, PoseSelection, SubMesh, VertexLayout,
    bake_scene, export_to_json, export_to_path,
};

fn bake_at(time: f64) -> scene_bake_core::BakeOutput {
    bake_scene(&character(), &BakeOptions::at_time(time)).unwrap()
}

#[test]
fn test_rest_state_matches_source_geometry() {
    let output = bake_at(0.0);

    assert_eq!(output.meshes.len(), 2);
    assert!(output.failures.is_empty());

    let body = &output.meshes[0];
    assert_eq!(body.name, "BodyShape");
    assert_eq!(body.layout, VertexLayout::ByPolygonVertex);
    assert_eq!(body.vertex_count(), 6);
    assert_eq!(body.indices, vec![0, 1, 2, 3, 4, 5]);
    assert_eq!(
        body.submeshes,
        vec![
            SubMesh {
                index_offset: 0,
                triangle_count: 1
            },
            SubMesh {
                index_offset: 3,
                triangle_count: 1
            },
        ]
    );

    let expected = [
        DVec3::new(0.0, 0.0, 0.0),
        DVec3::new(1.0, 0.0, 0.0),
        DVec3::new(1.0, 1.0, 0.0),
        DVec3::new(0.0, 0.0, 0.0),
        DVec3::new(1.0, 1.0, 0.0),
        DVec3::new(0.0, 1.0, 0.0),
    ];
    for (actual, expected) in positions(&body.positions).into_iter().zip(expected) {
        assert_close(actual, expected);
    }

    let uvs: Vec<DVec2> = body
        .uvs
        .chunks(2)
        .map(|uv| DVec2::new(uv[0] as f64, uv[1] as f64))
        .collect();
    assert_eq!(uvs[2], DVec2::new(1.0, 1.0));
    assert_eq!(uvs[5], DVec2::new(0.0, 1.0));
    assert_eq!(body.normals.len(), 18);
}

#[test]
fn test_prop_is_placed_in_world_space() {
    let output = bake_at(0.0);
    let prop = &output.meshes[1];

    assert_eq!(prop.layout, VertexLayout::ByControlPoint);
    assert_eq!(prop.indices, vec![0, 1, 2]);
    let baked = positions(&prop.positions);
    assert_close(baked[0], DVec3::new(5.0, 0.0, 0.0));
    assert_close(baked[1], DVec3::new(6.0, 0.0, 0.0));
    assert_close(baked[2], DVec3::new(5.0, 1.0, 0.0));
}

#[test]
fn test_animated_skin_and_blend_shape() {
    let body = &bake_at(1.0).meshes[0];
    let baked = positions(&body.positions);

    // Full shape weight lands every corner on the target shape
    assert_close(baked[0], DVec3::new(0.0, 0.0, 1.0));
    assert_close(baked[1], DVec3::new(1.0, 0.0, 1.0));
    assert_close(baked[2], DVec3::new(1.0, 1.0, 1.0));
    assert_close(baked[5], DVec3::new(0.0, 1.0, 1.0));

    // Spine skins control point 2 to (1, 2, 0), then the shape pulls halfway
    let halfway = positions(&bake_at(0.5).meshes[0].positions);
    assert_close(halfway[0], DVec3::new(0.0, 0.0, 0.5));
    assert_close(halfway[2], DVec3::new(1.0, 1.5, 0.5));
}

/// One triangle whose first corner is bound to a bone turned 90 degrees
/// about Z and is also moved by a half-weight blend shape
const SKIN_AND_SHAPE: &str = r#"{
  "root": 0,
  "nodes": [
    { "name": "Root", "children": [1, 2] },
    { "name": "Fin", "mesh": 0 },
    { "name": "Bone", "rotation": { "value": [0, 0, 90] } }
  ],
  "meshes": [
    {
      "name": "FinShape",
      "control_points": [[1, 0, 0], [2, 0, 0], [1, 1, 0]],
      "polygons": [[0, 1, 2]],
      "skins": [
        { "clusters": [ { "link": 2, "indices": [0], "weights": [1] } ] }
      ],
      "blend_shapes": [
        {
          "name": "Morphs",
          "channels": [
            {
              "name": "Lift",
              "weight": { "keys": [ { "time": 0, "value": 50 } ] },
              "targets": [ { "name": "LiftFull", "control_points": [[1, 0, 2], [2, 0, 0], [1, 1, 0]] } ],
              "full_weights": [100]
            }
          ]
        }
      ]
    }
  ]
}"#;

#[test]
fn test_blend_shapes_apply_after_skinning() {
    common::init_logging();
    let scene = scene_bake_core::SceneDocument::from_json_str(SKIN_AND_SHAPE).unwrap();
    let output = bake_scene(&scene, &BakeOptions::default()).unwrap();
    let baked = positions(&output.meshes[0].positions);

    // Skinned to (0, 1, 0), then half way toward (1, 0, 2).
    // Shaping first and skinning after would give (0, 1, 1).
    assert_close(baked[0], DVec3::new(0.5, 0.5, 1.0));
    assert_close(baked[1], DVec3::new(2.0, 0.0, 0.0));
    assert_close(baked[2], DVec3::new(1.0, 1.0, 0.0));
}

#[test]
fn test_deformation_leaves_topology_alone() {
    let rest = bake_at(0.0);
    let posed = bake_at(1.0);

    assert_eq!(rest.meshes[0].indices, posed.meshes[0].indices);
    assert_eq!(rest.meshes[0].uvs, posed.meshes[0].uvs);
    assert_eq!(rest.meshes[0].normals, posed.meshes[0].normals);
    assert_eq!(rest.meshes[0].submeshes, posed.meshes[0].submeshes);
}

#[test]
fn test_bind_pose_freezes_skeleton() {
    let options = BakeOptions {
        time: 1.0,
        pose: PoseSelection::FirstBindPose,
        parallel: false,
    };
    let output = bake_scene(&character(), &options).unwrap();
    let baked = positions(&output.meshes[0].positions);

    // Spine held at the origin; the blend shape still follows its curve
    assert_close(baked[2], DVec3::new(1.0, 1.0, 1.0));

    let halfway = bake_scene(
        &character(),
        &BakeOptions {
            time: 0.5,
            ..options
        },
    )
    .unwrap();
    assert_close(
        positions(&halfway.meshes[0].positions)[2],
        DVec3::new(1.0, 1.0, 0.5),
    );
}

#[test]
fn test_materials_baked_once() {
    let output = bake_at(0.0);

    assert_eq!(output.materials.len(), 2);
    let cloth = &output.materials[&MaterialId(0)];
    assert_eq!(cloth.diffuse.color, [0.5, 0.0, 0.0, 1.0]);
    assert_eq!(cloth.diffuse.texture.as_deref(), Some("cloth.png"));
    assert_eq!(output.materials[&MaterialId(1)].shininess, 40.0);
}

#[test]
fn test_parallel_bake_matches_sequential() {
    let scene = character();
    let options = BakeOptions::at_time(0.75);
    let sequential = bake_scene(&scene, &options).unwrap();
    let parallel = bake_scene(
        &scene,
        &BakeOptions {
            parallel: true,
            ..options
        },
    )
    .unwrap();

    assert_eq!(sequential.meshes, parallel.meshes);
    assert_eq!(sequential.materials, parallel.materials);
}

#[test]
fn test_corrupt_mesh_does_not_stop_siblings() {
    let mut scene = character();
    scene.meshes[0].polygons[1] = vec![0, 2, 9];

    let output = bake_scene(&scene, &BakeOptions::default()).unwrap();
    assert_eq!(output.meshes.len(), 1);
    assert_eq!(output.meshes[0].name, "PropShape");
    assert_eq!(output.failures.len(), 1);
    assert_eq!(output.failures[0].name, "Body");
    assert!(matches!(
        output.failures[0].error,
        BakeError::CorruptTopology { .. }
    ));
}

#[test]
fn test_unlinked_cluster_is_skipped() {
    let mut scene = character();
    scene.meshes[0].skins[0].clusters[1].link = None;

    let output = bake_scene(&scene, &BakeOptions::at_time(1.0)).unwrap();
    let baked = positions(&output.meshes[0].positions);

    // Control point 2 keeps only the blend shape offset
    let halfway = bake_scene(&scene, &BakeOptions::at_time(0.5)).unwrap();
    assert_close(
        positions(&halfway.meshes[0].positions)[2],
        DVec3::new(1.0, 1.0, 0.5),
    );
    assert_close(baked[2], DVec3::new(1.0, 1.0, 1.0));
}

#[test]
fn test_export_round_trip_through_file() {
    let output = bake_at(1.0);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("character.baked.json");
    export_to_path(&output, &path, &ExportOptions::default()).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["meshes"].as_array().map(Vec::len), Some(2));
    assert_eq!(value["meshes"][0]["indices"].as_array().map(Vec::len), Some(6));
    assert_eq!(value["materials"]["1"]["name"], "Metal");

    let mut compact = Vec::new();
    export_to_json(
        &output,
        &mut compact,
        &ExportOptions {
            pretty: false,
            include_materials: false,
        },
    )
    .unwrap();
    assert!(!compact.contains(&b'\n'));
}
