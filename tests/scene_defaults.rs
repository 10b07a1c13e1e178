use std::cell::Cell;
use std::rc::Rc;

use cgmath::{InnerSpace, Quaternion, Rad, Rotation3, Vector3};
use metabot_stage::avatar::AvatarState;
use metabot_stage::config::ModelConfig;
use metabot_stage::fetch::Location;
use metabot_stage::lighting::{LightDescriptor, PointOrigin};
use metabot_stage::loader::ConfigLoader;
use metabot_stage::scene::SceneHost;

fn mounted(dir: &tempfile::TempDir, config: &str) -> SceneHost {
    let config_path = dir.path().join("metabot.yaml");
    if !config.is_empty() {
        std::fs::write(&config_path, config).unwrap();
    }
    let mut scene = SceneHost::new(
        ConfigLoader::spawn(Location::file(&config_path)),
        Location::file(dir.path().join("robot.glb")),
        64,
        48,
        1,
        Box::new(|| {}),
    );
    scene.wait_until_loaded();
    scene
}

fn points(scene: &SceneHost, origin: PointOrigin) -> usize {
    scene
        .rig()
        .unwrap()
        .descriptors()
        .iter()
        .filter(|d| matches!(d, LightDescriptor::Point { origin: o, .. } if *o == origin))
        .count()
}

#[test]
fn unreachable_document_renders_with_exact_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let scene = mounted(&dir, "");

    assert_eq!(scene.config(), Some(&ModelConfig::default()));
    assert_eq!(scene.avatar_state(), AvatarState::FallbackActive);
    let rig = scene.rig().unwrap();
    assert!(matches!(rig.descriptors()[0], LightDescriptor::Hemisphere { .. }));
    assert_eq!(points(&scene, PointOrigin::Generated), 26);
    assert_eq!(points(&scene, PointOrigin::Configured), 0);
    assert!(rig.has_camera_light());

    let camera = scene.camera().unwrap();
    assert!((camera.get_frustum().fovy() - 45f32.to_radians()).abs() < 1e-6);
    assert!((camera.eye - Vector3::new(0.0, 1.0, 6.0)).magnitude() < 1e-4);

    let root = scene.presenter().unwrap().root().unwrap();
    assert_eq!(root.scale, Vector3::new(1.0, 1.0, 1.0));
    assert!(scene.shadow_plane().is_some());
}

#[test]
fn document_overrides_reach_the_stage() {
    let dir = tempfile::tempdir().unwrap();
    let scene = mounted(
        &dir,
        "model:\n  scale: 2\n  rotation: [0, 90, 0]\n\
         lighting:\n  pointLights:\n    enabled: false\n  camera:\n    enabled: false\n\
         shadows:\n  ground:\n    visible: false\n",
    );

    assert_eq!(points(&scene, PointOrigin::Generated), 0);
    assert!(!scene.rig().unwrap().has_camera_light());
    assert!(scene.shadow_plane().is_none());
    // 未修改的半球光保持开启
    let config = scene.config().unwrap();
    assert!(config.lighting.hemisphere.enabled);

    let root = scene.presenter().unwrap().root().unwrap();
    assert_eq!(root.scale, Vector3::new(2.0, 2.0, 2.0));
    let expected = Quaternion::from_angle_y(Rad(std::f32::consts::FRAC_PI_2));
    assert!((root.rotation - expected).magnitude() < 1e-5);
}

#[test]
fn clicking_the_fallback_invokes_the_callback_once_per_activation() {
    let dir = tempfile::tempdir().unwrap();
    let clicks = Rc::new(Cell::new(0u32));
    let counter = clicks.clone();
    let mut scene = SceneHost::new(
        ConfigLoader::spawn(Location::file(dir.path().join("none.yaml"))),
        Location::file(dir.path().join("none.glb")),
        64,
        48,
        1,
        Box::new(move || counter.set(counter.get() + 1)),
    );
    scene.wait_until_loaded();
    scene.frame(0.0);
    scene.render();

    assert!(scene.pointer_down(32, 24));
    assert!(scene.pointer_down(32, 24));
    assert!(!scene.pointer_down(0, 0));
    assert_eq!(clicks.get(), 2);
}
