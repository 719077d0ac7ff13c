use std::sync::Mutex;

use tempfile::NamedTempFile;

use stereoscope::ViewerConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "STEREOSCOPE_CONFIG",
        "STEREOSCOPE_LEFT_DEVICE",
        "STEREOSCOPE_RIGHT_DEVICE",
        "STEREOSCOPE_RECORD_PATH",
        "STEREOSCOPE_RECORD_FPS",
        "STEREOSCOPE_TRACKER",
        "STEREOSCOPE_ACTUATOR",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn defaults_match_the_original_rig() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = ViewerConfig::load().expect("load config");
    assert_eq!(cfg.left_device, "0");
    assert_eq!(cfg.right_device, "1");
    assert_eq!(cfg.canvas_width, 720);
    assert_eq!(cfg.canvas_height, 480);
    assert_eq!(cfg.record_path, "output.avi");
    assert_eq!(cfg.record_fps, 15.0);
    assert_eq!(cfg.tracker_device, "stub://hmd");

    let params = cfg.initial_params();
    assert_eq!(params.canvas_width(), 720);
    assert_eq!(params.target_fps, 15.0);

    clear_env();
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "cameras": {
            "left": "2",
            "right": "3"
        },
        "canvas": {
            "width": 640,
            "height": 360
        },
        "recording": {
            "path": "session.avi",
            "fps": 24.0
        },
        "tracking": {
            "device": "stub://bench",
            "actuator": "stub://bench-servo"
        }
    }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("STEREOSCOPE_CONFIG", file.path());
    std::env::set_var("STEREOSCOPE_RIGHT_DEVICE", "stub://right");
    std::env::set_var("STEREOSCOPE_RECORD_FPS", "12.5");

    let cfg = ViewerConfig::load().expect("load config");

    assert_eq!(cfg.left_device, "2");
    assert_eq!(cfg.right_device, "stub://right");
    assert_eq!(cfg.canvas_width, 640);
    assert_eq!(cfg.canvas_height, 360);
    assert_eq!(cfg.record_path, "session.avi");
    assert_eq!(cfg.record_fps, 12.5);
    assert_eq!(cfg.tracker_device, "stub://bench");
    assert_eq!(cfg.actuator_device, "stub://bench-servo");

    clear_env();
}

#[test]
fn identical_camera_devices_are_rejected() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("STEREOSCOPE_LEFT_DEVICE", "stub://same");
    std::env::set_var("STEREOSCOPE_RIGHT_DEVICE", "stub://same");
    assert!(ViewerConfig::load().is_err());

    clear_env();
}

#[test]
fn malformed_fps_override_is_rejected() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("STEREOSCOPE_RECORD_FPS", "fast");
    assert!(ViewerConfig::load().is_err());

    clear_env();
}
