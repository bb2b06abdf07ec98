use std::process::Command;

#[test]
fn terminal_headless_smoke() {
    let bin = env!("CARGO_BIN_EXE_restless-app");
    let mut cmd = Command::new(bin);
    cmd.env("RESTLESS_TERMINAL_HEADLESS", "1")
        .env("RESTLESS_TERMINAL_HEADLESS_FRAMES", "8")
        .env("RESTLESS_WIDTH", "32")
        .env("RESTLESS_HEIGHT", "16")
        .env("RESTLESS_SEED", "42")
        .env("TERM", "xterm-256color")
        .env("RUST_LOG", "off");

    let status = cmd.status().expect("failed to run restless-app binary");
    assert!(status.success(), "terminal headless run failed");
}

#[test]
fn terminal_headless_writes_report() {
    let dir = std::env::temp_dir();
    let path = dir.join(format!("restless_report_{}.json", std::process::id()));

    let bin = env!("CARGO_BIN_EXE_restless-app");
    let status = Command::new(bin)
        .env("RESTLESS_TERMINAL_HEADLESS", "1")
        .env("RESTLESS_TERMINAL_HEADLESS_FRAMES", "4")
        .env("RESTLESS_TERMINAL_REPORT", &path)
        .env("RESTLESS_WIDTH", "16")
        .env("RESTLESS_HEIGHT", "8")
        .env("RESTLESS_SEED", "7")
        .env("RUST_LOG", "off")
        .status()
        .expect("failed to run restless-app binary");
    assert!(status.success(), "terminal headless run failed");

    let raw = std::fs::read_to_string(&path).expect("report file written");
    let report: serde_json::Value = serde_json::from_str(&raw).expect("report is valid JSON");
    assert_eq!(report["frames"], 4);
    assert_eq!(report["final_tick"], 4);
    assert!(report["final_population"].as_u64().is_some());

    let _ = std::fs::remove_file(&path);
}
