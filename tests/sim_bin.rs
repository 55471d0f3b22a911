use std::process::Command;

#[test]
fn sim_binary_smoke() {
    let output = Command::new("cargo")
        .args(["run", "--quiet", "--bin", "sim", "--", "1", "2"])
        .current_dir(env!("CARGO_MANIFEST_DIR"))
        .output()
        .expect("failed to run sim binary");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("non utf8 output");
    let lines: Vec<&str> = stdout.lines().filter(|l| l.starts_with('{')).collect();
    assert_eq!(lines.len(), 2);
    for (line, seed) in lines.iter().zip([1, 2]) {
        let v: serde_json::Value = serde_json::from_str(line).expect("invalid json");
        assert_eq!(v["seed"], seed);
        assert!(v["winner"].is_string());
        assert_eq!(v[v["winner"].as_str().unwrap().to_lowercase()]["hits"], 17);
    }
}
