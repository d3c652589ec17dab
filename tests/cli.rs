use assert_cmd::Command;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const DIM: usize = 3;

fn temp_workspace() -> TempDir {
    tempfile::tempdir().expect("create tempdir")
}

fn write_split(path: &Path, rows: &[(&str, &str, i64)], vocab: &[(&str, u64)]) {
    let body = json!({
        "data": {
            "c": rows.iter().map(|row| row.0).collect::<Vec<_>>(),
            "r": rows.iter().map(|row| row.1).collect::<Vec<_>>(),
            "y": rows.iter().map(|row| row.2).collect::<Vec<_>>(),
        },
        "vocab": vocab.iter().map(|(word, count)| json!([word, count])).collect::<Vec<_>>(),
    });
    fs::write(path, serde_json::to_vec(&body).expect("encode split")).expect("write split");
}

fn write_fixture(dir: &Path) {
    write_split(
        &dir.join("trainset.json"),
        &[
            ("how do i mount", "use mount", 1),
            ("thanks", "np", 0),
            ("mount fails", "check dmesg", 1),
        ],
        &[
            ("how", 1),
            ("do", 1),
            ("i", 1),
            ("mount", 3),
            ("use", 1),
            ("thanks", 1),
            ("np", 1),
            ("fails", 1),
            ("check", 1),
            ("dmesg", 2),
        ],
    );
    write_split(
        &dir.join("valset.json"),
        &[("mount it", "ok", 1)],
        &[("mount", 1), ("it", 1), ("ok", 1)],
    );
    write_split(
        &dir.join("testset.json"),
        &[("kernel panic", "reboot", 0)],
        &[("kernel", 1), ("panic", 1), ("reboot", 1)],
    );
}

fn write_word2vec(path: &Path, records: &[(&str, [f32; DIM])]) {
    let mut bytes = format!("{} {DIM}\n", records.len()).into_bytes();
    for (word, vector) in records {
        bytes.extend_from_slice(word.as_bytes());
        bytes.push(b' ');
        for value in vector {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        bytes.push(b'\n');
    }
    fs::write(path, bytes).expect("write word2vec source");
}

fn read_json(path: &Path) -> Value {
    let raw = fs::read(path).expect("read artifact");
    serde_json::from_slice(&raw).expect("artifact is valid JSON")
}

fn build_command(workspace: &TempDir) -> Command {
    build_command_with_dim(workspace, DIM)
}

fn build_command_with_dim(workspace: &TempDir, dim: usize) -> Command {
    let dim = dim.to_string();
    let mut cmd = Command::cargo_bin("embprep").expect("binary exists");
    cmd.current_dir(workspace.path()).args([
        "--quiet",
        "build",
        "--embeddings",
        "vectors.bin",
        "--input-dir",
        "data",
        "--output-dir",
        "out",
        "--batch-size",
        "2",
        "--embedding-dim",
        dim.as_str(),
        "--no-progress",
    ]);
    cmd
}

fn prepare(workspace: &TempDir) {
    let data = workspace.path().join("data");
    fs::create_dir_all(&data).expect("create data dir");
    write_fixture(&data);
    write_word2vec(
        &workspace.path().join("vectors.bin"),
        &[
            ("Mount", [1.0, 2.0, 3.0]),
            ("check", [0.5, 0.5, 0.5]),
            ("unused", [9.0, 9.0, 9.0]),
        ],
    );
}

#[test]
fn build_writes_aligned_artifacts() {
    let workspace = temp_workspace();
    prepare(&workspace);

    build_command(&workspace)
        .args(["--metrics", "metrics.json"])
        .assert()
        .success();

    let out = workspace.path().join("out");
    let (pretrained, random) = (
        read_json(&out.join("pretrained_embeddings.json")),
        read_json(&out.join("random_embeddings.json")),
    );
    let index = &pretrained[1];
    assert_eq!(index, &random[1], "both matrices share one word index");
    // mount, check, dmesg (count 2), then the unknown token.
    assert_eq!(index.as_object().expect("index object").len(), 4);
    assert_eq!(index["mount"], 1);
    assert_eq!(index["check"], 2);
    assert_eq!(index["dmesg"], 3);
    assert_eq!(index["**unknown**"], 4);

    let dims = pretrained[0]["dim"].as_array().expect("matrix dims");
    assert_eq!(dims, &vec![json!(5), json!(DIM)]);
    let data = pretrained[0]["data"].as_array().expect("matrix data");
    assert!(data[..DIM].iter().all(|v| v.as_f64() == Some(0.0)));
    let mount_row: Vec<f64> = data[DIM..2 * DIM]
        .iter()
        .map(|v| v.as_f64().expect("float"))
        .collect();
    assert_eq!(mount_row, vec![1.0, 2.0, 3.0]);

    let dataset = read_json(&out.join("dataset.json"));
    let train = &dataset[0];
    assert_eq!(train["y"], json!([1, 0, 1, 1]));
    assert_eq!(train["c"][0], json!([4, 4, 4, 1]));
    assert_eq!(train["r"][2], json!([2, 3]));
    assert_eq!(dataset[1]["y"].as_array().expect("labels").len(), 2);
    assert_eq!(dataset[2]["c"], json!([[4, 4]]));

    let vocab = read_json(&out.join("vocab.json"));
    assert_eq!(vocab.as_array().expect("vocab entries").len(), 16);
    assert_eq!(vocab[3], json!(["mount", 3]));

    let metrics = read_json(&workspace.path().join("metrics.json"));
    assert_eq!(metrics["resolved"], 2);
    assert_eq!(metrics["train"]["padded_rows"], 4);
}

#[test]
fn suffix_names_train_input_and_outputs() {
    let workspace = temp_workspace();
    prepare(&workspace);
    let data = workspace.path().join("data");
    fs::rename(data.join("trainset.json"), data.join("trainset_small.json"))
        .expect("rename train split");

    build_command(&workspace)
        .args(["--suffix", "_small"])
        .assert()
        .success();

    let out = workspace.path().join("out");
    for stem in ["dataset", "pretrained_embeddings", "random_embeddings", "vocab"] {
        assert!(out.join(format!("{stem}_small.json")).exists(), "{stem} written");
    }
}

#[test]
fn info_reports_matrix_shape() {
    let workspace = temp_workspace();
    prepare(&workspace);
    build_command(&workspace).assert().success();

    let output = Command::cargo_bin("embprep")
        .expect("binary exists")
        .current_dir(workspace.path())
        .args(["info", "out/random_embeddings.json", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let summary: Value = serde_json::from_slice(&output).expect("info output is valid JSON");
    assert_eq!(summary["rows"], 5);
    assert_eq!(summary["dim"], DIM);
    assert_eq!(summary["vocab_size"], 4);
    assert_eq!(summary["unknown_index"], 4);
}

#[test]
fn missing_split_fails_without_output() {
    let workspace = temp_workspace();
    prepare(&workspace);
    fs::remove_file(workspace.path().join("data/testset.json")).expect("remove test split");

    build_command(&workspace).assert().failure();
    assert!(!workspace.path().join("out").exists());
}

#[test]
fn dimension_mismatch_fails() {
    let workspace = temp_workspace();
    prepare(&workspace);

    let output = build_command_with_dim(&workspace, DIM + 1)
        .assert()
        .failure()
        .code(1)
        .get_output()
        .clone();
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("malformed embedding record 0"),
        "unexpected stderr: {stderr}"
    );
    assert!(stderr.contains("header dimension 3 does not match configured 4"));
    assert!(!workspace.path().join("out").exists());
}

#[test]
fn rust_log_applies_without_verbosity_flags() {
    let workspace = temp_workspace();
    prepare(&workspace);

    let output = Command::cargo_bin("embprep")
        .expect("binary exists")
        .current_dir(workspace.path())
        .env("RUST_LOG", "debug")
        .args([
            "build",
            "--embeddings",
            "vectors.bin",
            "--input-dir",
            "data",
            "--output-dir",
            "out",
            "--embedding-dim",
            "3",
            "--no-progress",
        ])
        .assert()
        .success()
        .get_output()
        .clone();
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("DEBUG"), "debug records expected: {stderr}");
}
