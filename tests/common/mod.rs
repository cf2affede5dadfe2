#![allow(dead_code)]

use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

pub struct Sidecar {
    child: Child,
    stdin: Option<ChildStdin>,
    reader: BufReader<ChildStdout>,
    next_id: u64,
}

impl Sidecar {
    /// Starts the sidecar with a scratch config location so the host's config
    /// file and environment cannot leak into the test.
    pub fn spawn(scratch: &Path) -> Sidecar {
        let exe = env!("CARGO_BIN_EXE_simasd");
        let mut child = Command::new(exe)
            .env("SIMASD_CONFIG", scratch.join("no-such-config.toml"))
            .env_remove("SIMASD_WORKSPACE")
            .env("SIMASD_LOG", "warn")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn simasd");
        let stdin = child.stdin.take().expect("child stdin");
        let stdout = child.stdout.take().expect("child stdout");
        Sidecar {
            child,
            stdin: Some(stdin),
            reader: BufReader::new(stdout),
            next_id: 0,
        }
    }

    pub fn send_raw(&mut self, line: &str) -> serde_json::Value {
        let stdin = self.stdin.as_mut().expect("stdin open");
        writeln!(stdin, "{}", line).expect("write request");
        stdin.flush().expect("flush request");

        let mut out = String::new();
        self.reader.read_line(&mut out).expect("read response line");
        assert!(!out.trim().is_empty(), "empty response for {}", line);
        serde_json::from_str(out.trim()).expect("parse response json")
    }

    pub fn request(&mut self, method: &str, params: serde_json::Value) -> serde_json::Value {
        self.next_id += 1;
        let id = self.next_id.to_string();
        let payload = json!({
            "id": id,
            "method": method,
            "params": params,
        });
        let value = self.send_raw(&payload.to_string());
        assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id.as_str()));
        value
    }

    pub fn ok(&mut self, method: &str, params: serde_json::Value) -> serde_json::Value {
        let value = self.request(method, params);
        assert!(
            value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
            "{} failed: {}",
            method,
            value
        );
        value.get("result").cloned().unwrap_or_else(|| json!({}))
    }

    /// Sends a request that must fail and returns its error code.
    pub fn fail(&mut self, method: &str, params: serde_json::Value) -> String {
        let value = self.request(method, params);
        assert_eq!(
            value.get("ok").and_then(|v| v.as_bool()),
            Some(false),
            "{} unexpectedly succeeded: {}",
            method,
            value
        );
        value
            .get("error")
            .and_then(|e| e.get("code"))
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string()
    }

    pub fn open_as_guest(&mut self, workspace: &Path) -> serde_json::Value {
        self.ok(
            "workspace.select",
            json!({ "path": workspace.to_string_lossy() }),
        );
        self.ok("session.guest", json!({}))
    }
}

impl Drop for Sidecar {
    fn drop(&mut self) {
        // Closing stdin ends the request loop.
        self.stdin.take();
        let _ = self.child.wait();
    }
}

pub fn write_csv(path: &Path, rows: &[[&str; 3]]) {
    let mut text = String::from("NIS,Nama,Kelas\n");
    for r in rows {
        text.push_str(&format!("{},{},{}\n", r[0], r[1], r[2]));
    }
    std::fs::write(path, text).expect("write csv");
}

/// Student id for a NIS, looked up through `students.list`.
pub fn student_id(sidecar: &mut Sidecar, nis: &str) -> String {
    let listed = sidecar.ok("students.list", json!({}));
    listed["students"]
        .as_array()
        .expect("students array")
        .iter()
        .find(|s| s["nis"] == nis)
        .and_then(|s| s["id"].as_str())
        .unwrap_or_else(|| panic!("no student with nis {nis}"))
        .to_string()
}

pub fn march_2024() -> serde_json::Value {
    json!({ "kind": "month", "year": 2024, "month": 3 })
}
