mod common;

use common::{student_id, write_csv, Sidecar};
use serde_json::json;

#[test]
fn session_and_data_survive_restart() {
    let scratch = tempfile::tempdir().expect("tempdir");
    let workspace = scratch.path().join("ws");
    let roster = scratch.path().join("siswa.csv");
    write_csv(&roster, &[["001", "Budi", "10A"]]);

    {
        let mut s = Sidecar::spawn(scratch.path());
        s.ok(
            "workspace.select",
            json!({ "path": workspace.to_string_lossy() }),
        );
        let signed_in = s.ok(
            "session.signIn",
            json!({ "id": "g-123", "name": "Bu Guru", "email": "guru@sekolah.id" }),
        );
        assert_eq!(signed_in["user"]["guest"], false);
        assert_eq!(signed_in["studentCount"], 0);

        s.ok("students.import", json!({ "path": roster.to_string_lossy() }));
        let sid = student_id(&mut s, "001");
        s.ok(
            "attendance.record",
            json!({ "studentId": sid, "date": "2024-03-01", "status": "Hadir" }),
        );
    }

    let mut s = Sidecar::spawn(scratch.path());
    let opened = s.ok(
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    assert_eq!(opened["user"]["id"], "g-123");
    assert_eq!(opened["user"]["email"], "guru@sekolah.id");

    let listed = s.ok("students.list", json!({}));
    assert_eq!(listed["students"].as_array().map(|a| a.len()), Some(1));
    let day = s.ok("attendance.dayOpen", json!({ "date": "2024-03-01" }));
    assert_eq!(day["classes"][0]["students"][0]["status"], "Hadir");
}

#[test]
fn identities_keep_separate_data() {
    let scratch = tempfile::tempdir().expect("tempdir");
    let workspace = scratch.path().join("ws");
    let roster = scratch.path().join("siswa.csv");
    write_csv(&roster, &[["001", "Budi", "10A"], ["002", "Siti", "10A"]]);

    let mut s = Sidecar::spawn(scratch.path());
    s.ok(
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    s.ok("session.signIn", json!({ "id": "g-1", "name": "Guru Satu" }));
    s.ok("students.import", json!({ "path": roster.to_string_lossy() }));

    s.ok("session.signOut", json!({}));
    assert!(s.ok("session.current", json!({}))["user"].is_null());
    assert_eq!(s.fail("students.list", json!({})), "no_session");

    let guest = s.ok("session.guest", json!({}));
    assert_eq!(guest["studentCount"], 0);

    let back = s.ok("session.signIn", json!({ "id": "g-1", "name": "Guru Satu" }));
    assert_eq!(back["studentCount"], 2);
}

#[test]
fn sign_out_is_remembered_across_restart() {
    let scratch = tempfile::tempdir().expect("tempdir");
    let workspace = scratch.path().join("ws");
    {
        let mut s = Sidecar::spawn(scratch.path());
        s.open_as_guest(&workspace);
        s.ok("session.signOut", json!({}));
    }
    let mut s = Sidecar::spawn(scratch.path());
    let opened = s.ok(
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    assert!(opened["user"].is_null());
}

#[test]
fn clear_resets_roster_and_records() {
    let scratch = tempfile::tempdir().expect("tempdir");
    let workspace = scratch.path().join("ws");
    let roster = scratch.path().join("siswa.csv");
    write_csv(&roster, &[["001", "Budi", "10A"]]);

    {
        let mut s = Sidecar::spawn(scratch.path());
        s.open_as_guest(&workspace);
        s.ok("students.import", json!({ "path": roster.to_string_lossy() }));
        let sid = student_id(&mut s, "001");
        s.ok(
            "attendance.record",
            json!({ "studentId": sid, "date": "2024-03-01", "status": "Izin" }),
        );
        s.ok("students.clear", json!({}));

        let listed = s.ok("students.list", json!({}));
        assert_eq!(listed["students"], json!([]));
        let day = s.ok("attendance.dayOpen", json!({ "date": "2024-03-01" }));
        assert_eq!(day["classes"], json!([]));
        assert_eq!(day["counts"]["Izin"], 0);
    }

    let mut s = Sidecar::spawn(scratch.path());
    let opened = s.ok(
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    assert_eq!(opened["user"]["id"], "guest_local_user");
    assert_eq!(s.ok("students.list", json!({}))["students"], json!([]));
}

#[test]
fn sign_in_requires_id_and_name() {
    let scratch = tempfile::tempdir().expect("tempdir");
    let mut s = Sidecar::spawn(scratch.path());
    s.ok(
        "workspace.select",
        json!({ "path": scratch.path().join("ws").to_string_lossy() }),
    );
    assert_eq!(
        s.fail("session.signIn", json!({ "name": "Tanpa Id" })),
        "bad_params"
    );
    assert_eq!(s.fail("session.signIn", json!({ "id": "x" })), "bad_params");
}

fn overwrite_guest_blob(workspace: &std::path::Path, payload: &str) {
    let conn = rusqlite::Connection::open(workspace.join("simas.sqlite3")).expect("open db");
    let changed = conn
        .execute(
            "UPDATE user_data SET payload = ? WHERE user_key = 'simas_data_guest_local_user'",
            [payload],
        )
        .expect("update blob");
    assert_eq!(changed, 1);
}

#[test]
fn damaged_stored_data_does_not_block_workspace() {
    let scratch = tempfile::tempdir().expect("tempdir");
    let workspace = scratch.path().join("ws");
    let roster = scratch.path().join("siswa.csv");
    write_csv(&roster, &[["001", "Budi", "10A"]]);
    {
        let mut s = Sidecar::spawn(scratch.path());
        s.open_as_guest(&workspace);
        s.ok("students.import", json!({ "path": roster.to_string_lossy() }));
    }

    overwrite_guest_blob(
        &workspace,
        r#"{"students":[{"id":"s1","nis":"001","name":"Budi","className":"10A"}],
            "records":[
                {"id":"r1","studentId":"s1","date":"2024-03-01","status":"Hadir"},
                {"id":"r2","studentId":"s1","date":"bukan-tanggal","status":"Sakit"}
            ]}"#,
    );
    {
        let mut s = Sidecar::spawn(scratch.path());
        let opened = s.ok(
            "workspace.select",
            json!({ "path": workspace.to_string_lossy() }),
        );
        assert_eq!(opened["user"]["id"], "guest_local_user");
        let recap = s.ok(
            "recap.open",
            json!({ "window": { "kind": "month", "year": 2024, "month": 3 } }),
        );
        assert_eq!(recap["rows"][0]["present"], 1);
        assert_eq!(recap["rows"][0]["total"], 1);
    }

    overwrite_guest_blob(&workspace, "not json at all");
    let mut s = Sidecar::spawn(scratch.path());
    let opened = s.ok(
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    assert!(opened["user"].is_null());
    assert_eq!(opened["workspacePath"], workspace.to_string_lossy().as_ref());
    assert_eq!(s.fail("students.list", json!({})), "no_session");
    s.ok("health", json!({}));
}
