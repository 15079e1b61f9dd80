// Copyright 2025 dentsusoken
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

mod common;

use common::TestHome;
use kvlock::store::AtomicStore;
use predicates::prelude::*;
use predicates::str::contains;

#[test]
fn help_lists_lock_commands() {
    let home = TestHome::new();
    home.kvlock()
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("acquire"))
        .stdout(contains("force-release"))
        .stdout(contains("--store-dir"));
}

#[test]
fn acquire_prints_token_and_busy_exits_with_3() {
    let home = TestHome::new();

    home.kvlock()
        .args(["acquire", "orders", "--token", "t1", "--ttl", "10"])
        .assert()
        .success()
        .stdout("t1\n");

    home.kvlock()
        .args(["acquire", "orders", "--token", "t2"])
        .assert()
        .code(3)
        .stderr(contains("Lock 'orders' is busy"));
}

#[test]
fn acquire_without_token_generates_one() {
    let home = TestHome::new();

    let output = home
        .kvlock()
        .args(["acquire", "orders"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let token = String::from_utf8(output.stdout).unwrap();
    let record = home.open_store().inspect("orders").unwrap().unwrap();
    assert_eq!(token.trim(), record.held_by);
}

#[test]
fn release_with_wrong_token_keeps_lock() {
    let home = TestHome::new();
    home.kvlock()
        .args(["acquire", "orders", "--token", "t1", "--ttl", "10"])
        .assert()
        .success();

    home.kvlock()
        .args(["release", "orders", "--token", "intruder"])
        .assert()
        .success();
    assert!(home.open_store().inspect("orders").unwrap().is_some());

    home.kvlock()
        .args(["release", "orders", "--token", "t1"])
        .assert()
        .success();
    assert!(home.open_store().inspect("orders").unwrap().is_none());
}

#[test]
fn force_release_frees_key() {
    let home = TestHome::new();
    home.kvlock()
        .args(["acquire", "orders", "--token", "t1", "--ttl", "10"])
        .assert()
        .success();

    home.kvlock()
        .args(["force-release", "orders"])
        .assert()
        .success();

    home.kvlock()
        .args(["acquire", "orders", "--token", "t2"])
        .assert()
        .success()
        .stdout("t2\n");
}

#[test]
fn retry_flags_wait_before_giving_up() {
    let home = TestHome::new();
    home.kvlock()
        .args(["acquire", "orders", "--token", "t1", "--ttl", "10"])
        .assert()
        .success();

    home.kvlock()
        .args([
            "acquire",
            "orders",
            "--token",
            "t2",
            "--retry-times",
            "2",
            "--retry-sleep-ms",
            "50",
        ])
        .assert()
        .code(3)
        .stderr(contains("Gave up on lock 'orders' after 2 attempt(s)"));
}

#[test]
fn wait_conflicts_with_retry_flags() {
    let home = TestHome::new();
    home.kvlock()
        .args(["acquire", "orders", "--wait", "--retry-times", "2"])
        .assert()
        .failure()
        .stderr(contains("cannot be used with"));
}

#[test]
fn enter_and_exit_report_hold_count() {
    let home = TestHome::new();

    for expected in ["1\n", "2\n"] {
        home.kvlock()
            .args(["enter", "batch", "--owner", "a", "--max-count", "2"])
            .assert()
            .success()
            .stdout(expected);
    }
    home.kvlock()
        .args(["enter", "batch", "--owner", "a", "--max-count", "2"])
        .assert()
        .code(3);
    home.kvlock()
        .args(["enter", "batch", "--owner", "b"])
        .assert()
        .code(3);

    home.kvlock()
        .args(["exit", "batch", "--owner", "a"])
        .assert()
        .success()
        .stdout("1\n");
    home.kvlock()
        .args(["exit", "batch", "--owner", "a"])
        .assert()
        .success()
        .stdout("0\n");
}

#[test]
fn status_reports_free_and_held_keys() {
    let home = TestHome::new();

    home.kvlock()
        .args(["status", "orders"])
        .assert()
        .success()
        .stdout(contains("Lock 'orders' is free"));

    home.kvlock()
        .args(["acquire", "orders", "--token", "t1", "--ttl", "10"])
        .assert()
        .success();

    home.kvlock()
        .args(["status", "orders"])
        .assert()
        .success()
        .stdout(contains("held by 't1' (exclusive, count 1)"));

    home.kvlock()
        .args(["status", "orders", "--json"])
        .assert()
        .success()
        .stdout(contains("\"held\": true").and(contains("\"kind\": \"exclusive\"")));
}

#[test]
fn store_dir_flag_overrides_home() {
    let home = TestHome::new();
    let shared = home.path().join("shared");

    home.kvlock()
        .args(["--store-dir"])
        .arg(&shared)
        .args(["acquire", "orders", "--token", "t1", "--ttl", "10"])
        .assert()
        .success();

    assert!(shared.is_dir());
    assert!(home.open_store().inspect("orders").unwrap().is_none());
}

#[test]
fn sweep_reports_counts() {
    let home = TestHome::new();

    home.kvlock()
        .arg("sweep")
        .assert()
        .success()
        .stdout(contains(
            "Removed 0 expired lock(s), 0 stale staging file(s) and 0 unused guard(s)",
        ));
}

#[test]
fn invalid_config_exits_with_2() {
    let home = TestHome::new();
    home.write_config("[locking]\npoll_interval_ms = 0\n");

    home.kvlock()
        .args(["status", "orders"])
        .assert()
        .code(2)
        .stderr(contains("poll_interval_ms"));
}

#[test]
fn malformed_config_exits_with_2() {
    let home = TestHome::new();
    home.write_config("[locking\n");

    home.kvlock()
        .args(["status", "orders"])
        .assert()
        .code(2)
        .stderr(contains("config.toml"));
}
