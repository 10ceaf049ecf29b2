//! Jobs Tests
//!
//! Tests for the dispatcher pool, job execution output, and the backup
//! throttle.

use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tempfile::TempDir;

use pipekv::jobs::{run_jobs, BackupThrottle};
use pipekv::server::{Notifier, SessionRegistry};
use pipekv::Engine;

// =============================================================================
// Helper Functions
// =============================================================================

struct JobsFixture {
    dir: TempDir,
    engine: Arc<Engine>,
    notifier: Arc<Notifier>,
    throttle: Arc<BackupThrottle>,
}

impl JobsFixture {
    fn new(max_backups: usize) -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            engine: Arc::new(Engine::new()),
            notifier: Arc::new(Notifier::new(Arc::new(SessionRegistry::new(1)))),
            throttle: Arc::new(BackupThrottle::new(max_backups)),
        }
    }

    fn add_job(&self, name: &str, script: &str) {
        fs::write(self.dir.path().join(format!("{}.job", name)), script).unwrap();
    }

    fn run(&self, workers: usize) {
        run_jobs(
            self.dir.path(),
            workers,
            Arc::clone(&self.engine),
            Arc::clone(&self.notifier),
            Arc::clone(&self.throttle),
        )
        .unwrap();
        self.throttle.drain();
    }

    fn output(&self, name: &str) -> String {
        fs::read_to_string(self.dir.path().join(format!("{}.out", name))).unwrap()
    }
}

// =============================================================================
// Job Execution Tests
// =============================================================================

#[test]
fn test_end_to_end_job_output() {
    let fixture = JobsFixture::new(1);
    fixture.add_job(
        "basic",
        "WRITE [(a,1)(b,2)]\nREAD [a,b]\nDELETE [a]\nSHOW\n",
    );

    fixture.run(1);

    assert_eq!(fixture.output("basic"), "[(a,1)(b,2)]\n(b, 2)\n");
    assert!(!fixture.engine.key_exists("a"));
    assert!(fixture.engine.key_exists("b"));
}

#[test]
fn test_read_missing_key_reports_error() {
    let fixture = JobsFixture::new(1);
    fixture.add_job("miss", "READ [ghost]\n");

    fixture.run(1);

    assert_eq!(fixture.output("miss"), "[(ghost,KVSERROR)]\n");
}

#[test]
fn test_delete_lists_only_missing_keys() {
    let fixture = JobsFixture::new(1);
    fixture.add_job("del", "WRITE [(a,1)]\nDELETE [a,ghost]\nDELETE [ghost]\n");

    fixture.run(1);

    // First DELETE: one miss listed; second: all missing.
    assert_eq!(
        fixture.output("del"),
        "[(ghost,KVSMISSING)]\n[(ghost,KVSMISSING)]\n"
    );
}

#[test]
fn test_delete_with_all_keys_present_writes_nothing() {
    let fixture = JobsFixture::new(1);
    fixture.add_job("clean", "WRITE [(a,1)(b,2)]\nDELETE [a,b]\n");

    fixture.run(1);

    assert_eq!(fixture.output("clean"), "");
}

#[test]
fn test_invalid_command_does_not_abort_script() {
    let fixture = JobsFixture::new(1);
    fixture.add_job("bad", "NONSENSE\nWRITE [(a,1)]\nREAD [a]\n");

    fixture.run(1);

    assert_eq!(fixture.output("bad"), "[(a,1)]\n");
}

#[test]
fn test_non_job_files_are_ignored() {
    let fixture = JobsFixture::new(1);
    fixture.add_job("real", "SHOW\n");
    fs::write(fixture.dir.path().join("notes.txt"), "WRITE [(x,1)]\n").unwrap();
    fs::write(fixture.dir.path().join("job"), "WRITE [(y,1)]\n").unwrap();

    fixture.run(1);

    assert!(fixture.engine.is_empty());
    assert!(!fixture.dir.path().join("notes.out").exists());
}

#[test]
fn test_each_job_gets_its_own_output() {
    let fixture = JobsFixture::new(1);
    fixture.add_job("one", "WRITE [(a,1)]\nREAD [a]\n");
    fixture.add_job("two", "WRITE [(b,2)]\nREAD [b]\n");

    fixture.run(2);

    assert_eq!(fixture.output("one"), "[(a,1)]\n");
    assert_eq!(fixture.output("two"), "[(b,2)]\n");
}

#[test]
fn test_wait_suspends_only_its_worker() {
    let fixture = JobsFixture::new(1);
    fixture.add_job("slow", "WAIT 400\nWRITE [(slow,1)]\n");
    fixture.add_job("fast", "WRITE [(fast,1)]\n");

    // With two workers the fast job is not delayed by the slow one; the
    // pair still finishes in roughly the single WAIT.
    let start = Instant::now();
    fixture.run(2);
    let elapsed = start.elapsed();

    assert!(elapsed < Duration::from_millis(900), "took {:?}", elapsed);
    assert!(fixture.engine.key_exists("slow"));
    assert!(fixture.engine.key_exists("fast"));
}

// =============================================================================
// Backup Tests
// =============================================================================

#[test]
fn test_backup_writes_numbered_snapshots() {
    let fixture = JobsFixture::new(2);
    fixture.add_job("snap", "WRITE [(b,2)(a,1)]\nBACKUP\nWRITE [(c,3)]\nBACKUP\n");

    fixture.run(1);

    let first = fs::read_to_string(fixture.dir.path().join("snap-1.bck")).unwrap();
    let second = fs::read_to_string(fixture.dir.path().join("snap-2.bck")).unwrap();
    assert_eq!(first, "(a, 1)\n(b, 2)\n");
    assert_eq!(second, "(a, 1)\n(b, 2)\n(c, 3)\n");
}

#[test]
fn test_backup_sequence_is_per_job_file() {
    let fixture = JobsFixture::new(2);
    fixture.add_job("left", "WRITE [(a,1)]\nBACKUP\n");
    fixture.add_job("right", "WRITE [(b,2)]\nBACKUP\n");

    fixture.run(2);

    assert!(fixture.dir.path().join("left-1.bck").exists());
    assert!(fixture.dir.path().join("right-1.bck").exists());
}

// =============================================================================
// Backup Throttle Tests
// =============================================================================

#[test]
fn test_throttle_bounds_concurrent_writers() {
    const MAX: usize = 2;
    const WRITERS: usize = 6;

    let throttle = BackupThrottle::new(MAX);
    let current = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    for _ in 0..WRITERS {
        let current = Arc::clone(&current);
        let peak = Arc::clone(&peak);
        throttle
            .run(move || {
                let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(50));
                current.fetch_sub(1, Ordering::SeqCst);
            })
            .unwrap();
    }
    throttle.drain();

    assert_eq!(current.load(Ordering::SeqCst), 0);
    assert!(peak.load(Ordering::SeqCst) <= MAX);
}

#[test]
fn test_throttle_with_capacity_one_serializes() {
    let throttle = BackupThrottle::new(1);
    let current = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    for _ in 0..3 {
        let current = Arc::clone(&current);
        let peak = Arc::clone(&peak);
        throttle
            .run(move || {
                let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(30));
                current.fetch_sub(1, Ordering::SeqCst);
            })
            .unwrap();
        assert!(throttle.in_flight() <= 1);
    }
    throttle.drain();

    assert_eq!(peak.load(Ordering::SeqCst), 1);
}

#[test]
fn test_drain_reaps_everything() {
    let throttle = BackupThrottle::new(4);
    let done = Arc::new(AtomicUsize::new(0));

    for _ in 0..4 {
        let done = Arc::clone(&done);
        throttle
            .run(move || {
                thread::sleep(Duration::from_millis(20));
                done.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
    }
    throttle.drain();

    assert_eq!(done.load(Ordering::SeqCst), 4);
    assert_eq!(throttle.in_flight(), 0);
}
