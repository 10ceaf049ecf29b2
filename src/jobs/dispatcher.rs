//! Job dispatcher pool
//!
//! A fixed pool of worker threads drains the jobs directory: each worker
//! claims the next `.job` entry under the shared directory cursor's lock,
//! releases the lock before touching any file, executes the command script
//! against the engine, and comes back for more. Results go to a sibling
//! `.out` file; successful writes and deletes fan out through the
//! notifier.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::engine::Engine;
use crate::error::{PipeKvError, Result};
use crate::server::Notifier;

use super::backup::BackupThrottle;
use super::parser::{parse_line, JobCommand};

/// Extension claimed by the dispatcher
const JOB_EXTENSION: &str = "job";

/// Extension of the per-job result file
const OUT_EXTENSION: &str = "out";

/// Extension of backup snapshot files
const BACKUP_EXTENSION: &str = "bck";

/// Longest input/output path the dispatcher will touch; longer entries are
/// logged and skipped
const MAX_JOB_PATH_LEN: usize = 256;

/// One claimed job: the input script, its result file, and the stem that
/// names its backups
#[derive(Debug, Clone)]
pub struct Job {
    pub input: PathBuf,
    pub output: PathBuf,
    pub stem: String,
}

/// Shared directory cursor; the mutex is never held across file I/O
struct JobCursor {
    entries: Mutex<fs::ReadDir>,
}

impl JobCursor {
    fn new(jobs_dir: &Path) -> Result<Self> {
        let entries = fs::read_dir(jobs_dir).map_err(|e| {
            PipeKvError::Config(format!(
                "Failed to open jobs directory {}: {}",
                jobs_dir.display(),
                e
            ))
        })?;
        Ok(Self {
            entries: Mutex::new(entries),
        })
    }

    /// Claim the next unprocessed job entry
    fn next_job(&self) -> Option<Job> {
        let mut entries = self.entries.lock();
        loop {
            let entry = match entries.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Failed to read jobs directory entry: {}", e);
                    continue;
                }
            };

            let input = entry.path();
            if input.extension().and_then(|e| e.to_str()) != Some(JOB_EXTENSION) {
                continue;
            }

            let output = input.with_extension(OUT_EXTENSION);
            if input.as_os_str().len() > MAX_JOB_PATH_LEN
                || output.as_os_str().len() > MAX_JOB_PATH_LEN
            {
                tracing::warn!("Skipping {}: path too long", input.display());
                continue;
            }

            let stem = match input.file_stem().and_then(|s| s.to_str()) {
                Some(stem) => stem.to_owned(),
                None => continue,
            };

            return Some(Job {
                input,
                output,
                stem,
            });
        }
    }
}

/// Run every job in `jobs_dir` across `workers` dispatcher threads
///
/// Blocks until the directory is drained and every worker has finished.
pub fn run_jobs(
    jobs_dir: &Path,
    workers: usize,
    engine: Arc<Engine>,
    notifier: Arc<Notifier>,
    throttle: Arc<BackupThrottle>,
) -> Result<()> {
    let cursor = Arc::new(JobCursor::new(jobs_dir)?);

    let mut handles = Vec::with_capacity(workers);
    for index in 0..workers {
        let cursor = Arc::clone(&cursor);
        let engine = Arc::clone(&engine);
        let notifier = Arc::clone(&notifier);
        let throttle = Arc::clone(&throttle);

        let handle = thread::Builder::new()
            .name(format!("dispatcher-{}", index))
            .spawn(move || run_worker(&cursor, &engine, &notifier, &throttle))?;
        handles.push(handle);
    }

    for handle in handles {
        if handle.join().is_err() {
            tracing::error!("Dispatcher worker panicked");
        }
    }
    Ok(())
}

/// One dispatcher worker: claim, execute, repeat until the directory is dry
fn run_worker(
    cursor: &JobCursor,
    engine: &Engine,
    notifier: &Notifier,
    throttle: &BackupThrottle,
) {
    while let Some(job) = cursor.next_job() {
        tracing::info!("Running job {}", job.input.display());
        match execute_job(&job, engine, notifier, throttle) {
            Ok(()) => tracing::debug!("Finished job {}", job.input.display()),
            // Failing to spawn a backup writer is resource exhaustion;
            // fail fast rather than limp on without the snapshot.
            Err(e @ PipeKvError::Backup(_)) => {
                tracing::error!("{}; terminating", e);
                std::process::exit(1);
            }
            Err(e) => tracing::error!("Job {} failed: {}", job.input.display(), e),
        }
    }
}

/// Execute one job script, writing results to its `.out` file
fn execute_job(
    job: &Job,
    engine: &Engine,
    notifier: &Notifier,
    throttle: &BackupThrottle,
) -> Result<()> {
    let input = File::open(&job.input)?;
    let mut output = BufWriter::new(File::create(&job.output)?);
    let mut backup_seq = 0u32;

    for line in BufReader::new(input).lines() {
        let line = line?;
        match parse_line(&line) {
            JobCommand::Write { pairs } => {
                engine.write(&pairs);
                for (key, value) in &pairs {
                    notifier.notify(key, value);
                }
            }

            JobCommand::Read { keys } => {
                write!(output, "[")?;
                for (key, value) in engine.read(&keys) {
                    match value {
                        Some(value) => write!(output, "({},{})", key, value)?,
                        None => write!(output, "({},KVSERROR)", key)?,
                    }
                }
                writeln!(output, "]")?;
            }

            JobCommand::Delete { keys } => {
                let results = engine.delete(&keys);
                if results.iter().any(|(_, existed)| !existed) {
                    write!(output, "[")?;
                    for (key, existed) in &results {
                        if !existed {
                            write!(output, "({},KVSMISSING)", key)?;
                        }
                    }
                    writeln!(output, "]")?;
                }
                for (key, _) in &results {
                    notifier.notify_deleted(key);
                }
            }

            JobCommand::Show => {
                for (key, value) in engine.show() {
                    writeln!(output, "({}, {})", key, value)?;
                }
            }

            JobCommand::Wait { millis } => {
                tracing::info!("Waiting {} ms", millis);
                thread::sleep(Duration::from_millis(millis));
            }

            JobCommand::Backup => {
                backup_seq += 1;
                run_backup(job, backup_seq, engine, throttle)?;
            }

            JobCommand::Help => print_help(),

            JobCommand::Empty => {}

            JobCommand::Invalid => {
                tracing::error!(
                    "Invalid command in {}. See HELP for usage",
                    job.input.display()
                );
            }
        }
        output.flush()?;
    }

    Ok(())
}

/// Admit and launch one backup snapshot writer
///
/// The point-in-time copy of the key space is taken here, synchronously,
/// so the snapshot reflects the store as of the BACKUP command; the
/// detached writer only formats and writes it out.
fn run_backup(job: &Job, seq: u32, engine: &Engine, throttle: &BackupThrottle) -> Result<()> {
    let snapshot = engine.snapshot();
    let dir = job.input.parent().unwrap_or_else(|| Path::new("."));
    let path = dir.join(format!("{}-{}.{}", job.stem, seq, BACKUP_EXTENSION));

    throttle.run(move || {
        if let Err(e) = write_backup(&path, &snapshot) {
            tracing::error!("Backup {} failed: {}", path.display(), e);
        }
    })
}

/// Write one snapshot file in the same format as SHOW
fn write_backup(path: &Path, snapshot: &[(String, String)]) -> std::io::Result<()> {
    let mut file = BufWriter::new(File::create(path)?);
    for (key, value) in snapshot {
        writeln!(file, "({}, {})", key, value)?;
    }
    file.flush()
}

fn print_help() {
    println!(
        "Available commands:\n\
         \x20 WRITE [(key,value)(key2,value2),...]\n\
         \x20 READ [key,key2,...]\n\
         \x20 DELETE [key,key2,...]\n\
         \x20 SHOW\n\
         \x20 WAIT <delay_ms>\n\
         \x20 BACKUP\n\
         \x20 HELP"
    );
}
