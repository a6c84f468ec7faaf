use crate::util::truncate_bytes;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

pub(super) struct BoundedRun {
    pub(super) status: Option<ExitStatus>,
    pub(super) timed_out: bool,
    pub(super) duration_ms: u128,
    pub(super) output: String,
}

impl BoundedRun {
    pub(super) fn success(&self) -> bool {
        !self.timed_out && self.status.is_some_and(|status| status.success())
    }
}

/// Run `cmd` to completion or until `timeout`, whichever comes first.
///
/// stdout and stderr share one capture file so their writes stay in the
/// order the child made them.
pub(super) fn run_bounded(
    cmd: &mut Command,
    capture_path: &Path,
    timeout: Duration,
    max_output_bytes: usize,
) -> std::io::Result<BoundedRun> {
    let capture = File::create(capture_path)?;
    cmd.stdin(Stdio::null())
        .stdout(Stdio::from(capture.try_clone()?))
        .stderr(Stdio::from(capture));

    let start = Instant::now();
    let mut child = cmd.spawn()?;
    let mut timed_out = false;
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break Some(status);
        }
        if start.elapsed() > timeout {
            timed_out = true;
            let _ = child.kill();
            break child.wait().ok();
        }
        std::thread::sleep(POLL_INTERVAL);
    };
    let duration_ms = start.elapsed().as_millis();

    Ok(BoundedRun {
        status,
        timed_out,
        duration_ms,
        output: read_capped(File::open(capture_path)?, max_output_bytes)?,
    })
}

/// Read at most `max_bytes` of text from `reader`, cut on a char boundary.
///
/// Up to three extra bytes are read so a multi-byte char straddling the cap
/// is dropped whole instead of decoding as a replacement char.
fn read_capped(reader: impl Read, max_bytes: usize) -> std::io::Result<String> {
    let limit = max_bytes.saturating_add(3);
    let mut bytes = Vec::with_capacity(limit.min(64 * 1024));
    reader
        .take(u64::try_from(limit).unwrap_or(u64::MAX))
        .read_to_end(&mut bytes)?;
    Ok(truncate_bytes(&bytes, max_bytes))
}
