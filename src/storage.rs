//! Append-only telemetry log with mount/open recovery.
//!
//! One call to [`TelemetryStore::append`] per superloop cycle. A call takes
//! at most one recovery step and, if that leaves the file open, writes the
//! record straight after it:
//!
//! ```text
//! unmounted ──mount+open──▶ open ──write+flush──▶ open
//!     ▲                      │
//!     │ reopen failed        │ write/flush failed
//!     └──────── stale ◀──────┘
//!                 │ close+reopen
//!                 └──────────────▶ open
//! ```
//!
//! A failure never propagates past the store; it is reported in the
//! returned [`StoreOutcome`] and retried on the next cycle.

/// Error type for filesystem operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StoreError {
    /// Card missing or volume could not be mounted.
    Mount,
    /// File could not be opened or created.
    Open,
    /// Write did not complete.
    Write,
    /// Sync to the card failed.
    Flush,
}

impl core::fmt::Display for StoreError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Mount => write!(f, "mount failed"),
            Self::Open => write!(f, "open failed"),
            Self::Write => write!(f, "write failed"),
            Self::Flush => write!(f, "flush failed"),
        }
    }
}

/// Block-storage filesystem collaborator.
pub trait Filesystem {
    /// Handle to an open file.
    type File;

    fn mount(&mut self) -> Result<(), StoreError>;

    /// Forget any mounted volume. Must be safe to call when nothing is mounted.
    fn unmount(&mut self);

    /// Open `name` for appending, creating it if needed.
    fn open_append(&mut self, name: &str) -> Result<Self::File, StoreError>;

    fn write(&mut self, file: &mut Self::File, bytes: &[u8]) -> Result<(), StoreError>;

    /// Force written data out to the medium.
    fn flush(&mut self, file: &mut Self::File) -> Result<(), StoreError>;

    fn close(&mut self, file: Self::File);
}

/// What one [`TelemetryStore::append`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StoreOutcome {
    /// Record written and flushed.
    Written,
    /// Volume mounted and file opened, then the record written.
    Mounted,
    /// Stale file closed and reopened, then the record written.
    Reopened,
    /// Step failed; retried next cycle.
    Failed(StoreError),
}

/// Running totals, for the debug log and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StoreStats {
    pub records_written: u32,
    pub mount_attempts: u32,
    pub open_attempts: u32,
    pub failures: u32,
}

enum FileState<H> {
    Closed,
    Open(H),
    /// Open handle that failed a write or flush.
    Stale(H),
}

/// Append-only log of finished packets.
pub struct TelemetryStore<F: Filesystem> {
    fs: F,
    name: &'static str,
    mounted: bool,
    file: FileState<F::File>,
    stats: StoreStats,
}

impl<F: Filesystem> TelemetryStore<F> {
    /// Nothing is touched until the first [`append`](Self::append).
    pub fn new(fs: F, name: &'static str) -> Self {
        Self {
            fs,
            name,
            mounted: false,
            file: FileState::Closed,
            stats: StoreStats::default(),
        }
    }

    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(self.file, FileState::Open(_))
    }

    #[must_use]
    pub fn stats(&self) -> StoreStats {
        self.stats
    }

    pub fn filesystem(&self) -> &F {
        &self.fs
    }

    pub fn filesystem_mut(&mut self) -> &mut F {
        &mut self.fs
    }

    /// Recover if needed, then append `record` in the same call.
    pub fn append(&mut self, record: &[u8]) -> StoreOutcome {
        match self.try_append(record) {
            Ok(outcome) => outcome,
            Err(e) => {
                self.stats.failures = self.stats.failures.wrapping_add(1);
                warn!("store: {}", e);
                StoreOutcome::Failed(e)
            }
        }
    }

    fn try_append(&mut self, record: &[u8]) -> Result<StoreOutcome, StoreError> {
        let (handle, outcome) = match core::mem::replace(&mut self.file, FileState::Closed) {
            FileState::Open(handle) if self.mounted => (handle, StoreOutcome::Written),
            FileState::Stale(handle) if self.mounted => {
                self.fs.close(handle);
                (self.reopen()?, StoreOutcome::Reopened)
            }
            FileState::Closed if self.mounted => (self.reopen()?, StoreOutcome::Reopened),
            state => {
                self.file = state;
                (self.remount()?, StoreOutcome::Mounted)
            }
        };
        self.write_record(handle, record)?;
        Ok(outcome)
    }

    fn close_any(&mut self) {
        match core::mem::replace(&mut self.file, FileState::Closed) {
            FileState::Open(handle) | FileState::Stale(handle) => self.fs.close(handle),
            FileState::Closed => {}
        }
    }

    fn remount(&mut self) -> Result<F::File, StoreError> {
        self.close_any();
        self.fs.unmount();
        self.stats.mount_attempts = self.stats.mount_attempts.wrapping_add(1);
        self.fs.mount()?;
        self.mounted = true;
        info!("store: volume mounted");
        self.open()
    }

    /// A failed reopen drops the mount so the next cycle starts from scratch.
    fn reopen(&mut self) -> Result<F::File, StoreError> {
        self.open().inspect_err(|_| self.mounted = false)
    }

    fn open(&mut self) -> Result<F::File, StoreError> {
        self.stats.open_attempts = self.stats.open_attempts.wrapping_add(1);
        self.fs.open_append(self.name)
    }

    /// A handle that failed is kept as stale so the next call closes it.
    fn write_record(&mut self, mut handle: F::File, record: &[u8]) -> Result<(), StoreError> {
        let result = self
            .fs
            .write(&mut handle, record)
            .and_then(|()| self.fs.flush(&mut handle));
        match result {
            Ok(()) => {
                self.file = FileState::Open(handle);
                self.stats.records_written = self.stats.records_written.wrapping_add(1);
                Ok(())
            }
            Err(e) => {
                self.file = FileState::Stale(handle);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use std::collections::VecDeque;
    use std::string::String;
    use std::vec::Vec;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Mount,
        Unmount,
        Open(String),
        Write(u32),
        Flush(u32),
        Close(u32),
    }

    /// Filesystem with scripted failures. Each queue entry answers one call;
    /// an empty queue means success.
    #[derive(Default)]
    struct MockFs {
        calls: Vec<Call>,
        mount_results: VecDeque<bool>,
        open_results: VecDeque<bool>,
        write_results: VecDeque<bool>,
        flush_results: VecDeque<bool>,
        next_handle: u32,
        data: Vec<u8>,
    }

    fn take(queue: &mut VecDeque<bool>) -> bool {
        queue.pop_front().unwrap_or(true)
    }

    impl Filesystem for MockFs {
        type File = u32;

        fn mount(&mut self) -> Result<(), StoreError> {
            self.calls.push(Call::Mount);
            take(&mut self.mount_results).then_some(()).ok_or(StoreError::Mount)
        }

        fn unmount(&mut self) {
            self.calls.push(Call::Unmount);
        }

        fn open_append(&mut self, name: &str) -> Result<u32, StoreError> {
            self.calls.push(Call::Open(name.into()));
            if take(&mut self.open_results) {
                self.next_handle += 1;
                Ok(self.next_handle)
            } else {
                Err(StoreError::Open)
            }
        }

        fn write(&mut self, file: &mut u32, bytes: &[u8]) -> Result<(), StoreError> {
            self.calls.push(Call::Write(*file));
            if take(&mut self.write_results) {
                self.data.extend_from_slice(bytes);
                Ok(())
            } else {
                Err(StoreError::Write)
            }
        }

        fn flush(&mut self, file: &mut u32) -> Result<(), StoreError> {
            self.calls.push(Call::Flush(*file));
            take(&mut self.flush_results).then_some(()).ok_or(StoreError::Flush)
        }

        fn close(&mut self, file: u32) {
            self.calls.push(Call::Close(file));
        }
    }

    fn count(calls: &[Call], f: impl Fn(&Call) -> bool) -> usize {
        calls.iter().filter(|c| f(c)).count()
    }

    #[test]
    fn test_mount_failures_then_single_open() {
        let mut fs = MockFs::default();
        fs.mount_results.extend([false, false, false, true]);
        let mut store = TelemetryStore::new(fs, "GRIB.BIN");

        for _ in 0..3 {
            assert_eq!(store.append(&[0]), StoreOutcome::Failed(StoreError::Mount));
            assert!(!store.is_mounted());
        }
        assert_eq!(store.append(&[1]), StoreOutcome::Mounted);
        assert_eq!(store.append(&[2]), StoreOutcome::Written);
        assert_eq!(store.append(&[3]), StoreOutcome::Written);

        let fs = store.filesystem();
        assert_eq!(count(&fs.calls, |c| matches!(c, Call::Open(_))), 1);
        assert_eq!(count(&fs.calls, |c| *c == Call::Mount), 4);
        // Every mount is preceded by an unmount.
        assert_eq!(count(&fs.calls, |c| *c == Call::Unmount), 4);
        assert_eq!(fs.data, [1, 2, 3]);
        assert_eq!(store.stats().records_written, 3);
        assert_eq!(store.stats().failures, 3);
    }

    #[test]
    fn test_mounting_cycle_writes_its_record() {
        let mut fs = MockFs::default();
        fs.mount_results.extend([false, true]);
        let mut store = TelemetryStore::new(fs, "GRIB.BIN");

        assert_eq!(store.append(&[1]), StoreOutcome::Failed(StoreError::Mount));
        assert_eq!(store.append(&[2]), StoreOutcome::Mounted);
        assert!(store.is_open());

        let calls = &store.filesystem().calls;
        assert_eq!(
            calls[calls.len() - 5..],
            [
                Call::Unmount,
                Call::Mount,
                Call::Open("GRIB.BIN".into()),
                Call::Write(1),
                Call::Flush(1),
            ]
        );
        assert_eq!(store.filesystem().data, [2]);
    }

    #[test]
    fn test_write_failure_right_after_mount_leaves_file_stale() {
        let mut fs = MockFs::default();
        fs.write_results.push_back(false);
        let mut store = TelemetryStore::new(fs, "GRIB.BIN");

        assert_eq!(store.append(&[1]), StoreOutcome::Failed(StoreError::Write));
        assert!(store.is_mounted());
        assert!(!store.is_open());
        assert_eq!(store.append(&[2]), StoreOutcome::Reopened);
        assert_eq!(store.filesystem().data, [2]);
        assert_eq!(store.stats().mount_attempts, 1);
    }

    #[test]
    fn test_every_write_is_flushed() {
        let mut store = TelemetryStore::new(MockFs::default(), "GRIB.BIN");
        assert_eq!(store.append(&[0]), StoreOutcome::Mounted);
        for i in 1..5 {
            assert_eq!(store.append(&[i]), StoreOutcome::Written);
        }
        let calls = &store.filesystem().calls;
        for (i, c) in calls.iter().enumerate() {
            if let Call::Write(h) = c {
                assert_eq!(calls[i + 1], Call::Flush(*h));
            }
        }
        assert_eq!(store.filesystem().data, [0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_write_failure_closes_and_reopens() {
        let mut fs = MockFs::default();
        fs.write_results.extend([true, true, false]);
        let mut store = TelemetryStore::new(fs, "GRIB.BIN");

        assert_eq!(store.append(&[0xAA]), StoreOutcome::Mounted);
        assert_eq!(store.append(&[1]), StoreOutcome::Written);
        assert_eq!(store.append(&[2]), StoreOutcome::Failed(StoreError::Write));
        assert!(store.is_mounted());
        assert!(!store.is_open());

        assert_eq!(store.append(&[3]), StoreOutcome::Reopened);
        assert_eq!(store.append(&[4]), StoreOutcome::Written);

        let fs = store.filesystem();
        let tail: Vec<Call> = fs.calls[fs.calls.len() - 7..].to_vec();
        assert_eq!(
            tail,
            [
                Call::Write(1),
                Call::Close(1),
                Call::Open("GRIB.BIN".into()),
                Call::Write(2),
                Call::Flush(2),
                Call::Write(2),
                Call::Flush(2),
            ]
        );
        // Only the record whose write failed is missing.
        assert_eq!(fs.data, [0xAA, 1, 3, 4]);
    }

    #[test]
    fn test_flush_failure_marks_stale() {
        let mut fs = MockFs::default();
        fs.flush_results.extend([true, false]);
        let mut store = TelemetryStore::new(fs, "GRIB.BIN");

        assert_eq!(store.append(&[0]), StoreOutcome::Mounted);
        assert_eq!(store.append(&[1]), StoreOutcome::Failed(StoreError::Flush));
        assert_eq!(store.append(&[2]), StoreOutcome::Reopened);
        assert_eq!(store.append(&[3]), StoreOutcome::Written);
    }

    #[test]
    fn test_reopen_failure_escalates_to_remount() {
        let mut fs = MockFs::default();
        fs.write_results.extend([true, false]);
        fs.open_results.extend([true, false]);
        let mut store = TelemetryStore::new(fs, "GRIB.BIN");

        assert_eq!(store.append(&[0]), StoreOutcome::Mounted);
        assert_eq!(store.append(&[1]), StoreOutcome::Failed(StoreError::Write));
        assert_eq!(store.append(&[2]), StoreOutcome::Failed(StoreError::Open));
        assert!(!store.is_mounted());

        assert_eq!(store.append(&[3]), StoreOutcome::Mounted);
        assert_eq!(store.append(&[4]), StoreOutcome::Written);
        assert_eq!(store.stats().mount_attempts, 2);
        assert_eq!(store.filesystem().data, [0, 3, 4]);
    }

    #[test]
    fn test_open_failure_after_mount_retries_open() {
        let mut fs = MockFs::default();
        fs.open_results.push_back(false);
        let mut store = TelemetryStore::new(fs, "GRIB.BIN");

        assert_eq!(store.append(&[0]), StoreOutcome::Failed(StoreError::Open));
        assert!(store.is_mounted());
        assert_eq!(store.append(&[1]), StoreOutcome::Reopened);
        assert_eq!(store.append(&[2]), StoreOutcome::Written);
        assert_eq!(store.filesystem().data, [1, 2]);
        assert_eq!(store.stats().mount_attempts, 1);
    }
}
