//! Progress reporting and display
//!
//! The synchronizer reports through [`ProgressReporter`] and never prints on
//! its own, so runs stay quiet under tests.

use std::sync::Arc;

use crate::process_data::FileKind;

/// Status of a single file being mirrored or pulled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryStatus {
    /// Waiting to be processed
    Pending,
    /// Kind decided from the extension
    Classified(FileKind),
    /// Sending bytes to the workspace
    Uploading,
    /// Content converted to blocks
    Decoded { blocks: usize },
    /// Writing the page tree
    Mirroring,
    /// Page created or replaced
    Mirrored,
    /// Local file rewritten from its page
    Written,
    /// Local file already matched its page
    Unchanged,
    /// Left out by policy
    Skipped(String),
    /// Failed with error
    Failed(String),
}

impl EntryStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EntryStatus::Mirrored
                | EntryStatus::Written
                | EntryStatus::Unchanged
                | EntryStatus::Skipped(_)
                | EntryStatus::Failed(_)
        )
    }
}

/// Phase of the overall run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchPhase {
    LoadingConfig,
    /// Walking roots and filtering paths
    Scanning,
    /// Pushing files into the page tree
    Mirroring,
    /// Writing mapped pages back to files
    Pulling,
    Completed,
    Failed(String),
}

impl BatchPhase {
    fn describe(&self) -> (&'static str, &'static str) {
        match self {
            BatchPhase::LoadingConfig => ("📋", "Loading configuration..."),
            BatchPhase::Scanning => ("🔍", "Scanning files..."),
            BatchPhase::Mirroring => ("📤", "Mirroring files..."),
            BatchPhase::Pulling => ("📥", "Pulling pages..."),
            BatchPhase::Completed => ("✅", "Completed!"),
            BatchPhase::Failed(_) => ("❌", "Failed"),
        }
    }
}

/// Progress reporter trait - implement this for different display backends.
pub trait ProgressReporter: Send + Sync {
    fn set_phase(&self, phase: BatchPhase);

    /// Register entries to track (call before processing starts).
    fn register_entries(&self, entries: Vec<String>);

    fn update_entry(&self, entry: &str, status: EntryStatus);

    /// Count one finished upload.
    fn record_upload(&self);

    fn log_info(&self, message: &str);

    fn log_warn(&self, message: &str);

    fn log_error(&self, message: &str);

    /// Finish and clean up the display.
    fn finish(&self);
}

/// A no-op reporter for when progress display is disabled.
pub struct NullReporter;

impl ProgressReporter for NullReporter {
    fn set_phase(&self, _phase: BatchPhase) {}
    fn register_entries(&self, _entries: Vec<String>) {}
    fn update_entry(&self, _entry: &str, _status: EntryStatus) {}
    fn record_upload(&self) {}
    fn log_info(&self, _message: &str) {}
    fn log_warn(&self, _message: &str) {}
    fn log_error(&self, _message: &str) {}
    fn finish(&self) {}
}

/// Statistics collected during a run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Stats {
    pub total: usize,
    pub mirrored: usize,
    pub written: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failed: usize,
    pub uploads: usize,
}

impl Stats {
    fn record(&mut self, status: &EntryStatus) {
        match status {
            EntryStatus::Mirrored => self.mirrored += 1,
            EntryStatus::Written => self.written += 1,
            EntryStatus::Unchanged => self.unchanged += 1,
            EntryStatus::Skipped(_) => self.skipped += 1,
            EntryStatus::Failed(_) => self.failed += 1,
            _ => {}
        }
    }

    fn print(&self, duration: std::time::Duration) {
        eprintln!();
        eprintln!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        eprintln!("📊 Summary");
        eprintln!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        eprintln!("   📄 Files:      {} total", self.total);
        if self.mirrored > 0 {
            eprintln!("   ✅ Mirrored:   {}", self.mirrored);
        }
        if self.written + self.unchanged > 0 {
            eprintln!("   ✅ Written:    {}", self.written);
            eprintln!("   ⏸️  Unchanged:  {}", self.unchanged);
        }
        if self.skipped > 0 {
            eprintln!("   ⏭️  Skipped:    {}", self.skipped);
        }
        if self.failed > 0 {
            eprintln!("   ❌ Failed:     {}", self.failed);
        }
        if self.uploads > 0 {
            eprintln!("   ☁️  Uploads:    {}", self.uploads);
        }
        eprintln!("   ⏱️  Duration:   {:.2}s", duration.as_secs_f64());
        eprintln!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }
}

/// Collects statistics without printing; used by tests and callers that
/// want the counts afterwards.
#[derive(Default)]
pub struct RecordingReporter {
    stats: std::sync::Mutex<Stats>,
    statuses: std::sync::Mutex<Vec<(String, EntryStatus)>>,
}

impl RecordingReporter {
    pub fn stats(&self) -> Stats {
        self.stats.lock().map(|stats| stats.clone()).unwrap_or_default()
    }

    pub fn statuses(&self) -> Vec<(String, EntryStatus)> {
        self.statuses
            .lock()
            .map(|statuses| statuses.clone())
            .unwrap_or_default()
    }
}

impl ProgressReporter for RecordingReporter {
    fn set_phase(&self, _phase: BatchPhase) {}

    fn register_entries(&self, entries: Vec<String>) {
        if let Ok(mut stats) = self.stats.lock() {
            stats.total = entries.len();
        }
    }

    fn update_entry(&self, entry: &str, status: EntryStatus) {
        if let Ok(mut stats) = self.stats.lock() {
            stats.record(&status);
        }
        if let Ok(mut statuses) = self.statuses.lock() {
            statuses.push((entry.to_owned(), status));
        }
    }

    fn record_upload(&self) {
        if let Ok(mut stats) = self.stats.lock() {
            stats.uploads += 1;
        }
    }

    fn log_info(&self, _message: &str) {}
    fn log_warn(&self, _message: &str) {}
    fn log_error(&self, _message: &str) {}
    fn finish(&self) {}
}

/// A simple reporter that just prints to stderr (for non-TTY).
pub struct SimpleReporter {
    stats: std::sync::RwLock<Stats>,
    start_time: std::time::Instant,
}

impl SimpleReporter {
    pub fn new() -> Self {
        Self {
            stats: Default::default(),
            start_time: std::time::Instant::now(),
        }
    }
}

impl Default for SimpleReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for SimpleReporter {
    fn set_phase(&self, phase: BatchPhase) {
        if let BatchPhase::Failed(ref e) = phase {
            eprintln!("❌ Failed: {e}");
            return;
        }
        let (emoji, msg) = phase.describe();
        eprintln!("{emoji} {msg}");
    }

    fn register_entries(&self, entries: Vec<String>) {
        self.stats.write().unwrap().total = entries.len();
        eprintln!("   Found {} files", entries.len());
    }

    fn update_entry(&self, entry: &str, status: EntryStatus) {
        self.stats.write().unwrap().record(&status);
        match status {
            EntryStatus::Mirrored | EntryStatus::Written => eprintln!("   ✓ {entry}"),
            EntryStatus::Unchanged => eprintln!("   = {entry}"),
            EntryStatus::Skipped(ref reason) => eprintln!("   - {entry}: {reason}"),
            EntryStatus::Failed(ref e) => eprintln!("   ✗ {entry}: {e}"),
            _ => {}
        }
    }

    fn record_upload(&self) {
        self.stats.write().unwrap().uploads += 1;
    }

    fn log_info(&self, message: &str) {
        eprintln!("ℹ️  {message}");
    }

    fn log_warn(&self, message: &str) {
        eprintln!("⚠️  {message}");
    }

    fn log_error(&self, message: &str) {
        eprintln!("❌ {message}");
    }

    fn finish(&self) {
        self.stats.read().unwrap().print(self.start_time.elapsed());
    }
}

/// Fancy interactive reporter with progress bars (for TTY).
pub struct FancyReporter {
    multi: indicatif::MultiProgress,
    phase_bar: indicatif::ProgressBar,
    entries: std::sync::RwLock<std::collections::HashMap<String, Option<indicatif::ProgressBar>>>,
    main_progress: std::sync::RwLock<Option<indicatif::ProgressBar>>,
    stats: std::sync::RwLock<Stats>,
    start_time: std::time::Instant,
}

impl FancyReporter {
    pub fn new() -> Self {
        let multi = indicatif::MultiProgress::new();
        let phase_bar = multi.add(indicatif::ProgressBar::new_spinner());
        phase_bar.set_style(
            indicatif::ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap(),
        );
        phase_bar.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            multi,
            phase_bar,
            entries: Default::default(),
            main_progress: Default::default(),
            stats: Default::default(),
            start_time: std::time::Instant::now(),
        }
    }

    fn status_emoji(status: &EntryStatus) -> &'static str {
        match status {
            EntryStatus::Pending => "⏳",
            EntryStatus::Classified(kind) => kind.icon(),
            EntryStatus::Uploading => "☁️ ",
            EntryStatus::Decoded { .. } => "🧱",
            EntryStatus::Mirroring => "📤",
            EntryStatus::Mirrored | EntryStatus::Written => "✅",
            EntryStatus::Unchanged => "⏸️ ",
            EntryStatus::Skipped(_) => "⏭️ ",
            EntryStatus::Failed(_) => "❌",
        }
    }

    fn status_detail(status: &EntryStatus) -> String {
        match status {
            EntryStatus::Pending => "pending".to_string(),
            EntryStatus::Classified(kind) => kind.to_string(),
            EntryStatus::Uploading => "uploading".to_string(),
            EntryStatus::Decoded { blocks } => format!("{blocks} blocks"),
            EntryStatus::Mirroring => "mirroring".to_string(),
            EntryStatus::Mirrored => "mirrored".to_string(),
            EntryStatus::Written => "written".to_string(),
            EntryStatus::Unchanged => "unchanged".to_string(),
            EntryStatus::Skipped(reason) => reason.clone(),
            EntryStatus::Failed(e) => e.clone(),
        }
    }
}

impl Default for FancyReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for FancyReporter {
    fn set_phase(&self, phase: BatchPhase) {
        if let BatchPhase::Failed(ref e) = phase {
            self.phase_bar
                .finish_with_message(format!("❌ Failed: {e}"));
            return;
        }
        let (emoji, msg) = phase.describe();
        let msg = format!("{emoji} {msg}");
        if matches!(phase, BatchPhase::Completed) {
            self.phase_bar.finish_with_message(msg);
        } else {
            self.phase_bar.set_message(msg);
        }
    }

    fn register_entries(&self, entries: Vec<String>) {
        let mut map = self.entries.write().unwrap();
        let total = entries.len();
        self.stats.write().unwrap().total = total;

        let main_pb = self.multi.add(indicatif::ProgressBar::new(total as u64));
        main_pb.set_style(
            indicatif::ProgressStyle::default_bar()
                .template("   {bar:40.cyan/blue} {pos}/{len} files")
                .unwrap()
                .progress_chars("█▓▒░  "),
        );
        *self.main_progress.write().unwrap() = Some(main_pb);

        // Bars are created lazily once a file starts.
        for entry in entries {
            map.insert(entry, None);
        }
    }

    fn update_entry(&self, entry: &str, status: EntryStatus) {
        let mut map = self.entries.write().unwrap();

        if status.is_terminal() {
            if let Some(Some(pb)) = map.get(entry) {
                pb.finish_and_clear();
            }
            map.remove(entry);

            if let Some(ref main_pb) = *self.main_progress.read().unwrap() {
                main_pb.inc(1);
            }
            self.stats.write().unwrap().record(&status);
            if let EntryStatus::Failed(ref e) = status {
                self.multi.println(format!("❌ {entry}: {e}")).ok();
            }
            return;
        }

        if let Some(entry_slot) = map.get_mut(entry) {
            let message = format!(
                "{} {entry}: {}",
                Self::status_emoji(&status),
                Self::status_detail(&status)
            );
            match entry_slot {
                Some(pb) => pb.set_message(message),
                None => {
                    let pb = self.multi.add(indicatif::ProgressBar::new_spinner());
                    pb.set_style(
                        indicatif::ProgressStyle::default_spinner()
                            .template("   {msg}")
                            .unwrap(),
                    );
                    pb.set_message(message);
                    pb.enable_steady_tick(std::time::Duration::from_millis(100));
                    *entry_slot = Some(pb);
                }
            }
        }
    }

    fn record_upload(&self) {
        self.stats.write().unwrap().uploads += 1;
    }

    fn log_info(&self, message: &str) {
        self.multi.println(format!("ℹ️  {message}")).ok();
    }

    fn log_warn(&self, message: &str) {
        self.multi.println(format!("⚠️  {message}")).ok();
    }

    fn log_error(&self, message: &str) {
        self.multi.println(format!("❌ {message}")).ok();
    }

    fn finish(&self) {
        let map = self.entries.read().unwrap();
        for pb in map.values().flatten() {
            pb.finish_and_clear();
        }
        if let Some(ref main_pb) = *self.main_progress.read().unwrap() {
            main_pb.finish_and_clear();
        }
        self.phase_bar.finish_and_clear();
        self.stats.read().unwrap().print(self.start_time.elapsed());
    }
}

/// Create an appropriate reporter based on terminal capabilities.
pub fn create_reporter() -> Arc<dyn ProgressReporter> {
    if console::Term::stderr().is_term() {
        Arc::new(FancyReporter::new())
    } else {
        Arc::new(SimpleReporter::new())
    }
}
