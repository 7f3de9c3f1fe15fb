use std::sync::Mutex;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use scm_importer::ImportProgress;

/// Interactive progress reporter using indicatif.
///
/// One spinner for the whole run; each event replaces its message. The
/// spinner is created lazily so nothing is drawn for runs that fail before
/// the first event.
pub struct InteractiveReporter {
    bar: Mutex<Option<ProgressBar>>,
    draw_target: fn() -> ProgressDrawTarget,
}

impl InteractiveReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
            draw_target: ProgressDrawTarget::stderr,
        }
    }

    /// Reporter that never draws.
    #[cfg(test)]
    pub fn hidden() -> Self {
        Self {
            bar: Mutex::new(None),
            draw_target: ProgressDrawTarget::hidden,
        }
    }

    fn spinner(&self, slot: &mut Option<ProgressBar>) -> ProgressBar {
        slot.get_or_insert_with(|| {
            let bar = ProgressBar::with_draw_target(None, (self.draw_target)());
            bar.set_style(Self::spinner_style());
            bar.set_prefix("scm-importer");
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        })
        .clone()
    }

    pub fn handle(&self, event: ImportProgress) {
        let mut slot = self.bar.lock().unwrap_or_else(|e| e.into_inner());
        let pb = self.spinner(&mut *slot);

        match event {
            ImportProgress::Authenticating { .. } => {
                pb.set_message("Authenticating...");
            }
            ImportProgress::Authenticated => {
                pb.set_message("Authenticated");
            }
            ImportProgress::ResolvingProject { name } => {
                pb.set_message(format!("Looking up project {}...", name));
            }
            ImportProgress::ProjectFound { name, .. } => {
                pb.println(format!("  Using existing project {}", name));
            }
            ImportProgress::ProjectCreated { name, project_id } => {
                pb.println(format!("  Created project {} ({})", name, project_id));
            }
            ImportProgress::AlreadyLinked { name, .. } => {
                pb.set_message(format!("{} is already an SCM project", name));
            }
            ImportProgress::ConversionStarted { process_id, .. } => {
                pb.set_message(format!("Converting (process {})...", process_id));
            }
            ImportProgress::StatusChecked { attempt, status } => {
                pb.set_message(format!("Conversion {} (check #{})", status, attempt));
            }
            ImportProgress::Waiting { .. } => {
                pb.tick();
            }
            ImportProgress::CheckingRepoOwner { repo_url } => {
                pb.set_message(format!("Conversion failed, checking who owns {}...", repo_url));
            }
            ImportProgress::ConversionSucceeded { project_name } => {
                pb.set_message(format!("Converted {}", project_name));
            }
            _ => {}
        }
    }

    pub fn finish(&self) {
        let slot = self.bar.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(ref pb) = *slot
            && !pb.is_finished()
        {
            pb.finish_and_clear();
        }
    }

    #[cfg(test)]
    pub fn is_finished(&self) -> bool {
        let slot = self.bar.lock().unwrap_or_else(|e| e.into_inner());
        slot.as_ref().is_none_or(ProgressBar::is_finished)
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{prefix:.bold.cyan} {spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
    }
}

impl Default for InteractiveReporter {
    fn default() -> Self {
        Self::new()
    }
}
