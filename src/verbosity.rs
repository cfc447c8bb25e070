//! Handling of status messages and progress indication.

use indicatif::ProgressBar;

/// How much auxiliary output to produce during expensive operations.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Verbosity {
    /// Do not produce any auxiliary output.
    #[default]
    Quiet,
    /// Print status messages.
    Messages,
    /// Print status messages and show progress bars for expensive passes.
    Progress,
}

impl Verbosity {
    /// Whether status messages should be printed.
    pub fn print_messages(&self) -> bool {
        !matches!(self, Self::Quiet)
    }

    /// Creates a progress bar for the given number of iterations,
    /// hidden unless progress indication is requested.
    pub fn create_progress_bar(&self, n_iterations: usize) -> ProgressBar {
        match self {
            Self::Progress => ProgressBar::new(n_iterations as u64),
            _ => ProgressBar::hidden(),
        }
    }
}
