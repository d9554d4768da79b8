//! # Recovery after a panic-class composer failure
//!
//! [`RecoveryManager`] keeps the plain text of the document as of the last
//! whole-document replacement. When the composer has to be discarded, a fresh
//! one is provisioned and reseeded with that text. Should the reload itself
//! fail, the composer is replaced once more and left empty; there is no third
//! attempt.

use crate::composer::{ComposerError, ComposerHandle, ComposerProvider};

/// Steps of the bounded recovery sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryStep {
    /// Provision a fresh composer and reload the snapshot into it.
    ReloadSnapshot,
    /// Provision a fresh composer and leave it empty.
    ResetEmpty,
}

/// How a recovery ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// The fresh composer holds the snapshot text.
    Restored,
    /// The reload failed; the composer holds an empty document.
    Reset,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryManager {
    snapshot: String,
}

impl RecoveryManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> &str {
        &self.snapshot
    }

    pub fn refresh(&mut self, plain_text: String) {
        self.snapshot = plain_text;
    }

    /// Replace `composer` with a fresh one from `provider` and reseed it.
    ///
    /// `on_failure` sees the reload failure, if any, before the second
    /// re-provision. After a [`RecoveryOutcome::Reset`] the snapshot is
    /// emptied to match the document.
    pub fn recover<F>(
        &mut self,
        composer: &mut Box<dyn ComposerHandle>,
        provider: &mut ComposerProvider,
        mut on_failure: F,
    ) -> RecoveryOutcome
    where
        F: FnMut(&ComposerError),
    {
        let mut step = RecoveryStep::ReloadSnapshot;
        loop {
            match step {
                RecoveryStep::ReloadSnapshot => {
                    *composer = provider();
                    match composer.replace_text(self.snapshot.clone()) {
                        Ok(_) => {
                            log::debug!(
                                "Reloaded {} characters into a fresh composer",
                                self.snapshot.chars().count()
                            );
                            return RecoveryOutcome::Restored;
                        }
                        Err(err) => {
                            log::error!("Reloading the recovery snapshot failed: {err}");
                            on_failure(&err);
                            if !err.is_panic() {
                                // the fresh composer is still usable, just empty
                                self.snapshot.clear();
                                return RecoveryOutcome::Reset;
                            }
                            step = RecoveryStep::ResetEmpty;
                        }
                    }
                }
                RecoveryStep::ResetEmpty => {
                    *composer = provider();
                    self.snapshot.clear();
                    return RecoveryOutcome::Reset;
                }
            }
        }
    }
}
