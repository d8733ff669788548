//! Background alignment requests where only the newest request may publish.
//!
//! Local alignments run on the rayon pool; remote jobs poll on a dedicated
//! thread. Every [`AlignmentSession::request`] bumps a generation counter. Workers
//! carry the generation they were started with; results from older
//! generations are dropped when collected, and remote jobs stop polling as
//! soon as they notice they are stale.

use crate::config::CrosswalkConfig;
use crate::error::{CrosswalkError, ErrorCode};
use crate::pairwise::{LocalAligner, run_local_alignment_with};
use crate::remote_alignment::{AlignmentProgress, HttpTransport, JobTransport, RemoteAlignmentClient};
use crosswalk_protocol::Alignment;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct GenerationGuard {
    token: u64,
    current: Arc<AtomicU64>,
}

impl GenerationGuard {
    pub fn token(&self) -> u64 {
        self.token
    }

    pub fn is_current(&self) -> bool {
        self.current.load(Ordering::SeqCst) == self.token
    }
}

#[derive(Debug)]
enum JobMessage {
    Progress(u64, AlignmentProgress),
    Done(u64, Result<Alignment, CrosswalkError>),
}

pub struct AlignmentSession {
    config: CrosswalkConfig,
    transport: Arc<dyn JobTransport>,
    current: Arc<AtomicU64>,
    sender: Sender<JobMessage>,
    receiver: Receiver<JobMessage>,
    latest: Option<Alignment>,
    last_error: Option<CrosswalkError>,
    last_progress: Option<AlignmentProgress>,
    pending: bool,
}

impl AlignmentSession {
    /// Session talking to the configured remote service over HTTP.
    pub fn new(config: CrosswalkConfig) -> Result<Self, CrosswalkError> {
        let timeout = Duration::from_secs(config.remote.request_timeout_secs);
        let transport = Arc::new(HttpTransport::new(timeout)?);
        Ok(Self::with_transport(config, transport))
    }

    pub fn with_transport(config: CrosswalkConfig, transport: Arc<dyn JobTransport>) -> Self {
        let (sender, receiver) = channel();
        Self {
            config,
            transport,
            current: Arc::new(AtomicU64::new(0)),
            sender,
            receiver,
            latest: None,
            last_error: None,
            last_progress: None,
            pending: false,
        }
    }

    pub fn config(&self) -> &CrosswalkConfig {
        &self.config
    }

    pub fn generation(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }

    /// Starts aligning `seq1` against `seq2` and invalidates any request
    /// still in flight. Returns the new generation.
    pub fn request(&mut self, seq1: &str, seq2: &str) -> u64 {
        let token = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.latest = None;
        self.last_error = None;
        self.last_progress = None;
        self.pending = true;

        let guard = GenerationGuard {
            token,
            current: self.current.clone(),
        };
        let sender = self.sender.clone();
        let config = self.config.clone();
        let transport = self.transport.clone();
        let (seq1, seq2) = (seq1.to_string(), seq2.to_string());
        log::debug!(
            "alignment request {token}: {} ({} x {} residues)",
            config.algorithm,
            seq1.len(),
            seq2.len()
        );

        match LocalAligner::for_algorithm(config.algorithm) {
            Some(aligner) => {
                let gaps = config.gap_penalties();
                rayon::spawn(move || {
                    let alignment = run_local_alignment_with(&seq1, &seq2, aligner, gaps);
                    // The session may already be gone.
                    let _ = sender.send(JobMessage::Done(token, Ok(alignment)));
                });
            }
            None => {
                // Polling sleeps between status checks, so it gets its own
                // thread instead of a rayon worker.
                let spawned = thread::Builder::new()
                    .name(format!("remote-alignment-{token}"))
                    .spawn(move || {
                        let result =
                            RemoteAlignmentClient::new(transport, config.algorithm, config.remote)
                                .and_then(|client| {
                                    let progress_sender = sender.clone();
                                    client.run(&seq1, &seq2, &|| guard.is_current(), &mut |progress| {
                                        let _ = progress_sender
                                            .send(JobMessage::Progress(token, progress));
                                    })
                                });
                        let _ = sender.send(JobMessage::Done(token, result));
                    });
                if let Err(e) = spawned {
                    log::warn!("could not start remote alignment request {token}: {e}");
                    self.pending = false;
                    self.last_error = Some(CrosswalkError::new(
                        ErrorCode::Internal,
                        format!("could not start remote alignment worker: {e}"),
                    ));
                }
            }
        }
        token
    }

    fn absorb(&mut self, message: JobMessage) -> bool {
        let current = self.generation();
        match message {
            JobMessage::Progress(token, progress) if token == current => {
                self.last_progress = Some(progress);
                false
            }
            JobMessage::Done(token, result) if token == current => {
                self.pending = false;
                match result {
                    Ok(alignment) => self.latest = Some(alignment),
                    Err(e) => {
                        log::warn!("alignment request {token} failed: {e}");
                        self.last_error = Some(e);
                    }
                }
                true
            }
            JobMessage::Progress(token, _) | JobMessage::Done(token, _) => {
                log::debug!("discarding stale alignment message from request {token} (current {current})");
                false
            }
        }
    }

    /// Drains finished work without blocking. Returns true once the current
    /// request has completed.
    pub fn try_collect(&mut self) -> bool {
        while let Ok(message) = self.receiver.try_recv() {
            if self.absorb(message) {
                return true;
            }
        }
        !self.pending
    }

    /// Blocks until the current request completes.
    pub fn wait(&mut self) -> Result<Alignment, CrosswalkError> {
        while self.pending {
            let message = self.receiver.recv().map_err(|e| {
                CrosswalkError::new(ErrorCode::Internal, format!("alignment worker vanished: {e}"))
            })?;
            self.absorb(message);
        }
        if let Some(alignment) = &self.latest {
            return Ok(alignment.clone());
        }
        Err(self.last_error.clone().unwrap_or_else(|| {
            CrosswalkError::new(ErrorCode::InvalidInput, "No alignment has been requested")
        }))
    }

    pub fn latest(&self) -> Option<&Alignment> {
        self.latest.as_ref()
    }

    pub fn last_error(&self) -> Option<&CrosswalkError> {
        self.last_error.as_ref()
    }

    pub fn last_progress(&self) -> Option<&AlignmentProgress> {
        self.last_progress.as_ref()
    }
}
