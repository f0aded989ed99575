//! The submit/reset state machine.
//!
//! A `Session` owns the form, the processing state, the progress display and
//! the result resources. Front ends feed it `SessionEvent`s and render
//! `SessionSnapshot`s; nothing else mutates its fields.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::encode::{encode, EncodedPayload};
use crate::error::ProcessError;
use crate::form::FormDraft;
use crate::models::{AudioFile, PitchMode, ProcessedResult, ProcessingState, TransferEvent};
use crate::progress::TransferProgress;
use crate::resource::{ResourceHandle, ResourceManager, ResultView};
use crate::transfer::{Orchestrator, TransferListener};
use crate::validate::{validate_with_limit, MAX_UPLOAD_BYTES};

#[derive(Debug, Clone, PartialEq)]
pub enum FormEdit {
    SelectFile(Option<AudioFile>),
    SetMode(PitchMode),
    SemitonesFromRange(i64),
    SemitonesFromNumber(String),
    SetNote(String),
}

#[derive(Debug)]
pub enum SessionEvent {
    Edit(FormEdit),
    Submit,
    Transfer(TransferEvent),
    Finished {
        id: u64,
        outcome: Result<ProcessedResult, ProcessError>,
    },
    Reset,
    TogglePlayback,
    DismissNotice,
}

/// A submit that passed validation and is waiting to be sent.
#[derive(Debug, Clone)]
pub struct PendingTransfer {
    pub id: u64,
    pub payload: EncodedPayload,
    pub cancel: CancellationToken,
}

/// Read-only view handed to presentation code.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub state: ProcessingState,
    pub trigger_enabled: bool,
    pub progress: Option<TransferProgress>,
    pub form: FormDraft,
    pub result: Option<ResultView>,
    pub notice: Option<String>,
}

#[derive(Debug)]
pub struct Session {
    form: FormDraft,
    state: ProcessingState,
    trigger_enabled: bool,
    progress: Option<TransferProgress>,
    resources: ResourceManager,
    notice: Option<String>,
    in_flight: Option<(u64, CancellationToken)>,
    next_id: u64,
    max_upload_bytes: u64,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(MAX_UPLOAD_BYTES)
    }
}

impl Session {
    pub fn new(max_upload_bytes: u64) -> Self {
        Self {
            form: FormDraft::default(),
            state: ProcessingState::Idle,
            trigger_enabled: true,
            progress: None,
            resources: ResourceManager::new(),
            notice: None,
            in_flight: None,
            next_id: 0,
            max_upload_bytes,
        }
    }

    pub fn state(&self) -> ProcessingState {
        self.state
    }

    pub fn form(&self) -> &FormDraft {
        &self.form
    }

    pub fn resources(&self) -> &ResourceManager {
        &self.resources
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            trigger_enabled: self.trigger_enabled,
            progress: self.progress,
            form: self.form.clone(),
            result: self.resources.view(),
            notice: self.notice.clone(),
        }
    }

    /// Single entry point for front ends. Returns a transfer to start when the
    /// event was a submit that passed validation.
    pub fn apply(&mut self, event: SessionEvent) -> Option<PendingTransfer> {
        match event {
            SessionEvent::Edit(edit) => self.edit(edit),
            SessionEvent::Submit => return self.submit().ok(),
            SessionEvent::Transfer(ev) => self.on_transfer_event(ev),
            SessionEvent::Finished { id, outcome } => {
                let _ = self.finish(id, outcome);
            }
            SessionEvent::Reset => self.reset(),
            SessionEvent::TogglePlayback => {
                self.resources.toggle_playback();
            }
            SessionEvent::DismissNotice => self.notice = None,
        }
        None
    }

    pub fn edit(&mut self, edit: FormEdit) {
        match edit {
            FormEdit::SelectFile(file) => self.form.file = file,
            FormEdit::SetMode(mode) => self.form.mode = mode,
            FormEdit::SemitonesFromRange(v) => self.form.semitones.set_from_range(v),
            FormEdit::SemitonesFromNumber(text) => self.form.semitones.set_from_number(&text),
            FormEdit::SetNote(note) => self.form.note = note,
        }
    }

    /// Validate and encode the form. On success the trigger is disabled until
    /// `finish` or `reset`.
    pub fn submit(&mut self) -> Result<PendingTransfer, ProcessError> {
        if !self.trigger_enabled || self.in_flight.is_some() {
            return Err(ProcessError::Busy);
        }

        let previous = self.state;
        self.state = ProcessingState::Validating;
        let request = match validate_with_limit(&self.form, self.max_upload_bytes) {
            Ok(request) => request,
            Err(e) => {
                debug!("validation rejected: {}", e);
                self.state = previous;
                self.notice = Some(e.to_string());
                return Err(e.into());
            }
        };

        let payload = encode(&request);
        self.next_id += 1;
        let id = self.next_id;
        let cancel = CancellationToken::new();
        self.in_flight = Some((id, cancel.clone()));

        self.state = ProcessingState::Transferring;
        self.trigger_enabled = false;
        self.progress = Some(TransferProgress::started());
        self.notice = None;
        info!("submit #{}: {} ({})", id, request.file.name, request.parameter);

        Ok(PendingTransfer { id, payload, cancel })
    }

    pub fn on_transfer_event(&mut self, event: TransferEvent) {
        if !matches!(self.state, ProcessingState::Transferring | ProcessingState::Decoding) {
            return;
        }
        match event {
            TransferEvent::Progress(p) => {
                let current = self.progress.map(|c| c.percent).unwrap_or(0);
                if p.percent >= current {
                    self.progress = Some(p);
                }
            }
            TransferEvent::HeadersReceived { .. } => self.state = ProcessingState::Decoding,
        }
    }

    /// Resolve the transfer `id`. Outcomes of transfers that were reset away
    /// are dropped.
    pub fn finish(
        &mut self,
        id: u64,
        outcome: Result<ProcessedResult, ProcessError>,
    ) -> Result<ResourceHandle, ProcessError> {
        match &self.in_flight {
            Some((current, _)) if *current == id => self.in_flight = None,
            _ => {
                debug!("dropping outcome of stale transfer #{}", id);
                return Err(ProcessError::Cancelled);
            }
        }

        let result = match outcome {
            Ok(result) => {
                self.progress = Some(TransferProgress::complete());
                let handle = self.resources.install(result);
                self.state = ProcessingState::Complete;
                Ok(handle)
            }
            Err(e) => {
                if e.is_user_visible() {
                    warn!("transfer #{} failed: {}", id, e);
                    self.notice = Some(format!("Processing failed: {}", e));
                    self.state = ProcessingState::Failed;
                } else {
                    self.state = ProcessingState::Idle;
                }
                Err(e)
            }
        };

        self.finalize();
        result
    }

    /// Tear down the result and restore the empty form. Cancels an in-flight
    /// transfer. Safe to call any number of times.
    pub fn reset(&mut self) {
        if let Some((id, cancel)) = self.in_flight.take() {
            debug!("reset cancels transfer #{}", id);
            cancel.cancel();
        }
        self.resources.clear();
        self.form.clear();
        self.notice = None;
        self.state = ProcessingState::Idle;
        self.finalize();
    }

    pub fn toggle_playback(&mut self) {
        self.resources.toggle_playback();
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    /// Runs on every exit from a submit, success or not.
    fn finalize(&mut self) {
        self.trigger_enabled = true;
        self.progress = None;
    }

    /// Submit and drive the transfer to completion on the current task.
    pub async fn process(
        &mut self,
        orchestrator: &Orchestrator,
        listener: &mut impl TransferListener,
    ) -> Result<ResourceHandle, ProcessError> {
        let pending = self.submit()?;
        self.drive(pending, orchestrator, listener).await
    }

    /// Run an already submitted transfer to completion on the current task.
    pub async fn drive(
        &mut self,
        pending: PendingTransfer,
        orchestrator: &Orchestrator,
        listener: &mut impl TransferListener,
    ) -> Result<ResourceHandle, ProcessError> {
        let outcome = {
            let mut tee = SessionListener {
                session: self,
                inner: listener,
            };
            orchestrator.transfer(&pending.payload, &mut tee, &pending.cancel).await
        };
        self.finish(pending.id, outcome)
    }
}

/// Feeds transfer events into the session and on to another listener.
struct SessionListener<'a, L> {
    session: &'a mut Session,
    inner: &'a mut L,
}

impl<L: TransferListener> TransferListener for SessionListener<'_, L> {
    fn on_event(&mut self, event: TransferEvent) {
        self.session.on_transfer_event(event.clone());
        self.inner.on_event(event);
    }
}
