use std::net::IpAddr;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::multipart::{Form, Part};
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::decode::{decode, ResponseHead};
use crate::encode::EncodedPayload;
use crate::error::ProcessError;
use crate::models::{ProcessedResult, TransferEvent};
use crate::progress::{ProgressMode, ProgressTracker};

const UPLOAD_CHUNK: usize = 64 * 1024;

/// Observer for an outstanding transfer. Called on the task driving it.
pub trait TransferListener {
    fn on_event(&mut self, event: TransferEvent);
}

pub struct NoOpListener;

impl TransferListener for NoOpListener {
    #[inline(always)]
    fn on_event(&mut self, _event: TransferEvent) {}
}

/// Forwards events to whoever owns the session, for front ends that run the
/// transfer as a separate task.
pub struct ChannelListener<T> {
    tx: mpsc::UnboundedSender<T>,
    wrap: fn(TransferEvent) -> T,
}

impl<T> ChannelListener<T> {
    pub fn new(tx: mpsc::UnboundedSender<T>, wrap: fn(TransferEvent) -> T) -> Self {
        Self { tx, wrap }
    }
}

impl<T> TransferListener for ChannelListener<T> {
    fn on_event(&mut self, event: TransferEvent) {
        let _ = self.tx.send((self.wrap)(event));
    }
}

#[derive(Debug, Clone)]
pub struct TransferSettings {
    pub endpoint: String,
    pub tick_interval: Duration,
    /// `None` waits forever.
    pub timeout: Option<Duration>,
    pub progress: ProgressMode,
}

/// Sends one encoded payload to the processing endpoint and decodes the reply.
///
/// One POST per call, no retries. The progress timer only runs while the
/// request is outstanding and stops the moment a response (or error) arrives.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    client: reqwest::Client,
    settings: TransferSettings,
}

impl Orchestrator {
    pub fn new(settings: TransferSettings) -> Result<Self, ProcessError> {
        let url = reqwest::Url::parse(&settings.endpoint).map_err(|e| ProcessError::InvalidEndpoint {
            url: settings.endpoint.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ProcessError::InvalidEndpoint {
                url: settings.endpoint.clone(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }

        let mut builder = reqwest::Client::builder();
        if is_loopback(&url) {
            builder = builder.no_proxy();
        }
        let client = builder.build()?;
        Ok(Self { client, settings })
    }

    pub fn settings(&self) -> &TransferSettings {
        &self.settings
    }

    pub async fn transfer(
        &self,
        payload: &EncodedPayload,
        listener: &mut impl TransferListener,
        cancel: &CancellationToken,
    ) -> Result<ProcessedResult, ProcessError> {
        let read_error = |source| ProcessError::Read {
            path: payload.file.path.clone(),
            source,
        };
        let file = tokio::fs::File::open(&payload.file.path).await.map_err(read_error)?;
        let total = file.metadata().await.map_err(read_error)?.len();

        let (sent_tx, mut sent_rx) = mpsc::unbounded_channel::<u64>();
        let form = build_form(payload, file, total, sent_tx)?;

        info!(
            "POST {} ({}, {} bytes, {}={})",
            self.settings.endpoint, payload.file.filename, total, payload.parameter.key, payload.parameter.value
        );

        let mut tracker = ProgressTracker::new(self.settings.progress);
        if total == 0 {
            // Nothing to stream, so no upload events will ever arrive.
            tracker.record_upload(0, 0);
        }
        listener.on_event(TransferEvent::Progress(tracker.current()));

        let deadline = self.settings.timeout;
        let expired = async move {
            match deadline {
                Some(d) => tokio::time::sleep(d).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(expired);

        let request = self.client.post(&self.settings.endpoint).multipart(form).send();
        tokio::pin!(request);

        let tick = self.settings.tick_interval;
        let mut ticker = interval_at(Instant::now() + tick, tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut sent = 0u64;
        let response = loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => return Err(ProcessError::Cancelled),

                _ = &mut expired => return Err(ProcessError::Timeout(deadline.unwrap_or_default())),

                result = &mut request => break result?,

                Some(n) = sent_rx.recv() => {
                    sent += n;
                    if let Some(p) = tracker.record_upload(sent, total) {
                        listener.on_event(TransferEvent::Progress(p));
                    }
                }

                _ = ticker.tick() => {
                    if let Some(p) = tracker.tick() {
                        listener.on_event(TransferEvent::Progress(p));
                    }
                }
            }
        };
        drop(ticker);

        let head = ResponseHead::from_response(&response);
        debug!("response {} content-type={:?}", head.status, head.content_type);
        listener.on_event(TransferEvent::HeadersReceived { status: head.status });

        let body = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ProcessError::Cancelled),
            _ = &mut expired => return Err(ProcessError::Timeout(deadline.unwrap_or_default())),
            body = response.bytes() => body?,
        };

        let result = decode(&head, Vec::from(body), &payload.request)?;
        listener.on_event(TransferEvent::Progress(tracker.complete()));
        info!("received {} ({} bytes)", result.filename, result.payload.len());
        Ok(result)
    }
}

fn is_loopback(url: &reqwest::Url) -> bool {
    match url.host_str() {
        Some(host) if host.eq_ignore_ascii_case("localhost") => true,
        Some(host) => host
            .trim_start_matches('[')
            .trim_end_matches(']')
            .parse::<IpAddr>()
            .map(|ip| ip.is_loopback())
            .unwrap_or(false),
        None => false,
    }
}

/// Multipart body: the file under `file` with its original name, then the one
/// pitch field. The file is read from disk in chunks as the connection takes
/// them, and each chunk's size is reported on `sent_tx`.
fn build_form(
    payload: &EncodedPayload,
    file: tokio::fs::File,
    total: u64,
    sent_tx: mpsc::UnboundedSender<u64>,
) -> Result<Form, ProcessError> {
    let stream = ReaderStream::with_capacity(file, UPLOAD_CHUNK).map(move |chunk| {
        if let Ok(ref bytes) = chunk {
            let _ = sent_tx.send(bytes.len() as u64);
        }
        chunk
    });

    let mut part = Part::stream_with_length(reqwest::Body::wrap_stream(stream), total)
        .file_name(payload.file.filename.clone());
    if !payload.file.media_type.is_empty() {
        part = part.mime_str(&payload.file.media_type)?;
    }

    let mut form = Form::new().part(payload.file.field, part);
    for (key, value) in payload.text_fields() {
        debug!("form field {}={}", key, value);
        form = form.text(key, value.to_string());
    }
    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(endpoint: &str) -> TransferSettings {
        TransferSettings {
            endpoint: endpoint.to_string(),
            tick_interval: Duration::from_millis(500),
            timeout: None,
            progress: ProgressMode::Heuristic,
        }
    }

    #[test]
    fn test_rejects_bad_endpoints() {
        assert!(matches!(
            Orchestrator::new(settings("not a url")),
            Err(ProcessError::InvalidEndpoint { .. })
        ));
        assert!(matches!(
            Orchestrator::new(settings("ftp://example.com/api")),
            Err(ProcessError::InvalidEndpoint { .. })
        ));
        assert!(Orchestrator::new(settings("http://localhost:8080/api/audio/pitch")).is_ok());
    }

    #[test]
    fn test_loopback_detection() {
        let url = |s: &str| reqwest::Url::parse(s).unwrap();
        assert!(is_loopback(&url("http://localhost:1/")));
        assert!(is_loopback(&url("http://127.0.0.1:1/")));
        assert!(is_loopback(&url("http://[::1]:1/")));
        assert!(!is_loopback(&url("https://example.com/")));
    }
}
