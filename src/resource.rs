use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::audio::{probe_payload, AudioSummary};
use crate::models::ProcessedResult;

/// Revocable reference to an in-memory payload, shared by the player and the
/// download link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceHandle(u64);

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "blob:repitch/{}", self.0)
    }
}

/// Maps live handles to payload bytes. Released handles resolve to nothing.
#[derive(Debug, Default)]
pub struct HandleRegistry {
    next_id: u64,
    live: HashMap<ResourceHandle, Arc<[u8]>>,
}

impl HandleRegistry {
    pub fn create(&mut self, payload: Arc<[u8]>) -> ResourceHandle {
        self.next_id += 1;
        let handle = ResourceHandle(self.next_id);
        self.live.insert(handle, payload);
        handle
    }

    pub fn release(&mut self, handle: ResourceHandle) {
        self.live.remove(&handle);
    }

    pub fn resolve(&self, handle: ResourceHandle) -> Option<&[u8]> {
        self.live.get(&handle).map(|p| &**p)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// Playback element: holds a source handle and a transport state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Player {
    pub source: Option<ResourceHandle>,
    pub state: PlaybackState,
    pub summary: Option<AudioSummary>,
}

impl Player {
    fn load(&mut self, handle: ResourceHandle, summary: Option<AudioSummary>) {
        self.source = Some(handle);
        self.state = PlaybackState::Stopped;
        self.summary = summary;
    }

    pub fn pause(&mut self) {
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Paused;
        }
    }

    fn unload(&mut self) {
        *self = Player::default();
    }
}

/// Download affordance: a handle plus the suggested save name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadLink {
    pub href: Option<ResourceHandle>,
    pub filename: Option<String>,
}

/// What the result panel shows.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultView {
    pub handle: ResourceHandle,
    pub filename: String,
    pub content_type: String,
    pub size: u64,
    pub playback: PlaybackState,
    pub summary: Option<AudioSummary>,
}

/// Owns the one live result handle and the widgets that reference it.
#[derive(Debug, Default)]
pub struct ResourceManager {
    registry: HandleRegistry,
    current: Option<(ResourceHandle, ProcessedResult)>,
    player: Player,
    download: DownloadLink,
}

impl ResourceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a new result, releasing any previous handle first.
    pub fn install(&mut self, result: ProcessedResult) -> ResourceHandle {
        self.release_current();

        let summary = probe_payload(&result.payload, &result.content_type);
        let handle = self.registry.create(result.payload.clone());
        debug!("created {} for {}", handle, result.filename);

        self.player.load(handle, summary);
        self.download = DownloadLink {
            href: Some(handle),
            filename: Some(result.filename.clone()),
        };
        self.current = Some((handle, result));
        handle
    }

    /// Pause playback, release the handle and clear the widgets. Safe to call
    /// with nothing held.
    pub fn clear(&mut self) {
        self.player.pause();
        self.release_current();
    }

    fn release_current(&mut self) {
        // Widgets drop their references before the handle goes away.
        self.player.unload();
        self.download = DownloadLink::default();
        if let Some((handle, _)) = self.current.take() {
            self.registry.release(handle);
            debug!("released {}", handle);
        }
    }

    pub fn current(&self) -> Option<&ProcessedResult> {
        self.current.as_ref().map(|(_, r)| r)
    }

    pub fn handle(&self) -> Option<ResourceHandle> {
        self.current.as_ref().map(|(h, _)| *h)
    }

    pub fn registry(&self) -> &HandleRegistry {
        &self.registry
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn download_link(&self) -> &DownloadLink {
        &self.download
    }

    /// Toggle play/pause. Returns the new state, or `None` with nothing loaded.
    pub fn toggle_playback(&mut self) -> Option<PlaybackState> {
        self.player.source?;
        self.player.state = match self.player.state {
            PlaybackState::Playing => PlaybackState::Paused,
            PlaybackState::Paused | PlaybackState::Stopped => PlaybackState::Playing,
        };
        Some(self.player.state)
    }

    pub fn view(&self) -> Option<ResultView> {
        let (handle, result) = self.current.as_ref()?;
        Some(ResultView {
            handle: *handle,
            filename: result.filename.clone(),
            content_type: result.content_type.clone(),
            size: result.payload.len() as u64,
            playback: self.player.state,
            summary: self.player.summary,
        })
    }

    /// Save the payload behind the download link into `dir` under the
    /// suggested name.
    pub fn download_to_dir(&self, dir: &Path) -> io::Result<PathBuf> {
        let filename = self
            .download
            .filename
            .as_deref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no result to download"))?;
        let path = dir.join(sanitize_filename(filename));
        self.download_to(&path)?;
        Ok(path)
    }

    /// Save the payload behind the download link to an explicit path.
    pub fn download_to(&self, path: &Path) -> io::Result<()> {
        let bytes = self
            .download
            .href
            .and_then(|h| self.registry.resolve(h))
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no result to download"))?;
        std::fs::write(path, bytes)
    }
}

/// Keep a server-suggested name inside the target directory.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect();
    match cleaned.trim() {
        "" | "." | ".." => "processed_audio".to_string(),
        trimmed => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(name: &str, bytes: &[u8]) -> ProcessedResult {
        ProcessedResult {
            payload: Arc::from(bytes.to_vec()),
            content_type: "audio/mpeg".to_string(),
            filename: name.to_string(),
        }
    }

    #[test]
    fn test_install_exposes_handle_to_both_widgets() {
        let mut rm = ResourceManager::new();
        let h = rm.install(result("out.mp3", b"abc"));
        assert_eq!(rm.player().source, Some(h));
        assert_eq!(rm.download_link().href, Some(h));
        assert_eq!(rm.download_link().filename.as_deref(), Some("out.mp3"));
        assert_eq!(rm.registry().resolve(h), Some(&b"abc"[..]));
        assert_eq!(h.to_string(), "blob:repitch/1");
    }

    #[test]
    fn test_superseded_handle_is_released() {
        let mut rm = ResourceManager::new();
        let first = rm.install(result("a.mp3", b"1"));
        let second = rm.install(result("b.mp3", b"2"));
        assert_ne!(first, second);
        assert_eq!(rm.registry().live_count(), 1);
        assert_eq!(rm.registry().resolve(first), None);
        assert_eq!(rm.player().source, Some(second));
    }

    #[test]
    fn test_clear_is_idempotent() {
        let mut rm = ResourceManager::new();
        rm.clear();
        let h = rm.install(result("a.mp3", b"1"));
        rm.toggle_playback();
        rm.clear();
        rm.clear();
        assert_eq!(rm.registry().resolve(h), None);
        assert_eq!(rm.registry().live_count(), 0);
        assert_eq!(rm.player(), &Player::default());
        assert_eq!(rm.download_link(), &DownloadLink::default());
        assert!(rm.view().is_none());
    }

    #[test]
    fn test_toggle_playback() {
        let mut rm = ResourceManager::new();
        assert_eq!(rm.toggle_playback(), None);
        rm.install(result("a.mp3", b"1"));
        assert_eq!(rm.toggle_playback(), Some(PlaybackState::Playing));
        assert_eq!(rm.toggle_playback(), Some(PlaybackState::Paused));
    }

    #[test]
    fn test_download_writes_payload() {
        let dir = tempfile::tempdir().unwrap();
        let mut rm = ResourceManager::new();
        assert!(rm.download_to_dir(dir.path()).is_err());

        rm.install(result("../evil/out put.mp3", b"payload"));
        let path = rm.download_to_dir(dir.path()).unwrap();
        assert_eq!(path, dir.path().join(".._evil_out put.mp3"));
        assert_eq!(std::fs::read(&path).unwrap(), b"payload");
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("result.mp3"), "result.mp3");
        assert_eq!(sanitize_filename("a/b\\c.wav"), "a_b_c.wav");
        assert_eq!(sanitize_filename(".."), "processed_audio");
        assert_eq!(sanitize_filename("  "), "processed_audio");
    }
}
