//! Synthesis, caching, and housekeeping
//!
//! Audio is cached under a content hash of `{text}_{lang}_{slow}` so a
//! repeated phrase never hits the engine twice. One-off generated files
//! live in a separate output directory with unique names. Cleanup
//! piggybacks on requests at most once per hour: old output files are
//! removed and the cache is trimmed to its newest entries.

use async_trait::async_trait;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};
use suara_tts::{LocalNarrator, NarrationConfig, TtsError, TtsResult};
use tracing::{debug, info, warn};

/// How often request-piggybacked cleanup actually runs.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(3600);
/// Output files older than this are removed by cleanup.
const OUTPUT_MAX_AGE: Duration = Duration::from_secs(3600);
/// Cache is trimmed down to this many newest files.
const CACHE_MAX_FILES: usize = 100;

/// Seam over the synthesis engine so the HTTP layer can be tested without
/// an installed espeak binary.
#[async_trait]
pub trait SpeechBackend: Send + Sync {
    /// Synthesize `text` into a WAV file at `out`.
    async fn synthesize_wav(&self, text: &str, lang: &str, slow: bool, out: &Path)
        -> TtsResult<()>;
}

/// Production backend: one engine instance per request, configured for the
/// request's language and pace.
pub struct EspeakBackend;

#[async_trait]
impl SpeechBackend for EspeakBackend {
    async fn synthesize_wav(
        &self,
        text: &str,
        lang: &str,
        slow: bool,
        out: &Path,
    ) -> TtsResult<()> {
        let narrator = LocalNarrator::new(NarrationConfig {
            lang: lang.to_string(),
            slow,
            ..NarrationConfig::default()
        })
        .await;
        narrator.synthesize_to_wav(text, out).await
    }
}

pub struct TtsService {
    backend: Box<dyn SpeechBackend>,
    cache_dir: PathBuf,
    output_dir: PathBuf,
    last_cleanup: Mutex<Instant>,
}

impl TtsService {
    /// Create the service with its cache/output directories under
    /// `data_dir`, creating them if needed.
    pub fn new(backend: Box<dyn SpeechBackend>, data_dir: &Path) -> std::io::Result<Self> {
        let cache_dir = data_dir.join("audio_cache");
        let output_dir = data_dir.join("audio_output");
        fs::create_dir_all(&cache_dir)?;
        fs::create_dir_all(&output_dir)?;
        Ok(Self {
            backend,
            cache_dir,
            output_dir,
            last_cleanup: Mutex::new(Instant::now()),
        })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn cache_key(text: &str, lang: &str, slow: bool) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!("{text}_{lang}_{slow}"));
        hex::encode(hasher.finalize())
    }

    /// Synthesize (or reuse) audio for `text`; returns the path of the
    /// resulting WAV file.
    pub async fn generate(
        &self,
        text: &str,
        lang: &str,
        slow: bool,
        use_cache: bool,
    ) -> TtsResult<PathBuf> {
        let text = text.trim();
        if text.is_empty() {
            return Err(TtsError::InvalidInput("empty text".to_string()));
        }

        let cache_path = self
            .cache_dir
            .join(format!("{}.wav", Self::cache_key(text, lang, slow)));
        if use_cache && cache_path.exists() {
            debug!(target: "server", "Cache hit for {} chars", text.len());
            return Ok(cache_path);
        }

        let unique = &uuid::Uuid::new_v4().simple().to_string()[..8];
        let output_path = self.output_dir.join(format!("tts_{unique}.wav"));
        self.backend
            .synthesize_wav(text, lang, slow, &output_path)
            .await?;
        info!(
            target: "server",
            "Synthesized {} chars -> {}",
            text.len(),
            output_path.display()
        );

        if use_cache {
            if let Err(e) = fs::copy(&output_path, &cache_path) {
                warn!(target: "server", "Failed to populate cache: {}", e);
            }
        }
        Ok(output_path)
    }

    /// Locate a previously generated audio file by name. Output dir is
    /// checked first, then the cache. Names with path separators or
    /// parent components are rejected outright.
    pub fn resolve_audio(&self, filename: &str) -> Option<PathBuf> {
        if filename.contains('/') || filename.contains('\\') || filename.contains("..") {
            return None;
        }
        let output_path = self.output_dir.join(filename);
        if output_path.is_file() {
            return Some(output_path);
        }
        let cache_path = self.cache_dir.join(filename);
        if cache_path.is_file() {
            return Some(cache_path);
        }
        None
    }

    /// Cleanup gate, called from request handlers. Runs the actual
    /// housekeeping at most once per [`CLEANUP_INTERVAL`].
    pub fn run_periodic_cleanup(&self) {
        {
            let mut last = self.last_cleanup.lock();
            if last.elapsed() < CLEANUP_INTERVAL {
                return;
            }
            *last = Instant::now();
        }
        self.clean_output(OUTPUT_MAX_AGE);
        self.clean_cache(CACHE_MAX_FILES);
    }

    /// Remove output files older than `max_age`.
    pub fn clean_output(&self, max_age: Duration) {
        let now = SystemTime::now();
        for entry in Self::wav_files(&self.output_dir) {
            let age = entry
                .metadata()
                .and_then(|m| m.modified())
                .ok()
                .and_then(|modified| now.duration_since(modified).ok());
            if matches!(age, Some(age) if age > max_age) {
                debug!(target: "server", "Removing old output {}", entry.path().display());
                let _ = fs::remove_file(entry.path());
            }
        }
    }

    /// Trim the cache to the newest `max_files` entries.
    pub fn clean_cache(&self, max_files: usize) {
        let mut files: Vec<_> = Self::wav_files(&self.cache_dir)
            .filter_map(|entry| {
                let modified = entry.metadata().and_then(|m| m.modified()).ok()?;
                Some((entry.path(), modified))
            })
            .collect();
        if files.len() <= max_files {
            return;
        }
        // Oldest first.
        files.sort_by_key(|(_, modified)| *modified);
        let excess = files.len() - max_files;
        for (path, _) in files.into_iter().take(excess) {
            debug!(target: "server", "Trimming cache file {}", path.display());
            let _ = fs::remove_file(path);
        }
    }

    fn wav_files(dir: &Path) -> impl Iterator<Item = fs::DirEntry> {
        fs::read_dir(dir)
            .into_iter()
            .flatten()
            .flatten()
            .filter(|entry| {
                entry
                    .path()
                    .extension()
                    .is_some_and(|ext| ext == "wav")
            })
    }
}
