//! Incremental encoders.
//!
//! The export controller feeds composited RGBA frames to an [`Encoder`]
//! once per tick and collects encoded chunks as they appear; chunk order
//! always equals temporal order. [`FfmpegEncoder`] drives a spawned
//! `ffmpeg` process; [`NullEncoder`] supports dry runs and tests.

use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc;
use std::thread::JoinHandle;

use async_trait::async_trait;
use captionkiln_common::error::{KilnError, KilnResult};
use captionkiln_media::AudioTrack;
use captionkiln_project_model::Resolution;

/// One piece of encoded container output.
#[derive(Debug, Clone)]
pub struct EncodedChunk {
    pub data: Vec<u8>,
}

/// An incremental video encoder.
#[async_trait]
pub trait Encoder: Send {
    /// File extension of the produced container.
    fn container_ext(&self) -> &'static str;

    /// Begin an encode. `audio`, when present, is pulled alongside the
    /// pushed frames.
    fn start(
        &mut self,
        resolution: Resolution,
        fps: u32,
        audio: Option<AudioTrack>,
    ) -> KilnResult<()>;

    /// Push one packed RGBA frame at the given playback time.
    fn push_frame(&mut self, rgba: &[u8], time_secs: f64) -> KilnResult<()>;

    /// Chunks produced since the last drain, in temporal order.
    fn drain_chunks(&mut self) -> Vec<EncodedChunk>;

    /// Flush and stop. Returns any remaining chunks. Safe to call after
    /// an error; a second call is a no-op.
    async fn finish(&mut self) -> KilnResult<Vec<EncodedChunk>>;
}

/// Whether the `ffmpeg` binary is reachable.
pub fn ffmpeg_available() -> bool {
    command_exists("ffmpeg")
}

fn command_exists(binary: &str) -> bool {
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

enum FfmpegOutput {
    /// Video-only: container streamed from ffmpeg's stdout as it encodes.
    Streaming {
        chunk_rx: mpsc::Receiver<Vec<u8>>,
        stdout_task: JoinHandle<()>,
    },
    /// With audio: video written to a scratch file, PCM spooled to WAV,
    /// muxed into the final container at finish.
    File {
        video_path: PathBuf,
        spool: AudioSpool,
    },
}

struct AudioSpool {
    track: AudioTrack,
    writer: hound::WavWriter<std::io::BufWriter<std::fs::File>>,
    wav_path: PathBuf,
    written_until_secs: f64,
}

struct FfmpegSession {
    child: Child,
    stdin: Option<ChildStdin>,
    stderr_task: JoinHandle<String>,
    output: FfmpegOutput,
    scratch: Option<tempfile::TempDir>,
    frame_bytes: usize,
}

/// Encoder backed by a spawned `ffmpeg` process reading raw RGBA frames
/// over stdin.
#[derive(Default)]
pub struct FfmpegEncoder {
    session: Option<FfmpegSession>,
}

impl FfmpegEncoder {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Encoder for FfmpegEncoder {
    fn container_ext(&self) -> &'static str {
        "mkv"
    }

    fn start(
        &mut self,
        resolution: Resolution,
        fps: u32,
        audio: Option<AudioTrack>,
    ) -> KilnResult<()> {
        if self.session.is_some() {
            return Err(KilnError::encode("encoder already started"));
        }
        if !ffmpeg_available() {
            return Err(KilnError::encode("ffmpeg not found in PATH"));
        }

        let mut cmd = Command::new("ffmpeg");
        cmd.args(["-y", "-hide_banner", "-loglevel", "error"])
            .args(["-f", "rawvideo", "-pix_fmt", "rgba", "-s"])
            .arg(format!("{}x{}", resolution.width, resolution.height))
            .arg("-r")
            .arg(fps.to_string())
            .args(["-i", "pipe:0"])
            .args(["-c:v", "libx264", "-preset", "veryfast", "-pix_fmt", "yuv420p"])
            .args(["-f", "matroska"]);

        let mut scratch = None;
        let pending_output = match audio {
            None => {
                cmd.arg("pipe:1");
                cmd.stdout(Stdio::piped());
                None
            }
            Some(track) => {
                let dir = tempfile::TempDir::new()?;
                let video_path = dir.path().join("video.mkv");
                let wav_path = dir.path().join("audio.wav");
                cmd.arg(&video_path);
                cmd.stdout(Stdio::null());

                let spec = hound::WavSpec {
                    channels: track.channels(),
                    sample_rate: track.sample_rate(),
                    bits_per_sample: 16,
                    sample_format: hound::SampleFormat::Int,
                };
                let writer = hound::WavWriter::create(&wav_path, spec)
                    .map_err(|e| KilnError::encode(format!("cannot open audio spool: {e}")))?;

                scratch = Some(dir);
                Some(FfmpegOutput::File {
                    video_path,
                    spool: AudioSpool {
                        track,
                        writer,
                        wav_path,
                        written_until_secs: 0.0,
                    },
                })
            }
        };

        cmd.stdin(Stdio::piped()).stderr(Stdio::piped());
        let mut child = cmd
            .spawn()
            .map_err(|e| KilnError::encode(format!("failed to start ffmpeg: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| KilnError::encode("failed to open ffmpeg stdin"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| KilnError::encode("failed to capture ffmpeg stderr"))?;

        // Drain stderr concurrently so ffmpeg cannot block on a full pipe.
        let stderr_task = std::thread::spawn(move || -> String {
            let mut reader = std::io::BufReader::new(stderr);
            let mut output = String::new();
            match reader.read_to_string(&mut output) {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        let output = match pending_output {
            Some(file_output) => file_output,
            None => {
                let stdout = child
                    .stdout
                    .take()
                    .ok_or_else(|| KilnError::encode("failed to capture ffmpeg stdout"))?;
                let (chunk_tx, chunk_rx) = mpsc::channel::<Vec<u8>>();
                let stdout_task = std::thread::spawn(move || {
                    let mut reader = std::io::BufReader::new(stdout);
                    let mut buf = [0u8; 64 * 1024];
                    loop {
                        match reader.read(&mut buf) {
                            Ok(0) | Err(_) => break,
                            Ok(n) => {
                                if chunk_tx.send(buf[..n].to_vec()).is_err() {
                                    break;
                                }
                            }
                        }
                    }
                });
                FfmpegOutput::Streaming {
                    chunk_rx,
                    stdout_task,
                }
            }
        };

        tracing::info!(
            pid = child.id(),
            resolution = %resolution,
            fps,
            audio = matches!(output, FfmpegOutput::File { .. }),
            "ffmpeg encoder started"
        );

        self.session = Some(FfmpegSession {
            child,
            stdin: Some(stdin),
            stderr_task,
            output,
            scratch,
            frame_bytes: resolution.width as usize * resolution.height as usize * 4,
        });
        Ok(())
    }

    fn push_frame(&mut self, rgba: &[u8], time_secs: f64) -> KilnResult<()> {
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| KilnError::encode("encoder not started"))?;

        if rgba.len() != session.frame_bytes {
            return Err(KilnError::encode(format!(
                "frame is {} bytes, expected {}",
                rgba.len(),
                session.frame_bytes
            )));
        }

        session
            .stdin
            .as_mut()
            .ok_or_else(|| KilnError::encode("encoder already finishing"))?
            .write_all(rgba)
            .map_err(|e| KilnError::encode(format!("ffmpeg rejected frame data: {e}")))?;

        if let FfmpegOutput::File { spool, .. } = &mut session.output {
            if time_secs > spool.written_until_secs {
                for sample in spool.track.pull_range(spool.written_until_secs, time_secs) {
                    spool
                        .writer
                        .write_sample(sample)
                        .map_err(|e| KilnError::encode(format!("audio spool write: {e}")))?;
                }
                spool.written_until_secs = time_secs;
            }
        }

        Ok(())
    }

    fn drain_chunks(&mut self) -> Vec<EncodedChunk> {
        let Some(session) = self.session.as_mut() else {
            return Vec::new();
        };
        match &session.output {
            FfmpegOutput::Streaming { chunk_rx, .. } => {
                let mut chunks = Vec::new();
                while let Ok(data) = chunk_rx.try_recv() {
                    chunks.push(EncodedChunk { data });
                }
                chunks
            }
            FfmpegOutput::File { .. } => Vec::new(),
        }
    }

    async fn finish(&mut self) -> KilnResult<Vec<EncodedChunk>> {
        let Some(session) = self.session.take() else {
            return Ok(Vec::new());
        };
        let FfmpegSession {
            mut child,
            stdin,
            stderr_task,
            output,
            scratch,
            ..
        } = session;

        // Closing stdin signals end-of-stream; ffmpeg flushes and exits.
        drop(stdin);

        let status = tokio::task::spawn_blocking(move || child.wait())
            .await
            .map_err(|e| KilnError::encode(format!("encoder wait task failed: {e}")))?
            .map_err(|e| KilnError::encode(format!("failed to wait on ffmpeg: {e}")))?;

        let stderr_output = stderr_task
            .join()
            .unwrap_or_else(|_| "<failed to join stderr reader>".to_string());

        if !status.success() {
            return Err(KilnError::encode(format!(
                "ffmpeg exited with {}: {}",
                status,
                stderr_output.trim()
            )));
        }

        let chunks = match output {
            FfmpegOutput::Streaming {
                chunk_rx,
                stdout_task,
            } => {
                let _ = stdout_task.join();
                let mut tail = Vec::new();
                while let Ok(data) = chunk_rx.try_recv() {
                    tail.push(EncodedChunk { data });
                }
                tail
            }
            FfmpegOutput::File { video_path, spool } => {
                let AudioSpool {
                    writer, wav_path, ..
                } = spool;
                writer
                    .finalize()
                    .map_err(|e| KilnError::encode(format!("audio spool finalize: {e}")))?;
                let muxed = mux_audio(&video_path, &wav_path).await?;
                vec![EncodedChunk { data: muxed }]
            }
        };

        // Scratch files live until the muxed container has been read.
        drop(scratch);

        tracing::info!(chunks = chunks.len(), "ffmpeg encoder finished");
        Ok(chunks)
    }
}

/// Mux the encoded video with the spooled WAV into one container.
async fn mux_audio(video_path: &std::path::Path, wav_path: &std::path::Path) -> KilnResult<Vec<u8>> {
    let muxed_path = video_path.with_file_name("muxed.mkv");
    let video = video_path.to_path_buf();
    let wav = wav_path.to_path_buf();
    let out = muxed_path.clone();

    let result = tokio::task::spawn_blocking(move || {
        Command::new("ffmpeg")
            .args(["-y", "-hide_banner", "-loglevel", "error", "-i"])
            .arg(&video)
            .arg("-i")
            .arg(&wav)
            .args(["-c:v", "copy", "-c:a", "aac", "-shortest", "-f", "matroska"])
            .arg(&out)
            .output()
    })
    .await
    .map_err(|e| KilnError::encode(format!("mux task failed: {e}")))?
    .map_err(|e| KilnError::encode(format!("failed to run ffmpeg mux: {e}")))?;

    if !result.status.success() {
        return Err(KilnError::encode(format!(
            "ffmpeg mux exited with {}: {}",
            result.status,
            String::from_utf8_lossy(&result.stderr).trim()
        )));
    }

    Ok(std::fs::read(&muxed_path)?)
}

/// Encoder that produces no real container: a fixed-size record per frame
/// (or nothing at all in the silent variant). Used for `--dry-run` renders
/// and for exercising the session pipeline in tests.
#[derive(Debug, Default)]
pub struct NullEncoder {
    emit_records: bool,
    started: bool,
    frames: u64,
    pending: Vec<EncodedChunk>,
}

impl NullEncoder {
    pub fn new() -> Self {
        Self {
            emit_records: true,
            ..Self::default()
        }
    }

    /// A variant that swallows every frame, producing zero output bytes.
    pub fn silent() -> Self {
        Self::default()
    }

    /// Frames pushed since `start`.
    pub fn frames_encoded(&self) -> u64 {
        self.frames
    }
}

#[async_trait]
impl Encoder for NullEncoder {
    fn container_ext(&self) -> &'static str {
        "bin"
    }

    fn start(&mut self, _resolution: Resolution, _fps: u32, _audio: Option<AudioTrack>) -> KilnResult<()> {
        if self.started {
            return Err(KilnError::encode("encoder already started"));
        }
        self.started = true;
        self.frames = 0;
        self.pending.clear();
        Ok(())
    }

    fn push_frame(&mut self, _rgba: &[u8], time_secs: f64) -> KilnResult<()> {
        if !self.started {
            return Err(KilnError::encode("encoder not started"));
        }
        self.frames += 1;
        if self.emit_records {
            let mut data = Vec::with_capacity(16);
            data.extend_from_slice(&self.frames.to_le_bytes());
            data.extend_from_slice(&time_secs.to_le_bytes());
            self.pending.push(EncodedChunk { data });
        }
        Ok(())
    }

    fn drain_chunks(&mut self) -> Vec<EncodedChunk> {
        std::mem::take(&mut self.pending)
    }

    async fn finish(&mut self) -> KilnResult<Vec<EncodedChunk>> {
        self.started = false;
        Ok(std::mem::take(&mut self.pending))
    }
}
