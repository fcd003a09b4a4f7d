use super::audio::{self, CHANNELS};
use super::{Shared, StreamInfo, TimedFrame};
use crate::config::EngineOptions;
use crate::engine::{EngineSignal, Frame, SeekCompletion, SeekRequest};
use crate::status::{LoadStatus, TimeControlStatus};
use crate::Error;
use crossbeam_channel::Receiver;
use ffmpeg_next as ffmpeg;
use ffmpeg_next::format::{input, Pixel, Sample};
use ffmpeg_next::media::Type;
use ffmpeg_next::software::resampling::Context as ResampleContext;
use ffmpeg_next::software::scaling::{context::Context as ScaleContext, flag::Flags};
use ffmpeg_next::util::frame::audio::Audio as AudioFrame;
use ffmpeg_next::util::frame::video::Video as VideoFrame;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

/// Container-level seek positions are in `AV_TIME_BASE` units.
const AV_TIME_BASE: f64 = 1_000_000.0;
/// Below this many queued frames playback rebuffers.
const LOW_WATER: usize = 3;
const PRESENT_EARLY: f64 = 0.010;
const SKIP_LATE: f64 = 0.050;
const MAX_SKIPS: usize = 5;

pub(crate) enum DecoderCommand {
    Seek {
        request: SeekRequest,
        completion: SeekCompletion,
    },
    Stop,
}

impl DecoderCommand {
    /// Reports a command that will never run.
    pub(crate) fn fail(self) {
        if let DecoderCommand::Seek { completion, .. } = self {
            completion(false);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeResult {
    Video,
    Audio,
    Eos,
}

struct AudioTrack {
    index: usize,
    decoder: ffmpeg::decoder::Audio,
    resampler: ResampleContext,
    time_base: ffmpeg::Rational,
    // Dropping the stream stops output; it cannot leave this thread.
    _output: cpal::Stream,
}

struct Session {
    ictx: ffmpeg::format::context::Input,
    video: ffmpeg::decoder::Video,
    scaler: ScaleContext,
    video_index: usize,
    video_time_base: ffmpeg::Rational,
    audio: Option<AudioTrack>,
}

impl Session {
    fn open(path: &str, shared: &Arc<Shared>) -> Result<(Self, StreamInfo), Error> {
        let ictx = input(&path).map_err(|_| Error::Uri(path.to_string()))?;

        let (video_index, video_time_base, framerate, video_params) = {
            let stream = ictx.streams().best(Type::Video).ok_or(Error::Caps)?;
            let rate = stream.avg_frame_rate();
            let framerate = if rate.numerator() > 0 && rate.denominator() > 0 {
                rate.numerator() as f64 / rate.denominator() as f64
            } else {
                25.0
            };
            (stream.index(), stream.time_base(), framerate, stream.parameters())
        };

        if framerate.is_nan() || framerate.is_infinite() || framerate <= 0.0 {
            return Err(Error::Framerate(framerate));
        }

        let mut video = ffmpeg::codec::context::Context::from_parameters(video_params)
            .map_err(|_| Error::Caps)?
            .decoder()
            .video()
            .map_err(|_| Error::Cast)?;
        video.set_threading(ffmpeg::threading::Config {
            kind: ffmpeg::threading::Type::Frame,
            count: 0,
        });

        let scaler = ScaleContext::get(
            video.format(),
            video.width(),
            video.height(),
            Pixel::NV12,
            video.width(),
            video.height(),
            Flags::BILINEAR,
        )
        .map_err(|_| Error::Caps)?;

        let audio_stream = ictx
            .streams()
            .best(Type::Audio)
            .map(|stream| (stream.index(), stream.time_base(), stream.parameters()));
        let audio = match audio_stream {
            Some((index, time_base, params)) => {
                match Self::open_audio(index, time_base, params, shared) {
                    Ok(track) => Some(track),
                    Err(e) => {
                        log::warn!("Audio setup failed, playing video only: {}", e);
                        None
                    }
                }
            }
            None => None,
        };

        // Live and segmented streams report no container duration.
        let duration =
            (ictx.duration() > 0).then(|| Duration::from_micros(ictx.duration() as u64));

        let info = StreamInfo {
            width: video.width(),
            height: video.height(),
            duration,
        };

        log::info!(
            "Video: {}x{} @ {:.2}fps, {:.2}s, audio: {}",
            info.width,
            info.height,
            framerate,
            info.duration_seconds(),
            audio.is_some()
        );

        Ok((
            Self {
                ictx,
                video,
                scaler,
                video_index,
                video_time_base,
                audio,
            },
            info,
        ))
    }

    fn open_audio(
        index: usize,
        time_base: ffmpeg::Rational,
        params: ffmpeg::codec::Parameters,
        shared: &Arc<Shared>,
    ) -> Result<AudioTrack, Error> {
        let decoder = ffmpeg::codec::context::Context::from_parameters(params)
            .map_err(|_| Error::Caps)?
            .decoder()
            .audio()
            .map_err(|_| Error::Cast)?;

        let (output, sample_rate) = audio::open_output(Arc::clone(shared))?;

        let resampler = ResampleContext::get(
            decoder.format(),
            decoder.channel_layout(),
            decoder.rate(),
            Sample::F32(ffmpeg::format::sample::Type::Packed),
            ffmpeg::ChannelLayout::STEREO,
            sample_rate,
        )
        .map_err(|_| Error::Caps)?;

        shared.sample_rate.store(sample_rate, Ordering::Release);
        shared.has_audio.store(true, Ordering::Release);

        Ok(AudioTrack {
            index,
            decoder,
            resampler,
            time_base,
            _output: output,
        })
    }

    fn seek(&mut self, seconds: f64) -> Result<(), ffmpeg::Error> {
        let timestamp = (seconds * AV_TIME_BASE) as i64;
        self.ictx.seek(timestamp, ..timestamp)?;
        self.video.flush();
        if let Some(audio) = self.audio.as_mut() {
            audio.decoder.flush();
        }
        Ok(())
    }

    /// Demuxes one packet and queues whatever it decodes to. Output earlier
    /// than `not_before` is dropped.
    fn decode_next(&mut self, shared: &Shared, not_before: Duration) -> DecodeResult {
        let Some((stream, packet)) = self.ictx.packets().next() else {
            return DecodeResult::Eos;
        };
        let stream_index = stream.index();

        if stream_index == self.video_index {
            if let Err(e) = self.video.send_packet(&packet) {
                log::warn!("Send video packet error: {:?}", e);
                return DecodeResult::Video;
            }

            let mut decoded = VideoFrame::empty();
            while self.video.receive_frame(&mut decoded).is_ok() {
                let timestamp = to_duration(decoded.pts().unwrap_or(0), self.video_time_base);
                if timestamp < not_before {
                    continue;
                }

                let mut nv12 = VideoFrame::empty();
                if let Err(e) = self.scaler.run(&decoded, &mut nv12) {
                    log::error!("Scaling error: {:?}", e);
                    continue;
                }

                let frame = TimedFrame {
                    frame: pack_nv12(&nv12),
                    timestamp,
                };

                let mut buffer = shared.frame_buffer.lock();
                buffer.push_back(frame);
                while buffer.len() > shared.frame_buffer_capacity {
                    buffer.pop_front();
                }
            }
            return DecodeResult::Video;
        }

        if let Some(audio) = self.audio.as_mut().filter(|a| a.index == stream_index) {
            if let Err(e) = audio.decoder.send_packet(&packet) {
                log::warn!("Send audio packet error: {:?}", e);
                return DecodeResult::Audio;
            }

            let mut decoded = AudioFrame::empty();
            while audio.decoder.receive_frame(&mut decoded).is_ok() {
                if let Some(pts) = decoded.pts() {
                    if to_duration(pts, audio.time_base) < not_before {
                        continue;
                    }
                }

                let mut resampled = AudioFrame::empty();
                if let Err(e) = audio.resampler.run(&decoded, &mut resampled) {
                    log::error!("Resampling error: {:?}", e);
                    continue;
                }

                let count = resampled.samples() * CHANNELS as usize;
                let samples: Vec<f32> = resampled
                    .data(0)
                    .chunks_exact(4)
                    .take(count)
                    .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                    .collect();
                shared.audio_ring.lock().write(&samples);
            }
            return DecodeResult::Audio;
        }

        DecodeResult::Video
    }

    fn wants_more(&self, shared: &Shared) -> bool {
        let queued = shared.frame_buffer.lock().len();
        let audio_free = shared.audio_ring.lock().free();
        let rate = shared.sample_rate.load(Ordering::Acquire) as usize;
        queued < shared.frame_buffer_capacity * 3 / 4
            || (self.audio.is_some() && audio_free > rate / 2)
    }
}

fn to_duration(pts: i64, time_base: ffmpeg::Rational) -> Duration {
    let seconds = pts as f64 * time_base.numerator() as f64 / time_base.denominator() as f64;
    Duration::from_secs_f64(seconds.max(0.0))
}

/// Copies the planes of a scaled frame into a tightly packed NV12 buffer.
fn pack_nv12(frame: &VideoFrame) -> Frame {
    let width = frame.width() as usize;
    let height = frame.height() as usize;
    let mut data = Vec::with_capacity(width * height * 3 / 2);

    for (plane, rows) in [(0, height), (1, height / 2)] {
        let stride = frame.stride(plane);
        let bytes = frame.data(plane);
        for row in 0..rows {
            let start = row * stride;
            data.extend_from_slice(&bytes[start..start + width]);
        }
    }

    Frame {
        data: data.into(),
        width: width as u32,
        height: height as u32,
    }
}

/// Presents the front frame if it is due and drops frames that fell too far
/// behind `clock`. `draining` disables the low-buffer shortcut at end of
/// stream.
fn present_due(shared: &Shared, clock: Duration, draining: bool) -> bool {
    let mut buffer = shared.frame_buffer.lock();
    let Some(next) = buffer.front() else {
        return false;
    };

    let lead = next.timestamp.as_secs_f64() - clock.as_secs_f64();
    if lead > PRESENT_EARLY && (draining || buffer.len() > LOW_WATER) {
        return false;
    }
    let Some(presented) = buffer.pop_front() else {
        return false;
    };

    let mut skipped = 0;
    while skipped < MAX_SKIPS && buffer.len() > LOW_WATER {
        let late = buffer
            .front()
            .map_or(0.0, |f| clock.as_secs_f64() - f.timestamp.as_secs_f64());
        if late <= SKIP_LATE {
            break;
        }
        buffer.pop_front();
        skipped += 1;
        log::warn!(
            "Skipped late frame ({:.1}ms behind), {} remaining",
            late * 1000.0,
            buffer.len()
        );
    }
    drop(buffer);

    *shared.frame.lock() = Some(presented.frame);
    true
}

fn show_front(shared: &Shared) {
    if let Some(front) = shared.frame_buffer.lock().front() {
        *shared.frame.lock() = Some(front.frame.clone());
    }
}

pub(crate) fn run(
    path: String,
    shared: Arc<Shared>,
    commands: Receiver<DecoderCommand>,
    options: EngineOptions,
) {
    let (mut session, info) = match Session::open(&path, &shared) {
        Ok(opened) => opened,
        Err(e) => {
            log::error!("Failed to load {}: {}", path, e);
            shared.emit(EngineSignal::LoadStatus(LoadStatus::Failed));
            for command in commands.iter() {
                match command {
                    DecoderCommand::Stop => break,
                    other => other.fail(),
                }
            }
            return;
        }
    };

    *shared.info.lock() = Some(info);
    shared.emit(EngineSignal::LoadStatus(LoadStatus::ReadyToPlay));
    shared.emit(EngineSignal::DurationChanged(info.duration_seconds()));

    let prebuffer = options.prebuffer_frames();
    let mut pending_seek: Option<SeekCompletion> = None;
    let mut not_before = Duration::ZERO;
    let mut frames_presented = 0u64;

    log::info!("Decoder loop started");

    while shared.alive.load(Ordering::Acquire) {
        while let Ok(command) = commands.try_recv() {
            match command {
                DecoderCommand::Seek {
                    request,
                    completion,
                } => {
                    if let Some(superseded) = pending_seek.take() {
                        superseded(false);
                    }
                    let target = request.target.max(0.0).min(info.duration_seconds());
                    log::info!("Seeking to {:.2}s", target);
                    match session.seek(target) {
                        Ok(()) => {
                            shared.reset_to(Duration::from_secs_f64(target));
                            not_before =
                                Duration::from_secs_f64((target - request.tolerance_before).max(0.0));
                            shared.buffering.store(true, Ordering::Release);
                            shared.clock.lock().restart(false);
                            pending_seek = Some(completion);
                        }
                        Err(e) => {
                            log::error!("Seek failed: {:?}", e);
                            completion(false);
                        }
                    }
                }
                DecoderCommand::Stop => {
                    log::info!("Stopping decoder");
                    if let Some(completion) = pending_seek.take() {
                        completion(false);
                    }
                    return;
                }
            }
        }

        let paused = shared.is_paused.load(Ordering::Acquire);
        let eos = shared.is_eos.load(Ordering::Acquire);

        if shared.buffering.load(Ordering::Acquire) {
            let queued = shared.frame_buffer.lock().len();
            if queued >= prebuffer || eos {
                log::info!("Buffering done ({} frames)", queued);
                shared.buffering.store(false, Ordering::Release);
                show_front(&shared);
                shared.clock.lock().restart(!paused);
                if let Some(completion) = pending_seek.take() {
                    completion(true);
                    shared.emit_position();
                }
                if !paused {
                    shared.set_time_control(TimeControlStatus::Playing);
                }
                continue;
            }

            for _ in 0..5 {
                if session.decode_next(&shared, not_before) == DecodeResult::Eos {
                    shared.is_eos.store(true, Ordering::Release);
                    break;
                }
            }
            std::thread::sleep(Duration::from_millis(5));
            continue;
        }

        if eos
            && shared.frame_buffer.lock().is_empty()
            && !shared.finished.swap(true, Ordering::AcqRel)
        {
            log::info!("End of stream after {} frames", frames_presented);
            shared.is_paused.store(true, Ordering::Release);
            shared.clock.lock().pause();
            shared.set_time_control(TimeControlStatus::Paused);
            shared.emit_position();
        }

        if paused || shared.finished.load(Ordering::Acquire) {
            std::thread::sleep(Duration::from_millis(16));
            continue;
        }

        let queued = shared.frame_buffer.lock().len();
        if !eos && queued < LOW_WATER {
            log::warn!("Buffer critically low ({} frames), rebuffering", queued);
            shared.buffering.store(true, Ordering::Release);
            shared.clock.lock().restart(false);
            shared.set_time_control(TimeControlStatus::WaitingToPlay);
            continue;
        }

        if present_due(&shared, shared.position(), eos) {
            frames_presented += 1;
            if frames_presented % 100 == 0 {
                log::debug!("Presented {} frames", frames_presented);
            }
        }

        if !eos && session.wants_more(&shared) {
            if session.decode_next(&shared, not_before) == DecodeResult::Eos {
                shared.is_eos.store(true, Ordering::Release);
            }
        }

        std::thread::sleep(Duration::from_millis(1));
    }

    if let Some(completion) = pending_seek.take() {
        completion(false);
    }
}
