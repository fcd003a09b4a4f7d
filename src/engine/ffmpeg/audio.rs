use super::Shared;
use crate::Error;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig};
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Output is always interleaved stereo f32.
pub(crate) const CHANNELS: u16 = 2;

/// Fixed-size FIFO of interleaved samples between the decoder and the
/// output callback.
pub(crate) struct AudioRingBuffer {
    buffer: Vec<f32>,
    read_pos: usize,
    write_pos: usize,
    len: usize,
}

impl AudioRingBuffer {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![0.0; capacity],
            read_pos: 0,
            write_pos: 0,
            len: 0,
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.buffer.len()
    }

    pub(crate) fn free(&self) -> usize {
        self.capacity() - self.len
    }

    /// Copies as many samples as fit. Returns how many were taken.
    pub(crate) fn write(&mut self, samples: &[f32]) -> usize {
        let count = samples.len().min(self.free());
        for (i, sample) in samples[..count].iter().enumerate() {
            let at = (self.write_pos + i) % self.capacity();
            self.buffer[at] = *sample;
        }
        if count > 0 {
            self.write_pos = (self.write_pos + count) % self.capacity();
            self.len += count;
        }
        count
    }

    /// Fills `output`, padding with silence on underrun. Returns how many
    /// real samples were read.
    pub(crate) fn read(&mut self, output: &mut [f32]) -> usize {
        let count = self.len.min(output.len());
        for (i, slot) in output[..count].iter_mut().enumerate() {
            *slot = self.buffer[(self.read_pos + i) % self.capacity()];
        }
        output[count..].fill(0.0);
        if count > 0 {
            self.read_pos = (self.read_pos + count) % self.capacity();
            self.len -= count;
        }
        count
    }

    pub(crate) fn clear(&mut self) {
        self.read_pos = 0;
        self.write_pos = 0;
        self.len = 0;
    }
}

/// Opens the default output device. The stream is `!Send` on some hosts, so
/// it must stay on the thread that built it.
pub(crate) fn open_output(shared: Arc<Shared>) -> Result<(Stream, u32), Error> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| Error::Audio("no output device".to_string()))?;

    let supported = device
        .default_output_config()
        .map_err(|e| Error::Audio(e.to_string()))?;
    let sample_rate = supported.sample_rate();

    let config = StreamConfig {
        channels: CHANNELS,
        sample_rate,
        buffer_size: cpal::BufferSize::Default,
    };

    log::info!("Audio: {} Hz, {} channels", sample_rate, CHANNELS);

    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                if shared.is_paused.load(Ordering::Acquire) {
                    data.fill(0.0);
                    return;
                }

                let read = shared.audio_ring.lock().read(data);

                if shared.muted.load(Ordering::Acquire) {
                    data.fill(0.0);
                } else {
                    let volume = *shared.volume.lock();
                    if (volume - 1.0).abs() > 0.001 {
                        for sample in data.iter_mut() {
                            *sample = (*sample * volume).clamp(-1.0, 1.0);
                        }
                    }
                }

                shared.samples_played.fetch_add(read as u64, Ordering::AcqRel);
            },
            |err| log::error!("Audio stream error: {:?}", err),
            None,
        )
        .map_err(|e| Error::Audio(e.to_string()))?;

    stream.play().map_err(|e| Error::Audio(e.to_string()))?;

    Ok((stream, sample_rate))
}
