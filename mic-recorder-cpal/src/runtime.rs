//! cpal-backed audio graph runtime.
//!
//! Captures from the default input device in shared mode, pinned by name when
//! the context is created. The input stream is built and owned by a dedicated
//! capture thread, since `cpal::Stream` is not `Send` on every host. Blocks flow
//! input → gain → capture tap on cpal's callback thread.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, SampleRate, Stream, StreamConfig};
use parking_lot::Mutex;

use mic_recorder_core::models::error::AudioGraphError;
use mic_recorder_core::models::format::AudioFormatDescriptor;
use mic_recorder_core::processing::gain::GainStage;
use mic_recorder_core::traits::runtime::{AudioGraphRuntime, BlockCallback, NodeId};

/// How often the capture thread checks for shutdown.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Scratch space reserved per callback, in samples. Larger blocks grow it once.
const SCRATCH_SAMPLES: usize = 8192;

/// Audio graph runtime on top of the default cpal host.
pub struct CpalRuntime {
    last_stream_error: Arc<Mutex<Option<String>>>,
}

impl CpalRuntime {
    pub fn new() -> Self {
        Self {
            last_stream_error: Arc::new(Mutex::new(None)),
        }
    }

    /// Most recent error reported by a running input stream.
    pub fn last_stream_error(&self) -> Option<String> {
        self.last_stream_error.lock().clone()
    }
}

impl Default for CpalRuntime {
    fn default() -> Self {
        Self::new()
    }
}

enum CpalNode {
    Input,
    Gain(Arc<GainStage>),
    Capture(BlockCallback),
}

/// A configured input stream plus its node table.
pub struct CpalContext {
    device_name: String,
    config: StreamConfig,
    sample_format: SampleFormat,
    nodes: HashMap<NodeId, CpalNode>,
    /// `(dest, src)` pairs.
    edges: Vec<(NodeId, NodeId)>,
    next_id: u32,
    running: Arc<AtomicBool>,
    worker: Option<thread::JoinHandle<()>>,
}

impl CpalContext {
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn sample_format(&self) -> SampleFormat {
        self.sample_format
    }

    fn insert(&mut self, node: CpalNode) -> NodeId {
        self.next_id += 1;
        let id = NodeId(self.next_id);
        self.nodes.insert(id, node);
        id
    }

    fn source_of(&self, dest: NodeId) -> Option<NodeId> {
        self.edges.iter().find(|(d, _)| *d == dest).map(|(_, s)| *s)
    }

    /// Gain and capture tap of a fully connected input → gain → capture chain.
    fn render_chain(&self) -> Option<(Arc<GainStage>, BlockCallback)> {
        self.nodes.iter().find_map(|(id, node)| {
            let CpalNode::Capture(callback) = node else {
                return None;
            };
            let gain_id = self.source_of(*id)?;
            let CpalNode::Gain(gain) = self.nodes.get(&gain_id)? else {
                return None;
            };
            let input_id = self.source_of(gain_id)?;
            match self.nodes.get(&input_id)? {
                CpalNode::Input => Some((Arc::clone(gain), Arc::clone(callback))),
                _ => None,
            }
        })
    }

    fn stop_worker(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for CpalContext {
    fn drop(&mut self) {
        self.stop_worker();
    }
}

impl AudioGraphRuntime for CpalRuntime {
    type Context = CpalContext;

    fn create_realtime_context(
        &mut self,
        output: AudioFormatDescriptor,
        input: AudioFormatDescriptor,
    ) -> Result<CpalContext, AudioGraphError> {
        let device = cpal::default_host()
            .default_input_device()
            .ok_or(AudioGraphError::DeviceNotAvailable)?;
        let device_name = device
            .name()
            .map_err(|e| AudioGraphError::ContextFailed(format!("input device has no name: {}", e)))?;

        let rate = SampleRate(input.sample_rate);
        let supported = device
            .supported_input_configs()
            .map_err(|e| AudioGraphError::ContextFailed(e.to_string()))?;
        let chosen = supported
            .filter(|c| c.channels() == input.channel_count)
            .filter(|c| c.min_sample_rate() <= rate && rate <= c.max_sample_rate())
            .filter(|c| matches!(c.sample_format(), SampleFormat::F32 | SampleFormat::I16))
            .max_by_key(|c| c.sample_format() == SampleFormat::F32)
            .ok_or_else(|| AudioGraphError::UnsupportedFormat(format!("{} not supported by {}", input, device_name)))?;

        let sample_format = chosen.sample_format();
        let config: StreamConfig = chosen.with_sample_rate(rate).into();

        log::info!(
            "using input device '{}' ({}, {:?}); output {} is not rendered",
            device_name,
            input,
            sample_format,
            output
        );

        Ok(CpalContext {
            device_name,
            config,
            sample_format,
            nodes: HashMap::new(),
            edges: Vec::new(),
            next_id: 0,
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
        })
    }

    fn create_hardware_input_node(&mut self, context: &mut CpalContext) -> Result<NodeId, AudioGraphError> {
        let exists = context.nodes.values().any(|n| matches!(n, CpalNode::Input));
        if exists {
            return Err(AudioGraphError::NodeFailed("context already has an input node".into()));
        }
        Ok(context.insert(CpalNode::Input))
    }

    fn create_gain_node(&mut self, context: &mut CpalContext, gain: f32) -> Result<NodeId, AudioGraphError> {
        Ok(context.insert(CpalNode::Gain(Arc::new(GainStage::new(gain)))))
    }

    fn create_callback_node(
        &mut self,
        context: &mut CpalContext,
        channel_count: u16,
        callback: BlockCallback,
    ) -> Result<NodeId, AudioGraphError> {
        if channel_count != context.config.channels {
            return Err(AudioGraphError::NodeFailed(format!(
                "capture tap wants {} channels, stream has {}",
                channel_count, context.config.channels
            )));
        }
        Ok(context.insert(CpalNode::Capture(callback)))
    }

    fn connect(
        &mut self,
        context: &mut CpalContext,
        dest: NodeId,
        src: NodeId,
        dest_channel: u16,
        src_channel: u16,
    ) -> Result<(), AudioGraphError> {
        if !context.nodes.contains_key(&dest) || !context.nodes.contains_key(&src) {
            return Err(AudioGraphError::NodeFailed(format!(
                "cannot connect unknown node {:?} -> {:?}",
                src, dest
            )));
        }
        if dest_channel != 0 || src_channel != 0 {
            return Err(AudioGraphError::NodeFailed("only port 0 connections are supported".into()));
        }
        context.edges.retain(|(d, _)| *d != dest);
        context.edges.push((dest, src));
        Ok(())
    }

    fn resume(&mut self, context: &mut CpalContext) -> Result<(), AudioGraphError> {
        if context.worker.is_some() {
            return Ok(());
        }
        let (gain, callback) = context
            .render_chain()
            .ok_or_else(|| AudioGraphError::NodeFailed("capture chain is not connected".into()))?;

        context.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&context.running);
        let device_name = context.device_name.clone();
        let config = context.config.clone();
        let sample_format = context.sample_format;
        let errors = Arc::clone(&self.last_stream_error);
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);

        let handle = thread::Builder::new()
            .name("cpal-mic-capture".into())
            .spawn(move || {
                let stream = open_stream(&device_name, &config, sample_format, gain, callback, errors).and_then(|stream| {
                    stream
                        .play()
                        .map_err(|e| AudioGraphError::ContextFailed(format!("failed to start stream: {}", e)))?;
                    Ok(stream)
                });
                let stream = match stream {
                    Ok(stream) => {
                        let _ = ready_tx.send(Ok(()));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        running.store(false, Ordering::SeqCst);
                        return;
                    }
                };

                while running.load(Ordering::SeqCst) {
                    thread::sleep(POLL_INTERVAL);
                }
                drop(stream);
                log::debug!("input stream closed");
            })
            .map_err(|e| AudioGraphError::ContextFailed(format!("failed to spawn capture thread: {}", e)))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                context.worker = Some(handle);
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                context.running.store(false, Ordering::SeqCst);
                Err(AudioGraphError::ContextFailed("capture thread exited before starting".into()))
            }
        }
    }

    fn suspend(&mut self, context: &mut CpalContext) {
        context.stop_worker();
    }

    fn remove_node(&mut self, context: &mut CpalContext, node: NodeId) {
        context.nodes.remove(&node);
        context.edges.retain(|(d, s)| *d != node && *s != node);
    }

    fn release_context(&mut self, mut context: CpalContext) {
        context.stop_worker();
        log::debug!("released input context for '{}'", context.device_name);
    }
}

/// The input device named `name`, the one the context negotiated `config` with.
fn find_input_device(name: &str) -> Result<Device, AudioGraphError> {
    let mut devices = cpal::default_host()
        .input_devices()
        .map_err(|e| AudioGraphError::ContextFailed(e.to_string()))?;
    devices
        .find(|d| d.name().is_ok_and(|n| n == name))
        .ok_or(AudioGraphError::DeviceNotAvailable)
}

/// Open the context's input device with `config` and wire it to the chain.
///
/// Must run on the thread that will own the returned stream.
fn open_stream(
    device_name: &str,
    config: &StreamConfig,
    sample_format: SampleFormat,
    gain: Arc<GainStage>,
    callback: BlockCallback,
    errors: Arc<Mutex<Option<String>>>,
) -> Result<Stream, AudioGraphError> {
    let device = find_input_device(device_name)?;

    let on_error = move |err: cpal::StreamError| {
        log::error!("input stream error: {}", err);
        *errors.lock() = Some(err.to_string());
    };

    let mut scaled = Vec::with_capacity(SCRATCH_SAMPLES);
    let stream = match sample_format {
        SampleFormat::F32 => device.build_input_stream(
            config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                gain.process_into(data, &mut scaled);
                callback(&scaled);
            },
            on_error,
            None,
        ),
        SampleFormat::I16 => {
            let mut converted = Vec::with_capacity(SCRATCH_SAMPLES);
            device.build_input_stream(
                config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    converted.clear();
                    converted.extend(data.iter().map(|&s| i16_to_f32(s)));
                    gain.process_into(&converted, &mut scaled);
                    callback(&scaled);
                },
                on_error,
                None,
            )
        }
        other => {
            return Err(AudioGraphError::UnsupportedFormat(format!(
                "sample format {:?} not supported",
                other
            )))
        }
    };

    stream.map_err(|e| AudioGraphError::ContextFailed(format!("failed to build input stream: {}", e)))
}

fn i16_to_f32(sample: i16) -> f32 {
    sample as f32 / 32768.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn detached_context(channels: u16) -> CpalContext {
        CpalContext {
            device_name: "test".into(),
            config: StreamConfig {
                channels,
                sample_rate: SampleRate(44100),
                buffer_size: cpal::BufferSize::Default,
            },
            sample_format: SampleFormat::F32,
            nodes: HashMap::new(),
            edges: Vec::new(),
            next_id: 0,
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    fn noop_callback() -> BlockCallback {
        Arc::new(|_: &[f32]| {})
    }

    #[test]
    fn i16_conversion_range() {
        assert_eq!(i16_to_f32(0), 0.0);
        assert_eq!(i16_to_f32(i16::MIN), -1.0);
        assert!(i16_to_f32(i16::MAX) < 1.0);
    }

    #[test]
    fn chain_requires_full_wiring() {
        let mut runtime = CpalRuntime::new();
        let mut ctx = detached_context(1);

        let input = runtime.create_hardware_input_node(&mut ctx).unwrap();
        let gain = runtime.create_gain_node(&mut ctx, 0.5).unwrap();
        let capture = runtime.create_callback_node(&mut ctx, 1, noop_callback()).unwrap();
        assert!(ctx.render_chain().is_none());

        runtime.connect(&mut ctx, gain, input, 0, 0).unwrap();
        assert!(ctx.render_chain().is_none());

        runtime.connect(&mut ctx, capture, gain, 0, 0).unwrap();
        let (stage, _) = ctx.render_chain().unwrap();
        assert_eq!(stage.gain(), 0.5);

        runtime.remove_node(&mut ctx, gain);
        assert!(ctx.render_chain().is_none());
        assert!(ctx.edges.is_empty());
    }

    #[test]
    fn capture_tap_must_match_stream_channels() {
        let mut runtime = CpalRuntime::new();
        let mut ctx = detached_context(2);
        let err = runtime.create_callback_node(&mut ctx, 1, noop_callback()).unwrap_err();
        assert!(matches!(err, AudioGraphError::NodeFailed(_)));
    }

    #[test]
    fn resume_without_chain_fails() {
        let mut runtime = CpalRuntime::new();
        let mut ctx = detached_context(1);
        let err = runtime.resume(&mut ctx).unwrap_err();
        assert!(matches!(err, AudioGraphError::NodeFailed(_)));
        assert!(ctx.worker.is_none());
    }

    #[test]
    fn connect_rejects_unknown_nodes() {
        let mut runtime = CpalRuntime::new();
        let mut ctx = detached_context(1);
        let input = runtime.create_hardware_input_node(&mut ctx).unwrap();
        assert!(runtime.connect(&mut ctx, NodeId(99), input, 0, 0).is_err());
        assert!(runtime.create_hardware_input_node(&mut ctx).is_err());
    }

    #[test]
    fn capture_thread_never_falls_back_to_another_device() {
        let err = find_input_device("no such input device").err().unwrap();
        assert!(matches!(
            err,
            AudioGraphError::DeviceNotAvailable | AudioGraphError::ContextFailed(_)
        ));
    }

    #[test]
    #[ignore = "requires audio hardware"]
    fn captures_from_default_device() {
        let mut runtime = CpalRuntime::new();
        let format = AudioFormatDescriptor::mono(44100);
        let mut ctx = runtime
            .create_realtime_context(format.with_channels(2), format)
            .unwrap();

        let blocks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&blocks);
        let callback: BlockCallback = Arc::new(move |_: &[f32]| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let input = runtime.create_hardware_input_node(&mut ctx).unwrap();
        let gain = runtime.create_gain_node(&mut ctx, 1.0).unwrap();
        let capture = runtime.create_callback_node(&mut ctx, 1, callback).unwrap();
        runtime.connect(&mut ctx, gain, input, 0, 0).unwrap();
        runtime.connect(&mut ctx, capture, gain, 0, 0).unwrap();

        runtime.resume(&mut ctx).unwrap();
        thread::sleep(Duration::from_millis(500));
        runtime.suspend(&mut ctx);
        runtime.release_context(ctx);

        assert!(blocks.load(Ordering::SeqCst) > 0);
    }
}
