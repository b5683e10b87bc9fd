//! In-memory audio graph runtime for testing without hardware.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::error::AudioGraphError;
use crate::models::format::AudioFormatDescriptor;
use crate::processing::gain::apply_gain;
use crate::traits::runtime::{AudioGraphRuntime, BlockCallback, NodeId};

/// A runtime step that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// No input device: context creation fails.
    NoDevice,
    /// Context creation fails for a reason other than the device.
    Context,
    InputNode,
    GainNode,
    CallbackNode,
    Connect,
    Resume,
}

enum MockNode {
    Input,
    Gain(f32),
    Callback { callback: BlockCallback },
}

struct MockContextState {
    input: AudioFormatDescriptor,
    nodes: HashMap<NodeId, MockNode>,
    /// `(dest, src)` pairs.
    edges: Vec<(NodeId, NodeId)>,
    running: bool,
}

impl MockContextState {
    /// Gain along `input → gain → callback`, and the callback, for every complete path.
    fn render_targets(&self) -> Vec<(f32, BlockCallback)> {
        let mut targets = Vec::new();
        for (&input_id, node) in &self.nodes {
            if !matches!(node, MockNode::Input) {
                continue;
            }
            for &(gain_id, src) in &self.edges {
                if src != input_id {
                    continue;
                }
                let Some(MockNode::Gain(gain)) = self.nodes.get(&gain_id) else {
                    continue;
                };
                for &(sink_id, src) in &self.edges {
                    if src != gain_id {
                        continue;
                    }
                    if let Some(MockNode::Callback { callback }) = self.nodes.get(&sink_id) {
                        targets.push((*gain, Arc::clone(callback)));
                    }
                }
            }
        }
        targets
    }
}

#[derive(Default)]
struct MockShared {
    failure: Option<MockFailure>,
    supported_rates: Option<Vec<u32>>,
    max_input_channels: Option<u16>,
    next_id: u32,
    contexts: HashMap<u32, MockContextState>,
    contexts_created: usize,
    last_formats: Option<(AudioFormatDescriptor, AudioFormatDescriptor)>,
}

impl MockShared {
    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn check(&self, step: MockFailure) -> Result<(), AudioGraphError> {
        if self.failure != Some(step) {
            return Ok(());
        }
        Err(match step {
            MockFailure::NoDevice => AudioGraphError::DeviceNotAvailable,
            MockFailure::Context => AudioGraphError::ContextFailed("simulated context failure".into()),
            MockFailure::Resume => AudioGraphError::ContextFailed("simulated resume failure".into()),
            other => AudioGraphError::NodeFailed(format!("simulated {:?} failure", other)),
        })
    }

    fn context(&mut self, handle: &MockContext) -> Result<&mut MockContextState, AudioGraphError> {
        self.contexts
            .get_mut(&handle.id)
            .ok_or_else(|| AudioGraphError::ContextFailed(format!("unknown context {}", handle.id)))
    }
}

/// Handle to a context created by [`MockRuntime`].
#[derive(Debug)]
pub struct MockContext {
    id: u32,
}

/// Audio graph runtime that renders blocks pushed through [`MockHardware`].
///
/// # Example
///
/// ```
/// use mic_recorder_core::{MockRuntime, RecorderConfig, RecordingController};
///
/// let runtime = MockRuntime::new();
/// let hardware = runtime.hardware();
/// let mut recorder = RecordingController::new(runtime, RecorderConfig::default()).unwrap();
/// recorder.set_output_path(std::env::temp_dir().join("mock_runtime_doc.wav"));
///
/// recorder.start().unwrap();
/// hardware.push_block(&[0.0; 512]);
/// assert_eq!(recorder.buffered_samples(), 512);
///
/// let result = recorder.stop().unwrap().unwrap();
/// assert_eq!(result.bytes_written, 44 + 512 * 4);
/// ```
pub struct MockRuntime {
    shared: Arc<Mutex<MockShared>>,
}

impl MockRuntime {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Mutex::new(MockShared::default())),
        }
    }

    /// A runtime with no input device.
    pub fn unavailable() -> Self {
        let runtime = Self::new();
        runtime.hardware().fail_with(MockFailure::NoDevice);
        runtime
    }

    /// Test-side handle sharing this runtime's state.
    pub fn hardware(&self) -> MockHardware {
        MockHardware {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl Default for MockRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioGraphRuntime for MockRuntime {
    type Context = MockContext;

    fn create_realtime_context(
        &mut self,
        output: AudioFormatDescriptor,
        input: AudioFormatDescriptor,
    ) -> Result<MockContext, AudioGraphError> {
        let mut shared = self.shared.lock();
        shared.check(MockFailure::NoDevice)?;
        if let Some(rates) = &shared.supported_rates {
            if !rates.contains(&input.sample_rate) {
                return Err(AudioGraphError::UnsupportedFormat(format!(
                    "{} Hz not supported (available: {:?})",
                    input.sample_rate, rates
                )));
            }
        }
        if let Some(max) = shared.max_input_channels {
            if input.channel_count > max {
                return Err(AudioGraphError::UnsupportedFormat(format!(
                    "{} input channels requested, device has {}",
                    input.channel_count, max
                )));
            }
        }

        shared.contexts_created += 1;
        shared.check(MockFailure::Context)?;

        let id = shared.next_id();
        shared.contexts.insert(
            id,
            MockContextState {
                input,
                nodes: HashMap::new(),
                edges: Vec::new(),
                running: false,
            },
        );
        shared.last_formats = Some((output, input));
        Ok(MockContext { id })
    }

    fn create_hardware_input_node(&mut self, context: &mut MockContext) -> Result<NodeId, AudioGraphError> {
        let mut shared = self.shared.lock();
        shared.check(MockFailure::InputNode)?;
        let node = NodeId(shared.next_id());
        shared.context(context)?.nodes.insert(node, MockNode::Input);
        Ok(node)
    }

    fn create_gain_node(&mut self, context: &mut MockContext, gain: f32) -> Result<NodeId, AudioGraphError> {
        let mut shared = self.shared.lock();
        shared.check(MockFailure::GainNode)?;
        let node = NodeId(shared.next_id());
        shared.context(context)?.nodes.insert(node, MockNode::Gain(gain));
        Ok(node)
    }

    fn create_callback_node(
        &mut self,
        context: &mut MockContext,
        channel_count: u16,
        callback: BlockCallback,
    ) -> Result<NodeId, AudioGraphError> {
        let mut shared = self.shared.lock();
        shared.check(MockFailure::CallbackNode)?;
        let node = NodeId(shared.next_id());
        let state = shared.context(context)?;
        if channel_count != state.input.channel_count {
            return Err(AudioGraphError::NodeFailed(format!(
                "callback node wants {} channels, context input has {}",
                channel_count, state.input.channel_count
            )));
        }
        state.nodes.insert(node, MockNode::Callback { callback });
        Ok(node)
    }

    fn connect(
        &mut self,
        context: &mut MockContext,
        dest: NodeId,
        src: NodeId,
        _dest_channel: u16,
        _src_channel: u16,
    ) -> Result<(), AudioGraphError> {
        let mut shared = self.shared.lock();
        shared.check(MockFailure::Connect)?;
        let state = shared.context(context)?;
        if !state.nodes.contains_key(&dest) || !state.nodes.contains_key(&src) {
            return Err(AudioGraphError::NodeFailed(format!(
                "cannot connect {:?} -> {:?}: unknown node",
                src, dest
            )));
        }
        state.edges.push((dest, src));
        Ok(())
    }

    fn resume(&mut self, context: &mut MockContext) -> Result<(), AudioGraphError> {
        let mut shared = self.shared.lock();
        shared.check(MockFailure::Resume)?;
        shared.context(context)?.running = true;
        Ok(())
    }

    fn suspend(&mut self, context: &mut MockContext) {
        if let Ok(state) = self.shared.lock().context(context) {
            state.running = false;
        }
    }

    fn remove_node(&mut self, context: &mut MockContext, node: NodeId) {
        if let Ok(state) = self.shared.lock().context(context) {
            state.nodes.remove(&node);
            state.edges.retain(|&(dest, src)| dest != node && src != node);
        }
    }

    fn release_context(&mut self, context: MockContext) {
        self.shared.lock().contexts.remove(&context.id);
    }
}

/// Test-side view of a [`MockRuntime`]: feed audio and inspect resources.
#[derive(Clone)]
pub struct MockHardware {
    shared: Arc<Mutex<MockShared>>,
}

impl MockHardware {
    /// Render one block through every running context, as the driver thread would.
    ///
    /// Returns the number of capture callbacks invoked.
    pub fn push_block(&self, samples: &[f32]) -> usize {
        let targets: Vec<(f32, BlockCallback)> = {
            let shared = self.shared.lock();
            shared
                .contexts
                .values()
                .filter(|c| c.running)
                .flat_map(|c| c.render_targets())
                .collect()
        };

        let mut block = samples.to_vec();
        for (gain, callback) in &targets {
            block.copy_from_slice(samples);
            apply_gain(&mut block, *gain);
            callback(&block);
        }
        targets.len()
    }

    /// Push `total` samples of `value` in blocks of `block_len`.
    pub fn push_constant(&self, value: f32, total: usize, block_len: usize) {
        let block = vec![value; block_len.max(1)];
        let mut remaining = total;
        while remaining > 0 {
            let n = remaining.min(block.len());
            self.push_block(&block[..n]);
            remaining -= n;
        }
    }

    /// Make `step` fail on every subsequent attempt.
    pub fn fail_with(&self, step: MockFailure) {
        self.shared.lock().failure = Some(step);
    }

    pub fn clear_failure(&self) {
        self.shared.lock().failure = None;
    }

    /// Restrict input sample rates the "device" accepts.
    pub fn set_supported_rates(&self, rates: Vec<u32>) {
        self.shared.lock().supported_rates = Some(rates);
    }

    pub fn set_max_input_channels(&self, channels: u16) {
        self.shared.lock().max_input_channels = Some(channels);
    }

    pub fn live_contexts(&self) -> usize {
        self.shared.lock().contexts.len()
    }

    /// Nodes across all live contexts.
    pub fn live_nodes(&self) -> usize {
        self.shared.lock().contexts.values().map(|c| c.nodes.len()).sum()
    }

    pub fn is_running(&self) -> bool {
        self.shared.lock().contexts.values().any(|c| c.running)
    }

    /// Contexts that got past device and format checks, including ones that later failed.
    pub fn contexts_created(&self) -> usize {
        self.shared.lock().contexts_created
    }

    /// `(output, input)` formats of the most recent successful context.
    pub fn last_context_formats(&self) -> Option<(AudioFormatDescriptor, AudioFormatDescriptor)> {
        self.shared.lock().last_formats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_callback() -> (BlockCallback, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = Arc::clone(&count);
        let callback: BlockCallback = Arc::new(move |block: &[f32]| {
            inner.fetch_add(block.len(), Ordering::SeqCst);
        });
        (callback, count)
    }

    #[test]
    fn unconnected_graph_renders_nothing() {
        let mut runtime = MockRuntime::new();
        let hardware = runtime.hardware();
        let format = AudioFormatDescriptor::mono(16000);
        let mut ctx = runtime.create_realtime_context(format, format).unwrap();
        let (callback, count) = counting_callback();
        runtime.create_hardware_input_node(&mut ctx).unwrap();
        runtime.create_callback_node(&mut ctx, 1, callback).unwrap();
        runtime.resume(&mut ctx).unwrap();

        assert_eq!(hardware.push_block(&[0.0; 8]), 0);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn suspended_context_renders_nothing() {
        let mut runtime = MockRuntime::new();
        let hardware = runtime.hardware();
        let format = AudioFormatDescriptor::mono(16000);
        let mut ctx = runtime.create_realtime_context(format, format).unwrap();
        let (callback, count) = counting_callback();
        let input = runtime.create_hardware_input_node(&mut ctx).unwrap();
        let gain = runtime.create_gain_node(&mut ctx, 1.0).unwrap();
        let sink = runtime.create_callback_node(&mut ctx, 1, callback).unwrap();
        runtime.connect(&mut ctx, gain, input, 0, 0).unwrap();
        runtime.connect(&mut ctx, sink, gain, 0, 0).unwrap();

        assert_eq!(hardware.push_block(&[0.0; 8]), 0);
        runtime.resume(&mut ctx).unwrap();
        assert_eq!(hardware.push_block(&[0.0; 8]), 1);
        runtime.suspend(&mut ctx);
        assert_eq!(hardware.push_block(&[0.0; 8]), 0);
        assert_eq!(count.load(Ordering::SeqCst), 8);

        runtime.release_context(ctx);
        assert_eq!(hardware.live_contexts(), 0);
    }

    #[test]
    fn unsupported_rate_and_channels() {
        let mut runtime = MockRuntime::new();
        let hardware = runtime.hardware();
        hardware.set_supported_rates(vec![48000]);
        hardware.set_max_input_channels(1);

        let err = runtime
            .create_realtime_context(AudioFormatDescriptor::stereo(44100), AudioFormatDescriptor::mono(44100))
            .unwrap_err();
        assert!(matches!(err, AudioGraphError::UnsupportedFormat(_)));

        let err = runtime
            .create_realtime_context(AudioFormatDescriptor::stereo(48000), AudioFormatDescriptor::stereo(48000))
            .unwrap_err();
        assert!(matches!(err, AudioGraphError::UnsupportedFormat(_)));

        assert!(runtime
            .create_realtime_context(AudioFormatDescriptor::stereo(48000), AudioFormatDescriptor::mono(48000))
            .is_ok());
    }

    #[test]
    fn callback_channel_mismatch_rejected() {
        let mut runtime = MockRuntime::new();
        let format = AudioFormatDescriptor::mono(16000);
        let mut ctx = runtime.create_realtime_context(format, format).unwrap();
        let (callback, _) = counting_callback();
        assert!(runtime.create_callback_node(&mut ctx, 2, callback).is_err());
    }

    #[test]
    fn push_constant_splits_blocks() {
        let mut runtime = MockRuntime::new();
        let hardware = runtime.hardware();
        let format = AudioFormatDescriptor::mono(16000);
        let mut ctx = runtime.create_realtime_context(format, format).unwrap();
        let (callback, count) = counting_callback();
        let input = runtime.create_hardware_input_node(&mut ctx).unwrap();
        let gain = runtime.create_gain_node(&mut ctx, 1.0).unwrap();
        let sink = runtime.create_callback_node(&mut ctx, 1, callback).unwrap();
        runtime.connect(&mut ctx, gain, input, 0, 0).unwrap();
        runtime.connect(&mut ctx, sink, gain, 0, 0).unwrap();
        runtime.resume(&mut ctx).unwrap();

        hardware.push_constant(0.5, 1000, 256);
        assert_eq!(count.load(Ordering::SeqCst), 1000);
    }
}
