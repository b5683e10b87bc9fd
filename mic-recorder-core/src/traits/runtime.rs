use std::sync::Arc;

use crate::models::error::AudioGraphError;
use crate::models::format::AudioFormatDescriptor;

/// Opaque handle to a node inside a runtime context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

/// Callback invoked with each rendered block.
///
/// Parameters:
/// - `samples`: Interleaved f32 samples in the context's input format, after the gain stage.
///
/// Runs on the runtime's real-time thread. Implementations must not block,
/// allocate without bound, or panic.
pub type BlockCallback = Arc<dyn Fn(&[f32]) + Send + Sync + 'static>;

/// The audio-graph engine a recorder runs on.
///
/// The runtime owns sample-rate conversion, hardware access and node
/// scheduling. Implemented by:
/// - `MockRuntime` (in this crate, hardware-free)
/// - `CpalRuntime` (`mic-recorder-cpal`)
pub trait AudioGraphRuntime: Send {
    /// A live processing context. Nodes belong to exactly one context.
    type Context: Send;

    /// Request a real-time context with the input device enabled.
    ///
    /// `output` and `input` may differ in channel count.
    fn create_realtime_context(
        &mut self,
        output: AudioFormatDescriptor,
        input: AudioFormatDescriptor,
    ) -> Result<Self::Context, AudioGraphError>;

    /// The node producing microphone samples.
    fn create_hardware_input_node(&mut self, context: &mut Self::Context) -> Result<NodeId, AudioGraphError>;

    /// A node scaling every sample by `gain`.
    fn create_gain_node(&mut self, context: &mut Self::Context, gain: f32) -> Result<NodeId, AudioGraphError>;

    /// A sink node invoking `callback` once per block with `channel_count` interleaved channels.
    fn create_callback_node(
        &mut self,
        context: &mut Self::Context,
        channel_count: u16,
        callback: BlockCallback,
    ) -> Result<NodeId, AudioGraphError>;

    /// Route `src`'s output `src_channel` into `dest`'s input `dest_channel`.
    fn connect(
        &mut self,
        context: &mut Self::Context,
        dest: NodeId,
        src: NodeId,
        dest_channel: u16,
        src_channel: u16,
    ) -> Result<(), AudioGraphError>;

    /// Start rendering.
    fn resume(&mut self, context: &mut Self::Context) -> Result<(), AudioGraphError>;

    /// Stop rendering. After this returns no callback is running or will run.
    fn suspend(&mut self, context: &mut Self::Context);

    /// Disconnect and drop a node, releasing any callback it holds.
    fn remove_node(&mut self, context: &mut Self::Context, node: NodeId);

    /// Release the context and everything still attached to it.
    fn release_context(&mut self, context: Self::Context);
}
