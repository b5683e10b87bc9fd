use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::models::diagnostics::CaptureDiagnostics;
use crate::models::error::AudioGraphError;
use crate::models::format::AudioFormatDescriptor;
use crate::traits::log_sink::LogSink;
use crate::traits::runtime::{AudioGraphRuntime, BlockCallback, NodeId};

/// What a [`BlockSink`] did with one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockOutcome {
    Captured,
    /// Not recording; the block was ignored.
    Skipped,
    /// The block could not be stored.
    Dropped,
}

/// Per-block consumer supplied to [`AudioGraph::initialize`].
///
/// Runs on the real-time thread with the same constraints as [`BlockCallback`].
pub type BlockSink = Arc<dyn Fn(&[f32]) -> BlockOutcome + Send + Sync + 'static>;

#[derive(Debug, Default)]
struct CallbackCounters {
    received: AtomicU64,
    captured: AtomicU64,
    skipped: AtomicU64,
    dropped: AtomicU64,
    samples: AtomicU64,
}

impl CallbackCounters {
    fn reset(&self) {
        for counter in [&self.received, &self.captured, &self.skipped, &self.dropped, &self.samples] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// Nodes and context of one initialized session.
struct LiveGraph<C> {
    context: C,
    input: NodeId,
    gain: NodeId,
    capture: NodeId,
    /// Closed before teardown so late callbacks become no-ops.
    gate: Arc<AtomicBool>,
    format: AudioFormatDescriptor,
}

/// Capture chain `hardware input → gain → capture tap` inside a runtime context.
///
/// ```text
/// [Mic] → [Gain] → [Capture tap] → BlockSink (real-time thread)
/// ```
///
/// Resources exist only between [`initialize`](Self::initialize) and
/// [`teardown`](Self::teardown); dropping the graph tears it down.
pub struct AudioGraph<R: AudioGraphRuntime> {
    runtime: R,
    output_channels: u16,
    gain: f32,
    live: Option<LiveGraph<R::Context>>,
    counters: Arc<CallbackCounters>,
    log: Arc<dyn LogSink>,
}

impl<R: AudioGraphRuntime> AudioGraph<R> {
    pub fn new(runtime: R, output_channels: u16, gain: f32, log: Arc<dyn LogSink>) -> Self {
        Self {
            runtime,
            output_channels,
            gain,
            live: None,
            counters: Arc::new(CallbackCounters::default()),
            log,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.live.is_some()
    }

    /// Format of the live session, if any.
    pub fn format(&self) -> Option<AudioFormatDescriptor> {
        self.live.as_ref().map(|live| live.format)
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    /// Build and start the chain, forwarding every rendered block to `sink`.
    ///
    /// On failure nothing created by this call is left behind.
    pub fn initialize(&mut self, format: AudioFormatDescriptor, sink: BlockSink) -> Result<(), AudioGraphError> {
        if self.live.is_some() {
            self.log.warn("audio graph already initialized, rebuilding");
            self.teardown();
        }

        let output = format.with_channels(self.output_channels);
        if let Err(reason) = format.validate().and_then(|()| output.validate()) {
            self.log.error(&format!("unsupported capture format {}: {}", format, reason));
            return Err(AudioGraphError::UnsupportedFormat(reason));
        }

        let mut context = self
            .runtime
            .create_realtime_context(output, format)
            .inspect_err(|e| self.log.error(&format!("failed to create audio context: {}", e)))?;

        self.counters.reset();
        let gate = Arc::new(AtomicBool::new(true));
        let callback = capture_callback(format.channel_count, sink, Arc::clone(&gate), Arc::clone(&self.counters));

        let mut created = Vec::with_capacity(3);
        let built = self.build_chain(&mut context, format.channel_count, callback, &mut created);
        let (input, gain, capture) = match built {
            Ok(nodes) => nodes,
            Err(e) => {
                gate.store(false, Ordering::Release);
                self.discard(context, &created);
                self.log.error(&format!("failed to build capture graph: {}", e));
                return Err(e);
            }
        };

        if let Err(e) = self.runtime.resume(&mut context) {
            gate.store(false, Ordering::Release);
            self.runtime.suspend(&mut context);
            self.discard(context, &created);
            self.log.error(&format!("failed to start audio context: {}", e));
            return Err(e);
        }

        self.live = Some(LiveGraph {
            context,
            input,
            gain,
            capture,
            gate,
            format,
        });
        self.log.debug(&format!(
            "capture graph running: input {} -> output {} ch, gain {}",
            format, self.output_channels, self.gain
        ));
        Ok(())
    }

    /// Stop rendering and release every node and the context. Idempotent.
    pub fn teardown(&mut self) {
        let Some(mut live) = self.live.take() else {
            return;
        };

        live.gate.store(false, Ordering::Release);
        self.runtime.suspend(&mut live.context);
        // Capture node first: its callback must be deregistered before anything else goes.
        self.discard(live.context, &[live.input, live.gain, live.capture]);
        self.log.debug("capture graph torn down");
    }

    /// Snapshot of the capture callback counters for the current or last session.
    pub fn diagnostics(&self) -> CaptureDiagnostics {
        let c = &self.counters;
        CaptureDiagnostics {
            blocks_received: c.received.load(Ordering::Relaxed),
            blocks_captured: c.captured.load(Ordering::Relaxed),
            blocks_skipped: c.skipped.load(Ordering::Relaxed),
            blocks_dropped: c.dropped.load(Ordering::Relaxed),
            samples_captured: c.samples.load(Ordering::Relaxed),
            overflowed_samples: 0,
        }
    }

    fn build_chain(
        &mut self,
        context: &mut R::Context,
        channels: u16,
        callback: BlockCallback,
        created: &mut Vec<NodeId>,
    ) -> Result<(NodeId, NodeId, NodeId), AudioGraphError> {
        let input = self.runtime.create_hardware_input_node(context)?;
        created.push(input);
        let gain = self.runtime.create_gain_node(context, self.gain)?;
        created.push(gain);
        let capture = self.runtime.create_callback_node(context, channels, callback)?;
        created.push(capture);

        self.runtime.connect(context, gain, input, 0, 0)?;
        self.runtime.connect(context, capture, gain, 0, 0)?;
        Ok((input, gain, capture))
    }

    /// Remove `nodes` newest-first, then release the context.
    fn discard(&mut self, mut context: R::Context, nodes: &[NodeId]) {
        for &node in nodes.iter().rev() {
            self.runtime.remove_node(&mut context, node);
        }
        self.runtime.release_context(context);
    }
}

impl<R: AudioGraphRuntime> Drop for AudioGraph<R> {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Real-time side of the capture tap.
fn capture_callback(
    channels: u16,
    sink: BlockSink,
    gate: Arc<AtomicBool>,
    counters: Arc<CallbackCounters>,
) -> BlockCallback {
    let channels = channels.max(1) as usize;
    Arc::new(move |block: &[f32]| {
        if !gate.load(Ordering::Acquire) {
            return;
        }
        counters.received.fetch_add(1, Ordering::Relaxed);

        // A partial frame would shift every later channel.
        if block.len() % channels != 0 {
            counters.dropped.fetch_add(1, Ordering::Relaxed);
            return;
        }

        match sink(block) {
            BlockOutcome::Captured => {
                counters.captured.fetch_add(1, Ordering::Relaxed);
                counters.samples.fetch_add(block.len() as u64, Ordering::Relaxed);
            }
            BlockOutcome::Skipped => {
                counters.skipped.fetch_add(1, Ordering::Relaxed);
            }
            BlockOutcome::Dropped => {
                counters.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    })
}
