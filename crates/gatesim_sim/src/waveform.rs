//! Waveform recording of a running circuit.
//!
//! The [`WaveformRecorder`] trait abstracts waveform output. [`VcdRecorder`]
//! writes the IEEE 1364 Value Change Dump format, viewable in GTKWave,
//! Surfer, or any other VCD viewer. A [`Tracer`] watches the visible nodes
//! of a circuit and feeds their changes to a recorder once per tick.

use std::io::Write;

use gatesim_common::{InternalError, Value};
use gatesim_ir::{Circuit, Node, NodeId, NodeKind};

use crate::error::SimError;

/// Sink for value changes of named signals.
pub trait WaveformRecorder {
    /// Registers a signal for recording.
    fn register_signal(&mut self, id: NodeId, name: &str, width: u32) -> Result<(), SimError>;

    /// Opens a new scope (hierarchy level) in the waveform.
    fn begin_scope(&mut self, name: &str) -> Result<(), SimError>;

    /// Closes the current scope.
    fn end_scope(&mut self) -> Result<(), SimError>;

    /// Records a value change at the given time in milliseconds.
    fn record_change(&mut self, time_ms: u64, id: NodeId, value: &Value) -> Result<(), SimError>;

    /// Finalizes the waveform output.
    fn finalize(&mut self) -> Result<(), SimError>;
}

/// VCD recorder with a 1 ms timescale.
///
/// Signal identifiers use printable ASCII characters starting from `!`.
pub struct VcdRecorder<W: Write> {
    writer: W,
    id_map: Vec<(NodeId, String, u32)>,
    next_id: u32,
    header_written: bool,
    current_time: Option<u64>,
    dumpvars_open: bool,
}

impl<W: Write> VcdRecorder<W> {
    /// Creates a recorder writing to `writer`.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            id_map: Vec::new(),
            next_id: 0,
            header_written: false,
            current_time: None,
            dumpvars_open: false,
        }
    }

    /// Consumes the recorder, returning the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_header(&mut self) -> Result<(), SimError> {
        if self.header_written {
            return Ok(());
        }
        self.header_written = true;
        writeln!(self.writer, "$version")?;
        writeln!(self.writer, "  gatesim {}", env!("CARGO_PKG_VERSION"))?;
        writeln!(self.writer, "$end")?;
        writeln!(self.writer, "$timescale")?;
        writeln!(self.writer, "  1ms")?;
        writeln!(self.writer, "$end")?;
        Ok(())
    }

    /// Identifier code for the `index`-th signal; multi-character from 94 on.
    fn make_id_code(index: u32) -> String {
        let mut code = String::new();
        let mut idx = index;
        loop {
            code.push((b'!' + (idx % 94) as u8) as char);
            idx /= 94;
            if idx == 0 {
                break;
            }
            idx -= 1;
        }
        code
    }

    fn close_dumpvars(&mut self) -> Result<(), SimError> {
        if self.dumpvars_open {
            writeln!(self.writer, "$end")?;
            self.dumpvars_open = false;
        }
        Ok(())
    }

    /// `0`/`1` for scalars, `b` plus MSB-first digits for buses.
    fn format_value(value: &Value, width: u32) -> String {
        match value.normalise(width) {
            Value::Bit(b) => u8::from(b).to_string(),
            Value::Bus(bus) => format!("b{bus}"),
        }
    }
}

impl<W: Write> WaveformRecorder for VcdRecorder<W> {
    fn register_signal(&mut self, id: NodeId, name: &str, width: u32) -> Result<(), SimError> {
        self.write_header()?;
        let id_code = Self::make_id_code(self.next_id);
        self.next_id += 1;
        writeln!(self.writer, "$var wire {width} {id_code} {name} $end")?;
        self.id_map.push((id, id_code, width));
        Ok(())
    }

    fn begin_scope(&mut self, name: &str) -> Result<(), SimError> {
        self.write_header()?;
        writeln!(self.writer, "$scope module {name} $end")?;
        Ok(())
    }

    fn end_scope(&mut self) -> Result<(), SimError> {
        writeln!(self.writer, "$upscope $end")?;
        Ok(())
    }

    fn record_change(&mut self, time_ms: u64, id: NodeId, value: &Value) -> Result<(), SimError> {
        self.write_header()?;
        if self.current_time != Some(time_ms) {
            // Values at the first timestamp form the initial $dumpvars block.
            match self.current_time {
                None => {
                    writeln!(self.writer, "$enddefinitions $end")?;
                    writeln!(self.writer, "#{time_ms}")?;
                    writeln!(self.writer, "$dumpvars")?;
                    self.dumpvars_open = true;
                }
                Some(_) => {
                    self.close_dumpvars()?;
                    writeln!(self.writer, "#{time_ms}")?;
                }
            }
            self.current_time = Some(time_ms);
        }

        let (_, id_code, width) = self
            .id_map
            .iter()
            .find(|(sid, _, _)| *sid == id)
            .ok_or_else(|| InternalError::new(format!("unregistered VCD signal {id}")))?;

        let text = Self::format_value(value, *width);
        if *width == 1 {
            writeln!(self.writer, "{text}{id_code}")?;
        } else {
            writeln!(self.writer, "{text} {id_code}")?;
        }
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), SimError> {
        if self.current_time.is_none() {
            self.write_header()?;
            writeln!(self.writer, "$enddefinitions $end")?;
        }
        self.close_dumpvars()?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Whether a node has a user-visible state worth tracing.
fn is_visible(node: &Node) -> bool {
    matches!(
        node.kind,
        NodeKind::InputPin { .. }
            | NodeKind::Switch { .. }
            | NodeKind::OutputPin { .. }
            | NodeKind::Light { .. }
            | NodeKind::SevenSegment { .. }
            | NodeKind::Clock(_)
    )
}

fn trace_width(node: &Node) -> u32 {
    match node.kind {
        NodeKind::SevenSegment { .. } => 8,
        _ => node.pin_width(),
    }
}

/// VCD names may not contain whitespace.
fn signal_name(node: &Node, id: NodeId) -> String {
    let label: String = node
        .label
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect();
    let raw = id.as_raw();
    if label.is_empty() {
        format!("n{raw}")
    } else {
        format!("{label}_n{raw}")
    }
}

struct Probe {
    node: NodeId,
    last: Option<Value>,
}

/// Records the visible nodes of one circuit, tick by tick.
pub struct Tracer {
    recorder: Box<dyn WaveformRecorder>,
    probes: Vec<Probe>,
    tick_interval_ms: u64,
}

impl Tracer {
    /// Registers every visible node of `circuit` with `recorder` under a
    /// scope called `scope`.
    pub fn attach(
        circuit: &Circuit,
        mut recorder: Box<dyn WaveformRecorder>,
        scope: &str,
        tick_interval_ms: u64,
    ) -> Result<Self, SimError> {
        recorder.begin_scope(scope)?;
        let mut probes = Vec::new();
        for (id, node) in circuit.nodes().filter(|(_, n)| is_visible(n)) {
            recorder.register_signal(id, &signal_name(node, id), trace_width(node))?;
            probes.push(Probe { node: id, last: None });
        }
        recorder.end_scope()?;
        Ok(Self {
            recorder,
            probes,
            tick_interval_ms,
        })
    }

    /// Number of traced nodes.
    pub fn len(&self) -> usize {
        self.probes.len()
    }

    /// True if no node is traced.
    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }

    /// Records every traced value that changed since the last sample.
    /// Nodes removed from the circuit are no longer sampled.
    pub fn sample(&mut self, tick: u64, circuit: &Circuit) -> Result<(), SimError> {
        let time_ms = tick * self.tick_interval_ms;
        for probe in &mut self.probes {
            let Some(value) = circuit.node(probe.node).and_then(Node::display_value) else {
                continue;
            };
            if probe.last != Some(value) {
                self.recorder.record_change(time_ms, probe.node, &value)?;
                probe.last = Some(value);
            }
        }
        Ok(())
    }

    /// Flushes the recorder.
    pub fn finish(mut self) -> Result<(), SimError> {
        self.recorder.finalize()
    }
}
