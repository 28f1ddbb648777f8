//! Interactive REPL for poking at a circuit.
//!
//! [`InteractiveSim`] wraps a circuit and a [`Scheduler`] with a small
//! command language: step ticks, drive inputs, flip switches, retune
//! clocks, and inspect display values or nets between ticks.
//!
//! # Usage
//!
//! ```ignore
//! use gatesim_sim::interactive::InteractiveSim;
//!
//! let mut isim = InteractiveSim::new(circuit, limits);
//! isim.run_repl(&mut std::io::stdin().lock(), &mut std::io::stdout())?;
//! ```

use std::fmt::Write as _;
use std::io::{BufRead, Write};

use gatesim_common::Value;
use gatesim_config::EngineLimits;
use gatesim_ir::{Circuit, Node, NodeKind};

use crate::error::SimError;
use crate::file::{drive_node, resolve_node};
use crate::netlist::Netlist;
use crate::scheduler::{Scheduler, TickOutcome};

/// What to do to an oscillator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClockAction {
    /// Raise the frequency one step.
    Faster,
    /// Lower the frequency one step.
    Slower,
    /// Start or stop the oscillator.
    Toggle,
}

/// A command parsed from user input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SimCommand {
    /// Evaluate one tick and report how it settled.
    Step,
    /// Evaluate a number of ticks.
    Run {
        /// Number of ticks.
        ticks: u64,
    },
    /// Drive an input pin or switch.
    Set {
        /// Node label or handle.
        node: String,
        /// Value literal.
        value: String,
    },
    /// Flip a switch or a 1-bit input pin.
    Toggle {
        /// Node label or handle.
        node: String,
    },
    /// Retune or start/stop an oscillator.
    Clock {
        /// Node label or handle.
        node: String,
        /// What to change.
        action: ClockAction,
    },
    /// Show the display value of one or more nodes.
    Inspect {
        /// Node labels or handles.
        nodes: Vec<String>,
    },
    /// Add a node to the watch list.
    Watch {
        /// Node label or handle.
        node: String,
    },
    /// Remove a node from the watch list.
    Unwatch {
        /// Node label or handle.
        node: String,
    },
    /// List all nodes.
    Nodes,
    /// List all nets.
    Nets,
    /// Show session status.
    Status,
    /// Display help text.
    Help,
    /// Quit the session.
    Quit,
}

/// Result of executing a command.
#[derive(Clone, Debug)]
pub enum CommandResult {
    /// Command produced text output.
    Output(String),
    /// The session should end.
    Quit,
}

/// A circuit under interactive control.
pub struct InteractiveSim {
    circuit: Circuit,
    scheduler: Scheduler,
    watches: Vec<String>,
    history: Vec<String>,
}

impl InteractiveSim {
    /// Wraps a circuit. Nothing is evaluated until the first step.
    pub fn new(circuit: Circuit, limits: EngineLimits) -> Self {
        Self {
            circuit,
            scheduler: Scheduler::new(limits),
            watches: Vec::new(),
            history: Vec::new(),
        }
    }

    /// The circuit in its current state.
    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }

    /// Commands entered so far, oldest first.
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Executes a single command.
    pub fn execute(&mut self, cmd: &SimCommand) -> Result<CommandResult, SimError> {
        match cmd {
            SimCommand::Step => Ok(self.cmd_step()),
            SimCommand::Run { ticks } => Ok(self.cmd_run(*ticks)),
            SimCommand::Set { node, value } => self.cmd_set(node, value),
            SimCommand::Toggle { node } => self.cmd_toggle(node),
            SimCommand::Clock { node, action } => self.cmd_clock(node, *action),
            SimCommand::Inspect { nodes } => Ok(self.cmd_inspect(nodes)),
            SimCommand::Watch { node } => self.cmd_watch(node),
            SimCommand::Unwatch { node } => Ok(self.cmd_unwatch(node)),
            SimCommand::Nodes => Ok(self.cmd_nodes()),
            SimCommand::Nets => Ok(CommandResult::Output(render_nets(
                &Netlist::build(&self.circuit),
                &self.circuit,
            ))),
            SimCommand::Status => Ok(self.cmd_status()),
            SimCommand::Help => Ok(CommandResult::Output(help_text())),
            SimCommand::Quit => Ok(CommandResult::Quit),
        }
    }

    /// Runs the REPL loop, reading commands from `input` and writing to
    /// `output` until `quit` or end of input.
    pub fn run_repl<R: BufRead, W: Write>(
        &mut self,
        input: &mut R,
        output: &mut W,
    ) -> Result<(), SimError> {
        writeln!(output, "gatesim interactive")?;
        writeln!(output, "Type 'help' for available commands.")?;
        writeln!(
            output,
            "{} node(s), {} wire(s)",
            self.circuit.node_count(),
            self.circuit.wire_count()
        )?;
        writeln!(output)?;

        let mut line = String::new();
        loop {
            write!(output, "gatesim> ")?;
            output.flush()?;

            line.clear();
            if input.read_line(&mut line)? == 0 {
                break;
            }
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            self.history.push(trimmed.to_string());

            let cmd = match parse_command(trimmed) {
                Ok(cmd) => cmd,
                Err(err) => {
                    writeln!(output, "Error: {err}")?;
                    continue;
                }
            };
            match self.execute(&cmd) {
                Ok(CommandResult::Output(text)) => {
                    writeln!(output, "{text}")?;
                    self.print_watches(output)?;
                }
                Ok(CommandResult::Quit) => {
                    writeln!(output, "Goodbye.")?;
                    break;
                }
                Err(err @ (SimError::UnknownNode(_) | SimError::InvalidDrive { .. })) => {
                    writeln!(output, "Error: {err}")?;
                }
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    fn print_watches<W: Write>(&self, output: &mut W) -> Result<(), SimError> {
        for name in &self.watches {
            if let Some(value) = self.display(name) {
                writeln!(output, "  [watch] {name} = {}", format_value(&value))?;
            }
        }
        Ok(())
    }

    fn display(&self, name: &str) -> Option<Value> {
        let id = resolve_node(&self.circuit, name).ok()?;
        self.circuit.node(id).and_then(Node::display_value)
    }

    fn cmd_step(&mut self) -> CommandResult {
        let text = match self.scheduler.step(&mut self.circuit) {
            TickOutcome::Skipped => "Tick skipped".to_string(),
            TickOutcome::Settled { changed, passes } => format!(
                "Tick {}: {} after {passes} pass(es)",
                self.scheduler.ticks(),
                if changed { "changed" } else { "stable" }
            ),
            TickOutcome::Faulted(err) => format!("Tick abandoned: {err}"),
        };
        CommandResult::Output(text)
    }

    fn cmd_run(&mut self, ticks: u64) -> CommandResult {
        let changed = self.scheduler.run_ticks(&mut self.circuit, ticks);
        CommandResult::Output(format!(
            "Ran {ticks} tick(s), {changed} with changes; now at tick {}",
            self.scheduler.ticks()
        ))
    }

    fn cmd_set(&mut self, name: &str, literal: &str) -> Result<CommandResult, SimError> {
        let id = resolve_node(&self.circuit, name)?;
        let value = drive_node(&mut self.circuit, id, name, literal)?;
        Ok(CommandResult::Output(format!(
            "{name} <- {}",
            format_value(&value)
        )))
    }

    fn cmd_toggle(&mut self, name: &str) -> Result<CommandResult, SimError> {
        let id = resolve_node(&self.circuit, name)?;
        let not_toggleable = || SimError::InvalidDrive {
            node: name.to_string(),
            value: "toggle".to_string(),
            reason: "only switches and 1-bit input pins can be toggled".to_string(),
        };
        let node = self
            .circuit
            .node_mut(id)
            .ok_or_else(|| SimError::UnknownNode(name.to_string()))?;
        let flipped = match &node.kind {
            NodeKind::Switch { on } => !*on,
            NodeKind::InputPin { state, .. } if node.pin_width() == 1 => !state.to_bool(),
            _ => return Err(not_toggleable()),
        };
        node.drive(Value::Bit(flipped));
        Ok(CommandResult::Output(format!(
            "{name} <- {}",
            u8::from(flipped)
        )))
    }

    fn cmd_clock(&mut self, name: &str, action: ClockAction) -> Result<CommandResult, SimError> {
        let id = resolve_node(&self.circuit, name)?;
        let Some(NodeKind::Clock(osc)) = self.circuit.node_mut(id).map(|n| &mut n.kind) else {
            return Err(SimError::InvalidDrive {
                node: name.to_string(),
                value: "clock".to_string(),
                reason: "not an oscillator".to_string(),
            });
        };
        match action {
            ClockAction::Faster => osc.faster(),
            ClockAction::Slower => osc.slower(),
            ClockAction::Toggle => osc.toggle_running(),
        }
        Ok(CommandResult::Output(format!(
            "{name}: {} ({})",
            osc.frequency,
            if osc.running { "running" } else { "stopped" }
        )))
    }

    fn cmd_inspect(&self, names: &[String]) -> CommandResult {
        let mut out = String::new();
        for name in names {
            match self.display(name) {
                Some(value) => {
                    let _ = writeln!(out, "{name} = {}", format_value(&value));
                }
                None => {
                    let _ = writeln!(out, "No value for '{name}'");
                }
            }
        }
        CommandResult::Output(out.trim_end().to_string())
    }

    fn cmd_watch(&mut self, name: &str) -> Result<CommandResult, SimError> {
        resolve_node(&self.circuit, name)?;
        if !self.watches.iter().any(|w| w == name) {
            self.watches.push(name.to_string());
        }
        Ok(CommandResult::Output(format!("Watching '{name}'")))
    }

    fn cmd_unwatch(&mut self, name: &str) -> CommandResult {
        let before = self.watches.len();
        self.watches.retain(|w| w != name);
        if self.watches.len() < before {
            CommandResult::Output(format!("Unwatched '{name}'"))
        } else {
            CommandResult::Output(format!("'{name}' was not being watched"))
        }
    }

    fn cmd_nodes(&self) -> CommandResult {
        if self.circuit.node_count() == 0 {
            return CommandResult::Output("No nodes".to_string());
        }
        let mut out = format!("{} node(s):\n", self.circuit.node_count());
        for (id, node) in self.circuit.nodes() {
            let _ = write!(out, "  {:>4}  {:<12} {}", id.as_raw(), kind_name(node), node.label);
            if let Some(value) = node.display_value() {
                let _ = write!(out, " = {}", format_value(&value));
            }
            out.push('\n');
        }
        CommandResult::Output(out.trim_end().to_string())
    }

    fn cmd_status(&self) -> CommandResult {
        let limits = self.scheduler.limits();
        let mut out = String::new();
        let _ = writeln!(out, "Ticks: {}", self.scheduler.ticks());
        let _ = writeln!(out, "Nodes: {}", self.circuit.node_count());
        let _ = writeln!(out, "Wires: {}", self.circuit.wire_count());
        let _ = writeln!(out, "Tick interval: {} ms", limits.tick_interval_ms);
        let _ = writeln!(
            out,
            "Limits: {} passes, depth {}",
            limits.max_passes, limits.max_depth
        );
        let _ = write!(out, "Watches: {}", self.watches.len());
        CommandResult::Output(out)
    }
}

/// Type name of a node as it appears in circuit files.
fn kind_name(node: &Node) -> &'static str {
    match &node.kind {
        NodeKind::Composite(_) => "CUSTOM",
        NodeKind::Unknown => "?",
        _ => node
            .component_type()
            .map(|t| t.type_name())
            .unwrap_or("?"),
    }
}

/// Renders every net of a netlist with its current value.
pub fn render_nets(netlist: &Netlist, circuit: &Circuit) -> String {
    if netlist.is_empty() {
        return "No nets".to_string();
    }
    let list = |terms: &[crate::netlist::Terminal]| -> String {
        if terms.is_empty() {
            return "-".to_string();
        }
        terms
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    };
    let mut out = format!("{} net(s):\n", netlist.len());
    for net in netlist.nets() {
        let value = net.resolve(circuit);
        let _ = writeln!(
            out,
            "  {} [{} bit] = {}  sources: {}  sinks: {}",
            net.id,
            net.width,
            format_value(&value),
            list(&net.sources),
            list(&net.sinks)
        );
        if !net.joints.is_empty() {
            let joints: Vec<String> = net.joints.iter().map(ToString::to_string).collect();
            let _ = writeln!(out, "      joints: {}", joints.join(", "));
        }
    }
    out.trim_end().to_string()
}

/// Parses a command line into a [`SimCommand`].
///
/// Shortcuts: `s`=step, `r`=run, `t`=toggle, `i`=inspect, `w`=watch,
/// `h`=help, `q`=quit.
pub fn parse_command(input: &str) -> Result<SimCommand, String> {
    let parts: Vec<&str> = input.split_whitespace().collect();
    let Some((head, args)) = parts.split_first() else {
        return Err("empty command".to_string());
    };
    let one = |what: &str| -> Result<String, String> {
        args.first()
            .map(|s| s.to_string())
            .ok_or_else(|| format!("{head} requires {what}"))
    };

    match head.to_lowercase().as_str() {
        "step" | "s" => match args.first() {
            None => Ok(SimCommand::Step),
            Some(n) => Ok(SimCommand::Run {
                ticks: parse_ticks(n)?,
            }),
        },
        "run" | "r" => {
            let n = args
                .first()
                .ok_or_else(|| "run requires a tick count (e.g., 'run 20')".to_string())?;
            Ok(SimCommand::Run {
                ticks: parse_ticks(n)?,
            })
        }
        "set" => match args {
            [node, value] => Ok(SimCommand::Set {
                node: node.to_string(),
                value: value.to_string(),
            }),
            [assignment] if assignment.contains('=') => {
                let (node, value) = assignment.split_once('=').unwrap_or_default();
                Ok(SimCommand::Set {
                    node: node.to_string(),
                    value: value.to_string(),
                })
            }
            _ => Err("set requires a node and a value (e.g., 'set A 1')".to_string()),
        },
        "toggle" | "t" => Ok(SimCommand::Toggle {
            node: one("a node")?,
        }),
        "clock" => {
            let node = one("a node")?;
            let action = match args.get(1).map(|a| a.to_lowercase()).as_deref() {
                Some("faster" | "+") => ClockAction::Faster,
                Some("slower" | "-") => ClockAction::Slower,
                Some("toggle" | "pause") => ClockAction::Toggle,
                _ => return Err("clock requires an action: faster, slower or toggle".to_string()),
            };
            Ok(SimCommand::Clock { node, action })
        }
        "inspect" | "i" => {
            if args.is_empty() {
                return Err("inspect requires node name(s)".to_string());
            }
            Ok(SimCommand::Inspect {
                nodes: args.iter().map(|s| s.to_string()).collect(),
            })
        }
        "watch" | "w" => Ok(SimCommand::Watch {
            node: one("a node")?,
        }),
        "unwatch" => Ok(SimCommand::Unwatch {
            node: one("a node")?,
        }),
        "nodes" | "ls" => Ok(SimCommand::Nodes),
        "nets" => Ok(SimCommand::Nets),
        "status" => Ok(SimCommand::Status),
        "help" | "h" => Ok(SimCommand::Help),
        "quit" | "q" | "exit" => Ok(SimCommand::Quit),
        _ => Err(format!("unknown command: '{head}'")),
    }
}

fn parse_ticks(s: &str) -> Result<u64, String> {
    s.parse()
        .map_err(|_| format!("invalid tick count '{s}'"))
}

/// Formats a value for display: `0`/`1` for bits, `W'hXX` for buses.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Bit(b) => u8::from(*b).to_string(),
        Value::Bus(bus) => format!("{}'h{}", bus.width(), value.hex()),
    }
}

fn help_text() -> String {
    "\
Commands:
  step [n]              (s)   Evaluate one tick, or n ticks
  run <n>               (r)   Evaluate n ticks
  set <node> <value>          Drive an input pin or switch (0, 1, 0xA5, 0b1010)
  toggle <node>         (t)   Flip a switch or 1-bit input pin
  clock <node> <action>       faster, slower or toggle an oscillator
  inspect <node>...     (i)   Show display values
  watch <node>          (w)   Print a node's value after every command
  unwatch <node>              Stop watching a node
  nodes                 (ls)  List all nodes
  nets                        List all nets with their values
  status                      Show session status
  help                  (h)   Show this help
  quit                  (q)   Exit

Nodes are named by label or numeric handle."
        .to_string()
}
