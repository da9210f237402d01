// Simulation events: the internal tick scheduler and the narrative output
// stream.
//
// The sim is driven by an external fixed-rate tick source, but internally it
// is a discrete event simulation. Periodic work (generator steps, observer
// temperature sweeps) is queued in a priority queue ordered by
// `(tick, sequence)` and processed in order as `SimState::step()` advances
// the clock. Empty ticks are free.
//
// This file defines three related concepts:
// - `Scheduler`: the narrow contract generator and observer code depend on
//   (`run_periodic`, `run_once`, `cancel`). Callbacks are `ScheduledTask`
//   values, tagged messages dispatched by `SimState`, so nothing captures
//   simulation state in a closure.
// - `TickScheduler`: the min-heap implementation of that contract. A
//   periodic entry is re-queued with the same `TaskHandle` each time it
//   fires. Cancellation is lazy: the handle goes into a cancelled set and the
//   entry is dropped when it reaches the head of the queue.
// - `SimEvent`: narrative events emitted as output for the host to log or
//   display.
//
// See also: `sim.rs` for the tick loop that drains the scheduler,
// `generator.rs` which owns a periodic step handle per running generator.
//
// **Critical constraint: determinism.** Two tasks due on the same tick run in
// the order they were (re)queued. The `(tick, sequence)` key provides a total
// order.

use crate::body::BodyTemperatureState;
use crate::generator::PowerOffReason;
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeSet, BinaryHeap};

// ---------------------------------------------------------------------------
// Scheduler contract
// ---------------------------------------------------------------------------

/// Handle to a queued task, used for cancellation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskHandle(pub u64);

/// Work the scheduler can run. Dispatched by `SimState::process_task`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduledTask {
    /// One periodic step of a generator (fuel, heat convergence, zone refresh).
    GeneratorStep { generator_id: GeneratorId },
    /// Body-temperature check for every registered observer.
    ObserverSweep,
}

/// The tick-based scheduling contract the simulation components consume.
pub trait Scheduler {
    /// Run `task` every `interval` ticks, the first time `delay` ticks from
    /// now. Returns a handle for `cancel`.
    fn run_periodic(&mut self, interval: u64, delay: u64, task: ScheduledTask) -> TaskHandle;

    /// Run `task` once, on the current tick.
    fn run_once(&mut self, task: ScheduledTask) -> TaskHandle;

    /// Stop a task. Cancelling an unknown or already-finished handle is a no-op.
    fn cancel(&mut self, handle: TaskHandle);
}

// ---------------------------------------------------------------------------
// Tick scheduler (priority queue)
// ---------------------------------------------------------------------------

/// A task queued for a future tick.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScheduledEvent {
    /// The tick at which this task should fire.
    pub tick: u64,
    /// Unique ordering key for deterministic tiebreaking within a tick.
    /// Lower values are processed first.
    pub sequence: u64,
    pub handle: TaskHandle,
    /// Re-queue interval for periodic tasks.
    pub period: Option<u64>,
    pub task: ScheduledTask,
}

// We want a min-heap: lowest (tick, sequence) fires first.
// Rust's BinaryHeap is a max-heap, so we reverse the ordering.
impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.tick == other.tick && self.sequence == other.sequence
    }
}

impl Eq for ScheduledEvent {}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse: smallest (tick, sequence) should be "greatest" for the max-heap.
        other
            .tick
            .cmp(&self.tick)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

/// Priority-queue scheduler. Tracks the current tick so relative delays can
/// be resolved; `SimState` advances it with `advance_to`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TickScheduler {
    heap: BinaryHeap<ScheduledEvent>,
    /// Monotonic counter for deterministic ordering within a tick.
    next_sequence: u64,
    next_handle: u64,
    now: u64,
    cancelled: BTreeSet<TaskHandle>,
}

impl TickScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> u64 {
        self.now
    }

    /// Move the clock forward. Never moves it backward.
    pub fn advance_to(&mut self, tick: u64) {
        self.now = self.now.max(tick);
    }

    fn push(&mut self, tick: u64, handle: TaskHandle, period: Option<u64>, task: ScheduledTask) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.heap.push(ScheduledEvent {
            tick,
            sequence,
            handle,
            period,
            task,
        });
    }

    fn new_handle(&mut self) -> TaskHandle {
        let handle = TaskHandle(self.next_handle);
        self.next_handle += 1;
        handle
    }

    /// Tick of the next queued entry. May belong to a cancelled task, which
    /// `pop_if_ready` will then discard.
    pub fn peek_tick(&self) -> Option<u64> {
        self.heap.peek().map(|e| e.tick)
    }

    /// Pop the next live task due at or before `up_to_tick`. Periodic tasks
    /// are re-queued one interval later under the same handle.
    pub fn pop_if_ready(&mut self, up_to_tick: u64) -> Option<(TaskHandle, ScheduledTask)> {
        while self.heap.peek().is_some_and(|e| e.tick <= up_to_tick) {
            let event = self.heap.pop()?;
            if self.cancelled.remove(&event.handle) {
                continue;
            }
            if let Some(period) = event.period {
                self.push(event.tick + period, event.handle, Some(period), event.task.clone());
            }
            return Some((event.handle, event.task));
        }
        None
    }

    /// Whether `handle` still has a live queued entry.
    pub fn is_scheduled(&self, handle: TaskHandle) -> bool {
        !self.cancelled.contains(&handle) && self.heap.iter().any(|e| e.handle == handle)
    }

    /// Number of queued entries, including cancelled ones not yet discarded.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

impl Scheduler for TickScheduler {
    fn run_periodic(&mut self, interval: u64, delay: u64, task: ScheduledTask) -> TaskHandle {
        let handle = self.new_handle();
        // A zero interval would re-fire forever within one tick.
        let interval = interval.max(1);
        self.push(self.now + delay, handle, Some(interval), task);
        handle
    }

    fn run_once(&mut self, task: ScheduledTask) -> TaskHandle {
        let handle = self.new_handle();
        self.push(self.now, handle, None, task);
        handle
    }

    fn cancel(&mut self, handle: TaskHandle) {
        if self.heap.iter().any(|e| e.handle == handle) {
            self.cancelled.insert(handle);
        }
    }
}

// ---------------------------------------------------------------------------
// Narrative events (output)
// ---------------------------------------------------------------------------

/// A narrative event emitted by the simulation for the host's log or UI.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimEvent {
    pub tick: u64,
    pub kind: SimEventKind,
}

/// Types of narrative events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SimEventKind {
    GlobalTemperatureChanged {
        temperature: f32,
    },
    ZoneAdded {
        world: WorldId,
        center: WorldPos,
        radius: f32,
    },
    ZoneRemoved {
        world: WorldId,
        center: WorldPos,
        count: usize,
    },
    GeneratorCreated {
        generator_id: GeneratorId,
        world: WorldId,
        origin: VoxelCoord,
        blocks: usize,
    },
    GeneratorPoweredOn {
        generator_id: GeneratorId,
    },
    GeneratorPoweredOff {
        generator_id: GeneratorId,
        reason: PowerOffReason,
    },
    GeneratorRemoved {
        generator_id: GeneratorId,
    },
    /// An observer's body-temperature classification changed.
    ObserverStateChanged {
        observer_id: ObserverId,
        from: BodyTemperatureState,
        to: BodyTemperatureState,
    },
    ObserverDied {
        observer_id: ObserverId,
        from_cold: bool,
    },
    /// A command could not be applied. The sim state is unchanged.
    CommandRejected {
        reason: String,
    },
}
