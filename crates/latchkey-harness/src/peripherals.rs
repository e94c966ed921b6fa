//! Scripted and recording peripherals for simulation.
//!
//! Nodes own their peripherals as boxed trait objects, so every recorder here
//! is a cheap clone over shared state. The scenario keeps one clone and reads
//! it back after the simulation ends.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;
use latchkey_core::hal::{
    Actuator, Alarm, CredentialStore, Direction, Display, Key, Keypad, KeypadError,
    MemoryCredentialStore, PresenceSensor, StoreError,
};
use tokio::time::Instant;

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Timestamped log shared between a node and the scenario.
///
/// Timestamps come from the tokio clock of the host that recorded them, so
/// only compare entries recorded on the same host.
#[derive(Debug)]
pub struct Recorder<T> {
    entries: Arc<Mutex<Vec<(Instant, T)>>>,
}

impl<T> Clone for Recorder<T> {
    fn clone(&self) -> Self {
        Self { entries: Arc::clone(&self.entries) }
    }
}

impl<T> Default for Recorder<T> {
    fn default() -> Self {
        Self { entries: Arc::new(Mutex::new(Vec::new())) }
    }
}

impl<T: Clone> Recorder<T> {
    /// Empty log.
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, value: T) {
        lock(&self.entries).push((Instant::now(), value));
    }

    /// Entries as offsets from `origin`.
    pub fn since(&self, origin: Instant) -> Vec<(std::time::Duration, T)> {
        lock(&self.entries)
            .iter()
            .map(|(at, value)| (at.saturating_duration_since(origin), value.clone()))
            .collect()
    }

    /// Recorded values without timestamps.
    pub fn values(&self) -> Vec<T> {
        lock(&self.entries).iter().map(|(_, value)| value.clone()).collect()
    }
}

/// Door motor command as seen by the actuator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Drive {
    /// Commanded direction.
    pub direction: Direction,
    /// Commanded power.
    pub power: u8,
}

impl Actuator for Recorder<Drive> {
    fn drive(&mut self, direction: Direction, power: u8) {
        self.record(Drive { direction, power });
    }
}

/// Alarm switch position; `true` while sounding.
impl Alarm for Recorder<bool> {
    fn on(&mut self) {
        self.record(true);
    }

    fn off(&mut self) {
        self.record(false);
    }
}

/// Something drawn on the display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayEvent {
    /// Full screen replaced.
    Show(String),
    /// Character appended at the cursor.
    Echo(char),
}

impl Display for Recorder<DisplayEvent> {
    fn show(&mut self, text: &str) {
        self.record(DisplayEvent::Show(text.to_owned()));
    }

    fn echo(&mut self, ch: char) {
        self.record(DisplayEvent::Echo(ch));
    }
}

/// Keypad that replays a fixed key sequence, then reports [`KeypadError::Closed`].
#[derive(Debug, Clone, Default)]
pub struct ScriptedKeypad {
    keys: VecDeque<Key>,
}

impl ScriptedKeypad {
    /// Keypad typing `script`; `=` or newline is Enter.
    pub fn typing(script: &str) -> Self {
        Self { keys: script.chars().map(Key::from_char).collect() }
    }

    /// Keys not yet read.
    pub fn remaining(&self) -> usize {
        self.keys.len()
    }
}

#[async_trait]
impl Keypad for ScriptedKeypad {
    async fn read_key(&mut self) -> Result<Key, KeypadError> {
        self.keys.pop_front().ok_or(KeypadError::Closed)
    }
}

/// Presence sensor driven by a per-door-cycle script.
///
/// Each entry is the number of polls that still see someone in the doorway
/// during one door cycle. Once a cycle reads clear, the next poll starts the
/// next entry. Cycles beyond the script read clear immediately.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPresence {
    cycles: Arc<Mutex<PresenceScript>>,
}

#[derive(Debug, Default)]
struct PresenceScript {
    pending: VecDeque<u32>,
    current: Option<u32>,
    polls: u32,
}

impl ScriptedPresence {
    /// Sensor following `occupied_polls`, one entry per door cycle.
    pub fn new(occupied_polls: &[u32]) -> Self {
        let script = PresenceScript {
            pending: occupied_polls.iter().copied().collect(),
            current: None,
            polls: 0,
        };
        Self { cycles: Arc::new(Mutex::new(script)) }
    }

    /// Total polls observed.
    pub fn polls(&self) -> u32 {
        lock(&self.cycles).polls
    }
}

impl PresenceSensor for ScriptedPresence {
    fn is_detected(&mut self) -> bool {
        let mut script = lock(&self.cycles);
        script.polls += 1;

        let remaining = match script.current {
            Some(remaining) => remaining,
            None => script.pending.pop_front().unwrap_or(0),
        };
        if remaining == 0 {
            script.current = None;
            false
        } else {
            script.current = Some(remaining - 1);
            true
        }
    }
}

/// Credential store readable after the node that owns it is gone.
#[derive(Debug, Clone, Default)]
pub struct SharedStore {
    inner: Arc<Mutex<MemoryCredentialStore>>,
}

impl SharedStore {
    /// Store starting from `store`.
    pub fn new(store: MemoryCredentialStore) -> Self {
        Self { inner: Arc::new(Mutex::new(store)) }
    }

    /// Current raw bytes.
    pub fn bytes(&self) -> [u8; latchkey_proto::PASSCODE_LEN] {
        lock(&self.inner).bytes()
    }
}

impl CredentialStore for SharedStore {
    fn read(&mut self, index: usize) -> Result<u8, StoreError> {
        lock(&self.inner).read(index)
    }

    fn write(&mut self, index: usize, value: u8) -> Result<(), StoreError> {
        lock(&self.inner).write(index, value)
    }
}
