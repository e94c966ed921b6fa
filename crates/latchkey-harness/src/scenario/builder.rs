//! Scenario builder API.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use latchkey_control::{ControlConfig, ControlNode, ControlPeripherals};
use latchkey_core::{ProtocolTiming, timer::TokioTimer};
use latchkey_hmi::{HmiConfig, HmiNode, HmiPeripherals};
use tokio::time::Instant;

use crate::{
    SimEnv,
    peripherals::{
        DisplayEvent, Drive, Recorder, ScriptedKeypad, ScriptedPresence, SharedStore, lock,
    },
    scenario::{NodeReport, OracleFn, World},
    sim_link::{accept_link, connect_link},
};

/// Turmoil host name of the Control node.
pub const CONTROL_HOST: &str = "control";

/// Turmoil host name of the HMI node.
pub const HMI_HOST: &str = "hmi";

/// Dwells short enough to keep simulations quick.
pub const FAST_TIMING: ProtocolTiming =
    ProtocolTiming { door_dwell: Duration::from_secs(1), lockout_dwell: Duration::from_secs(3) };

/// Scenario builder.
///
/// Must call `.oracle()` to get a [`RunnableScenario`].
#[derive(Debug, Clone)]
pub struct Scenario {
    name: String,
    keys: String,
    timing: ProtocolTiming,
    presence: Vec<u32>,
    seed: u64,
    duration: Duration,
}

impl Scenario {
    /// Scenario with no keys pressed, fast dwells and an empty doorway.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            keys: String::new(),
            timing: FAST_TIMING,
            presence: Vec::new(),
            seed: 0,
            duration: Duration::from_secs(3600),
        }
    }

    /// Append keys typed on the HMI. Digits, `+`, `-`, and `=` for Enter.
    pub fn keys(mut self, keys: &str) -> Self {
        self.keys.push_str(keys);
        self
    }

    /// Door and lockout dwells for both nodes.
    pub fn timing(mut self, timing: ProtocolTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Occupied presence polls for each successive door cycle.
    pub fn presence(mut self, occupied_polls: &[u32]) -> Self {
        self.presence = occupied_polls.to_vec();
        self
    }

    /// Seed for turmoil's RNG.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Upper bound on simulated time.
    pub fn simulation_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Set the oracle function and return a runnable scenario.
    ///
    /// The oracle is mandatory.
    pub fn oracle(self, oracle: OracleFn) -> RunnableScenario {
        RunnableScenario { scenario: self, oracle }
    }
}

/// A scenario with an oracle function that can be executed.
pub struct RunnableScenario {
    scenario: Scenario,
    oracle: OracleFn,
}

impl std::fmt::Debug for RunnableScenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunnableScenario").field("scenario", &self.scenario).finish_non_exhaustive()
    }
}

impl RunnableScenario {
    /// Run both nodes until the keypad script is exhausted and the link
    /// closes, then check the oracle.
    ///
    /// # Errors
    ///
    /// The simulation failed to complete, or the oracle rejected the world.
    pub fn run(self) -> Result<(), String> {
        let Self { scenario, oracle } = self;
        let name = scenario.name.clone();

        let store = SharedStore::default();
        let motor = Recorder::<Drive>::new();
        let alarm = Recorder::<bool>::new();
        let display = Recorder::<DisplayEvent>::new();
        let presence = ScriptedPresence::new(&scenario.presence);
        let control_report = Arc::new(Mutex::new(NodeReport::default()));
        let hmi_report = Arc::new(Mutex::new(NodeReport::default()));
        let control_origin = Arc::new(Mutex::new(None::<Instant>));

        let mut sim = turmoil::Builder::new()
            .simulation_duration(scenario.duration)
            .rng_seed(scenario.seed)
            .build();

        let control_config = ControlConfig { timing: scenario.timing, ..ControlConfig::default() };
        sim.client(CONTROL_HOST, {
            let store = store.clone();
            let peripherals = ControlPeripherals {
                actuator: Box::new(motor.clone()),
                alarm: Box::new(alarm.clone()),
                presence: Box::new(presence.clone()),
            };
            let report = Arc::clone(&control_report);
            let origin = Arc::clone(&control_origin);
            async move {
                *lock(&origin) = Some(Instant::now());
                let link = accept_link().await?;
                let mut node = ControlNode::new(
                    SimEnv::new(),
                    store,
                    link,
                    TokioTimer::new(),
                    peripherals,
                    control_config,
                )?;
                let result = node.run().await;
                *lock(&report) = NodeReport {
                    state: Some(node.state()),
                    error: result.err().map(|err| err.to_string()),
                };
                Ok(())
            }
        });

        let hmi_config = HmiConfig { timing: scenario.timing, ..HmiConfig::default() };
        sim.client(HMI_HOST, {
            let peripherals = HmiPeripherals {
                keypad: Box::new(ScriptedKeypad::typing(&scenario.keys)),
                display: Box::new(display.clone()),
            };
            let report = Arc::clone(&hmi_report);
            async move {
                let link = connect_link(CONTROL_HOST).await?;
                let mut node =
                    HmiNode::new(SimEnv::new(), link, TokioTimer::new(), peripherals, hmi_config)?;
                let result = node.run().await;
                *lock(&report) = NodeReport {
                    state: Some(node.state()),
                    error: result.err().map(|err| err.to_string()),
                };
                Ok(())
            }
        });

        sim.run().map_err(|err| format!("Scenario '{name}': simulation failed: {err}"))?;

        let origin = lock(&control_origin)
            .ok_or_else(|| format!("Scenario '{name}': control host never started"))?;
        let world = World {
            control: lock(&control_report).clone(),
            hmi: lock(&hmi_report).clone(),
            credential: store.bytes(),
            motor: motor.since(origin),
            alarm: alarm.since(origin),
            display: display.values(),
            presence_polls: presence.polls(),
        };

        tracing::debug!(scenario = %name, ?world, "scenario finished");
        oracle(&world).map_err(|err| format!("Scenario '{name}': oracle failed: {err}"))
    }
}
