#![cfg(feature = "wasm")]

use wasm_bindgen::prelude::*;

use crate::config::ElectionConfig;
use crate::error::BullyError;
use crate::observer::Recorder;
use crate::process::ProcessId;
use crate::simulator::BullySimulator;

fn to_js(e: BullyError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn saturate(n: u64) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

fn json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "null".into())
}

/// WASM binding for the election engine.
///
/// The browser owns the real clock: it calls `advance(ms)` from its
/// animation loop and drains the messages and log lines that came out.
#[wasm_bindgen]
pub struct WasmSimulator {
    sim: BullySimulator<Recorder>,
}

#[wasm_bindgen]
impl WasmSimulator {
    /// Processes 1 to 5, P5 leading, monitoring stopped.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Result<WasmSimulator, JsValue> {
        console_error_panic_hook::set_once();
        let sim = BullySimulator::recording(ElectionConfig::default()).map_err(to_js)?;
        Ok(WasmSimulator { sim })
    }

    /// Build from a JSON `ElectionConfig`; missing fields take defaults.
    #[wasm_bindgen(js_name = withConfig)]
    pub fn with_config(config_json: &str) -> Result<WasmSimulator, JsValue> {
        console_error_panic_hook::set_once();
        let config = ElectionConfig::from_json(config_json).map_err(to_js)?;
        let sim = BullySimulator::recording(config).map_err(to_js)?;
        Ok(WasmSimulator { sim })
    }

    pub fn configure(&mut self, ids: Vec<u64>) -> Result<(), JsValue> {
        self.sim.configure(&ids).map_err(to_js)
    }

    /// Returns the process's new liveness.
    pub fn toggle(&mut self, id: u64) -> Result<bool, JsValue> {
        self.sim.toggle(ProcessId::new(id)).map_err(to_js)
    }

    /// Pass `undefined` to start from the lowest active process.
    #[wasm_bindgen(js_name = startElection)]
    pub fn start_election(&mut self, initiator: Option<u64>) -> Result<u64, JsValue> {
        self.sim
            .start_election(initiator.map(ProcessId::new))
            .map(|id| id.raw())
            .map_err(to_js)
    }

    pub fn reset(&mut self) -> Result<(), JsValue> {
        self.sim.reset().map_err(to_js)
    }

    #[wasm_bindgen(js_name = setRunning)]
    pub fn set_running(&mut self, running: bool) -> bool {
        self.sim.set_running(running)
    }

    /// Move the clock forward. Returns how many events fired, capped at
    /// `u32::MAX`.
    pub fn advance(&mut self, ms: u32) -> u32 {
        saturate(self.sim.advance_by(u64::from(ms)))
    }

    /// Fire one event. Returns its description as JSON, or `undefined`
    /// when nothing is pending.
    pub fn step(&mut self) -> Option<String> {
        self.sim.step_described().map(|s| json(&s))
    }

    /// Messages emitted since the last drain, as a JSON array.
    #[wasm_bindgen(js_name = drainMessages)]
    pub fn drain_messages(&mut self) -> String {
        json(&self.sim.observer_mut().drain_messages())
    }

    /// Election completions since the last drain, as a JSON array of ids.
    #[wasm_bindgen(js_name = drainCompletions)]
    pub fn drain_completions(&mut self) -> String {
        let done = std::mem::take(&mut self.sim.observer_mut().completions);
        json(&done)
    }

    /// The retained log window as a JSON array.
    #[wasm_bindgen(js_name = logsJson)]
    pub fn logs_json(&self) -> Result<String, JsValue> {
        self.sim.observer().logs.to_json().map_err(to_js)
    }

    #[wasm_bindgen(js_name = snapshotJson)]
    pub fn snapshot_json(&self) -> Result<String, JsValue> {
        self.sim.snapshot_json().map_err(to_js)
    }

    #[wasm_bindgen(js_name = currentTime)]
    pub fn current_time(&self) -> f64 {
        self.sim.now().millis() as f64
    }

    /// Current leader id, or `undefined`.
    pub fn leader(&self) -> Option<u64> {
        self.sim.leader().map(|id| id.raw())
    }
}
