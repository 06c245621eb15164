/// State for one `EVERY n TICKS GOSUB label` registration. `EVERY ON`/`OFF`
/// toggles whether the installed handler is active without re-registering it.
#[derive(Clone, Debug, PartialEq)]
pub struct EveryHandler {
    pub ticks: u32,
    pub label: String,
    pub enabled: bool,
}

/// All registered `EVERY` handlers plus the flag the cleanup pass checks
/// to decide whether a tick-interrupt installer needs to be emitted at all.
#[derive(Default)]
pub struct EveryState {
    handlers: Vec<EveryHandler>,
}

impl EveryState {
    pub fn new() -> EveryState {
        EveryState::default()
    }

    pub fn register(&mut self, ticks: u32, label: impl Into<String>) {
        self.handlers.push(EveryHandler {
            ticks,
            label: label.into(),
            enabled: false,
        });
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        for h in &mut self.handlers {
            h.enabled = enabled;
        }
    }

    pub fn handlers(&self) -> &[EveryHandler] {
        &self.handlers
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
