/// Overall run state of the assembled application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Created,
    Initializing,
    Initialized,
    Starting,
    Running,
    Stopping,
    Stopped,
    Failed,
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunState::Created => "created",
            RunState::Initializing => "initializing",
            RunState::Initialized => "initialized",
            RunState::Starting => "starting",
            RunState::Running => "running",
            RunState::Stopping => "stopping",
            RunState::Stopped => "stopped",
            RunState::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// The phase a module was in when it failed, recorded on a `module.failed`
/// event (`spec.md` §4.1, "State machine per module").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModulePhase {
    Construction,
    Init,
    Start,
    Stop,
}

impl std::fmt::Display for ModulePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ModulePhase::Construction => "construction",
            ModulePhase::Init => "init",
            ModulePhase::Start => "start",
            ModulePhase::Stop => "stop",
        };
        write!(f, "{s}")
    }
}

/// Per-module lifecycle state: `Registered -> Reconstructed? -> Initialized
/// -> Started -> Stopped`. A module that fails a transition stays in its
/// last successful state (`spec.md` §4.1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleState {
    Registered,
    Reconstructed,
    Initialized,
    Started,
    Stopped,
    Failed { last_good: Box<ModuleState>, phase: ModulePhase },
}

impl ModuleState {
    /// Mark this state as failed at `phase`, remembering the last state the
    /// module successfully reached.
    pub fn fail(&self, phase: ModulePhase) -> ModuleState {
        let last_good = if let ModuleState::Failed { last_good, .. } = self {
            (**last_good).clone()
        } else {
            self.clone()
        };
        ModuleState::Failed {
            last_good: Box::new(last_good),
            phase,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ModuleState::Failed { .. })
    }
}

impl std::fmt::Display for ModuleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModuleState::Registered => write!(f, "registered"),
            ModuleState::Reconstructed => write!(f, "reconstructed"),
            ModuleState::Initialized => write!(f, "initialized"),
            ModuleState::Started => write!(f, "started"),
            ModuleState::Stopped => write!(f, "stopped"),
            ModuleState::Failed { last_good, phase } => {
                write!(f, "failed at {phase} (last good: {last_good})")
            }
        }
    }
}
