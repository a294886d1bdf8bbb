//! Test-injection hook fired at well-known execution phases.
//!
//! Production scans use [`DebugActions::none`]. Test harnesses configure a
//! phase/action pair, either directly or from the `PHASE:ACTION[:ARG]` string
//! form (`PREPARE_SCANNER:FAIL`, `PREPARE_SCANNER:WAIT:250`).

use std::fmt;
use std::str::FromStr;
use std::thread;
use std::time::Duration;

use splitscan_result::{Error, Result};

/// Phase at which a debug action can fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecNodePhase {
    /// After a scanner is constructed, before `prepare`.
    PrepareScanner,
}

impl fmt::Display for ExecNodePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecNodePhase::PrepareScanner => f.write_str("PREPARE_SCANNER"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugAction {
    Fail,
    Wait(Duration),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebugActions {
    armed: Option<(ExecNodePhase, DebugAction)>,
}

impl DebugActions {
    /// No-op policy.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(phase: ExecNodePhase, action: DebugAction) -> Self {
        Self {
            armed: Some((phase, action)),
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// Run the configured action if it targets `phase`.
    pub fn fire(&self, phase: ExecNodePhase) -> Result<()> {
        match self.armed {
            Some((armed, action)) if armed == phase => match action {
                DebugAction::Fail => {
                    tracing::debug!(%phase, "debug action FAIL");
                    Err(Error::Internal("Debug Action: FAIL".into()))
                }
                DebugAction::Wait(duration) => {
                    tracing::debug!(%phase, ?duration, "debug action WAIT");
                    thread::sleep(duration);
                    Ok(())
                }
            },
            _ => Ok(()),
        }
    }
}

impl FromStr for DebugActions {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Ok(Self::none());
        }
        let parts: Vec<&str> = trimmed.split(':').map(str::trim).collect();
        let phase = match parts[0].to_ascii_uppercase().as_str() {
            "PREPARE_SCANNER" => ExecNodePhase::PrepareScanner,
            other => {
                return Err(Error::InvalidArgumentError(format!(
                    "unknown debug action phase: {other}"
                )));
            }
        };
        let action = match (parts.get(1).map(|a| a.to_ascii_uppercase()), parts.get(2)) {
            (Some(a), None) if a == "FAIL" => DebugAction::Fail,
            (Some(a), Some(ms)) if a == "WAIT" => {
                let millis = ms.parse::<u64>().map_err(|err| {
                    Error::InvalidArgumentError(format!("invalid debug action wait '{ms}': {err}"))
                })?;
                DebugAction::Wait(Duration::from_millis(millis))
            }
            _ => {
                return Err(Error::InvalidArgumentError(format!(
                    "malformed debug action: {trimmed}"
                )));
            }
        };
        Ok(Self::new(phase, action))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_is_a_no_op() {
        assert!(DebugActions::none().fire(ExecNodePhase::PrepareScanner).is_ok());
    }

    #[test]
    fn fail_action_errors_at_its_phase() {
        let actions = DebugActions::new(ExecNodePhase::PrepareScanner, DebugAction::Fail);
        let err = actions.fire(ExecNodePhase::PrepareScanner).unwrap_err();
        assert_eq!(err.to_string(), "An internal operation failed: Debug Action: FAIL");
    }

    #[test]
    fn parses_string_form() {
        let fail: DebugActions = "prepare_scanner:fail".parse().unwrap();
        assert_eq!(
            fail,
            DebugActions::new(ExecNodePhase::PrepareScanner, DebugAction::Fail)
        );

        let wait: DebugActions = "PREPARE_SCANNER:WAIT:5".parse().unwrap();
        assert_eq!(
            wait,
            DebugActions::new(
                ExecNodePhase::PrepareScanner,
                DebugAction::Wait(Duration::from_millis(5))
            )
        );
        assert!(wait.fire(ExecNodePhase::PrepareScanner).is_ok());

        assert_eq!("".parse::<DebugActions>().unwrap(), DebugActions::none());
    }

    #[test]
    fn rejects_unknown_phase_and_action() {
        assert!("OPEN:FAIL".parse::<DebugActions>().is_err());
        assert!("PREPARE_SCANNER:EXPLODE".parse::<DebugActions>().is_err());
        assert!("PREPARE_SCANNER:WAIT:soon".parse::<DebugActions>().is_err());
    }
}
