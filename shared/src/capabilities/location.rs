use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::permission::PermissionStatus;
use crate::report::{Coordinates, InvalidCoordinates};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum Accuracy {
    Low,
    #[default]
    Balanced,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", content = "data")]
pub enum LocationOperation {
    RequestPermission,
    CurrentPosition { accuracy: Accuracy },
}

/// A fix as reported by the platform.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub accuracy_m: Option<f64>,
    #[serde(default)]
    pub timestamp_ms: Option<u64>,
}

impl Position {
    pub fn coordinates(&self) -> Result<Coordinates, InvalidCoordinates> {
        Coordinates::new(self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data")]
pub enum LocationOutput {
    PermissionStatus(PermissionStatus),
    Position(Position),
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum LocationError {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("location services are disabled")]
    ServicesDisabled,
    #[error("position unavailable: {reason}")]
    Unavailable { reason: String },
    #[error("timed out waiting for a position")]
    Timeout,
    #[error("unexpected shell response: {0}")]
    UnexpectedOutput(String),
}

impl Operation for LocationOperation {
    type Output = Result<LocationOutput, LocationError>;
}

pub struct Location<Ev> {
    context: CapabilityContext<LocationOperation, Ev>,
}

impl<Ev> Capability<Ev> for Location<Ev> {
    type Operation = LocationOperation;
    type MappedSelf<MappedEv> = Location<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Location::new(self.context.map_event(f))
    }
}

impl<Ev> Location<Ev>
where
    Ev: 'static,
{
    pub fn new(context: CapabilityContext<LocationOperation, Ev>) -> Self {
        Self { context }
    }

    pub fn request_permission<F>(&self, make_event: F)
    where
        F: FnOnce(Result<PermissionStatus, LocationError>) -> Ev + Send + 'static,
    {
        let context = self.context.clone();
        self.context.spawn(async move {
            let output = context
                .request_from_shell(LocationOperation::RequestPermission)
                .await;
            let status = output.and_then(|output| match output {
                LocationOutput::PermissionStatus(status) => Ok(status),
                other @ LocationOutput::Position(_) => {
                    Err(LocationError::UnexpectedOutput(format!("{other:?}")))
                }
            });
            context.update_app(make_event(status));
        });
    }

    pub fn current_position<F>(&self, accuracy: Accuracy, make_event: F)
    where
        F: FnOnce(Result<Position, LocationError>) -> Ev + Send + 'static,
    {
        let context = self.context.clone();
        self.context.spawn(async move {
            let output = context
                .request_from_shell(LocationOperation::CurrentPosition { accuracy })
                .await;
            let position = output.and_then(|output| match output {
                LocationOutput::Position(position) => Ok(position),
                LocationOutput::PermissionStatus(_) => Err(LocationError::UnexpectedOutput(
                    "permission status instead of a position".into(),
                )),
            });
            context.update_app(make_event(position));
        });
    }
}
