//! Interactive session: the request/response cycle around a prediction.
//!
//! ```text
//! AwaitingInput --predict--> Validating --+--> Incomplete --> AwaitingInput (notice shown)
//!                                         |
//!                                         +--> Predicting --> ResultShown
//! ResultShown --any field edit--> AwaitingInput
//! ```
//!
//! `Validating`, `Incomplete` and `Predicting` are passed through inside a
//! single synchronous `trigger_predict` call; they are recorded in the
//! session trace so the cycle can be observed and tested.

use chrono::{DateTime, Utc};

use crate::application::PredictionService;
use crate::domain::{FieldEdit, IncompleteInput, PatientField, PatientInputs, PredictionResult};
use crate::ports::Classifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingInput,
    Validating,
    Incomplete,
    Predicting,
    ResultShown,
}

/// What a predict action produced.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    Incomplete(IncompleteInput),
    Predicted(PredictionResult),
}

/// One user's interactive session.
#[derive(Debug, Clone)]
pub struct Session {
    inputs: PatientInputs,
    state: SessionState,
    result: Option<PredictionResult>,
    predicted_at: Option<DateTime<Utc>>,
    incomplete: Option<IncompleteInput>,
    trace: Vec<SessionState>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Start in `AwaitingInput` with every field unset.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inputs: PatientInputs::default(),
            state: SessionState::AwaitingInput,
            result: None,
            predicted_at: None,
            incomplete: None,
            trace: vec![SessionState::AwaitingInput],
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn inputs(&self) -> &PatientInputs {
        &self.inputs
    }

    /// The result currently on display, if any.
    #[must_use]
    pub fn result(&self) -> Option<&PredictionResult> {
        self.result.as_ref()
    }

    #[must_use]
    pub fn predicted_at(&self) -> Option<DateTime<Utc>> {
        self.predicted_at
    }

    /// The incomplete-input notice, if one is showing.
    #[must_use]
    pub fn notice(&self) -> Option<&'static str> {
        self.incomplete.as_ref().map(IncompleteInput::notice)
    }

    /// Fields blocking the last predict action.
    #[must_use]
    pub fn blocking_fields(&self) -> Vec<PatientField> {
        self.incomplete
            .as_ref()
            .map(IncompleteInput::fields)
            .unwrap_or_default()
    }

    /// States visited since the session started.
    #[must_use]
    pub fn trace(&self) -> &[SessionState] {
        &self.trace
    }

    fn enter(&mut self, state: SessionState) {
        tracing::debug!("Session state: {:?} -> {:?}", self.state, state);
        self.state = state;
        self.trace.push(state);
    }

    /// Edit a single field. Any edit returns the session to `AwaitingInput`.
    pub fn edit(&mut self, field: PatientField, edit: FieldEdit) {
        self.inputs.apply(field, edit);
        self.incomplete = None;
        if self.state != SessionState::AwaitingInput {
            self.enter(SessionState::AwaitingInput);
        }
    }

    /// Replace the whole snapshot (e.g. loading a sample patient).
    pub fn replace_inputs(&mut self, inputs: PatientInputs) {
        self.inputs = inputs;
        self.incomplete = None;
        if self.state != SessionState::AwaitingInput {
            self.enter(SessionState::AwaitingInput);
        }
    }

    /// Clear every field and any result.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Handle the predict action against the current snapshot.
    ///
    /// A new result fully replaces the previous one; an incomplete snapshot
    /// clears it.
    pub fn trigger_predict<C: Classifier>(
        &mut self,
        service: &PredictionService<C>,
    ) -> SessionOutcome {
        self.enter(SessionState::Validating);

        match self.inputs.assemble() {
            Err(incomplete) => {
                self.enter(SessionState::Incomplete);
                tracing::info!("{}", incomplete.notice());
                self.result = None;
                self.predicted_at = None;
                self.incomplete = Some(incomplete.clone());
                self.enter(SessionState::AwaitingInput);
                SessionOutcome::Incomplete(incomplete)
            }
            Ok(features) => {
                self.enter(SessionState::Predicting);
                let result = service.predict_risk(&features);
                self.result = Some(result);
                self.predicted_at = Some(Utc::now());
                self.incomplete = None;
                self.enter(SessionState::ResultShown);
                SessionOutcome::Predicted(result)
            }
        }
    }
}
