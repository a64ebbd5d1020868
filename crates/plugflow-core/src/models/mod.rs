pub mod agent;
pub mod workflow;

pub use agent::{
    AgentCapability, AgentContext, AgentDefinition, AgentMessage, AgentResponse, AgentStatus,
    EntryPoint,
};
pub use workflow::{
    ConditionKind, ErrorDetails, FailureKind, LogicalOperator, LoopItems, StepCondition,
    StepIndex, StepKind, StepResult, StepType, WorkflowBuilder, WorkflowContext,
    WorkflowDefinition, WorkflowResult, WorkflowStatus, WorkflowStep,
};

/// Free-form JSON object used for variables, configs, outputs and results.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;

/// Serialize `Duration` values as fractional seconds.
pub(crate) mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(
            value: &Option<Duration>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(d) => serializer.serialize_some(&d.as_secs_f64()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Duration>, D::Error> {
            match Option::<f64>::deserialize(deserializer)? {
                Some(secs) => Duration::try_from_secs_f64(secs)
                    .map(Some)
                    .map_err(serde::de::Error::custom),
                None => Ok(None),
            }
        }
    }
}
