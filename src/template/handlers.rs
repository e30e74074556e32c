//! Inline handler sources for trigger resources.
//!
//! The sources are embedded in the template as `Code.ZipFile`, so they must
//! stay below the 4096 byte inline limit and may only import modules that
//! the Lambda Python runtime provides (`boto3`, `cfnresponse`).

use super::graph::HandlerKind;

/// Runtime used for handler functions.
pub const HANDLER_RUNTIME: &str = "python3.12";

/// Entry point of the inline module.
pub const HANDLER_ENTRY: &str = "index.handler";

/// Extra seconds a restart handler gets on top of the restart timeout.
pub const ECS_HANDLER_GRACE_SECS: u32 = 15;

/// Timeout of the Lambda replacement handler.
pub const LAMBDA_HANDLER_TIMEOUT_SECS: u32 = 20;

/// Environment variable carrying the restart timeout into the ECS handler.
pub const RESTART_TIMEOUT_ENV: &str = "RESTART_TIMEOUT_SECONDS";

const RESTART_ECS_SERVICE: &str = include_str!("handlers/restart_ecs_service.py");
const REPLACE_LAMBDA_CONTEXT: &str = include_str!("handlers/replace_lambda_context.py");

impl HandlerKind {
    /// Returns the inline source of the handler.
    #[must_use]
    pub const fn source(self) -> &'static str {
        match self {
            Self::RestartEcsService => RESTART_ECS_SERVICE,
            Self::ReplaceLambdaContext => REPLACE_LAMBDA_CONTEXT,
        }
    }

    /// Returns the custom resource type of triggers served by this handler.
    #[must_use]
    pub const fn trigger_type(self) -> &'static str {
        match self {
            Self::RestartEcsService => "Custom::RestartEcsService",
            Self::ReplaceLambdaContext => "Custom::ReplaceLambdaContext",
        }
    }

    /// Returns the logical id suffix of triggers served by this handler.
    #[must_use]
    pub const fn trigger_suffix(self) -> &'static str {
        match self {
            Self::RestartEcsService => "Restarter",
            Self::ReplaceLambdaContext => "Replacer",
        }
    }

    /// Returns the handler's function timeout.
    #[must_use]
    pub const fn timeout_secs(self, restart_timeout_secs: u32) -> u32 {
        match self {
            Self::RestartEcsService => restart_timeout_secs + ECS_HANDLER_GRACE_SECS,
            Self::ReplaceLambdaContext => LAMBDA_HANDLER_TIMEOUT_SECS,
        }
    }

    /// Returns a human readable description for the function.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::RestartEcsService => "Restarts an ECS service after its configuration changed",
            Self::ReplaceLambdaContext => {
                "Replaces Lambda execution contexts after their configuration changed"
            }
        }
    }
}
