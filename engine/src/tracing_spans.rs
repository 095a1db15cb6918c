//! Pre-built [`tracing::Span`] constructors for the workflow phases.
//!
//! Consistent span names and field sets make it easy to follow one verification,
//! and its UBO children, through interleaved logs.

use tracing::{info_span, Span};

use veriflow_types::{AgentKind, VerificationId, VerificationType};

/// Span covering one workflow from pickup to terminal state.
pub fn workflow_span(
    id: &VerificationId,
    verification_type: VerificationType,
    parent: Option<&VerificationId>,
) -> Span {
    match parent {
        Some(parent) => info_span!(
            "workflow",
            verification_id = %id,
            verification_type = %verification_type,
            parent = %parent
        ),
        None => info_span!("workflow", verification_id = %id, verification_type = %verification_type),
    }
}

/// Span covering evidence acquisition.
pub fn acquisition_span(subject: &str) -> Span {
    info_span!("acquisition", subject = %subject)
}

/// Span covering a single agent run.
pub fn agent_span(kind: AgentKind) -> Span {
    info_span!("agent", agent = %kind)
}

/// Span covering the wait for UBO children.
pub fn ubo_join_span(children: usize) -> Span {
    info_span!("ubo_join", children = %children)
}

/// Span covering report compilation.
pub fn compile_span(results: usize) -> Span {
    info_span!("compile", results = %results)
}
