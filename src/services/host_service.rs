//! Host-issued transitions shared by the REST routes and the host socket.

use std::time::SystemTime;

use tracing::{info, warn};

use crate::{
    dto::host::{CommandResponse, HostCommand},
    error::ServiceError,
    services::live_events,
    state::{
        SessionHandle, SharedState,
        session::Transition,
        state_machine::FinishReason,
    },
};

/// Apply `command` to the session and broadcast the resulting frames.
///
/// The session stays untouched when the command does not fit the current phase.
pub async fn run_command(
    state: &SharedState,
    handle: &SessionHandle,
    command: HostCommand,
    question_count: Option<usize>,
) -> Result<CommandResponse, ServiceError> {
    let config = state.config();
    let mut session = handle.write().await;
    let now = SystemTime::now();

    let result = match command {
        HostCommand::Start => session.start(question_count, now),
        HostCommand::EndQuestion => session.end_question(now),
        HostCommand::NextQuestion => session.next_question(now),
        HostCommand::Finish => session.finish(now),
    };

    let transition = match result {
        Ok(transition) => transition,
        Err(err) => {
            warn!(
                code = %handle.code(),
                command = command.as_str(),
                phase = ?session.phase(),
                error = %err,
                "host command rejected"
            );
            return Err(ServiceError::from(err));
        }
    };

    live_events::broadcast_transition(handle.hub(), &session, &config, transition);
    info!(
        code = %handle.code(),
        command = command.as_str(),
        version = session.version(),
        "host command applied"
    );

    Ok(CommandResponse::ok(describe(transition)))
}

fn describe(transition: Transition) -> String {
    match transition {
        Transition::QuestionOpened { question_id, .. } => format!("question {question_id} opened"),
        Transition::Revealed { question_id } => format!("question {question_id} revealed"),
        Transition::Finished(FinishReason::Completed) => "session completed".to_string(),
        Transition::Finished(FinishReason::HostFinished) => "session finished by host".to_string(),
    }
}

/// Turn a service failure into the socket acknowledgement.
pub fn rejection(err: &ServiceError) -> CommandResponse {
    match err {
        ServiceError::InvalidTransition(message) | ServiceError::InvalidInput(message) => {
            CommandResponse::rejected(message.clone())
        }
        other => CommandResponse::rejected(other.to_string()),
    }
}
