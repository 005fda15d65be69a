//! Answer intake for the play socket.

use std::time::SystemTime;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    error::ServiceError,
    services::live_events,
    state::{SessionHandle, session::AnswerReceipt},
};

/// Record an answer and broadcast the updated answer count.
///
/// `answer_ms` is the client-reported delay since publication; negative
/// values are treated as zero.
pub async fn submit_answer(
    handle: &SessionHandle,
    player_id: Uuid,
    question_id: u32,
    selection: &[u32],
    answer_ms: Option<i64>,
) -> Result<AnswerReceipt, ServiceError> {
    let latency = answer_ms.map(|ms| ms.max(0) as u64);

    let mut session = handle.write().await;
    let receipt = session
        .submit(player_id, question_id, selection, latency, SystemTime::now())
        .inspect_err(|err| {
            warn!(
                code = %handle.code(),
                player_id = %player_id,
                question_id,
                error = %err,
                "answer rejected"
            );
        })?;

    live_events::broadcast_answer_progress(handle.hub(), &receipt);
    debug!(
        code = %handle.code(),
        player_id = %player_id,
        question_id,
        answered = receipt.answered_count,
        total = receipt.total_players,
        "answer recorded"
    );
    Ok(receipt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{
        feed::tests::single,
        session::tests::{epoch, session_with},
    };

    #[tokio::test]
    async fn accepted_answers_broadcast_progress_once() {
        let mut session = session_with(vec![single("one", 0, 3)]);
        let alice = session.join("alice", None, None, epoch(0)).unwrap().player_id;
        session.join("bob", None, None, epoch(1)).unwrap();
        session.start(None, SystemTime::now()).unwrap();

        let handle = SessionHandle::new(session, 8);
        let mut play = handle.hub().play().subscribe();

        let receipt = submit_answer(&handle, alice, 1, &[1], Some(-20)).await.unwrap();
        assert_eq!(receipt.answered_count, 1);
        assert_eq!(receipt.total_players, 2);

        let event = play.recv().await.unwrap();
        assert_eq!(event.event, "answer_progress");
        assert!(event.data.contains("\"answered_count\":1"));

        let duplicate = submit_answer(&handle, alice, 1, &[2], None).await.unwrap_err();
        assert_eq!(duplicate.code(), "duplicate_answer");
        assert!(play.try_recv().is_err());
    }

    #[tokio::test]
    async fn answers_outside_the_window_are_refused() {
        let mut session = session_with(vec![single("one", 0, 3)]);
        let alice = session.join("alice", None, None, epoch(0)).unwrap().player_id;
        let handle = SessionHandle::new(session, 8);

        let err = submit_answer(&handle, alice, 1, &[1], None).await.unwrap_err();
        assert_eq!(err.code(), "out_of_window");

        let err = submit_answer(&handle, Uuid::new_v4(), 1, &[1], None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "unknown_player");
    }
}
