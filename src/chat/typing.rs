use crate::{
    db::ConversationId,
    registry::{Connection, Registry},
};

use super::protocol::{ServerEvent, TypingPayload};

/// Relay a typing indicator to the other members' connections in the room.
/// Nothing is stored.
///
/// Returns how many connections got it; a connection that never joined the
/// room is ignored.
pub(crate) fn relay(registry: &Registry, conn: &Connection, conversation_id: ConversationId, typing: bool) -> usize {
    if !registry.is_subscribed(conn.id(), conversation_id) {
        tracing::trace!(connection = %conn.id(), conversation_id, "typing outside a joined room");
        return 0;
    }

    let payload = TypingPayload::new(conn.identity(), conversation_id);
    let event = if typing {
        ServerEvent::UserTyping(payload)
    } else {
        ServerEvent::UserStopTyping(payload)
    };
    registry.broadcast(conversation_id, &event, Some(conn.user_id()))
}
