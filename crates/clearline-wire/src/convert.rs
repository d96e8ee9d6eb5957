//! Conversions between wire records and the domain model.

use clearline_types::{Channel, Session};

use crate::messages::{WireChannel, WireSession};

impl From<WireSession> for Session {
    fn from(wire: WireSession) -> Self {
        Session {
            id: wire.app_session_id,
            participants: wire.participants,
            allocations: wire.allocations,
            status: wire.status,
            nonce: wire.nonce,
            created_at: wire.created_at,
        }
    }
}

impl From<Session> for WireSession {
    fn from(session: Session) -> Self {
        WireSession {
            app_session_id: session.id,
            status: session.status,
            participants: session.participants,
            allocations: session.allocations,
            nonce: session.nonce,
            created_at: session.created_at,
        }
    }
}

impl From<WireChannel> for Channel {
    fn from(wire: WireChannel) -> Self {
        Channel {
            id: wire.channel_id,
            status: wire.status,
            token: wire.token,
            chain_id: wire.chain_id,
            amount: wire.amount,
        }
    }
}

impl From<Channel> for WireChannel {
    fn from(channel: Channel) -> Self {
        WireChannel {
            channel_id: channel.id,
            status: channel.status,
            token: channel.token,
            chain_id: channel.chain_id,
            amount: channel.amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use clearline_types::{Address, ChannelStatus, Session, SessionStatus};

    use crate::messages::{WireChannel, WireSession};

    #[test]
    fn session_conversion_keeps_the_remote_id() {
        let wire = WireSession {
            app_session_id: "0xSESSION1".into(),
            status: SessionStatus::Open,
            participants: vec![Address::new([0x01; 20])],
            allocations: Vec::new(),
            nonce: 3,
            created_at: 1000,
        };
        let session = Session::from(wire.clone());
        assert_eq!(session.id, wire.app_session_id);
        assert_eq!(WireSession::from(session), wire);
    }

    #[test]
    fn channel_conversion_round_trips() {
        let wire = WireChannel {
            channel_id: "0xchan1".into(),
            status: ChannelStatus::Open,
            token: Address::new([0xaa; 20]),
            chain_id: 1337,
            amount: "25".to_string(),
        };
        let channel = clearline_types::Channel::from(wire.clone());
        assert_eq!(WireChannel::from(channel), wire);
    }
}
