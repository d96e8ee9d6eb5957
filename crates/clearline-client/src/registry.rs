//! Session/channel registry: lifecycle operations plus a local cache kept
//! consistent with the authority through responses and push notifications.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use clearline_types::{
    Address, Allocation, ChainId, Channel, ChannelId, LedgerBalance, Session, SessionId,
    SupportedAsset,
};
use clearline_wire::{
    method, unix_millis_now, BalanceUpdateNotice, ChannelUpdateNotice, CloseChannelParams,
    CloseSessionParams, CreateChannelParams, CreateSessionParams, GetAssetsResult,
    GetBalancesResult, GetChannelsResult, PaymentRecord, ResizeChannelParams, ResponseFrame,
    SessionDefinition, SessionUpdateNotice, TransferParams, WireChannel, WireSession,
};
use serde_json::Value;
use tracing::warn;

use crate::config::RegistryLimits;
use crate::connection::{ClientError, Connection};
use crate::events::{EventBus, EventKind, Subscription};

/// Which pool a channel resize draws from. The two are mutually exclusive by
/// construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResizeIntent {
    /// Move funds between the off-chain ledger and the channel; no on-chain
    /// cost.
    Allocate(String),
    /// Move funds between on-chain custody and the channel; costs an
    /// on-chain transaction.
    OnChain(String),
}

#[derive(Default)]
struct RegistryCache {
    sessions: HashMap<SessionId, Session>,
    closed_sessions: Vec<Session>,
    channels: HashMap<ChannelId, Channel>,
    balances: HashMap<String, LedgerBalance>,
    assets: Vec<SupportedAsset>,
}

/// Registry of sessions, channels, and ledger balances. All cache mutations
/// flow through the response path or the dispatcher subscriptions, so there
/// is a single logical writer.
pub struct Registry {
    conn: Connection,
    cache: Arc<Mutex<RegistryCache>>,
    limits: RegistryLimits,
    _subscriptions: Vec<Subscription>,
}

impl Registry {
    pub(crate) fn new(conn: Connection, events: &EventBus, limits: RegistryLimits) -> Self {
        let cache = Arc::new(Mutex::new(RegistryCache::default()));
        let max_closed = limits.max_closed_sessions;
        let subscriptions = vec![
            {
                let cache = cache.clone();
                events.subscribe(EventKind::Assets, move |payload| {
                    apply_assets(&cache, payload)
                })
            },
            {
                let cache = cache.clone();
                events.subscribe(EventKind::BalanceUpdate, move |payload| {
                    apply_balance_update(&cache, payload)
                })
            },
            {
                let cache = cache.clone();
                events.subscribe(EventKind::ChannelUpdate, move |payload| {
                    apply_channel_update(&cache, payload)
                })
            },
            {
                let cache = cache.clone();
                events.subscribe(EventKind::SessionUpdate, move |payload| {
                    apply_session_update(&cache, max_closed, payload)
                })
            },
        ];
        Self {
            conn,
            cache,
            limits,
            _subscriptions: subscriptions,
        }
    }

    // ---- session lifecycle ----

    /// Open a session with a counterparty. The returned session's id is the
    /// one assigned by the authority in the response payload.
    pub async fn create_session(
        &self,
        protocol: &str,
        counterparty: Address,
        self_allocation: &str,
        counterparty_allocation: &str,
        asset: &str,
    ) -> Result<Session, ClientError> {
        let me = self.conn.identity().ok_or(ClientError::NotAuthenticated)?;
        let params = CreateSessionParams {
            definition: SessionDefinition {
                protocol: protocol.to_string(),
                participants: vec![me, counterparty],
                weights: vec![100, 0],
                quorum: 100,
                nonce: unix_millis_now(),
            },
            allocations: vec![
                Allocation {
                    participant: me,
                    asset: asset.to_string(),
                    amount: self_allocation.to_string(),
                },
                Allocation {
                    participant: counterparty,
                    asset: asset.to_string(),
                    amount: counterparty_allocation.to_string(),
                },
            ],
        };
        let response = self.conn.call(method::CREATE_SESSION, encode(&params)?).await?;
        let session = Session::from(decode::<WireSession>(&response)?);
        self.cache
            .lock()
            .unwrap()
            .sessions
            .insert(session.id.clone(), session.clone());
        Ok(session)
    }

    /// Close a session, submitting its final allocations. The session is
    /// evicted from the active cache and retained in the audit list.
    pub async fn close_session(&self, id: &SessionId) -> Result<Session, ClientError> {
        let allocations = self
            .cache
            .lock()
            .unwrap()
            .sessions
            .get(id)
            .map(|session| session.allocations.clone())
            .ok_or_else(|| ClientError::UnknownSession(id.clone()))?;
        let params = CloseSessionParams {
            app_session_id: id.clone(),
            allocations,
        };
        let response = self.conn.call(method::CLOSE_SESSION, encode(&params)?).await?;
        let session = Session::from(decode::<WireSession>(&response)?);
        {
            let mut cache = self.cache.lock().unwrap();
            cache.sessions.remove(id);
            push_closed(&mut cache, session.clone(), self.limits.max_closed_sessions);
        }
        Ok(session)
    }

    // ---- channel lifecycle ----

    pub async fn create_channel(
        &self,
        chain_id: ChainId,
        token: Address,
    ) -> Result<Channel, ClientError> {
        let params = CreateChannelParams { chain_id, token };
        let response = self.conn.call(method::CREATE_CHANNEL, encode(&params)?).await?;
        Ok(self.cache_channel(decode::<WireChannel>(&response)?))
    }

    pub async fn resize_channel(
        &self,
        id: &ChannelId,
        intent: ResizeIntent,
        funds_destination: Address,
    ) -> Result<Channel, ClientError> {
        let (allocate_amount, resize_amount) = match intent {
            ResizeIntent::Allocate(amount) => (Some(amount), None),
            ResizeIntent::OnChain(amount) => (None, Some(amount)),
        };
        let params = ResizeChannelParams {
            channel_id: id.clone(),
            allocate_amount,
            resize_amount,
            funds_destination,
        };
        let response = self.conn.call(method::RESIZE_CHANNEL, encode(&params)?).await?;
        Ok(self.cache_channel(decode::<WireChannel>(&response)?))
    }

    pub async fn close_channel(
        &self,
        id: &ChannelId,
        funds_destination: Address,
    ) -> Result<Channel, ClientError> {
        let params = CloseChannelParams {
            channel_id: id.clone(),
            funds_destination,
        };
        let response = self.conn.call(method::CLOSE_CHANNEL, encode(&params)?).await?;
        Ok(self.cache_channel(decode::<WireChannel>(&response)?))
    }

    // ---- ledger ----

    /// Pay a counterparty from the off-chain ledger.
    pub async fn transfer(
        &self,
        destination: Address,
        asset: &str,
        amount: &str,
    ) -> Result<PaymentRecord, ClientError> {
        let params = TransferParams {
            destination,
            asset: asset.to_string(),
            amount: amount.to_string(),
        };
        let response = self.conn.call(method::TRANSFER, encode(&params)?).await?;
        decode(&response)
    }

    pub async fn get_balances(&self) -> Result<Vec<LedgerBalance>, ClientError> {
        let response = self
            .conn
            .call(method::GET_BALANCES, Value::Object(Default::default()))
            .await?;
        let result: GetBalancesResult = decode(&response)?;
        {
            let mut cache = self.cache.lock().unwrap();
            cache.balances.clear();
            for balance in &result.ledger_balances {
                cache.balances.insert(balance.asset.clone(), balance.clone());
            }
        }
        Ok(result.ledger_balances)
    }

    pub async fn get_channels(&self) -> Result<Vec<Channel>, ClientError> {
        let response = self
            .conn
            .call(method::GET_CHANNELS, Value::Object(Default::default()))
            .await?;
        let result: GetChannelsResult = decode(&response)?;
        let channels: Vec<Channel> = result.channels.into_iter().map(Channel::from).collect();
        {
            let mut cache = self.cache.lock().unwrap();
            for channel in &channels {
                cache.channels.insert(channel.id.clone(), channel.clone());
            }
        }
        Ok(channels)
    }

    pub async fn get_assets(&self) -> Result<Vec<SupportedAsset>, ClientError> {
        let response = self
            .conn
            .call(method::GET_ASSETS, Value::Object(Default::default()))
            .await?;
        let result: GetAssetsResult = decode(&response)?;
        self.cache.lock().unwrap().assets = result.assets.clone();
        Ok(result.assets)
    }

    // ---- cached views ----

    pub fn session(&self, id: &SessionId) -> Option<Session> {
        self.cache.lock().unwrap().sessions.get(id).cloned()
    }

    pub fn sessions(&self) -> Vec<Session> {
        self.cache.lock().unwrap().sessions.values().cloned().collect()
    }

    pub fn closed_sessions(&self) -> Vec<Session> {
        self.cache.lock().unwrap().closed_sessions.clone()
    }

    pub fn channel(&self, id: &ChannelId) -> Option<Channel> {
        self.cache.lock().unwrap().channels.get(id).cloned()
    }

    pub fn channels(&self) -> Vec<Channel> {
        self.cache.lock().unwrap().channels.values().cloned().collect()
    }

    pub fn balance(&self, asset: &str) -> Option<LedgerBalance> {
        self.cache.lock().unwrap().balances.get(asset).cloned()
    }

    pub fn balances(&self) -> Vec<LedgerBalance> {
        self.cache.lock().unwrap().balances.values().cloned().collect()
    }

    /// The asset table as last broadcast or queried. Dynamic only; there is
    /// no static fallback.
    pub fn supported_assets(&self) -> Vec<SupportedAsset> {
        self.cache.lock().unwrap().assets.clone()
    }

    pub fn asset_by_symbol(&self, symbol: &str) -> Option<SupportedAsset> {
        self.cache
            .lock()
            .unwrap()
            .assets
            .iter()
            .find(|asset| asset.symbol == symbol)
            .cloned()
    }

    fn cache_channel(&self, wire: WireChannel) -> Channel {
        let channel = Channel::from(wire);
        self.cache
            .lock()
            .unwrap()
            .channels
            .insert(channel.id.clone(), channel.clone());
        channel
    }
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Value, ClientError> {
    serde_json::to_value(value)
        .map_err(|err| clearline_wire::WireError::Encode(err.to_string()).into())
}

fn decode<T: serde::de::DeserializeOwned>(response: &ResponseFrame) -> Result<T, ClientError> {
    serde_json::from_value(response.result().clone())
        .map_err(|err| ClientError::UnexpectedResponse(err.to_string()))
}

// Merge rules: entity id is the merge key, replace-if-present else append.

fn apply_assets(cache: &Mutex<RegistryCache>, payload: &Value) {
    match serde_json::from_value::<GetAssetsResult>(payload.clone()) {
        Ok(notice) => cache.lock().unwrap().assets = notice.assets,
        Err(err) => warn!(error = %err, "malformed assets broadcast"),
    }
}

fn apply_balance_update(cache: &Mutex<RegistryCache>, payload: &Value) {
    match serde_json::from_value::<BalanceUpdateNotice>(payload.clone()) {
        Ok(notice) => {
            let mut cache = cache.lock().unwrap();
            for balance in notice.balance_updates {
                cache.balances.insert(balance.asset.clone(), balance);
            }
        }
        Err(err) => warn!(error = %err, "malformed balance broadcast"),
    }
}

fn apply_channel_update(cache: &Mutex<RegistryCache>, payload: &Value) {
    match serde_json::from_value::<ChannelUpdateNotice>(payload.clone()) {
        Ok(notice) => {
            let mut cache = cache.lock().unwrap();
            for channel in notice.channels.into_iter().map(Channel::from) {
                cache.channels.insert(channel.id.clone(), channel);
            }
        }
        Err(err) => warn!(error = %err, "malformed channel broadcast"),
    }
}

fn apply_session_update(cache: &Mutex<RegistryCache>, max_closed: usize, payload: &Value) {
    match serde_json::from_value::<SessionUpdateNotice>(payload.clone()) {
        Ok(notice) => {
            let session = Session::from(notice.app_session);
            let mut cache = cache.lock().unwrap();
            if session.is_closed() {
                cache.sessions.remove(&session.id);
                push_closed(&mut cache, session, max_closed);
            } else {
                cache.sessions.insert(session.id.clone(), session);
            }
        }
        Err(err) => warn!(error = %err, "malformed session broadcast"),
    }
}

fn push_closed(cache: &mut RegistryCache, session: Session, max_closed: usize) {
    cache.closed_sessions.push(session);
    if cache.closed_sessions.len() > max_closed {
        let excess = cache.closed_sessions.len() - max_closed;
        cache.closed_sessions.drain(..excess);
    }
}
