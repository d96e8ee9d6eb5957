//! MockNode: in-memory clearing authority with signature verification,
//! remote id assignment, ledger balances, and fault injection.

use std::collections::{BTreeMap, HashMap, HashSet};

use clearline_crypto::{auth_challenge_digest, envelope_digest, Signature};
use clearline_types::{
    Address, AuthParams, ChainId, ChallengeEnvelope, ChannelId, ChannelStatus, LedgerBalance,
    SessionId, SessionStatus, SupportedAsset,
};
use clearline_wire::{
    method, unix_millis_now, AuthChallengeResult, AuthRequestParams, AuthVerifyParams,
    AuthVerifyResult, BalanceUpdateNotice, CloseChannelParams, CloseSessionParams,
    CreateChannelParams, CreateSessionParams, ErrorResult, GetAssetsResult, GetBalancesResult,
    GetChannelsResult, PaymentRecord, RequestFrame, ResizeChannelParams, ResponseFrame,
    TransferParams, WireChannel, WireSession, BROADCAST_ID,
};
use serde_json::Value;

#[derive(Debug, Clone, Default)]
struct AuthState {
    pending: Option<PendingAuth>,
    wallet: Option<Address>,
    session_key: Option<Address>,
    authed: bool,
}

#[derive(Debug, Clone)]
struct PendingAuth {
    address: Address,
    params: AuthParams,
    challenge: String,
}

/// In-memory clearing node. Ledger state persists across links; the auth
/// state is per-link and reset by `begin_link`.
#[derive(Debug, Clone)]
pub struct MockNode {
    chain_id: ChainId,
    assets: Vec<SupportedAsset>,
    balances: BTreeMap<String, f64>,
    sessions: BTreeMap<SessionId, WireSession>,
    channels: BTreeMap<ChannelId, WireChannel>,
    session_counter: u64,
    channel_counter: u64,
    next_session_id: Option<SessionId>,
    auth: AuthState,
    requests_seen: HashMap<String, u32>,
    last_auth_params: Option<AuthParams>,
    pub drop_methods: HashSet<String>,
    pub fail_methods: HashMap<String, String>,
    pub reject_auth: bool,
}

impl MockNode {
    pub fn new(chain_id: ChainId) -> Self {
        Self {
            chain_id,
            assets: Vec::new(),
            balances: BTreeMap::new(),
            sessions: BTreeMap::new(),
            channels: BTreeMap::new(),
            session_counter: 0,
            channel_counter: 0,
            next_session_id: None,
            auth: AuthState::default(),
            requests_seen: HashMap::new(),
            last_auth_params: None,
            drop_methods: HashSet::new(),
            fail_methods: HashMap::new(),
            reject_auth: false,
        }
    }

    pub fn with_asset(mut self, asset: SupportedAsset) -> Self {
        self.assets.push(asset);
        self
    }

    pub fn with_balance(mut self, symbol: impl Into<String>, available: f64) -> Self {
        self.balances.insert(symbol.into(), available);
        self
    }

    /// Reset per-link state. Called whenever a new transport link opens so a
    /// reconnecting client must re-authenticate.
    pub fn begin_link(&mut self) {
        self.auth = AuthState::default();
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth.authed
    }

    pub fn session_key(&self) -> Option<Address> {
        self.auth.session_key
    }

    pub fn requests_seen(&self, method: &str) -> u32 {
        self.requests_seen.get(method).copied().unwrap_or(0)
    }

    /// AuthParams carried by the most recent auth request, as the server saw
    /// them.
    pub fn last_auth_params(&self) -> Option<&AuthParams> {
        self.last_auth_params.as_ref()
    }

    /// Force the id assigned to the next created session.
    pub fn set_next_session_id(&mut self, id: impl Into<SessionId>) {
        self.next_session_id = Some(id.into());
    }

    pub fn session(&self, id: &SessionId) -> Option<&WireSession> {
        self.sessions.get(id)
    }

    pub fn available_balance(&self, symbol: &str) -> Option<f64> {
        self.balances.get(symbol).copied()
    }

    /// Handle one request frame, returning zero or more outgoing frames
    /// (the correlated reply first, broadcasts after it).
    pub fn handle_frame(&mut self, text: &str) -> Vec<String> {
        let frame = match RequestFrame::from_text(text) {
            Ok(frame) => frame,
            Err(err) => return vec![error_frame(BROADCAST_ID, &format!("malformed frame: {err}"))],
        };
        let method_name = frame.method().to_string();
        *self.requests_seen.entry(method_name.clone()).or_default() += 1;

        if self.drop_methods.contains(&method_name) {
            return Vec::new();
        }
        if let Some(message) = self.fail_methods.get(&method_name) {
            return vec![error_frame(frame.id(), message)];
        }

        match method_name.as_str() {
            method::AUTH_REQUEST => self.on_auth_request(&frame),
            method::AUTH_VERIFY => self.on_auth_verify(&frame),
            _ => {
                if let Err(message) = self.verify_envelope(&frame) {
                    return vec![error_frame(frame.id(), &message)];
                }
                match method_name.as_str() {
                    method::PING => vec![reply(frame.id(), method::PONG, Value::Object(Default::default()))],
                    method::CREATE_SESSION => self.on_create_session(&frame),
                    method::CLOSE_SESSION => self.on_close_session(&frame),
                    method::CREATE_CHANNEL => self.on_create_channel(&frame),
                    method::RESIZE_CHANNEL => self.on_resize_channel(&frame),
                    method::CLOSE_CHANNEL => self.on_close_channel(&frame),
                    method::TRANSFER => self.on_transfer(&frame),
                    method::GET_BALANCES => vec![reply_value(frame.id(), method::GET_BALANCES, &GetBalancesResult {
                        ledger_balances: self.ledger_balances(),
                    })],
                    method::GET_CHANNELS => vec![reply_value(frame.id(), method::GET_CHANNELS, &GetChannelsResult {
                        channels: self.channels.values().cloned().collect(),
                    })],
                    method::GET_ASSETS => vec![reply_value(frame.id(), method::GET_ASSETS, &GetAssetsResult {
                        assets: self.assets.clone(),
                    })],
                    other => vec![error_frame(frame.id(), &format!("unknown method `{other}`"))],
                }
            }
        }
    }

    fn on_auth_request(&mut self, frame: &RequestFrame) -> Vec<String> {
        let request: AuthRequestParams = match serde_json::from_value(frame.params().clone()) {
            Ok(request) => request,
            Err(err) => return vec![error_frame(frame.id(), &format!("bad auth request: {err}"))],
        };
        let challenge = uuid::Uuid::new_v4().to_string();
        self.last_auth_params = Some(request.params.clone());
        self.auth.pending = Some(PendingAuth {
            address: request.address,
            params: request.params,
            challenge: challenge.clone(),
        });
        vec![reply_value(
            frame.id(),
            method::AUTH_CHALLENGE,
            &AuthChallengeResult {
                challenge_message: challenge,
            },
        )]
    }

    fn on_auth_verify(&mut self, frame: &RequestFrame) -> Vec<String> {
        if self.reject_auth {
            return vec![error_frame(frame.id(), "authentication rejected")];
        }
        let verify: AuthVerifyParams = match serde_json::from_value(frame.params().clone()) {
            Ok(verify) => verify,
            Err(err) => return vec![error_frame(frame.id(), &format!("bad auth verify: {err}"))],
        };
        let Some(pending) = self.auth.pending.clone() else {
            return vec![error_frame(frame.id(), "no challenge outstanding")];
        };
        if pending.challenge != verify.challenge {
            return vec![error_frame(frame.id(), "challenge mismatch")];
        }
        let Some(signature) = frame.sig.first() else {
            return vec![error_frame(frame.id(), "missing wallet signature")];
        };
        let signature = match Signature::from_hex(signature) {
            Ok(signature) => signature,
            Err(err) => return vec![error_frame(frame.id(), &format!("bad signature: {err}"))],
        };
        let digest = auth_challenge_digest(&ChallengeEnvelope {
            challenge: pending.challenge.clone(),
            wallet: pending.address,
            params: pending.params.clone(),
        });
        match signature.recover(digest) {
            Ok(recovered) if recovered == pending.address => {}
            Ok(_) => return vec![error_frame(frame.id(), "challenge signature mismatch")],
            Err(err) => return vec![error_frame(frame.id(), &format!("recovery failed: {err}"))],
        }

        self.auth.authed = true;
        self.auth.wallet = Some(pending.address);
        self.auth.session_key = Some(pending.params.session_key_address);
        self.auth.pending = None;

        let result = AuthVerifyResult {
            address: pending.address,
            session_key_address: pending.params.session_key_address,
            token: format!("jwt-{}", uuid::Uuid::new_v4()),
        };
        // A fresh connection immediately learns the asset table and its
        // ledger balances without asking.
        vec![
            reply_value(frame.id(), method::AUTH_VERIFY, &result),
            self.assets_frame(),
            self.balances_frame(),
        ]
    }

    fn verify_envelope(&self, frame: &RequestFrame) -> Result<(), String> {
        if !self.auth.authed {
            return Err("not authenticated".to_string());
        }
        let session_key = self.auth.session_key.ok_or("no session key registered")?;
        let signature = frame.sig.first().ok_or("missing envelope signature")?;
        let signature = Signature::from_hex(signature).map_err(|err| err.to_string())?;
        let payload = frame
            .signing_payload()
            .map_err(|err| format!("payload: {err}"))?;
        let recovered = signature
            .recover(envelope_digest(&payload))
            .map_err(|err| err.to_string())?;
        if recovered != session_key {
            return Err("envelope signature mismatch".to_string());
        }
        Ok(())
    }

    fn on_create_session(&mut self, frame: &RequestFrame) -> Vec<String> {
        let params: CreateSessionParams = match serde_json::from_value(frame.params().clone()) {
            Ok(params) => params,
            Err(err) => return vec![error_frame(frame.id(), &format!("bad params: {err}"))],
        };
        // Ids are assigned here; a client-supplied id is never echoed back.
        self.session_counter += 1;
        let id = self
            .next_session_id
            .take()
            .unwrap_or_else(|| SessionId::new(format!("0x{:064x}", self.session_counter)));
        let session = WireSession {
            app_session_id: id.clone(),
            status: SessionStatus::Open,
            participants: params.definition.participants,
            allocations: params.allocations,
            nonce: params.definition.nonce,
            created_at: unix_millis_now(),
        };
        self.sessions.insert(id, session.clone());
        vec![reply_value(frame.id(), method::CREATE_SESSION, &session)]
    }

    fn on_close_session(&mut self, frame: &RequestFrame) -> Vec<String> {
        let params: CloseSessionParams = match serde_json::from_value(frame.params().clone()) {
            Ok(params) => params,
            Err(err) => return vec![error_frame(frame.id(), &format!("bad params: {err}"))],
        };
        let Some(session) = self.sessions.get_mut(&params.app_session_id) else {
            return vec![error_frame(
                frame.id(),
                &format!("unknown session {}", params.app_session_id),
            )];
        };
        session.status = SessionStatus::Closed;
        if !params.allocations.is_empty() {
            session.allocations = params.allocations;
        }
        vec![reply_value(frame.id(), method::CLOSE_SESSION, &session.clone())]
    }

    fn on_create_channel(&mut self, frame: &RequestFrame) -> Vec<String> {
        let params: CreateChannelParams = match serde_json::from_value(frame.params().clone()) {
            Ok(params) => params,
            Err(err) => return vec![error_frame(frame.id(), &format!("bad params: {err}"))],
        };
        self.channel_counter += 1;
        let id = ChannelId::new(format!("0x{:064x}", 0xc0_0000 + self.channel_counter));
        let channel = WireChannel {
            channel_id: id.clone(),
            status: ChannelStatus::Open,
            token: params.token,
            chain_id: params.chain_id,
            amount: format_decimal(0.0),
        };
        self.channels.insert(id, channel.clone());
        vec![reply_value(frame.id(), method::CREATE_CHANNEL, &channel)]
    }

    fn on_resize_channel(&mut self, frame: &RequestFrame) -> Vec<String> {
        let params: ResizeChannelParams = match serde_json::from_value(frame.params().clone()) {
            Ok(params) => params,
            Err(err) => return vec![error_frame(frame.id(), &format!("bad params: {err}"))],
        };
        let delta = match (&params.allocate_amount, &params.resize_amount) {
            (Some(_), Some(_)) => {
                return vec![error_frame(
                    frame.id(),
                    "allocateAmount and resizeAmount are mutually exclusive",
                )]
            }
            (None, None) => return vec![error_frame(frame.id(), "missing resize amount")],
            (Some(amount), None) | (None, Some(amount)) => match amount.parse::<f64>() {
                Ok(delta) => delta,
                Err(_) => return vec![error_frame(frame.id(), "invalid amount")],
            },
        };
        let Some(channel) = self.channels.get_mut(&params.channel_id) else {
            return vec![error_frame(
                frame.id(),
                &format!("unknown channel {}", params.channel_id),
            )];
        };
        let current = channel.amount.parse::<f64>().unwrap_or(0.0);
        channel.amount = format_decimal(current + delta);
        vec![reply_value(frame.id(), method::RESIZE_CHANNEL, &channel.clone())]
    }

    fn on_close_channel(&mut self, frame: &RequestFrame) -> Vec<String> {
        let params: CloseChannelParams = match serde_json::from_value(frame.params().clone()) {
            Ok(params) => params,
            Err(err) => return vec![error_frame(frame.id(), &format!("bad params: {err}"))],
        };
        let Some(channel) = self.channels.get_mut(&params.channel_id) else {
            return vec![error_frame(
                frame.id(),
                &format!("unknown channel {}", params.channel_id),
            )];
        };
        channel.status = ChannelStatus::Closed;
        vec![reply_value(frame.id(), method::CLOSE_CHANNEL, &channel.clone())]
    }

    fn on_transfer(&mut self, frame: &RequestFrame) -> Vec<String> {
        let params: TransferParams = match serde_json::from_value(frame.params().clone()) {
            Ok(params) => params,
            Err(err) => return vec![error_frame(frame.id(), &format!("bad params: {err}"))],
        };
        let amount = match params.amount.parse::<f64>() {
            Ok(amount) if amount > 0.0 => amount,
            _ => return vec![error_frame(frame.id(), "invalid amount")],
        };
        let available = self.balances.get(&params.asset).copied().unwrap_or(0.0);
        if available < amount {
            return vec![error_frame(frame.id(), "insufficient balance")];
        }
        self.balances.insert(params.asset.clone(), available - amount);

        let record = PaymentRecord {
            from: self.auth.wallet.unwrap_or_default(),
            to: params.destination,
            asset: params.asset,
            amount: params.amount,
        };
        vec![
            reply_value(frame.id(), method::TRANSFER, &record),
            self.balances_frame(),
            broadcast_value(method::PAYMENT, &record),
        ]
    }

    fn ledger_balances(&self) -> Vec<LedgerBalance> {
        self.balances
            .iter()
            .map(|(symbol, available)| LedgerBalance {
                asset: symbol.clone(),
                available: format_decimal(*available),
                locked: format_decimal(0.0),
                total: format_decimal(*available),
            })
            .collect()
    }

    /// `assets` broadcast frame for the current asset table.
    pub fn assets_frame(&self) -> String {
        broadcast_value(
            method::ASSETS,
            &GetAssetsResult {
                assets: self.assets.clone(),
            },
        )
    }

    /// `balance_update` broadcast frame for the full ledger.
    pub fn balances_frame(&self) -> String {
        broadcast_value(
            method::BALANCE_UPDATE,
            &BalanceUpdateNotice {
                balance_updates: self.ledger_balances(),
            },
        )
    }

    /// One-off `balance_update` broadcast with explicit figures, for tests
    /// that push server-side changes.
    pub fn balance_update_frame(asset: &str, available: &str) -> String {
        broadcast_value(
            method::BALANCE_UPDATE,
            &BalanceUpdateNotice {
                balance_updates: vec![LedgerBalance {
                    asset: asset.to_string(),
                    available: available.to_string(),
                    locked: "0.0".to_string(),
                    total: available.to_string(),
                }],
            },
        )
    }

    /// `session_update` broadcast for a known session.
    pub fn session_update_frame(&self, id: &SessionId) -> Option<String> {
        let session = self.sessions.get(id)?;
        Some(broadcast_value(
            method::SESSION_UPDATE,
            &clearline_wire::SessionUpdateNotice {
                app_session: session.clone(),
            },
        ))
    }
}

fn reply(id: u64, method_name: &str, result: Value) -> String {
    ResponseFrame::new(id, method_name, result, unix_millis_now())
        .to_text()
        .expect("serialize response frame")
}

fn reply_value<T: serde::Serialize>(id: u64, method_name: &str, result: &T) -> String {
    reply(
        id,
        method_name,
        serde_json::to_value(result).expect("serialize result payload"),
    )
}

fn broadcast_value<T: serde::Serialize>(method_name: &str, result: &T) -> String {
    reply_value(BROADCAST_ID, method_name, result)
}

fn error_frame(id: u64, message: &str) -> String {
    reply_value(id, method::ERROR, &ErrorResult::new(message))
}

fn format_decimal(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
mod tests {
    use clearline_crypto::{LocalWallet, MessageSigner, SessionKeySigner, WalletSigner};
    use clearline_types::{Address, Allowance, AuthParams, ChallengeEnvelope};
    use clearline_wire::{
        method, unix_millis_now, AuthChallengeResult, AuthRequestParams, AuthVerifyParams,
        RequestFrame, ResponseFrame, WireSession,
    };
    use serde_json::json;

    use crate::scenarios::Scenario;

    fn authenticate(
        scenario: &mut Scenario,
        wallet: &LocalWallet,
        session: &SessionKeySigner,
    ) -> Vec<String> {
        let params = AuthParams {
            scope: "trading".to_string(),
            session_key_address: session.address(),
            expires_at: unix_millis_now() + 3_600_000,
            allowances: vec![Allowance {
                asset: "usdc".to_string(),
                amount: "100".to_string(),
            }],
            application_id: "clearline".to_string(),
        };
        let request = AuthRequestParams {
            address: wallet.address(),
            params: params.clone(),
        };
        let mut frame = RequestFrame::new(
            method::AUTH_REQUEST,
            serde_json::to_value(&request).unwrap(),
            1,
        );
        frame.set_id(1);
        let replies = scenario.node.handle_frame(&frame.to_text().unwrap());
        let challenge: AuthChallengeResult = serde_json::from_value(
            ResponseFrame::from_text(&replies[0]).unwrap().result().clone(),
        )
        .unwrap();

        let envelope = ChallengeEnvelope {
            challenge: challenge.challenge_message.clone(),
            wallet: wallet.address(),
            params,
        };
        let signature = wallet.sign_auth_challenge(&envelope).unwrap();
        let mut verify = RequestFrame::new(
            method::AUTH_VERIFY,
            serde_json::to_value(&AuthVerifyParams {
                challenge: challenge.challenge_message,
            })
            .unwrap(),
            2,
        );
        verify.set_id(2);
        verify.push_signature(signature.to_string());
        scenario.node.handle_frame(&verify.to_text().unwrap())
    }

    fn signed_call(session: &SessionKeySigner, id: u64, method_name: &str, params: serde_json::Value) -> String {
        let mut frame = RequestFrame::new(method_name, params, unix_millis_now());
        frame.set_id(id);
        let payload = frame.signing_payload().unwrap();
        frame.push_signature(session.sign_envelope(&payload).unwrap().to_string());
        frame.to_text().unwrap()
    }

    #[test]
    fn handshake_verifies_wallet_signature_and_pushes_state() {
        let mut scenario = Scenario::funded(1337);
        let wallet = LocalWallet::from_bytes(&[0x11; 32]).unwrap();
        let session = SessionKeySigner::from_bytes(&[0x22; 32]).unwrap();

        let replies = authenticate(&mut scenario, &wallet, &session);
        assert_eq!(replies.len(), 3, "verify reply plus two broadcasts");
        let verify = ResponseFrame::from_text(&replies[0]).unwrap();
        assert_eq!(verify.method(), method::AUTH_VERIFY);
        assert!(verify.result()["token"].as_str().unwrap().starts_with("jwt-"));

        let assets = ResponseFrame::from_text(&replies[1]).unwrap();
        assert!(assets.is_broadcast());
        assert_eq!(assets.method(), method::ASSETS);

        assert!(scenario.node.is_authenticated());
        assert_eq!(scenario.node.session_key(), Some(session.address()));
    }

    #[test]
    fn rejects_unsigned_calls_and_foreign_session_keys() {
        let mut scenario = Scenario::funded(1337);
        let wallet = LocalWallet::from_bytes(&[0x11; 32]).unwrap();
        let session = SessionKeySigner::from_bytes(&[0x22; 32]).unwrap();
        authenticate(&mut scenario, &wallet, &session);

        // Unsigned frame is refused.
        let mut unsigned = RequestFrame::new(method::GET_BALANCES, json!({}), 9);
        unsigned.set_id(9);
        let replies = scenario.node.handle_frame(&unsigned.to_text().unwrap());
        let reply = ResponseFrame::from_text(&replies[0]).unwrap();
        assert_eq!(reply.method(), method::ERROR);

        // A different session key is refused.
        let foreign = SessionKeySigner::from_bytes(&[0x33; 32]).unwrap();
        let replies = scenario
            .node
            .handle_frame(&signed_call(&foreign, 10, method::GET_BALANCES, json!({})));
        let reply = ResponseFrame::from_text(&replies[0]).unwrap();
        assert_eq!(reply.method(), method::ERROR);

        // The registered key goes through.
        let replies = scenario
            .node
            .handle_frame(&signed_call(&session, 11, method::GET_BALANCES, json!({})));
        let reply = ResponseFrame::from_text(&replies[0]).unwrap();
        assert_eq!(reply.method(), method::GET_BALANCES);
    }

    #[test]
    fn create_session_assigns_the_id() {
        let mut scenario = Scenario::funded(1337);
        let wallet = LocalWallet::from_bytes(&[0x11; 32]).unwrap();
        let session = SessionKeySigner::from_bytes(&[0x22; 32]).unwrap();
        authenticate(&mut scenario, &wallet, &session);
        scenario.node.set_next_session_id("0xSESSION1");

        let params = json!({
            "definition": {
                "protocol": "nitro-rpc-0.4",
                "participants": [wallet.address(), scenario.counterparty],
                "weights": [100, 0],
                "quorum": 100,
                "nonce": 7
            },
            "allocations": [
                { "participant": wallet.address(), "asset": "usdc", "amount": "50" },
                { "participant": scenario.counterparty, "asset": "usdc", "amount": "0" }
            ]
        });
        let replies = scenario
            .node
            .handle_frame(&signed_call(&session, 12, method::CREATE_SESSION, params));
        let reply = ResponseFrame::from_text(&replies[0]).unwrap();
        let created: WireSession = serde_json::from_value(reply.result().clone()).unwrap();
        assert_eq!(created.app_session_id.as_str(), "0xSESSION1");
        assert_eq!(created.nonce, 7);
    }

    #[test]
    fn resize_rejects_ambiguous_intent() {
        let mut scenario = Scenario::funded(1337);
        let wallet = LocalWallet::from_bytes(&[0x11; 32]).unwrap();
        let session = SessionKeySigner::from_bytes(&[0x22; 32]).unwrap();
        authenticate(&mut scenario, &wallet, &session);

        let created = scenario.node.handle_frame(&signed_call(
            &session,
            20,
            method::CREATE_CHANNEL,
            json!({ "chainId": 1337, "token": Address::new([0xaa; 20]) }),
        ));
        let channel = ResponseFrame::from_text(&created[0]).unwrap();
        let channel_id = channel.result()["channelId"].as_str().unwrap().to_string();

        let replies = scenario.node.handle_frame(&signed_call(
            &session,
            21,
            method::RESIZE_CHANNEL,
            json!({
                "channelId": channel_id,
                "allocateAmount": "10",
                "resizeAmount": "10",
                "fundsDestination": wallet.address()
            }),
        ));
        let reply = ResponseFrame::from_text(&replies[0]).unwrap();
        assert_eq!(reply.method(), method::ERROR);
        assert!(reply
            .error_message()
            .unwrap()
            .contains("mutually exclusive"));
    }

    #[test]
    fn drop_and_fail_knobs() {
        let mut scenario = Scenario::funded(1337);
        let wallet = LocalWallet::from_bytes(&[0x11; 32]).unwrap();
        let session = SessionKeySigner::from_bytes(&[0x22; 32]).unwrap();
        authenticate(&mut scenario, &wallet, &session);

        scenario
            .node
            .drop_methods
            .insert(method::GET_BALANCES.to_string());
        let replies = scenario
            .node
            .handle_frame(&signed_call(&session, 30, method::GET_BALANCES, json!({})));
        assert!(replies.is_empty(), "dropped method must produce no reply");

        scenario
            .node
            .fail_methods
            .insert(method::GET_CHANNELS.to_string(), "maintenance".to_string());
        let replies = scenario
            .node
            .handle_frame(&signed_call(&session, 31, method::GET_CHANNELS, json!({})));
        let reply = ResponseFrame::from_text(&replies[0]).unwrap();
        assert_eq!(reply.error_message().as_deref(), Some("maintenance"));
    }
}
