//! Challenge-response handshake.
//!
//! Flow: generate a connection-scoped session key, send the auth request
//! (identity + AuthParams, unsigned envelope), sign the returned challenge
//! with the wallet's structured scheme, verify, and hand the session-key
//! signer plus the validity token back to the connection.

use std::sync::Arc;

use clearline_crypto::{MessageSigner, SessionKeySigner, WalletSigner};
use clearline_types::{AuthParams, ChallengeEnvelope, CryptoError};
use clearline_wire::{
    method, unix_millis_now, AuthChallengeResult, AuthRequestParams, AuthVerifyParams,
    AuthVerifyResult, RequestFrame,
};
use thiserror::Error;
use tracing::debug;

use crate::connection::{ConnInner, Credentials};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("auth request failed: {0}")]
    Request(String),
    #[error("malformed challenge: {0}")]
    MalformedChallenge(String),
    #[error("wallet signing failed: {0}")]
    WalletSign(#[from] CryptoError),
    #[error("verification failed: {0}")]
    Verification(String),
    #[error("encode failed: {0}")]
    Encode(String),
}

pub(crate) struct AuthOutcome {
    pub token: String,
    pub session_signer: SessionKeySigner,
}

pub(crate) async fn authenticate(
    inner: &Arc<ConnInner>,
    credentials: &Credentials,
) -> Result<AuthOutcome, AuthError> {
    let cfg = &inner.config.auth;
    let session_signer = SessionKeySigner::random();

    // Built once. The outgoing request and the signed challenge digest both
    // read from this instance, so they cannot diverge.
    let params = AuthParams {
        scope: cfg.scope.clone(),
        session_key_address: session_signer.address(),
        expires_at: unix_millis_now() + cfg.session_ttl.as_millis() as u64,
        allowances: cfg.allowances.clone(),
        application_id: cfg.application_id.clone(),
    };

    let request = AuthRequestParams {
        address: credentials.address,
        params: params.clone(),
    };
    let frame = RequestFrame::new(
        method::AUTH_REQUEST,
        serde_json::to_value(&request).map_err(|err| AuthError::Encode(err.to_string()))?,
        unix_millis_now(),
    );
    let response = ConnInner::send_and_await(inner, frame)
        .await
        .map_err(|err| AuthError::Request(err.to_string()))?;
    if response.method() != method::AUTH_CHALLENGE {
        return Err(AuthError::MalformedChallenge(format!(
            "unexpected method `{}`",
            response.method()
        )));
    }
    let challenge: AuthChallengeResult = serde_json::from_value(response.result().clone())
        .map_err(|err| AuthError::MalformedChallenge(err.to_string()))?;
    debug!("auth challenge received");

    let envelope = ChallengeEnvelope {
        challenge: challenge.challenge_message,
        wallet: credentials.address,
        params,
    };
    let signature = credentials.wallet.sign_auth_challenge(&envelope)?;

    let verify = AuthVerifyParams {
        challenge: envelope.challenge.clone(),
    };
    let mut frame = RequestFrame::new(
        method::AUTH_VERIFY,
        serde_json::to_value(&verify).map_err(|err| AuthError::Encode(err.to_string()))?,
        unix_millis_now(),
    );
    frame.push_signature(signature.to_string());
    let response = ConnInner::send_and_await(inner, frame)
        .await
        .map_err(|err| AuthError::Verification(err.to_string()))?;
    let result: AuthVerifyResult = serde_json::from_value(response.result().clone())
        .map_err(|err| AuthError::Verification(err.to_string()))?;
    if result.session_key_address != session_signer.address() {
        return Err(AuthError::Verification(
            "authority registered a different session key".to_string(),
        ));
    }

    Ok(AuthOutcome {
        token: result.token,
        session_signer,
    })
}
