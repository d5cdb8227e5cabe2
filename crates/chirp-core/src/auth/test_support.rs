use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use url::Url;

use crate::rest::{Connect, OAuth1Transport, Reply};

use super::TokenPair;

/// Scripted transport double shared by handshake and service tests.
///
/// Replies are popped in order per method; an unscripted call panics so a
/// test asserting "no remote call happened" fails loudly.
#[derive(Clone, Default)]
pub(crate) struct ScriptedConnector {
    state: Arc<Mutex<State>>,
}

#[derive(Default)]
struct State {
    request_token: VecDeque<Reply<TokenPair>>,
    access_token: VecDeque<Reply<TokenPair>>,
    get: VecDeque<Reply<Value>>,
    post: VecDeque<Reply<Value>>,
    calls: Vec<String>,
    bound: Vec<Option<TokenPair>>,
    callbacks: Vec<String>,
    verifiers: Vec<String>,
}

impl ScriptedConnector {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_request_token(&self, reply: Reply<TokenPair>) {
        self.state.lock().unwrap().request_token.push_back(reply);
    }

    pub(crate) fn push_access_token(&self, reply: Reply<TokenPair>) {
        self.state.lock().unwrap().access_token.push_back(reply);
    }

    pub(crate) fn push_get(&self, reply: Reply<Value>) {
        self.state.lock().unwrap().get.push_back(reply);
    }

    pub(crate) fn push_post(&self, reply: Reply<Value>) {
        self.state.lock().unwrap().post.push_back(reply);
    }

    /// Remote calls observed so far, in order.
    pub(crate) fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Token pairs bound at each `connect`.
    pub(crate) fn bound_tokens(&self) -> Vec<Option<TokenPair>> {
        self.state.lock().unwrap().bound.clone()
    }

    pub(crate) fn callbacks(&self) -> Vec<String> {
        self.state.lock().unwrap().callbacks.clone()
    }

    pub(crate) fn verifiers(&self) -> Vec<String> {
        self.state.lock().unwrap().verifiers.clone()
    }
}

impl Connect for ScriptedConnector {
    type Transport = ScriptedTransport;

    fn connect(&self, tokens: Option<TokenPair>) -> ScriptedTransport {
        self.state.lock().unwrap().bound.push(tokens.clone());
        ScriptedTransport {
            state: self.state.clone(),
            tokens,
        }
    }
}

pub(crate) struct ScriptedTransport {
    state: Arc<Mutex<State>>,
    #[allow(dead_code)]
    tokens: Option<TokenPair>,
}

impl OAuth1Transport for ScriptedTransport {
    async fn request_token(&self, callback: &str) -> Reply<TokenPair> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("request_token".into());
        state.callbacks.push(callback.to_owned());
        state
            .request_token
            .pop_front()
            .expect("unscripted request_token call")
    }

    fn authorize_url(&self, token: &str) -> Url {
        let mut url = Url::parse("https://social.example/oauth/authorize").unwrap();
        url.query_pairs_mut().append_pair("oauth_token", token);
        url
    }

    async fn access_token(&self, verifier: &str) -> Reply<TokenPair> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("access_token".into());
        state.verifiers.push(verifier.to_owned());
        state
            .access_token
            .pop_front()
            .expect("unscripted access_token call")
    }

    async fn get(&self, endpoint: &str) -> Reply<Value> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("get {endpoint}"));
        state.get.pop_front().expect("unscripted get call")
    }

    async fn post(&self, endpoint: &str, _params: &[(&str, &str)]) -> Reply<Value> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("post {endpoint}"));
        state.post.pop_front().expect("unscripted post call")
    }
}
