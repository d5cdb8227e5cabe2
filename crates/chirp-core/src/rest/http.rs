use std::collections::BTreeMap;

use http_types::Method;
use oauth_1a::{
    AuthorizationType, ClientId, ClientSecret, Nonce, OAuthData, SignableRequest, SignatureMethod,
    SigningKey, Token, TokenSecret,
};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use url::Url;

use crate::auth::{AuthError, TokenPair};
use crate::config::ClientConfig;

use super::{Connect, OAuth1Transport, Reply};

/// Remote endpoints, overridable for tests.
#[derive(Debug, Clone)]
pub struct ApiEndpoints {
    pub request_token: Url,
    pub authorize: Url,
    pub access_token: Url,
    /// Base joined with `<endpoint>.json` for REST calls; must end in `/`.
    pub rest_base: Url,
}

impl Default for ApiEndpoints {
    fn default() -> Self {
        Self {
            request_token: Url::parse("https://api.twitter.com/oauth/request_token").unwrap(),
            authorize: Url::parse("https://api.twitter.com/oauth/authorize").unwrap(),
            access_token: Url::parse("https://api.twitter.com/oauth/access_token").unwrap(),
            rest_base: Url::parse("https://api.twitter.com/1.1/").unwrap(),
        }
    }
}

impl ApiEndpoints {
    fn rest_url(&self, endpoint: &str) -> Result<Url, url::ParseError> {
        self.rest_base.join(&format!("{endpoint}.json"))
    }
}

/// Builds [`HttpTransport`]s from the configured consumer credentials.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    config: ClientConfig,
    endpoints: ApiEndpoints,
    http: Client,
}

impl HttpConnector {
    pub fn new(config: ClientConfig) -> Result<Self, AuthError> {
        Self::with_endpoints(config, ApiEndpoints::default())
    }

    pub fn with_endpoints(config: ClientConfig, endpoints: ApiEndpoints) -> Result<Self, AuthError> {
        let http = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout_duration())
            .connect_timeout(config.connect_timeout_duration())
            .build()?;
        Ok(Self {
            config,
            endpoints,
            http,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn endpoints(&self) -> &ApiEndpoints {
        &self.endpoints
    }
}

impl Connect for HttpConnector {
    type Transport = HttpTransport;

    fn connect(&self, tokens: Option<TokenPair>) -> HttpTransport {
        HttpTransport {
            http: self.http.clone(),
            config: self.config.clone(),
            endpoints: self.endpoints.clone(),
            tokens,
        }
    }
}

/// reqwest-backed transport; OAuth1 Authorization headers are produced by
/// the `oauth-1a` signer, never by this crate.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: Client,
    config: ClientConfig,
    endpoints: ApiEndpoints,
    tokens: Option<TokenPair>,
}

impl HttpTransport {
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn tokens(&self) -> Option<&TokenPair> {
        self.tokens.as_ref()
    }

    fn oauth_data(&self) -> OAuthData {
        OAuthData {
            client_id: ClientId(self.config.consumer_key.clone()),
            token: self.tokens.as_ref().map(|pair| Token(pair.key.clone())),
            signature_method: SignatureMethod::HmacSha1,
            nonce: Nonce::generate(),
        }
    }

    fn signing_key(&self) -> SigningKey {
        let secret = ClientSecret(self.config.consumer_secret.clone());
        match &self.tokens {
            Some(pair) => SigningKey::with_token(secret, TokenSecret(pair.secret.clone())),
            None => SigningKey::without_token(secret),
        }
    }

    fn authorization(
        &self,
        method: Method,
        url: &Url,
        params: BTreeMap<String, String>,
        auth_type: AuthorizationType,
    ) -> String {
        let request = SignableRequest::new(method, url.clone(), params);
        self.oauth_data()
            .authorization(request, auth_type, &self.signing_key())
    }

    async fn token_exchange(&self, url: Url, header: String) -> Reply<TokenPair> {
        let result = self
            .http
            .post(url)
            .header("Authorization", header)
            .send()
            .await;
        let response = match result {
            Ok(response) => response,
            Err(err) => return Reply::Failed(err.to_string()),
        };
        let status = response.status();
        if status != StatusCode::OK {
            return Reply::Status(status);
        }
        match response.text().await {
            Ok(body) => match parse_token_body(&body) {
                Some(pair) => Reply::Success(pair),
                None => Reply::Failed("token response missing oauth_token fields".into()),
            },
            Err(err) => Reply::Failed(err.to_string()),
        }
    }

    async fn json_reply(result: Result<reqwest::Response, reqwest::Error>) -> Reply<Value> {
        let response = match result {
            Ok(response) => response,
            Err(err) => return Reply::Failed(err.to_string()),
        };
        let status = response.status();
        if status != StatusCode::OK {
            return Reply::Status(status);
        }
        match response.text().await {
            Ok(body) if body.trim().is_empty() => Reply::Success(Value::Null),
            Ok(body) => match serde_json::from_str(&body) {
                Ok(value) => Reply::Success(value),
                Err(err) => Reply::Failed(format!("malformed JSON body: {err}")),
            },
            Err(err) => Reply::Failed(err.to_string()),
        }
    }
}

impl OAuth1Transport for HttpTransport {
    async fn request_token(&self, callback: &str) -> Reply<TokenPair> {
        let url = self.endpoints.request_token.clone();
        let header = self.authorization(
            Method::Post,
            &url,
            BTreeMap::new(),
            AuthorizationType::RequestToken {
                callback: callback.to_owned(),
            },
        );
        self.token_exchange(url, header).await
    }

    fn authorize_url(&self, token: &str) -> Url {
        let mut url = self.endpoints.authorize.clone();
        url.query_pairs_mut().append_pair("oauth_token", token);
        url
    }

    async fn access_token(&self, verifier: &str) -> Reply<TokenPair> {
        let url = self.endpoints.access_token.clone();
        let header = self.authorization(
            Method::Post,
            &url,
            BTreeMap::new(),
            AuthorizationType::AccessToken {
                verifier: verifier.to_owned(),
            },
        );
        self.token_exchange(url, header).await
    }

    async fn get(&self, endpoint: &str) -> Reply<Value> {
        let url = match self.endpoints.rest_url(endpoint) {
            Ok(url) => url,
            Err(err) => return Reply::Failed(err.to_string()),
        };
        let header = self.authorization(
            Method::Get,
            &url,
            BTreeMap::new(),
            AuthorizationType::Request,
        );
        let result = self
            .http
            .get(url)
            .header("Authorization", header)
            .send()
            .await;
        Self::json_reply(result).await
    }

    async fn post(&self, endpoint: &str, params: &[(&str, &str)]) -> Reply<Value> {
        let url = match self.endpoints.rest_url(endpoint) {
            Ok(url) => url,
            Err(err) => return Reply::Failed(err.to_string()),
        };
        let signed: BTreeMap<String, String> = params
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        let header = self.authorization(Method::Post, &url, signed, AuthorizationType::Request);
        let form: Vec<(&str, &str)> = params.to_vec();
        let result = self
            .http
            .post(url)
            .header("Authorization", header)
            .form(&form)
            .send()
            .await;
        Self::json_reply(result).await
    }
}

/// Token endpoints answer with a form-encoded body, not JSON.
fn parse_token_body(body: &str) -> Option<TokenPair> {
    let mut key = None;
    let mut secret = None;
    for (name, value) in url::form_urlencoded::parse(body.as_bytes()) {
        match name.as_ref() {
            "oauth_token" => key = Some(value.into_owned()),
            "oauth_token_secret" => secret = Some(value.into_owned()),
            _ => {}
        }
    }
    Some(TokenPair::new(key?, secret?))
}
