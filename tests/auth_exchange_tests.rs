use std::sync::Mutex;

use http::header::{AUTHORIZATION, PROXY_AUTHENTICATE, WWW_AUTHENTICATE};
use http::{HeaderValue, Method, StatusCode};

use courier::prelude::*;

struct StaticProvider {
    credentials: Option<Credentials>,
    seen_scopes: Mutex<Vec<AuthScope>>,
}

impl StaticProvider {
    fn new(credentials: Option<Credentials>) -> Self {
        Self {
            credentials,
            seen_scopes: Mutex::new(Vec::new()),
        }
    }
}

impl CredentialsProvider for StaticProvider {
    fn credentials(&self, scope: &AuthScope) -> Option<Credentials> {
        if let Ok(mut scopes) = self.seen_scopes.lock() {
            scopes.push(scope.clone());
        }
        self.credentials.clone()
    }
}

fn host() -> HttpHost {
    HttpHost::http("www.example.com", 80)
}

fn challenge(realm: &str) -> AuthChallenge {
    let mut challenge = AuthChallenge::new("basic");
    challenge.add_param("realm", realm);
    challenge
}

fn unauthorized(header_value: &str) -> Response {
    let mut response = Response::new(StatusCode::UNAUTHORIZED);
    response
        .headers_mut()
        .insert(WWW_AUTHENTICATE, HeaderValue::from_str(header_value).expect("value"));
    response
}

#[test]
fn test_basic_scheme_generates_expected_value() {
    let provider = StaticProvider::new(Some(Credentials::new("user", "pass")));
    let mut scheme = BasicScheme::default();
    scheme.process_challenge(&challenge("sesame")).expect("challenge");

    assert!(scheme.is_challenge_complete());
    assert!(scheme.is_response_ready(&host(), &provider).expect("ready"));

    let request = Request::new(Method::GET, "/");
    let value = scheme
        .generate_auth_response(&host(), &request)
        .expect("generate");
    assert_eq!(value, "Basic dXNlcjpwYXNz");

    // the provider was asked with the announced realm and scheme name
    let scopes = provider.seen_scopes.lock().expect("scopes");
    assert_eq!(scopes[0].realm.as_deref(), Some("sesame"));
    assert_eq!(scopes[0].scheme.as_deref(), Some("basic"));
}

#[test]
fn test_process_challenge_replaces_parameters() {
    let mut scheme = BasicScheme::default();
    scheme.process_challenge(&challenge("first")).expect("first");
    assert_eq!(scheme.realm(), Some("first"));

    scheme.process_challenge(&challenge("second")).expect("second");
    assert!(scheme.is_challenge_complete());
    assert_eq!(scheme.realm(), Some("second"));

    // a challenge without a realm wipes the old one: parameters are
    // replaced, never merged
    let mut realmless = AuthChallenge::new("basic");
    realmless.add_param("charset", "UTF-8");
    scheme.process_challenge(&realmless).expect("third");
    assert!(scheme.is_challenge_complete());
    assert_eq!(scheme.realm(), None);
}

#[test]
fn test_missing_credentials_clear_cached_state() {
    let full = StaticProvider::new(Some(Credentials::new("user", "pass")));
    let empty = StaticProvider::new(None);
    let mut scheme = BasicScheme::default();
    scheme.process_challenge(&challenge("sesame")).expect("challenge");

    assert!(scheme.is_response_ready(&host(), &full).expect("ready"));
    assert!(!scheme.is_response_ready(&host(), &empty).expect("not ready"));

    let request = Request::new(Method::GET, "/");
    assert!(scheme.generate_auth_response(&host(), &request).is_err());
}

#[test]
fn test_non_ascii_credentials_degrade_under_ascii_charset() {
    let provider = StaticProvider::new(Some(Credentials::new("usér", "pass")));
    let mut scheme = BasicScheme::default();
    scheme.process_challenge(&challenge("sesame")).expect("challenge");
    assert!(scheme.is_response_ready(&host(), &provider).expect("ready"));

    let request = Request::new(Method::GET, "/");
    let value = scheme
        .generate_auth_response(&host(), &request)
        .expect("generate");
    // "us?r:pass"
    assert_eq!(value, "Basic dXM/cjpwYXNz");
}

#[test]
fn test_challenge_round_trip_through_authenticator() {
    let authenticator = Authenticator::new();
    let strategy = DefaultAuthenticationStrategy;
    let provider = StaticProvider::new(Some(Credentials::new("user", "pass")));
    let mut exchange = AuthExchange::new();
    let host = host();

    let response = unauthorized(r#"Basic realm="sesame""#);
    assert!(authenticator.is_challenged(&host, ChallengeType::Target, &response, &mut exchange));
    assert!(authenticator.prepare_auth_response(
        &host,
        ChallengeType::Target,
        &response,
        &strategy,
        &mut exchange,
        Some(&provider),
    ));
    assert_eq!(exchange.state(), AuthState::Challenged);

    let mut request = Request::new(Method::GET, "/");
    authenticator
        .add_auth_response(&host, ChallengeType::Target, &mut request, &mut exchange)
        .expect("inject");
    let value = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .expect("authorization header");
    assert!(value.starts_with("Basic "));

    // an unchallenged response closes out the round
    let ok = Response::new(StatusCode::OK);
    assert!(!authenticator.is_challenged(&host, ChallengeType::Target, &ok, &mut exchange));
    assert_eq!(exchange.state(), AuthState::Success);
}

#[test]
fn test_repeat_challenge_exhausts_the_exchange() {
    let authenticator = Authenticator::new();
    let strategy = DefaultAuthenticationStrategy;
    let provider = StaticProvider::new(Some(Credentials::new("user", "wrong")));
    let mut exchange = AuthExchange::new();
    let host = host();

    let response = unauthorized(r#"Basic realm="sesame""#);
    assert!(authenticator.is_challenged(&host, ChallengeType::Target, &response, &mut exchange));
    assert!(authenticator.prepare_auth_response(
        &host,
        ChallengeType::Target,
        &response,
        &strategy,
        &mut exchange,
        Some(&provider),
    ));

    // the server rejects the credentials and challenges again
    assert!(authenticator.is_challenged(&host, ChallengeType::Target, &response, &mut exchange));
    assert!(!authenticator.prepare_auth_response(
        &host,
        ChallengeType::Target,
        &response,
        &strategy,
        &mut exchange,
        Some(&provider),
    ));
    assert_eq!(exchange.state(), AuthState::Failure);
}

#[test]
fn test_missing_credentials_leave_challenge_unsatisfiable() {
    let authenticator = Authenticator::new();
    let strategy = DefaultAuthenticationStrategy;
    let provider = StaticProvider::new(None);
    let mut exchange = AuthExchange::new();
    let host = host();

    let response = unauthorized(r#"Basic realm="sesame""#);
    assert!(authenticator.is_challenged(&host, ChallengeType::Target, &response, &mut exchange));
    assert!(!authenticator.prepare_auth_response(
        &host,
        ChallengeType::Target,
        &response,
        &strategy,
        &mut exchange,
        Some(&provider),
    ));
}

#[test]
fn test_success_is_reset_before_a_new_challenge() {
    let authenticator = Authenticator::new();
    let strategy = DefaultAuthenticationStrategy;
    let provider = StaticProvider::new(Some(Credentials::new("user", "pass")));
    let mut exchange = AuthExchange::new();
    let host = host();

    let response = unauthorized(r#"Basic realm="sesame""#);
    assert!(authenticator.is_challenged(&host, ChallengeType::Target, &response, &mut exchange));
    assert!(authenticator.prepare_auth_response(
        &host,
        ChallengeType::Target,
        &response,
        &strategy,
        &mut exchange,
        Some(&provider),
    ));
    let ok = Response::new(StatusCode::OK);
    authenticator.is_challenged(&host, ChallengeType::Target, &ok, &mut exchange);
    assert_eq!(exchange.state(), AuthState::Success);

    // a fresh challenge goes through reset, never Success -> Challenged
    assert!(authenticator.is_challenged(&host, ChallengeType::Target, &response, &mut exchange));
    assert_eq!(exchange.state(), AuthState::Unchallenged);
    assert!(authenticator.prepare_auth_response(
        &host,
        ChallengeType::Target,
        &response,
        &strategy,
        &mut exchange,
        Some(&provider),
    ));
    assert_eq!(exchange.state(), AuthState::Challenged);
}

#[test]
fn test_challenge_types_map_to_their_headers() {
    assert_eq!(ChallengeType::Target.challenge_header(), WWW_AUTHENTICATE);
    assert_eq!(ChallengeType::Proxy.challenge_header(), PROXY_AUTHENTICATE);
}
