//! Terminal chain stage: route establishment, dispatch and auth retry

use std::sync::Arc;

use http::{header, HeaderValue, Method};
use tracing::debug;

use crate::auth::{
    AuthExchange, AuthState, AuthenticationStrategy, Authenticator, ChallengeType,
    CredentialsProvider,
};
use crate::connect::{
    ConnectionHolder, ConnectionManager, ConnectionReuseStrategy, KeepAliveStrategy,
};
use crate::context::ClientContext;
use crate::error::{Error, Result};
use crate::http::{Request, RequestWrapper, Response};
use crate::route::{HttpRoute, RouteDirector, RouteStep, RouteTracker};

use super::{Cancellable, ClientExecChain, ExecutionAware, RequestExecutor, UserTokenHandler};

/// Last stage of the execution chain.
///
/// Owns the leased connection for the duration of one exchange,
/// establishes the planned route (tunnelling and layering as required),
/// dispatches the request and retries automatically on authentication
/// challenges from the target or an intermediate proxy. Any error path
/// aborts the connection; it is never silently leaked.
pub struct MainClientExec {
    executor: Arc<dyn RequestExecutor>,
    manager: Arc<dyn ConnectionManager>,
    reuse_strategy: Arc<dyn ConnectionReuseStrategy>,
    keep_alive_strategy: Arc<dyn KeepAliveStrategy>,
    target_auth_strategy: Arc<dyn AuthenticationStrategy>,
    proxy_auth_strategy: Arc<dyn AuthenticationStrategy>,
    user_token_handler: Arc<dyn UserTokenHandler>,
    authenticator: Authenticator,
    route_director: RouteDirector,
}

impl MainClientExec {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        executor: Arc<dyn RequestExecutor>,
        manager: Arc<dyn ConnectionManager>,
        reuse_strategy: Arc<dyn ConnectionReuseStrategy>,
        keep_alive_strategy: Arc<dyn KeepAliveStrategy>,
        target_auth_strategy: Arc<dyn AuthenticationStrategy>,
        proxy_auth_strategy: Arc<dyn AuthenticationStrategy>,
        user_token_handler: Arc<dyn UserTokenHandler>,
    ) -> Self {
        Self {
            executor,
            manager,
            reuse_strategy,
            keep_alive_strategy,
            target_auth_strategy,
            proxy_auth_strategy,
            user_token_handler,
            authenticator: Authenticator::new(),
            route_director: RouteDirector::new(),
        }
    }
}

impl ClientExecChain for MainClientExec {
    fn execute(
        &self,
        route: &HttpRoute,
        request: Request,
        context: &mut ClientContext,
        aware: Option<&dyn ExecutionAware>,
    ) -> Result<Response> {
        let user_token = context.user_token().cloned();

        let conn_request = self.manager.request_connection(route, user_token.clone());
        if let Some(aware) = aware {
            if aware.is_aborted() {
                conn_request.cancel();
                return Err(Error::Aborted);
            }
            aware.set_cancellable(conn_request.clone());
        }

        let timeout = context.request_config().connection_request_timeout;
        let conn = conn_request.get(timeout)?;
        let mut holder = ConnectionHolder::new(self.manager.clone(), conn);

        match self.do_execute(route, request, context, aware, &mut holder) {
            Ok(mut response) => {
                // resolve the affinity token once, then pin it to the lease
                if context.user_token().is_none() {
                    if let Some(token) = self.user_token_handler.user_token(route, context) {
                        context.set_user_token(token);
                    }
                }
                if let Some(token) = context.user_token() {
                    holder.set_state(token.clone());
                }

                if response.body().is_streaming() {
                    // the caller owns the connection until it closes the
                    // response
                    response.attach_connection(holder);
                } else {
                    holder.release_connection();
                }
                Ok(response)
            }
            Err(err) => {
                holder.abort_connection();
                Err(err)
            }
        }
    }
}

impl MainClientExec {
    fn do_execute(
        &self,
        route: &HttpRoute,
        request: Request,
        context: &mut ClientContext,
        aware: Option<&dyn ExecutionAware>,
        holder: &mut ConnectionHolder,
    ) -> Result<Response> {
        let mut wrapped = RequestWrapper::new(request);
        let target = route.target().clone();
        let proxy = route.proxy_host().cloned();
        // exchange for proxy-type challenges on a direct route; never
        // enters the context store
        let mut scratch_proxy_exchange = AuthExchange::new();

        let mut exec_count = 1u32;
        let response = loop {
            if exec_count > 1 && !wrapped.is_repeatable() {
                return Err(Error::NonRepeatable);
            }

            if let Some(aware) = aware {
                if aware.is_aborted() {
                    return Err(Error::Aborted);
                }
            }

            if !holder.connection()?.is_open() {
                debug!(target: "courier::exec", route = %route, "opening connection");
                match self.establish_route(holder, route, &wrapped, context) {
                    Ok(()) => {}
                    Err(Error::TunnelRefused { status, response }) => {
                        debug!(target: "courier::exec", %status, "tunnel refused; returning proxy response");
                        break *response;
                    }
                    Err(err) => return Err(err),
                }
            }

            if let Some(timeout) = context.request_config().socket_timeout {
                holder.connection()?.set_socket_timeout(Some(timeout));
            }

            if let Some(aware) = aware {
                if aware.is_aborted() {
                    return Err(Error::Aborted);
                }
            }

            debug!(
                target: "courier::exec",
                method = %wrapped.method(),
                uri = wrapped.request().uri(),
                attempt = exec_count,
                "executing request"
            );

            if !wrapped.request().contains_header(&header::AUTHORIZATION) {
                let exchange = context.auth_exchange_mut(&target);
                self.authenticator.add_auth_response(
                    &target,
                    ChallengeType::Target,
                    wrapped.request_mut(),
                    exchange,
                )?;
            }
            if !route.is_tunnelled()
                && !wrapped.request().contains_header(&header::PROXY_AUTHORIZATION)
            {
                match &proxy {
                    Some(proxy) => {
                        let exchange = context.auth_exchange_mut(proxy);
                        self.authenticator.add_auth_response(
                            proxy,
                            ChallengeType::Proxy,
                            wrapped.request_mut(),
                            exchange,
                        )?;
                    }
                    // a proxy challenge can arrive on a direct route; its
                    // answer lives in the scratch exchange
                    None => {
                        self.authenticator.add_auth_response(
                            &target,
                            ChallengeType::Proxy,
                            wrapped.request_mut(),
                            &mut scratch_proxy_exchange,
                        )?;
                    }
                }
            }

            let mut resp = self
                .executor
                .execute(wrapped.request(), holder.connection()?, context)?;

            if self
                .reuse_strategy
                .keep_alive(wrapped.request(), &resp, context)
            {
                let duration = self.keep_alive_strategy.keep_alive_duration(&resp, context);
                match duration {
                    Some(d) => {
                        debug!(target: "courier::exec", seconds = d.as_secs(), "connection can be kept alive")
                    }
                    None => {
                        debug!(target: "courier::exec", "connection can be kept alive indefinitely")
                    }
                }
                holder.set_valid_for(duration);
                holder.mark_reusable();
            } else {
                holder.mark_non_reusable();
            }

            // TRACE exchanges never participate in authentication
            if *wrapped.method() == Method::TRACE {
                break resp;
            }

            let provider = context.credentials_provider();
            if self.needs_authentication(
                route,
                &resp,
                context,
                &mut scratch_proxy_exchange,
                provider.as_deref(),
            ) {
                if holder.is_reusable() {
                    resp.drain_entity()?;
                } else {
                    holder.connection()?.close()?;
                    // a discarded connection invalidates connection-bound
                    // auth state
                    match &proxy {
                        Some(proxy) => {
                            reset_if_connection_based(context.auth_exchange_mut(proxy))
                        }
                        None => reset_if_connection_based(&mut scratch_proxy_exchange),
                    }
                    reset_if_connection_based(context.auth_exchange_mut(&target));
                }
                // strip auth headers the engine added; caller-set ones stay
                if !wrapped.original().contains_header(&header::AUTHORIZATION) {
                    wrapped.request_mut().remove_headers(&header::AUTHORIZATION);
                }
                if !wrapped
                    .original()
                    .contains_header(&header::PROXY_AUTHORIZATION)
                {
                    wrapped
                        .request_mut()
                        .remove_headers(&header::PROXY_AUTHORIZATION);
                }
                exec_count += 1;
            } else {
                break resp;
            }
        };
        Ok(response)
    }

    /// Drive the route director until the connection matches the plan.
    fn establish_route(
        &self,
        holder: &mut ConnectionHolder,
        route: &HttpRoute,
        request: &RequestWrapper,
        context: &mut ClientContext,
    ) -> Result<()> {
        let connect_timeout = context.request_config().connect_timeout;
        let mut tracker = RouteTracker::new(route.target().clone());
        loop {
            let fact = tracker.to_route();
            let step = self.route_director.next_step(route, fact.as_ref());
            match step {
                RouteStep::ConnectTarget => {
                    self.manager
                        .connect(holder.connection()?, route, connect_timeout, context)?;
                    tracker.connect_target(route.is_secure())?;
                }
                RouteStep::ConnectProxy => {
                    self.manager
                        .connect(holder.connection()?, route, connect_timeout, context)?;
                    let proxy = route
                        .proxy_host()
                        .cloned()
                        .ok_or_else(|| Error::protocol("plan requires a proxy but has none"))?;
                    tracker.connect_proxy(proxy, false)?;
                }
                RouteStep::TunnelTarget => {
                    let secure = self.create_tunnel_to_target(holder, route, request, context)?;
                    debug!(target: "courier::exec", "tunnel to target established");
                    tracker.tunnel_target(secure)?;
                }
                RouteStep::TunnelProxy => {
                    return self.create_tunnel_to_proxy(route);
                }
                RouteStep::LayerProtocol => {
                    self.manager.upgrade(holder.connection()?, route, context)?;
                    tracker.layer_protocol(route.is_secure())?;
                }
                RouteStep::Unreachable => {
                    return Err(Error::protocol(format!(
                        "unable to establish route: planned = {route}; current = {}",
                        fact.map_or_else(|| "unconnected".to_string(), |f| f.to_string())
                    )));
                }
                RouteStep::Complete => {
                    self.manager
                        .route_complete(holder.connection()?, route, context)?;
                    return Ok(());
                }
            }
        }
    }

    /// Send CONNECT through the nearest proxy until the tunnel is up.
    ///
    /// Preemptively authenticates when the proxy exchange already holds a
    /// credential. The loop is bounded only by the proxy's willingness to
    /// keep challenging. Returns the security state of the tunnelled
    /// segment: the proxy-side hop says nothing about the hop beyond it,
    /// so this is `false`; callers layer TLS explicitly.
    fn create_tunnel_to_target(
        &self,
        holder: &mut ConnectionHolder,
        route: &HttpRoute,
        request: &RequestWrapper,
        context: &mut ClientContext,
    ) -> Result<bool> {
        let target = route.target().clone();
        let proxy = route
            .proxy_host()
            .cloned()
            .ok_or_else(|| Error::protocol("tunnel requires a proxy"))?;
        let connect_timeout = context.request_config().connect_timeout;
        let authentication_enabled = context.request_config().authentication_enabled;

        let authority = target.to_host_string();
        let mut connect = Request::new(Method::CONNECT, authority.clone());
        connect.set_version(request.request().version());
        connect.set_header(
            header::HOST,
            HeaderValue::from_str(&authority)
                .map_err(|e| Error::protocol(format!("invalid tunnel authority: {e}")))?,
        );

        loop {
            if !holder.connection()?.is_open() {
                self.manager
                    .connect(holder.connection()?, route, connect_timeout, context)?;
            }

            // strip stale credentials from the previous round
            connect.remove_headers(&header::PROXY_AUTHORIZATION);
            {
                let exchange = context.auth_exchange_mut(&proxy);
                self.authenticator.add_auth_response(
                    &proxy,
                    ChallengeType::Proxy,
                    &mut connect,
                    exchange,
                )?;
            }

            let mut response = self
                .executor
                .execute(&connect, holder.connection()?, context)?;
            let status = response.status();
            if status.as_u16() < 200 {
                return Err(Error::protocol(format!(
                    "unexpected response to CONNECT request: {status}"
                )));
            }

            if authentication_enabled {
                let challenged = {
                    let exchange = context.auth_exchange_mut(&proxy);
                    self.authenticator
                        .is_challenged(&proxy, ChallengeType::Proxy, &response, exchange)
                };
                if challenged {
                    debug!(target: "courier::exec", host = %proxy, "proxy requested tunnel authentication");
                    let provider = context.credentials_provider();
                    let accepted = {
                        let exchange = context.auth_exchange_mut(&proxy);
                        self.authenticator.prepare_auth_response(
                            &proxy,
                            ChallengeType::Proxy,
                            &response,
                            self.proxy_auth_strategy.as_ref(),
                            exchange,
                            provider.as_deref(),
                        )
                    };
                    if accepted {
                        if self
                            .reuse_strategy
                            .keep_alive(request.request(), &response, context)
                        {
                            debug!(target: "courier::exec", "consuming challenge response; connection kept alive");
                            response.drain_entity()?;
                        } else {
                            holder.connection()?.close()?;
                        }
                        continue;
                    }
                }
            }

            if status.as_u16() > 299 {
                response.buffer_entity()?;
                holder.connection()?.close()?;
                return Err(Error::TunnelRefused {
                    status,
                    response: Box::new(response),
                });
            }

            return Ok(false);
        }
    }

    /// Tunnelling to an intermediate proxy of a multi-proxy chain would
    /// need per-hop CONNECT and per-hop authentication; routes that
    /// require it fail here. Known limitation.
    fn create_tunnel_to_proxy(&self, _route: &HttpRoute) -> Result<()> {
        Err(Error::protocol("proxy chains are not supported"))
    }

    /// Whether the response demands another round with fresh credentials.
    /// Target challenges take precedence over proxy challenges.
    fn needs_authentication(
        &self,
        route: &HttpRoute,
        response: &Response,
        context: &mut ClientContext,
        scratch_proxy_exchange: &mut AuthExchange,
        provider: Option<&dyn CredentialsProvider>,
    ) -> bool {
        if !context.request_config().authentication_enabled {
            return false;
        }
        let target = route.target().clone();
        let target_challenged = {
            let exchange = context.auth_exchange_mut(&target);
            self.authenticator
                .is_challenged(&target, ChallengeType::Target, response, exchange)
        };

        // proxy-type challenges on a direct route are evaluated against
        // the target host, in the scratch exchange
        let proxy = route.proxy_host().cloned();
        let proxy_host = proxy.clone().unwrap_or_else(|| target.clone());
        let proxy_challenged = match &proxy {
            Some(host) => {
                let exchange = context.auth_exchange_mut(host);
                self.authenticator
                    .is_challenged(host, ChallengeType::Proxy, response, exchange)
            }
            None => self.authenticator.is_challenged(
                &proxy_host,
                ChallengeType::Proxy,
                response,
                scratch_proxy_exchange,
            ),
        };

        if target_challenged {
            debug!(target: "courier::exec", host = %target, "target requested authentication");
            let exchange = context.auth_exchange_mut(&target);
            return self.authenticator.prepare_auth_response(
                &target,
                ChallengeType::Target,
                response,
                self.target_auth_strategy.as_ref(),
                exchange,
                provider,
            );
        }
        if proxy_challenged {
            debug!(target: "courier::exec", host = %proxy_host, "proxy requested authentication");
            return match &proxy {
                Some(host) => {
                    let exchange = context.auth_exchange_mut(host);
                    self.authenticator.prepare_auth_response(
                        host,
                        ChallengeType::Proxy,
                        response,
                        self.proxy_auth_strategy.as_ref(),
                        exchange,
                        provider,
                    )
                }
                None => self.authenticator.prepare_auth_response(
                    &proxy_host,
                    ChallengeType::Proxy,
                    response,
                    self.proxy_auth_strategy.as_ref(),
                    scratch_proxy_exchange,
                    provider,
                ),
            };
        }
        false
    }
}

fn reset_if_connection_based(exchange: &mut AuthExchange) {
    let connection_based = exchange.state() == AuthState::Success
        && exchange.scheme().map_or(false, |s| s.is_connection_based());
    if connection_based {
        debug!(target: "courier::exec", "resetting connection-based auth exchange");
        exchange.reset();
    }
}
