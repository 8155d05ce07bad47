//! Hands a [`ScenarioSet`] to goose, which owns user spawning, scheduling,
//! pacing, HTTP transport and metrics.

use std::{collections::BTreeMap, num::NonZeroUsize, sync::Arc};

use goose::{config::GooseConfiguration, metrics::GooseMetrics, prelude::*};

use crate::{
    prelude::*,
    scenario::{Action, Method, Outcome, Profile, Request, ScenarioSet, Session},
};

mod config;
#[cfg(test)]
mod stub;

pub use self::config::{LoadConfig, TargetConfig};


/// Runs the load test until goose stops it (run time, iterations or Ctrl+C).
pub async fn run(
    set: &ScenarioSet,
    session: Session,
    target: &TargetConfig,
    load: &LoadConfig,
) -> Result<Summary> {
    set.validate()?;
    info!(
        set = set.name(),
        host = %target.host,
        users = load.users.get(),
        hatch_rate = load.hatch_rate.as_str(),
        "starting load test",
    );
    for profile in set.profiles() {
        info!(
            profile = profile.name(),
            share = %format!("{:.1}%", set.probability(profile) * 100.0),
            actions = profile.actions().len(),
            "registering profile",
        );
    }

    let metrics = attack(set, session, target, load)?
        .execute()
        .await
        .context("load test failed")?;

    let summary = Summary::from_metrics(&metrics);
    summary.log();
    Ok(summary)
}

/// Builds the goose attack without starting it.
fn attack(
    set: &ScenarioSet,
    session: Session,
    target: &TargetConfig,
    load: &LoadConfig,
) -> Result<GooseAttack> {
    let session = Arc::new(session);
    let mut attack = GooseAttack::initialize_with_config(configuration(target, load))?;
    for profile in set.profiles() {
        attack = attack.register_scenario(scenario(profile, &session)?);
    }
    Ok(attack)
}

/// Translates our config into goose's configuration. `GooseDefault::Iterations`
/// is never applied by goose, so all values go into the configuration itself.
fn configuration(target: &TargetConfig, load: &LoadConfig) -> GooseConfiguration {
    let mut config = GooseConfiguration::default();
    config.host = target.host.as_str().to_owned();
    config.users = Some(load.users.get());
    config.hatch_rate = Some(load.hatch_rate.clone());
    if !load.run_time.is_zero() {
        config.run_time = load.run_time.as_secs().max(1).to_string();
    }
    config.iterations = load.iterations.map_or(0, NonZeroUsize::get);
    config.throttle_requests = load.throttle_requests.map_or(0, NonZeroUsize::get);

    // Goose rejects keeping the startup metrics of an iteration-bound run.
    config.no_reset_metrics = load.iterations.is_none();

    // Our own CLI and config replace goose's command line; the controllers
    // would only open extra ports.
    config.no_telnet = true;
    config.no_websocket = true;

    config
}

fn scenario(profile: &Profile, session: &Arc<Session>) -> Result<Scenario, GooseError> {
    let weight = profile.weight() as usize;
    let mut scenario = Scenario::new(profile.name()).set_weight(weight)?;

    let pacing = profile.pacing();
    if !pacing.max.is_zero() {
        scenario = scenario.set_wait_time(pacing.min, pacing.max)?;
    }

    for action in profile.actions() {
        scenario = scenario.register_transaction(transaction(action, session)?);
    }
    Ok(scenario)
}

/// An action together with the session state it is performed with.
struct Bound {
    action: Action,
    session: Arc<Session>,
}

fn transaction(action: &Action, session: &Arc<Session>) -> Result<Transaction, GooseError> {
    let bound = Arc::new(Bound {
        action: action.clone(),
        session: Arc::clone(session),
    });
    let weight = action.weight() as usize;

    Transaction::new(Arc::new(move |user| Box::pin(perform(user, Arc::clone(&bound)))))
        .set_name(action.name())
        .set_weight(weight)
}

async fn perform(user: &mut GooseUser, bound: Arc<Bound>) -> TransactionResult {
    let Request { method, path, body } = bound.action.request(&bound.session, &mut rand::thread_rng());
    trace!(action = bound.action.name(), %method, %path, "sending request");

    let mut builder = user.get_request_builder(&goose_method(method), &path)?;
    if let Some(body) = &body {
        builder = builder.json(body);
    }
    let request = GooseRequest::builder()
        .method(goose_method(method))
        .path(path.as_str())
        .name(bound.action.name())
        .set_request_builder(builder)
        .build();
    let mut goose = user.request(request).await?;

    // Only status errors are ignored. Without any response, the request
    // stays a failure.
    if bound.action.outcome() == Outcome::AlwaysSuccess
        && !goose.request.success
        && goose.response.is_ok()
    {
        trace!(
            action = bound.action.name(),
            status = goose.request.status_code,
            "marking unsuccessful response as success",
        );
        return user.set_success(&mut goose.request);
    }

    Ok(())
}

fn goose_method(method: Method) -> GooseMethod {
    match method {
        Method::Get => GooseMethod::Get,
        Method::Post => GooseMethod::Post,
        Method::Put => GooseMethod::Put,
        Method::Delete => GooseMethod::Delete,
        Method::Patch => GooseMethod::Patch,
    }
}


/// Success and failure counts of one request kind.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Counts {
    pub success: usize,
    pub fail: usize,
}

/// Condensed view of the request metrics goose collected, keyed by
/// "<METHOD> <action name>".
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Summary {
    pub requests: BTreeMap<String, Counts>,
}

impl Summary {
    fn from_metrics(metrics: &GooseMetrics) -> Self {
        let requests = metrics.requests.iter()
            .map(|(key, aggregate)| {
                let counts = Counts {
                    success: aggregate.success_count,
                    fail: aggregate.fail_count,
                };
                (key.clone(), counts)
            })
            .collect();
        Self { requests }
    }

    pub fn total(&self) -> Counts {
        self.requests.values().fold(Counts::default(), |acc, c| Counts {
            success: acc.success + c.success,
            fail: acc.fail + c.fail,
        })
    }

    fn log(&self) {
        for (request, counts) in &self.requests {
            info!(%request, success = counts.success, fail = counts.fail, "request summary");
        }

        let total = self.total();
        if total.fail > 0 {
            warn!(success = total.success, fail = total.fail, "load test finished with failed requests");
        } else {
            info!(success = total.success, "load test finished without failed requests");
        }
    }
}


#[cfg(test)]
mod tests {
    use std::{collections::{BTreeMap, BTreeSet}, num::NonZeroUsize, time::Duration};

    use hyper::StatusCode;
    use serde_json::json;

    use crate::scenario::Variant;
    use super::{config::HttpHost, stub::Stub, *};

    fn target(stub: &Stub) -> TargetConfig {
        TargetConfig { host: HttpHost::try_from(stub.url()).unwrap() }
    }

    fn load(iterations: usize) -> LoadConfig {
        LoadConfig {
            users: NonZeroUsize::MIN,
            hatch_rate: "1".into(),
            run_time: Duration::ZERO,
            iterations: NonZeroUsize::new(iterations),
            throttle_requests: None,
        }
    }

    /// Runs the load test, failing if it does not stop on its own.
    async fn run_bounded(set: &ScenarioSet, session: Session, target: &TargetConfig, load: &LoadConfig) -> Summary {
        tokio::time::timeout(Duration::from_secs(30), run(set, session, target, load))
            .await
            .expect("load test did not stop")
            .unwrap()
    }

    /// The given profile of the `ticketing` set, without pauses.
    fn single_profile(name: &str) -> ScenarioSet {
        let mut set = Variant::Ticketing.build().unwrap();
        set.retain_profiles(&[name.into()]).unwrap();
        set.set_profile_pacing(name, Duration::ZERO, Duration::ZERO).unwrap();
        set
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn ticket_user_follows_weights() {
        const ITERATIONS: usize = 10;

        let stub = Stub::start(StatusCode::OK).await;
        let set = single_profile("ticket-user");
        let session = Session { event_id: 12, ..Session::default() };
        let summary = run_bounded(&set, session, &target(&stub), &load(ITERATIONS)).await;
        assert_eq!(summary.total().fail, 0);

        let hits = stub.hits();
        let mut counts = BTreeMap::<(String, String), usize>::new();
        for hit in &hits {
            *counts.entry((hit.method.clone(), hit.path.clone())).or_default() += 1;
        }

        let expected_weights = [
            ("GET", "/events", 4),
            ("GET", "/events/12", 3),
            ("POST", "/auth/login", 1),
            ("POST", "/events", 1),
            ("GET", "/tickets", 2),
            ("POST", "/auth/signup", 1),
            ("POST", "/auth/forgot-pass", 1),
            ("POST", "/auth/reset-pass", 1),
        ];
        let allowed: BTreeSet<_> = expected_weights.iter()
            .map(|(m, p, _)| (m.to_string(), p.to_string()))
            .collect();
        let observed: BTreeSet<_> = counts.keys().cloned().collect();
        assert!(observed.is_subset(&allowed), "unexpected requests: {observed:?}");

        let total = hits.len() as f64;
        let weight_sum: u32 = expected_weights.iter().map(|(_, _, w)| w).sum();
        assert!(hits.len() >= ITERATIONS * weight_sum as usize / 2, "only {} requests", hits.len());
        for (method, path, weight) in expected_weights {
            let count = counts.get(&(method.to_owned(), path.to_owned())).copied().unwrap_or(0);
            let share = count as f64 / total;
            let expected = f64::from(weight) / f64::from(weight_sum);
            assert!(
                (share - expected).abs() < 0.05,
                "{method} {path}: share {share:.3}, expected {expected:.3}",
            );
        }

        let buy = hits.iter()
            .find(|h| h.method == "POST" && h.path == "/events")
            .expect("at least one ticket bought");
        assert_eq!(buy.body, Some(json!({ "event_id": 12, "quantity": 1 })));

        let login = hits.iter()
            .find(|h| h.path == "/auth/login")
            .expect("at least one login");
        assert_eq!(login.body, Some(json!({ "email": "user@test.com", "password": "password123" })));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn admin_actions_succeed_despite_server_errors() {
        let stub = Stub::start(StatusCode::INTERNAL_SERVER_ERROR).await;
        let set = single_profile("admin-user");
        let summary = run_bounded(&set, Session::default(), &target(&stub), &load(2)).await;

        assert!(!stub.hits().is_empty());
        let total = summary.total();
        assert!(total.success > 0);
        assert_eq!(total.fail, 0, "{summary:?}");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn regular_actions_fail_on_server_errors() {
        let stub = Stub::start(StatusCode::INTERNAL_SERVER_ERROR).await;
        let set = single_profile("ticket-user");
        let summary = run_bounded(&set, Session::default(), &target(&stub), &load(1)).await;

        let total = summary.total();
        assert!(total.fail > 0);
        assert_eq!(total.success, 0, "{summary:?}");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn admin_actions_fail_without_response() {
        // Bind and drop a listener to get a port nobody listens on.
        let addr = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap()
            .local_addr().unwrap();
        let target = TargetConfig { host: HttpHost::try_from(format!("http://{addr}")).unwrap() };

        let set = single_profile("admin-user");
        let summary = run_bounded(&set, Session::default(), &target, &load(1)).await;

        let total = summary.total();
        assert!(total.fail > 0);
        assert_eq!(total.success, 0, "{summary:?}");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn iterations_bound_the_run() {
        let stub = Stub::start(StatusCode::OK).await;
        let set = single_profile("admin-user");
        let summary = run_bounded(&set, Session::default(), &target(&stub), &load(3)).await;

        // One iteration performs every admin action once per weight unit.
        let per_iteration: u32 = set.profile("admin-user").unwrap()
            .actions().iter().map(Action::weight).sum();
        assert_eq!(stub.hits().len(), 3 * per_iteration as usize);
        assert_eq!(summary.total().success, 3 * per_iteration as usize);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn throttle_limits_request_rate() {
        let stub = Stub::start(StatusCode::OK).await;
        let set = single_profile("admin-user");
        let load = LoadConfig {
            throttle_requests: NonZeroUsize::new(4),
            ..load(1)
        };

        let start = std::time::Instant::now();
        let summary = run_bounded(&set, Session::default(), &target(&stub), &load).await;
        assert_eq!(summary.total().fail, 0);

        // 8 requests at 4 per second, with only the first few let through
        // immediately.
        assert!(start.elapsed() >= Duration::from_millis(500), "took {:?}", start.elapsed());
    }

    #[test]
    fn configuration_follows_load_config() {
        let target = TargetConfig { host: HttpHost::try_from("http://localhost:8000".to_owned()).unwrap() };

        let bounded = configuration(&target, &LoadConfig {
            users: NonZeroUsize::new(5).unwrap(),
            hatch_rate: "2.5".into(),
            run_time: Duration::ZERO,
            iterations: NonZeroUsize::new(7),
            throttle_requests: NonZeroUsize::new(20),
        });
        assert_eq!(bounded.host, "http://localhost:8000");
        assert_eq!(bounded.users, Some(5));
        assert_eq!(bounded.hatch_rate.as_deref(), Some("2.5"));
        assert_eq!(bounded.iterations, 7);
        assert_eq!(bounded.throttle_requests, 20);
        assert_eq!(bounded.run_time, "");
        assert!(!bounded.no_reset_metrics);
        assert!(bounded.no_telnet && bounded.no_websocket);

        let timed = configuration(&target, &LoadConfig {
            run_time: Duration::from_secs(300),
            iterations: None,
            ..load(1)
        });
        assert_eq!(timed.run_time, "300");
        assert_eq!(timed.iterations, 0);
        assert_eq!(timed.throttle_requests, 0);
        assert!(timed.no_reset_metrics);
    }

    #[test]
    fn summary_totals() {
        let summary = Summary {
            requests: BTreeMap::from([
                ("GET view_events".to_owned(), Counts { success: 4, fail: 1 }),
                ("POST login".to_owned(), Counts { success: 2, fail: 0 }),
            ]),
        };
        assert_eq!(summary.total(), Counts { success: 6, fail: 1 });
        assert_eq!(Summary::default().total(), Counts::default());
    }

    #[test]
    fn methods_map_to_goose() {
        assert!(matches!(goose_method(Method::Put), GooseMethod::Put));
        assert!(matches!(goose_method(Method::Patch), GooseMethod::Patch));
        assert!(matches!(goose_method(Method::Delete), GooseMethod::Delete));
    }
}
