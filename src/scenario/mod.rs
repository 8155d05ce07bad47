//! Declarative description of what simulated users do: weighted profiles,
//! each a weighted set of HTTP actions with a pacing policy. Nothing in here
//! talks to the network; see `crate::driver` for handing a set to goose.

use std::{
    fmt::{self, Write as _},
    time::Duration,
};

use rand::RngCore;
use serde_json::Value;

mod catalog;
mod config;
mod path;
mod session;

pub use self::{
    catalog::Variant,
    config::ScenarioConfig,
    path::PathTemplate,
    session::Session,
};


/// Builds the JSON body of one request. Called once per invocation, so it may
/// use the RNG to make values unique.
pub type BodyBuilder = fn(&Session, &mut dyn RngCore) -> Value;

/// Problems in a scenario definition. All of these are detected before any
/// request is sent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("profile '{profile}' has weight 0 (weights must be positive)")]
    ZeroProfileWeight { profile: String },

    #[error("profile '{profile}': minimum pause {min:?} is larger than maximum pause {max:?}")]
    InvalidPacing { profile: String, min: Duration, max: Duration },

    #[error("action '{action}' of profile '{profile}' has weight 0 (weights must be positive)")]
    ZeroActionWeight { profile: String, action: String },

    #[error("profile '{0}' is declared twice")]
    DuplicateProfile(String),

    #[error("action '{action}' is declared twice in profile '{profile}'")]
    DuplicateAction { profile: String, action: String },

    #[error("invalid path template '{template}': {reason}")]
    InvalidPath { template: String, reason: &'static str },

    #[error("unknown profile '{name}' (scenario set '{set}' has: {known})")]
    UnknownProfile { name: String, set: String, known: String },

    #[error("profile '{0}' has no actions")]
    EmptyProfile(String),

    #[error("scenario set '{0}' has no profiles")]
    NoProfiles(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the response status of an action is judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Non-2xx responses are recorded as failures.
    Strict,

    /// Every response counts as a success, whatever its status code. Only
    /// throughput and latency of the action are measured.
    AlwaysSuccess,
}

/// Minimum and maximum idle time between two actions of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub min: Duration,
    pub max: Duration,
}

impl Pacing {
    fn new(profile: &str, min: Duration, max: Duration) -> Result<Self, ConfigError> {
        if min > max {
            return Err(ConfigError::InvalidPacing { profile: profile.into(), min, max });
        }
        Ok(Self { min, max })
    }
}


/// A named collection of user profiles that is run as one load test.
#[derive(Debug, Clone)]
pub struct ScenarioSet {
    name: String,
    profiles: Vec<Profile>,
}

impl ScenarioSet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            profiles: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn profiles(&self) -> &[Profile] {
        &self.profiles
    }

    pub fn profile(&self, name: &str) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.name == name)
    }

    /// Declares a new profile without actions. Add those with
    /// [`Profile::register_action`].
    pub fn register_profile(
        &mut self,
        name: impl Into<String>,
        weight: u32,
        pacing_min: Duration,
        pacing_max: Duration,
    ) -> Result<&mut Profile, ConfigError> {
        let name = name.into();
        if weight == 0 {
            return Err(ConfigError::ZeroProfileWeight { profile: name });
        }
        let pacing = Pacing::new(&name, pacing_min, pacing_max)?;
        if self.profile(&name).is_some() {
            return Err(ConfigError::DuplicateProfile(name));
        }

        self.profiles.push(Profile {
            name,
            weight,
            pacing,
            actions: Vec::new(),
        });
        Ok(self.profiles.last_mut().expect("just pushed"))
    }

    /// Drops all profiles not listed in `names`. An empty list keeps
    /// everything.
    pub fn retain_profiles(&mut self, names: &[String]) -> Result<(), ConfigError> {
        if names.is_empty() {
            return Ok(());
        }
        for name in names {
            self.lookup(name)?;
        }
        self.profiles.retain(|p| names.contains(&p.name));
        Ok(())
    }

    pub fn set_profile_weight(&mut self, name: &str, weight: u32) -> Result<(), ConfigError> {
        if weight == 0 {
            return Err(ConfigError::ZeroProfileWeight { profile: name.into() });
        }
        let idx = self.lookup(name)?;
        self.profiles[idx].weight = weight;
        Ok(())
    }

    pub fn set_profile_pacing(
        &mut self,
        name: &str,
        min: Duration,
        max: Duration,
    ) -> Result<(), ConfigError> {
        let pacing = Pacing::new(name, min, max)?;
        let idx = self.lookup(name)?;
        self.profiles[idx].pacing = pacing;
        Ok(())
    }

    /// Checks properties that can only be judged once the set is complete.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.profiles.is_empty() {
            return Err(ConfigError::NoProfiles(self.name.clone()));
        }
        if let Some(p) = self.profiles.iter().find(|p| p.actions.is_empty()) {
            return Err(ConfigError::EmptyProfile(p.name.clone()));
        }
        Ok(())
    }

    /// Probability that a newly spawned user runs `profile`.
    pub fn probability(&self, profile: &Profile) -> f64 {
        let total: u64 = self.profiles.iter().map(|p| u64::from(p.weight)).sum();
        f64::from(profile.weight) / total as f64
    }

    /// Human readable overview of all profiles and actions, with the paths
    /// rendered for `session`.
    pub fn describe(&self, session: &Session) -> String {
        let mut out = String::new();
        writeln!(out, "scenario set '{}'", self.name).unwrap();
        for profile in &self.profiles {
            writeln!(
                out,
                "\n  profile '{}': weight {} ({:.1}% of users), pause {:?} to {:?}",
                profile.name,
                profile.weight,
                self.probability(profile) * 100.0,
                profile.pacing.min,
                profile.pacing.max,
            ).unwrap();

            for action in &profile.actions {
                write!(
                    out,
                    "    {:<28} weight {:>2} ({:>5.1}%)  {:<6} {}",
                    action.name,
                    action.weight,
                    profile.probability(action) * 100.0,
                    action.method.as_str(),
                    action.path.render(session),
                ).unwrap();
                if action.path.is_templated() {
                    write!(out, "  (from {})", action.path).unwrap();
                }
                if action.body.is_some() {
                    out.push_str("  [json body]");
                }
                if action.outcome == Outcome::AlwaysSuccess {
                    out.push_str("  [status ignored]");
                }
                out.push('\n');
            }
        }
        out
    }

    fn lookup(&self, name: &str) -> Result<usize, ConfigError> {
        self.profiles.iter().position(|p| p.name == name).ok_or_else(|| {
            ConfigError::UnknownProfile {
                name: name.into(),
                set: self.name.clone(),
                known: self.profiles.iter()
                    .map(|p| p.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            }
        })
    }
}


/// One kind of simulated user.
#[derive(Debug, Clone)]
pub struct Profile {
    name: String,
    weight: u32,
    pacing: Pacing,
    actions: Vec<Action>,
}

impl Profile {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn weight(&self) -> u32 {
        self.weight
    }

    pub fn pacing(&self) -> Pacing {
        self.pacing
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn action(&self, name: &str) -> Option<&Action> {
        self.actions.iter().find(|a| a.name == name)
    }

    pub fn register_action(
        &mut self,
        name: impl Into<String>,
        weight: u32,
        method: Method,
        path: &str,
        body: Option<BodyBuilder>,
    ) -> Result<&mut Action, ConfigError> {
        let name = name.into();
        if weight == 0 {
            return Err(ConfigError::ZeroActionWeight { profile: self.name.clone(), action: name });
        }
        if self.action(&name).is_some() {
            return Err(ConfigError::DuplicateAction { profile: self.name.clone(), action: name });
        }
        let path = PathTemplate::parse(path)?;

        self.actions.push(Action {
            name,
            weight,
            method,
            path,
            body,
            outcome: Outcome::Strict,
        });
        Ok(self.actions.last_mut().expect("just pushed"))
    }

    /// Probability that `action` is the next one this profile performs.
    pub fn probability(&self, action: &Action) -> f64 {
        let total: u64 = self.actions.iter().map(|a| u64::from(a.weight)).sum();
        f64::from(action.weight) / total as f64
    }
}


/// Template for one HTTP request.
#[derive(Debug, Clone)]
pub struct Action {
    name: String,
    weight: u32,
    method: Method,
    path: PathTemplate,
    body: Option<BodyBuilder>,
    outcome: Outcome,
}

/// A concrete request built from an [`Action`] for one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

impl Action {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn weight(&self) -> u32 {
        self.weight
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// Marks every response of this action as successful.
    pub fn always_succeed(&mut self) -> &mut Self {
        self.outcome = Outcome::AlwaysSuccess;
        self
    }

    pub fn request(&self, session: &Session, rng: &mut dyn RngCore) -> Request {
        Request {
            method: self.method,
            path: self.path.render(session),
            body: self.body.map(|build| build(session, rng)),
        }
    }
}
