use std::{collections::HashMap, time::Duration};

use serde::Deserialize;

use super::{ConfigError, ScenarioSet, Session, Variant};


#[derive(Debug, confique::Config)]
pub struct ScenarioConfig {
    /// Which predefined scenario set to run:
    /// - "ticketing": regular ticket buyers (browse, log in, sign up, buy,
    ///   password reset) plus a small share of administrators.
    /// - "browse-and-buy": only browsing, logging in and buying.
    /// - "pages": plain page loads of the web frontend.
    #[config(default = "ticketing")]
    pub variant: Variant,

    /// If not empty, only the listed profiles of the set are run, e.g.
    /// `["ticket-user"]`.
    #[config(default = [])]
    pub profiles: Vec<String>,

    /// Overrides the weight of individual profiles, e.g.
    /// `profile_weights.admin-user = 3`.
    #[config(default = {})]
    pub profile_weights: HashMap<String, u32>,

    /// Overrides the pause between two actions of individual profiles, e.g.
    /// `profile_pacing.ticket-user = { min = "500ms", max = "2s" }`.
    #[config(default = {})]
    pub profile_pacing: HashMap<String, PacingOverride>,

    /// Identifier of the event used in `/events/{event_id}` and in the body
    /// of ticket purchases. Needs to exist in the target system for those
    /// requests to succeed.
    #[config(default = 1)]
    pub event_id: u64,

    /// Identifier of the concert that admins update and delete.
    #[config(default = 1)]
    pub concert_id: u64,

    /// Identifier of the order whose status admins change.
    #[config(default = 1)]
    pub order_id: u64,

    /// Identifier of the user that admins enable/disable.
    #[config(default = 1)]
    pub user_id: u64,

    /// Email of the test account used to log in and request password resets.
    #[config(default = "user@test.com")]
    pub email: String,

    /// Password of the test account. Also used for new sign ups.
    #[config(default = "password123")]
    pub password: String,

    /// Name sent with sign ups.
    #[config(default = "Test User")]
    pub signup_name: String,

    /// Token sent with password resets.
    #[config(default = "sample-reset-token")]
    pub reset_token: String,

    /// New password sent with password resets.
    #[config(default = "newpassword123")]
    pub new_password: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PacingOverride {
    #[serde(deserialize_with = "crate::config::deserialize_duration")]
    pub min: Duration,
    #[serde(deserialize_with = "crate::config::deserialize_duration")]
    pub max: Duration,
}

impl ScenarioConfig {
    /// Builds the configured scenario set. `variant` overrides the configured
    /// one.
    pub fn build(&self, variant: Option<Variant>) -> Result<ScenarioSet, ConfigError> {
        let mut set = variant.unwrap_or(self.variant).build()?;

        // Sorted to get deterministic error messages.
        let mut weights: Vec<_> = self.profile_weights.iter().collect();
        weights.sort();
        for (name, weight) in weights {
            set.set_profile_weight(name, *weight)?;
        }

        let mut pacing: Vec<_> = self.profile_pacing.iter().collect();
        pacing.sort_by(|a, b| a.0.cmp(b.0));
        for (name, p) in pacing {
            set.set_profile_pacing(name, p.min, p.max)?;
        }

        set.retain_profiles(&self.profiles)?;
        set.validate()?;
        Ok(set)
    }

    pub fn session(&self) -> Session {
        Session {
            event_id: self.event_id,
            concert_id: self.concert_id,
            order_id: self.order_id,
            user_id: self.user_id,
            email: self.email.clone(),
            password: self.password.clone(),
            signup_name: self.signup_name.clone(),
            reset_token: self.reset_token.clone(),
            new_password: self.new_password.clone(),
        }
    }
}
