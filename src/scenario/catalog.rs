use std::{fmt, time::Duration};

use rand::{Rng as _, RngCore};
use serde::Deserialize;
use serde_json::{Value, json};

use super::{ConfigError, Method, ScenarioSet, Session};


/// The predefined scenario sets that can be selected by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Variant {
    /// Regular ticket buyers plus a small share of administrators.
    Ticketing,

    /// Only browsing, logging in and buying, no account management.
    BrowseAndBuy,

    /// Plain page loads of the web frontend.
    Pages,
}

impl Variant {
    pub fn name(self) -> &'static str {
        match self {
            Self::Ticketing => "ticketing",
            Self::BrowseAndBuy => "browse-and-buy",
            Self::Pages => "pages",
        }
    }

    pub fn build(self) -> Result<ScenarioSet, ConfigError> {
        let mut set = ScenarioSet::new(self.name());
        match self {
            Self::Ticketing => {
                ticket_user(&mut set)?;
                admin_user(&mut set)?;
            }
            Self::BrowseAndBuy => browse_and_buy(&mut set)?,
            Self::Pages => pages(&mut set)?,
        }
        set.validate()?;
        Ok(set)
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}


fn ticket_user(set: &mut ScenarioSet) -> Result<(), ConfigError> {
    let p = set.register_profile("ticket-user", 9, secs(1), secs(3))?;
    p.register_action("view_events", 4, Method::Get, "/events", None)?;
    p.register_action("view_event_detail", 3, Method::Get, "/events/{event_id}", None)?;
    p.register_action("login", 1, Method::Post, "/auth/login", Some(login_body))?;
    p.register_action("buy_ticket", 1, Method::Post, "/events", Some(buy_ticket_body))?;
    p.register_action("view_ticket_history", 2, Method::Get, "/tickets", None)?;
    p.register_action("sign_up", 1, Method::Post, "/auth/signup", Some(sign_up_body))?;
    p.register_action("forgot_pass", 1, Method::Post, "/auth/forgot-pass", Some(forgot_pass_body))?;
    p.register_action("reset_pass", 1, Method::Post, "/auth/reset-pass", Some(reset_pass_body))?;
    Ok(())
}

/// Administrators only generate request pressure on the admin endpoints. The
/// responses are not checked (placeholder ids will often be rejected).
fn admin_user(set: &mut ScenarioSet) -> Result<(), ConfigError> {
    let p = set.register_profile("admin-user", 1, secs(2), secs(5))?;
    let actions = [
        ("admin_view_concerts", 3, Method::Get, "/admin/concerts"),
        ("admin_create_concert", 1, Method::Post, "/admin/concerts"),
        ("admin_update_concert", 1, Method::Put, "/admin/concerts/{concert_id}"),
        ("admin_delete_concert", 1, Method::Delete, "/admin/concerts/{concert_id}"),
        ("admin_update_order_status", 1, Method::Patch, "/admin/orders/{order_id}"),
        ("admin_toggle_user", 1, Method::Patch, "/admin/users/{user_id}"),
    ];
    for (name, weight, method, path) in actions {
        p.register_action(name, weight, method, path, None)?.always_succeed();
    }
    Ok(())
}

fn browse_and_buy(set: &mut ScenarioSet) -> Result<(), ConfigError> {
    let p = set.register_profile("ticket-user", 1, secs(1), secs(3))?;
    p.register_action("view_events", 3, Method::Get, "/events", None)?;
    p.register_action("view_event_detail", 2, Method::Get, "/events/{event_id}", None)?;
    p.register_action("login", 1, Method::Post, "/auth/login", Some(login_body))?;
    p.register_action("buy_ticket", 1, Method::Post, "/events", Some(buy_ticket_body))?;
    Ok(())
}

fn pages(set: &mut ScenarioSet) -> Result<(), ConfigError> {
    let p = set.register_profile("page-user", 1, secs(1), secs(3))?;
    p.register_action("open_home", 2, Method::Get, "/", None)?;
    p.register_action("open_tickets", 3, Method::Get, "/tickets", None)?;
    p.register_action("open_login", 1, Method::Get, "/auth/login", None)?;
    Ok(())
}

fn secs(s: u64) -> Duration {
    Duration::from_secs(s)
}


// ===== Request bodies =====

fn login_body(session: &Session, _: &mut dyn RngCore) -> Value {
    json!({
        "email": session.email,
        "password": session.password,
    })
}

fn buy_ticket_body(session: &Session, _: &mut dyn RngCore) -> Value {
    json!({
        "event_id": session.event_id,
        "quantity": 1,
    })
}

/// Uses a random address so that repeated sign ups are (mostly) unique.
fn sign_up_body(session: &Session, rng: &mut dyn RngCore) -> Value {
    let n: u32 = rng.gen_range(1000..=9999);
    json!({
        "email": format!("user{n}@test.com"),
        "password": session.password,
        "name": session.signup_name,
    })
}

fn forgot_pass_body(session: &Session, _: &mut dyn RngCore) -> Value {
    json!({ "email": session.email })
}

fn reset_pass_body(session: &Session, _: &mut dyn RngCore) -> Value {
    json!({
        "token": session.reset_token,
        "new_password": session.new_password,
        "confirm_password": session.new_password,
    })
}
