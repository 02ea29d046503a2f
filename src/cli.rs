use clap::Parser;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use url::Url;

pub const DEFAULT_START_URL: &str = "https://www.darkorbit.com/";

#[derive(Debug, Clone, Default, Parser)]
#[command(
    name = "orbit-client",
    about = "Desktop client for DarkOrbit",
    after_help = "for more information visit https://github.com/kaiserdj/Darkorbit-client"
)]
pub struct LaunchOptions {
    /// Autologin on darkorbit. Example: --login user pass
    #[arg(short = 'l', long, num_args = 1.., value_name = "USER PASS")]
    pub login: Option<Vec<String>>,

    /// Run client with custom dosid
    #[arg(long, visible_alias = "sid")]
    pub dosid: Option<String>,

    /// Run in development mode
    #[arg(short = 'd', long)]
    pub dev: bool,
}

impl LaunchOptions {
    /// `[user, pass]` when exactly two login values were given.
    pub fn credentials(&self) -> Option<[String; 2]> {
        match self.login.as_deref() {
            Some([user, pass]) => Some([user.clone(), pass.clone()]),
            _ => None,
        }
    }

    pub fn session(&self) -> Option<SessionStart> {
        self.dosid.as_deref().and_then(SessionStart::from_dosid_url)
    }

    /// First URL the main window loads. With a session this is the session's origin,
    /// so the cookie exists before `internalStart` is requested.
    pub fn start_url(&self) -> String {
        self.session()
            .map(|s| s.landing_url())
            .unwrap_or_else(|| DEFAULT_START_URL.to_string())
    }
}

/// Page script that fills and submits the portal login form once per browser session.
pub fn login_script(credentials: &[String; 2]) -> String {
    let [user, pass] = credentials;
    format!(
        r#"(function () {{
  var key = "orbit-client-autologin";
  if (window.sessionStorage.getItem(key)) return;
  var password = document.querySelector('input[type="password"]');
  var form = password && password.form;
  if (!form) return;
  var username = form.querySelector('input[name="username"], input[type="text"], input[type="email"]');
  if (!username) return;
  var fill = function (input, value) {{
    input.value = value;
    input.dispatchEvent(new Event("input", {{ bubbles: true }}));
  }};
  fill(username, {user});
  fill(password, {pass});
  window.sessionStorage.setItem(key, "1");
  if (form.requestSubmit) {{ form.requestSubmit(); }} else {{ form.submit(); }}
}})();"#,
        user = Value::String(user.clone()),
        pass = Value::String(pass.clone()),
    )
}

/// Session handed over on the command line as a URL carrying `dosid=` or `sid=`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStart {
    pub origin: String,
    pub sid: String,
}

impl SessionStart {
    pub fn from_dosid_url(raw: &str) -> Option<Self> {
        let url = Url::parse(raw).ok()?;
        let origin = url.origin();
        if !origin.is_tuple() {
            return None;
        }
        let sid = url
            .query_pairs()
            .find(|(k, v)| (k == "dosid" || k == "sid") && !v.is_empty())
            .map(|(_, v)| v.into_owned())?;

        Some(Self {
            origin: origin.ascii_serialization(),
            sid,
        })
    }

    pub fn landing_url(&self) -> String {
        format!("{}/", self.origin)
    }

    pub fn start_url(&self) -> String {
        format!("{}/indexInternal.es?action=internalStart", self.origin)
    }

    /// Page script that plants the `dosid` cookie before the game scripts run.
    pub fn cookie_script(&self) -> String {
        let cookie = format!("dosid={}; path=/", self.sid);
        format!(
            "if (window.location.origin === {origin}) {{ document.cookie = {cookie}; }}",
            origin = Value::String(self.origin.clone()),
            cookie = Value::String(cookie),
        )
    }
}

/// Sends the main window on to `internalStart` after the landing page planted the cookie.
#[derive(Debug)]
pub struct SessionHandoff {
    session: SessionStart,
    pending: AtomicBool,
}

impl SessionHandoff {
    pub fn new(session: SessionStart) -> Self {
        Self {
            session,
            pending: AtomicBool::new(true),
        }
    }

    /// The start URL, exactly once, for the first finished load on the session's origin.
    pub fn next_after(&self, loaded: &Url) -> Option<Url> {
        if loaded.origin().ascii_serialization() != self.session.origin {
            return None;
        }
        if !self.pending.swap(false, Ordering::AcqRel) {
            return None;
        }
        Url::parse(&self.session.start_url()).ok()
    }
}
