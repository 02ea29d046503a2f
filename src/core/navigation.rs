//! Routing of window-open requests coming from game content.
//!
//! Every request ends in exactly one [`Outcome`]. The decision is a first-match walk over
//! [`RULES`]; anything no rule claims is handed to the operating system.

use crate::models::WindowCategory;
use url::Url;

use super::error::{ShellError, ShellResult};

pub const PRIMARY_DOMAIN: &str = "darkorbit";
pub const SECURE_CONFIG_DOMAIN: &str = "bpsecure";

const GAME_QUERY: &str = "action=internalMapRevolution";
const BOARD_QUERY: &str = "action=portal.redirectToBoard";
const LOGOUT_ACTION: &str = "action=externalLogout";

/// Schemes handed to the OS default handler; anything else is dropped.
pub const EXTERNAL_SCHEMES: &[&str] = &["http", "https", "mailto"];

/// Scheme of `raw` when the OS may open it, `Err` with the offending scheme otherwise.
pub fn external_scheme(raw: &str) -> Result<String, Option<String>> {
    let Ok(url) = Url::parse(raw) else {
        return Err(None);
    };
    let scheme = url.scheme().to_string();
    if EXTERNAL_SCHEMES.contains(&scheme.as_str()) {
        Ok(scheme)
    } else {
        Err(Some(scheme))
    }
}

/// Domain labels treated as in-app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainPolicy {
    pub primary: String,
    pub secure_config: String,
}

impl Default for DomainPolicy {
    fn default() -> Self {
        Self {
            primary: PRIMARY_DOMAIN.to_string(),
            secure_config: SECURE_CONFIG_DOMAIN.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationRequest {
    pub target_url: String,
    /// Label of the window whose content asked for the new window.
    pub origin_label: String,
}

impl NavigationRequest {
    pub fn new(target_url: impl Into<String>, origin_label: impl Into<String>) -> Self {
        Self {
            target_url: target_url.into(),
            origin_label: origin_label.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Drop the request; nothing is opened or navigated.
    Suppress,
    /// Load the target in the origin window.
    RedirectInPlace(Url),
    /// Open a new window sized from the category's settings bucket.
    OpenWindow { category: WindowCategory, url: Url },
    /// Hand the raw target to the OS default handler.
    DelegateToOs(String),
}

impl Outcome {
    pub fn tag(&self) -> &'static str {
        match self {
            Outcome::Suppress => "suppress",
            Outcome::RedirectInPlace(_) => "redirect",
            Outcome::OpenWindow { .. } => "open_window",
            Outcome::DelegateToOs(_) => "delegate_to_os",
        }
    }
}

/// Parsed pieces of a target URL the rules look at.
#[derive(Debug, Clone)]
pub struct NavigationTarget {
    url: Url,
    first_label: String,
    domain_label: Option<String>,
}

impl NavigationTarget {
    pub fn parse(raw: &str) -> ShellResult<Self> {
        let url = Url::parse(raw).map_err(|source| ShellError::InvalidUrl {
            url: raw.to_string(),
            source,
        })?;
        let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
        let labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();

        let first_label = labels.first().copied().unwrap_or_default().to_string();
        // The label left of the top-level domain: `darkorbit` for both `darkorbit.com`
        // and `de1-board.darkorbit.com`. Multi-part suffixes such as `co.uk` are not handled.
        let domain_label = (labels.len() >= 2).then(|| labels[labels.len() - 2].to_string());

        Ok(Self {
            url,
            first_label,
            domain_label,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    fn query(&self) -> Option<&str> {
        self.url.query()
    }

    fn query_is(&self, expected: &str) -> bool {
        self.query() == Some(expected)
    }

    /// First `&`-separated segment of the query string.
    fn first_query_segment(&self) -> Option<&str> {
        self.query().and_then(|q| q.split('&').next())
    }

    fn on_domain(&self, domain: &str) -> bool {
        self.domain_label.as_deref() == Some(domain)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Suppress,
    RedirectInPlace,
    Open(WindowCategory),
}

pub struct Rule {
    pub name: &'static str,
    pub matches: fn(&NavigationTarget, &DomainPolicy) -> bool,
    pub route: Route,
}

pub const RULES: &[Rule] = &[
    Rule {
        name: "game_map",
        matches: |t, _| t.query_is(GAME_QUERY),
        route: Route::Open(WindowCategory::Game),
    },
    Rule {
        name: "board",
        matches: |t, p| {
            t.on_domain(&p.primary) && (t.first_label.contains("board") || t.query_is(BOARD_QUERY))
        },
        route: Route::Open(WindowCategory::Board),
    },
    Rule {
        name: "logout",
        matches: |t, p| t.on_domain(&p.primary) && t.first_query_segment() == Some(LOGOUT_ACTION),
        route: Route::Suppress,
    },
    Rule {
        name: "primary_domain",
        matches: |t, p| t.on_domain(&p.primary),
        route: Route::RedirectInPlace,
    },
    Rule {
        name: "secure_config",
        matches: |t, p| t.on_domain(&p.secure_config),
        route: Route::Open(WindowCategory::Config),
    },
];

#[derive(Debug, Clone, Default)]
pub struct NavigationClassifier {
    policy: DomainPolicy,
}

impl NavigationClassifier {
    pub fn new(policy: DomainPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &DomainPolicy {
        &self.policy
    }

    /// First rule that claims `target`, if any.
    pub fn matching_rule(&self, target: &NavigationTarget) -> Option<&'static Rule> {
        RULES.iter().find(|rule| (rule.matches)(target, &self.policy))
    }

    pub fn classify(&self, request: &NavigationRequest) -> Outcome {
        match NavigationTarget::parse(&request.target_url) {
            Ok(target) => self.classify_target(target),
            Err(_) => Outcome::DelegateToOs(request.target_url.clone()),
        }
    }

    pub fn classify_target(&self, target: NavigationTarget) -> Outcome {
        let Some(rule) = self.matching_rule(&target) else {
            return Outcome::DelegateToOs(target.url.into());
        };
        match rule.route {
            Route::Suppress => Outcome::Suppress,
            Route::RedirectInPlace => Outcome::RedirectInPlace(target.url),
            Route::Open(category) => Outcome::OpenWindow {
                category,
                url: target.url,
            },
        }
    }
}
