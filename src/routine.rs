//! Built-in verification routines
//!
//! A routine is a plain description of one run: where to navigate, what to
//! probe, and what evidence to keep. New routines are data, not code.

use crate::probe::{Locator, Probe};

/// Description of one verification routine.
#[derive(Debug, Clone)]
pub struct Routine {
    pub name: &'static str,
    pub description: &'static str,
    /// Route under the base URL
    pub route: &'static str,
    /// Requires a signed-in session
    pub protected: bool,
    /// Public route verified instead when a protected route has no credentials
    pub fallback_route: &'static str,
    /// Element id scrolled into view before probing
    pub scroll_to: Option<&'static str>,
    pub probes: Vec<Probe>,
}

/// Home page: product section search controls render and are visible.
pub fn search() -> Routine {
    Routine {
        name: "search",
        description: "search controls on the product section of the home page",
        route: "/",
        protected: false,
        fallback_route: "/",
        scroll_to: Some("produk"),
        probes: vec![
            Probe::Visibility { locator: Locator::Placeholder("Banner".to_string()) },
            Probe::Visibility {
                locator: Locator::Role { role: "button".to_string(), name: "Cari".to_string() },
            },
            Probe::Screenshot { file: "search_design.png".to_string() },
            Probe::Title,
        ],
    }
}

/// Product detail page for an id that does not exist: the route must answer
/// with a not-found page, not a crash page.
pub fn detail() -> Routine {
    Routine {
        name: "detail",
        description: "product detail route with a nonexistent id renders without a server error",
        route: "/products/test-id",
        protected: false,
        fallback_route: "/",
        scroll_to: None,
        probes: vec![
            Probe::Title,
            Probe::Screenshot { file: "product_detail.png".to_string() },
        ],
    }
}

/// Product form page, admin-only. With credentials the form itself is
/// probed; without, the login page stands in as the public fallback.
pub fn edit_form() -> Routine {
    Routine {
        name: "edit-form",
        description: "product form behind admin login",
        route: "/products/new",
        protected: true,
        fallback_route: "/login",
        scroll_to: None,
        probes: vec![
            Probe::Visibility { locator: Locator::Id("product-form".to_string()) },
            Probe::Visibility {
                locator: Locator::Role { role: "combobox".to_string(), name: "Status".to_string() },
            },
            Probe::Title,
            Probe::Screenshot { file: "edit_form.png".to_string() },
        ],
    }
}

/// Probes recorded against the public fallback when a protected routine runs
/// without credentials.
pub fn fallback_probes(routine: &Routine) -> Vec<Probe> {
    vec![
        Probe::RouteUnreachable { route: routine.route.to_string() },
        Probe::Title,
        Probe::Screenshot { file: "login_page.png".to_string() },
    ]
}

pub fn all() -> Vec<Routine> {
    vec![search(), detail(), edit_form()]
}

pub fn by_name(name: &str) -> Option<Routine> {
    all().into_iter().find(|r| r.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routine_names_unique() {
        let routines = all();
        let mut names: Vec<_> = routines.iter().map(|r| r.name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), routines.len());
    }

    #[test]
    fn test_by_name() {
        assert_eq!(by_name("detail").map(|r| r.route), Some("/products/test-id"));
        assert!(by_name("nope").is_none());
    }

    #[test]
    fn test_every_routine_keeps_evidence() {
        for routine in all() {
            assert!(
                routine.probes.iter().any(|p| matches!(p, Probe::Screenshot { .. })),
                "routine {} captures no screenshot",
                routine.name
            );
        }
    }

    #[test]
    fn test_fallback_records_unreachable_marker_first() {
        let probes = fallback_probes(&edit_form());
        assert!(matches!(&probes[0], Probe::RouteUnreachable { route } if route == "/products/new"));
    }
}
